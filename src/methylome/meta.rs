//! Methylome metadata: provenance and the index-hash pin that ties a
//! methylome to the exact CpG index it was built against.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{QueryError, Result};

/// Sidecar JSON metadata for a methylome (spec.md §3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethylomeMetadata {
    pub version: String,
    pub host: String,
    pub user: String,
    pub creation_time: String,
    /// Must equal the owning genome's [`crate::cpg_index::CpgIndex::index_hash`].
    pub index_hash: u64,
    pub assembly: String,
    /// Must equal the owning index's `n_cpgs`.
    pub n_cpgs: u32,
}

impl MethylomeMetadata {
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(|source| QueryError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = serde_json::to_string_pretty(self).map_err(|source| QueryError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Path for a methylome's metadata sidecar file, `{dir}/{name}.m16.json`.
    pub fn path_for<P: AsRef<Path>>(dir: P, name: &str) -> std::path::PathBuf {
        dir.as_ref().join(format!("{name}.m16.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SRX012345.m16.json");
        let meta = MethylomeMetadata {
            version: "0.1.0".to_string(),
            host: "build-host".to_string(),
            user: "pipeline".to_string(),
            creation_time: "2024-01-01T00:00:00Z".to_string(),
            index_hash: 0xdead_beef_cafe_babe,
            assembly: "tProrsus1".to_string(),
            n_cpgs: 6053,
        };
        meta.write(&path).unwrap();
        let loaded = MethylomeMetadata::read(&path).unwrap();
        assert_eq!(meta, loaded);
    }
}
