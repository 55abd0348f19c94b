//! Per-genome CpG index metadata: chromosome table, CpG offsets, content hash.

use serde::{Deserialize, Serialize};
use std::path::Path;
use xxhash_rust::xxh3::Xxh3;

use crate::error::{QueryError, Result};

/// Sidecar JSON metadata for a [`super::CpgIndex`] (spec.md §3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CpgIndexMeta {
    pub assembly: String,
    /// Chromosome name and length, in the index's linear order.
    pub chromosomes: Vec<(String, u64)>,
    /// Prefix sum of CpG counts across chromosomes; `chrom_offset[i]` is the
    /// number of CpGs preceding chromosome `i`.
    pub chrom_offset: Vec<u32>,
    pub n_cpgs: u32,
    /// 64-bit content hash pinning methylomes to this exact index build.
    pub index_hash: u64,
}

impl CpgIndexMeta {
    /// Build metadata from chromosome lengths and per-chromosome CpG positions,
    /// computing `chrom_offset`, `n_cpgs` and `index_hash` from them.
    pub fn build(assembly: &str, chromosomes: Vec<(String, u64)>, positions: &[Vec<u32>]) -> Self {
        assert_eq!(chromosomes.len(), positions.len());

        let mut chrom_offset = Vec::with_capacity(chromosomes.len());
        let mut running = 0u32;
        for p in positions {
            chrom_offset.push(running);
            running += p.len() as u32;
        }
        let n_cpgs = running;
        let index_hash = Self::compute_hash(assembly, &chromosomes, positions);

        Self {
            assembly: assembly.to_string(),
            chromosomes,
            chrom_offset,
            n_cpgs,
            index_hash,
        }
    }

    fn compute_hash(assembly: &str, chromosomes: &[(String, u64)], positions: &[Vec<u32>]) -> u64 {
        let mut hasher = Xxh3::new();
        hasher.update(assembly.as_bytes());
        for (name, len) in chromosomes {
            hasher.update(name.as_bytes());
            hasher.update(&len.to_le_bytes());
        }
        for chrom_positions in positions {
            for pos in chrom_positions {
                hasher.update(&pos.to_le_bytes());
            }
        }
        hasher.digest()
    }

    /// Per-chromosome CpG counts, derived from `chrom_offset` extended by `n_cpgs`.
    ///
    /// `get_n_cpgs_chrom()[i] = chrom_offset[i+1] - chrom_offset[i]` for all
    /// but the last chromosome, whose count is `n_cpgs - chrom_offset[last]`.
    pub fn get_n_cpgs_chrom(&self) -> Vec<u32> {
        let mut counts = Vec::with_capacity(self.chrom_offset.len());
        for window in self.chrom_offset.windows(2) {
            counts.push(window[1] - window[0]);
        }
        if let Some(&last) = self.chrom_offset.last() {
            counts.push(self.n_cpgs - last);
        }
        counts
    }

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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn n_cpgs_chrom_matches_spec_scenario_1() {
        let meta = CpgIndexMeta {
            assembly: "hg38".to_string(),
            chromosomes: vec![
                ("chr1".to_string(), 1),
                ("chr2".to_string(), 1),
                ("chr3".to_string(), 1),
            ],
            chrom_offset: vec![0, 1000, 10000],
            n_cpgs: 11000,
            index_hash: 0,
        };
        assert_eq!(meta.get_n_cpgs_chrom(), vec![1000, 9000, 1000]);
    }

    #[test]
    fn n_cpgs_chrom_single_empty_chromosome() {
        let meta = CpgIndexMeta {
            assembly: "toy".to_string(),
            chromosomes: vec![("chr1".to_string(), 1)],
            chrom_offset: vec![0],
            n_cpgs: 0,
            index_hash: 0,
        };
        assert_eq!(meta.get_n_cpgs_chrom(), vec![0]);
    }

    #[test]
    fn sum_of_n_cpgs_chrom_equals_n_cpgs() {
        let meta = CpgIndexMeta {
            assembly: "hg38".to_string(),
            chromosomes: vec![
                ("chr1".to_string(), 1),
                ("chr2".to_string(), 1),
                ("chr3".to_string(), 1),
            ],
            chrom_offset: vec![0, 1000, 10000],
            n_cpgs: 11000,
            index_hash: 0,
        };
        let sum: u32 = meta.get_n_cpgs_chrom().iter().sum();
        assert_eq!(sum, meta.n_cpgs);
    }

    #[test]
    fn build_computes_consistent_offsets_and_hash() {
        let positions = vec![vec![10, 20, 30], vec![5, 15]];
        let meta = CpgIndexMeta::build(
            "toyGenome",
            vec![("chr1".to_string(), 1000), ("chr2".to_string(), 1000)],
            &positions,
        );
        assert_eq!(meta.chrom_offset, vec![0, 3]);
        assert_eq!(meta.n_cpgs, 5);

        let meta2 = CpgIndexMeta::build(
            "toyGenome",
            vec![("chr1".to_string(), 1000), ("chr2".to_string(), 1000)],
            &positions,
        );
        assert_eq!(meta.index_hash, meta2.index_hash);

        let mut other_positions = positions.clone();
        other_positions[1].push(99);
        let meta3 = CpgIndexMeta::build(
            "toyGenome",
            vec![("chr1".to_string(), 1000), ("chr2".to_string(), 1000)],
            &other_positions,
        );
        assert_ne!(meta.index_hash, meta3.index_hash);
    }

    #[test]
    fn round_trip_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toy.json");
        let meta = CpgIndexMeta::build(
            "toyGenome",
            vec![("chr1".to_string(), 1000)],
            &[vec![10, 20, 30]],
        );
        meta.write(&path).unwrap();
        let loaded = CpgIndexMeta::read(&path).unwrap();
        assert_eq!(meta, loaded);
    }
}
