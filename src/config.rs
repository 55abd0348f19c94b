//! Client configuration file: the TOML document `command config` writes
//! and the `server`/`check` commands read back (spec.md §6).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, Result};
use crate::format::OutputFormat;

/// The persisted client configuration (spec.md §6: "Client config TOML:
/// hostname, port, index directory, log level, output format, methylomes
/// metadata path").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub hostname: String,
    pub port: u16,
    pub index_dir: PathBuf,
    pub methylome_dir: PathBuf,
    pub log_level: String,
    pub output_format: OutputFormat,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 6062,
            index_dir: PathBuf::from("index"),
            methylome_dir: PathBuf::from("methylomes"),
            log_level: "info".to_string(),
            output_format: OutputFormat::Counts,
        }
    }
}

impl ClientConfig {
    /// Write this config as TOML to `path`, creating the parent directory
    /// first exactly as spec.md §6 requires of `command config`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let text = toml::to_string_pretty(self).map_err(|source| QueryError::TomlSer {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, text)?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|source| QueryError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trips_through_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("client.toml");
        let config = ClientConfig {
            hostname: "example.org".to_string(),
            port: 9000,
            index_dir: PathBuf::from("/data/index"),
            methylome_dir: PathBuf::from("/data/methylomes"),
            log_level: "debug".to_string(),
            output_format: OutputFormat::Bedgraph,
        };
        config.write(&path).unwrap();
        let read_back = ClientConfig::read(&path).unwrap();
        assert_eq!(read_back, config);
    }

    #[test]
    fn write_creates_missing_parent_directories() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("c.toml");
        assert!(!path.parent().unwrap().exists());
        ClientConfig::default().write(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn default_matches_the_documented_listen_address() {
        let config = ClientConfig::default();
        assert_eq!(config.hostname, "127.0.0.1");
        assert_eq!(config.port, 6062);
    }

    #[test]
    fn malformed_toml_is_reported_with_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "not = [valid").unwrap();
        let err = ClientConfig::read(&path).unwrap_err();
        assert!(matches!(err, QueryError::Toml { .. }));
    }
}
