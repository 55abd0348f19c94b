//! `mquery config` — write a client configuration TOML file (spec.md §6).

use std::path::{Path, PathBuf};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::format::OutputFormat;

#[allow(clippy::too_many_arguments)]
pub fn run_config(
    config_path: &Path,
    hostname: String,
    port: u16,
    index_dir: PathBuf,
    methylome_dir: PathBuf,
    log_level: String,
    output_format: OutputFormat,
) -> Result<()> {
    let config = ClientConfig {
        hostname,
        port,
        index_dir,
        methylome_dir,
        log_level,
        output_format,
    };
    config.write(config_path)?;
    println!("wrote config to {}", config_path.display());
    Ok(())
}
