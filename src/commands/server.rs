//! `mquery server` — bind a hostname/port and serve requests, failing fast on
//! missing index or methylome directories (spec.md §6, §8 scenario 8).

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::server::{self, AppState, ServerConfig};

#[allow(clippy::too_many_arguments)]
pub fn run_server(
    hostname: String,
    port: u16,
    index_dir: &Path,
    methylome_dir: &Path,
    capacity: usize,
    read_timeout: Duration,
    write_timeout: Duration,
) -> Result<()> {
    let state = Arc::new(AppState::load(index_dir, methylome_dir, capacity)?);
    let config = ServerConfig {
        hostname,
        port,
        read_timeout,
        write_timeout,
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(crate::error::QueryError::Io)?;
    rt.block_on(server::run(config, state))
}
