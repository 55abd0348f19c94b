//! TCP request pipeline: accept, parse, resolve, compute, respond
//! (spec.md §4.7, §5).

mod signals;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::cpg_index::CpgIndexRegistry;
use crate::error::{QueryError, Result};
use crate::levels;
use crate::methylome_set::MethylomeSet;
use crate::protocol::{RequestBody, RequestHeader, Response};
use crate::query::QueryContainer;
use crate::runtime_config;

/// Binding and timeout parameters for [`run`].
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub hostname: String,
    pub port: u16,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            hostname: "127.0.0.1".to_string(),
            port: 6062,
            read_timeout: Duration::from_secs(30),
            write_timeout: Duration::from_secs(30),
        }
    }
}

/// The application singletons the server's request pipeline reads from:
/// the CpG-index registry, the methylome set, and the name catalog
/// (spec.md §9: "owned by the server's top-level object, not free globals").
pub struct AppState {
    pub index_registry: CpgIndexRegistry,
    pub methylome_set: MethylomeSet,
    pub catalog: Catalog,
}

impl AppState {
    /// Load everything the server needs from `index_dir`/`methylome_dir`,
    /// failing fast if either is missing (spec.md §6, §8 scenario 8).
    pub fn load<P: AsRef<Path>>(index_dir: P, methylome_dir: P, capacity: usize) -> Result<Self> {
        let methylome_dir = methylome_dir.as_ref();
        if !methylome_dir.is_dir() {
            return Err(QueryError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("methylome directory not found: {}", methylome_dir.display()),
            )));
        }
        let index_registry = CpgIndexRegistry::load_dir(index_dir)?;
        let catalog = Catalog::read(methylome_dir.join("methylome_names.json"))?;
        let methylome_set = MethylomeSet::new(methylome_dir, capacity);
        Ok(Self {
            index_registry,
            methylome_set,
            catalog,
        })
    }
}

/// Bind `config.hostname:config.port` and serve requests until a shutdown
/// signal arrives. The accept loop and every connection observe the same
/// watch channel, so a signal drains in-flight connections rather than
/// severing them mid-response (spec.md §5).
pub async fn run(config: ServerConfig, state: Arc<AppState>) -> Result<()> {
    let addr = format!("{}:{}", config.hostname, config.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "server listening");

    let mut shutdown_rx = signals::install();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                debug!(%peer, "accepted connection");
                let state = Arc::clone(&state);
                let config = config.clone();
                let conn_shutdown = shutdown_rx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, state, config, conn_shutdown).await {
                        warn!(%peer, error = %e, "connection ended with error");
                    }
                });
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    info!("no longer accepting new connections, draining in flight");
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Serve requests on one connection until the client disconnects or
/// shutdown is signaled. Responses are written in the order requests
/// arrive on this connection (spec.md §5 ordering guarantee).
async fn handle_connection(
    mut stream: TcpStream,
    state: Arc<AppState>,
    config: ServerConfig,
    mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
) -> Result<()> {
    loop {
        if *shutdown_rx.borrow() {
            return Ok(());
        }

        let mut header_buf = [0u8; RequestHeader::WIRE_LEN];
        let read = tokio::select! {
            r = tokio::time::timeout(config.read_timeout, stream.read_exact(&mut header_buf)) => r,
            _ = shutdown_rx.changed() => return Ok(()),
        };
        match read {
            Ok(Ok(_)) => {}
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
            Ok(Err(e)) => return Err(QueryError::Io(e)),
            Err(_elapsed) => return Err(QueryError::Timeout),
        }

        let header = match RequestHeader::from_bytes(&header_buf) {
            Ok(h) => h,
            Err(e) => {
                write_response(&mut stream, &Response::err(e.wire_code()), config.write_timeout).await?;
                continue;
            }
        };

        let body = match read_body(&mut stream, &header, config.read_timeout).await {
            Ok(b) => b,
            Err(e) => {
                write_response(&mut stream, &Response::err(e.wire_code()), config.write_timeout).await?;
                continue;
            }
        };

        let response = compute_response(&state, &header, body).await;
        write_response(&mut stream, &response, config.write_timeout).await?;
    }
}

/// Upper bound on `n_intervals` in an intervals-form request body, so a
/// forged 4-byte count can't force a multi-gigabyte allocation before the
/// rest of the body is even read. No real query needs more ranges than
/// this; spec.md doesn't name a limit, so this is chosen generously.
const MAX_INTERVALS_PER_REQUEST: usize = 1_000_000;

async fn read_body(
    stream: &mut TcpStream,
    header: &RequestHeader,
    read_timeout: Duration,
) -> Result<RequestBody> {
    let mut prefix = [0u8; 4];
    tokio::time::timeout(read_timeout, stream.read_exact(&mut prefix))
        .await
        .map_err(|_| QueryError::Timeout)??;

    if header.request_type.is_bins() {
        RequestBody::decode(header.request_type, &prefix)
    } else {
        let n_intervals = u32::from_le_bytes(prefix) as usize;
        if n_intervals > MAX_INTERVALS_PER_REQUEST {
            return Err(QueryError::InvalidRequest(format!(
                "n_intervals {n_intervals} exceeds the per-request maximum of {MAX_INTERVALS_PER_REQUEST}"
            )));
        }
        let mut rest = vec![0u8; n_intervals * 8];
        tokio::time::timeout(read_timeout, stream.read_exact(&mut rest))
            .await
            .map_err(|_| QueryError::Timeout)??;
        let mut full = Vec::with_capacity(4 + rest.len());
        full.extend_from_slice(&prefix);
        full.extend_from_slice(&rest);
        RequestBody::decode(header.request_type, &full)
    }
}

async fn compute_response(state: &AppState, header: &RequestHeader, body: RequestBody) -> Response {
    let result = resolve_and_compute(state, header, body).await;
    Response::from_result(result)
}

async fn resolve_and_compute(
    state: &AppState,
    header: &RequestHeader,
    body: RequestBody,
) -> Result<Vec<crate::levels::Level>> {
    if runtime_config::verbose_request_log() {
        info!(
            accession = %header.accession,
            request_type = ?header.request_type,
            methylome_size = header.methylome_size,
            "resolved request"
        );
    }

    let loaded = state
        .methylome_set
        .get(&header.accession, &state.index_registry, &state.catalog)
        .await?;

    if loaded.data.size() != header.methylome_size {
        return Err(QueryError::InvalidRequest(format!(
            "methylome_size mismatch for {}: client expected {}, server has {}",
            header.accession,
            header.methylome_size,
            loaded.data.size()
        )));
    }

    let covered = header.request_type.is_covered();
    let query = match body {
        RequestBody::Intervals(q) => q,
        RequestBody::Bins { bin_size } => {
            let genome = state
                .catalog
                .genome_for(&header.accession)
                .ok_or_else(|| QueryError::InvalidMethylomeName(header.accession.clone()))?;
            let index = state
                .index_registry
                .get(genome)
                .ok_or_else(|| QueryError::InvalidMethylomeName(header.accession.clone()))?;
            QueryContainer::from_bins(&index, bin_size as u64)
        }
    };

    Ok(levels::range_sum(&loaded.data, &query, covered))
}

async fn write_response(
    stream: &mut TcpStream,
    response: &Response,
    write_timeout: Duration,
) -> Result<()> {
    let bytes = response.to_bytes();
    tokio::time::timeout(write_timeout, stream.write_all(&bytes))
        .await
        .map_err(|_| QueryError::Timeout)??;
    Ok(())
}
