//! Error kinds shared across the query engine, the wire protocol, and the CLI.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Stable error kinds, surfaced on the wire as integers and in logs as messages.
///
/// Every leaf operation in this crate returns `Result<T, QueryError>`; the
/// request pipeline maps these to the wire error code via [`QueryError::wire_code`]
/// rather than matching exceptions for control flow.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unknown methylome name: {0}")]
    InvalidMethylomeName(String),

    #[error("methylome file not found: {path}")]
    MethylomeFileNotFound { path: PathBuf },

    #[error("index hash mismatch for {name}: methylome expects {expected:016x}, loaded index is {actual:016x}")]
    IndexHashMismatch {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("unknown chromosome: {0}")]
    InvalidChromosome(String),

    #[error("invalid interval [{start}, {stop}) on {chrom}")]
    InvalidInterval {
        chrom: String,
        start: u64,
        stop: u64,
    },

    #[error("cache exhausted: every cached methylome is in use")]
    CacheExhausted,

    #[error("request timed out")]
    Timeout,

    #[error("malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize TOML for {path}: {source}")]
    TomlSer {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    /// Re-raised against a waiter on a shared, already-completed methylome
    /// load (the original [`QueryError`] isn't `Clone` because `io::Error`
    /// isn't, so concurrent waiters see this carrying the same message and
    /// wire code rather than the original variant).
    #[error("{message}")]
    LoadFailed { message: String, wire_code: u32 },
}

pub type Result<T> = std::result::Result<T, QueryError>;

/// Wire error codes from spec.md §4.7/§7. `0` means success; every other
/// code is a stable, ordering-independent identifier a client can match on.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireErrorCode {
    Ok = 0,
    InvalidRequest = 1,
    InvalidMethylomeName = 2,
    MethylomeFileNotFound = 3,
    IndexHashMismatch = 4,
    InvalidChromosome = 5,
    InvalidInterval = 6,
    CacheExhausted = 7,
    IoError = 8,
    Timeout = 9,
}

impl QueryError {
    /// Map this error to the stable wire error code from spec.md §4.7.
    pub fn wire_code(&self) -> u32 {
        let code = match self {
            QueryError::InvalidRequest(_) => WireErrorCode::InvalidRequest,
            QueryError::InvalidMethylomeName(_) => WireErrorCode::InvalidMethylomeName,
            QueryError::MethylomeFileNotFound { .. } => WireErrorCode::MethylomeFileNotFound,
            QueryError::IndexHashMismatch { .. } => WireErrorCode::IndexHashMismatch,
            QueryError::InvalidChromosome(_) => WireErrorCode::InvalidChromosome,
            QueryError::InvalidInterval { .. } => WireErrorCode::InvalidInterval,
            QueryError::CacheExhausted => WireErrorCode::CacheExhausted,
            QueryError::Timeout => WireErrorCode::Timeout,
            QueryError::Io(_)
            | QueryError::Json { .. }
            | QueryError::Toml { .. }
            | QueryError::TomlSer { .. } => WireErrorCode::IoError,
            QueryError::LoadFailed { wire_code, .. } => return *wire_code,
        };
        code as u32
    }

    /// Snapshot this error as a cheaply-clonable, wire-code-preserving value
    /// for fanning an already-resolved result out to concurrent waiters.
    pub fn to_shared(&self) -> QueryError {
        QueryError::LoadFailed {
            message: self.to_string(),
            wire_code: self.wire_code(),
        }
    }
}
