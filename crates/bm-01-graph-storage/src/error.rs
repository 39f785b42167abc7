//! Error types for graph storage

use shared_types::{GraphKey, JobState};
use thiserror::Error;

/// Key-value backend failures.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KVStoreError {
    /// I/O error during read/write.
    #[error("KV store I/O error: {message}")]
    IOError { message: String },

    /// Data corruption in the store.
    #[error("KV store corruption: {message}")]
    CorruptionError { message: String },
}

/// Storage subsystem errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another record already holds this natural key.
    #[error("Conflicting block graph at {key}")]
    Conflict { key: GraphKey },

    /// Stored job would leave a locked state.
    #[error("Illegal job transition: {from} -> {to}")]
    IllegalTransition { from: JobState, to: JobState },

    /// Backend failure
    #[error(transparent)]
    Backend(#[from] KVStoreError),

    /// Record could not be encoded or decoded
    #[error("Codec error: {0}")]
    Codec(String),

    /// Backend not available in this build
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl From<bincode::Error> for StoreError {
    fn from(err: bincode::Error) -> Self {
        StoreError::Codec(err.to_string())
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;
