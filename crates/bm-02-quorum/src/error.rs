//! Error types for the quorum subsystem

use bm_01_graph_storage::StoreError;
use thiserror::Error;

/// Quorum subsystem errors
#[derive(Debug, Error)]
pub enum QuorumError {
    /// Store failure; the decision was discarded
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for quorum operations
pub type QuorumResult<T> = Result<T, QuorumError>;
