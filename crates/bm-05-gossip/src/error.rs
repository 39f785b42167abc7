//! Error types for the gossip subsystem

use bm_01_graph_storage::StoreError;
use thiserror::Error;

/// Gossip errors
#[derive(Debug, Error)]
pub enum GossipError {
    /// Peer could not be reached or refused the push
    #[error("Push to {peer} failed: {reason}")]
    Transport { peer: String, reason: String },

    #[error("Codec error: {0}")]
    Codec(String),

    /// Batch encoded by an incompatible peer
    #[error("Unsupported wire version {actual}, expected {expected}")]
    Version { expected: u16, actual: u16 },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

impl From<bincode::Error> for GossipError {
    fn from(e: bincode::Error) -> Self {
        GossipError::Codec(e.to_string())
    }
}

/// Result type for gossip operations
pub type GossipResult<T> = Result<T, GossipError>;
