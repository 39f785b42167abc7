//! Error types for the reliable delivery subsystem

use bm_01_graph_storage::KVStoreError;
use thiserror::Error;

/// Reliable delivery errors
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The link to the peer refused the delivery or acknowledgement
    #[error("Transport error: {0}")]
    Transport(String),

    /// The other end of an in-process link is gone
    #[error("Channel closed")]
    ChannelClosed,

    #[error("Snapshot store error: {0}")]
    Snapshot(#[from] KVStoreError),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<bincode::Error> for DeliveryError {
    fn from(e: bincode::Error) -> Self {
        DeliveryError::Codec(e.to_string())
    }
}

/// Result type for delivery operations
pub type DeliveryResult<T> = Result<T, DeliveryError>;
