//! # Error Types
//!
//! Errors raised at message boundaries, shared by every subsystem.

use thiserror::Error;

/// A caller broke a message contract (malformed input that no retry fixes).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractViolation {
    /// Root hash has the wrong length.
    #[error("Malformed root hash: expected {expected} bytes, got {actual}")]
    HashLength { expected: usize, actual: usize },

    /// Root hash text is not valid hex.
    #[error("Malformed root hash: {0}")]
    HashEncoding(String),

    /// A required field was left empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}
