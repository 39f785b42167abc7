//! # Shared Types Crate
//!
//! Records and messages shared by every Blockmania subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: graph, job, and message shapes live here so
//!   storage, quorum, orchestration, delivery, and gossip agree on them.
//! - **Self-contained fragments**: dependencies are embedded by value, so a
//!   replicated `BlockGraph` never needs a lookup to be interpreted.
//! - **Generic payloads**: every graph type is generic over its attachment.

pub mod entities;
pub mod errors;
pub mod ipc;

pub use entities::*;
pub use errors::*;
pub use ipc::*;

/// Current wire version for gossip batches.
pub const PROTOCOL_VERSION: u16 = 1;

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
