//! # Quorum (bm-02)
//!
//! Decides, per root hash, when every expected per-node chain has contributed
//! a dependency, and gates the handoff to the ordering engine exactly once.
//!
//! ## Lifecycle
//!
//! ```text
//! Started ──incoming──→ Blockmainia ──process──→ Running ──interpreted──→ Polished
//!    ↑  │
//!    └──┴── Queued / Dead (gossip outcome, only before quorum)
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | One-way quorum | Blockmainia, Running, Polished never return to bookkeeping states |
//! | Drained waiting set | A locked job's `waiting_on` is empty |
//! | Idempotent observation | Re-observing the same records leaves the job unchanged |
//! | No partial commit | Records are flagged `included` only after the job is persisted |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - dependency assembler and the pure `incoming` gate
//! - `ports/` - `JobStateApi` (inbound), `Membership` (outbound)
//! - `adapters/` - `StaticMembership`
//! - `service.rs` - `JobStateMachine`

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::StaticMembership;
pub use config::QuorumConfig;
pub use domain::{assemble, bucket_by_hash, incoming, AssembledRoot};
pub use error::{QuorumError, QuorumResult};
pub use ports::{JobStateApi, Membership, Observation, SetStatesReport};
pub use service::{GcReport, JobStateMachine};
