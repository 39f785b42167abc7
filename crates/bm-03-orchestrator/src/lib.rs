//! # Graph Orchestration (bm-03)
//!
//! Drives each root hash from its first local draft to a polished,
//! interpreted batch.
//!
//! ## Flow
//!
//! ```text
//! submit(draft) ──→ RegistrationOutbox ──→ GraphSupervisor::register
//!                                               │
//!                                               ▼
//!                                       GraphOrchestrator (one per root)
//!                                         │  assign round, repair chain,
//!                                         │  sign, store
//!                                         ▼
//!                                       JobStateApi::observe ── Blockmainia ──→ OrderingEngine
//!                                                                                   │
//!                   Polished ←── InterpretedStore ←── BatchInterpreter ←── InterpretedSink
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Description |
//! |-----------|-------------|
//! | Bound identity | An orchestrator only ever handles its own root hash |
//! | Round monotonicity | Rounds within `(hash, node)` grow by one, at most one past the last interpreted round |
//! | No self dependency | A root never reaches the engine depending on its own author |
//! | Validate before append | Only structurally valid roots are appended |
//! | Interpret before polish | A refused batch leaves the job `Running` |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - signing payload, chain repair, structural validation
//! - `ports/` - `OrchestratorApi` (inbound); signer, engine, interpreter, outbox (outbound)
//! - `adapters/` - `Ed25519Signer`
//! - `service.rs` - the per-root actor
//! - `supervisor.rs` - arena of live orchestrators

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;
pub mod supervisor;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use adapters::Ed25519Signer;
pub use config::OrchestratorConfig;
pub use error::{
    EngineError, InterpretError, OrchestratorError, OrchestratorResult, SignerError,
    ValidationError,
};
pub use ports::{
    BatchInterpreter, EngineConfig, InterpretedSink, OrchestratorApi, OrderingEngine,
    OrderingEngineFactory, RegisterOutcome, RegistrationOutbox, Signature, SigningService,
};
pub use service::{GraphOrchestrator, OrchestratorContext, OrchestratorHandle};
pub use supervisor::GraphSupervisor;
