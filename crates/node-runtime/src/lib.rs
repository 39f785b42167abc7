//! # Blockmania Node Runtime
//!
//! Wires every subsystem of one node together.
//!
//! ## Architecture
//!
//! ```text
//!                 ┌─────────────────────────────────────────────┐
//!  submit(draft) ─┤ bm-03 GraphSupervisor                       │
//!                 │   └─ DeliveryOutbox ══ bm-04 ══╗            │
//!                 │                                ▼            │
//!  peer push ────▶│ bm-05 GossipEndpoint ─ OutboxSink ─▶ SupervisorHandler
//!                 │                                             │
//!                 │ bm-02 JobStateMachine ◀─ orchestrators      │
//!                 │ bm-01 GraphStorageService (memory/RocksDB)  │
//!                 │ bm-05 GossipReplicator ──────────────────────▶ peers
//!                 └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let config = NodeConfig::from_env()?;
//! let _telemetry = bm_telemetry::init_telemetry(config.telemetry.clone()).await?;
//! let runtime = NodeRuntime::build(config, Collaborators { engines, interpreter, transport })?;
//! runtime.start().await?;
//! runtime.submit(BlockGraph::draft(hash, runtime.node_id(), attachment)).await?;
//! runtime.shutdown().await;
//! ```

pub mod adapters;
pub mod config;
pub mod container;

pub use config::{ConfigError, NodeConfig, SigningSeed};
pub use container::{Collaborators, NodeRuntime};
