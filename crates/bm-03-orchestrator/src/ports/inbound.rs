//! # Inbound Ports (Driving Ports)
//!
//! API the reliable delivery receiver, gossip endpoint, and local clients
//! drive the supervisor with.

use crate::error::OrchestratorResult;
use async_trait::async_trait;
use shared_types::{Attachment, BlockGraph, Hash, JobState, RegisterMessage};

/// Reply to a registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// Pending fragments were handled.
    Processed {
        accepted: usize,
        rejected: usize,
        /// Job status afterwards, if the root has a job.
        status: Option<JobState>,
        /// Whether the root was handed to the ordering engine.
        appended: bool,
    },
    /// The registration named a different root; the orchestrator stopped.
    Shutdown,
}

/// Supervisor API.
#[async_trait]
pub trait OrchestratorApi<A: Attachment>: Send + Sync {
    /// Register a root from its raw 32-byte hash.
    async fn register(&self, bytes: &[u8]) -> OrchestratorResult<RegisterOutcome>;

    async fn register_message(&self, message: RegisterMessage)
        -> OrchestratorResult<RegisterOutcome>;

    /// Store a local draft and queue its root for registration.
    async fn submit(&self, draft: BlockGraph<A>) -> OrchestratorResult<()>;

    /// Stop the orchestrator of `hash`. Returns whether one was live.
    async fn retire(&self, hash: &Hash) -> bool;

    /// Stop every orchestrator and wait for them to finish.
    async fn shutdown(&self);
}
