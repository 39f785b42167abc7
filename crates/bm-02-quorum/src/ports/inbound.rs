//! # Inbound Ports (Driving Ports)
//!
//! API the orchestrator and gossip replicator drive the job state machine with.

use async_trait::async_trait;
use shared_types::{Attachment, BlockGraph, Hash, Job, JobState};

use crate::error::QuorumResult;

/// Result of folding a root's pending records into its job.
#[derive(Debug, Clone)]
pub struct Observation<A> {
    /// The reconstructed root as persisted.
    pub root: BlockGraph<A>,
    /// Job status after the observation.
    pub status: JobState,
    /// Whether this observation created the job.
    pub created: bool,
}

/// Outcome of a bulk status transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SetStatesReport {
    pub applied: Vec<Hash>,
    /// Hashes whose stored status does not allow the transition.
    pub refused: Vec<Hash>,
    pub missing: Vec<Hash>,
    /// Hashes whose update failed in the store.
    pub failed: Vec<Hash>,
}

impl SetStatesReport {
    pub fn all_applied(&self) -> bool {
        self.refused.is_empty() && self.missing.is_empty() && self.failed.is_empty()
    }
}

/// Job state machine API.
#[async_trait]
pub trait JobStateApi<A: Attachment>: Send + Sync {
    /// Fold every pending record of `hash` into the local root and gate its job.
    ///
    /// `None` when there is no local record to root the graph on.
    async fn observe(&self, hash: &Hash) -> QuorumResult<Option<Observation<A>>>;

    async fn job(&self, hash: &Hash) -> QuorumResult<Option<Job<A>>>;

    /// `Blockmainia -> Running`. Returns whether the transition happened.
    async fn mark_running(&self, hash: &Hash) -> QuorumResult<bool>;

    /// Bulk transition, skipping hashes whose current state forbids it.
    async fn set_states(&self, hashes: &[Hash], state: JobState) -> SetStatesReport;
}
