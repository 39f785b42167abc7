//! # Inbound Ports (Driving Ports)
//!
//! Store APIs consumed by the quorum, orchestrator, and gossip subsystems.

use async_trait::async_trait;
use shared_types::{Attachment, BlockGraph, BlockId, GraphKey, Hash, Job, JobState, NodeId};
use uuid::Uuid;

use crate::error::StoreResult;

/// Durable storage for block-graph records.
#[async_trait]
pub trait BlockGraphStore<A: Attachment>: Send + Sync {
    /// Record by id.
    async fn get(&self, id: Uuid) -> StoreResult<Option<BlockGraph<A>>>;

    /// Record by natural key `(hash, node, round)`.
    async fn find(&self, key: &GraphKey) -> StoreResult<Option<BlockGraph<A>>>;

    /// Highest round stored for `(hash, node)`, zero when there is none.
    async fn latest_round(&self, hash: &Hash, node: &NodeId) -> StoreResult<u64>;

    /// Upsert by id.
    ///
    /// Fails with `Conflict` when a different record already holds the
    /// natural key. Flags already set on the stored record stay set.
    async fn put(&self, graph: &BlockGraph<A>) -> StoreResult<()>;

    /// Every record of a root.
    async fn by_hash(&self, hash: &Hash) -> StoreResult<Vec<BlockGraph<A>>>;

    /// Records of a root with the given flag values.
    async fn by_hash_with_flags(
        &self,
        hash: &Hash,
        included: bool,
        replied: bool,
    ) -> StoreResult<Vec<BlockGraph<A>>>;

    /// Records across all roots with the given flag values.
    async fn by_flags(&self, included: bool, replied: bool) -> StoreResult<Vec<BlockGraph<A>>>;

    /// Set `included` on each record still holding `false`. Returns how many flipped.
    async fn set_included(&self, ids: &[Uuid]) -> StoreResult<usize>;

    /// Set `replied` on each record still holding `false`. Returns how many flipped.
    async fn set_replied(&self, ids: &[Uuid]) -> StoreResult<usize>;

    /// Remove one record. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Remove every record of a root. Returns how many were removed.
    async fn delete_by_hash(&self, hash: &Hash) -> StoreResult<usize>;
}

/// Outcome of a stored status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Transition applied; carries the previous state.
    Applied { from: JobState },
    /// Stored state does not allow the transition; nothing written.
    Refused { from: JobState },
    /// No job for the hash.
    Missing,
}

/// Durable storage for quorum jobs, one per root hash.
#[async_trait]
pub trait JobStore<A: Attachment>: Send + Sync {
    async fn get_job(&self, hash: &Hash) -> StoreResult<Option<Job<A>>>;

    /// Insert or replace the job for `job.hash`.
    ///
    /// Fails with `IllegalTransition` when the stored status cannot move to
    /// `job.status`.
    async fn put_job(&self, job: &Job<A>) -> StoreResult<()>;

    /// Compare-and-set the status of one job, stamping `updated_at`.
    async fn update_status(
        &self,
        hash: &Hash,
        next: JobState,
        updated_at: u64,
    ) -> StoreResult<StatusUpdate>;

    async fn list_jobs(&self) -> StoreResult<Vec<Job<A>>>;

    async fn delete_job(&self, hash: &Hash) -> StoreResult<bool>;
}

/// Durable record of blocks returned by the ordering engine.
#[async_trait]
pub trait InterpretedStore<A: Attachment>: Send + Sync {
    /// Record interpreted blocks. Re-recording the same block is a no-op.
    async fn append(&self, blocks: &[BlockId<A>]) -> StoreResult<()>;

    /// Highest interpreted round for a root, zero when nothing was interpreted.
    async fn last_round(&self, hash: &Hash) -> StoreResult<u64>;

    /// Interpreted blocks of a root ordered by round.
    async fn interpreted(&self, hash: &Hash) -> StoreResult<Vec<BlockId<A>>>;
}
