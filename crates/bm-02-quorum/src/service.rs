//! Job State Machine - one quorum record per root hash
//!
//! `observe` folds a root's pending records into the local root (via the
//! dependency assembler), then creates or refreshes the root's job and gates
//! it with [`incoming`](crate::domain::incoming). Records are flagged
//! `included` only after the job is persisted, so a failed write leaves them
//! pending for the next observation.

use crate::config::QuorumConfig;
use crate::domain::{assemble, bucket_by_hash, missing_members, new_job, refresh_job, JobContext};
use crate::error::QuorumResult;
use crate::ports::inbound::{JobStateApi, Observation, SetStatesReport};
use crate::ports::outbound::Membership;
use async_trait::async_trait;
use bm_01_graph_storage::{BlockGraphStore, JobStore, StatusUpdate};
use bm_telemetry::{JOB_TRANSITIONS, QUORUM_REACHED};
use shared_types::{
    hash_hex, unix_now, Attachment, BlockGraph, GraphKey, Hash, Job, JobState, NodeId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Outcome of one garbage collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcReport {
    /// Dead jobs removed together with their graphs
    pub dead_removed: usize,
    /// Polished jobs removed (graphs kept)
    pub polished_removed: usize,
}

/// Quorum bookkeeping over the graph and job stores.
pub struct JobStateMachine<A: Attachment> {
    config: QuorumConfig,
    graphs: Arc<dyn BlockGraphStore<A>>,
    jobs: Arc<dyn JobStore<A>>,
    membership: Arc<dyn Membership>,
}

impl<A: Attachment> JobStateMachine<A> {
    pub fn new(
        config: QuorumConfig,
        graphs: Arc<dyn BlockGraphStore<A>>,
        jobs: Arc<dyn JobStore<A>>,
        membership: Arc<dyn Membership>,
    ) -> Self {
        Self {
            config,
            graphs,
            jobs,
            membership,
        }
    }

    pub fn node_id(&self) -> NodeId {
        self.config.node_id
    }

    async fn peers(&self) -> Vec<NodeId> {
        let local = self.config.node_id;
        let mut peers: Vec<NodeId> = self
            .membership
            .members()
            .await
            .into_iter()
            .filter(|member| *member != local)
            .collect();
        peers.sort();
        peers.dedup();
        peers
    }

    /// Pending records of `hash`, anchored on the latest local record when no
    /// local record is pending. Drafts without an assigned round are skipped.
    async fn pending_bucket(&self, hash: &Hash) -> QuorumResult<Vec<BlockGraph<A>>> {
        let local = self.config.node_id;
        let mut bucket = self.graphs.by_hash_with_flags(hash, false, false).await?;
        bucket.retain(|g| g.block.round > 0);

        if !bucket.iter().any(|g| g.block.node == local) {
            let latest = self.graphs.latest_round(hash, &local).await?;
            if latest > 0 {
                let key = GraphKey {
                    hash: *hash,
                    node: local,
                    round: latest,
                };
                if let Some(anchor) = self.graphs.find(&key).await? {
                    bucket.push(anchor);
                }
            }
        }
        Ok(bucket)
    }

    /// Remove stale Dead jobs (with their graphs) and stale Polished jobs.
    pub async fn collect_garbage(&self, max_age: Duration, now: u64) -> QuorumResult<GcReport> {
        let mut report = GcReport::default();
        let cutoff = now.saturating_sub(max_age.as_secs());

        for job in self.jobs.list_jobs().await? {
            if job.updated_at >= cutoff {
                continue;
            }
            match job.status {
                JobState::Dead => {
                    let graphs = self.graphs.delete_by_hash(&job.hash).await?;
                    self.jobs.delete_job(&job.hash).await?;
                    debug!(hash = %hash_hex(&job.hash), graphs, "[bm-02] Dead job collected");
                    report.dead_removed += 1;
                }
                JobState::Polished => {
                    self.jobs.delete_job(&job.hash).await?;
                    report.polished_removed += 1;
                }
                _ => {}
            }
        }

        if report != GcReport::default() {
            info!(
                dead = report.dead_removed,
                polished = report.polished_removed,
                "[bm-02] Garbage collection pass complete"
            );
        }
        Ok(report)
    }

    /// Run `collect_garbage` every `gc_interval` until shutdown is signalled.
    pub async fn run_garbage_collector(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.gc_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.collect_garbage(self.config.job_max_age, unix_now()).await {
                        warn!(error = %e, "[bm-02] Garbage collection failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("[bm-02] Garbage collector stopping");
                        break;
                    }
                }
            }
        }
    }

    async fn persist_job(&self, job: &Job<A>) -> QuorumResult<()> {
        if let Err(e) = self.jobs.put_job(job).await {
            error!(
                hash = %hash_hex(&job.hash),
                error = %e,
                "[bm-02] Failed to persist job, decision discarded"
            );
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl<A: Attachment> JobStateApi<A> for JobStateMachine<A> {
    async fn observe(&self, hash: &Hash) -> QuorumResult<Option<Observation<A>>> {
        let local = self.config.node_id;
        let bucket = self.pending_bucket(hash).await?;
        if bucket.is_empty() {
            return Ok(None);
        }

        let Some(assembled) = assemble(bucket_by_hash(bucket), &local).into_iter().next() else {
            debug!(hash = %hash_hex(hash), "[bm-02] No local record to root on yet");
            return Ok(None);
        };
        let root = assembled.root;

        self.graphs.put(&root).await?;

        let peers = self.peers().await;
        let ctx = JobContext {
            local,
            peers: &peers,
            expected_total_nodes: self.config.expected_total_nodes,
            now: unix_now(),
        };

        let (previous, status) = match self.jobs.get_job(hash).await? {
            None => {
                let job = new_job(*hash, &root, &ctx);
                self.persist_job(&job).await?;
                (None, job.status)
            }
            Some(mut job) => {
                let previous = job.status;
                if refresh_job(&mut job, &root, &ctx) {
                    self.persist_job(&job).await?;
                } else {
                    debug!(
                        hash = %hash_hex(hash),
                        status = %job.status,
                        "[bm-02] Job locked, fragment stored only"
                    );
                }
                (Some(previous), job.status)
            }
        };

        self.graphs.set_included(&assembled.consumed).await?;

        if previous != Some(status) {
            JOB_TRANSITIONS.with_label_values(&[status.as_str()]).inc();
        }
        if status == JobState::Blockmainia && previous != Some(JobState::Blockmainia) {
            QUORUM_REACHED.inc();
            info!(hash = %hash_hex(hash), deps = root.deps.len(), "[bm-02] Quorum reached");
        } else {
            debug!(
                hash = %hash_hex(hash),
                status = %status,
                missing = missing_members(&peers, &root).len(),
                "[bm-02] Job updated"
            );
        }

        Ok(Some(Observation {
            root,
            status,
            created: previous.is_none(),
        }))
    }

    async fn job(&self, hash: &Hash) -> QuorumResult<Option<Job<A>>> {
        Ok(self.jobs.get_job(hash).await?)
    }

    async fn mark_running(&self, hash: &Hash) -> QuorumResult<bool> {
        match self.jobs.get_job(hash).await? {
            Some(job) if job.status == JobState::Blockmainia => {}
            _ => return Ok(false),
        }
        let update = self
            .jobs
            .update_status(hash, JobState::Running, unix_now())
            .await?;
        let applied = matches!(
            update,
            StatusUpdate::Applied {
                from: JobState::Blockmainia
            }
        );
        if applied {
            JOB_TRANSITIONS.with_label_values(&["running"]).inc();
        }
        Ok(applied)
    }

    async fn set_states(&self, hashes: &[Hash], state: JobState) -> SetStatesReport {
        let mut report = SetStatesReport::default();
        let now = unix_now();

        for hash in hashes {
            match self.jobs.update_status(hash, state, now).await {
                Ok(StatusUpdate::Applied { .. }) => report.applied.push(*hash),
                Ok(StatusUpdate::Refused { from }) => {
                    debug!(
                        hash = %hash_hex(hash),
                        from = %from,
                        to = %state,
                        "[bm-02] Transition refused"
                    );
                    report.refused.push(*hash);
                }
                Ok(StatusUpdate::Missing) => report.missing.push(*hash),
                Err(e) => {
                    error!(hash = %hash_hex(hash), error = %e, "[bm-02] Failed to set job state");
                    report.failed.push(*hash);
                }
            }
        }

        if !report.applied.is_empty() {
            JOB_TRANSITIONS
                .with_label_values(&[state.as_str()])
                .inc_by(report.applied.len() as f64);
        }
        report
    }
}

#[cfg(test)]
mod tests;
