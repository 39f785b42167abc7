//! # Gossip Replicator
//!
//! Pushes every fragment this node authored that quorum bookkeeping has
//! folded in (`included`) but no peer has confirmed yet (`!replied`).
//!
//! ## Per batch
//!
//! - Pushed to every peer at once through a worker pool sized to the peer count.
//! - Any failed push: the batch's jobs go `Dead`, fragments stay unreplied.
//! - Otherwise the hashes every peer accepted go `Queued` and their
//!   fragments are marked `replied`; the rest are retried next pass.
//!
//! Locked jobs (`Blockmainia` and later) keep their state either way.

use async_trait::async_trait;
use bm_01_graph_storage::BlockGraphStore;
use bm_02_quorum::JobStateApi;
use bm_telemetry::{log_event, metric_inc, time_histogram, GOSSIP_PUSHES, GOSSIP_PUSH_DURATION};
use futures::stream::{self, StreamExt};
use shared_types::{hash_hex, Attachment, BlockGraph, GossipBatch, GossipReply, Hash, JobState, NodeId};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::GossipConfig;
use crate::domain::{confirmed_hashes, plan_batches};
use crate::error::GossipResult;
use crate::ports::inbound::{ReplicationReport, ReplicatorApi};
use crate::ports::outbound::{PeerDirectory, PeerTransport};

pub struct GossipReplicator<A: Attachment> {
    node: NodeId,
    config: GossipConfig,
    graphs: Arc<dyn BlockGraphStore<A>>,
    quorum: Arc<dyn JobStateApi<A>>,
    peers: Arc<dyn PeerDirectory>,
    transport: Arc<dyn PeerTransport<A>>,
    /// Serializes job-state writes.
    states: Mutex<()>,
    /// Serializes `replied` flag writes.
    replies: Mutex<()>,
}

impl<A: Attachment> GossipReplicator<A> {
    pub fn new(
        node: NodeId,
        config: GossipConfig,
        graphs: Arc<dyn BlockGraphStore<A>>,
        quorum: Arc<dyn JobStateApi<A>>,
        peers: Arc<dyn PeerDirectory>,
        transport: Arc<dyn PeerTransport<A>>,
    ) -> Self {
        Self {
            node,
            config,
            graphs,
            quorum,
            peers,
            transport,
            states: Mutex::new(()),
            replies: Mutex::new(()),
        }
    }

    /// Push one batch to every peer. `Err` carries the first failure.
    async fn fan_out(&self, batch: &GossipBatch<A>) -> Result<Vec<GossipReply>, String> {
        let peers = self.peers.peers();
        let workers = peers.len().max(1);
        let results: Vec<_> = stream::iter(peers)
            .map(|peer| async move {
                let _timer = time_histogram!(GOSSIP_PUSH_DURATION);
                let result = self.transport.push(&peer, batch).await;
                (peer, result)
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut replies = Vec::with_capacity(results.len());
        let mut failure = None;
        for (peer, result) in results {
            match result {
                Ok(reply) => {
                    metric_inc!(GOSSIP_PUSHES, &["ok"]);
                    replies.push(reply);
                }
                Err(e) => {
                    metric_inc!(GOSSIP_PUSHES, &["failed"]);
                    warn!(peer = %peer.address, error = %e, "[bm-05] push failed");
                    failure.get_or_insert_with(|| e.to_string());
                }
            }
        }
        match failure {
            Some(reason) => Err(reason),
            None => Ok(replies),
        }
    }

    async fn set_states(&self, hashes: &[Hash], state: JobState) {
        if hashes.is_empty() {
            return;
        }
        let _guard = self.states.lock().await;
        let report = self.quorum.set_states(hashes, state).await;
        if !report.failed.is_empty() {
            warn!(
                state = %state,
                failed = report.failed.len(),
                "[bm-05] job state update failed"
            );
        }
        debug!(
            state = %state,
            applied = report.applied.len(),
            skipped = report.refused.len() + report.missing.len(),
            "[bm-05] job states updated"
        );
    }

    async fn mark_replied(&self, fragments: &[BlockGraph<A>], confirmed: &[Hash]) -> GossipResult<usize> {
        let ids: Vec<_> = fragments
            .iter()
            .filter(|g| confirmed.contains(&g.block.hash))
            .map(|g| g.id)
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let _guard = self.replies.lock().await;
        Ok(self.graphs.set_replied(&ids).await?)
    }

    /// Replicate on a fixed interval until `shutdown` flips.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log_event!(info, "gossip", "[bm-05] replicator started", node = %self.node);
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.replicate_once().await {
                        warn!(error = %e, "[bm-05] replication pass failed");
                    }
                }
            }
        }
        info!(node = %self.node, "[bm-05] replicator stopped");
    }
}

#[async_trait]
impl<A: Attachment> ReplicatorApi for GossipReplicator<A> {
    async fn replicate_once(&self) -> GossipResult<ReplicationReport> {
        let mut report = ReplicationReport::default();
        if self.peers.peers().is_empty() {
            return Ok(report);
        }

        let local: Vec<_> = self
            .graphs
            .by_flags(true, false)
            .await?
            .into_iter()
            .filter(|g| g.block.node == self.node)
            .collect();
        if local.is_empty() {
            return Ok(report);
        }

        for fragments in plan_batches(local, self.config.batch_size) {
            let batch = GossipBatch {
                sender: self.node,
                fragments,
            };
            let hashes = batch.hashes();
            report.batches += 1;
            report.fragments += batch.fragments.len();

            match self.fan_out(&batch).await {
                Err(reason) => {
                    warn!(
                        hashes = hashes.len(),
                        reason = %reason,
                        "[bm-05] batch not delivered, jobs marked dead"
                    );
                    self.set_states(&hashes, JobState::Dead).await;
                    report.failed.extend(hashes);
                }
                Ok(replies) => {
                    let confirmed: Vec<Hash> = confirmed_hashes(&hashes, &replies).into_iter().collect();
                    self.set_states(&confirmed, JobState::Queued).await;
                    report.replied += self.mark_replied(&batch.fragments, &confirmed).await?;
                    for hash in &confirmed {
                        debug!(hash = %hash_hex(hash), "[bm-05] fragment confirmed by all peers");
                    }
                    report.confirmed.extend(confirmed);
                }
            }
        }

        info!(
            batches = report.batches,
            fragments = report.fragments,
            replied = report.replied,
            failed = report.failed.len(),
            "[bm-05] replication pass complete"
        );
        Ok(report)
    }
}
