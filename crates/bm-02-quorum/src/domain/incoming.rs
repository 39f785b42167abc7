//! # Quorum Gate
//!
//! Pure job bookkeeping: the `incoming` predicate and the rules for creating
//! and refreshing a job from a freshly assembled root.

use shared_types::{BlockGraph, Hash, Job, JobState, NodeId};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Decide whether `next` brings `job` to quorum.
///
/// Returns [`JobState::Blockmainia`] when either
/// - `job.nodes` is non-empty and every one of them authored a dependency of `next`, or
/// - `job.waiting_on` is non-empty and every one of them authored a dependency of `next`.
///
/// Otherwise the job's current status.
pub fn incoming<A>(job: &Job<A>, next: &BlockGraph<A>) -> JobState {
    let authors = next.dependency_authors();
    let covered = |set: &[NodeId]| !set.is_empty() && set.iter().all(|n| authors.contains(n));

    if covered(&job.nodes) || covered(&job.waiting_on) {
        JobState::Blockmainia
    } else {
        job.status
    }
}

/// Parameters shared by job creation and refresh.
#[derive(Debug, Clone)]
pub struct JobContext<'a> {
    pub local: NodeId,
    /// Cluster members other than the local node.
    pub peers: &'a [NodeId],
    pub expected_total_nodes: usize,
    pub now: u64,
}

fn authors_of<A>(graph: &BlockGraph<A>) -> Vec<NodeId> {
    graph.dependency_authors().into_iter().collect()
}

/// Fresh job for a root seen for the first time, already gated.
pub fn new_job<A: Clone>(hash: Hash, root: &BlockGraph<A>, ctx: &JobContext<'_>) -> Job<A> {
    let mut job = Job {
        id: Uuid::new_v4(),
        hash,
        node: ctx.local,
        nodes: authors_of(root),
        waiting_on: ctx.peers.to_vec(),
        total_nodes: ctx.peers.len() + 1,
        expected_total_nodes: ctx.expected_total_nodes,
        status: JobState::Started,
        model: root.clone(),
        epoch: 0,
        updated_at: ctx.now,
    };
    apply_gate(&mut job, root);
    job
}

/// Refresh a non-locked job from the latest root.
///
/// Returns `false` (job unchanged) when the job is locked. The gate only
/// re-runs when `root` differs from the stored model under identity equality.
pub fn refresh_job<A: Clone>(
    job: &mut Job<A>,
    root: &BlockGraph<A>,
    ctx: &JobContext<'_>,
) -> bool {
    if job.status.is_locked() {
        return false;
    }

    let changed = job.model != *root;
    let nodes = authors_of(root);
    let total_nodes = ctx.peers.len() + 1;
    if changed || job.nodes != nodes || job.waiting_on != ctx.peers || job.total_nodes != total_nodes
    {
        job.updated_at = ctx.now;
    }
    job.nodes = nodes;
    job.waiting_on = ctx.peers.to_vec();
    job.total_nodes = total_nodes;

    if changed {
        job.model = root.clone();
        job.epoch += 1;
        apply_gate(job, root);
    }
    true
}

/// Gate on membership only. `nodes` was just taken from `root` itself, so it
/// is held out of the check; otherwise any single dependency would lock.
fn apply_gate<A>(job: &mut Job<A>, root: &BlockGraph<A>) {
    let seen = std::mem::take(&mut job.nodes);
    job.status = incoming(job, root);
    job.nodes = seen;
    if job.status.is_locked() {
        job.waiting_on.clear();
    }
}

/// Members still missing from `root`'s dependency authors.
pub fn missing_members<A>(peers: &[NodeId], root: &BlockGraph<A>) -> BTreeSet<NodeId> {
    let authors = root.dependency_authors();
    peers
        .iter()
        .filter(|peer| !authors.contains(peer))
        .copied()
        .collect()
}
