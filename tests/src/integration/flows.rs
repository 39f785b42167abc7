//! # Multi-Node Flows
//!
//! ```text
//! node 1 submit ─→ sign, store ─→ gossip ─→ node 2 endpoint ─→ register
//!                                                         │
//! node 2 submit ─→ sign, store ─→ fold node 1 dep ─→ Blockmainia ─→ engine
//!                                                         │
//!                                     interpreted batch ─→ Polished
//! ```
//!
//! ## Test Categories
//!
//! 1. **Happy Path**: every member drafts, every member polishes
//! 2. **Late Draft**: peer fragments wait for the local draft to anchor on
//! 3. **Partition**: quorum only forms once the missing member is reachable
//! 4. **Interpretation**: a refused batch holds one node at `Running`

use super::cluster::Cluster;
use bm_01_graph_storage::BlockGraphStore;
use bm_02_quorum::JobStateApi;
use bm_03_orchestrator::test_utils::node;
use bm_03_orchestrator::OrchestratorApi;
use shared_types::{Hash, JobState};
use std::time::Duration;

const H: Hash = [0x5A; 32];

// =============================================================================
// HAPPY PATH
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_two_nodes_polish_shared_root() {
    let cluster = Cluster::start(2).await;

    cluster.submit(1, H).await;
    cluster.submit(2, H).await;

    for n in [1, 2] {
        cluster.wait_for(n, &H, JobState::Polished).await;
        assert_eq!(cluster.interpreted_rounds(n, &H).await, vec![1]);

        let appended = cluster.member(n).engines.appended();
        assert_eq!(appended.len(), 1, "node {n} appended more than once");
        let root = &appended[0];
        assert_eq!(root.block.node, node(n));
        assert!(root.block.signed.is_signed());
        let peer = if n == 1 { 2 } else { 1 };
        assert!(root.dependency_authors().contains(&node(peer)));
    }

    cluster.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_three_nodes_reach_quorum() {
    let cluster = Cluster::start(3).await;

    for n in 1..=3 {
        cluster.submit(n, H).await;
    }
    for n in 1..=3 {
        cluster.wait_for(n, &H, JobState::Polished).await;
        let job = cluster
            .member(n)
            .runtime
            .quorum()
            .job(&H)
            .await
            .unwrap()
            .unwrap();
        assert!(job.waiting_on.is_empty());
    }

    cluster.shutdown().await;
}

// =============================================================================
// LATE DRAFT
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_peer_fragment_waits_for_local_draft() {
    let cluster = Cluster::start(2).await;

    cluster.submit(1, H).await;
    cluster.wait_for_fragment(2, &H, node(1)).await;

    // Nothing local to root on yet
    assert_eq!(cluster.status(2, &H).await, None);
    assert!(cluster.member(2).engines.appended().is_empty());

    cluster.submit(2, H).await;
    cluster.wait_for(2, &H, JobState::Polished).await;
    cluster.wait_for(1, &H, JobState::Polished).await;

    cluster.shutdown().await;
}

// =============================================================================
// PARTITION
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_partitioned_member_delays_quorum() {
    let cluster = Cluster::start(3).await;
    cluster.network.partition("node-3");

    cluster.submit(1, H).await;
    cluster.submit(2, H).await;
    cluster.wait_for_fragment(1, &H, node(2)).await;
    cluster.wait_for_fragment(2, &H, node(1)).await;

    tokio::time::sleep(Duration::from_millis(200)).await;
    for n in [1, 2] {
        let status = cluster.status(n, &H).await;
        assert!(
            !status.is_some_and(|s| s.is_locked()),
            "node {n} locked without node 3: {status:?}"
        );
    }

    cluster.network.heal("node-3");
    cluster.submit(3, H).await;

    for n in 1..=3 {
        cluster.wait_for(n, &H, JobState::Polished).await;
    }

    cluster.shutdown().await;
}

// =============================================================================
// INTERPRETATION
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_refused_batch_holds_only_that_node() {
    let cluster = Cluster::start(2).await;
    cluster.member(2).interpreter.set_refusing(true);

    cluster.submit(1, H).await;
    cluster.submit(2, H).await;

    cluster.wait_for(1, &H, JobState::Polished).await;
    cluster.wait_for(2, &H, JobState::Running).await;
    assert!(cluster.interpreted_rounds(2, &H).await.is_empty());
    assert!(cluster.member(2).interpreter.calls() >= 1);

    cluster.shutdown().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_malformed_registration_is_refused() {
    let cluster = Cluster::start(2).await;

    let result = cluster.member(1).runtime.supervisor().register(&[1, 2, 3]).await;
    assert!(result.is_err());
    assert!(cluster
        .member(1)
        .runtime
        .store()
        .by_hash(&H)
        .await
        .unwrap()
        .is_empty());

    cluster.shutdown().await;
}
