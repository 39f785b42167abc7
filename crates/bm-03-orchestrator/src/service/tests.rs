use super::*;
use crate::adapters::Ed25519Signer;
use crate::domain::verify_block;
use crate::ports::inbound::OrchestratorApi;
use crate::supervisor::GraphSupervisor;
use crate::test_utils::{node, Fixture, RecordingEngineFactory};
use bm_02_quorum::domain::as_dependency;
use shared_types::{BlockId, SignedPayload};
use std::time::Duration;

const H: Hash = [0x42; 32];

async fn signed_record(n: u8, round: u64) -> BlockGraph<String> {
    let signer = Ed25519Signer::from_seed(node(n).0);
    let mut block = BlockId {
        hash: H,
        node: node(n),
        round,
        signed: SignedPayload::unsigned(format!("from {}", n)),
        previous_hash: None,
    };
    sign_block(&mut block, &signer).await.unwrap();
    BlockGraph::new(block)
}

fn processed(outcome: RegisterOutcome) -> (usize, usize, Option<JobState>, bool) {
    match outcome {
        RegisterOutcome::Processed {
            accepted,
            rejected,
            status,
            appended,
        } => (accepted, rejected, status, appended),
        RegisterOutcome::Shutdown => panic!("unexpected shutdown"),
    }
}

async fn own_records(fixture: &Fixture) -> Vec<BlockGraph<String>> {
    let mut records: Vec<_> = fixture
        .store
        .by_hash(&H)
        .await
        .unwrap()
        .into_iter()
        .filter(|g| g.block.node == fixture.local)
        .collect();
    records.sort_by_key(|g| g.block.round);
    records
}

// =============================================================================
// ROUND ASSIGNMENT & SIGNING
// =============================================================================

#[tokio::test]
async fn test_draft_gets_first_round_and_signature() {
    let fixture = Fixture::new(node(1), &[1, 2, 3]);
    let supervisor = GraphSupervisor::new(fixture.context());

    supervisor
        .submit(BlockGraph::draft(H, node(1), "hello".to_string()))
        .await
        .unwrap();

    let records = own_records(&fixture).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].block.round, 1);
    assert!(records[0].prev.is_none());
    assert_eq!(verify_block(&records[0].block, fixture.signer.as_ref()), Ok(()));

    let job = fixture.quorum.job(&H).await.unwrap().unwrap();
    assert_eq!(job.status, JobState::Started);
}

#[tokio::test]
async fn test_round_ahead_of_interpretation_rejected() {
    let fixture = Fixture::new(node(1), &[1, 2]);
    let supervisor = GraphSupervisor::new(fixture.context());
    for text in ["a", "b"] {
        let draft = BlockGraph::draft(H, node(1), text.to_string());
        fixture.store.put(&draft).await.unwrap();
    }

    let outcome = supervisor.register(&H).await.unwrap();
    let (accepted, rejected, _, _) = processed(outcome);

    assert_eq!((accepted, rejected), (1, 1));
    assert_eq!(fixture.store.latest_round(&H, &node(1)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_rounds_increase_after_interpretation() {
    let fixture = Fixture::new(node(1), &[1]);
    let supervisor = GraphSupervisor::new(fixture.context());

    supervisor
        .submit(BlockGraph::draft(H, node(1), "first".to_string()))
        .await
        .unwrap();
    let first = own_records(&fixture).await.remove(0);

    let batch = InterpretedBatch {
        hash: H,
        round: 1,
        blocks: vec![first.block.clone()],
    };
    assert!(fixture.engines.emit(&H, batch).await);

    supervisor
        .submit(BlockGraph::draft(H, node(1), "second".to_string()))
        .await
        .unwrap();

    let records = own_records(&fixture).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].block.round, 2);
    assert_eq!(records[1].block.previous_hash, Some(first.block.signed.key));
    assert_eq!(fixture.store.last_round(&H).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unsigned_relay_is_deleted() {
    let fixture = Fixture::new(node(1), &[1, 2]);
    let supervisor = GraphSupervisor::new(fixture.context());
    let mut relay = BlockGraph::draft(H, node(2), "forged".to_string());
    relay.block.round = 1;
    fixture.store.put(&relay).await.unwrap();

    let (_, rejected, _, _) = processed(supervisor.register(&H).await.unwrap());

    assert_eq!(rejected, 1);
    assert!(fixture.store.get(relay.id).await.unwrap().is_none());
}

// =============================================================================
// CHAIN REPAIR (Scenario B)
// =============================================================================

#[tokio::test]
async fn test_scenario_b_gap_rejected_until_prev_links() {
    let fixture = Fixture::new(node(1), &[1, 2]);
    let interpreted: Vec<BlockId<String>> = {
        let mut blocks = Vec::new();
        for round in 1..=4 {
            blocks.push(signed_record(1, round).await.block);
        }
        blocks
    };
    fixture.store.append(&interpreted).await.unwrap();
    let supervisor = GraphSupervisor::new(fixture.context());

    let mut relay = signed_record(2, 5).await;
    fixture.store.put(&relay).await.unwrap();
    let (accepted, rejected, _, _) = processed(supervisor.register(&H).await.unwrap());
    assert_eq!((accepted, rejected), (0, 1));

    relay.prev = Some(signed_record(2, 4).await.block);
    fixture.store.put(&relay).await.unwrap();
    let (accepted, rejected, _, _) = processed(supervisor.register(&H).await.unwrap());
    assert_eq!((accepted, rejected), (1, 0));

    let stored = fixture.store.get(relay.id).await.unwrap().unwrap();
    assert_eq!(stored.prev.map(|p| p.round), Some(4));
}

// =============================================================================
// QUORUM HANDOFF (Scenario A)
// =============================================================================

#[tokio::test]
async fn test_scenario_a_quorate_root_reaches_engine() {
    let fixture = Fixture::new(node(1), &[1, 2, 3]);
    for n in [2, 3] {
        fixture.store.put(&signed_record(n, 1).await).await.unwrap();
    }
    let supervisor = GraphSupervisor::new(fixture.context());

    supervisor
        .submit(BlockGraph::draft(H, node(1), "mine".to_string()))
        .await
        .unwrap();

    let job = fixture.quorum.job(&H).await.unwrap().unwrap();
    assert_eq!(job.status, JobState::Running);
    assert!(job.waiting_on.is_empty());

    let appended = fixture.engines.appended();
    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].block.node, node(1));
    assert_eq!(appended[0].dependency_authors().len(), 2);

    let configs = fixture.engines.configs();
    assert_eq!(configs.len(), 1);
    assert_eq!(configs[0].hash, H);
    assert_eq!(configs[0].cluster_size, 3);
}

#[tokio::test]
async fn test_root_is_appended_once() {
    let fixture = Fixture::new(node(1), &[1, 2]);
    fixture.store.put(&signed_record(2, 1).await).await.unwrap();
    let supervisor = GraphSupervisor::new(fixture.context());

    supervisor
        .submit(BlockGraph::draft(H, node(1), "mine".to_string()))
        .await
        .unwrap();
    let (_, _, status, appended) = processed(supervisor.register(&H).await.unwrap());

    assert_eq!(status, Some(JobState::Running));
    assert!(!appended);
    assert_eq!(fixture.engines.appended().len(), 1);
}

#[tokio::test]
async fn test_self_dependency_never_reaches_engine() {
    let fixture = Fixture::new(node(1), &[1, 2]);
    let mut root = signed_record(1, 1).await;
    root.deps.push(as_dependency(&signed_record(1, 1).await));
    root.deps.push(as_dependency(&signed_record(2, 1).await));
    fixture.store.put(&root).await.unwrap();
    let supervisor = GraphSupervisor::new(fixture.context());

    let (_, rejected, status, appended) = processed(supervisor.register(&H).await.unwrap());

    assert_eq!(status, Some(JobState::Blockmainia));
    assert_eq!(rejected, 1);
    assert!(!appended);
    assert!(fixture.engines.appended().is_empty());
}

// =============================================================================
// INTERPRETED BATCHES (Scenario D)
// =============================================================================

async fn wait_until_retired(supervisor: &GraphSupervisor<String>) {
    for _ in 0..100 {
        if supervisor.live() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("orchestrator still live");
}

#[tokio::test]
async fn test_scenario_d_refused_batch_keeps_job_running() {
    let fixture = Fixture::new(node(1), &[1, 2]);
    fixture.store.put(&signed_record(2, 1).await).await.unwrap();
    let supervisor = GraphSupervisor::new(fixture.context());
    supervisor
        .submit(BlockGraph::draft(H, node(1), "mine".to_string()))
        .await
        .unwrap();
    let root = fixture.engines.appended().remove(0);
    let batch = InterpretedBatch {
        hash: H,
        round: 1,
        blocks: vec![root.block.clone()],
    };

    fixture.interpreter.set_refusing(true);
    fixture.engines.emit(&H, batch.clone()).await;
    let (_, _, status, _) = processed(supervisor.register(&H).await.unwrap());

    assert_eq!(status, Some(JobState::Running));
    assert_eq!(fixture.interpreter.calls(), 1);
    assert!(fixture.store.interpreted(&H).await.unwrap().is_empty());

    fixture.interpreter.set_refusing(false);
    fixture.engines.emit(&H, batch).await;
    wait_until_retired(&supervisor).await;

    let job = fixture.quorum.job(&H).await.unwrap().unwrap();
    assert_eq!(job.status, JobState::Polished);
    assert_eq!(fixture.store.last_round(&H).await.unwrap(), 1);
}

#[tokio::test]
async fn test_auto_interpreting_engine_polishes_root() {
    let fixture = Fixture::with_engines(
        node(1),
        &[1, 2],
        RecordingEngineFactory::auto_interpreting(),
    );
    fixture.store.put(&signed_record(2, 1).await).await.unwrap();
    let supervisor = GraphSupervisor::new(fixture.context());

    supervisor
        .submit(BlockGraph::draft(H, node(1), "mine".to_string()))
        .await
        .unwrap();
    wait_until_retired(&supervisor).await;

    let job = fixture.quorum.job(&H).await.unwrap().unwrap();
    assert_eq!(job.status, JobState::Polished);

    // A late registration spins up a fresh orchestrator that finds nothing to do
    let (_, _, status, appended) = processed(supervisor.register(&H).await.unwrap());
    assert_eq!(status, Some(JobState::Polished));
    assert!(!appended);
}

// =============================================================================
// IDENTITY
// =============================================================================

#[tokio::test]
async fn test_identity_mismatch_shuts_down() {
    let fixture = Fixture::new(node(1), &[1]);
    let (handle, task) = GraphOrchestrator::spawn(H, Arc::new(fixture.context()));

    let outcome = handle.register([0x43; 32]).await.unwrap();
    assert_eq!(outcome, RegisterOutcome::Shutdown);

    task.await.unwrap();
    assert!(handle.is_closed());
    assert!(matches!(
        handle.register(H).await,
        Err(OrchestratorError::Stopped(_))
    ));
}
