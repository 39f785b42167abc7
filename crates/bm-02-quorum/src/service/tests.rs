use super::*;
use crate::adapters::StaticMembership;
use crate::domain::as_dependency;
use bm_01_graph_storage::{GraphStorageService, KVStoreError, StoreError, StoreResult};
use shared_types::{BlockId, SignedPayload};
use std::sync::atomic::{AtomicBool, Ordering};

type Store = GraphStorageService<String>;

const H: Hash = [0x11; 32];

fn node(n: u8) -> NodeId {
    NodeId::repeat(n)
}

fn block(n: u8, round: u64) -> BlockId<String> {
    BlockId {
        hash: H,
        node: node(n),
        round,
        signed: SignedPayload::unsigned(format!("from {}", n)),
        previous_hash: None,
    }
}

fn record(n: u8, round: u64) -> BlockGraph<String> {
    BlockGraph::new(block(n, round))
}

fn machine(store: Arc<Store>, members: &[u8]) -> JobStateMachine<String> {
    let membership = StaticMembership::new(members.iter().map(|n| node(*n)).collect());
    JobStateMachine::new(
        QuorumConfig::for_node(node(1), members.len()),
        store.clone(),
        store,
        Arc::new(membership),
    )
}

// =============================================================================
// OBSERVE
// =============================================================================

#[tokio::test]
async fn test_new_root_without_dependencies_is_started() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2, 3]);
    store.put(&record(1, 1)).await.unwrap();

    let observation = jsm.observe(&H).await.unwrap().unwrap();
    assert!(observation.created);
    assert_eq!(observation.status, JobState::Started);

    let job = jsm.job(&H).await.unwrap().unwrap();
    assert_eq!(job.waiting_on, vec![node(2), node(3)]);
    assert_eq!(job.total_nodes, 3);
    assert_eq!(job.expected_total_nodes, 3);
    assert!(store.by_flags(false, false).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_scenario_a_dependencies_cover_cluster() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2, 3]);
    for n in [1, 2, 3] {
        store.put(&record(n, 1)).await.unwrap();
    }

    let observation = jsm.observe(&H).await.unwrap().unwrap();
    assert_eq!(observation.status, JobState::Blockmainia);
    assert_eq!(observation.root.deps.len(), 2);

    let job = jsm.job(&H).await.unwrap().unwrap();
    assert!(job.waiting_on.is_empty());
    assert_eq!(store.by_flags(true, false).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_foreign_records_only_yield_nothing() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2]);
    store.put(&record(2, 1)).await.unwrap();

    assert!(jsm.observe(&H).await.unwrap().is_none());
    assert!(jsm.job(&H).await.unwrap().is_none());
    assert_eq!(store.by_flags(false, false).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_late_dependency_folds_into_included_root() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2]);
    store.put(&record(1, 1)).await.unwrap();
    jsm.observe(&H).await.unwrap();

    store.put(&record(2, 1)).await.unwrap();
    let observation = jsm.observe(&H).await.unwrap().unwrap();

    assert!(!observation.created);
    assert_eq!(observation.root.deps.len(), 1);
    assert_eq!(observation.status, JobState::Blockmainia);
    let job = jsm.job(&H).await.unwrap().unwrap();
    assert_eq!(job.epoch, 1);
    assert!(job.waiting_on.is_empty());
}

#[tokio::test]
async fn test_partial_dependencies_do_not_lock() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2, 3]);
    store.put(&record(1, 1)).await.unwrap();
    store.put(&record(2, 1)).await.unwrap();

    let observation = jsm.observe(&H).await.unwrap().unwrap();
    assert_eq!(observation.status, JobState::Started);
    assert!(!jsm.mark_running(&H).await.unwrap());
    let job = jsm.job(&H).await.unwrap().unwrap();
    assert_eq!(job.nodes, vec![node(2)]);
    assert_eq!(job.waiting_on, vec![node(2), node(3)]);

    store.put(&record(3, 1)).await.unwrap();
    let observation = jsm.observe(&H).await.unwrap().unwrap();
    assert_eq!(observation.status, JobState::Blockmainia);
    assert!(jsm.job(&H).await.unwrap().unwrap().waiting_on.is_empty());
}

#[tokio::test]
async fn test_observe_is_idempotent() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2, 3]);
    store.put(&record(1, 1)).await.unwrap();

    jsm.observe(&H).await.unwrap();
    let once = jsm.job(&H).await.unwrap().unwrap();
    jsm.observe(&H).await.unwrap();
    let twice = jsm.job(&H).await.unwrap().unwrap();

    assert_eq!(once, twice);
}

#[tokio::test]
async fn test_locked_job_untouched_but_fragment_included() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2]);
    store.put(&record(1, 1)).await.unwrap();
    store.put(&record(2, 1)).await.unwrap();
    jsm.observe(&H).await.unwrap();
    assert!(jsm.mark_running(&H).await.unwrap());
    let locked = jsm.job(&H).await.unwrap().unwrap();

    let late = record(3, 1);
    store.put(&late).await.unwrap();
    let observation = jsm.observe(&H).await.unwrap().unwrap();

    assert_eq!(observation.status, JobState::Running);
    assert_eq!(jsm.job(&H).await.unwrap().unwrap(), locked);
    assert!(store.get(late.id).await.unwrap().unwrap().included);
    assert_eq!(observation.root.deps.len(), 2);
}

#[tokio::test]
async fn test_waiting_on_stays_empty_after_lock() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2]);
    store.put(&record(1, 1)).await.unwrap();
    store.put(&record(2, 1)).await.unwrap();
    jsm.observe(&H).await.unwrap();

    for state in [JobState::Queued, JobState::Dead, JobState::Running, JobState::Polished] {
        jsm.set_states(&[H], state).await;
        store.put(&record(2, 2)).await.ok();
        jsm.observe(&H).await.unwrap();
        let job = jsm.job(&H).await.unwrap().unwrap();
        assert!(job.status.is_locked());
        assert!(job.waiting_on.is_empty());
    }
}

// =============================================================================
// PERSISTENCE FAILURE
// =============================================================================

/// Job store whose writes fail while `failing` is set.
struct FlakyJobs {
    inner: Arc<Store>,
    failing: AtomicBool,
}

#[async_trait]
impl JobStore<String> for FlakyJobs {
    async fn get_job(&self, hash: &Hash) -> StoreResult<Option<Job<String>>> {
        self.inner.get_job(hash).await
    }

    async fn put_job(&self, job: &Job<String>) -> StoreResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(KVStoreError::IOError {
                message: "disk full".into(),
            }));
        }
        self.inner.put_job(job).await
    }

    async fn update_status(
        &self,
        hash: &Hash,
        next: JobState,
        updated_at: u64,
    ) -> StoreResult<StatusUpdate> {
        self.inner.update_status(hash, next, updated_at).await
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job<String>>> {
        self.inner.list_jobs().await
    }

    async fn delete_job(&self, hash: &Hash) -> StoreResult<bool> {
        self.inner.delete_job(hash).await
    }
}

#[tokio::test]
async fn test_failed_job_write_leaves_records_pending() {
    let store = Arc::new(Store::new_in_memory());
    let jobs = Arc::new(FlakyJobs {
        inner: store.clone(),
        failing: AtomicBool::new(true),
    });
    let jsm = JobStateMachine::new(
        QuorumConfig::for_node(node(1), 2),
        store.clone(),
        jobs.clone(),
        Arc::new(StaticMembership::new(vec![node(1), node(2)])),
    );
    store.put(&record(1, 1)).await.unwrap();
    store.put(&record(2, 1)).await.unwrap();

    assert!(jsm.observe(&H).await.is_err());
    assert!(jsm.job(&H).await.unwrap().is_none());
    assert_eq!(store.by_flags(false, false).await.unwrap().len(), 2);

    jobs.failing.store(false, Ordering::SeqCst);
    let observation = jsm.observe(&H).await.unwrap().unwrap();
    assert_eq!(observation.status, JobState::Blockmainia);
    assert!(store.by_flags(false, false).await.unwrap().is_empty());
}

// =============================================================================
// TRANSITIONS
// =============================================================================

#[tokio::test]
async fn test_mark_running_only_from_blockmainia() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2, 3]);
    store.put(&record(1, 1)).await.unwrap();
    jsm.observe(&H).await.unwrap();

    assert!(!jsm.mark_running(&H).await.unwrap());
    assert!(!jsm.mark_running(&[0u8; 32]).await.unwrap());
}

#[tokio::test]
async fn test_set_states_honours_transition_table() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2]);
    let other: Hash = [0x22; 32];

    store.put(&record(1, 1)).await.unwrap();
    store.put(&record(2, 1)).await.unwrap();
    jsm.observe(&H).await.unwrap();

    let mut pending = record(1, 1);
    pending.block.hash = other;
    store.put(&pending).await.unwrap();
    jsm.observe(&other).await.unwrap();

    let report = jsm.set_states(&[H, other, [0u8; 32]], JobState::Dead).await;
    assert_eq!(report.applied, vec![other]);
    assert_eq!(report.refused, vec![H]);
    assert_eq!(report.missing, vec![[0u8; 32]]);
    assert!(!report.all_applied());

    let report = jsm.set_states(&[H], JobState::Polished).await;
    assert!(report.all_applied());
    let report = jsm.set_states(&[H], JobState::Running).await;
    assert_eq!(report.refused, vec![H]);
}

// =============================================================================
// GARBAGE COLLECTION
// =============================================================================

#[tokio::test]
async fn test_collect_garbage_removes_stale_dead_and_polished() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = machine(store.clone(), &[1, 2]);
    let dead: Hash = [0x33; 32];
    let fresh_dead: Hash = [0x44; 32];

    for hash in [H, dead, fresh_dead] {
        let mut root = record(1, 1);
        root.block.hash = hash;
        root.deps.push(as_dependency(&record(2, 1)));
        store.put(&root).await.unwrap();
        jsm.observe(&hash).await.unwrap();
    }
    jsm.set_states(&[H], JobState::Polished).await;

    // Stale Dead job and a recent one
    for (hash, age) in [(dead, 10), (fresh_dead, 10_000)] {
        let mut job = store.get_job(&hash).await.unwrap().unwrap();
        job.status = JobState::Dead;
        job.updated_at = age;
        store.delete_job(&hash).await.unwrap();
        store.put_job(&job).await.unwrap();
    }
    let mut polished = store.get_job(&H).await.unwrap().unwrap();
    polished.updated_at = 10;
    store.put_job(&polished).await.unwrap();

    let report = jsm
        .collect_garbage(Duration::from_secs(1000), 10_500)
        .await
        .unwrap();

    assert_eq!(
        report,
        GcReport {
            dead_removed: 1,
            polished_removed: 1
        }
    );
    assert!(store.get_job(&dead).await.unwrap().is_none());
    assert!(store.by_hash(&dead).await.unwrap().is_empty());
    assert!(store.get_job(&fresh_dead).await.unwrap().is_some());
    assert!(store.get_job(&H).await.unwrap().is_none());
    assert!(!store.by_hash(&H).await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_garbage_collector_stops_on_shutdown() {
    let store = Arc::new(Store::new_in_memory());
    let jsm = Arc::new(machine(store, &[1]));
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(jsm.run_garbage_collector(rx));
    tokio::time::sleep(Duration::from_secs(900)).await;
    tx.send(true).unwrap();

    handle.await.unwrap();
}
