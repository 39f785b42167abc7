//! # Graph Storage Service
//!
//! Implements the block-graph, job, and interpreted-block stores over one
//! shared key-value backend.
//!
//! Read-modify-write sequences (natural-key conflict checks, flag flips,
//! status transitions) run under a single write lock and land in one atomic
//! batch, so concurrent callers never observe a half-written record.

use async_trait::async_trait;
use bm_telemetry::GRAPHS_STORED;
use parking_lot::Mutex;
use shared_types::{Attachment, BlockGraph, BlockId, GraphKey, Hash, Job, JobState, NodeId};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapters::{open_backend, InMemoryKVStore};
use crate::config::StorageConfig;
use crate::domain::codec::{decode, encode};
use crate::domain::keys::{natural_key_round, trailing_id, KeyPrefix};
use crate::error::{StoreError, StoreResult};
use crate::ports::inbound::{BlockGraphStore, InterpretedStore, JobStore, StatusUpdate};
use crate::ports::outbound::{BatchOperation, KeyValueStore};

/// Drafts (round 0) have no round yet and do not claim a natural key.
fn has_natural_key<A>(graph: &BlockGraph<A>) -> bool {
    graph.block.round > 0
}

#[derive(Clone, Copy)]
enum Flag {
    Included,
    Replied,
}

/// Stores for one attachment type sharing a key-value backend.
pub struct GraphStorageService<A> {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
    _attachment: PhantomData<fn() -> A>,
}

impl<A: Attachment> GraphStorageService<A> {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
            _attachment: PhantomData,
        }
    }

    pub fn new_in_memory() -> Self {
        Self::new(Arc::new(InMemoryKVStore::new()))
    }

    /// Open the backend selected by `config`.
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        Ok(Self::new(open_backend(config)?))
    }

    fn load_graph(&self, id: &Uuid) -> StoreResult<Option<BlockGraph<A>>> {
        self.kv
            .get(&KeyPrefix::graph_key(id))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }

    fn load_graphs(&self, ids: Vec<Uuid>) -> StoreResult<Vec<BlockGraph<A>>> {
        let mut graphs = Vec::with_capacity(ids.len());
        for id in ids {
            match self.load_graph(&id)? {
                Some(graph) => graphs.push(graph),
                None => warn!(%id, "[bm-01] Index entry without block graph"),
            }
        }
        Ok(graphs)
    }

    fn scan_ids(&self, prefix: &[u8]) -> StoreResult<Vec<Uuid>> {
        self.kv
            .prefix_scan(prefix)?
            .into_iter()
            .map(|(key, _)| {
                trailing_id(&key).ok_or_else(|| StoreError::Codec("malformed index key".into()))
            })
            .collect()
    }

    /// Operations writing `graph` and its indexes, removing stale entries of `old`.
    fn graph_ops(
        old: Option<&BlockGraph<A>>,
        graph: &BlockGraph<A>,
    ) -> StoreResult<Vec<BatchOperation>> {
        let mut ops = Vec::with_capacity(7);
        if let Some(old) = old {
            if has_natural_key(old) && old.key() != graph.key() {
                ops.push(BatchOperation::delete(KeyPrefix::natural_key(&old.key())));
            }
            if old.block.hash != graph.block.hash {
                ops.push(BatchOperation::delete(KeyPrefix::by_hash_key(
                    &old.block.hash,
                    &old.id,
                )));
            }
            if (old.included, old.replied) != (graph.included, graph.replied) {
                ops.push(BatchOperation::delete(KeyPrefix::flags_key(
                    old.included,
                    old.replied,
                    &old.id,
                )));
            }
        }
        ops.push(BatchOperation::put(KeyPrefix::graph_key(&graph.id), encode(graph)?));
        if has_natural_key(graph) {
            ops.push(BatchOperation::put(
                KeyPrefix::natural_key(&graph.key()),
                graph.id.as_bytes().to_vec(),
            ));
        }
        ops.push(BatchOperation::put(
            KeyPrefix::by_hash_key(&graph.block.hash, &graph.id),
            Vec::new(),
        ));
        ops.push(BatchOperation::put(
            KeyPrefix::flags_key(graph.included, graph.replied, &graph.id),
            graph.block.hash.to_vec(),
        ));
        Ok(ops)
    }

    fn delete_ops(graph: &BlockGraph<A>) -> Vec<BatchOperation> {
        let mut ops = vec![
            BatchOperation::delete(KeyPrefix::graph_key(&graph.id)),
            BatchOperation::delete(KeyPrefix::by_hash_key(&graph.block.hash, &graph.id)),
            BatchOperation::delete(KeyPrefix::flags_key(graph.included, graph.replied, &graph.id)),
        ];
        if has_natural_key(graph) {
            ops.push(BatchOperation::delete(KeyPrefix::natural_key(&graph.key())));
        }
        ops
    }

    fn set_flag(&self, ids: &[Uuid], flag: Flag) -> StoreResult<usize> {
        let _guard = self.write_lock.lock();
        let mut ops = Vec::new();
        let mut flipped = 0;
        for id in ids {
            let Some(old) = self.load_graph(id)? else {
                continue;
            };
            let mut graph = old.clone();
            let slot = match flag {
                Flag::Included => &mut graph.included,
                Flag::Replied => &mut graph.replied,
            };
            if *slot {
                continue;
            }
            *slot = true;
            ops.extend(Self::graph_ops(Some(&old), &graph)?);
            flipped += 1;
        }
        if !ops.is_empty() {
            self.kv.atomic_batch_write(ops)?;
        }
        Ok(flipped)
    }

    fn load_job(&self, hash: &Hash) -> StoreResult<Option<Job<A>>> {
        self.kv
            .get(&KeyPrefix::job_key(hash))?
            .map(|bytes| decode(&bytes))
            .transpose()
    }
}

#[async_trait]
impl<A: Attachment> BlockGraphStore<A> for GraphStorageService<A> {
    async fn get(&self, id: Uuid) -> StoreResult<Option<BlockGraph<A>>> {
        self.load_graph(&id)
    }

    async fn find(&self, key: &GraphKey) -> StoreResult<Option<BlockGraph<A>>> {
        match self.kv.get(&KeyPrefix::natural_key(key))? {
            Some(bytes) => {
                let id = Uuid::from_slice(&bytes).map_err(|e| StoreError::Codec(e.to_string()))?;
                self.load_graph(&id)
            }
            None => Ok(None),
        }
    }

    async fn latest_round(&self, hash: &Hash, node: &NodeId) -> StoreResult<u64> {
        Ok(self
            .kv
            .prefix_scan(&KeyPrefix::chain_prefix(hash, node))?
            .iter()
            .filter_map(|(key, _)| natural_key_round(key))
            .max()
            .unwrap_or(0))
    }

    async fn put(&self, graph: &BlockGraph<A>) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        let key = graph.key();

        if has_natural_key(graph) {
            if let Some(bytes) = self.kv.get(&KeyPrefix::natural_key(&key))? {
                let holder =
                    Uuid::from_slice(&bytes).map_err(|e| StoreError::Codec(e.to_string()))?;
                if holder != graph.id {
                    return Err(StoreError::Conflict { key });
                }
            }
        }

        let existing = self.load_graph(&graph.id)?;
        let mut record = graph.clone();
        if let Some(old) = &existing {
            record.included |= old.included;
            record.replied |= old.replied;
        }

        self.kv
            .atomic_batch_write(Self::graph_ops(existing.as_ref(), &record)?)?;
        GRAPHS_STORED.inc();
        debug!(block = %key, id = %graph.id, "[bm-01] Block graph stored");
        Ok(())
    }

    async fn by_hash(&self, hash: &Hash) -> StoreResult<Vec<BlockGraph<A>>> {
        let ids = self.scan_ids(&KeyPrefix::by_hash_prefix(hash))?;
        self.load_graphs(ids)
    }

    async fn by_hash_with_flags(
        &self,
        hash: &Hash,
        included: bool,
        replied: bool,
    ) -> StoreResult<Vec<BlockGraph<A>>> {
        Ok(self
            .by_hash(hash)
            .await?
            .into_iter()
            .filter(|g| g.included == included && g.replied == replied)
            .collect())
    }

    async fn by_flags(&self, included: bool, replied: bool) -> StoreResult<Vec<BlockGraph<A>>> {
        let ids = self.scan_ids(&KeyPrefix::flags_prefix(included, replied))?;
        self.load_graphs(ids)
    }

    async fn set_included(&self, ids: &[Uuid]) -> StoreResult<usize> {
        self.set_flag(ids, Flag::Included)
    }

    async fn set_replied(&self, ids: &[Uuid]) -> StoreResult<usize> {
        self.set_flag(ids, Flag::Replied)
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let _guard = self.write_lock.lock();
        match self.load_graph(&id)? {
            Some(graph) => {
                self.kv.atomic_batch_write(Self::delete_ops(&graph))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_hash(&self, hash: &Hash) -> StoreResult<usize> {
        let _guard = self.write_lock.lock();
        let graphs = self.load_graphs(self.scan_ids(&KeyPrefix::by_hash_prefix(hash))?)?;
        let ops = graphs.iter().flat_map(Self::delete_ops).collect::<Vec<_>>();
        if !ops.is_empty() {
            self.kv.atomic_batch_write(ops)?;
        }
        Ok(graphs.len())
    }
}

#[async_trait]
impl<A: Attachment> JobStore<A> for GraphStorageService<A> {
    async fn get_job(&self, hash: &Hash) -> StoreResult<Option<Job<A>>> {
        self.load_job(hash)
    }

    async fn put_job(&self, job: &Job<A>) -> StoreResult<()> {
        let _guard = self.write_lock.lock();
        if let Some(stored) = self.load_job(&job.hash)? {
            if !stored.status.can_transition_to(job.status) {
                return Err(StoreError::IllegalTransition {
                    from: stored.status,
                    to: job.status,
                });
            }
        }
        self.kv.put(&KeyPrefix::job_key(&job.hash), &encode(job)?)?;
        Ok(())
    }

    async fn update_status(
        &self,
        hash: &Hash,
        next: JobState,
        updated_at: u64,
    ) -> StoreResult<StatusUpdate> {
        let _guard = self.write_lock.lock();
        let Some(mut job) = self.load_job(hash)? else {
            return Ok(StatusUpdate::Missing);
        };
        let from = job.status;
        if !from.can_transition_to(next) {
            return Ok(StatusUpdate::Refused { from });
        }
        job.status = next;
        job.updated_at = updated_at;
        if next.is_locked() {
            job.waiting_on.clear();
        }
        self.kv.put(&KeyPrefix::job_key(hash), &encode(&job)?)?;
        Ok(StatusUpdate::Applied { from })
    }

    async fn list_jobs(&self) -> StoreResult<Vec<Job<A>>> {
        self.kv
            .prefix_scan(KeyPrefix::Job.as_bytes())?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }

    async fn delete_job(&self, hash: &Hash) -> StoreResult<bool> {
        let _guard = self.write_lock.lock();
        let key = KeyPrefix::job_key(hash);
        if !self.kv.exists(&key)? {
            return Ok(false);
        }
        self.kv.delete(&key)?;
        Ok(true)
    }
}

#[async_trait]
impl<A: Attachment> InterpretedStore<A> for GraphStorageService<A> {
    async fn append(&self, blocks: &[BlockId<A>]) -> StoreResult<()> {
        let ops = blocks
            .iter()
            .map(|block| {
                Ok(BatchOperation::put(
                    KeyPrefix::interpreted_key(&block.hash, block.round, &block.node),
                    encode(block)?,
                ))
            })
            .collect::<StoreResult<Vec<_>>>()?;
        if !ops.is_empty() {
            self.kv.atomic_batch_write(ops)?;
        }
        Ok(())
    }

    async fn last_round(&self, hash: &Hash) -> StoreResult<u64> {
        Ok(self
            .interpreted(hash)
            .await?
            .iter()
            .map(|block| block.round)
            .max()
            .unwrap_or(0))
    }

    async fn interpreted(&self, hash: &Hash) -> StoreResult<Vec<BlockId<A>>> {
        self.kv
            .prefix_scan(&KeyPrefix::interpreted_prefix(hash))?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }
}
