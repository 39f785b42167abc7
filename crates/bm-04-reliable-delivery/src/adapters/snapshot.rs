//! Snapshot stores.

use bm_01_graph_storage::domain::KeyPrefix;
use bm_01_graph_storage::{BatchOperation, KeyValueStore};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::domain::{prunable, DeliveryId, DeliveryPayload, Snapshot};
use crate::error::DeliveryResult;
use crate::ports::outbound::SnapshotStore;

/// Snapshots held in process memory.
pub struct InMemorySnapshotStore<T> {
    snapshots: RwLock<BTreeMap<u64, Snapshot<T>>>,
}

impl<T> InMemorySnapshotStore<T> {
    pub fn new() -> Self {
        Self {
            snapshots: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.read().is_empty()
    }
}

impl<T> Default for InMemorySnapshotStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeliveryPayload> SnapshotStore<T> for InMemorySnapshotStore<T> {
    fn save(&self, snapshot: &Snapshot<T>) -> DeliveryResult<()> {
        self.snapshots
            .write()
            .insert(snapshot.sequence, snapshot.clone());
        Ok(())
    }

    fn latest(&self) -> DeliveryResult<Option<Snapshot<T>>> {
        Ok(self
            .snapshots
            .read()
            .values()
            .next_back()
            .cloned())
    }

    fn prune(&self, keep: usize, confirmed_up_to: DeliveryId) -> DeliveryResult<usize> {
        let mut snapshots = self.snapshots.write();
        let taken = snapshots
            .values()
            .map(|s| (s.sequence, s.confirmed_up_to))
            .collect();
        let doomed = prunable(taken, keep, confirmed_up_to);
        for sequence in &doomed {
            snapshots.remove(sequence);
        }
        Ok(doomed.len())
    }
}

/// Snapshots persisted through the node's key-value backend, under the `s:`
/// prefix and namespaced by channel.
pub struct KvSnapshotStore<T> {
    kv: Arc<dyn KeyValueStore>,
    channel: String,
    _payload: PhantomData<fn() -> T>,
}

impl<T: DeliveryPayload> KvSnapshotStore<T> {
    pub fn new(kv: Arc<dyn KeyValueStore>, channel: impl Into<String>) -> Self {
        Self {
            kv,
            channel: channel.into(),
            _payload: PhantomData,
        }
    }

    fn scan(&self) -> DeliveryResult<Vec<Snapshot<T>>> {
        let rows = self
            .kv
            .prefix_scan(&KeyPrefix::snapshot_prefix(&self.channel))?;
        rows.into_iter()
            .map(|(_, value)| Ok(bincode::deserialize(&value)?))
            .collect()
    }
}

impl<T: DeliveryPayload> SnapshotStore<T> for KvSnapshotStore<T> {
    fn save(&self, snapshot: &Snapshot<T>) -> DeliveryResult<()> {
        let value = bincode::serialize(snapshot)?;
        self.kv.put(
            &KeyPrefix::snapshot_key(&self.channel, snapshot.sequence),
            &value,
        )?;
        Ok(())
    }

    fn latest(&self) -> DeliveryResult<Option<Snapshot<T>>> {
        // Big-endian sequences scan in order
        Ok(self.scan()?.pop())
    }

    fn prune(&self, keep: usize, confirmed_up_to: DeliveryId) -> DeliveryResult<usize> {
        let taken = self
            .scan()?
            .iter()
            .map(|s| (s.sequence, s.confirmed_up_to))
            .collect();
        let doomed = prunable(taken, keep, confirmed_up_to);
        if doomed.is_empty() {
            return Ok(0);
        }
        let ops = doomed
            .iter()
            .map(|sequence| BatchOperation::delete(KeyPrefix::snapshot_key(&self.channel, *sequence)))
            .collect();
        self.kv.atomic_batch_write(ops)?;
        Ok(doomed.len())
    }
}
