//! Reliable Delivery Service
//!
//! `ReliableSender` keeps every delivery pending until the receiver's ack
//! arrives, re-transmitting on a timer and snapshotting the pending set so a
//! restarted sender picks up where it left off. `ReliableReceiver` acks first
//! and hands each delivery to its handler once per sender.

use async_trait::async_trait;
use bm_telemetry::{DUPLICATE_DELIVERIES, PENDING_DELIVERIES, REDELIVERIES};
use parking_lot::Mutex;
use shared_types::NodeId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::DeliveryConfig;
use crate::domain::{Ack, DedupeWindow, Delivery, DeliveryId, DeliveryPayload, PendingSet, Snapshot};
use crate::error::DeliveryResult;
use crate::ports::inbound::DeliveryApi;
use crate::ports::outbound::{AckTransport, DeliveryHandler, DeliveryTransport, SnapshotStore};

struct SenderState<T> {
    pending: PendingSet<T>,
    sequence: u64,
    /// Changed since the last snapshot.
    dirty: bool,
}

/// Sending end of a reliable channel.
pub struct ReliableSender<T: DeliveryPayload> {
    node: NodeId,
    config: DeliveryConfig,
    transport: Arc<dyn DeliveryTransport<T>>,
    snapshots: Arc<dyn SnapshotStore<T>>,
    state: Mutex<SenderState<T>>,
}

impl<T: DeliveryPayload> ReliableSender<T> {
    pub fn new(
        node: NodeId,
        config: DeliveryConfig,
        transport: Arc<dyn DeliveryTransport<T>>,
        snapshots: Arc<dyn SnapshotStore<T>>,
    ) -> Self {
        Self {
            node,
            config,
            transport,
            snapshots,
            state: Mutex::new(SenderState {
                pending: PendingSet::new(),
                sequence: 0,
                dirty: true,
            }),
        }
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn pending_len(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Re-transmit every pending delivery. Returns how many went out.
    pub async fn redeliver_pending(&self) -> usize {
        let deliveries = self.state.lock().pending.deliveries();
        let mut sent = 0;
        for delivery in deliveries {
            let id = delivery.id;
            match self.transport.transmit(delivery).await {
                Ok(()) => {
                    REDELIVERIES.inc();
                    sent += 1;
                }
                Err(e) => warn!(id = %id, error = %e, "[bm-04] redelivery failed"),
            }
        }
        if sent > 0 {
            debug!(sent, "[bm-04] redelivered pending");
        }
        sent
    }

    /// Persist the pending set and prune old snapshots. Returns the sequence
    /// of the latest snapshot; an unchanged pending set is not saved again.
    pub fn snapshot(&self) -> DeliveryResult<u64> {
        let snapshot = {
            let mut state = self.state.lock();
            if !state.dirty {
                return Ok(state.sequence);
            }
            state.dirty = false;
            state.sequence += 1;
            Snapshot {
                sequence: state.sequence,
                last_issued: state.pending.last_issued(),
                confirmed_up_to: state.pending.confirmed_up_to(),
                pending: state.pending.deliveries(),
            }
        };
        self.snapshots.save(&snapshot)?;
        let pruned = self
            .snapshots
            .prune(self.config.keep_snapshots, snapshot.confirmed_up_to)?;
        debug!(
            sequence = snapshot.sequence,
            pending = snapshot.pending.len(),
            pruned,
            "[bm-04] snapshot saved"
        );
        Ok(snapshot.sequence)
    }

    /// Load the latest snapshot and redeliver everything it holds.
    ///
    /// Returns the number of restored pending deliveries.
    pub async fn restore(&self) -> DeliveryResult<usize> {
        let Some(snapshot) = self.snapshots.latest()? else {
            return Ok(0);
        };
        let restored = snapshot.pending.len();
        {
            let mut state = self.state.lock();
            state.pending = PendingSet::restore(snapshot.last_issued, snapshot.pending);
            state.sequence = snapshot.sequence;
            state.dirty = false;
            PENDING_DELIVERIES.set(state.pending.len() as f64);
        }
        info!(
            sequence = snapshot.sequence,
            restored, "[bm-04] restored pending deliveries"
        );
        self.redeliver_pending().await;
        Ok(restored)
    }

    /// Drive redelivery, snapshots and incoming acks until `shutdown` flips.
    ///
    /// A last snapshot is taken on the way out.
    pub async fn run(self: Arc<Self>, mut acks: mpsc::Receiver<Ack>, mut shutdown: watch::Receiver<bool>) {
        let mut redeliver = tokio::time::interval(self.config.redeliver_interval);
        redeliver.set_missed_tick_behavior(MissedTickBehavior::Delay);
        redeliver.tick().await;
        let mut snapshot = tokio::time::interval(self.config.snapshot_interval);
        snapshot.set_missed_tick_behavior(MissedTickBehavior::Delay);
        snapshot.tick().await;

        info!(node = %self.node, "[bm-04] reliable sender started");
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                ack = acks.recv() => match ack {
                    Some(ack) => {
                        self.confirm(ack);
                    }
                    None => {
                        warn!("[bm-04] ack link closed");
                        break;
                    }
                },
                _ = redeliver.tick() => {
                    self.redeliver_pending().await;
                }
                _ = snapshot.tick() => {
                    if let Err(e) = self.snapshot() {
                        warn!(error = %e, "[bm-04] snapshot failed");
                    }
                }
            }
        }

        if let Err(e) = self.snapshot() {
            warn!(error = %e, "[bm-04] final snapshot failed");
        }
        info!(node = %self.node, "[bm-04] reliable sender stopped");
    }
}

#[async_trait]
impl<T: DeliveryPayload> DeliveryApi<T> for ReliableSender<T> {
    async fn send(&self, payload: T) -> DeliveryResult<DeliveryId> {
        let delivery = {
            let mut state = self.state.lock();
            let delivery = state.pending.issue(self.node, payload);
            state.dirty = true;
            PENDING_DELIVERIES.set(state.pending.len() as f64);
            delivery
        };
        let id = delivery.id;
        if let Err(e) = self.transport.transmit(delivery).await {
            // Stays pending; the redelivery timer retries
            warn!(id = %id, error = %e, "[bm-04] transmit failed");
        }
        Ok(id)
    }

    fn confirm(&self, ack: Ack) -> bool {
        if ack.sender != self.node {
            debug!(id = %ack.id, sender = %ack.sender, "[bm-04] ack for another sender");
            return false;
        }
        let mut state = self.state.lock();
        let confirmed = state.pending.confirm(ack.id);
        state.dirty |= confirmed;
        PENDING_DELIVERIES.set(state.pending.len() as f64);
        confirmed
    }

    fn confirmed_up_to(&self) -> DeliveryId {
        self.state.lock().pending.confirmed_up_to()
    }
}

/// Receiving end of a reliable channel.
pub struct ReliableReceiver<T: DeliveryPayload> {
    acks: Arc<dyn AckTransport>,
    handler: Arc<dyn DeliveryHandler<T>>,
    window: usize,
    seen: Mutex<HashMap<NodeId, DedupeWindow>>,
}

impl<T: DeliveryPayload> ReliableReceiver<T> {
    pub fn new(
        config: &DeliveryConfig,
        acks: Arc<dyn AckTransport>,
        handler: Arc<dyn DeliveryHandler<T>>,
    ) -> Self {
        Self {
            acks,
            handler,
            window: config.dedupe_window,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Ack `delivery`, then hand it over unless its id was seen before.
    ///
    /// Returns whether the handler was invoked.
    pub async fn receive(&self, delivery: Delivery<T>) -> bool {
        let ack = Ack {
            id: delivery.id,
            sender: delivery.sender,
        };
        if let Err(e) = self.acks.acknowledge(ack).await {
            warn!(id = %ack.id, error = %e, "[bm-04] ack failed");
        }

        let fresh = self
            .seen
            .lock()
            .entry(delivery.sender)
            .or_insert_with(|| DedupeWindow::new(self.window))
            .insert(delivery.id);
        if !fresh {
            DUPLICATE_DELIVERIES.inc();
            debug!(id = %delivery.id, sender = %delivery.sender, "[bm-04] duplicate delivery");
            return false;
        }

        self.handler.handle(delivery.payload).await;
        true
    }

    /// Consume `deliveries` until the link closes or `shutdown` flips.
    pub async fn run(
        self: Arc<Self>,
        mut deliveries: mpsc::Receiver<Delivery<T>>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                delivery = deliveries.recv() => match delivery {
                    Some(delivery) => {
                        self.receive(delivery).await;
                    }
                    None => break,
                },
            }
        }
        info!("[bm-04] reliable receiver stopped");
    }
}

#[cfg(test)]
mod tests;
