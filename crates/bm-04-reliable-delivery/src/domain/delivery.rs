//! Delivery envelopes and the sender's pending set.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared_types::NodeId;
use std::collections::BTreeMap;
use std::fmt;

/// Anything that can travel through a reliable channel.
pub trait DeliveryPayload:
    Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> DeliveryPayload for T where
    T: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// Per-sender correlation id, assigned in increasing order starting at 1.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct DeliveryId(pub u64);

impl DeliveryId {
    pub fn next(self) -> Self {
        DeliveryId(self.0 + 1)
    }
}

impl fmt::Display for DeliveryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A payload in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: DeliveryPayload")]
pub struct Delivery<T> {
    pub id: DeliveryId,
    /// Node that originated the delivery.
    pub sender: NodeId,
    pub payload: T,
}

/// Receiver's acknowledgement, echoing the delivery's correlation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub id: DeliveryId,
    pub sender: NodeId,
}

/// Deliveries awaiting acknowledgement, keyed by id.
#[derive(Debug, Clone)]
pub struct PendingSet<T> {
    pending: BTreeMap<DeliveryId, Delivery<T>>,
    last_issued: DeliveryId,
}

impl<T: Clone> PendingSet<T> {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            last_issued: DeliveryId::default(),
        }
    }

    /// Rebuild from a snapshot's contents.
    pub fn restore(last_issued: DeliveryId, deliveries: Vec<Delivery<T>>) -> Self {
        let pending: BTreeMap<_, _> = deliveries.into_iter().map(|d| (d.id, d)).collect();
        let last_issued = pending
            .keys()
            .next_back()
            .copied()
            .map_or(last_issued, |highest| highest.max(last_issued));
        Self {
            pending,
            last_issued,
        }
    }

    /// Assign the next id to `payload` and record it as pending.
    pub fn issue(&mut self, sender: NodeId, payload: T) -> Delivery<T> {
        self.last_issued = self.last_issued.next();
        let delivery = Delivery {
            id: self.last_issued,
            sender,
            payload,
        };
        self.pending.insert(delivery.id, delivery.clone());
        delivery
    }

    /// Remove `id`. Returns whether it was pending.
    pub fn confirm(&mut self, id: DeliveryId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Highest id at or below which every delivery is confirmed.
    pub fn confirmed_up_to(&self) -> DeliveryId {
        match self.pending.keys().next() {
            Some(lowest) => DeliveryId(lowest.0 - 1),
            None => self.last_issued,
        }
    }

    pub fn last_issued(&self) -> DeliveryId {
        self.last_issued
    }

    pub fn deliveries(&self) -> Vec<Delivery<T>> {
        self.pending.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<T: Clone> Default for PendingSet<T> {
    fn default() -> Self {
        Self::new()
    }
}
