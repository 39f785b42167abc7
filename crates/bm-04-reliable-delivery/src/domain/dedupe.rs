//! Bounded replay filter, one per sender.

use crate::domain::delivery::DeliveryId;
use std::collections::{HashSet, VecDeque};

/// Remembers the most recent `capacity` delivery ids of one sender.
///
/// Ids evicted from the window are treated as new again; the window must
/// cover the sender's redelivery horizon.
#[derive(Debug, Clone)]
pub struct DedupeWindow {
    capacity: usize,
    order: VecDeque<DeliveryId>,
    seen: HashSet<DeliveryId>,
}

impl DedupeWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            seen: HashSet::new(),
        }
    }

    /// Record `id`. Returns `true` the first time it is seen.
    pub fn insert(&mut self, id: DeliveryId) -> bool {
        if !self.seen.insert(id) {
            return false;
        }
        self.order.push_back(id);
        if self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.seen.remove(&evicted);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
