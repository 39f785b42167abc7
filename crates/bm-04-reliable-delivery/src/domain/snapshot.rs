//! Persisted sender state.

use crate::domain::delivery::{Delivery, DeliveryId, DeliveryPayload};
use serde::{Deserialize, Serialize};

/// The sender's pending set at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: DeliveryPayload")]
pub struct Snapshot<T> {
    pub sequence: u64,
    pub last_issued: DeliveryId,
    pub confirmed_up_to: DeliveryId,
    pub pending: Vec<Delivery<T>>,
}

/// Sequences of the snapshots to delete: everything outside the newest `keep`
/// that was taken before `confirmed_up_to`.
///
/// `taken` holds `(sequence, confirmed_up_to)` pairs in any order.
pub fn prunable(
    mut taken: Vec<(u64, DeliveryId)>,
    keep: usize,
    confirmed_up_to: DeliveryId,
) -> Vec<u64> {
    taken.sort_by(|a, b| b.0.cmp(&a.0));
    taken
        .into_iter()
        .skip(keep)
        .filter(|(_, confirmed)| *confirmed < confirmed_up_to)
        .map(|(sequence, _)| sequence)
        .collect()
}
