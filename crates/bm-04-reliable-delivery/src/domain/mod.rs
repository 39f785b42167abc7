//! Delivery domain: envelopes, pending set, replay filter, snapshots.

pub mod dedupe;
pub mod delivery;
pub mod snapshot;

pub use dedupe::DedupeWindow;
pub use delivery::{Ack, Delivery, DeliveryId, DeliveryPayload, PendingSet};
pub use snapshot::{prunable, Snapshot};
