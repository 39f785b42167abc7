//! # Outbound Ports (Driven Ports)

use crate::domain::{Ack, Delivery, DeliveryId, DeliveryPayload, Snapshot};
use crate::error::DeliveryResult;
use async_trait::async_trait;

/// Carries deliveries from sender to receiver.
#[async_trait]
pub trait DeliveryTransport<T: DeliveryPayload>: Send + Sync {
    async fn transmit(&self, delivery: Delivery<T>) -> DeliveryResult<()>;
}

/// Carries acknowledgements back to the sender.
#[async_trait]
pub trait AckTransport: Send + Sync {
    async fn acknowledge(&self, ack: Ack) -> DeliveryResult<()>;
}

/// Consumer of deduplicated payloads.
#[async_trait]
pub trait DeliveryHandler<T: DeliveryPayload>: Send + Sync {
    async fn handle(&self, payload: T);
}

/// Durable home of sender snapshots.
pub trait SnapshotStore<T: DeliveryPayload>: Send + Sync {
    fn save(&self, snapshot: &Snapshot<T>) -> DeliveryResult<()>;

    /// Snapshot with the highest sequence.
    fn latest(&self) -> DeliveryResult<Option<Snapshot<T>>>;

    /// Delete snapshots outside the newest `keep` taken before `confirmed_up_to`.
    fn prune(&self, keep: usize, confirmed_up_to: DeliveryId) -> DeliveryResult<usize>;
}
