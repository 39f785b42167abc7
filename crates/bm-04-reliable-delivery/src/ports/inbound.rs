//! # Inbound Ports (Driving Ports)

use crate::domain::{Ack, DeliveryId, DeliveryPayload};
use crate::error::DeliveryResult;
use async_trait::async_trait;

/// Sending side of a reliable channel.
#[async_trait]
pub trait DeliveryApi<T: DeliveryPayload>: Send + Sync {
    /// Queue `payload` and transmit it. Transmission failures are retried by
    /// the redelivery timer.
    async fn send(&self, payload: T) -> DeliveryResult<DeliveryId>;

    /// Mark the delivery named by `ack` as received.
    fn confirm(&self, ack: Ack) -> bool;

    fn confirmed_up_to(&self) -> DeliveryId;
}
