//! In-process links between a sender and a receiver.

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::domain::{Ack, Delivery, DeliveryPayload};
use crate::error::{DeliveryError, DeliveryResult};
use crate::ports::outbound::{AckTransport, DeliveryTransport};

/// Delivery side of a bounded in-process link.
pub struct LinkTransport<T> {
    tx: mpsc::Sender<Delivery<T>>,
}

/// Acknowledgement side of a bounded in-process link.
pub struct AckLink {
    tx: mpsc::Sender<Ack>,
}

/// A delivery link and the receiver it feeds.
pub fn delivery_link<T>(capacity: usize) -> (LinkTransport<T>, mpsc::Receiver<Delivery<T>>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LinkTransport { tx }, rx)
}

/// An acknowledgement link and the receiver it feeds.
pub fn ack_link(capacity: usize) -> (AckLink, mpsc::Receiver<Ack>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (AckLink { tx }, rx)
}

#[async_trait]
impl<T: DeliveryPayload> DeliveryTransport<T> for LinkTransport<T> {
    async fn transmit(&self, delivery: Delivery<T>) -> DeliveryResult<()> {
        self.tx
            .send(delivery)
            .await
            .map_err(|_| DeliveryError::ChannelClosed)
    }
}

#[async_trait]
impl AckTransport for AckLink {
    async fn acknowledge(&self, ack: Ack) -> DeliveryResult<()> {
        self.tx
            .send(ack)
            .await
            .map_err(|_| DeliveryError::ChannelClosed)
    }
}

/// Wraps a transport and silently drops the first `drops` transmissions.
pub struct LossyTransport<X> {
    inner: X,
    remaining_drops: Mutex<usize>,
}

impl<X> LossyTransport<X> {
    pub fn new(inner: X, drops: usize) -> Self {
        Self {
            inner,
            remaining_drops: Mutex::new(drops),
        }
    }

    fn should_drop(&self) -> bool {
        let mut remaining = self.remaining_drops.lock();
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }
}

#[async_trait]
impl<T, X> DeliveryTransport<T> for LossyTransport<X>
where
    T: DeliveryPayload,
    X: DeliveryTransport<T>,
{
    async fn transmit(&self, delivery: Delivery<T>) -> DeliveryResult<()> {
        if self.should_drop() {
            tracing::debug!(id = %delivery.id, "[bm-04] link dropped delivery");
            return Ok(());
        }
        self.inner.transmit(delivery).await
    }
}

#[async_trait]
impl<X: AckTransport> AckTransport for LossyTransport<X> {
    async fn acknowledge(&self, ack: Ack) -> DeliveryResult<()> {
        if self.should_drop() {
            tracing::debug!(id = %ack.id, "[bm-04] link dropped ack");
            return Ok(());
        }
        self.inner.acknowledge(ack).await
    }
}
