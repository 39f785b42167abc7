//! Registration plumbing between gossip, the reliable channel, and the
//! orchestrator supervisor.
//!
//! ```text
//! submit ──┐
//!          ├──→ DeliveryOutbox ──→ ReliableSender ══→ ReliableReceiver ──→ SupervisorHandler
//! gossip ──┘ (OutboxSink)                                                    │
//!                                                                            ▼
//!                                                              OrchestratorApi::register_message
//! ```

use async_trait::async_trait;
use bm_03_orchestrator::{OrchestratorApi, OrchestratorError, OrchestratorResult, RegistrationOutbox};
use bm_04_reliable_delivery::{DeliveryApi, DeliveryHandler};
use bm_05_gossip::RegistrationSink;
use shared_types::{hash_hex, Attachment, Hash, RegisterMessage};
use std::sync::Arc;
use tracing::{debug, warn};

/// Hands registrations to the reliable channel.
pub struct DeliveryOutbox {
    sender: Arc<dyn DeliveryApi<RegisterMessage>>,
}

impl DeliveryOutbox {
    pub fn new(sender: Arc<dyn DeliveryApi<RegisterMessage>>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl RegistrationOutbox for DeliveryOutbox {
    async fn enqueue(&self, message: RegisterMessage) -> OrchestratorResult<()> {
        let id = self
            .sender
            .send(message)
            .await
            .map_err(|e| OrchestratorError::Outbox(e.to_string()))?;
        debug!(hash = %hash_hex(&message.hash), id = %id, "[node] Registration queued");
        Ok(())
    }
}

/// Delivers registrations coming off the reliable channel to the supervisor.
///
/// Delivery is already acknowledged at this point; processing failures are
/// logged and not retried here.
pub struct SupervisorHandler<A: Attachment> {
    orchestrators: Arc<dyn OrchestratorApi<A>>,
}

impl<A: Attachment> SupervisorHandler<A> {
    pub fn new(orchestrators: Arc<dyn OrchestratorApi<A>>) -> Self {
        Self { orchestrators }
    }
}

#[async_trait]
impl<A: Attachment> DeliveryHandler<RegisterMessage> for SupervisorHandler<A> {
    async fn handle(&self, message: RegisterMessage) {
        match self.orchestrators.register_message(message).await {
            Ok(outcome) => {
                debug!(hash = %hash_hex(&message.hash), ?outcome, "[node] Registration processed")
            }
            Err(e) => {
                warn!(hash = %hash_hex(&message.hash), error = %e, "[node] Registration failed")
            }
        }
    }
}

/// Turns hashes accepted by the gossip endpoint into registrations.
pub struct OutboxSink {
    outbox: Arc<dyn RegistrationOutbox>,
}

impl OutboxSink {
    pub fn new(outbox: Arc<dyn RegistrationOutbox>) -> Self {
        Self { outbox }
    }
}

#[async_trait]
impl RegistrationSink for OutboxSink {
    async fn notify(&self, hash: Hash) {
        if let Err(e) = self.outbox.enqueue(RegisterMessage { hash }).await {
            warn!(hash = %hash_hex(&hash), error = %e, "[node] Gossiped hash not queued");
        }
    }
}
