//! # Graph Supervisor
//!
//! Owns one orchestrator per live root. Slots live in an arena with a free
//! list; a hash index maps each root to its slot. Orchestrators are spawned on
//! first registration and reaped once their mailbox closes (polished,
//! retired, or stopped on an identity mismatch).

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::ports::inbound::{OrchestratorApi, RegisterOutcome};
use crate::ports::outbound::RegistrationOutbox;
use crate::service::{GraphOrchestrator, OrchestratorContext, OrchestratorHandle};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{hash_hex, Attachment, BlockGraph, Hash, RegisterMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Slot<A> {
    handle: OrchestratorHandle<A>,
    task: JoinHandle<()>,
}

struct Arena<A> {
    slots: Vec<Option<Slot<A>>>,
    free: Vec<usize>,
    index: HashMap<Hash, usize>,
}

impl<A: Attachment> Arena<A> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
        }
    }

    fn live(&self, hash: &Hash) -> Option<OrchestratorHandle<A>> {
        let slot = self.slots.get(*self.index.get(hash)?)?.as_ref()?;
        (!slot.handle.is_closed()).then(|| slot.handle.clone())
    }

    fn insert(&mut self, slot: Slot<A>) -> usize {
        let hash = slot.handle.hash();
        let position = match self.free.pop() {
            Some(position) => {
                self.slots[position] = Some(slot);
                position
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        };
        self.index.insert(hash, position);
        position
    }

    fn remove(&mut self, hash: &Hash) -> Option<Slot<A>> {
        let position = self.index.remove(hash)?;
        let slot = self.slots.get_mut(position)?.take();
        self.free.push(position);
        slot
    }

    /// Drop slots whose orchestrator has stopped.
    fn reap(&mut self) -> usize {
        let closed: Vec<Hash> = self
            .index
            .iter()
            .filter(|(_, position)| {
                self.slots[**position]
                    .as_ref()
                    .map_or(true, |slot| slot.handle.is_closed())
            })
            .map(|(hash, _)| *hash)
            .collect();
        for hash in &closed {
            self.remove(hash);
        }
        closed.len()
    }

    fn drain(&mut self) -> Vec<Slot<A>> {
        self.index.clear();
        self.free.clear();
        self.slots.drain(..).flatten().collect()
    }

    fn len(&self) -> usize {
        self.index.len()
    }
}

/// Lazily spawns and retires per-root orchestrators.
pub struct GraphSupervisor<A: Attachment> {
    ctx: Arc<OrchestratorContext<A>>,
    arena: Mutex<Arena<A>>,
    outbox: Option<Arc<dyn RegistrationOutbox>>,
}

impl<A: Attachment> GraphSupervisor<A> {
    pub fn new(ctx: OrchestratorContext<A>) -> Self {
        Self {
            ctx: Arc::new(ctx),
            arena: Mutex::new(Arena::new()),
            outbox: None,
        }
    }

    /// Route submissions through `outbox` instead of registering inline.
    pub fn with_outbox(mut self, outbox: Arc<dyn RegistrationOutbox>) -> Self {
        self.outbox = Some(outbox);
        self
    }

    /// Number of live orchestrators.
    pub fn live(&self) -> usize {
        let mut arena = self.arena.lock();
        arena.reap();
        arena.len()
    }

    /// Handle of the live orchestrator of `hash`, if any.
    pub fn orchestrator(&self, hash: &Hash) -> Option<OrchestratorHandle<A>> {
        self.arena.lock().live(hash)
    }

    fn handle_for(&self, hash: Hash) -> OrchestratorHandle<A> {
        let mut arena = self.arena.lock();
        if let Some(handle) = arena.live(&hash) {
            return handle;
        }
        let reaped = arena.reap();
        let (handle, task) = GraphOrchestrator::spawn(hash, self.ctx.clone());
        let position = arena.insert(Slot {
            handle: handle.clone(),
            task,
        });
        debug!(hash = %hash_hex(&hash), slot = position, reaped, "[bm-03] Orchestrator spawned");
        handle
    }
}

#[async_trait]
impl<A: Attachment> OrchestratorApi<A> for GraphSupervisor<A> {
    async fn register(&self, bytes: &[u8]) -> OrchestratorResult<RegisterOutcome> {
        let message = RegisterMessage::from_bytes(bytes).map_err(|e| {
            warn!(len = bytes.len(), error = %e, "[bm-03] Malformed registration");
            e
        })?;
        self.register_message(message).await
    }

    async fn register_message(
        &self,
        message: RegisterMessage,
    ) -> OrchestratorResult<RegisterOutcome> {
        let handle = self.handle_for(message.hash);
        match handle.register(message.hash).await {
            // The orchestrator retired between lookup and delivery
            Err(OrchestratorError::Stopped(_)) => {
                self.handle_for(message.hash).register(message.hash).await
            }
            outcome => outcome,
        }
    }

    async fn submit(&self, draft: BlockGraph<A>) -> OrchestratorResult<()> {
        let local = self.ctx.config.node_id;
        if draft.block.node != local {
            return Err(OrchestratorError::ForeignDraft {
                author: draft.block.node,
                local,
            });
        }

        self.ctx.graphs.put(&draft).await?;
        let message = RegisterMessage {
            hash: draft.block.hash,
        };
        debug!(hash = %hash_hex(&message.hash), id = %draft.id, "[bm-03] Draft submitted");

        match &self.outbox {
            Some(outbox) => outbox.enqueue(message).await,
            None => self.register_message(message).await.map(|_| ()),
        }
    }

    async fn retire(&self, hash: &Hash) -> bool {
        let slot = self.arena.lock().remove(hash);
        match slot {
            Some(slot) => {
                slot.handle.stop().await;
                debug!(hash = %hash_hex(hash), "[bm-03] Orchestrator retired");
                true
            }
            None => false,
        }
    }

    async fn shutdown(&self) {
        let slots = self.arena.lock().drain();
        let count = slots.len();
        for slot in &slots {
            slot.handle.stop().await;
        }
        for slot in slots {
            if let Err(e) = slot.task.await {
                warn!(error = %e, "[bm-03] Orchestrator task failed");
            }
        }
        info!(stopped = count, "[bm-03] Supervisor shut down");
    }
}
