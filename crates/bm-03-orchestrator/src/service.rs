//! # Graph Orchestrator
//!
//! One actor per root hash. It owns the root's ordering engine and its last
//! interpreted round, and handles one mailbox message at a time:
//!
//! ```text
//! Register ──→ set_own_block_graph (each pending fragment)
//!          ──→ JobStateApi::observe
//!          ──→ process (Blockmainia only) ──→ OrderingEngine::append
//!
//! Interpreted ──→ BatchInterpreter ──→ InterpretedStore ──→ Polished
//! ```
//!
//! The actor stops after its root is polished, when told to, or when a
//! registration names a different root.

use crate::config::OrchestratorConfig;
use crate::domain::{check_round, resolve_prev, sign_block, validate_structure};
use crate::error::{OrchestratorError, OrchestratorResult, ValidationError};
use crate::ports::inbound::RegisterOutcome;
use crate::ports::outbound::{
    BatchInterpreter, EngineConfig, InterpretedSink, OrderingEngine, OrderingEngineFactory,
    SigningService,
};
use async_trait::async_trait;
use bm_01_graph_storage::{BlockGraphStore, InterpretedStore, StoreError};
use bm_02_quorum::JobStateApi;
use bm_telemetry::{
    log_graph_event, root_span, ENGINE_APPENDS, FRAGMENTS_REJECTED, INTERPRETED_BATCHES,
    LIVE_ORCHESTRATORS,
};
use shared_types::{hash_hex, Attachment, BlockGraph, GraphKey, Hash, InterpretedBatch, JobState};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument};

/// Services every orchestrator of a node shares.
pub struct OrchestratorContext<A: Attachment> {
    pub config: OrchestratorConfig,
    pub graphs: Arc<dyn BlockGraphStore<A>>,
    pub interpreted: Arc<dyn InterpretedStore<A>>,
    pub quorum: Arc<dyn JobStateApi<A>>,
    pub signer: Arc<dyn SigningService>,
    pub engines: Arc<dyn OrderingEngineFactory<A>>,
    pub interpreter: Arc<dyn BatchInterpreter<A>>,
}

enum Command<A> {
    Register {
        hash: Hash,
        reply: oneshot::Sender<OrchestratorResult<RegisterOutcome>>,
    },
    Interpreted(InterpretedBatch<A>),
    Stop,
}

/// Mailbox of a running orchestrator.
pub struct OrchestratorHandle<A> {
    hash: Hash,
    tx: mpsc::Sender<Command<A>>,
}

impl<A> Clone for OrchestratorHandle<A> {
    fn clone(&self) -> Self {
        Self {
            hash: self.hash,
            tx: self.tx.clone(),
        }
    }
}

impl<A: Attachment> OrchestratorHandle<A> {
    /// Root this orchestrator is bound to.
    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn stopped(&self) -> OrchestratorError {
        OrchestratorError::Stopped(hash_hex(&self.hash))
    }

    /// Ask the orchestrator to handle a registration of `hash`.
    pub async fn register(&self, hash: Hash) -> OrchestratorResult<RegisterOutcome> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Register { hash, reply })
            .await
            .map_err(|_| self.stopped())?;
        rx.await.map_err(|_| self.stopped())?
    }

    pub async fn interpreted(&self, batch: InterpretedBatch<A>) -> OrchestratorResult<()> {
        self.tx
            .send(Command::Interpreted(batch))
            .await
            .map_err(|_| self.stopped())
    }

    /// Ask the orchestrator to stop after the messages already queued.
    pub async fn stop(&self) {
        let _ = self.tx.send(Command::Stop).await;
    }
}

/// Routes engine output back into the orchestrator's mailbox.
///
/// Holds a weak sender so the engine does not keep a retired orchestrator alive.
struct MailboxSink<A> {
    hash: Hash,
    tx: mpsc::WeakSender<Command<A>>,
}

#[async_trait]
impl<A: Attachment> InterpretedSink<A> for MailboxSink<A> {
    async fn on_interpreted(&self, batch: InterpretedBatch<A>) {
        let Some(tx) = self.tx.upgrade() else {
            debug!(hash = %hash_hex(&self.hash), "[bm-03] Orchestrator gone, batch dropped");
            return;
        };
        if tx.send(Command::Interpreted(batch)).await.is_err() {
            debug!(hash = %hash_hex(&self.hash), "[bm-03] Mailbox closed, batch dropped");
        }
    }
}

/// Per-root actor state.
pub struct GraphOrchestrator<A: Attachment> {
    hash: Hash,
    ctx: Arc<OrchestratorContext<A>>,
    last_interpreted: u64,
    engine: Option<Arc<dyn OrderingEngine<A>>>,
    sink: Arc<dyn InterpretedSink<A>>,
    polished: bool,
}

impl<A: Attachment> GraphOrchestrator<A> {
    /// Start the orchestrator of `hash` on the current runtime.
    pub fn spawn(
        hash: Hash,
        ctx: Arc<OrchestratorContext<A>>,
    ) -> (OrchestratorHandle<A>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(ctx.config.mailbox_capacity.max(1));
        let sink = Arc::new(MailboxSink {
            hash,
            tx: tx.downgrade(),
        });
        let actor = Self {
            hash,
            ctx,
            last_interpreted: 0,
            engine: None,
            sink,
            polished: false,
        };
        let span = root_span!("orchestrator", hash_hex(&hash));
        let task = tokio::spawn(actor.run(rx).instrument(span));
        (OrchestratorHandle { hash, tx }, task)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command<A>>) {
        match self.ctx.interpreted.last_round(&self.hash).await {
            Ok(round) => self.last_interpreted = round,
            Err(e) => warn!(
                hash = %hash_hex(&self.hash),
                error = %e,
                "[bm-03] Cannot read last interpreted round, starting from 0"
            ),
        }
        LIVE_ORCHESTRATORS.inc();
        debug!(
            hash = %hash_hex(&self.hash),
            last_interpreted = self.last_interpreted,
            "[bm-03] Orchestrator started"
        );

        while let Some(command) = rx.recv().await {
            match command {
                Command::Register { hash, reply } => {
                    if hash != self.hash {
                        warn!(
                            bound = %hash_hex(&self.hash),
                            received = %hash_hex(&hash),
                            "[bm-03] Registration for another root, shutting down"
                        );
                        let _ = reply.send(Ok(RegisterOutcome::Shutdown));
                        break;
                    }
                    let _ = reply.send(self.register().await);
                }
                Command::Interpreted(batch) => {
                    self.on_interpreted(batch).await;
                    if self.polished {
                        info!(hash = %hash_hex(&self.hash), "[bm-03] Root polished, retiring");
                        break;
                    }
                }
                Command::Stop => break,
            }
        }

        LIVE_ORCHESTRATORS.dec();
        debug!(hash = %hash_hex(&self.hash), "[bm-03] Orchestrator stopped");
    }

    fn engine(&mut self) -> OrchestratorResult<Arc<dyn OrderingEngine<A>>> {
        if let Some(engine) = &self.engine {
            return Ok(engine.clone());
        }
        let config = EngineConfig {
            hash: self.hash,
            node: self.ctx.config.node_id,
            self_address: self.ctx.config.self_address.clone(),
            cluster_size: self.ctx.config.cluster_size,
        };
        let engine = self.ctx.engines.create(config, self.sink.clone())?;
        info!(
            hash = %hash_hex(&self.hash),
            cluster_size = self.ctx.config.cluster_size,
            "[bm-03] Ordering engine created"
        );
        self.engine = Some(engine.clone());
        Ok(engine)
    }

    async fn register(&mut self) -> OrchestratorResult<RegisterOutcome> {
        let engine = self.engine()?;
        let pending = self
            .ctx
            .graphs
            .by_hash_with_flags(&self.hash, false, false)
            .await?;

        let mut accepted = 0;
        let mut rejected = 0;
        for fragment in pending {
            let id = fragment.id;
            match self.set_own_block_graph(fragment).await {
                Ok(_) => accepted += 1,
                Err(OrchestratorError::Validation(e)) => {
                    rejected += 1;
                    FRAGMENTS_REJECTED.with_label_values(&[e.reason()]).inc();
                    warn!(hash = %hash_hex(&self.hash), %id, error = %e, "[bm-03] Fragment rejected");
                }
                Err(e) => return Err(e),
            }
        }

        let mut appended = false;
        let status = match self.ctx.quorum.observe(&self.hash).await? {
            Some(observation) if observation.status == JobState::Blockmainia => {
                match self.process(&engine, &observation.root).await {
                    Ok(true) => {
                        appended = true;
                        Some(JobState::Running)
                    }
                    Ok(false) => self.current_status().await?,
                    Err(OrchestratorError::Validation(e)) => {
                        rejected += 1;
                        FRAGMENTS_REJECTED.with_label_values(&[e.reason()]).inc();
                        warn!(
                            hash = %hash_hex(&self.hash),
                            error = %e,
                            "[bm-03] Root failed structural validation"
                        );
                        Some(JobState::Blockmainia)
                    }
                    Err(e) => return Err(e),
                }
            }
            Some(observation) => Some(observation.status),
            None => self.current_status().await?,
        };

        Ok(RegisterOutcome::Processed {
            accepted,
            rejected,
            status,
            appended,
        })
    }

    async fn current_status(&self) -> OrchestratorResult<Option<JobState>> {
        Ok(self.ctx.quorum.job(&self.hash).await?.map(|job| job.status))
    }

    /// Assign, repair, sign, and store one pending fragment of this root.
    pub(crate) async fn set_own_block_graph(
        &self,
        mut fragment: BlockGraph<A>,
    ) -> OrchestratorResult<BlockGraph<A>> {
        let local = self.ctx.config.node_id;
        let unsigned = !fragment.block.signed.is_signed();

        if unsigned && fragment.block.node != local {
            let key = fragment.key();
            self.ctx.graphs.delete(fragment.id).await?;
            return Err(ValidationError::MissingSignature { key }.into());
        }
        if unsigned && fragment.block.round == 0 {
            fragment.block.round = self
                .ctx
                .graphs
                .latest_round(&self.hash, &local)
                .await?
                .saturating_add(1);
        }

        let key = fragment.key();
        if key.round == 0 {
            return Err(ValidationError::UnassignedRound { key }.into());
        }

        let predecessor = if key.round > 1 {
            let previous = GraphKey {
                round: key.round - 1,
                ..key
            };
            self.ctx.graphs.find(&previous).await?.map(|g| g.block)
        } else {
            None
        };
        fragment.prev = resolve_prev(&fragment.block, fragment.prev.as_ref(), predecessor.as_ref())?;
        check_round(key.round, self.last_interpreted)?;

        if unsigned {
            fragment.block.previous_hash = fragment
                .prev
                .as_ref()
                .or(predecessor.as_ref())
                .map(|prev| prev.signed.key);
            sign_block(&mut fragment.block, self.ctx.signer.as_ref()).await?;
        }

        self.set_block_graph(&fragment).await?;
        log_graph_event!(debug, "orchestrator", "[bm-03] Fragment accepted", key);
        Ok(fragment)
    }

    async fn set_block_graph(&self, graph: &BlockGraph<A>) -> OrchestratorResult<()> {
        match self.ctx.graphs.put(graph).await {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict { key }) => Err(ValidationError::Conflict { key }.into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Validate a quorate root and hand it to the engine.
    ///
    /// Returns whether the job moved to `Running`.
    async fn process(
        &self,
        engine: &Arc<dyn OrderingEngine<A>>,
        root: &BlockGraph<A>,
    ) -> OrchestratorResult<bool> {
        match self.ctx.quorum.job(&self.hash).await? {
            Some(job) if job.status == JobState::Blockmainia => {}
            _ => return Ok(false),
        }

        validate_structure(root, self.ctx.signer.as_ref())?;
        engine.append(root.clone()).await?;
        ENGINE_APPENDS.inc();

        let running = self.ctx.quorum.mark_running(&self.hash).await?;
        info!(
            hash = %hash_hex(&self.hash),
            round = root.block.round,
            deps = root.deps.len(),
            "[bm-03] Root handed to ordering engine"
        );
        Ok(running)
    }

    async fn on_interpreted(&mut self, batch: InterpretedBatch<A>) {
        let local = self.ctx.config.node_id;
        let mut graphs = Vec::with_capacity(batch.blocks.len());
        for block in &batch.blocks {
            let key = GraphKey {
                hash: block.hash,
                node: local,
                round: block.round,
            };
            match self.ctx.graphs.find(&key).await {
                Ok(Some(graph)) => graphs.push(graph),
                Ok(None) => debug!(block = %key, "[bm-03] No local graph for interpreted block"),
                Err(e) => {
                    error!(block = %key, error = %e, "[bm-03] Failed to load interpreted graph");
                    INTERPRETED_BATCHES.with_label_values(&["failed"]).inc();
                    return;
                }
            }
        }

        if let Err(e) = self.ctx.interpreter.interpret(&batch.hash, &graphs).await {
            warn!(
                hash = %hash_hex(&batch.hash),
                round = batch.round,
                error = %e,
                "[bm-03] Interpreted batch refused"
            );
            INTERPRETED_BATCHES.with_label_values(&["rejected"]).inc();
            return;
        }

        if let Err(e) = self.ctx.interpreted.append(&batch.blocks).await {
            error!(
                hash = %hash_hex(&batch.hash),
                error = %e,
                "[bm-03] Failed to record interpreted blocks"
            );
            INTERPRETED_BATCHES.with_label_values(&["failed"]).inc();
            return;
        }

        let top = batch
            .blocks
            .iter()
            .map(|block| block.round)
            .max()
            .unwrap_or(0)
            .max(batch.round);
        self.last_interpreted = self.last_interpreted.max(top);

        let mut hashes: Vec<Hash> = batch.blocks.iter().map(|block| block.hash).collect();
        hashes.push(batch.hash);
        hashes.sort();
        hashes.dedup();

        let report = self.ctx.quorum.set_states(&hashes, JobState::Polished).await;
        if report.applied.contains(&self.hash) {
            self.polished = true;
        }
        INTERPRETED_BATCHES.with_label_values(&["polished"]).inc();
        info!(
            hash = %hash_hex(&batch.hash),
            round = batch.round,
            blocks = batch.blocks.len(),
            polished = report.applied.len(),
            "[bm-03] Interpreted batch applied"
        );
    }
}

#[cfg(test)]
mod tests;
