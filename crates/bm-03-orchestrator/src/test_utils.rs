//! Recording fakes for the orchestrator's outbound ports, plus a single-node
//! fixture wired over in-memory stores.

use crate::adapters::Ed25519Signer;
use crate::error::{EngineError, InterpretError, OrchestratorResult};
use crate::ports::outbound::{
    BatchInterpreter, EngineConfig, InterpretedSink, OrderingEngine, OrderingEngineFactory,
    RegistrationOutbox,
};
use crate::service::OrchestratorContext;
use crate::OrchestratorConfig;
use async_trait::async_trait;
use bm_01_graph_storage::GraphStorageService;
use bm_02_quorum::{JobStateMachine, QuorumConfig, StaticMembership};
use parking_lot::Mutex;
use shared_types::{Attachment, BlockGraph, Hash, InterpretedBatch, NodeId, RegisterMessage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

pub fn node(n: u8) -> NodeId {
    NodeId::repeat(n)
}

/// Engine that records appended roots and, optionally, interprets each one
/// immediately as a single-block batch.
pub struct RecordingEngine<A: Attachment> {
    hash: Hash,
    appended: Arc<Mutex<Vec<BlockGraph<A>>>>,
    sink: Option<Arc<dyn InterpretedSink<A>>>,
}

#[async_trait]
impl<A: Attachment> OrderingEngine<A> for RecordingEngine<A> {
    async fn append(&self, graph: BlockGraph<A>) -> Result<(), EngineError> {
        self.appended.lock().push(graph.clone());
        if let Some(sink) = &self.sink {
            sink.on_interpreted(InterpretedBatch {
                hash: self.hash,
                round: graph.block.round,
                blocks: vec![graph.block],
            })
            .await;
        }
        Ok(())
    }
}

pub struct RecordingEngineFactory<A: Attachment> {
    auto_interpret: bool,
    configs: Mutex<Vec<EngineConfig>>,
    appended: Arc<Mutex<Vec<BlockGraph<A>>>>,
    sinks: Mutex<HashMap<Hash, Arc<dyn InterpretedSink<A>>>>,
}

impl<A: Attachment> RecordingEngineFactory<A> {
    pub fn new() -> Self {
        Self {
            auto_interpret: false,
            configs: Mutex::new(Vec::new()),
            appended: Arc::new(Mutex::new(Vec::new())),
            sinks: Mutex::new(HashMap::new()),
        }
    }

    /// Engines that emit an interpreted batch for every appended root.
    pub fn auto_interpreting() -> Self {
        Self {
            auto_interpret: true,
            ..Self::new()
        }
    }

    pub fn configs(&self) -> Vec<EngineConfig> {
        self.configs.lock().clone()
    }

    pub fn appended(&self) -> Vec<BlockGraph<A>> {
        self.appended.lock().clone()
    }

    /// Deliver `batch` through the sink of the engine built for `hash`.
    pub async fn emit(&self, hash: &Hash, batch: InterpretedBatch<A>) -> bool {
        let sink = self.sinks.lock().get(hash).cloned();
        match sink {
            Some(sink) => {
                sink.on_interpreted(batch).await;
                true
            }
            None => false,
        }
    }
}

impl<A: Attachment> Default for RecordingEngineFactory<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Attachment> OrderingEngineFactory<A> for RecordingEngineFactory<A> {
    fn create(
        &self,
        config: EngineConfig,
        sink: Arc<dyn InterpretedSink<A>>,
    ) -> Result<Arc<dyn OrderingEngine<A>>, EngineError> {
        let hash = config.hash;
        self.configs.lock().push(config);
        self.sinks.lock().insert(hash, sink.clone());
        Ok(Arc::new(RecordingEngine {
            hash,
            appended: self.appended.clone(),
            sink: self.auto_interpret.then_some(sink),
        }))
    }
}

/// Interpreter that accepts or refuses every batch on command.
#[derive(Default)]
pub struct ScriptedInterpreter {
    refuse: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedInterpreter {
    pub fn set_refusing(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<A: Attachment> BatchInterpreter<A> for ScriptedInterpreter {
    async fn interpret(
        &self,
        _hash: &Hash,
        _graphs: &[BlockGraph<A>],
    ) -> Result<(), InterpretError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.refuse.load(Ordering::SeqCst) {
            return Err(InterpretError::Rejected("commitment mismatch".into()));
        }
        Ok(())
    }
}

/// Outbox that only records what it was given.
#[derive(Default)]
pub struct CollectingOutbox {
    messages: Mutex<Vec<RegisterMessage>>,
}

impl CollectingOutbox {
    pub fn messages(&self) -> Vec<RegisterMessage> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl RegistrationOutbox for CollectingOutbox {
    async fn enqueue(&self, message: RegisterMessage) -> OrchestratorResult<()> {
        self.messages.lock().push(message);
        Ok(())
    }
}

type Store = GraphStorageService<String>;

/// One node's orchestration dependencies over in-memory stores.
pub struct Fixture {
    pub local: NodeId,
    pub cluster_size: usize,
    pub store: Arc<Store>,
    pub quorum: Arc<JobStateMachine<String>>,
    pub membership: Arc<StaticMembership>,
    pub signer: Arc<Ed25519Signer>,
    pub engines: Arc<RecordingEngineFactory<String>>,
    pub interpreter: Arc<ScriptedInterpreter>,
    pub outbox: Arc<CollectingOutbox>,
}

impl Fixture {
    /// Node `local` in a cluster of `members` (node bytes).
    pub fn new(local: NodeId, members: &[u8]) -> Self {
        Self::with_engines(local, members, RecordingEngineFactory::new())
    }

    pub fn with_engines(
        local: NodeId,
        members: &[u8],
        engines: RecordingEngineFactory<String>,
    ) -> Self {
        let store = Arc::new(Store::new_in_memory());
        let membership = Arc::new(StaticMembership::new(
            members.iter().map(|n| node(*n)).collect(),
        ));
        let quorum = Arc::new(JobStateMachine::new(
            QuorumConfig::for_node(local, members.len()),
            store.clone(),
            store.clone(),
            membership.clone(),
        ));
        Self {
            local,
            cluster_size: members.len(),
            store,
            quorum,
            membership,
            signer: Arc::new(Ed25519Signer::from_seed(local.0)),
            engines: Arc::new(engines),
            interpreter: Arc::new(ScriptedInterpreter::default()),
            outbox: Arc::new(CollectingOutbox::default()),
        }
    }

    pub fn context(&self) -> OrchestratorContext<String> {
        OrchestratorContext {
            config: OrchestratorConfig::for_node(
                self.local,
                format!("node-{}", self.local.0[0]),
                self.cluster_size,
            ),
            graphs: self.store.clone(),
            interpreted: self.store.clone(),
            quorum: self.quorum.clone(),
            signer: self.signer.clone(),
            engines: self.engines.clone(),
            interpreter: self.interpreter.clone(),
        }
    }
}
