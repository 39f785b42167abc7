//! # Node Container
//!
//! Holds every subsystem of one node and manages their lifecycle.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: key-value backend, graph store, snapshot store, signer
//! Level 1: job state machine (graphs, jobs, membership)
//! Level 2: reliable sender, orchestrator supervisor (outbox = sender)
//! Level 3: reliable receiver (handler = supervisor)
//! Level 4: gossip replicator and endpoint (sink = sender)
//! ```
//!
//! `start` restores undelivered registrations from the latest snapshot and
//! spawns the background loops; `shutdown` stops them in reverse order.

use crate::adapters::{DeliveryOutbox, OutboxSink, SupervisorHandler};
use crate::config::NodeConfig;
use anyhow::{bail, Context};
use bm_01_graph_storage::{open_backend, GraphStorageService};
use bm_02_quorum::{JobStateMachine, StaticMembership};
use bm_03_orchestrator::{
    BatchInterpreter, Ed25519Signer, GraphSupervisor, OrchestratorApi, OrchestratorContext,
    OrchestratorResult, OrderingEngineFactory,
};
use bm_04_reliable_delivery::{
    ack_link, delivery_link, Ack, Delivery, KvSnapshotStore, ReliableReceiver, ReliableSender,
};
use bm_05_gossip::{GossipEndpoint, GossipEndpointApi, GossipReplicator, PeerTransport, StaticPeers};
use parking_lot::Mutex;
use shared_types::{Attachment, BlockGraph, KeyPurpose, NodeId, RegisterMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Pieces supplied by the embedding process.
pub struct Collaborators<A: Attachment> {
    pub engines: Arc<dyn OrderingEngineFactory<A>>,
    pub interpreter: Arc<dyn BatchInterpreter<A>>,
    pub transport: Arc<dyn PeerTransport<A>>,
}

struct Links {
    deliveries: mpsc::Receiver<Delivery<RegisterMessage>>,
    acks: mpsc::Receiver<Ack>,
}

/// One running node.
pub struct NodeRuntime<A: Attachment> {
    config: NodeConfig,
    store: Arc<GraphStorageService<A>>,
    quorum: Arc<JobStateMachine<A>>,
    supervisor: Arc<GraphSupervisor<A>>,
    sender: Arc<ReliableSender<RegisterMessage>>,
    receiver: Arc<ReliableReceiver<RegisterMessage>>,
    replicator: Arc<GossipReplicator<A>>,
    endpoint: Arc<GossipEndpoint<A>>,
    links: Mutex<Option<Links>>,
    shutdown: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<A: Attachment> NodeRuntime<A> {
    /// Wire every subsystem. Nothing runs until [`NodeRuntime::start`].
    pub fn build(config: NodeConfig, collaborators: Collaborators<A>) -> anyhow::Result<Self> {
        config.validate().context("invalid node configuration")?;
        let node = config.node_id;

        // Level 0
        let kv = open_backend(&config.storage).context("failed to open storage backend")?;
        let store = Arc::new(GraphStorageService::new(kv.clone()));
        let snapshots = Arc::new(KvSnapshotStore::new(kv, config.delivery.channel_name.clone()));
        let mut signer = match &config.signing_seed {
            Some(seed) => Ed25519Signer::from_seed(seed.bytes()),
            None => Ed25519Signer::generate(),
        };
        if !config.author_keys.is_empty() {
            let own = signer
                .public_key(KeyPurpose::BlockGraph)
                .context("signer holds no block-graph key")?;
            for (author, key) in &config.author_keys {
                signer = signer.with_author(*author, *key);
            }
            signer = signer.with_author(node, own);
        }
        let signer = Arc::new(signer);

        // Level 1
        let membership = Arc::new(StaticMembership::new(
            config.members.iter().map(|m| m.node_id).collect(),
        ));
        let quorum = Arc::new(JobStateMachine::new(
            config.quorum.clone(),
            store.clone(),
            store.clone(),
            membership,
        ));

        // Level 2
        let capacity = config.delivery.channel_capacity;
        let (delivery_tx, deliveries) = delivery_link(capacity);
        let (ack_tx, acks) = ack_link(capacity);
        let sender = Arc::new(ReliableSender::new(
            node,
            config.delivery.clone(),
            Arc::new(delivery_tx),
            snapshots,
        ));
        let outbox = Arc::new(DeliveryOutbox::new(sender.clone()));
        let supervisor = Arc::new(
            GraphSupervisor::new(OrchestratorContext {
                config: config.orchestrator.clone(),
                graphs: store.clone(),
                interpreted: store.clone(),
                quorum: quorum.clone(),
                signer,
                engines: collaborators.engines,
                interpreter: collaborators.interpreter,
            })
            .with_outbox(outbox.clone()),
        );

        // Level 3
        let receiver = Arc::new(ReliableReceiver::new(
            &config.delivery,
            Arc::new(ack_tx),
            Arc::new(SupervisorHandler::new(supervisor.clone())),
        ));

        // Level 4
        let replicator = Arc::new(GossipReplicator::new(
            node,
            config.gossip.clone(),
            store.clone(),
            quorum.clone(),
            Arc::new(StaticPeers::new(node, config.members.clone())),
            collaborators.transport,
        ));
        let endpoint = Arc::new(GossipEndpoint::new(
            node,
            store.clone(),
            Arc::new(OutboxSink::new(outbox)),
        ));

        let (shutdown, _) = watch::channel(false);
        info!(
            node = %node,
            members = config.members.len(),
            durable = config.storage.data_dir.is_some(),
            "[node] Runtime built"
        );

        Ok(Self {
            config,
            store,
            quorum,
            supervisor,
            sender,
            receiver,
            replicator,
            endpoint,
            links: Mutex::new(Some(Links { deliveries, acks })),
            shutdown,
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Replay undelivered registrations and spawn the background loops.
    pub async fn start(&self) -> anyhow::Result<()> {
        let Some(links) = self.links.lock().take() else {
            bail!("runtime already started");
        };

        let restored = self
            .sender
            .restore()
            .await
            .context("failed to restore delivery snapshot")?;

        let mut tasks = vec![
            tokio::spawn(
                self.receiver
                    .clone()
                    .run(links.deliveries, self.shutdown.subscribe()),
            ),
            tokio::spawn(self.sender.clone().run(links.acks, self.shutdown.subscribe())),
            tokio::spawn(self.replicator.clone().run(self.shutdown.subscribe())),
        ];
        tasks.push(tokio::spawn(
            self.quorum
                .clone()
                .run_garbage_collector(self.shutdown.subscribe()),
        ));
        self.tasks.lock().extend(tasks);

        info!(node = %self.config.node_id, restored, "[node] Runtime started");
        Ok(())
    }

    /// Store a local draft and queue its root for registration.
    pub async fn submit(&self, draft: BlockGraph<A>) -> OrchestratorResult<()> {
        self.supervisor.submit(draft).await
    }

    /// Stop the background loops, then every live orchestrator.
    pub async fn shutdown(&self) {
        let _ = self.shutdown.send(true);
        let tasks = std::mem::take(&mut *self.tasks.lock());
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "[node] Background task failed");
            }
        }
        self.supervisor.shutdown().await;
        info!(node = %self.config.node_id, "[node] Runtime stopped");
    }

    pub fn node_id(&self) -> NodeId {
        self.config.node_id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn store(&self) -> Arc<GraphStorageService<A>> {
        self.store.clone()
    }

    pub fn quorum(&self) -> Arc<JobStateMachine<A>> {
        self.quorum.clone()
    }

    pub fn supervisor(&self) -> Arc<GraphSupervisor<A>> {
        self.supervisor.clone()
    }

    pub fn sender(&self) -> Arc<ReliableSender<RegisterMessage>> {
        self.sender.clone()
    }

    pub fn replicator(&self) -> Arc<GossipReplicator<A>> {
        self.replicator.clone()
    }

    /// Endpoint peers push gossip batches to.
    pub fn endpoint(&self) -> Arc<dyn GossipEndpointApi<A>> {
        self.endpoint.clone()
    }
}
