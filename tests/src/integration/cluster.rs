//! # In-Process Cluster
//!
//! N fully wired node runtimes pushing gossip to each other over one
//! [`InProcessNetwork`]. Ordering engines interpret every appended root
//! immediately, so a quorate root runs all the way to `Polished`.

use bm_01_graph_storage::{BlockGraphStore, InterpretedStore};
use bm_02_quorum::JobStateApi;
use bm_03_orchestrator::test_utils::{node, RecordingEngineFactory, ScriptedInterpreter};
use bm_03_orchestrator::Ed25519Signer;
use bm_05_gossip::InProcessNetwork;
use node_runtime::{Collaborators, NodeConfig, NodeRuntime, SigningSeed};
use shared_types::{BlockGraph, Hash, JobState, KeyPurpose, NodeId, PeerInfo};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const WAIT: Duration = Duration::from_secs(10);

pub fn address(n: u8) -> String {
    format!("node-{n}")
}

pub struct Member {
    pub runtime: NodeRuntime<String>,
    pub engines: Arc<RecordingEngineFactory<String>>,
    pub interpreter: Arc<ScriptedInterpreter>,
}

pub struct Cluster {
    pub network: Arc<InProcessNetwork<String>>,
    members: Vec<Member>,
}

impl Cluster {
    /// Build and start nodes `1..=size`.
    pub async fn start(size: u8) -> Self {
        let network = Arc::new(InProcessNetwork::<String>::new());
        let peers: Vec<PeerInfo> = (1..=size)
            .map(|n| PeerInfo {
                node_id: node(n),
                address: address(n),
            })
            .collect();

        let author_keys: HashMap<NodeId, [u8; 32]> = (1..=size)
            .filter_map(|n| {
                let key = Ed25519Signer::from_seed([n; 32]).public_key(KeyPurpose::BlockGraph)?;
                Some((node(n), key))
            })
            .collect();

        let mut members = Vec::new();
        for n in 1..=size {
            let mut config = NodeConfig::new(node(n), address(n), peers.clone());
            config.signing_seed = Some(SigningSeed::new([n; 32]));
            config.author_keys = author_keys.clone();
            config.gossip.interval = Duration::from_millis(20);
            config.delivery.redeliver_interval = Duration::from_millis(50);
            config.delivery.snapshot_interval = Duration::from_millis(200);

            let engines = Arc::new(RecordingEngineFactory::<String>::auto_interpreting());
            let interpreter = Arc::new(ScriptedInterpreter::default());
            let runtime = NodeRuntime::build(
                config,
                Collaborators {
                    engines: engines.clone(),
                    interpreter: interpreter.clone(),
                    transport: network.clone(),
                },
            )
            .unwrap();
            network.register(address(n), runtime.endpoint());
            members.push(Member {
                runtime,
                engines,
                interpreter,
            });
        }

        for member in &members {
            member.runtime.start().await.unwrap();
        }
        Self { network, members }
    }

    pub fn member(&self, n: u8) -> &Member {
        &self.members[usize::from(n) - 1]
    }

    pub async fn submit(&self, n: u8, hash: Hash) {
        self.member(n)
            .runtime
            .submit(BlockGraph::draft(hash, node(n), format!("tx from {n}")))
            .await
            .unwrap();
    }

    pub async fn status(&self, n: u8, hash: &Hash) -> Option<JobState> {
        self.member(n)
            .runtime
            .quorum()
            .job(hash)
            .await
            .unwrap()
            .map(|job| job.status)
    }

    /// Poll until node `n` reports `state` for `hash`.
    pub async fn wait_for(&self, n: u8, hash: &Hash, state: JobState) {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let status = self.status(n, hash).await;
            if status == Some(state) {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("node {n} stuck at {status:?}, expected {state}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll until node `n` has stored a fragment of `hash` authored by `author`.
    pub async fn wait_for_fragment(&self, n: u8, hash: &Hash, author: NodeId) {
        let store = self.member(n).runtime.store();
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            let graphs = store.by_hash(hash).await.unwrap();
            if graphs.iter().any(|g| g.block.node == author) {
                return;
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("node {n} never received the fragment of {author}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn interpreted_rounds(&self, n: u8, hash: &Hash) -> Vec<u64> {
        self.member(n)
            .runtime
            .store()
            .interpreted(hash)
            .await
            .unwrap()
            .into_iter()
            .map(|block| block.round)
            .collect()
    }

    pub async fn shutdown(self) {
        for member in &self.members {
            member.runtime.shutdown().await;
        }
    }
}
