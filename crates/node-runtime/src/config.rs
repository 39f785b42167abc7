//! # Node Configuration
//!
//! Unified configuration for every subsystem of one node.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `BM_NODE_ID` | required | 64 hex characters |
//! | `BM_LISTEN_ADDR` | `127.0.0.1:7400` | Gossip endpoint address |
//! | `BM_PEERS` | empty | `node_hex@address`, comma separated |
//! | `BM_DATA_DIR` | in memory | RocksDB directory |
//! | `BM_SIGNING_SEED` | random | 64 hex characters |
//! | `BM_AUTHOR_KEYS` | empty | `node_hex=public_key_hex`, comma separated |
//! | `BM_GOSSIP_BATCH_SIZE` | `20` | Fragments per batch |
//! | `BM_GOSSIP_INTERVAL_MS` | `1000` | Replication period |
//! | `BM_REDELIVER_INTERVAL_MS` | `3000` | Registration redelivery period |
//! | `BM_SNAPSHOT_INTERVAL_MS` | `30000` | Delivery snapshot period |
//! | `BM_MAILBOX_CAPACITY` | `64` | Orchestrator mailbox depth |

use bm_01_graph_storage::StorageConfig;
use bm_02_quorum::QuorumConfig;
use bm_03_orchestrator::OrchestratorConfig;
use bm_04_reliable_delivery::DeliveryConfig;
use bm_05_gossip::GossipConfig;
use bm_telemetry::TelemetryConfig;
use shared_types::{NodeId, PeerInfo};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use zeroize::Zeroizing;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("local node {0} is not a cluster member")]
    NotAMember(NodeId),

    #[error("node {0} is listed more than once")]
    DuplicateMember(NodeId),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("cluster size {configured} does not match {members} members")]
    ClusterSize { configured: usize, members: usize },

    #[error("no author key registered for member {0}")]
    MissingAuthorKey(NodeId),
}

/// Signing key seed. Wiped on drop and never printed.
#[derive(Clone)]
pub struct SigningSeed(Zeroizing<[u8; 32]>);

impl SigningSeed {
    pub fn new(seed: [u8; 32]) -> Self {
        Self(Zeroizing::new(seed))
    }

    pub fn bytes(&self) -> [u8; 32] {
        *self.0
    }
}

impl fmt::Debug for SigningSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningSeed(<redacted>)")
    }
}

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub node_id: NodeId,
    pub address: String,
    /// Every cluster member, this node included.
    pub members: Vec<PeerInfo>,
    /// Random key when unset.
    pub signing_seed: Option<SigningSeed>,
    /// Block-graph public key of every peer. Empty accepts any signer;
    /// otherwise every peer needs an entry.
    pub author_keys: HashMap<NodeId, [u8; 32]>,
    pub storage: StorageConfig,
    pub quorum: QuorumConfig,
    pub orchestrator: OrchestratorConfig,
    pub delivery: DeliveryConfig,
    pub gossip: GossipConfig,
    pub telemetry: TelemetryConfig,
}

impl NodeConfig {
    /// Defaults for `node_id` listening on `address` in a cluster of `peers`.
    ///
    /// The local node is added to the members when `peers` omits it.
    pub fn new(node_id: NodeId, address: impl Into<String>, peers: Vec<PeerInfo>) -> Self {
        let address = address.into();
        let mut members = peers;
        if !members.iter().any(|m| m.node_id == node_id) {
            members.insert(
                0,
                PeerInfo {
                    node_id,
                    address: address.clone(),
                },
            );
        }
        let cluster_size = members.len();
        Self {
            node_id,
            quorum: QuorumConfig::for_node(node_id, cluster_size),
            orchestrator: OrchestratorConfig::for_node(node_id, address.clone(), cluster_size),
            address,
            members,
            signing_seed: None,
            author_keys: HashMap::new(),
            storage: StorageConfig::default(),
            delivery: DeliveryConfig::default(),
            gossip: GossipConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.telemetry = TelemetryConfig::from_env();
        Ok(config)
    }

    /// Load from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let node_id = NodeId(parse_hex32(
            "BM_NODE_ID",
            &lookup("BM_NODE_ID").ok_or(ConfigError::Missing("BM_NODE_ID"))?,
        )?);
        let address = lookup("BM_LISTEN_ADDR").unwrap_or_else(|| "127.0.0.1:7400".to_string());
        let peers = match lookup("BM_PEERS") {
            Some(text) => parse_peers(&text)?,
            None => Vec::new(),
        };

        let mut config = Self::new(node_id, address, peers);
        if let Some(dir) = lookup("BM_DATA_DIR") {
            config.storage = StorageConfig::persistent(PathBuf::from(dir));
        }
        if let Some(seed) = lookup("BM_SIGNING_SEED") {
            config.signing_seed = Some(SigningSeed::new(parse_hex32("BM_SIGNING_SEED", &seed)?));
        }
        if let Some(text) = lookup("BM_AUTHOR_KEYS") {
            config.author_keys = parse_author_keys(&text)?;
        }
        if let Some(size) = parse_var(&lookup, "BM_GOSSIP_BATCH_SIZE")? {
            config.gossip.batch_size = size;
        }
        if let Some(ms) = parse_var(&lookup, "BM_GOSSIP_INTERVAL_MS")? {
            config.gossip.interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "BM_REDELIVER_INTERVAL_MS")? {
            config.delivery.redeliver_interval = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var(&lookup, "BM_SNAPSHOT_INTERVAL_MS")? {
            config.delivery.snapshot_interval = Duration::from_millis(ms);
        }
        if let Some(capacity) = parse_var(&lookup, "BM_MAILBOX_CAPACITY")? {
            config.orchestrator.mailbox_capacity = capacity;
        }
        Ok(config)
    }

    /// Reject configurations the node cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for member in &self.members {
            if !seen.insert(member.node_id) {
                return Err(ConfigError::DuplicateMember(member.node_id));
            }
        }
        if !seen.contains(&self.node_id) {
            return Err(ConfigError::NotAMember(self.node_id));
        }
        if self.orchestrator.cluster_size != self.members.len() {
            return Err(ConfigError::ClusterSize {
                configured: self.orchestrator.cluster_size,
                members: self.members.len(),
            });
        }
        if !self.author_keys.is_empty() {
            if let Some(peer) = self
                .peers()
                .into_iter()
                .find(|peer| !self.author_keys.contains_key(&peer.node_id))
            {
                return Err(ConfigError::MissingAuthorKey(peer.node_id));
            }
        }
        if self.gossip.batch_size == 0 {
            return Err(ConfigError::Zero("gossip batch size"));
        }
        if self.gossip.interval.is_zero() {
            return Err(ConfigError::Zero("gossip interval"));
        }
        if self.delivery.redeliver_interval.is_zero() {
            return Err(ConfigError::Zero("redelivery interval"));
        }
        if self.delivery.snapshot_interval.is_zero() {
            return Err(ConfigError::Zero("snapshot interval"));
        }
        if self.orchestrator.mailbox_capacity == 0 {
            return Err(ConfigError::Zero("mailbox capacity"));
        }
        Ok(())
    }

    /// Every member except this node.
    pub fn peers(&self) -> Vec<PeerInfo> {
        self.members
            .iter()
            .filter(|m| m.node_id != self.node_id)
            .cloned()
            .collect()
    }
}

fn parse_hex32(var: &'static str, text: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(text.trim()).map_err(|e| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })?;
    bytes.try_into().map_err(|bytes: Vec<u8>| ConfigError::Invalid {
        var,
        reason: format!("expected 32 bytes, got {}", bytes.len()),
    })
}

fn parse_peers(text: &str) -> Result<Vec<PeerInfo>, ConfigError> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, address) = entry.split_once('@').ok_or_else(|| ConfigError::Invalid {
                var: "BM_PEERS",
                reason: format!("'{entry}' is not node@address"),
            })?;
            Ok(PeerInfo {
                node_id: NodeId(parse_hex32("BM_PEERS", id)?),
                address: address.to_string(),
            })
        })
        .collect()
}

fn parse_author_keys(text: &str) -> Result<HashMap<NodeId, [u8; 32]>, ConfigError> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (id, key) = entry.split_once('=').ok_or_else(|| ConfigError::Invalid {
                var: "BM_AUTHOR_KEYS",
                reason: format!("'{entry}' is not node=key"),
            })?;
            Ok((
                NodeId(parse_hex32("BM_AUTHOR_KEYS", id)?),
                parse_hex32("BM_AUTHOR_KEYS", key)?,
            ))
        })
        .collect()
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: fmt::Display,
{
    lookup(var)
        .map(|text| {
            text.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, String)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn id_hex(n: u8) -> String {
        hex::encode([n; 32])
    }

    #[test]
    fn test_minimal_environment() {
        let config = NodeConfig::from_lookup(lookup(&[("BM_NODE_ID", id_hex(1))])).unwrap();
        assert_eq!(config.node_id, NodeId::repeat(1));
        assert_eq!(config.members.len(), 1);
        assert!(config.peers().is_empty());
        assert_eq!(config.gossip.batch_size, 20);
        assert!(config.storage.data_dir.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_peers_and_overrides() {
        let peers = format!("{}@10.0.0.2:7400, {}@10.0.0.3:7400", id_hex(2), id_hex(3));
        let config = NodeConfig::from_lookup(lookup(&[
            ("BM_NODE_ID", id_hex(1)),
            ("BM_PEERS", peers),
            ("BM_GOSSIP_BATCH_SIZE", "5".to_string()),
            ("BM_REDELIVER_INTERVAL_MS", "250".to_string()),
            ("BM_SIGNING_SEED", id_hex(9)),
        ]))
        .unwrap();

        assert_eq!(config.members.len(), 3);
        assert_eq!(config.peers().len(), 2);
        assert_eq!(config.orchestrator.cluster_size, 3);
        assert_eq!(config.quorum.expected_total_nodes, 3);
        assert_eq!(config.gossip.batch_size, 5);
        assert_eq!(config.delivery.redeliver_interval, Duration::from_millis(250));
        assert_eq!(config.signing_seed.as_ref().unwrap().bytes(), [9u8; 32]);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_and_malformed_values() {
        assert_eq!(
            NodeConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::Missing("BM_NODE_ID")
        );
        assert!(matches!(
            NodeConfig::from_lookup(lookup(&[("BM_NODE_ID", "abcd".to_string())])),
            Err(ConfigError::Invalid { var: "BM_NODE_ID", .. })
        ));
        assert!(matches!(
            NodeConfig::from_lookup(lookup(&[
                ("BM_NODE_ID", id_hex(1)),
                ("BM_PEERS", "10.0.0.2:7400".to_string()),
            ])),
            Err(ConfigError::Invalid { var: "BM_PEERS", .. })
        ));
        assert!(matches!(
            NodeConfig::from_lookup(lookup(&[
                ("BM_NODE_ID", id_hex(1)),
                ("BM_GOSSIP_INTERVAL_MS", "soon".to_string()),
            ])),
            Err(ConfigError::Invalid { var: "BM_GOSSIP_INTERVAL_MS", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_broken_clusters() {
        let mut config = NodeConfig::new(NodeId::repeat(1), "a", Vec::new());
        config.members.push(config.members[0].clone());
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::DuplicateMember(NodeId::repeat(1))
        );

        let mut config = NodeConfig::new(NodeId::repeat(1), "a", Vec::new());
        config.gossip.batch_size = 0;
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::Zero("gossip batch size")
        );

        let mut config = NodeConfig::new(NodeId::repeat(1), "a", Vec::new());
        config.orchestrator.cluster_size = 4;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ClusterSize { configured: 4, members: 1 })
        ));
    }

    #[test]
    fn test_author_keys_cover_every_peer() {
        let peers = format!("{}@b, {}@c", id_hex(2), id_hex(3));
        let config = NodeConfig::from_lookup(lookup(&[
            ("BM_NODE_ID", id_hex(1)),
            ("BM_PEERS", peers.clone()),
            ("BM_AUTHOR_KEYS", format!("{}={}", id_hex(2), id_hex(0x22))),
        ]))
        .unwrap();
        assert_eq!(config.author_keys[&NodeId::repeat(2)], [0x22; 32]);
        assert_eq!(
            config.validate().unwrap_err(),
            ConfigError::MissingAuthorKey(NodeId::repeat(3))
        );

        let keys = format!("{}={}, {}={}", id_hex(2), id_hex(0x22), id_hex(3), id_hex(0x33));
        let config = NodeConfig::from_lookup(lookup(&[
            ("BM_NODE_ID", id_hex(1)),
            ("BM_PEERS", peers),
            ("BM_AUTHOR_KEYS", keys),
        ]))
        .unwrap();
        config.validate().unwrap();

        assert!(matches!(
            NodeConfig::from_lookup(lookup(&[
                ("BM_NODE_ID", id_hex(1)),
                ("BM_AUTHOR_KEYS", id_hex(2)),
            ])),
            Err(ConfigError::Invalid { var: "BM_AUTHOR_KEYS", .. })
        ));
    }

    #[test]
    fn test_seed_is_not_printed() {
        let mut config = NodeConfig::new(NodeId::repeat(1), "a", Vec::new());
        config.signing_seed = Some(SigningSeed::new([0xab; 32]));
        let printed = format!("{config:?}");
        assert!(printed.contains("<redacted>"));
        assert!(!printed.contains("171, 171"));
    }
}
