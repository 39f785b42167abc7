//! # Core Domain Entities
//!
//! Records shared by every Blockmania subsystem.
//!
//! ## Clusters
//!
//! - **Identity**: `Hash`, `NodeId`, `PeerInfo`
//! - **Graph**: `SignedPayload`, `BlockId`, `Dependency`, `BlockGraph`
//! - **Quorum**: `JobState`, `Job`

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Length in bytes of a root hash.
pub const HASH_LEN: usize = 32;

/// A 32-byte root identifier shared by every per-node chain of one conversation.
///
/// This is not a content hash of an individual block.
pub type Hash = [u8; HASH_LEN];

/// Render a hash as lowercase hex.
pub fn hash_hex(hash: &Hash) -> String {
    hex::encode(hash)
}

/// Unique identifier for a node in the cluster.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct NodeId(pub [u8; 32]);

impl NodeId {
    /// Node id whose every byte is `byte`. Convenient for fixtures.
    pub const fn repeat(byte: u8) -> Self {
        Self([byte; 32])
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..4]))
    }
}

/// A cluster member and the address its gossip endpoint listens on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerInfo {
    pub node_id: NodeId,
    pub address: String,
}

/// Purpose a signing key is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyPurpose {
    /// Signing block-graph payloads.
    BlockGraph,
    /// Signing gossip batches sent to peers.
    Gossip,
}

impl KeyPurpose {
    pub fn label(&self) -> &'static str {
        match self {
            KeyPurpose::BlockGraph => "blockgraph",
            KeyPurpose::Gossip => "gossip",
        }
    }
}

// =============================================================================
// CLUSTER B: GRAPH
// =============================================================================

/// Payload carried by a block.
///
/// Blanket-implemented for every type meeting the bounds, so callers pick
/// whatever attachment their application needs.
pub trait Attachment:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<T> Attachment for T where
    T: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

/// A block payload together with its signature.
///
/// An empty `signature` marks a local draft that has not been signed yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Attachment")]
pub struct SignedPayload<A> {
    /// SHA-256 of the canonical signing payload.
    pub key: Hash,
    pub attachment: A,
    pub public_key: Vec<u8>,
    pub signature: Vec<u8>,
}

impl<A> SignedPayload<A> {
    /// Unsigned payload wrapping `attachment`.
    pub fn unsigned(attachment: A) -> Self {
        Self {
            key: [0u8; 32],
            attachment,
            public_key: Vec::new(),
            signature: Vec::new(),
        }
    }

    pub fn is_signed(&self) -> bool {
        !self.signature.is_empty() && !self.public_key.is_empty()
    }
}

/// One node's claim about one block at one logical round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Attachment")]
pub struct BlockId<A> {
    pub hash: Hash,
    pub node: NodeId,
    /// Per-(hash, node) sequence number. Zero means "not assigned yet".
    pub round: u64,
    pub signed: SignedPayload<A>,
    pub previous_hash: Option<Hash>,
}

impl<A> BlockId<A> {
    /// Natural key of this block.
    pub fn key(&self) -> GraphKey {
        GraphKey {
            hash: self.hash,
            node: self.node,
            round: self.round,
        }
    }
}

/// Natural key `(hash, node, round)` of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphKey {
    pub hash: Hash,
    pub node: NodeId,
    pub round: u64,
}

impl fmt::Display for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            hex::encode(&self.hash[..6]),
            self.node,
            self.round
        )
    }
}

/// Snapshot of another node's block embedded by value into a root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Attachment")]
pub struct Dependency<A> {
    pub block: BlockId<A>,
    /// The dependency's own dependencies, flattened to their blocks.
    pub deps: Vec<BlockId<A>>,
    pub prev: Option<BlockId<A>>,
}

/// Unit of storage and replication.
///
/// Equality and hashing use the reconstruction identity
/// `(id, block.hash, block.node, block.round, deps.len())`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "A: Attachment")]
pub struct BlockGraph<A> {
    pub id: Uuid,
    pub block: BlockId<A>,
    pub deps: Vec<Dependency<A>>,
    pub prev: Option<BlockId<A>>,
    /// Folded into local quorum bookkeeping. Monotonic.
    pub included: bool,
    /// Gossiped to peers. Monotonic.
    pub replied: bool,
}

impl<A> BlockGraph<A> {
    /// Fresh record for `block` with no dependencies and both flags cleared.
    pub fn new(block: BlockId<A>) -> Self {
        Self {
            id: Uuid::new_v4(),
            block,
            deps: Vec::new(),
            prev: None,
            included: false,
            replied: false,
        }
    }

    /// Unsigned local draft authored by `node` for root `hash`.
    pub fn draft(hash: Hash, node: NodeId, attachment: A) -> Self {
        Self::new(BlockId {
            hash,
            node,
            round: 0,
            signed: SignedPayload::unsigned(attachment),
            previous_hash: None,
        })
    }

    pub fn key(&self) -> GraphKey {
        self.block.key()
    }

    /// Distinct authors of this graph's dependencies.
    pub fn dependency_authors(&self) -> BTreeSet<NodeId> {
        self.deps.iter().map(|dep| dep.block.node).collect()
    }

    fn identity(&self) -> (Uuid, Hash, NodeId, u64, usize) {
        (
            self.id,
            self.block.hash,
            self.block.node,
            self.block.round,
            self.deps.len(),
        )
    }
}

impl<A> PartialEq for BlockGraph<A> {
    fn eq(&self, other: &Self) -> bool {
        self.identity() == other.identity()
    }
}

impl<A> Eq for BlockGraph<A> {}

impl<A> std::hash::Hash for BlockGraph<A> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::hash::Hash::hash(&self.identity(), state);
    }
}

// =============================================================================
// CLUSTER C: QUORUM
// =============================================================================

/// Lifecycle of a quorum-tracking job, in total order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum JobState {
    Queued,
    #[default]
    Started,
    Pending,
    Partial,
    Dialling,
    Answered,
    Dead,
    /// Quorum reached.
    Blockmainia,
    Running,
    /// Terminal.
    Polished,
}

impl JobState {
    /// Quorum decisions are one-way: these states never return to bookkeeping.
    pub fn is_locked(&self) -> bool {
        matches!(
            self,
            JobState::Blockmainia | JobState::Running | JobState::Polished
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Polished)
    }

    /// Whether a job may move from `self` to `next`.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        match (self, next) {
            (current, next) if *current == next => true,
            (JobState::Polished, _) => false,
            (current, next) if !current.is_locked() => {
                !next.is_locked() || next == JobState::Blockmainia
            }
            (JobState::Blockmainia, JobState::Running | JobState::Polished) => true,
            (JobState::Running, JobState::Polished) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Queued => "queued",
            JobState::Started => "started",
            JobState::Pending => "pending",
            JobState::Partial => "partial",
            JobState::Dialling => "dialling",
            JobState::Answered => "answered",
            JobState::Dead => "dead",
            JobState::Blockmainia => "blockmainia",
            JobState::Running => "running",
            JobState::Polished => "polished",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quorum-tracking record, one per root hash.
///
/// Once `status` is locked, `waiting_on` is empty and stays empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Attachment")]
pub struct Job<A> {
    pub id: Uuid,
    pub hash: Hash,
    /// Node that created this record.
    pub node: NodeId,
    /// Authors seen among the model's dependencies.
    pub nodes: Vec<NodeId>,
    /// Cluster members not seen yet.
    pub waiting_on: Vec<NodeId>,
    pub total_nodes: usize,
    pub expected_total_nodes: usize,
    pub status: JobState,
    pub model: BlockGraph<A>,
    pub epoch: u64,
    /// Unix seconds of the last persisted mutation.
    pub updated_at: u64,
}
