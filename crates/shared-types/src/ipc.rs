//! # Message Payloads
//!
//! Messages exchanged between the subsystems of one node and between peers.
//!
//! - `RegisterMessage`: the sole inbound trigger for processing a root.
//! - `GossipBatch` / `GossipReply`: peer replication.
//! - `InterpretedBatch`: output of the ordering engine for one finalized round.

use crate::entities::*;
use crate::errors::ContractViolation;
use serde::{Deserialize, Serialize};

/// Instruction to begin or continue processing a root's graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegisterMessage {
    pub hash: Hash,
}

impl RegisterMessage {
    /// Build from raw bytes, which must be exactly [`HASH_LEN`] long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ContractViolation> {
        let hash: Hash = bytes
            .try_into()
            .map_err(|_| ContractViolation::HashLength {
                expected: HASH_LEN,
                actual: bytes.len(),
            })?;
        Ok(Self { hash })
    }

    /// Build from the 64-character hex form.
    pub fn from_hex(text: &str) -> Result<Self, ContractViolation> {
        if text.len() != HASH_LEN * 2 {
            return Err(ContractViolation::HashLength {
                expected: HASH_LEN,
                actual: text.len() / 2,
            });
        }
        let bytes =
            hex::decode(text).map_err(|e| ContractViolation::HashEncoding(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

/// A batch of graph fragments pushed from one node to a peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Attachment")]
pub struct GossipBatch<A> {
    pub sender: NodeId,
    pub fragments: Vec<BlockGraph<A>>,
}

impl<A> GossipBatch<A> {
    /// Distinct root hashes carried by this batch, in first-seen order.
    pub fn hashes(&self) -> Vec<Hash> {
        let mut hashes: Vec<Hash> = Vec::new();
        for fragment in &self.fragments {
            if !hashes.contains(&fragment.block.hash) {
                hashes.push(fragment.block.hash);
            }
        }
        hashes
    }
}

/// A peer's answer to a gossip batch: the root hashes it accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GossipReply {
    pub accepted: Vec<Hash>,
}

/// Ordered output of the ordering engine for one finalized round of a root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "A: Attachment")]
pub struct InterpretedBatch<A> {
    pub hash: Hash,
    pub round: u64,
    pub blocks: Vec<BlockId<A>>,
}
