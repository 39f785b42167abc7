//! # Inbound Ports (Driving Ports)

use async_trait::async_trait;
use shared_types::{Attachment, GossipBatch, GossipReply, Hash};

use crate::error::GossipResult;

/// Outcome of one replication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicationReport {
    pub batches: usize,
    /// Fragments pushed across all batches.
    pub fragments: usize,
    /// Fragments flipped to `replied`.
    pub replied: usize,
    /// Hashes every peer accepted.
    pub confirmed: Vec<Hash>,
    /// Hashes of batches with a failed push.
    pub failed: Vec<Hash>,
}

#[async_trait]
pub trait ReplicatorApi: Send + Sync {
    /// Push every included, unreplied local fragment to all peers.
    async fn replicate_once(&self) -> GossipResult<ReplicationReport>;
}

/// The receiving side of gossip.
#[async_trait]
pub trait GossipEndpointApi<A: Attachment>: Send + Sync {
    async fn accept(&self, batch: GossipBatch<A>) -> GossipReply;

    /// Decode a wire batch, accept it and encode the reply.
    async fn accept_bytes(&self, bytes: &[u8]) -> GossipResult<Vec<u8>>;
}
