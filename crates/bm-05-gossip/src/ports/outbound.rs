//! # Outbound Ports (Driven Ports)

use async_trait::async_trait;
use shared_types::{Attachment, GossipBatch, GossipReply, Hash, PeerInfo};

use crate::error::GossipResult;

/// Pushes a batch to one peer and returns what it accepted.
///
/// Timeouts belong to the transport; any error counts as a failed push.
#[async_trait]
pub trait PeerTransport<A: Attachment>: Send + Sync {
    async fn push(&self, peer: &PeerInfo, batch: &GossipBatch<A>) -> GossipResult<GossipReply>;
}

/// Current cluster peers, excluding the local node.
pub trait PeerDirectory: Send + Sync {
    fn peers(&self) -> Vec<PeerInfo>;
}

/// Told about every root hash the endpoint accepted.
#[async_trait]
pub trait RegistrationSink: Send + Sync {
    async fn notify(&self, hash: Hash);
}
