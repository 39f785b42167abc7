//! Gossip between nodes living in one process.
//!
//! Batches still go through the wire codec so the in-process path sees the
//! same bytes a socket would.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Attachment, GossipBatch, GossipReply, PeerInfo};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::domain::codec::{decode_reply, encode_batch};
use crate::error::{GossipError, GossipResult};
use crate::ports::inbound::GossipEndpointApi;
use crate::ports::outbound::PeerTransport;

/// Address book of endpoints, shared by every node of an in-process cluster.
pub struct InProcessNetwork<A: Attachment> {
    endpoints: RwLock<HashMap<String, Arc<dyn GossipEndpointApi<A>>>>,
    partitioned: RwLock<HashSet<String>>,
}

impl<A: Attachment> InProcessNetwork<A> {
    pub fn new() -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            partitioned: RwLock::new(HashSet::new()),
        }
    }

    pub fn register(&self, address: impl Into<String>, endpoint: Arc<dyn GossipEndpointApi<A>>) {
        self.endpoints.write().insert(address.into(), endpoint);
    }

    /// Make pushes to `address` fail until healed.
    pub fn partition(&self, address: &str) {
        self.partitioned.write().insert(address.to_string());
    }

    pub fn heal(&self, address: &str) {
        self.partitioned.write().remove(address);
    }

    fn endpoint(&self, peer: &PeerInfo) -> GossipResult<Arc<dyn GossipEndpointApi<A>>> {
        if self.partitioned.read().contains(&peer.address) {
            return Err(GossipError::Transport {
                peer: peer.address.clone(),
                reason: "partitioned".to_string(),
            });
        }
        self.endpoints
            .read()
            .get(&peer.address)
            .cloned()
            .ok_or_else(|| GossipError::Transport {
                peer: peer.address.clone(),
                reason: "no endpoint at address".to_string(),
            })
    }
}

impl<A: Attachment> Default for InProcessNetwork<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A: Attachment> PeerTransport<A> for InProcessNetwork<A> {
    async fn push(&self, peer: &PeerInfo, batch: &GossipBatch<A>) -> GossipResult<GossipReply> {
        let endpoint = self.endpoint(peer)?;
        let request = encode_batch(batch)?;
        let response = endpoint.accept_bytes(&request).await?;
        decode_reply(&response)
    }
}
