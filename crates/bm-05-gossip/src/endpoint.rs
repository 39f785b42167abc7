//! # Gossip Endpoint
//!
//! Receiving side of replication. Unsigned fragments are dropped; the rest
//! are stored as fresh (`included = false`, `replied = false`) so the local
//! orchestrator folds them on its next registration. A root hash is
//! accepted only when every fragment the batch carried for it was stored.

use async_trait::async_trait;
use bm_01_graph_storage::BlockGraphStore;
use bm_telemetry::{metric_inc, FRAGMENTS_REJECTED};
use shared_types::{hash_hex, Attachment, GossipBatch, GossipReply, Hash, NodeId};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::codec::{decode_batch, encode_reply};
use crate::error::GossipResult;
use crate::ports::inbound::GossipEndpointApi;
use crate::ports::outbound::RegistrationSink;

pub struct GossipEndpoint<A: Attachment> {
    node: NodeId,
    graphs: Arc<dyn BlockGraphStore<A>>,
    sink: Arc<dyn RegistrationSink>,
}

impl<A: Attachment> GossipEndpoint<A> {
    pub fn new(
        node: NodeId,
        graphs: Arc<dyn BlockGraphStore<A>>,
        sink: Arc<dyn RegistrationSink>,
    ) -> Self {
        Self { node, graphs, sink }
    }
}

#[async_trait]
impl<A: Attachment> GossipEndpointApi<A> for GossipEndpoint<A> {
    async fn accept(&self, batch: GossipBatch<A>) -> GossipReply {
        let order = batch.hashes();
        let mut refused: BTreeSet<Hash> = BTreeSet::new();

        for mut fragment in batch.fragments {
            let hash = fragment.block.hash;
            if !fragment.block.signed.is_signed() {
                metric_inc!(FRAGMENTS_REJECTED, &["missing_signature"]);
                warn!(
                    hash = %hash_hex(&hash),
                    from = %batch.sender,
                    "[bm-05] dropped unsigned fragment"
                );
                refused.insert(hash);
                continue;
            }
            fragment.included = false;
            fragment.replied = false;
            if let Err(e) = self.graphs.put(&fragment).await {
                warn!(
                    hash = %hash_hex(&hash),
                    key = %fragment.key(),
                    error = %e,
                    "[bm-05] fragment not stored"
                );
                refused.insert(hash);
            }
        }

        let accepted: Vec<Hash> = order.into_iter().filter(|h| !refused.contains(h)).collect();
        for hash in &accepted {
            self.sink.notify(*hash).await;
        }
        debug!(
            node = %self.node,
            from = %batch.sender,
            accepted = accepted.len(),
            refused = refused.len(),
            "[bm-05] batch ingested"
        );
        GossipReply { accepted }
    }

    async fn accept_bytes(&self, bytes: &[u8]) -> GossipResult<Vec<u8>> {
        let batch = decode_batch(bytes)?;
        let reply = self.accept(batch).await;
        encode_reply(&reply)
    }
}
