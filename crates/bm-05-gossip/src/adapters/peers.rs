use parking_lot::RwLock;
use shared_types::{NodeId, PeerInfo};

use crate::ports::outbound::PeerDirectory;

/// Fixed peer list, with the local node filtered out.
pub struct StaticPeers {
    peers: RwLock<Vec<PeerInfo>>,
}

impl StaticPeers {
    pub fn new(local: NodeId, members: Vec<PeerInfo>) -> Self {
        let peers = members
            .into_iter()
            .filter(|peer| peer.node_id != local)
            .collect();
        Self {
            peers: RwLock::new(peers),
        }
    }

    /// Add a peer, replacing any entry with the same node id.
    pub fn upsert(&self, peer: PeerInfo) {
        let mut peers = self.peers.write();
        peers.retain(|p| p.node_id != peer.node_id);
        peers.push(peer);
    }
}

impl PeerDirectory for StaticPeers {
    fn peers(&self) -> Vec<PeerInfo> {
        self.peers.read().clone()
    }
}
