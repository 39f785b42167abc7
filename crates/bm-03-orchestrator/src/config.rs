//! Orchestrator configuration

use shared_types::NodeId;

/// Configuration shared by every per-root orchestrator of a node.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub node_id: NodeId,
    /// Address handed to ordering engines as this node's identity.
    pub self_address: String,
    /// Number of nodes in the cluster, including this one.
    pub cluster_size: usize,
    /// Bounded mailbox depth of each orchestrator.
    pub mailbox_capacity: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::default(),
            self_address: "127.0.0.1:7400".to_string(),
            cluster_size: 1,
            mailbox_capacity: 64,
        }
    }
}

impl OrchestratorConfig {
    pub fn for_node(node_id: NodeId, self_address: impl Into<String>, cluster_size: usize) -> Self {
        Self {
            node_id,
            self_address: self_address.into(),
            cluster_size,
            ..Self::default()
        }
    }
}
