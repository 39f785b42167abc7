//! Quorum configuration.

use shared_types::NodeId;
use std::time::Duration;

/// Configuration for the job state machine.
#[derive(Debug, Clone)]
pub struct QuorumConfig {
    /// Local node identity.
    pub node_id: NodeId,
    /// Cluster size the deployment expects (recorded on each job).
    pub expected_total_nodes: usize,
    /// Dead and Polished jobs older than this are garbage collected.
    pub job_max_age: Duration,
    /// How often the garbage collector runs.
    pub gc_interval: Duration,
}

impl Default for QuorumConfig {
    fn default() -> Self {
        Self {
            node_id: NodeId::default(),
            expected_total_nodes: 4,
            job_max_age: Duration::from_secs(3600),
            gc_interval: Duration::from_secs(300),
        }
    }
}

impl QuorumConfig {
    pub fn for_node(node_id: NodeId, expected_total_nodes: usize) -> Self {
        Self {
            node_id,
            expected_total_nodes,
            ..Default::default()
        }
    }
}
