//! # Outbound Ports (Driven Ports)

use async_trait::async_trait;
use shared_types::NodeId;

/// Current cluster membership, as seen by the failure detector.
#[async_trait]
pub trait Membership: Send + Sync {
    /// Every live member, including the local node.
    async fn members(&self) -> Vec<NodeId>;
}
