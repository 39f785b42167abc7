use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::NodeId;

use crate::ports::outbound::Membership;

/// Membership list maintained by the host, e.g. from configuration or a
/// failure detector callback.
#[derive(Default)]
pub struct StaticMembership {
    members: RwLock<Vec<NodeId>>,
}

impl StaticMembership {
    pub fn new(members: Vec<NodeId>) -> Self {
        Self {
            members: RwLock::new(members),
        }
    }

    /// Replace the member list.
    pub fn set(&self, members: Vec<NodeId>) {
        *self.members.write() = members;
    }
}

#[async_trait]
impl Membership for StaticMembership {
    async fn members(&self) -> Vec<NodeId> {
        self.members.read().clone()
    }
}
