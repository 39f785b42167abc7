//! Gossip configuration

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GossipConfig {
    /// Fragments per pushed batch.
    pub batch_size: usize,
    /// Pause between replication passes.
    pub interval: Duration,
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            batch_size: 20,
            interval: Duration::from_secs(1),
        }
    }
}
