//! Reliable delivery configuration

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    /// Pending deliveries are re-sent this often until acknowledged.
    pub redeliver_interval: Duration,
    /// How often the pending set is snapshotted.
    pub snapshot_interval: Duration,
    /// Newest snapshots always kept by pruning.
    pub keep_snapshots: usize,
    /// Delivery ids remembered per sender by the receiver.
    pub dedupe_window: usize,
    /// Depth of in-process links.
    pub channel_capacity: usize,
    /// Snapshot namespace, one per channel sharing a store.
    pub channel_name: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            redeliver_interval: Duration::from_secs(3),
            snapshot_interval: Duration::from_secs(30),
            keep_snapshots: 3,
            dedupe_window: 4096,
            channel_capacity: 256,
            channel_name: "registrations".to_string(),
        }
    }
}
