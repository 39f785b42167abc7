//! Snapshot stores and in-process links.

pub mod link;
pub mod snapshot;

pub use link::{ack_link, delivery_link, AckLink, LinkTransport, LossyTransport};
pub use snapshot::{InMemorySnapshotStore, KvSnapshotStore};
