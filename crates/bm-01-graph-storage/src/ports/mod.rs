//! Ports (Hexagonal Architecture)

pub mod inbound;
pub mod outbound;

pub use inbound::{BlockGraphStore, InterpretedStore, JobStore, StatusUpdate};
pub use outbound::{BatchOperation, KeyValueStore, ScanResult};
