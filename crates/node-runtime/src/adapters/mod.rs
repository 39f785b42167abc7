//! Port implementations connecting the subsystems of one node.

pub mod registration;

pub use registration::{DeliveryOutbox, OutboxSink, SupervisorHandler};
