pub mod inbound;
pub mod outbound;

pub use inbound::DeliveryApi;
pub use outbound::{AckTransport, DeliveryHandler, DeliveryTransport, SnapshotStore};
