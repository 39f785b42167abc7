pub mod inbound;
pub mod outbound;

pub use inbound::{GossipEndpointApi, ReplicationReport, ReplicatorApi};
pub use outbound::{PeerDirectory, PeerTransport, RegistrationSink};
