//! # Gossip Replication (bm-05)
//!
//! Moves block-graph fragments between cluster members.
//!
//! ```text
//! node A                                   node B
//! GossipReplicator ── GossipBatch ──→ GossipEndpoint ──→ BlockGraphStore
//!   │                                      │
//!   │ ◀──────── GossipReply{accepted} ─────┘──→ RegistrationSink (register hash)
//!   ▼
//! jobs Queued / Dead, fragments replied
//! ```
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - batch planning, reply intersection, wire codec
//! - `ports/` - `ReplicatorApi`, `GossipEndpointApi` (inbound); transport,
//!   peer directory, registration sink (outbound)
//! - `adapters/` - static peer list, in-process network
//! - `service.rs` - `GossipReplicator`
//! - `endpoint.rs` - `GossipEndpoint`

pub mod adapters;
pub mod config;
pub mod domain;
pub mod endpoint;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{InProcessNetwork, StaticPeers};
pub use config::GossipConfig;
pub use domain::{decode_batch, decode_reply, encode_batch, encode_reply};
pub use endpoint::GossipEndpoint;
pub use error::{GossipError, GossipResult};
pub use ports::{
    GossipEndpointApi, PeerDirectory, PeerTransport, RegistrationSink, ReplicationReport,
    ReplicatorApi,
};
pub use service::GossipReplicator;
