//! Ports (Hexagonal Architecture)

pub mod inbound;
pub mod outbound;

pub use inbound::{JobStateApi, Observation, SetStatesReport};
pub use outbound::Membership;
