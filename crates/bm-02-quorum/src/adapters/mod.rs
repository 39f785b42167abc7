//! Adapters for the quorum ports.

pub mod membership;

pub use membership::StaticMembership;
