//! Peer directory and in-process transport.

pub mod in_process;
pub mod peers;

pub use in_process::InProcessNetwork;
pub use peers::StaticPeers;
