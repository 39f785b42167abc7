//! Storage domain: key layout and record codec.

pub mod codec;
pub mod keys;

pub use keys::KeyPrefix;
