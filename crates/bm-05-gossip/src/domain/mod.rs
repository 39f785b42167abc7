pub mod batching;
pub mod codec;

pub use batching::{confirmed_hashes, plan_batches};
pub use codec::{decode_batch, decode_reply, encode_batch, encode_reply};
