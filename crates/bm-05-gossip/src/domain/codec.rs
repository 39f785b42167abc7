//! Wire format.
//!
//! Every frame is `bincode((version, body))`. Decoding rejects frames from a
//! different protocol version before touching the body.

use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Attachment, GossipBatch, GossipReply, PROTOCOL_VERSION};

use crate::error::{GossipError, GossipResult};

fn encode<T: Serialize>(body: &T) -> GossipResult<Vec<u8>> {
    Ok(bincode::serialize(&(PROTOCOL_VERSION, body))?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> GossipResult<T> {
    let version: u16 = bincode::deserialize(bytes)?;
    if version != PROTOCOL_VERSION {
        return Err(GossipError::Version {
            expected: PROTOCOL_VERSION,
            actual: version,
        });
    }
    let (_, body): (u16, T) = bincode::deserialize(bytes)?;
    Ok(body)
}

pub fn encode_batch<A: Attachment>(batch: &GossipBatch<A>) -> GossipResult<Vec<u8>> {
    encode(batch)
}

pub fn decode_batch<A: Attachment>(bytes: &[u8]) -> GossipResult<GossipBatch<A>> {
    decode(bytes)
}

pub fn encode_reply(reply: &GossipReply) -> GossipResult<Vec<u8>> {
    encode(reply)
}

pub fn decode_reply(bytes: &[u8]) -> GossipResult<GossipReply> {
    decode(bytes)
}
