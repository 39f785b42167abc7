//! Record codec (bincode).

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::StoreResult;

pub fn encode<T: Serialize>(record: &T) -> StoreResult<Vec<u8>> {
    Ok(bincode::serialize(record)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StoreResult<T> {
    Ok(bincode::deserialize(bytes)?)
}
