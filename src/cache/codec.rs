//! Cache value encoding.
//!
//! JSON first, `bincode` only when JSON cannot represent the value (for example a
//! map with non-string keys). Decoding mirrors it: JSON first, `bincode` second.

use super::errors::{CacheError, CacheResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn encode<T: Serialize>(value: &T) -> CacheResult<Vec<u8>> {
    match serde_json::to_vec(value) {
        Ok(bytes) => Ok(bytes),
        Err(json_err) => bincode::serialize(value).map_err(|bin_err| {
            CacheError::SerializationError(format!(
                "json encoding failed ({json_err}); bincode fallback failed ({bin_err})"
            ))
        }),
    }
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CacheResult<T> {
    match serde_json::from_slice(bytes) {
        Ok(value) => Ok(value),
        Err(json_err) => bincode::deserialize(bytes).map_err(|bin_err| {
            CacheError::SerializationError(format!(
                "json decoding failed ({json_err}); bincode fallback failed ({bin_err})"
            ))
        }),
    }
}
