//! Typed cache facade that never fails its caller.
//!
//! Every backend or codec error is logged at `error` level and converted into a
//! miss (`get`), `false` (`set`/`delete`) or `0` (`delete_matching`). Business
//! operations therefore never observe cache trouble.

use super::codec;
use super::provider::CacheProvider;
use crate::logging::log_cache_operation;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::error;

#[derive(Debug, Clone)]
pub struct CacheStore {
    provider: CacheProvider,
}

impl CacheStore {
    pub fn new(provider: CacheProvider) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &CacheProvider {
        &self.provider
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = match self.provider.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log_cache_operation("get", key, "miss");
                return None;
            }
            Err(e) => {
                error!(cache_key = key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        match codec::decode(&bytes) {
            Ok(value) => {
                log_cache_operation("get", key, "hit");
                Some(value)
            }
            Err(e) => {
                error!(cache_key = key, error = %e, "Cached value undecodable, treating as miss");
                None
            }
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let bytes = match codec::encode(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(cache_key = key, error = %e, "Cache value could not be encoded");
                return false;
            }
        };

        match self.provider.set(key, &bytes, ttl).await {
            Ok(()) => {
                log_cache_operation("set", key, "stored");
                true
            }
            Err(e) => {
                error!(cache_key = key, error = %e, "Cache write failed");
                false
            }
        }
    }

    pub async fn delete(&self, key: &str) -> bool {
        match self.provider.delete(key).await {
            Ok(removed) => removed,
            Err(e) => {
                error!(cache_key = key, error = %e, "Cache delete failed");
                false
            }
        }
    }

    pub async fn delete_matching(&self, pattern: &str) -> u64 {
        match self.provider.delete_pattern(pattern).await {
            Ok(count) => {
                log_cache_operation("delete_matching", pattern, &count.to_string());
                count
            }
            Err(e) => {
                error!(cache_pattern = pattern, error = %e, "Cache pattern delete failed");
                0
            }
        }
    }
}
