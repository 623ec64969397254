//! Read-through helper: serve from the cache, else load and populate.

use super::errors::ServiceResult;
use crate::cache::CacheStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Return the cached value under `key`, or run `load`, store its result with
/// `ttl` and return it. Load errors are returned as is and nothing is cached.
pub async fn cached_or_load<T, F, Fut>(
    cache: &CacheStore,
    key: &str,
    ttl: Duration,
    load: F,
) -> ServiceResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ServiceResult<T>>,
{
    if let Some(hit) = cache.get::<T>(key).await {
        debug!(cache_key = key, "Serving from cache");
        return Ok(hit);
    }

    let value = load().await?;
    cache.set(key, &value, ttl).await;
    Ok(value)
}
