//! Cache service trait definition

use super::errors::CacheResult;
use std::time::Duration;

/// Byte-level operations every cache backend provides.
///
/// Values are opaque bytes; encoding lives in [`crate::cache::codec`].
pub trait CacheService: Send + Sync {
    /// `Ok(Some(bytes))` on hit, `Ok(None)` on miss or expiry
    fn get(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = CacheResult<Option<Vec<u8>>>> + Send;

    fn set(
        &self,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> impl std::future::Future<Output = CacheResult<()>> + Send;

    /// Returns whether a key was actually removed
    fn delete(&self, key: &str) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    /// Delete all keys matching a glob pattern (`*`, `?`), returning the count removed
    fn delete_pattern(
        &self,
        pattern: &str,
    ) -> impl std::future::Future<Output = CacheResult<u64>> + Send;

    fn health_check(&self) -> impl std::future::Future<Output = CacheResult<bool>> + Send;

    fn provider_name(&self) -> &'static str;

    /// Whether state is shared across processes (and reached over the network)
    fn is_distributed(&self) -> bool;
}
