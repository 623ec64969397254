//! Redis (or Dragonfly) backend for the response cache.
//!
//! Values are stored as raw bytes with `SETEX`, so every entry carries the TTL
//! of the read operation that produced it. Per-principal invalidation relies on
//! `SCAN MATCH` over the keyspace followed by batched `DEL`; the walk is
//! non-blocking for the server but its cost grows with the number of keys.
//! Compiled only with the `cache-redis` feature.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheService;
use crate::config::loader::redact_url;
use crate::config::RedisConfig;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::time::Duration;
use tracing::debug;

/// Keys requested per SCAN round trip
const SCAN_BATCH: usize = 100;

fn backend_error(command: &'static str) -> impl FnOnce(RedisError) -> CacheError {
    move |e| CacheError::BackendError(format!("{command} failed: {e}"))
}

#[derive(Clone)]
pub struct RedisCacheService {
    connection: ConnectionManager,
}

impl std::fmt::Debug for RedisCacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCacheService").finish_non_exhaustive()
    }
}

impl RedisCacheService {
    /// Connects eagerly so an unreachable server is reported here, where the
    /// provider can still fall back to the no-op backend.
    pub async fn from_config(config: &RedisConfig) -> CacheResult<Self> {
        let redacted = redact_url(&config.url);
        let client = redis::Client::open(config.url.as_str()).map_err(|e| {
            CacheError::ConnectionError(format!("invalid cache url {redacted}: {e}"))
        })?;
        let connection = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("cannot reach cache at {redacted}: {e}"))
        })?;

        debug!(url = %redacted, "Redis cache backend connected");
        Ok(Self { connection })
    }
}

impl CacheService for RedisCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.connection.clone();
        conn.get(key).await.map_err(backend_error("GET"))
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let mut conn = self.connection.clone();
        // SETEX rejects a zero expiry
        let seconds = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, seconds)
            .await
            .map_err(backend_error("SETEX"))
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let removed: u64 = conn.del(key).await.map_err(backend_error("DEL"))?;
        Ok(removed > 0)
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let mut conn = self.connection.clone();
        let mut cursor: u64 = 0;
        let mut deleted = 0;

        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(backend_error("SCAN"))?;

            if !batch.is_empty() {
                let removed: u64 = conn.del(&batch).await.map_err(backend_error("DEL"))?;
                deleted += removed;
            }

            if next == 0 {
                break;
            }
            cursor = next;
        }

        debug!(pattern = pattern, deleted = deleted, "Redis pattern invalidation");
        Ok(deleted)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        let mut conn = self.connection.clone();
        let reply: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(backend_error("PING"))?;
        Ok(reply == "PONG")
    }

    fn provider_name(&self) -> &'static str {
        "redis"
    }

    fn is_distributed(&self) -> bool {
        true
    }
}
