//! In-memory cache provider
//!
//! Per-entry TTL and glob-pattern deletion over a `DashMap`, for single-process
//! deployments and tests. Not distributed: each process keeps its own state.
//!
//! An outage switch (`set_available(false)`) makes every operation fail with a
//! connection error, which lets tests exercise the degraded paths without a
//! real network backend.

use crate::cache::errors::{CacheError, CacheResult};
use crate::cache::traits::CacheService;
use crate::config::MemoryCacheConfig;
use dashmap::DashMap;
use glob::Pattern;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Cloning shares the underlying map.
#[derive(Debug, Clone)]
pub struct InMemoryCacheService {
    entries: Arc<DashMap<String, CacheEntry>>,
    max_entries: usize,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryCacheService {
    fn default() -> Self {
        Self::from_config(&MemoryCacheConfig::default())
    }
}

impl InMemoryCacheService {
    pub fn from_config(config: &MemoryCacheConfig) -> Self {
        debug!(max_entries = config.max_entries, "In-memory cache service created");
        Self {
            entries: Arc::new(DashMap::new()),
            max_entries: config.max_entries.max(1),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self::from_config(&MemoryCacheConfig { max_entries })
    }

    /// Toggle the simulated outage
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
    }

    /// Live (unexpired) entry count
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.iter().filter(|e| !e.is_expired(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains_key(&self, key: &str) -> bool {
        let now = Instant::now();
        self.entries
            .get(key)
            .map(|e| !e.is_expired(now))
            .unwrap_or(false)
    }

    /// Live keys matching a glob pattern, sorted
    pub fn keys_matching(&self, pattern: &str) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .iter()
            .filter(|e| !e.is_expired(now) && glob_match(pattern, e.key()))
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        keys
    }

    fn ensure_available(&self, operation: &str) -> CacheResult<()> {
        if self.available.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CacheError::ConnectionError(format!(
                "in-memory cache unavailable during {operation}"
            )))
        }
    }

    fn make_room(&self, incoming_key: &str) {
        if self.entries.len() < self.max_entries || self.entries.contains_key(incoming_key) {
            return;
        }

        let now = Instant::now();
        self.entries.retain(|_, entry| !entry.is_expired(now));

        if self.entries.len() >= self.max_entries {
            let soonest = self
                .entries
                .iter()
                .min_by_key(|e| e.expires_at)
                .map(|e| e.key().clone());
            if let Some(key) = soonest {
                debug!(key = %key, "Evicting entry to stay within max_entries");
                self.entries.remove(&key);
            }
        }
    }
}

impl CacheService for InMemoryCacheService {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        self.ensure_available("GET")?;
        let now = Instant::now();

        let hit = match self.entries.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };

        if hit.is_none() {
            self.entries.remove_if(key, |_, e| e.is_expired(now));
        }
        Ok(hit)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        self.ensure_available("SET")?;
        self.make_room(key);
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                value: value.to_vec(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.ensure_available("DEL")?;
        let now = Instant::now();
        Ok(self
            .entries
            .remove(key)
            .map(|(_, e)| !e.is_expired(now))
            .unwrap_or(false))
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        self.ensure_available("pattern DEL")?;
        let matcher = Pattern::new(pattern).map_err(|e| {
            CacheError::BackendError(format!("invalid key pattern {pattern:?}: {e}"))
        })?;
        let now = Instant::now();
        let mut deleted = 0u64;
        self.entries.retain(|key, entry| {
            if matcher.matches(key) {
                if !entry.is_expired(now) {
                    deleted += 1;
                }
                false
            } else {
                true
            }
        });
        Ok(deleted)
    }

    async fn health_check(&self) -> CacheResult<bool> {
        Ok(self.available.load(Ordering::Acquire))
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }

    fn is_distributed(&self) -> bool {
        false
    }
}

/// Redis-compatible glob matching for `*` (any run) and `?` (one character).
/// An unparseable pattern matches nothing.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    Pattern::new(pattern)
        .map(|p| p.matches(candidate))
        .unwrap_or(false)
}
