//! Cache provider with integrated circuit breaker
//!
//! Enum dispatch over the concrete backends (no vtable). Distributed backends
//! are guarded by a circuit breaker: while it is open, reads behave as misses
//! and writes/deletes as no-ops, so a dead Redis costs nothing per request.

use super::errors::CacheResult;
use super::providers::{InMemoryCacheService, NoOpCacheService};
use super::traits::CacheService;
use crate::config::{CacheConfig, CircuitBreakerSettings};
use crate::resilience::{CircuitBreaker, CircuitState};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[cfg(feature = "cache-redis")]
use super::providers::RedisCacheService;

#[derive(Debug, Clone)]
enum CacheBackend {
    #[cfg(feature = "cache-redis")]
    Redis(Box<RedisCacheService>),
    Memory(InMemoryCacheService),
    NoOp(NoOpCacheService),
}

impl CacheBackend {
    fn is_distributed(&self) -> bool {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.is_distributed(),
            Self::Memory(s) => s.is_distributed(),
            Self::NoOp(s) => s.is_distributed(),
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.provider_name(),
            Self::Memory(s) => s.provider_name(),
            Self::NoOp(s) => s.provider_name(),
        }
    }

    fn is_enabled(&self) -> bool {
        !matches!(self, Self::NoOp(_))
    }

    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.get(key).await,
            Self::Memory(s) => s.get(key).await,
            Self::NoOp(s) => s.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.set(key, value, ttl).await,
            Self::Memory(s) => s.set(key, value, ttl).await,
            Self::NoOp(s) => s.set(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.delete(key).await,
            Self::Memory(s) => s.delete(key).await,
            Self::NoOp(s) => s.delete(key).await,
        }
    }

    async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.delete_pattern(pattern).await,
            Self::Memory(s) => s.delete_pattern(pattern).await,
            Self::NoOp(s) => s.delete_pattern(pattern).await,
        }
    }

    async fn health_check(&self) -> CacheResult<bool> {
        match self {
            #[cfg(feature = "cache-redis")]
            Self::Redis(s) => s.health_check().await,
            Self::Memory(s) => s.health_check().await,
            Self::NoOp(s) => s.health_check().await,
        }
    }
}

/// Unified cache handle, injected into the orchestration services.
#[derive(Clone)]
pub struct CacheProvider {
    backend: CacheBackend,
    circuit_breaker: Option<Arc<CircuitBreaker>>,
}

impl std::fmt::Debug for CacheProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheProvider")
            .field("backend", &self.backend)
            .field(
                "circuit_breaker",
                &self.circuit_breaker.as_ref().map(|cb| cb.state()),
            )
            .finish()
    }
}

impl CacheProvider {
    /// Build from configuration, never failing.
    ///
    /// A disabled cache, an unknown backend name or an unreachable Redis all
    /// yield a NoOp provider with a warning.
    pub async fn from_config_graceful(
        config: &CacheConfig,
        cb_settings: Option<&CircuitBreakerSettings>,
    ) -> Self {
        let backend = Self::create_backend(config).await;

        let circuit_breaker = if backend.is_distributed() && backend.is_enabled() {
            cb_settings.filter(|s| s.enabled).map(|settings| {
                info!(
                    failure_threshold = settings.failure_threshold,
                    timeout_seconds = settings.timeout_seconds,
                    "Cache circuit breaker initialized"
                );
                Arc::new(CircuitBreaker::new(
                    "cache".to_string(),
                    settings.to_resilience_config(),
                ))
            })
        } else {
            None
        };

        Self {
            backend,
            circuit_breaker,
        }
    }

    async fn create_backend(config: &CacheConfig) -> CacheBackend {
        if !config.enabled {
            info!("Response cache disabled by configuration");
            return CacheBackend::NoOp(NoOpCacheService::new());
        }

        match config.backend.as_str() {
            "redis" | "dragonfly" => Self::create_redis_backend(config).await,
            "memory" | "in-memory" => {
                info!(
                    backend = "memory",
                    max_entries = config.memory.max_entries,
                    "In-memory cache provider initialized"
                );
                CacheBackend::Memory(InMemoryCacheService::from_config(&config.memory))
            }
            "none" => CacheBackend::NoOp(NoOpCacheService::new()),
            other => {
                warn!(backend = other, "Unknown cache backend, falling back to NoOp");
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        }
    }

    #[cfg(feature = "cache-redis")]
    async fn create_redis_backend(config: &CacheConfig) -> CacheBackend {
        let redis_config = match &config.redis {
            Some(rc) => rc,
            None => {
                warn!("Redis cache enabled but no [cache.redis] config found, falling back to NoOp");
                return CacheBackend::NoOp(NoOpCacheService::new());
            }
        };

        match RedisCacheService::from_config(redis_config).await {
            Ok(service) => {
                info!(backend = "redis", "Distributed cache provider initialized");
                CacheBackend::Redis(Box::new(service))
            }
            Err(e) => {
                warn!(
                    error = %e,
                    "Failed to connect to Redis, falling back to NoOp cache"
                );
                CacheBackend::NoOp(NoOpCacheService::new())
            }
        }
    }

    #[cfg(not(feature = "cache-redis"))]
    async fn create_redis_backend(_config: &CacheConfig) -> CacheBackend {
        warn!("Redis cache backend requested but 'cache-redis' feature not enabled, using NoOp");
        CacheBackend::NoOp(NoOpCacheService::new())
    }

    pub fn noop() -> Self {
        Self {
            backend: CacheBackend::NoOp(NoOpCacheService::new()),
            circuit_breaker: None,
        }
    }

    pub fn memory(service: InMemoryCacheService) -> Self {
        Self {
            backend: CacheBackend::Memory(service),
            circuit_breaker: None,
        }
    }

    /// Attach a breaker explicitly, regardless of backend kind
    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.circuit_breaker = Some(circuit_breaker);
        self
    }

    fn guard(&self) -> Option<&Arc<CircuitBreaker>> {
        self.circuit_breaker
            .as_ref()
            .filter(|_| self.backend.is_enabled())
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_enabled()
    }

    pub fn is_distributed(&self) -> bool {
        self.backend.is_distributed()
    }

    pub fn provider_name(&self) -> &'static str {
        self.backend.provider_name()
    }

    pub fn circuit_state(&self) -> Option<CircuitState> {
        self.circuit_breaker.as_ref().map(|cb| cb.state())
    }

    fn record<T>(cb: &CircuitBreaker, started: Instant, result: &CacheResult<T>) {
        match result {
            Ok(_) => cb.record_success_manual(started.elapsed()),
            Err(_) => cb.record_failure_manual(started.elapsed()),
        }
    }

    /// Open circuit: `Ok(None)`
    pub async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let Some(cb) = self.guard() else {
            return self.backend.get(key).await;
        };
        if !cb.should_allow() {
            debug!(key = key, "Cache circuit open, returning miss");
            return Ok(None);
        }

        let started = Instant::now();
        let result = self.backend.get(key).await;
        Self::record(cb, started, &result);
        result
    }

    /// Open circuit: `Ok(())`
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
        let Some(cb) = self.guard() else {
            return self.backend.set(key, value, ttl).await;
        };
        if !cb.should_allow() {
            debug!(key = key, "Cache circuit open, skipping set");
            return Ok(());
        }

        let started = Instant::now();
        let result = self.backend.set(key, value, ttl).await;
        Self::record(cb, started, &result);
        result
    }

    /// Open circuit: `Ok(false)`
    pub async fn delete(&self, key: &str) -> CacheResult<bool> {
        let Some(cb) = self.guard() else {
            return self.backend.delete(key).await;
        };
        if !cb.should_allow() {
            debug!(key = key, "Cache circuit open, skipping delete");
            return Ok(false);
        }

        let started = Instant::now();
        let result = self.backend.delete(key).await;
        Self::record(cb, started, &result);
        result
    }

    /// Open circuit: `Ok(0)`
    pub async fn delete_pattern(&self, pattern: &str) -> CacheResult<u64> {
        let Some(cb) = self.guard() else {
            return self.backend.delete_pattern(pattern).await;
        };
        if !cb.should_allow() {
            debug!(pattern = pattern, "Cache circuit open, skipping delete_pattern");
            return Ok(0);
        }

        let started = Instant::now();
        let result = self.backend.delete_pattern(pattern).await;
        Self::record(cb, started, &result);
        result
    }

    /// Open circuit: `Ok(false)`
    pub async fn health_check(&self) -> CacheResult<bool> {
        let Some(cb) = self.guard() else {
            return self.backend.health_check().await;
        };
        if !cb.should_allow() {
            return Ok(false);
        }

        let started = Instant::now();
        let result = self.backend.health_check().await;
        match &result {
            Ok(true) => cb.record_success_manual(started.elapsed()),
            Ok(false) | Err(_) => cb.record_failure_manual(started.elapsed()),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::CircuitBreakerConfig;

    fn breaker(failure_threshold: u32) -> Arc<CircuitBreaker> {
        Arc::new(CircuitBreaker::new(
            "cache".to_string(),
            CircuitBreakerConfig {
                failure_threshold,
                timeout: Duration::from_secs(30),
                success_threshold: 1,
            },
        ))
    }

    #[tokio::test]
    async fn test_disabled_config_yields_noop() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config, None).await;
        assert!(!provider.is_enabled());
        assert_eq!(provider.provider_name(), "noop");
    }

    #[tokio::test]
    async fn test_unknown_backend_degrades_to_noop() {
        let config = CacheConfig {
            backend: "memcached".to_string(),
            ..CacheConfig::default()
        };
        let provider = CacheProvider::from_config_graceful(&config, None).await;
        assert_eq!(provider.provider_name(), "noop");
    }

    #[tokio::test]
    async fn test_redis_without_section_degrades_to_noop() {
        let config = CacheConfig {
            backend: "redis".to_string(),
            redis: None,
            ..CacheConfig::default()
        };
        let provider =
            CacheProvider::from_config_graceful(&config, Some(&CircuitBreakerSettings::default()))
                .await;
        assert_eq!(provider.provider_name(), "noop");
        assert!(provider.circuit_state().is_none());
    }

    #[tokio::test]
    async fn test_memory_backend_has_no_breaker_by_default() {
        let provider = CacheProvider::from_config_graceful(
            &CacheConfig::default(),
            Some(&CircuitBreakerSettings::default()),
        )
        .await;
        assert_eq!(provider.provider_name(), "memory");
        assert!(!provider.is_distributed());
        assert!(provider.circuit_state().is_none());
    }

    #[tokio::test]
    async fn test_open_circuit_turns_reads_into_misses() {
        let memory = InMemoryCacheService::default();
        let provider = CacheProvider::memory(memory.clone()).with_circuit_breaker(breaker(2));

        provider.set("task:1", b"v", Duration::from_secs(60)).await.unwrap();
        memory.set_available(false);

        assert!(provider.get("task:1").await.is_err());
        assert!(provider.get("task:1").await.is_err());
        assert_eq!(provider.circuit_state(), Some(CircuitState::Open));

        // fails fast now, even though the backend is back
        memory.set_available(true);
        assert_eq!(provider.get("task:1").await.unwrap(), None);
        assert!(!provider.delete("task:1").await.unwrap());
        assert_eq!(provider.delete_pattern("*").await.unwrap(), 0);
        assert!(memory.contains_key("task:1"));
    }
}
