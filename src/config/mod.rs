//! # TaskTrack Configuration System
//!
//! Typed configuration for the cache backend, circuit breaker, enrichment worker,
//! database pool and token service. Every section carries serde defaults so a
//! partial file (or no file at all) still yields a complete configuration.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use tasktrack_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let attempts = manager.config().enrichment.max_attempts;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Cache backend names accepted by `CacheConfig::backend`
pub const KNOWN_CACHE_BACKENDS: &[&str] = &["redis", "dragonfly", "memory", "in-memory", "none"];

/// Root configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskTrackConfig {
    pub environment: String,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub circuit_breaker: CircuitBreakerSettings,
    pub enrichment: EnrichmentConfig,
    pub auth: AuthConfig,
}

/// Relational store connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost:5432/tasktrack_development".to_string(),
            max_connections: 10,
            acquire_timeout_seconds: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub backend: String,
    pub redis: Option<RedisConfig>,
    pub memory: MemoryCacheConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: "memory".to_string(),
            redis: None,
            memory: MemoryCacheConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryCacheConfig {
    pub max_entries: usize,
}

impl Default for MemoryCacheConfig {
    fn default() -> Self {
        Self { max_entries: 10_000 }
    }
}

/// Circuit breaker protecting the distributed cache backend
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    pub enabled: bool,
    pub failure_threshold: u32,
    pub timeout_seconds: u64,
    pub success_threshold: u32,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            timeout_seconds: 30,
            success_threshold: 2,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_resilience_config(&self) -> crate::resilience::CircuitBreakerConfig {
        crate::resilience::CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            timeout: Duration::from_secs(self.timeout_seconds),
            success_threshold: self.success_threshold,
        }
    }
}

/// Background enrichment worker settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    pub endpoint_base_url: String,
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_multiplier: f64,
    pub backoff_max_seconds: u64,
    pub worker_concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            endpoint_base_url: "https://jsonplaceholder.typicode.com/todos".to_string(),
            request_timeout_ms: constants::enrichment::REQUEST_TIMEOUT_MS,
            max_attempts: constants::enrichment::MAX_ATTEMPTS,
            backoff_base_seconds: constants::enrichment::BACKOFF_BASE_SECONDS,
            backoff_multiplier: constants::enrichment::BACKOFF_MULTIPLIER,
            backoff_max_seconds: constants::enrichment::BACKOFF_MAX_SECONDS,
            worker_concurrency: constants::enrichment::WORKER_CONCURRENCY,
        }
    }
}

impl EnrichmentConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_seconds)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_secs(self.backoff_max_seconds)
    }
}

/// Token service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_expiry_minutes: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            jwt_issuer: "tasktrack".to_string(),
            token_expiry_minutes: 30,
        }
    }
}

impl TaskTrackConfig {
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Validate cross-field constraints after loading
    pub fn validate(&self) -> ConfigResult<()> {
        if !KNOWN_CACHE_BACKENDS.contains(&self.cache.backend.as_str()) {
            return Err(ConfigurationError::invalid_value(
                "cache.backend",
                &self.cache.backend,
                format!("expected one of {KNOWN_CACHE_BACKENDS:?}"),
            ));
        }

        if self.cache.memory.max_entries == 0 {
            return Err(ConfigurationError::invalid_value(
                "cache.memory.max_entries",
                0,
                "must be greater than 0",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                0,
                "must be greater than 0",
            ));
        }

        let enrichment = &self.enrichment;
        if enrichment.max_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "enrichment.max_attempts",
                0,
                "at least one attempt is required",
            ));
        }
        if enrichment.backoff_base_seconds == 0 {
            return Err(ConfigurationError::invalid_value(
                "enrichment.backoff_base_seconds",
                0,
                "must be greater than 0",
            ));
        }
        if enrichment.backoff_max_seconds < enrichment.backoff_base_seconds {
            return Err(ConfigurationError::invalid_value(
                "enrichment.backoff_max_seconds",
                enrichment.backoff_max_seconds,
                "must not be lower than backoff_base_seconds",
            ));
        }
        if enrichment.backoff_multiplier < 1.0 {
            return Err(ConfigurationError::invalid_value(
                "enrichment.backoff_multiplier",
                enrichment.backoff_multiplier,
                "must be at least 1.0",
            ));
        }
        if enrichment.worker_concurrency == 0 {
            return Err(ConfigurationError::invalid_value(
                "enrichment.worker_concurrency",
                0,
                "must be greater than 0",
            ));
        }

        if self.circuit_breaker.failure_threshold == 0 || self.circuit_breaker.success_threshold == 0
        {
            return Err(ConfigurationError::invalid_value(
                "circuit_breaker",
                format!(
                    "failure_threshold={}, success_threshold={}",
                    self.circuit_breaker.failure_threshold, self.circuit_breaker.success_threshold
                ),
                "thresholds must be greater than 0",
            ));
        }

        if self.is_production() && self.auth.jwt_secret.is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "auth.jwt_secret",
                "production environment",
            ));
        }

        Ok(())
    }
}
