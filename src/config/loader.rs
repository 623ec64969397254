//! Configuration Loader
//!
//! Environment-aware loading: built-in defaults, then `config/base.toml`, then
//! `config/<environment>.toml`, then `TASKTRACK__SECTION__FIELD` environment
//! variables. Later layers win.

use super::error::{ConfigResult, ConfigurationError};
use super::TaskTrackConfig;
use config::{Config, Environment, File, FileFormat};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

const ENV_PREFIX: &str = "TASKTRACK";
const ENV_SEPARATOR: &str = "__";

pub struct ConfigManager {
    config: TaskTrackConfig,
    environment: String,
    config_directory: PathBuf,
}

impl ConfigManager {
    /// Load configuration with environment auto-detection
    pub fn load() -> ConfigResult<Arc<ConfigManager>> {
        Self::load_from_directory(None)
    }

    pub fn load_from_directory(config_dir: Option<PathBuf>) -> ConfigResult<Arc<ConfigManager>> {
        let environment = Self::detect_environment();
        Self::load_from_directory_with_env(config_dir, &environment)
    }

    /// Load with an explicit environment name, reading overrides from the process environment
    pub fn load_from_directory_with_env(
        config_dir: Option<PathBuf>,
        environment: &str,
    ) -> ConfigResult<Arc<ConfigManager>> {
        Self::load_with_overrides(config_dir, environment, None)
    }

    /// Load with an explicit override map standing in for the process environment.
    ///
    /// Keys use the same `TASKTRACK__SECTION__FIELD` shape as real variables.
    pub fn load_with_overrides(
        config_dir: Option<PathBuf>,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<Arc<ConfigManager>> {
        let config_directory = config_dir.unwrap_or_else(|| PathBuf::from("config"));

        debug!(
            environment = %environment,
            directory = %config_directory.display(),
            "Loading configuration"
        );

        let config = Self::build_config(&config_directory, environment, overrides)?;
        config.validate()?;

        debug!(
            config = %Self::sanitize_config_for_logging(&config),
            "Configuration resolved"
        );
        info!(
            environment = %environment,
            cache_backend = %config.cache.backend,
            cache_enabled = config.cache.enabled,
            enrichment_attempts = config.enrichment.max_attempts,
            "Configuration loaded successfully"
        );

        Ok(Arc::new(ConfigManager {
            config,
            environment: environment.to_string(),
            config_directory,
        }))
    }

    fn build_config(
        config_directory: &Path,
        environment: &str,
        overrides: Option<HashMap<String, String>>,
    ) -> ConfigResult<TaskTrackConfig> {
        let load_error = |e: config::ConfigError| ConfigurationError::LoadError {
            environment: environment.to_string(),
            error: e.to_string(),
        };

        let base = config_directory.join("base.toml");
        let env_file = config_directory.join(format!("{environment}.toml"));

        let builder = Config::builder()
            .add_source(File::from(base).format(FileFormat::Toml).required(false))
            .add_source(File::from(env_file).format(FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .source(overrides),
            )
            .set_override("environment", environment)
            .map_err(load_error)?;

        builder
            .build()
            .and_then(|c| c.try_deserialize::<TaskTrackConfig>())
            .map_err(load_error)
    }

    pub fn config(&self) -> &TaskTrackConfig {
        &self.config
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn config_directory(&self) -> &Path {
        &self.config_directory
    }

    /// JSON view of the configuration with secrets and URL credentials masked
    pub fn debug_config(&self) -> serde_json::Value {
        Self::sanitize_config_for_logging(&self.config)
    }

    /// `TASKTRACK_ENV`, then `APP_ENV`, defaulting to `development`
    pub fn detect_environment() -> String {
        env::var("TASKTRACK_ENV")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string())
            .to_lowercase()
    }

    fn sanitize_config_for_logging(config: &TaskTrackConfig) -> serde_json::Value {
        let mut config_json = serde_json::to_value(config).unwrap_or(serde_json::Value::Null);
        let sensitive_patterns = ["password", "secret", "token", "credential"];
        Self::sanitize_json_recursive(&mut config_json, &sensitive_patterns);
        config_json
    }

    fn sanitize_json_recursive(value: &mut serde_json::Value, sensitive_patterns: &[&str]) {
        match value {
            serde_json::Value::Object(map) => {
                for (key, val) in map.iter_mut() {
                    let key_lower = key.to_lowercase();
                    let is_sensitive = sensitive_patterns
                        .iter()
                        .any(|pattern| key_lower.contains(pattern));

                    match val {
                        serde_json::Value::String(s) if is_sensitive && !s.is_empty() => {
                            *s = "***REDACTED***".to_string();
                        }
                        serde_json::Value::String(s) if key_lower.ends_with("url") => {
                            *s = redact_url(s);
                        }
                        _ => Self::sanitize_json_recursive(val, sensitive_patterns),
                    }
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    Self::sanitize_json_recursive(item, sensitive_patterns);
                }
            }
            _ => {}
        }
    }
}

/// Mask the userinfo section of a connection URL
pub fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_url_masks_credentials() {
        assert_eq!(
            redact_url("postgresql://tasktrack:hunter2@db:5432/tasks"),
            "postgresql://***@db:5432/tasks"
        );
        assert_eq!(redact_url("redis://localhost:6379"), "redis://localhost:6379");
    }

    #[test]
    fn test_sanitize_masks_secret_fields() {
        let mut config = TaskTrackConfig::default();
        config.auth.jwt_secret = "very-secret".to_string();
        config.database.url = "postgresql://user:pw@localhost/db".to_string();

        let sanitized = ConfigManager::sanitize_config_for_logging(&config);
        assert_eq!(sanitized["auth"]["jwt_secret"], "***REDACTED***");
        assert_eq!(sanitized["database"]["url"], "postgresql://***@localhost/db");
    }

    #[test]
    fn test_missing_directory_yields_defaults() {
        let manager = ConfigManager::load_with_overrides(
            Some(PathBuf::from("/nonexistent/tasktrack/config")),
            "test",
            Some(HashMap::new()),
        )
        .expect("defaults should load");

        assert_eq!(manager.environment(), "test");
        assert_eq!(manager.config().environment, "test");
        assert_eq!(manager.config().cache.backend, "memory");
    }
}
