use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tasktrack_core::config::{ConfigManager, ConfigurationError};

fn write(dir: &tempfile::TempDir, name: &str, contents: &str) {
    fs::write(dir.path().join(name), contents).unwrap();
}

#[test]
fn test_environment_file_overrides_base() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir,
        "base.toml",
        r#"
[cache]
backend = "memory"

[enrichment]
max_attempts = 3
worker_concurrency = 4
"#,
    );
    write(
        &dir,
        "staging.toml",
        r#"
[enrichment]
worker_concurrency = 8
"#,
    );

    let manager =
        ConfigManager::load_with_overrides(Some(dir.path().to_path_buf()), "staging", None)
            .unwrap();
    let config = manager.config();
    assert_eq!(manager.environment(), "staging");
    assert_eq!(config.environment, "staging");
    assert_eq!(config.enrichment.max_attempts, 3);
    assert_eq!(config.enrichment.worker_concurrency, 8);
    assert_eq!(config.cache.backend, "memory");
}

#[test]
fn test_environment_variables_override_files() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "base.toml", "[enrichment]\nmax_attempts = 3\n");

    let overrides = HashMap::from([
        ("TASKTRACK__ENRICHMENT__MAX_ATTEMPTS".to_string(), "5".to_string()),
        ("TASKTRACK__CACHE__BACKEND".to_string(), "none".to_string()),
    ]);
    let manager = ConfigManager::load_with_overrides(
        Some(dir.path().to_path_buf()),
        "development",
        Some(overrides),
    )
    .unwrap();

    assert_eq!(manager.config().enrichment.max_attempts, 5);
    assert_eq!(manager.config().cache.backend, "none");
}

#[test]
fn test_production_requires_jwt_secret() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "base.toml", "[auth]\njwt_secret = \"\"\n");

    let result = ConfigManager::load_with_overrides(Some(dir.path().to_path_buf()), "production", None);
    assert!(matches!(
        result,
        Err(ConfigurationError::MissingRequiredField { .. })
    ));
}

#[test]
fn test_invalid_backoff_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    write(
        &dir,
        "base.toml",
        "[enrichment]\nbackoff_base_seconds = 20\nbackoff_max_seconds = 10\n",
    );

    let result = ConfigManager::load_with_overrides(Some(dir.path().to_path_buf()), "test", None);
    assert!(matches!(result, Err(ConfigurationError::InvalidValue { .. })));
}

#[test]
fn test_malformed_toml_is_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    write(&dir, "base.toml", "[enrichment\nmax_attempts = ");

    let result = ConfigManager::load_with_overrides(Some(dir.path().to_path_buf()), "test", None);
    assert!(matches!(result, Err(ConfigurationError::LoadError { .. })));
}

#[test]
fn test_repository_config_files_load() {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config");
    for environment in ["development", "test"] {
        let manager =
            ConfigManager::load_with_overrides(Some(dir.clone()), environment, None).unwrap();
        assert_eq!(manager.config().enrichment.max_attempts, 3);
    }

    let manager = ConfigManager::load_with_overrides(Some(dir), "test", None).unwrap();
    let debug = manager.debug_config();
    assert_eq!(debug["auth"]["jwt_secret"], "***REDACTED***");
}
