//! Error types for the task tracking core.
//!

use thiserror::Error;

use crate::cache::CacheError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskTrackError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Cache error: {0}")]
    CacheError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Messaging error: {0}")]
    MessagingError(String),
    #[error("Enrichment error: {0}")]
    EnrichmentError(String),
    #[error("Authentication error: {0}")]
    AuthError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for TaskTrackError {
    fn from(error: serde_json::Error) -> Self {
        TaskTrackError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

impl From<sqlx::Error> for TaskTrackError {
    fn from(err: sqlx::Error) -> Self {
        TaskTrackError::DatabaseError(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for TaskTrackError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        TaskTrackError::DatabaseError(format!("migration failed: {err}"))
    }
}

impl From<CacheError> for TaskTrackError {
    fn from(e: CacheError) -> Self {
        TaskTrackError::CacheError(e.to_string())
    }
}

impl From<config::ConfigError> for TaskTrackError {
    fn from(e: config::ConfigError) -> Self {
        TaskTrackError::ConfigurationError(e.to_string())
    }
}

pub type TaskTrackResult<T> = anyhow::Result<T, TaskTrackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_category() {
        let err = TaskTrackError::DatabaseError("connection refused".to_string());
        assert_eq!(err.to_string(), "Database error: connection refused");
    }

    #[test]
    fn test_cache_error_conversion() {
        let err: TaskTrackError = CacheError::Timeout("GET task:1".to_string()).into();
        assert!(matches!(err, TaskTrackError::CacheError(msg) if msg.contains("GET task:1")));
    }

    #[test]
    fn test_json_error_conversion() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: TaskTrackError = parse_err.into();
        assert!(matches!(err, TaskTrackError::ValidationError(_)));
    }
}
