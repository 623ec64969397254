//! # Principal Resolution
//!
//! Turns a bearer token into a [`Principal`](crate::models::Principal). The
//! orchestration layer only depends on the [`TokenService`] trait.

pub mod jwt;

pub use jwt::{Claims, JwtTokenService};

use crate::models::Principal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingAuthHeader,

    #[error("Invalid authorization header format")]
    InvalidAuthFormat,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl From<AuthError> for crate::error::TaskTrackError {
    fn from(e: AuthError) -> Self {
        crate::error::TaskTrackError::AuthError(e.to_string())
    }
}

/// Opaque token verification
pub trait TokenService: Send + Sync {
    fn resolve(&self, bearer_token: &str) -> Result<Principal, AuthError>;
}

/// Strip the `Bearer ` scheme from an `Authorization` header value
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let value = header.ok_or(AuthError::MissingAuthHeader)?;
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthFormat),
    }
}
