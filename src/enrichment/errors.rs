//! # Fetch Error Classification
//!
//! Transport failures, timeouts and server-side statuses are worth another
//! attempt. Client errors and undecodable bodies will not improve on retry.

use crate::error::TaskTrackError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("response body is not a JSON document: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout { .. } => true,
            Self::Status(code) => *code >= 500 || *code == 408 || *code == 429,
            Self::Decode(_) => false,
        }
    }
}

impl From<FetchError> for TaskTrackError {
    fn from(err: FetchError) -> Self {
        TaskTrackError::EnrichmentError(err.to_string())
    }
}
