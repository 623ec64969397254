//! # Service Error Types
//!
//! What a caller of the orchestration layer can observe. Store failures are
//! logged in full here and surface only as a generic internal error; cache
//! failures never reach this type at all.

use crate::error::TaskTrackError;
use thiserror::Error;
use tracing::error;

pub const INTERNAL_ERROR_MESSAGE: &str = "An internal error occurred";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not authorized to perform this action")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }
}

impl From<TaskTrackError> for ServiceError {
    fn from(err: TaskTrackError) -> Self {
        match err {
            TaskTrackError::ValidationError(message) => Self::Validation(message),
            other => {
                error!(error = %other, "Operation failed in the data layer");
                Self::Internal(INTERNAL_ERROR_MESSAGE.to_string())
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
