//! # Messaging Error Types

use crate::error::TaskTrackError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MessagingError {
    #[error("Queue closed: {queue_name}")]
    QueueClosed { queue_name: String },

    #[error("Message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("Message deserialization error: {message}")]
    MessageDeserialization { message: String },
}

impl MessagingError {
    pub fn queue_closed(queue_name: impl Into<String>) -> Self {
        Self::QueueClosed {
            queue_name: queue_name.into(),
        }
    }
}

impl From<MessagingError> for TaskTrackError {
    fn from(err: MessagingError) -> Self {
        TaskTrackError::MessagingError(err.to_string())
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
