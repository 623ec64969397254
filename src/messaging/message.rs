//! # Job Messages
//!
//! The typed handoff from task creation to the enrichment worker. The creator
//! publishes and forgets; nothing flows back to the original request.

use super::errors::{MessagingError, MessagingResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request to enrich one task with externally sourced metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentJob {
    /// Unique per publish; a redelivered job keeps its id
    pub job_id: Uuid,
    pub task_id: i64,
    pub enqueued_at: DateTime<Utc>,
}

impl EnrichmentJob {
    pub fn new(task_id: i64) -> Self {
        Self {
            job_id: Uuid::new_v4(),
            task_id,
            enqueued_at: Utc::now(),
        }
    }

    /// Wire form for queue transports that carry JSON payloads
    pub fn to_json(&self) -> MessagingResult<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| MessagingError::MessageSerialization {
            message: e.to_string(),
        })
    }

    pub fn from_json(payload: serde_json::Value) -> MessagingResult<Self> {
        serde_json::from_value(payload).map_err(|e| MessagingError::MessageDeserialization {
            message: e.to_string(),
        })
    }
}
