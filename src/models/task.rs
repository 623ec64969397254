//! # Task Model
//!
//! A tracked unit of work owned by one principal. `task_metadata` is written
//! exclusively by the enrichment worker and stays `None` until it succeeds.
//!
//! ## Database Schema
//!
//! Maps to the `tasks` table:
//! - `id`: BIGSERIAL primary key
//! - `title`, `description`, `status` (default `pending`)
//! - `owner_id`: BIGINT
//! - `created_at`: TIMESTAMPTZ
//! - `task_metadata`: JSONB, nullable
//!
//! `comment_count` is derived at read time, which is why comment mutations
//! invalidate the parent task's cached detail.

use crate::constants::task_status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub task_metadata: Option<serde_json::Value>,
    pub comment_count: i64,
}

/// Creation payload; the owner comes from the authenticated principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    task_status::PENDING.to_string()
}

impl NewTask {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            status: default_status(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.title.trim().is_empty() {
            return Err("title must not be empty".to_string());
        }
        if self.status.trim().is_empty() {
            return Err("status must not be empty".to_string());
        }
        Ok(())
    }
}

/// Whitelisted partial update. Only these columns can ever be written by an
/// interactive update; `owner_id` and `task_metadata` are unreachable here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.status.is_none()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("No fields to update".to_string());
        }
        if matches!(&self.title, Some(t) if t.trim().is_empty()) {
            return Err("title must not be empty".to_string());
        }
        if matches!(&self.status, Some(s) if s.trim().is_empty()) {
            return Err("status must not be empty".to_string());
        }
        Ok(())
    }

    /// Apply field by field
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = Some(description.clone());
        }
        if let Some(status) = &self.status {
            task.status = status.clone();
        }
    }
}
