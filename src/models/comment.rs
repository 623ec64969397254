//! # Comment Model
//!
//! Maps to the `comments` table (`task_id` references `tasks` with cascade
//! delete). Visible to its author, to the owner of its parent task, or to an admin.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub task_id: i64,
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Creation payload; the author comes from the authenticated principal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewComment {
    pub task_id: i64,
    pub content: String,
}

impl NewComment {
    pub fn new(task_id: i64, content: impl Into<String>) -> Self {
        Self {
            task_id,
            content: content.into(),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("content must not be empty".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentUpdate {
    pub content: String,
}

impl CommentUpdate {
    pub fn validate(&self) -> Result<(), String> {
        if self.content.trim().is_empty() {
            return Err("content must not be empty".to_string());
        }
        Ok(())
    }
}
