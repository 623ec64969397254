//! # Listing Filters
//!
//! Raw filter input as a caller supplies it (`TaskFilters`, `CommentFilters`)
//! and the validated, role-scoped queries handed to the repositories
//! (`TaskQuery`, `CommentQuery`). Scoping happens here, once: a regular user's
//! `owner_id` / `user_id` filter is ignored and the query is pinned to what
//! that user may see.

use super::principal::Principal;
use crate::cache::FilterSet;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilters {
    pub status: Option<String>,
    /// Honored for admins only
    pub owner_id: Option<i64>,
    pub title_contains: Option<String>,
    /// ISO-8601
    pub created_after: Option<String>,
    /// ISO-8601
    pub created_before: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommentFilters {
    pub task_id: Option<i64>,
    /// Honored for admins only
    pub user_id: Option<i64>,
    pub content_contains: Option<String>,
}

/// Which tasks a query may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerScope {
    All,
    Owner(i64),
}

/// Which comments a query may return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentVisibility {
    All,
    /// Authored by the user, or on a task the user owns
    VisibleTo(i64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskQuery {
    pub scope: OwnerScope,
    /// Case-insensitive substring match
    pub status: Option<String>,
    pub title_contains: Option<String>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentQuery {
    pub visibility: CommentVisibility,
    pub task_id: Option<i64>,
    pub user_id: Option<i64>,
    pub content_contains: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Parse an ISO-8601 timestamp. Accepts `Z` or an explicit offset; naive
/// timestamps and bare dates are taken as UTC.
pub fn parse_iso_datetime(field: &str, raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(format!("Invalid ISO date format for {field}: '{raw}'"))
}

impl TaskFilters {
    /// Validate dates and pin the scope for `principal`
    pub fn resolve(&self, principal: &Principal) -> Result<TaskQuery, String> {
        let created_after = self
            .created_after
            .as_deref()
            .map(|raw| parse_iso_datetime("created_after", raw))
            .transpose()?;
        let created_before = self
            .created_before
            .as_deref()
            .map(|raw| parse_iso_datetime("created_before", raw))
            .transpose()?;

        let scope = match (principal.is_admin(), self.owner_id) {
            (true, Some(owner_id)) => OwnerScope::Owner(owner_id),
            (true, None) => OwnerScope::All,
            (false, _) => OwnerScope::Owner(principal.id),
        };

        Ok(TaskQuery {
            scope,
            status: non_blank(&self.status),
            title_contains: non_blank(&self.title_contains),
            created_after,
            created_before,
        })
    }
}

impl TaskQuery {
    /// Normalized key material; equal queries give equal sets
    pub fn filter_set(&self) -> FilterSet {
        let owner = match self.scope {
            OwnerScope::All => None,
            OwnerScope::Owner(id) => Some(id),
        };
        FilterSet::new()
            .with("owner_id", owner)
            .with("status", self.status.as_ref().map(|s| s.to_lowercase()))
            .with("title_contains", &self.title_contains)
            .with("created_after", self.created_after.map(|d| d.to_rfc3339()))
            .with("created_before", self.created_before.map(|d| d.to_rfc3339()))
    }
}

impl CommentFilters {
    pub fn resolve(&self, principal: &Principal) -> CommentQuery {
        let (visibility, user_id) = if principal.is_admin() {
            (CommentVisibility::All, self.user_id)
        } else {
            (CommentVisibility::VisibleTo(principal.id), None)
        };

        CommentQuery {
            visibility,
            task_id: self.task_id,
            user_id,
            content_contains: non_blank(&self.content_contains),
        }
    }
}

impl CommentQuery {
    pub fn filter_set(&self) -> FilterSet {
        let visible_to = match self.visibility {
            CommentVisibility::All => None,
            CommentVisibility::VisibleTo(id) => Some(id),
        };
        FilterSet::new()
            .with("visible_to", visible_to)
            .with("task_id", self.task_id)
            .with("user_id", self.user_id)
            .with("content_contains", &self.content_contains)
    }
}
