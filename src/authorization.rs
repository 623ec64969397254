//! # Authorization
//!
//! The single capability check used by every read and write path. Decisions are
//! a tagged result rather than scattered role-string comparisons.
//!
//! Lookups that miss in the store report `NotFound` before any ownership check,
//! so existence of a missing id is never hidden; an existing record the caller
//! may not touch reports `Forbidden`.

use crate::models::{Comment, Principal};
use crate::services::ServiceError;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Forbidden,
    NotFound,
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        self == Self::Allowed
    }

    /// Map to the caller-facing error for `resource`
    pub fn require(self, principal: &Principal, resource: &str) -> Result<(), ServiceError> {
        match self {
            Self::Allowed => Ok(()),
            Self::NotFound => Err(ServiceError::NotFound(resource.to_string())),
            Self::Forbidden => {
                warn!(
                    principal_id = principal.id,
                    role = %principal.role,
                    resource = resource,
                    "Access denied"
                );
                Err(ServiceError::Forbidden)
            }
        }
    }
}

/// Owner-or-admin check; `None` means the resource does not exist
pub fn authorize_owner(principal: &Principal, owner_id: Option<i64>) -> AccessDecision {
    match owner_id {
        None => AccessDecision::NotFound,
        Some(_) if principal.is_admin() => AccessDecision::Allowed,
        Some(owner) if owner == principal.id => AccessDecision::Allowed,
        Some(_) => AccessDecision::Forbidden,
    }
}

/// Read access to a comment: its author, the owner of its task, or an admin.
/// A comment whose task is gone is reported missing to everyone else.
pub fn authorize_comment_read(
    principal: &Principal,
    comment: Option<&Comment>,
    task_owner_id: Option<i64>,
) -> AccessDecision {
    match comment {
        None => AccessDecision::NotFound,
        Some(_) if principal.is_admin() => AccessDecision::Allowed,
        Some(c) if c.user_id == principal.id => AccessDecision::Allowed,
        Some(_) if task_owner_id.is_none() => AccessDecision::NotFound,
        Some(_) if task_owner_id == Some(principal.id) => AccessDecision::Allowed,
        Some(_) => AccessDecision::Forbidden,
    }
}

/// Edit/delete access to a comment: its author or an admin
pub fn authorize_comment_write(principal: &Principal, comment: Option<&Comment>) -> AccessDecision {
    authorize_owner(principal, comment.map(|c| c.user_id))
}
