//! Cache key policy.
//!
//! Pure functions, no I/O. Two key families:
//!
//! - detail keys, `task:{id}` / `comment:{id}`, keyed by entity id alone (callers
//!   re-check visibility after a hit);
//! - collection keys, `{tasks|comments}:user:{principal}:{digest}`, partitioned per
//!   principal so one caller's listing can never be served to another.
//!
//! The digest is the first 16 hex characters of SHA-256 over the canonical JSON
//! of the normalized filter set. It is a dedup aid, not a security boundary;
//! collision probability is bounded by its 64-bit width.

use crate::constants::keys::{
    COMMENT_COLLECTION_PREFIX, COMMENT_DETAIL_PREFIX, FILTER_HASH_HEX_LEN, IDEMPOTENCY_PREFIX,
    STATS_SUFFIX, TASK_COLLECTION_PREFIX, TASK_DETAIL_PREFIX,
};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

/// Listing families that get per-principal collection keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionResource {
    Tasks,
    Comments,
}

impl CollectionResource {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Tasks => TASK_COLLECTION_PREFIX,
            Self::Comments => COMMENT_COLLECTION_PREFIX,
        }
    }
}

impl fmt::Display for CollectionResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Normalized query parameters.
///
/// Fields are kept sorted by name and null values are dropped on insert, so
/// argument order and absent-vs-null never change the resulting key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSet {
    fields: BTreeMap<String, Value>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field; `None`/null values are ignored
    pub fn with<V: Serialize>(mut self, name: &str, value: V) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<V: Serialize>(&mut self, name: &str, value: V) {
        match serde_json::to_value(value) {
            Ok(Value::Null) | Err(_) => {
                self.fields.remove(name);
            }
            Ok(v) => {
                self.fields.insert(name.to_string(), v);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Canonical JSON (sorted keys, no whitespace)
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(&self.fields).unwrap_or_default()
    }

    pub fn digest(&self) -> String {
        let hash = Sha256::digest(self.canonical_json().as_bytes());
        let mut hex = hex::encode(hash);
        hex.truncate(FILTER_HASH_HEX_LEN);
        hex
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut set = FilterSet::new();
        for (k, v) in iter {
            let name: String = k.into();
            set.insert(&name, v);
        }
        set
    }
}

pub fn task_detail_key(task_id: i64) -> String {
    format!("{TASK_DETAIL_PREFIX}:{task_id}")
}

pub fn comment_detail_key(comment_id: i64) -> String {
    format!("{COMMENT_DETAIL_PREFIX}:{comment_id}")
}

pub fn collection_key(
    resource: CollectionResource,
    principal_id: i64,
    filters: &FilterSet,
) -> String {
    format!("{}:user:{}:{}", resource.prefix(), principal_id, filters.digest())
}

/// Matches every collection key produced for `principal_id` under `resource`
pub fn collection_invalidation_pattern(resource: CollectionResource, principal_id: i64) -> String {
    format!("{}:user:{}:*", resource.prefix(), principal_id)
}

/// Matches every collection key of `resource`, for all principals
pub fn global_collection_pattern(resource: CollectionResource) -> String {
    format!("{}:*", resource.prefix())
}

/// Per-principal statistics; falls under the principal's task collection pattern
pub fn task_stats_key(principal_id: i64) -> String {
    format!("{TASK_COLLECTION_PREFIX}:user:{principal_id}:{STATS_SUFFIX}")
}

/// Namespaced so a token can only ever replay its own principal's response
pub fn idempotency_key(resource: &str, principal_id: i64, token: &str) -> String {
    format!("{IDEMPOTENCY_PREFIX}:{resource}:user:{principal_id}:{token}")
}
