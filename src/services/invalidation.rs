//! # Write Invalidation
//!
//! Every mutation builds an [`InvalidationPlan`] and applies it after the store
//! write has returned. Plans are plain data so the key sets can be checked
//! without a cache.
//!
//! Comment mutations clear the global comment collection pattern. Comment
//! listings are filterable along several dimensions and visible to more than
//! one principal, so per-principal eviction would miss entries.

use crate::cache::keys::{
    collection_invalidation_pattern, comment_detail_key, global_collection_pattern,
    task_detail_key,
};
use crate::cache::{CacheStore, CollectionResource};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    keys: Vec<String>,
    patterns: Vec<String>,
}

impl InvalidationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: String) -> Self {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
        self
    }

    pub fn pattern(mut self, pattern: String) -> Self {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
        self
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Task create or update. The acting principal's listings are cleared too
    /// when an admin changes someone else's task.
    pub fn for_task_mutation(task_id: i64, owner_id: i64, actor_id: i64) -> Self {
        Self::new()
            .key(task_detail_key(task_id))
            .pattern(collection_invalidation_pattern(CollectionResource::Tasks, owner_id))
            .pattern(collection_invalidation_pattern(CollectionResource::Tasks, actor_id))
    }

    /// Deleting a task cascades to its comments, so their detail entries go too
    pub fn for_task_deletion(
        task_id: i64,
        owner_id: i64,
        actor_id: i64,
        cascaded_comment_ids: &[i64],
    ) -> Self {
        cascaded_comment_ids
            .iter()
            .fold(Self::for_task_mutation(task_id, owner_id, actor_id), |plan, id| {
                plan.key(comment_detail_key(*id))
            })
            .pattern(global_collection_pattern(CollectionResource::Comments))
    }

    /// Task responses embed the comment count, so the parent task's detail and
    /// its owner's task listings go stale along with the comment itself.
    pub fn for_comment_mutation(comment_id: i64, task_id: i64, task_owner_id: Option<i64>) -> Self {
        let plan = Self::new()
            .key(comment_detail_key(comment_id))
            .key(task_detail_key(task_id));
        let plan = match task_owner_id {
            Some(owner) => {
                plan.pattern(collection_invalidation_pattern(CollectionResource::Tasks, owner))
            }
            None => plan,
        };
        plan.pattern(global_collection_pattern(CollectionResource::Comments))
    }

    /// Background metadata write
    pub fn for_enrichment(task_id: i64, owner_id: i64) -> Self {
        Self::new()
            .key(task_detail_key(task_id))
            .pattern(collection_invalidation_pattern(CollectionResource::Tasks, owner_id))
    }

    /// Evict everything in the plan. Returns the number of entries removed;
    /// cache failures are already logged and count as zero.
    pub async fn apply(&self, cache: &CacheStore) -> u64 {
        let mut removed = 0;
        for key in &self.keys {
            if cache.delete(key).await {
                removed += 1;
            }
        }
        for pattern in &self.patterns {
            removed += cache.delete_matching(pattern).await;
        }
        debug!(
            keys = self.keys.len(),
            patterns = self.patterns.len(),
            removed = removed,
            "Cache invalidation applied"
        );
        removed
    }
}
