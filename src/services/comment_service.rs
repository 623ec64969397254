//! # Comment Service
//!
//! A comment is visible to its author, to the owner of its task and to
//! admins. Only the author or an admin may edit or delete it; only the task
//! owner or an admin may comment on a task.

use super::errors::{ServiceError, ServiceResult};
use super::invalidation::InvalidationPlan;
use super::read_through::cached_or_load;
use crate::authorization::{
    authorize_comment_read, authorize_comment_write, authorize_owner, AccessDecision,
};
use crate::cache::keys::{collection_key, comment_detail_key};
use crate::cache::{CacheStore, CollectionResource, Execution, IdempotencyCoordinator};
use crate::constants::ttl;
use crate::models::{
    Comment, CommentFilters, CommentUpdate, NewComment, PaginatedResponse, Pagination, Principal,
};
use crate::store::{CommentRepository, TaskRepository};
use std::sync::Arc;
use tracing::info;

const RESOURCE: &str = "comments";

#[derive(Clone)]
pub struct CommentService {
    tasks: Arc<dyn TaskRepository>,
    comments: Arc<dyn CommentRepository>,
    cache: CacheStore,
    idempotency: IdempotencyCoordinator,
}

impl std::fmt::Debug for CommentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl CommentService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        comments: Arc<dyn CommentRepository>,
        cache: CacheStore,
    ) -> Self {
        let idempotency = IdempotencyCoordinator::new(cache.clone());
        Self {
            tasks,
            comments,
            cache,
            idempotency,
        }
    }

    pub fn with_idempotency(mut self, idempotency: IdempotencyCoordinator) -> Self {
        self.idempotency = idempotency;
        self
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filters: &CommentFilters,
        pagination: Pagination,
    ) -> ServiceResult<PaginatedResponse<Comment>> {
        pagination.validate().map_err(ServiceError::Validation)?;
        let query = filters.resolve(principal);

        let key_material = query
            .filter_set()
            .with("page", pagination.page)
            .with("page_size", pagination.page_size);
        let key = collection_key(CollectionResource::Comments, principal.id, &key_material);

        cached_or_load(&self.cache, &key, ttl::COMMENT_LIST, move || async move {
            let (items, total) = self.comments.list_comments(&query, pagination).await?;
            Ok(PaginatedResponse::new(items, total, pagination))
        })
        .await
    }

    pub async fn get(&self, principal: &Principal, comment_id: i64) -> ServiceResult<Comment> {
        let key = comment_detail_key(comment_id);

        let comment = match self.cache.get::<Comment>(&key).await {
            Some(cached) => cached,
            None => {
                let found = self.comments.find_comment(comment_id).await?;
                let found = found.ok_or_else(|| ServiceError::NotFound("Comment".to_string()))?;
                self.cache.set(&key, &found, ttl::DETAIL).await;
                found
            }
        };

        self.read_access(principal, &comment)
            .await?
            .require(principal, "Comment")?;
        Ok(comment)
    }

    /// Comment on a task the caller owns (any task, for admins)
    pub async fn create(
        &self,
        principal: &Principal,
        new_comment: &NewComment,
        idempotency_token: Option<&str>,
    ) -> ServiceResult<Execution<Comment>> {
        new_comment.validate().map_err(ServiceError::Validation)?;

        self.idempotency
            .execute(RESOURCE, principal.id, idempotency_token, move || async move {
                let task = self.tasks.find_task(new_comment.task_id).await?;
                authorize_owner(principal, task.as_ref().map(|t| t.owner_id))
                    .require(principal, "Task")?;
                let task_owner = task.map(|t| t.owner_id);

                let comment = self.comments.insert_comment(principal.id, new_comment).await?;
                InvalidationPlan::for_comment_mutation(comment.id, comment.task_id, task_owner)
                    .apply(&self.cache)
                    .await;

                info!(
                    comment_id = comment.id,
                    task_id = comment.task_id,
                    "Comment created"
                );
                Ok::<_, ServiceError>(comment)
            })
            .await
    }

    pub async fn update(
        &self,
        principal: &Principal,
        comment_id: i64,
        update: &CommentUpdate,
    ) -> ServiceResult<Comment> {
        update.validate().map_err(ServiceError::Validation)?;

        let existing = self.comments.find_comment(comment_id).await?;
        authorize_comment_write(principal, existing.as_ref()).require(principal, "Comment")?;
        let existing = existing.ok_or_else(|| ServiceError::NotFound("Comment".to_string()))?;

        // Nothing but invalidation may follow the write
        let task_owner = self.task_owner(existing.task_id).await?;
        let updated = self
            .comments
            .update_comment(comment_id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Comment".to_string()))?;

        InvalidationPlan::for_comment_mutation(comment_id, updated.task_id, task_owner)
            .apply(&self.cache)
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, principal: &Principal, comment_id: i64) -> ServiceResult<()> {
        let existing = self.comments.find_comment(comment_id).await?;
        authorize_comment_write(principal, existing.as_ref()).require(principal, "Comment")?;
        let existing = existing.ok_or_else(|| ServiceError::NotFound("Comment".to_string()))?;

        let task_owner = self.task_owner(existing.task_id).await?;
        if !self.comments.delete_comment(comment_id).await? {
            return Err(ServiceError::NotFound("Comment".to_string()));
        }

        InvalidationPlan::for_comment_mutation(comment_id, existing.task_id, task_owner)
            .apply(&self.cache)
            .await;
        Ok(())
    }

    async fn task_owner(&self, task_id: i64) -> ServiceResult<Option<i64>> {
        Ok(self.tasks.find_task(task_id).await?.map(|t| t.owner_id))
    }

    /// The parent task is only consulted when authorship and role don't decide
    async fn read_access(
        &self,
        principal: &Principal,
        comment: &Comment,
    ) -> ServiceResult<AccessDecision> {
        if principal.is_admin() || comment.user_id == principal.id {
            return Ok(AccessDecision::Allowed);
        }
        let task_owner = self.task_owner(comment.task_id).await?;
        Ok(authorize_comment_read(principal, Some(comment), task_owner))
    }
}
