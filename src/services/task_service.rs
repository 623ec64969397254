//! # Task Service
//!
//! Read-through and write-invalidation orchestration for tasks.
//!
//! Reads: listings and statistics are cached per principal, details per task id
//! with the ownership check repeated after every hit. Writes: validate, check
//! access, commit to the store, then invalidate. Creation is idempotent per
//! client token and hands an [`EnrichmentJob`] to the job queue.

use super::errors::{ServiceError, ServiceResult};
use super::invalidation::InvalidationPlan;
use super::read_through::cached_or_load;
use crate::authorization::authorize_owner;
use crate::cache::keys::{collection_key, task_detail_key, task_stats_key};
use crate::cache::{CacheStore, CollectionResource, Execution, IdempotencyCoordinator};
use crate::constants::ttl;
use crate::logging::log_error;
use crate::messaging::{EnrichmentJob, JobPublisher};
use crate::models::{
    NewTask, PaginatedResponse, Pagination, Principal, Task, TaskFilters, TaskStats, TaskUpdate,
};
use crate::store::TaskRepository;
use std::sync::Arc;
use tracing::info;

const RESOURCE: &str = "tasks";

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    cache: CacheStore,
    idempotency: IdempotencyCoordinator,
    publisher: Arc<dyn JobPublisher>,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        cache: CacheStore,
        publisher: Arc<dyn JobPublisher>,
    ) -> Self {
        let idempotency = IdempotencyCoordinator::new(cache.clone());
        Self {
            tasks,
            cache,
            idempotency,
            publisher,
        }
    }

    /// Share one coordinator between services
    pub fn with_idempotency(mut self, idempotency: IdempotencyCoordinator) -> Self {
        self.idempotency = idempotency;
        self
    }

    pub async fn list(
        &self,
        principal: &Principal,
        filters: &TaskFilters,
        pagination: Pagination,
    ) -> ServiceResult<PaginatedResponse<Task>> {
        pagination.validate().map_err(ServiceError::Validation)?;
        let query = filters
            .resolve(principal)
            .map_err(ServiceError::Validation)?;

        let key_material = query
            .filter_set()
            .with("page", pagination.page)
            .with("page_size", pagination.page_size);
        let key = collection_key(CollectionResource::Tasks, principal.id, &key_material);

        cached_or_load(&self.cache, &key, ttl::TASK_LIST, move || async move {
            let (items, total) = self.tasks.list_tasks(&query, pagination).await?;
            Ok(PaginatedResponse::new(items, total, pagination))
        })
        .await
    }

    pub async fn get(&self, principal: &Principal, task_id: i64) -> ServiceResult<Task> {
        let key = task_detail_key(task_id);

        if let Some(cached) = self.cache.get::<Task>(&key).await {
            authorize_owner(principal, Some(cached.owner_id)).require(principal, "Task")?;
            return Ok(cached);
        }

        let task = self.tasks.find_task(task_id).await?;
        authorize_owner(principal, task.as_ref().map(|t| t.owner_id)).require(principal, "Task")?;
        let task = task.ok_or_else(|| ServiceError::NotFound("Task".to_string()))?;

        self.cache.set(&key, &task, ttl::DETAIL).await;
        Ok(task)
    }

    /// Create a task owned by `principal`. A repeated `idempotency_token`
    /// within the retention window replays the first response and publishes
    /// nothing.
    pub async fn create(
        &self,
        principal: &Principal,
        new_task: &NewTask,
        idempotency_token: Option<&str>,
    ) -> ServiceResult<Execution<Task>> {
        new_task.validate().map_err(ServiceError::Validation)?;

        self.idempotency
            .execute(RESOURCE, principal.id, idempotency_token, move || async move {
                let task = self.tasks.insert_task(principal.id, new_task).await?;
                InvalidationPlan::for_task_mutation(task.id, task.owner_id, principal.id)
                    .apply(&self.cache)
                    .await;
                self.dispatch_enrichment(task.id).await;

                info!(task_id = task.id, owner_id = task.owner_id, "Task created");
                Ok::<_, ServiceError>(task)
            })
            .await
    }

    pub async fn update(
        &self,
        principal: &Principal,
        task_id: i64,
        update: &TaskUpdate,
    ) -> ServiceResult<Task> {
        update.validate().map_err(ServiceError::Validation)?;

        let existing = self.tasks.find_task(task_id).await?;
        authorize_owner(principal, existing.as_ref().map(|t| t.owner_id))
            .require(principal, "Task")?;

        let updated = self
            .tasks
            .update_task(task_id, update)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Task".to_string()))?;

        InvalidationPlan::for_task_mutation(task_id, updated.owner_id, principal.id)
            .apply(&self.cache)
            .await;
        Ok(updated)
    }

    pub async fn delete(&self, principal: &Principal, task_id: i64) -> ServiceResult<()> {
        let existing = self.tasks.find_task(task_id).await?;
        authorize_owner(principal, existing.as_ref().map(|t| t.owner_id))
            .require(principal, "Task")?;
        let owner_id = existing.map(|t| t.owner_id).unwrap_or(principal.id);

        let cascaded = self
            .tasks
            .delete_task(task_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Task".to_string()))?;

        InvalidationPlan::for_task_deletion(task_id, owner_id, principal.id, &cascaded)
            .apply(&self.cache)
            .await;
        info!(
            task_id = task_id,
            actor_id = principal.id,
            comments_removed = cascaded.len(),
            "Task deleted"
        );
        Ok(())
    }

    /// Status counts over the caller's own tasks
    pub async fn stats(&self, principal: &Principal) -> ServiceResult<TaskStats> {
        let key = task_stats_key(principal.id);
        cached_or_load(&self.cache, &key, ttl::STATS, move || async move {
            Ok(self.tasks.task_stats(principal.id).await?)
        })
        .await
    }

    /// The task is already committed; a failed publish is logged only
    async fn dispatch_enrichment(&self, task_id: i64) {
        let job = EnrichmentJob::new(task_id);
        if let Err(e) = self.publisher.publish(job).await {
            log_error(
                "task_service",
                "dispatch_enrichment",
                &e.to_string(),
                Some(&format!("task_id={task_id}")),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheProvider, InMemoryCacheService};
    use crate::messaging::{InMemoryJobQueue, JobReceiver};
    use crate::store::InMemoryRepository;

    fn service() -> (TaskService, InMemoryRepository, InMemoryCacheService, JobReceiver) {
        let repo = InMemoryRepository::new();
        let memory = InMemoryCacheService::default();
        let (queue, receiver) = InMemoryJobQueue::new();
        let service = TaskService::new(
            Arc::new(repo.clone()),
            CacheStore::new(CacheProvider::memory(memory.clone())),
            Arc::new(queue),
        );
        (service, repo, memory, receiver)
    }

    #[tokio::test]
    async fn test_create_publishes_one_job() {
        let (service, _, _, mut receiver) = service();
        let task = service
            .create(&Principal::user(7), &NewTask::new("write docs"), None)
            .await
            .unwrap()
            .into_inner();

        let jobs = receiver.drain();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].task_id, task.id);
        assert_eq!(task.task_metadata, None);
    }

    #[tokio::test]
    async fn test_validation_happens_before_store_access() {
        let (service, repo, _, _) = service();
        repo.set_failing(true);

        let err = service
            .update(&Principal::user(7), 1, &TaskUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Validation("No fields to update".to_string()));

        let err = service
            .list(
                &Principal::user(7),
                &TaskFilters {
                    created_after: Some("yesterday".to_string()),
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_store_failure_is_internal() {
        let (service, repo, _, _) = service();
        repo.set_failing(true);
        let err = service.get(&Principal::user(7), 1).await.unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[tokio::test]
    async fn test_stats_are_cached_per_principal() {
        let (service, repo, memory, _) = service();
        let user = Principal::user(7);
        service.create(&user, &NewTask::new("a"), None).await.unwrap();
        service
            .create(&user, &NewTask::new("b").with_status("Completed"), None)
            .await
            .unwrap();

        let stats = service.stats(&user).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.count("completed"), 1);
        assert!(memory.contains_key("tasks:user:7:stats"));

        let reads = repo.read_count();
        service.stats(&user).await.unwrap();
        assert_eq!(repo.read_count(), reads);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_create() {
        let (service, repo, _, receiver) = service();
        drop(receiver);
        let created = service
            .create(&Principal::user(7), &NewTask::new("still saved"), None)
            .await;
        assert!(created.is_ok());
        assert_eq!(repo.task_total(), 1);
    }
}
