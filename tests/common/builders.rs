//! Wiring helpers: a fully in-memory service graph plus scripted collaborators.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tasktrack_core::cache::{CacheProvider, CacheStore, IdempotencyCoordinator, InMemoryCacheService};
use tasktrack_core::enrichment::{EnrichmentWorker, FetchError, MetadataFetcher};
use tasktrack_core::messaging::{InMemoryJobQueue, JobReceiver};
use tasktrack_core::models::{NewComment, NewTask, Principal, Task, Comment};
use tasktrack_core::services::{CommentService, TaskService};
use tasktrack_core::store::InMemoryRepository;

/// Services over an in-memory store and cache, sharing one idempotency
/// coordinator and one job queue
pub struct TestHarness {
    pub repo: InMemoryRepository,
    pub memory: InMemoryCacheService,
    pub cache: CacheStore,
    pub tasks: TaskService,
    pub comments: CommentService,
    pub jobs: JobReceiver,
}

impl TestHarness {
    pub fn new() -> Self {
        let repo = InMemoryRepository::new();
        let memory = InMemoryCacheService::default();
        let cache = CacheStore::new(CacheProvider::memory(memory.clone()));
        let idempotency = IdempotencyCoordinator::new(cache.clone());
        let (queue, jobs) = InMemoryJobQueue::new();

        let tasks = TaskService::new(Arc::new(repo.clone()), cache.clone(), Arc::new(queue))
            .with_idempotency(idempotency.clone());
        let comments = CommentService::new(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            cache.clone(),
        )
        .with_idempotency(idempotency);

        Self {
            repo,
            memory,
            cache,
            tasks,
            comments,
            jobs,
        }
    }

    pub async fn create_task(&self, owner: &Principal, title: &str) -> Task {
        self.tasks
            .create(owner, &NewTask::new(title), None)
            .await
            .expect("task creation failed")
            .into_inner()
    }

    pub async fn create_task_with_status(&self, owner: &Principal, title: &str, status: &str) -> Task {
        self.tasks
            .create(owner, &NewTask::new(title).with_status(status), None)
            .await
            .expect("task creation failed")
            .into_inner()
    }

    pub async fn create_comment(&self, author: &Principal, task_id: i64, content: &str) -> Comment {
        self.comments
            .create(author, &NewComment::new(task_id, content), None)
            .await
            .expect("comment creation failed")
            .into_inner()
    }

    pub fn worker(&self, fetcher: Arc<dyn MetadataFetcher>) -> EnrichmentWorker {
        EnrichmentWorker::new(Arc::new(self.repo.clone()), fetcher, self.cache.clone())
    }
}

/// Plays back scripted fetch results in order; once exhausted, repeats the
/// fallback result
pub struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<Value, FetchError>>>,
    fallback: Result<Value, FetchError>,
    calls: AtomicU32,
}

impl ScriptedFetcher {
    pub fn new(responses: Vec<Result<Value, FetchError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: Err(FetchError::Status(503)),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_ok(document: Value) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Ok(document),
            calls: AtomicU32::new(0),
        }
    }

    pub fn always_failing(error: FetchError) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            fallback: Err(error),
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataFetcher for ScriptedFetcher {
    async fn fetch(&self, _task_id: i64) -> Result<Value, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
