//! # Persistent Store
//!
//! Repository traits the orchestration layer is written against, with an
//! in-memory implementation (tests, single-process demos) and a PostgreSQL one.
//!
//! The count returned by the list methods always uses the same predicate as the
//! page query, so pagination totals agree with the rows returned.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryRepository;
pub use postgres::PgRepository;

use crate::error::TaskTrackResult;
use crate::models::{
    Comment, CommentQuery, CommentUpdate, NewComment, NewTask, Pagination, Task, TaskQuery,
    TaskStats, TaskUpdate,
};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn find_task(&self, task_id: i64) -> TaskTrackResult<Option<Task>>;

    /// One page plus the total matching row count
    async fn list_tasks(
        &self,
        query: &TaskQuery,
        pagination: Pagination,
    ) -> TaskTrackResult<(Vec<Task>, i64)>;

    async fn insert_task(&self, owner_id: i64, new_task: &NewTask) -> TaskTrackResult<Task>;

    /// Writes only the whitelisted columns; `None` if the task does not exist
    async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> TaskTrackResult<Option<Task>>;

    /// Single-column write of `task_metadata`. Returns the owner id, or `None`
    /// if the task no longer exists.
    async fn update_task_metadata(
        &self,
        task_id: i64,
        metadata: &Value,
    ) -> TaskTrackResult<Option<i64>>;

    /// Deletes the task and, with it, its comments. Returns the ids of the
    /// comments removed by the cascade, or `None` if the task did not exist.
    async fn delete_task(&self, task_id: i64) -> TaskTrackResult<Option<Vec<i64>>>;

    async fn task_stats(&self, owner_id: i64) -> TaskTrackResult<TaskStats>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_comment(&self, comment_id: i64) -> TaskTrackResult<Option<Comment>>;

    async fn list_comments(
        &self,
        query: &CommentQuery,
        pagination: Pagination,
    ) -> TaskTrackResult<(Vec<Comment>, i64)>;

    async fn insert_comment(
        &self,
        author_id: i64,
        new_comment: &NewComment,
    ) -> TaskTrackResult<Comment>;

    async fn update_comment(
        &self,
        comment_id: i64,
        update: &CommentUpdate,
    ) -> TaskTrackResult<Option<Comment>>;

    async fn delete_comment(&self, comment_id: i64) -> TaskTrackResult<bool>;
}
