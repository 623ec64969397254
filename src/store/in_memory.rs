//! In-memory repository.
//!
//! Implements both repository traits over a `parking_lot::RwLock`. Cloning
//! shares the state. Read calls are counted so callers can observe whether a
//! response came from the cache or the store, and `set_failing` turns every
//! call into a database error.

use super::{CommentRepository, TaskRepository};
use crate::error::{TaskTrackError, TaskTrackResult};
use crate::models::{
    Comment, CommentQuery, CommentUpdate, CommentVisibility, NewComment, NewTask, OwnerScope,
    Pagination, Task, TaskQuery, TaskStats, TaskUpdate,
};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct State {
    tasks: BTreeMap<i64, Task>,
    comments: BTreeMap<i64, Comment>,
    next_task_id: i64,
    next_comment_id: i64,
}

impl State {
    fn comment_count(&self, task_id: i64) -> i64 {
        self.comments.values().filter(|c| c.task_id == task_id).count() as i64
    }

    fn hydrate(&self, task: &Task) -> Task {
        Task {
            comment_count: self.comment_count(task.id),
            ..task.clone()
        }
    }

    fn task_owner(&self, task_id: i64) -> Option<i64> {
        self.tasks.get(&task_id).map(|t| t.owner_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<RwLock<State>>,
    reads: Arc<AtomicU64>,
    failing: Arc<AtomicBool>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page<T: Clone>(rows: &[T], pagination: Pagination) -> Vec<T> {
    rows.iter()
        .skip(pagination.offset().max(0) as usize)
        .take(pagination.limit().max(0) as usize)
        .cloned()
        .collect()
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store reads served so far (find/list/stats)
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn task_total(&self) -> usize {
        self.state.read().tasks.len()
    }

    fn check(&self, operation: &str) -> TaskTrackResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            Err(TaskTrackError::DatabaseError(format!(
                "simulated store failure during {operation}"
            )))
        } else {
            Ok(())
        }
    }

    fn read(&self, operation: &str) -> TaskTrackResult<()> {
        self.check(operation)?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn task_matches(task: &Task, query: &TaskQuery) -> bool {
        if let OwnerScope::Owner(owner) = query.scope {
            if task.owner_id != owner {
                return false;
            }
        }
        if let Some(status) = &query.status {
            if !contains_ci(&task.status, status) {
                return false;
            }
        }
        if let Some(title) = &query.title_contains {
            if !contains_ci(&task.title, title) {
                return false;
            }
        }
        if matches!(query.created_after, Some(after) if task.created_at < after) {
            return false;
        }
        if matches!(query.created_before, Some(before) if task.created_at > before) {
            return false;
        }
        true
    }

    fn comment_matches(state: &State, comment: &Comment, query: &CommentQuery) -> bool {
        if let CommentVisibility::VisibleTo(user) = query.visibility {
            let on_own_task = state.task_owner(comment.task_id) == Some(user);
            if comment.user_id != user && !on_own_task {
                return false;
            }
        }
        if matches!(query.task_id, Some(task_id) if comment.task_id != task_id) {
            return false;
        }
        if matches!(query.user_id, Some(user_id) if comment.user_id != user_id) {
            return false;
        }
        if let Some(content) = &query.content_contains {
            if !contains_ci(&comment.content, content) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl TaskRepository for InMemoryRepository {
    async fn find_task(&self, task_id: i64) -> TaskTrackResult<Option<Task>> {
        self.read("find_task")?;
        let state = self.state.read();
        Ok(state.tasks.get(&task_id).map(|t| state.hydrate(t)))
    }

    async fn list_tasks(
        &self,
        query: &TaskQuery,
        pagination: Pagination,
    ) -> TaskTrackResult<(Vec<Task>, i64)> {
        self.read("list_tasks")?;
        let state = self.state.read();
        let mut matching: Vec<Task> = state
            .tasks
            .values()
            .filter(|t| Self::task_matches(t, query))
            .map(|t| state.hydrate(t))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        Ok((page(&matching, pagination), total))
    }

    async fn insert_task(&self, owner_id: i64, new_task: &NewTask) -> TaskTrackResult<Task> {
        self.check("insert_task")?;
        let mut state = self.state.write();
        state.next_task_id += 1;
        let task = Task {
            id: state.next_task_id,
            title: new_task.title.clone(),
            description: new_task.description.clone(),
            status: new_task.status.clone(),
            owner_id,
            created_at: Utc::now(),
            task_metadata: None,
            comment_count: 0,
        };
        state.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> TaskTrackResult<Option<Task>> {
        self.check("update_task")?;
        let mut state = self.state.write();
        let Some(task) = state.tasks.get_mut(&task_id) else {
            return Ok(None);
        };
        update.apply_to(task);
        let updated = task.clone();
        Ok(Some(state.hydrate(&updated)))
    }

    async fn update_task_metadata(
        &self,
        task_id: i64,
        metadata: &Value,
    ) -> TaskTrackResult<Option<i64>> {
        self.check("update_task_metadata")?;
        let mut state = self.state.write();
        Ok(state.tasks.get_mut(&task_id).map(|task| {
            task.task_metadata = Some(metadata.clone());
            task.owner_id
        }))
    }

    async fn delete_task(&self, task_id: i64) -> TaskTrackResult<Option<Vec<i64>>> {
        self.check("delete_task")?;
        let mut state = self.state.write();
        if state.tasks.remove(&task_id).is_none() {
            return Ok(None);
        }
        let mut cascaded = Vec::new();
        state.comments.retain(|id, c| {
            let keep = c.task_id != task_id;
            if !keep {
                cascaded.push(*id);
            }
            keep
        });
        Ok(Some(cascaded))
    }

    async fn task_stats(&self, owner_id: i64) -> TaskTrackResult<TaskStats> {
        self.read("task_stats")?;
        let state = self.state.read();
        Ok(TaskStats::from_counts(
            state
                .tasks
                .values()
                .filter(|t| t.owner_id == owner_id)
                .map(|t| (t.status.clone(), 1)),
        ))
    }
}

#[async_trait]
impl CommentRepository for InMemoryRepository {
    async fn find_comment(&self, comment_id: i64) -> TaskTrackResult<Option<Comment>> {
        self.read("find_comment")?;
        Ok(self.state.read().comments.get(&comment_id).cloned())
    }

    async fn list_comments(
        &self,
        query: &CommentQuery,
        pagination: Pagination,
    ) -> TaskTrackResult<(Vec<Comment>, i64)> {
        self.read("list_comments")?;
        let state = self.state.read();
        let mut matching: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| Self::comment_matches(&state, c, query))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as i64;
        Ok((page(&matching, pagination), total))
    }

    async fn insert_comment(
        &self,
        author_id: i64,
        new_comment: &NewComment,
    ) -> TaskTrackResult<Comment> {
        self.check("insert_comment")?;
        let mut state = self.state.write();
        if !state.tasks.contains_key(&new_comment.task_id) {
            return Err(TaskTrackError::DatabaseError(format!(
                "foreign key violation: task {} does not exist",
                new_comment.task_id
            )));
        }
        state.next_comment_id += 1;
        let comment = Comment {
            id: state.next_comment_id,
            content: new_comment.content.clone(),
            task_id: new_comment.task_id,
            user_id: author_id,
            created_at: Utc::now(),
        };
        state.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        update: &CommentUpdate,
    ) -> TaskTrackResult<Option<Comment>> {
        self.check("update_comment")?;
        let mut state = self.state.write();
        Ok(state.comments.get_mut(&comment_id).map(|c| {
            c.content = update.content.clone();
            c.clone()
        }))
    }

    async fn delete_comment(&self, comment_id: i64) -> TaskTrackResult<bool> {
        self.check("delete_comment")?;
        Ok(self.state.write().comments.remove(&comment_id).is_some())
    }
}
