//! PostgreSQL repository.
//!
//! Listing queries are assembled with `sqlx::QueryBuilder`. The filter
//! predicates are pushed by one function that both the page query and the
//! count query call, so the two can never disagree.

use super::{CommentRepository, TaskRepository};
use crate::config::DatabaseConfig;
use crate::error::TaskTrackResult;
use crate::models::{
    Comment, CommentQuery, CommentUpdate, CommentVisibility, NewComment, NewTask, OwnerScope,
    Pagination, Task, TaskQuery, TaskStats, TaskUpdate,
};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;
use tracing::info;

const TASK_COLUMNS: &str = "tasks.id, tasks.title, tasks.description, tasks.status, \
     tasks.owner_id, tasks.created_at, tasks.task_metadata, \
     (SELECT COUNT(*) FROM comments c WHERE c.task_id = tasks.id) AS comment_count";

const COMMENT_COLUMNS: &str =
    "comments.id, comments.content, comments.task_id, comments.user_id, comments.created_at";

/// Tracks whether the next condition opens the WHERE clause or extends it
struct Conditions<'q, 'args> {
    query: &'q mut QueryBuilder<'args, Postgres>,
    has_conditions: bool,
}

impl<'q, 'args> Conditions<'q, 'args> {
    fn new(query: &'q mut QueryBuilder<'args, Postgres>) -> Self {
        Self {
            query,
            has_conditions: false,
        }
    }

    fn add_condition(&mut self, condition: &str) -> &mut QueryBuilder<'args, Postgres> {
        if self.has_conditions {
            self.query.push(" AND ");
        } else {
            self.query.push(" WHERE ");
            self.has_conditions = true;
        }
        self.query.push(condition)
    }
}

fn ilike_pattern(fragment: &str) -> String {
    format!("%{fragment}%")
}

fn push_task_predicates(query: &mut QueryBuilder<'_, Postgres>, filters: &TaskQuery) {
    let mut conditions = Conditions::new(query);

    if let OwnerScope::Owner(owner_id) = filters.scope {
        conditions.add_condition("tasks.owner_id = ").push_bind(owner_id);
    }
    if let Some(status) = &filters.status {
        conditions
            .add_condition("tasks.status ILIKE ")
            .push_bind(ilike_pattern(status));
    }
    if let Some(title) = &filters.title_contains {
        conditions
            .add_condition("tasks.title ILIKE ")
            .push_bind(ilike_pattern(title));
    }
    if let Some(after) = filters.created_after {
        conditions.add_condition("tasks.created_at >= ").push_bind(after);
    }
    if let Some(before) = filters.created_before {
        conditions.add_condition("tasks.created_at <= ").push_bind(before);
    }
}

fn push_comment_predicates(query: &mut QueryBuilder<'_, Postgres>, filters: &CommentQuery) {
    let mut conditions = Conditions::new(query);

    if let CommentVisibility::VisibleTo(user_id) = filters.visibility {
        conditions
            .add_condition("(comments.user_id = ")
            .push_bind(user_id)
            .push(" OR EXISTS (SELECT 1 FROM tasks t WHERE t.id = comments.task_id AND t.owner_id = ")
            .push_bind(user_id)
            .push("))");
    }
    if let Some(task_id) = filters.task_id {
        conditions.add_condition("comments.task_id = ").push_bind(task_id);
    }
    if let Some(user_id) = filters.user_id {
        conditions.add_condition("comments.user_id = ").push_bind(user_id);
    }
    if let Some(content) = &filters.content_contains {
        conditions
            .add_condition("comments.content ILIKE ")
            .push_bind(ilike_pattern(content));
    }
}

fn push_page(query: &mut QueryBuilder<'_, Postgres>, table: &str, pagination: Pagination) {
    query
        .push(format!(" ORDER BY {table}.created_at DESC, {table}.id DESC LIMIT "))
        .push_bind(pagination.limit())
        .push(" OFFSET ")
        .push_bind(pagination.offset());
}

#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> TaskTrackResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_seconds))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Database pool initialized"
        );
        Ok(Self { pool })
    }

    /// Apply pending migrations from `migrations/`
    pub async fn migrate(&self) -> TaskTrackResult<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskRepository for PgRepository {
    async fn find_task(&self, task_id: i64) -> TaskTrackResult<Option<Task>> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE tasks.id = $1"
        ))
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(task)
    }

    async fn list_tasks(
        &self,
        query: &TaskQuery,
        pagination: Pagination,
    ) -> TaskTrackResult<(Vec<Task>, i64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM tasks");
        push_task_predicates(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut page = QueryBuilder::new(format!("SELECT {TASK_COLUMNS} FROM tasks"));
        push_task_predicates(&mut page, query);
        push_page(&mut page, "tasks", pagination);
        let items = page.build_query_as::<Task>().fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    async fn insert_task(&self, owner_id: i64, new_task: &NewTask) -> TaskTrackResult<Task> {
        let task = sqlx::query_as::<_, Task>(
            "INSERT INTO tasks (title, description, status, owner_id) VALUES ($1, $2, $3, $4) \
             RETURNING id, title, description, status, owner_id, created_at, task_metadata, \
             0::bigint AS comment_count",
        )
        .bind(&new_task.title)
        .bind(&new_task.description)
        .bind(&new_task.status)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(task)
    }

    async fn update_task(&self, task_id: i64, update: &TaskUpdate) -> TaskTrackResult<Option<Task>> {
        if update.is_empty() {
            return self.find_task(task_id).await;
        }

        let mut query = QueryBuilder::<Postgres>::new("UPDATE tasks SET ");
        {
            let mut columns = query.separated(", ");
            if let Some(title) = &update.title {
                columns.push("title = ").push_bind_unseparated(title.clone());
            }
            if let Some(description) = &update.description {
                columns
                    .push("description = ")
                    .push_bind_unseparated(description.clone());
            }
            if let Some(status) = &update.status {
                columns.push("status = ").push_bind_unseparated(status.clone());
            }
        }
        query
            .push(" WHERE tasks.id = ")
            .push_bind(task_id)
            .push(format!(" RETURNING {TASK_COLUMNS}"));

        let task = query
            .build_query_as::<Task>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(task)
    }

    async fn update_task_metadata(
        &self,
        task_id: i64,
        metadata: &Value,
    ) -> TaskTrackResult<Option<i64>> {
        let owner: Option<i64> = sqlx::query_scalar(
            "UPDATE tasks SET task_metadata = $1 WHERE id = $2 RETURNING owner_id",
        )
        .bind(metadata)
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }

    async fn delete_task(&self, task_id: i64) -> TaskTrackResult<Option<Vec<i64>>> {
        let mut tx = self.pool.begin().await?;

        // Removed ahead of the FK cascade to collect their ids
        let cascaded: Vec<i64> =
            sqlx::query_scalar("DELETE FROM comments WHERE task_id = $1 RETURNING id")
                .bind(task_id)
                .fetch_all(&mut *tx)
                .await?;

        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(task_id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(cascaded))
    }

    async fn task_stats(&self, owner_id: i64) -> TaskTrackResult<TaskStats> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT lower(status), COUNT(*) FROM tasks WHERE owner_id = $1 GROUP BY lower(status)",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(TaskStats::from_counts(rows))
    }
}

#[async_trait]
impl CommentRepository for PgRepository {
    async fn find_comment(&self, comment_id: i64) -> TaskTrackResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE comments.id = $1"
        ))
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn list_comments(
        &self,
        query: &CommentQuery,
        pagination: Pagination,
    ) -> TaskTrackResult<(Vec<Comment>, i64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM comments");
        push_comment_predicates(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut page = QueryBuilder::new(format!("SELECT {COMMENT_COLUMNS} FROM comments"));
        push_comment_predicates(&mut page, query);
        push_page(&mut page, "comments", pagination);
        let items = page.build_query_as::<Comment>().fetch_all(&self.pool).await?;

        Ok((items, total))
    }

    async fn insert_comment(
        &self,
        author_id: i64,
        new_comment: &NewComment,
    ) -> TaskTrackResult<Comment> {
        let comment = sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (content, task_id, user_id) VALUES ($1, $2, $3) \
             RETURNING id, content, task_id, user_id, created_at",
        )
        .bind(&new_comment.content)
        .bind(new_comment.task_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_comment(
        &self,
        comment_id: i64,
        update: &CommentUpdate,
    ) -> TaskTrackResult<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $1 WHERE id = $2 \
             RETURNING id, content, task_id, user_id, created_at",
        )
        .bind(&update.content)
        .bind(comment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, comment_id: i64) -> TaskTrackResult<bool> {
        let result = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(comment_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
