//! # Domain Models
//!
//! Task and comment records, the authenticated principal, listing filters,
//! pagination envelopes and statistics.

pub mod comment;
pub mod filters;
pub mod pagination;
pub mod principal;
pub mod stats;
pub mod task;

pub use comment::{Comment, CommentUpdate, NewComment};
pub use filters::{
    CommentFilters, CommentQuery, CommentVisibility, OwnerScope, TaskFilters, TaskQuery,
};
pub use pagination::{PaginatedResponse, Pagination};
pub use principal::{Principal, Role};
pub use stats::TaskStats;
pub use task::{NewTask, Task, TaskUpdate};
