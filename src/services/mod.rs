//! # Services
//!
//! Orchestration over the store and the response cache: read-through for
//! listings, details and statistics; invalidation after every committed write;
//! idempotent creation; enrichment dispatch.

pub mod comment_service;
pub mod errors;
pub mod invalidation;
pub mod read_through;
pub mod task_service;

pub use comment_service::CommentService;
pub use errors::{ServiceError, ServiceResult};
pub use invalidation::InvalidationPlan;
pub use read_through::cached_or_load;
pub use task_service::TaskService;
