#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # TaskTrack Core
//!
//! Caching, idempotency and background-enrichment core of a multi-tenant task
//! tracker.
//!
//! ## Overview
//!
//! Tasks and comments live in a relational store. Every read goes through a
//! response cache whose keys are partitioned per principal; every committed
//! write evicts the entries it could have made stale. Creation requests can
//! carry an idempotency token so client retries replay the first response. A
//! newly created task is handed to a background worker that fetches external
//! metadata for it with bounded retry.
//!
//! ## Module Organization
//!
//! - [`cache`] - Key/value cache store, key policy, idempotency records
//! - [`services`] - Read-through and write-invalidation orchestration
//! - [`enrichment`] - Background metadata enrichment with retry
//! - [`messaging`] - Job handoff between creation and the worker
//! - [`store`] - Repository traits, in-memory and PostgreSQL implementations
//! - [`models`] - Tasks, comments, principals, filters, pagination
//! - [`authorization`] - The capability check used by every path
//! - [`auth`] - Bearer token to principal resolution
//! - [`config`] - Layered configuration
//! - [`resilience`] - Circuit breaker in front of the distributed cache
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tasktrack_core::cache::{CacheProvider, CacheStore};
//! use tasktrack_core::messaging::InMemoryJobQueue;
//! use tasktrack_core::models::{NewTask, Principal};
//! use tasktrack_core::services::TaskService;
//! use tasktrack_core::store::InMemoryRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = Arc::new(InMemoryRepository::new());
//! let cache = CacheStore::new(CacheProvider::memory(Default::default()));
//! let (queue, _jobs) = InMemoryJobQueue::new();
//! let tasks = TaskService::new(repo, cache, Arc::new(queue));
//!
//! let created = tasks
//!     .create(&Principal::user(7), &NewTask::new("write docs"), Some("req-1"))
//!     .await?;
//! println!("created task {}", created.into_inner().id);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod authorization;
pub mod cache;
pub mod config;
pub mod constants;
pub mod enrichment;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod models;
pub mod resilience;
pub mod services;
pub mod store;

pub use authorization::AccessDecision;
pub use cache::{CacheProvider, CacheStore, IdempotencyCoordinator};
pub use config::{ConfigManager, TaskTrackConfig};
pub use enrichment::{EnrichmentOutcome, EnrichmentWorker, RetryPolicy};
pub use error::{TaskTrackError, TaskTrackResult};
pub use messaging::{EnrichmentJob, InMemoryJobQueue, JobPublisher};
pub use models::{Comment, Principal, Role, Task};
pub use services::{CommentService, ServiceError, TaskService};
pub use store::{CommentRepository, InMemoryRepository, PgRepository, TaskRepository};
