//! # Response Cache
//!
//! ## Architecture
//!
//! ```text
//! CacheStore (typed, never fails)        <- used by services and idempotency
//!   └── CacheProvider (enum + breaker)
//!         ├── Redis(RedisCacheService)       GET / SETEX / DEL / SCAN+DEL
//!         ├── Memory(InMemoryCacheService)   per-entry TTL, glob deletes
//!         └── NoOp(NoOpCacheService)         always miss, always succeed
//! ```
//!
//! Key derivation lives in [`keys`], value encoding in [`codec`], and the
//! idempotency record store in [`idempotency`].

pub mod codec;
pub mod errors;
pub mod idempotency;
pub mod keys;
pub mod provider;
pub mod providers;
pub mod store;
pub mod traits;

pub use errors::{CacheError, CacheResult};
pub use idempotency::{Execution, IdempotencyCoordinator};
pub use keys::{CollectionResource, FilterSet};
pub use provider::CacheProvider;
pub use providers::{InMemoryCacheService, NoOpCacheService};
pub use store::CacheStore;
pub use traits::CacheService;

#[cfg(feature = "cache-redis")]
pub use providers::RedisCacheService;
