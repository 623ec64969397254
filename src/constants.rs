//! # System Constants
//!
//! Fixed values shared by the cache, idempotency and enrichment layers.
//! Cache lifetimes are fixed per operation type and are intentionally not
//! part of the runtime configuration.

use std::time::Duration;

/// Cache lifetimes per read operation
pub mod ttl {
    use super::Duration;

    /// Task listing pages
    pub const TASK_LIST: Duration = Duration::from_secs(300);
    /// Comment listing pages
    pub const COMMENT_LIST: Duration = Duration::from_secs(180);
    /// Single task or comment lookups
    pub const DETAIL: Duration = Duration::from_secs(600);
    /// Per-user task statistics
    pub const STATS: Duration = Duration::from_secs(120);
    /// Retention window for idempotency records (24h)
    pub const IDEMPOTENCY: Duration = Duration::from_secs(86_400);
}

/// Cache key prefixes
pub mod keys {
    pub const TASK_DETAIL_PREFIX: &str = "task";
    pub const COMMENT_DETAIL_PREFIX: &str = "comment";
    pub const TASK_COLLECTION_PREFIX: &str = "tasks";
    pub const COMMENT_COLLECTION_PREFIX: &str = "comments";
    pub const IDEMPOTENCY_PREFIX: &str = "idempotency";
    pub const STATS_SUFFIX: &str = "stats";

    /// Number of hex characters kept from the filter digest (64 bits)
    pub const FILTER_HASH_HEX_LEN: usize = 16;
}

/// Task status values used by defaults and statistics
pub mod task_status {
    pub const PENDING: &str = "pending";
    pub const IN_PROGRESS: &str = "in_progress";
    pub const COMPLETED: &str = "completed";
}

/// Role names as carried in tokens
pub mod roles {
    pub const ADMIN: &str = "admin";
    pub const USER: &str = "user";
}

/// Pagination bounds
pub mod pagination {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_PAGE_SIZE: u32 = 20;
    pub const MAX_PAGE_SIZE: u32 = 100;
}

/// Enrichment retry defaults
pub mod enrichment {
    pub const MAX_ATTEMPTS: u32 = 3;
    pub const BACKOFF_BASE_SECONDS: u64 = 2;
    pub const BACKOFF_MULTIPLIER: f64 = 2.0;
    pub const BACKOFF_MAX_SECONDS: u64 = 10;
    pub const REQUEST_TIMEOUT_MS: u64 = 5_000;
    pub const WORKER_CONCURRENCY: usize = 4;
    pub const QUEUE_NAME: &str = "task_enrichment";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttls_match_operation_types() {
        assert_eq!(ttl::TASK_LIST.as_secs(), 300);
        assert_eq!(ttl::COMMENT_LIST.as_secs(), 180);
        assert_eq!(ttl::DETAIL.as_secs(), 600);
        assert_eq!(ttl::STATS.as_secs(), 120);
        assert_eq!(ttl::IDEMPOTENCY.as_secs(), 24 * 60 * 60);
    }
}
