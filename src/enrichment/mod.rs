//! # Background Enrichment
//!
//! After a task is created its id is published as an [`EnrichmentJob`]; the
//! worker here fetches an external document for it and stores it in the
//! task's metadata column.
//!
//! [`EnrichmentJob`]: crate::messaging::EnrichmentJob

pub mod errors;
pub mod fetcher;
pub mod retry;
pub mod worker;

pub use errors::FetchError;
pub use fetcher::{HttpMetadataFetcher, MetadataFetcher};
pub use retry::RetryPolicy;
pub use worker::{EnrichmentOutcome, EnrichmentWorker, WorkerSummary};
