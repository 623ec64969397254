//! # Enrichment Worker
//!
//! Consumes [`EnrichmentJob`]s and augments the task with a fetched metadata
//! document. Fetches are retried per [`RetryPolicy`]; on success the worker
//! writes the metadata column alone and evicts the cached views of the task.
//! On failure nothing is written. Outcomes go to the log only.
//!
//! Redelivered jobs are harmless: the write is a single-column overwrite.

use super::errors::FetchError;
use super::fetcher::MetadataFetcher;
use super::retry::RetryPolicy;
use crate::cache::CacheStore;
use crate::config::EnrichmentConfig;
use crate::logging::log_enrichment_operation;
use crate::messaging::{EnrichmentJob, JobReceiver};
use crate::services::InvalidationPlan;
use crate::store::TaskRepository;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    Enriched,
    /// The task was deleted before the metadata could be written
    TaskMissing,
    Failed { attempts: u32, error: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    pub processed: u64,
    pub enriched: u64,
    pub failed: u64,
}

#[derive(Clone)]
pub struct EnrichmentWorker {
    tasks: Arc<dyn TaskRepository>,
    fetcher: Arc<dyn MetadataFetcher>,
    cache: CacheStore,
    policy: RetryPolicy,
    concurrency: usize,
}

impl std::fmt::Debug for EnrichmentWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentWorker")
            .field("policy", &self.policy)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

impl EnrichmentWorker {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        fetcher: Arc<dyn MetadataFetcher>,
        cache: CacheStore,
    ) -> Self {
        Self {
            tasks,
            fetcher,
            cache,
            policy: RetryPolicy::default(),
            concurrency: crate::constants::enrichment::WORKER_CONCURRENCY,
        }
    }

    pub fn from_config(
        config: &EnrichmentConfig,
        tasks: Arc<dyn TaskRepository>,
        fetcher: Arc<dyn MetadataFetcher>,
        cache: CacheStore,
    ) -> Self {
        Self::new(tasks, fetcher, cache)
            .with_policy(RetryPolicy::from_config(config))
            .with_concurrency(config.worker_concurrency)
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub async fn enrich(&self, job: &EnrichmentJob) -> EnrichmentOutcome {
        log_enrichment_operation(job.task_id, &job.job_id, None, "started", None);

        let (metadata, attempts) = match self.fetch_with_retry(job).await {
            Ok(fetched) => fetched,
            Err((attempts, err)) => {
                error!(
                    task_id = job.task_id,
                    job_id = %job.job_id,
                    attempts = attempts,
                    error = %err,
                    "Enrichment failed; task left unmodified"
                );
                return EnrichmentOutcome::Failed {
                    attempts,
                    error: err.to_string(),
                };
            }
        };

        match self.tasks.update_task_metadata(job.task_id, &metadata).await {
            Ok(Some(owner_id)) => {
                InvalidationPlan::for_enrichment(job.task_id, owner_id)
                    .apply(&self.cache)
                    .await;
                log_enrichment_operation(
                    job.task_id,
                    &job.job_id,
                    Some(attempts),
                    "enriched",
                    None,
                );
                EnrichmentOutcome::Enriched
            }
            Ok(None) => {
                info!(
                    task_id = job.task_id,
                    job_id = %job.job_id,
                    "Task no longer exists, metadata discarded"
                );
                EnrichmentOutcome::TaskMissing
            }
            Err(e) => {
                error!(
                    task_id = job.task_id,
                    job_id = %job.job_id,
                    error = %e,
                    "Metadata write failed"
                );
                EnrichmentOutcome::Failed {
                    attempts,
                    error: e.to_string(),
                }
            }
        }
    }

    async fn fetch_with_retry(&self, job: &EnrichmentJob) -> Result<(Value, u32), (u32, FetchError)> {
        let mut attempt = 1;
        loop {
            match self.fetcher.fetch(job.task_id).await {
                Ok(metadata) => return Ok((metadata, attempt)),
                Err(err) if err.is_retryable() && self.policy.has_attempts_left(attempt) => {
                    let delay = self.policy.delay_for_attempt(attempt);
                    warn!(
                        task_id = job.task_id,
                        job_id = %job.job_id,
                        attempt = attempt,
                        retry_in_ms = delay.as_millis() as u64,
                        error = %err,
                        "Metadata fetch failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err((attempt, err)),
            }
        }
    }

    /// Process jobs until every publisher is gone and the queue is drained
    pub async fn run(&self, receiver: JobReceiver) -> WorkerSummary {
        info!(concurrency = self.concurrency, "Enrichment worker started");

        let jobs = futures::stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|job| (job, rx))
        });

        let summary = jobs
            .map(|job| async move { self.enrich(&job).await })
            .buffer_unordered(self.concurrency)
            .fold(WorkerSummary::default(), |mut summary, outcome| async move {
                summary.processed += 1;
                match outcome {
                    EnrichmentOutcome::Enriched => summary.enriched += 1,
                    EnrichmentOutcome::Failed { .. } => summary.failed += 1,
                    EnrichmentOutcome::TaskMissing => {}
                }
                summary
            })
            .await;

        info!(
            processed = summary.processed,
            enriched = summary.enriched,
            failed = summary.failed,
            "Enrichment worker stopped"
        );
        summary
    }
}
