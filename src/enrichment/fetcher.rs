//! # Metadata Fetchers
//!
//! `MetadataFetcher` is the outbound seam of the enrichment worker. The HTTP
//! implementation issues a single `GET {endpoint_base_url}/{task_id}` with no
//! body and no auth, and expects a JSON document back.

use super::errors::FetchError;
use crate::config::EnrichmentConfig;
use crate::error::{TaskTrackError, TaskTrackResult};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait MetadataFetcher: Send + Sync {
    async fn fetch(&self, task_id: i64) -> Result<Value, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpMetadataFetcher {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpMetadataFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> TaskTrackResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                TaskTrackError::ConfigurationError(format!("failed to build HTTP client: {e}"))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn from_config(config: &EnrichmentConfig) -> TaskTrackResult<Self> {
        Self::new(config.endpoint_base_url.clone(), config.request_timeout())
    }

    pub fn url_for(&self, task_id: i64) -> String {
        format!("{}/{}", self.base_url, task_id)
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if err.is_decode() {
            FetchError::Decode(err.to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl MetadataFetcher for HttpMetadataFetcher {
    async fn fetch(&self, task_id: i64) -> Result<Value, FetchError> {
        let url = self.url_for(task_id);
        debug!(task_id = task_id, url = %url, "Fetching task metadata");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| self.classify(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for_trims_trailing_slash() {
        let fetcher =
            HttpMetadataFetcher::new("https://example.test/todos/", Duration::from_secs(1))
                .unwrap();
        assert_eq!(fetcher.url_for(42), "https://example.test/todos/42");
    }
}
