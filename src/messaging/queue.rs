//! # Job Queue
//!
//! `JobPublisher` is the seam task creation publishes through. The in-memory
//! queue is a tokio channel: cloneable publisher handles on one side, a single
//! `JobReceiver` consumed by the enrichment worker on the other.

use super::errors::MessagingError;
use super::message::EnrichmentJob;
use crate::constants::enrichment::QUEUE_NAME;
use crate::error::TaskTrackResult;
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

#[async_trait]
pub trait JobPublisher: Send + Sync {
    async fn publish(&self, job: EnrichmentJob) -> TaskTrackResult<()>;
}

#[derive(Debug, Clone)]
pub struct InMemoryJobQueue {
    queue_name: String,
    sender: mpsc::UnboundedSender<EnrichmentJob>,
}

#[derive(Debug)]
pub struct JobReceiver {
    receiver: mpsc::UnboundedReceiver<EnrichmentJob>,
}

impl InMemoryJobQueue {
    pub fn new() -> (Self, JobReceiver) {
        Self::named(QUEUE_NAME)
    }

    pub fn named(queue_name: impl Into<String>) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                queue_name: queue_name.into(),
                sender,
            },
            JobReceiver { receiver },
        )
    }

    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }
}

#[async_trait]
impl JobPublisher for InMemoryJobQueue {
    async fn publish(&self, job: EnrichmentJob) -> TaskTrackResult<()> {
        let job_id = job.job_id;
        let task_id = job.task_id;
        self.sender
            .send(job)
            .map_err(|_| MessagingError::queue_closed(&self.queue_name))?;
        debug!(
            queue = %self.queue_name,
            job_id = %job_id,
            task_id = task_id,
            "Enrichment job published"
        );
        Ok(())
    }
}

impl JobReceiver {
    /// Next job; `None` once every publisher is dropped and the queue is drained
    pub async fn recv(&mut self) -> Option<EnrichmentJob> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<EnrichmentJob> {
        self.receiver.try_recv().ok()
    }

    /// Everything currently queued
    pub fn drain(&mut self) -> Vec<EnrichmentJob> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TaskTrackError;

    #[tokio::test]
    async fn test_publish_then_receive_in_order() {
        let (queue, mut receiver) = InMemoryJobQueue::new();
        queue.publish(EnrichmentJob::new(1)).await.unwrap();
        queue.publish(EnrichmentJob::new(2)).await.unwrap();

        let ids: Vec<i64> = receiver.drain().into_iter().map(|j| j.task_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(queue.queue_name(), QUEUE_NAME);
    }

    #[tokio::test]
    async fn test_closed_queue_reports_messaging_error() {
        let (queue, receiver) = InMemoryJobQueue::new();
        drop(receiver);
        let result = queue.publish(EnrichmentJob::new(1)).await;
        assert!(matches!(result, Err(TaskTrackError::MessagingError(_))));
    }

    #[tokio::test]
    async fn test_receiver_ends_when_publishers_drop() {
        let (queue, mut receiver) = InMemoryJobQueue::new();
        queue.publish(EnrichmentJob::new(9)).await.unwrap();
        drop(queue);

        assert_eq!(receiver.recv().await.map(|j| j.task_id), Some(9));
        assert_eq!(receiver.recv().await, None);
    }
}
