//! Job queue trait definition
//!
//! A job is delivered to exactly one worker. The worker either acks it or
//! hands it back through `fail`, where the backend applies its own retry and
//! dead-letter policy.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::error::QueueError;

#[derive(Debug, Clone, PartialEq)]
pub struct QueuedJob {
    pub id: String,
    pub queue: String,
    pub payload: Value,
    /// Failed deliveries so far
    pub attempts: u32,
}

impl QueuedJob {
    pub fn new(queue: impl Into<String>, payload: Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            queue: queue.into(),
            payload,
            attempts: 0,
        }
    }
}

/// What the backend did with a failed job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureDisposition {
    /// Back on the queue for another attempt
    Released { attempts: u32 },
    /// Attempts exhausted, parked in the dead-letter list
    DeadLettered,
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Backend name for logging
    fn backend_name(&self) -> &'static str;

    /// Connection name this backend answers to
    fn connection(&self) -> &str;

    async fn push(&self, job: QueuedJob) -> Result<(), QueueError>;

    /// Reserve the next available job, if any
    async fn pop(&self, queue: &str) -> Result<Option<QueuedJob>, QueueError>;

    /// Reserve the next job, waiting up to `timeout` for one to arrive
    async fn wait(&self, queue: &str, timeout: Duration)
    -> Result<Option<QueuedJob>, QueueError>;

    /// Mark a reserved job done
    async fn ack(&self, job: &QueuedJob) -> Result<(), QueueError>;

    /// Report a reserved job as failed
    async fn fail(&self, job: &QueuedJob, error: &str)
    -> Result<FailureDisposition, QueueError>;

    /// Jobs waiting on `queue`, excluding reserved ones
    async fn pending(&self, queue: &str) -> Result<usize, QueueError>;
}
