//! In-memory job queue
//!
//! Named FIFO queues behind a mutex. Popped jobs stay reserved until acked
//! or failed. Failed jobs are released for another attempt after the backoff
//! until `max_attempts` deliveries have failed, then dead-lettered. Only the
//! most recent dead letters are kept.
//!
//! Jobs live only as long as the process. Export records survive in SQLite,
//! so `work` re-enqueues Dispatched records on startup.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use super::backend::{FailureDisposition, JobQueue, QueuedJob};
use super::error::QueueError;
use crate::core::config::QueueSettings;
use crate::core::constants::{
    DEFAULT_BACKOFF_SECS, DEFAULT_DEAD_LETTER_LIMIT, DEFAULT_MAX_ATTEMPTS, DEFAULT_QUEUE_CONNECTION,
};

struct Entry {
    job: QueuedJob,
    available_at: Instant,
}

#[derive(Default)]
struct State {
    queues: HashMap<String, VecDeque<Entry>>,
    reserved: HashMap<String, QueuedJob>,
    dead_letters: VecDeque<(QueuedJob, String)>,
}

pub struct MemoryQueue {
    connection: String,
    max_attempts: u32,
    backoff: Duration,
    dead_letter_limit: usize,
    state: Mutex<State>,
    notify: Notify,
}

impl Default for MemoryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, Duration::from_secs(DEFAULT_BACKOFF_SECS))
    }
}

impl MemoryQueue {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            connection: DEFAULT_QUEUE_CONNECTION.to_string(),
            max_attempts: max_attempts.max(1),
            backoff,
            dead_letter_limit: DEFAULT_DEAD_LETTER_LIMIT,
            state: Mutex::new(State::default()),
            notify: Notify::new(),
        }
    }

    pub fn from_settings(settings: &QueueSettings) -> Self {
        let queue = Self::new(
            settings.max_attempts,
            Duration::from_secs(settings.backoff_secs),
        );
        match &settings.connection {
            Some(connection) => queue.with_connection(connection.clone()),
            None => queue,
        }
    }

    pub fn with_connection(mut self, connection: impl Into<String>) -> Self {
        self.connection = connection.into();
        self
    }

    pub fn with_dead_letter_limit(mut self, limit: usize) -> Self {
        self.dead_letter_limit = limit;
        self
    }

    /// Jobs whose attempts ran out, with the last error, oldest first
    pub fn dead_letters(&self) -> Vec<(QueuedJob, String)> {
        self.state.lock().dead_letters.iter().cloned().collect()
    }

    /// Remove and return the dead letters
    pub fn take_dead_letters(&self) -> Vec<(QueuedJob, String)> {
        std::mem::take(&mut self.state.lock().dead_letters).into()
    }

    pub fn reserved(&self) -> usize {
        self.state.lock().reserved.len()
    }

    fn take_available(&self, queue: &str) -> Option<QueuedJob> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let entries = state.queues.get_mut(queue)?;
        let position = entries.iter().position(|e| e.available_at <= now)?;
        let entry = entries.remove(position)?;
        state
            .reserved
            .insert(entry.job.id.clone(), entry.job.clone());
        Some(entry.job)
    }

    /// Earliest moment a delayed job on `queue` becomes visible
    fn next_available(&self, queue: &str) -> Option<Instant> {
        let state = self.state.lock();
        state
            .queues
            .get(queue)
            .and_then(|entries| entries.iter().map(|e| e.available_at).min())
    }

    fn enqueue(&self, job: QueuedJob, available_at: Instant) {
        self.state
            .lock()
            .queues
            .entry(job.queue.clone())
            .or_default()
            .push_back(Entry { job, available_at });
        self.notify.notify_waiters();
    }
}

#[async_trait]
impl JobQueue for MemoryQueue {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn connection(&self) -> &str {
        &self.connection
    }

    /// Pushing a job whose id is already queued or reserved is a no-op
    async fn push(&self, job: QueuedJob) -> Result<(), QueueError> {
        {
            let mut state = self.state.lock();
            let queued = state
                .queues
                .values()
                .flatten()
                .any(|entry| entry.job.id == job.id);
            if queued || state.reserved.contains_key(&job.id) {
                tracing::debug!(job_id = %job.id, queue = %job.queue, "Job already queued");
                return Ok(());
            }
            tracing::trace!(job_id = %job.id, queue = %job.queue, "Job pushed");
            state
                .queues
                .entry(job.queue.clone())
                .or_default()
                .push_back(Entry {
                    job,
                    available_at: Instant::now(),
                });
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn pop(&self, queue: &str) -> Result<Option<QueuedJob>, QueueError> {
        Ok(self.take_available(queue))
    }

    async fn wait(
        &self,
        queue: &str,
        timeout: Duration,
    ) -> Result<Option<QueuedJob>, QueueError> {
        let deadline = Instant::now() + timeout;
        loop {
            // Register before checking so a push in between is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(job) = self.take_available(queue) {
                return Ok(Some(job));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }

            let wake = self
                .next_available(queue)
                .map_or(deadline, |at| at.min(deadline));
            let _ = tokio::time::timeout_at(wake, notified).await;
        }
    }

    async fn ack(&self, job: &QueuedJob) -> Result<(), QueueError> {
        self.state
            .lock()
            .reserved
            .remove(&job.id)
            .map(|_| ())
            .ok_or_else(|| QueueError::NotReserved(job.id.clone()))
    }

    async fn fail(&self, job: &QueuedJob, error: &str) -> Result<FailureDisposition, QueueError> {
        let mut reserved = {
            let mut state = self.state.lock();
            state
                .reserved
                .remove(&job.id)
                .ok_or_else(|| QueueError::NotReserved(job.id.clone()))?
        };
        reserved.attempts += 1;

        if reserved.attempts < self.max_attempts {
            let attempts = reserved.attempts;
            tracing::debug!(job_id = %reserved.id, attempts, "Job released for retry");
            self.enqueue(reserved, Instant::now() + self.backoff);
            return Ok(FailureDisposition::Released { attempts });
        }

        tracing::warn!(
            job_id = %reserved.id,
            queue = %reserved.queue,
            attempts = reserved.attempts,
            error,
            "Job dead-lettered"
        );
        let mut state = self.state.lock();
        state.dead_letters.push_back((reserved, error.to_string()));
        while state.dead_letters.len() > self.dead_letter_limit {
            state.dead_letters.pop_front();
        }
        Ok(FailureDisposition::DeadLettered)
    }

    async fn pending(&self, queue: &str) -> Result<usize, QueueError> {
        Ok(self
            .state
            .lock()
            .queues
            .get(queue)
            .map_or(0, VecDeque::len))
    }
}
