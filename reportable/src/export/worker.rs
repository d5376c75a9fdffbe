//! Queue worker
//!
//! Pulls export jobs off the queue and runs them through the executor. A
//! failed run is reported to the queue's `fail`, which applies the queue's
//! own retry and dead-letter policy.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::error::ExportError;
use super::executor::ExportExecutor;
use super::job::ExportJob;
use super::record::ExportRecord;
use crate::core::constants::WORKER_IDLE_WAIT_MS;
use crate::data::{ExportRepository, FailureDisposition, JobQueue, QueuedJob};

/// Result of processing one job
#[derive(Debug)]
pub enum JobOutcome {
    Completed(ExportRecord),
    Failed {
        export_id: Option<i64>,
        error: String,
        disposition: FailureDisposition,
    },
}

pub struct ExportWorker {
    queue: Arc<dyn JobQueue>,
    executor: Arc<ExportExecutor>,
    repository: Arc<dyn ExportRepository>,
    queue_name: String,
}

impl ExportWorker {
    pub fn new(
        queue: Arc<dyn JobQueue>,
        executor: Arc<ExportExecutor>,
        repository: Arc<dyn ExportRepository>,
        queue_name: impl Into<String>,
    ) -> Self {
        Self {
            queue,
            executor,
            repository,
            queue_name: queue_name.into(),
        }
    }

    /// Process the next job, waiting up to `timeout` for one
    pub async fn run_next(&self, timeout: Duration) -> Result<Option<JobOutcome>, ExportError> {
        match self.queue.wait(&self.queue_name, timeout).await? {
            Some(job) => Ok(Some(self.process(job).await?)),
            None => Ok(None),
        }
    }

    /// Process jobs until the queue is empty
    pub async fn drain(&self) -> Result<Vec<JobOutcome>, ExportError> {
        let mut outcomes = Vec::new();
        while let Some(job) = self.queue.pop(&self.queue_name).await? {
            outcomes.push(self.process(job).await?);
        }
        Ok(outcomes)
    }

    /// Process jobs until shutdown is signalled
    ///
    /// Shutdown is checked between jobs; a running export is never abandoned
    /// halfway. Returns the number of jobs processed.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> usize {
        let idle_wait = Duration::from_millis(WORKER_IDLE_WAIT_MS);
        let mut processed = 0;
        tracing::info!(queue = %self.queue_name, backend = self.queue.backend_name(), "Worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }
            let next = tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                next = self.queue.wait(&self.queue_name, idle_wait) => next,
            };

            match next {
                Ok(Some(job)) => match self.process(job).await {
                    Ok(_) => processed += 1,
                    Err(e) => tracing::error!(error = %e, "Job bookkeeping failed"),
                },
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Queue wait failed");
                    tokio::time::sleep(idle_wait).await;
                }
            }
        }

        tracing::info!(processed, "Worker stopped");
        processed
    }

    async fn process(&self, job: QueuedJob) -> Result<JobOutcome, ExportError> {
        let (export_id, result) = match ExportJob::from_payload(&job.payload) {
            Ok(payload) => (
                Some(payload.export_id),
                self.executor.run(payload.export_id).await,
            ),
            Err(e) => (None, Err(ExportError::from(e))),
        };

        match result {
            Ok(record) => {
                self.queue.ack(&job).await?;
                Ok(JobOutcome::Completed(record))
            }
            Err(e) => {
                let error = e.to_string();
                // A refused transition means another run owns the record
                if let Some(id) = export_id
                    && !matches!(e, ExportError::InvalidTransition { .. })
                {
                    self.mark_unfinished_failed(id, &error).await;
                }
                let disposition = self.queue.fail(&job, &error).await?;
                tracing::warn!(job_id = %job.id, export_id, error = %error, ?disposition, "Job failed");
                Ok(JobOutcome::Failed {
                    export_id,
                    error,
                    disposition,
                })
            }
        }
    }

    /// Failure hook for errors raised before the executor recorded them
    async fn mark_unfinished_failed(&self, id: i64, error: &str) {
        match self.repository.get_export(id).await {
            Ok(Some(record)) if !record.is_finished() => {
                if let Err(e) = self.repository.mark_failed(id, error).await {
                    tracing::error!(export_id = id, error = %e, "Failed to mark export failed");
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!(export_id = id, error = %e, "Failed to load export"),
        }
    }
}
