//! Export dispatch and lookup

use std::sync::Arc;

use super::error::ExportError;
use super::job::ExportJob;
use super::record::{ExportRecord, NewExport};
use super::status::ExportStatus;
use crate::core::config::{ExportSettings, QueueSettings};
use crate::data::{ExportRepository, JobQueue, QueueError, QueuedJob};
use crate::report::ReportDefinition;

/// Creates export records and hands them to the job queue
pub struct ExportService {
    repository: Arc<dyn ExportRepository>,
    queue: Arc<dyn JobQueue>,
    queue_settings: QueueSettings,
    export_settings: ExportSettings,
}

impl ExportService {
    pub fn new(
        repository: Arc<dyn ExportRepository>,
        queue: Arc<dyn JobQueue>,
        queue_settings: QueueSettings,
        export_settings: ExportSettings,
    ) -> Self {
        Self {
            repository,
            queue,
            queue_settings,
            export_settings,
        }
    }

    /// Freeze `definition` into a new record and queue it
    ///
    /// Filters are compiled here, so a filter the source cannot translate is
    /// rejected before any record exists.
    pub async fn dispatch(&self, definition: &ReportDefinition) -> Result<ExportRecord, ExportError> {
        self.check_connection()?;
        let compiled = definition.build_query()?.compiled();
        let new = NewExport {
            descriptor: definition.descriptor(&self.export_settings),
            query_sql: compiled.sql,
            query_bindings: compiled.bindings,
            queue: self.queue_settings.name.clone(),
            connection: self.queue_settings.connection.clone(),
            retried_from_id: None,
        };
        self.create_and_enqueue(&new).await
    }

    /// Run a failed export again as a new record linked to it
    pub async fn retry(&self, id: i64) -> Result<ExportRecord, ExportError> {
        let original = self.find(id).await?;
        if !original.can_retry() {
            return Err(ExportError::NotRetryable {
                id,
                status: original.status,
            });
        }
        self.check_connection()?;

        let new = NewExport {
            descriptor: original.descriptor().map_err(ExportError::Descriptor)?,
            query_sql: original.query_sql.clone(),
            query_bindings: original.query_bindings.clone(),
            queue: self.queue_settings.name.clone(),
            connection: self.queue_settings.connection.clone(),
            retried_from_id: Some(original.id),
        };
        let retry = self.create_and_enqueue(&new).await?;
        tracing::info!(export_id = retry.id, retried_from = id, "Export retried");
        Ok(retry)
    }

    pub async fn find(&self, id: i64) -> Result<ExportRecord, ExportError> {
        self.repository
            .get_export(id)
            .await?
            .ok_or(ExportError::NotFound(id))
    }

    /// The record `record` was retried from, if any
    pub async fn retried_from(
        &self,
        record: &ExportRecord,
    ) -> Result<Option<ExportRecord>, ExportError> {
        match record.retried_from_id {
            Some(parent) => Ok(self.repository.get_export(parent).await?),
            None => Ok(None),
        }
    }

    pub async fn retries(&self, id: i64) -> Result<Vec<ExportRecord>, ExportError> {
        Ok(self.repository.list_retries(id).await?)
    }

    pub async fn list(&self, status: ExportStatus) -> Result<Vec<ExportRecord>, ExportError> {
        Ok(self.repository.list_exports_by_status(status).await?)
    }

    /// Queue every Dispatched record again
    ///
    /// Jobs only live in memory, so records dispatched by an earlier process
    /// have no job until this runs. Jobs still queued keep their id and are
    /// not duplicated. Returns the number of Dispatched records.
    pub async fn recover_dispatched(&self) -> Result<usize, ExportError> {
        let records = self
            .repository
            .list_exports_by_status(ExportStatus::Dispatched)
            .await?;
        for record in &records {
            let mut job = QueuedJob::new(record.queue.clone(), ExportJob::new(record.id).to_payload());
            if let Some(job_id) = &record.job_id {
                job.id = job_id.clone();
            }
            self.queue.push(job).await?;
            tracing::debug!(export_id = record.id, queue = %record.queue, "Export re-queued");
        }
        Ok(records.len())
    }

    fn check_connection(&self) -> Result<(), ExportError> {
        if let Some(connection) = &self.queue_settings.connection
            && connection != self.queue.connection()
        {
            return Err(QueueError::UnknownConnection(connection.clone()).into());
        }
        Ok(())
    }

    async fn create_and_enqueue(&self, new: &NewExport) -> Result<ExportRecord, ExportError> {
        let record = self.repository.create_export(new).await?;
        let job = QueuedJob::new(record.queue.clone(), ExportJob::new(record.id).to_payload());

        if !self.repository.mark_dispatched(record.id, &job.id).await? {
            return Err(ExportError::InvalidTransition {
                id: record.id,
                from: record.status,
                to: ExportStatus::Dispatched,
            });
        }
        let job_id = job.id.clone();
        if let Err(e) = self.queue.push(job).await {
            self.repository.mark_failed(record.id, &e.to_string()).await?;
            return Err(e.into());
        }

        tracing::info!(
            export_id = record.id,
            kind = %record.report_kind,
            queue = %record.queue,
            job_id = %job_id,
            backend = self.queue.backend_name(),
            "Export dispatched"
        );
        self.find(record.id).await
    }
}
