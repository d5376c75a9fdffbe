//! Export executor
//!
//! Runs one export record to completion:
//!
//! 1. Dispatched -> Processing
//! 2. Rebuild the report from its descriptor and compile the filters
//! 3. Stream rows into a staged CSV, persisting progress
//! 4. Move the file onto its disk, then Processing -> Completed
//!
//! If the completion is refused or fails, the moved file is deleted again.
//!
//! Any error after step 1 marks the record Failed and is returned, so the
//! queue adapter sees it too. The staged file is discarded on failure, so
//! nothing appears at the output path.

use std::sync::Arc;

use super::error::ExportError;
use super::record::ExportRecord;
use super::sink::CsvSink;
use super::status::ExportStatus;
use crate::core::config::ExportSettings;
use crate::data::{ExportRepository, StorageManager};
use crate::query::QuerySource;
use crate::report::{ReportDescriptor, ReportRegistry, StreamMode};

pub struct ExportExecutor {
    repository: Arc<dyn ExportRepository>,
    registry: Arc<ReportRegistry>,
    storage: Arc<StorageManager>,
    settings: ExportSettings,
}

impl ExportExecutor {
    pub fn new(
        repository: Arc<dyn ExportRepository>,
        registry: Arc<ReportRegistry>,
        storage: Arc<StorageManager>,
        settings: ExportSettings,
    ) -> Self {
        Self {
            repository,
            registry,
            storage,
            settings,
        }
    }

    /// Run export `id`, returning the finished record
    pub async fn run(&self, id: i64) -> Result<ExportRecord, ExportError> {
        let record = self
            .repository
            .get_export(id)
            .await?
            .ok_or(ExportError::NotFound(id))?;

        if !self.repository.mark_processing(id).await? {
            return Err(ExportError::InvalidTransition {
                id,
                from: record.status,
                to: ExportStatus::Processing,
            });
        }
        tracing::info!(export_id = id, kind = %record.report_kind, "Export started");

        match self.execute(&record).await {
            Ok(rows) => {
                let completed = self.repository.mark_completed(id).await;
                if !matches!(completed, Ok(true)) {
                    // A record that is not Completed keeps nothing at its path
                    self.discard_artifact(&record).await;
                }
                match completed {
                    Ok(true) => {}
                    Ok(false) => {
                        let current = self.current_status(id).await?;
                        return Err(ExportError::InvalidTransition {
                            id,
                            from: current,
                            to: ExportStatus::Completed,
                        });
                    }
                    Err(e) => {
                        let e = ExportError::from(e);
                        self.record_failure(id, &e.to_string()).await;
                        return Err(e);
                    }
                }
                tracing::info!(export_id = id, rows, path = %record.path, "Export completed");
                self.repository
                    .get_export(id)
                    .await?
                    .ok_or(ExportError::NotFound(id))
            }
            Err(e) => {
                self.record_failure(id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn record_failure(&self, id: i64, message: &str) {
        if let Err(e) = self.repository.mark_failed(id, message).await {
            tracing::error!(export_id = id, error = %e, "Failed to record export failure");
        }
        tracing::warn!(export_id = id, error = %message, "Export failed");
    }

    async fn discard_artifact(&self, record: &ExportRecord) {
        let removed = match self.storage.disk(&record.disk) {
            Ok(disk) => disk.delete(&record.path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = removed {
            tracing::error!(export_id = record.id, path = %record.path, error = %e, "Failed to remove export file");
        }
    }

    async fn current_status(&self, id: i64) -> Result<ExportStatus, ExportError> {
        self.repository
            .get_export(id)
            .await?
            .map(|r| r.status)
            .ok_or(ExportError::NotFound(id))
    }

    async fn execute(&self, record: &ExportRecord) -> Result<u64, ExportError> {
        let descriptor = record.descriptor().map_err(ExportError::Descriptor)?;
        let definition = self.registry.reconstruct(&descriptor)?;
        let query = definition.build_query()?;
        let disk = self.storage.disk(&descriptor.disk)?;

        let mut sink =
            CsvSink::create(self.settings.temp_dir.as_deref(), definition.headers()).await?;
        match descriptor.mode {
            StreamMode::Chunked => {
                self.stream_chunks(record.id, query.as_ref(), &descriptor, &mut sink)
                    .await?
            }
            StreamMode::Bulk => self.stream_all(record.id, query.as_ref(), &mut sink).await?,
        }
        let (staged, rows) = sink.finish()?;

        if !disk.exists(&descriptor.directory).await? {
            disk.make_directory(&descriptor.directory).await?;
        }
        disk.put_file(&descriptor.output_path(), &staged).await?;
        Ok(rows)
    }

    /// Fetch `chunk_size` windows until a short or empty one
    ///
    /// The total is never counted up front, so only `rows_processed` moves.
    async fn stream_chunks(
        &self,
        id: i64,
        query: &dyn QuerySource,
        descriptor: &ReportDescriptor,
        sink: &mut CsvSink,
    ) -> Result<(), ExportError> {
        let size = descriptor.chunk_size.max(1);
        let mut offset = 0usize;
        loop {
            let batch = query.fetch_chunk(size, offset).await?;
            if batch.is_empty() {
                break;
            }
            for row in &batch {
                sink.write_row(row)?;
            }
            offset += batch.len();
            self.repository
                .update_progress(id, offset as i64, None)
                .await?;
            tracing::debug!(export_id = id, rows_processed = offset, "Chunk written");

            if batch.len() < size {
                break;
            }
        }
        Ok(())
    }

    async fn stream_all(
        &self,
        id: i64,
        query: &dyn QuerySource,
        sink: &mut CsvSink,
    ) -> Result<(), ExportError> {
        let rows = query.fetch_all().await?;
        let total = rows.len() as i64;
        self.repository.update_progress(id, 0, Some(total)).await?;

        for row in &rows {
            sink.write_row(row)?;
        }
        self.repository
            .update_progress(id, total, Some(total))
            .await?;
        tracing::debug!(export_id = id, total_rows = total, "Rows written");
        Ok(())
    }
}
