//! ExportRepository trait implementation for SQLite

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::ExportRepository;
use crate::export::{ExportRecord, ExportStatus, NewExport};

use super::SqliteService;
use super::repositories::export;

#[async_trait]
impl ExportRepository for SqliteService {
    async fn create_export(&self, new: &NewExport) -> Result<ExportRecord, DataError> {
        export::create_export(self.pool(), new)
            .await
            .map_err(Into::into)
    }

    async fn get_export(&self, id: i64) -> Result<Option<ExportRecord>, DataError> {
        export::get_export(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn mark_dispatched(&self, id: i64, job_id: &str) -> Result<bool, DataError> {
        export::mark_dispatched(self.pool(), id, job_id)
            .await
            .map_err(Into::into)
    }

    async fn mark_processing(&self, id: i64) -> Result<bool, DataError> {
        export::mark_processing(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn mark_completed(&self, id: i64) -> Result<bool, DataError> {
        export::mark_completed(self.pool(), id)
            .await
            .map_err(Into::into)
    }

    async fn mark_failed(&self, id: i64, message: &str) -> Result<bool, DataError> {
        export::mark_failed(self.pool(), id, message)
            .await
            .map_err(Into::into)
    }

    async fn update_progress(
        &self,
        id: i64,
        rows_processed: i64,
        total_rows: Option<i64>,
    ) -> Result<bool, DataError> {
        export::update_progress(self.pool(), id, rows_processed, total_rows)
            .await
            .map_err(Into::into)
    }

    async fn list_retries(&self, parent_id: i64) -> Result<Vec<ExportRecord>, DataError> {
        export::list_retries(self.pool(), parent_id)
            .await
            .map_err(Into::into)
    }

    async fn list_exports_by_status(
        &self,
        status: ExportStatus,
    ) -> Result<Vec<ExportRecord>, DataError> {
        export::list_by_status(self.pool(), status)
            .await
            .map_err(Into::into)
    }
}
