//! Repository traits
//!
//! The export service and executor talk to storage only through these
//! traits. `SqliteService` is the implementation.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::export::{ExportRecord, ExportStatus, NewExport};

/// Export record persistence
///
/// `mark_*` methods are guarded transitions: they return `false`, without
/// touching the record, when its current status is not a legal predecessor.
#[async_trait]
pub trait ExportRepository: Send + Sync {
    async fn create_export(&self, new: &NewExport) -> Result<ExportRecord, DataError>;

    async fn get_export(&self, id: i64) -> Result<Option<ExportRecord>, DataError>;

    async fn mark_dispatched(&self, id: i64, job_id: &str) -> Result<bool, DataError>;

    async fn mark_processing(&self, id: i64) -> Result<bool, DataError>;

    async fn mark_completed(&self, id: i64) -> Result<bool, DataError>;

    async fn mark_failed(&self, id: i64, message: &str) -> Result<bool, DataError>;

    /// Persist progress; `None` leaves a known total in place
    async fn update_progress(
        &self,
        id: i64,
        rows_processed: i64,
        total_rows: Option<i64>,
    ) -> Result<bool, DataError>;

    async fn list_retries(&self, parent_id: i64) -> Result<Vec<ExportRecord>, DataError>;

    async fn list_exports_by_status(
        &self,
        status: ExportStatus,
    ) -> Result<Vec<ExportRecord>, DataError>;
}
