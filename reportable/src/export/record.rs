//! Export records
//!
//! One row per export run. The descriptor is the frozen report state a
//! worker rebuilds the report from; the compiled query is kept for audit.

use serde::Serialize;
use serde_json::Value;

use super::status::ExportStatus;
use crate::report::ReportDescriptor;

/// Insert payload for a new record, which always starts Pending
#[derive(Debug, Clone, PartialEq)]
pub struct NewExport {
    pub descriptor: ReportDescriptor,
    pub query_sql: String,
    pub query_bindings: Vec<Value>,
    pub queue: String,
    pub connection: Option<String>,
    pub retried_from_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportRecord {
    pub id: i64,
    pub report_kind: String,
    #[serde(skip)]
    pub descriptor_json: String,
    pub query_sql: String,
    pub query_bindings: Vec<Value>,
    pub status: ExportStatus,
    pub rows_processed: i64,
    pub total_rows: Option<i64>,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
    pub failed_at: Option<i64>,
    pub error_message: Option<String>,
    pub retried_from_id: Option<i64>,
    pub disk: String,
    pub path: String,
    pub queue: String,
    pub connection: Option<String>,
    pub job_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ExportRecord {
    pub fn descriptor(&self) -> Result<ReportDescriptor, serde_json::Error> {
        serde_json::from_str(&self.descriptor_json)
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_finished()
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn can_retry(&self) -> bool {
        self.status == ExportStatus::Failed
    }

    /// Percent of `total_rows` processed, rounded to two decimals
    ///
    /// `None` until the total is known, and for empty results.
    pub fn progress_percentage(&self) -> Option<f64> {
        match self.total_rows {
            Some(total) if total > 0 => {
                let percent = self.rows_processed as f64 / total as f64 * 100.0;
                Some((percent * 100.0).round() / 100.0)
            }
            _ => None,
        }
    }
}
