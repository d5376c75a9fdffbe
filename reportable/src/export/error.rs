//! Export error types

use thiserror::Error;

use super::status::ExportStatus;
use crate::data::{DataError, QueueError, StorageError};
use crate::query::QueryError;
use crate::report::ReportError;

/// Top-level error for dispatching and running exports
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export {0} not found")]
    NotFound(i64),

    #[error("Export {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: ExportStatus,
        to: ExportStatus,
    },

    #[error("Export {id} is {status} and cannot be retried")]
    NotRetryable { id: i64, status: ExportStatus },

    #[error("Invalid report descriptor: {0}")]
    Descriptor(serde_json::Error),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error("CSV write failed: {0}")]
    Sink(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_display() {
        let err = ExportError::InvalidTransition {
            id: 4,
            from: ExportStatus::Processing,
            to: ExportStatus::Processing,
        };
        assert_eq!(
            err.to_string(),
            "Export 4 cannot move from processing to processing"
        );
    }

    #[test]
    fn test_wrapped_errors_keep_message() {
        let err: ExportError = QueryError::Backend("source went away".to_string()).into();
        assert_eq!(err.to_string(), "source went away");

        let err: ExportError = StorageError::UnknownDisk("s3".to_string()).into();
        assert_eq!(err.to_string(), "Storage error: Unknown storage disk: s3");
    }
}
