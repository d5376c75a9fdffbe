//! Unified error type for the data layer
//!
//! Repository traits return `DataError` so callers never depend on a
//! particular backend's error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    #[error("Migration {version} ({name}) failed on {backend}: {error}")]
    MigrationFailed {
        backend: &'static str,
        version: i32,
        name: String,
        error: String,
    },

    /// Stored data that no longer decodes
    #[error("Corrupt data in {column}: {reason}")]
    Corrupt { column: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Check if this is a connection-related error that might be transient
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

impl From<crate::data::sqlite::SqliteError> for DataError {
    fn from(e: crate::data::sqlite::SqliteError) -> Self {
        match e {
            crate::data::sqlite::SqliteError::Database(e) => Self::Sqlite(e),
            crate::data::sqlite::SqliteError::MigrationFailed {
                version,
                name,
                error,
            } => Self::MigrationFailed {
                backend: "sqlite",
                version,
                name,
                error,
            },
            crate::data::sqlite::SqliteError::Io(e) => Self::Io(e),
            crate::data::sqlite::SqliteError::Corrupt { column, reason } => {
                Self::Corrupt { column, reason }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::SqliteError;

    #[test]
    fn test_from_sqlite_migration_error() {
        let err: DataError = SqliteError::MigrationFailed {
            version: 2,
            name: "add_job_id_to_report_exports".to_string(),
            error: "duplicate column".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Migration 2 (add_job_id_to_report_exports) failed on sqlite: duplicate column"
        );
    }

    #[test]
    fn test_is_transient() {
        assert!(DataError::Sqlite(sqlx::Error::PoolTimedOut).is_transient());
        assert!(!DataError::Sqlite(sqlx::Error::RowNotFound).is_transient());
        assert!(
            !DataError::Corrupt {
                column: "status",
                reason: "bad".to_string()
            }
            .is_transient()
        );
    }
}
