//! Query compilation and execution errors

use thiserror::Error;

/// A filter could not be translated for a query source
///
/// Raised before any row is read.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Invalid operand for '{column}' ({comparator}): {reason}")]
    InvalidOperand {
        column: String,
        comparator: String,
        reason: String,
    },

    #[error("Cannot filter by column '{column}' on {backend}")]
    UnknownColumn {
        backend: &'static str,
        column: String,
    },
}

/// Row fetching failed
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Backend(String),
}
