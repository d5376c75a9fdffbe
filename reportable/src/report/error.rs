//! Report construction errors

use thiserror::Error;

use crate::query::{CompileError, QueryError};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Unknown report kind: {0}")]
    UnknownKind(String),

    #[error("Invalid arguments for report '{kind}': {reason}")]
    InvalidArguments { kind: String, reason: String },

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Compile(#[from] CompileError),
}
