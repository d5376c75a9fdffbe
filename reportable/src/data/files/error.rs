//! File storage error types

use thiserror::Error;

/// Errors from disk operations
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage path: {0}")]
    InvalidPath(String),

    #[error("Unknown storage disk: {0}")]
    UnknownDisk(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
