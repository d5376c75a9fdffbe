//! Disk trait definition
//!
//! A disk is a named storage location addressed by relative, `/`-separated
//! paths.

use std::path::Path;

use async_trait::async_trait;

use super::error::StorageError;

#[async_trait]
pub trait Disk: Send + Sync {
    /// Name the disk is registered under
    fn name(&self) -> &str;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Create a directory and any missing parents
    async fn make_directory(&self, path: &str) -> Result<(), StorageError>;

    /// Write `contents` to `path`, replacing any existing file
    ///
    /// Readers never observe a partially written file.
    async fn put(&self, path: &str, contents: &[u8]) -> Result<(), StorageError>;

    /// Move a local file to `path`
    ///
    /// Parent directories are created as needed. The source is consumed.
    async fn put_file(&self, path: &str, source: &Path) -> Result<(), StorageError>;

    /// Delete `path`; missing files are not an error
    async fn delete(&self, path: &str) -> Result<(), StorageError>;
}
