//! Data storage layer
//!
//! - `sqlite` - Export record database
//! - `files` - Named disks finished exports are written to
//! - `queue` - Job queue handing export records to workers
//! - `traits` - Repository traits
//! - `error` - Unified data error

pub mod error;
pub mod files;
pub mod queue;
pub mod sqlite;
pub mod traits;

pub use error::DataError;
pub use files::{Disk, FilesystemDisk, StorageError, StorageManager};
pub use queue::{FailureDisposition, JobQueue, MemoryQueue, QueueError, QueuedJob};
pub use sqlite::SqliteService;
pub use traits::ExportRepository;
