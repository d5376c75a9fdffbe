//! Output file storage
//!
//! Finished exports are moved onto a named disk. Only the filesystem driver
//! exists; disks are configured under `storage.disks`.

mod error;
mod filesystem;
mod manager;
mod storage;

pub use error::StorageError;
pub use filesystem::FilesystemDisk;
pub use manager::StorageManager;
pub use storage::Disk;
