//! Named disk registry

use std::collections::HashMap;
use std::sync::Arc;

use super::error::StorageError;
use super::filesystem::FilesystemDisk;
use super::storage::Disk;
use crate::core::config::{DiskDriver, StorageSettings};

/// Disks addressed by name
#[derive(Clone, Default)]
pub struct StorageManager {
    disks: HashMap<String, Arc<dyn Disk>>,
}

impl StorageManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every configured disk
    pub fn from_settings(settings: &StorageSettings) -> Self {
        let mut manager = Self::new();
        for (name, disk) in &settings.disks {
            match disk.driver {
                DiskDriver::Filesystem => {
                    manager.register(Arc::new(FilesystemDisk::new(name.clone(), &disk.root)));
                }
            }
            tracing::debug!(disk = %name, root = %disk.root.display(), "Storage disk registered");
        }
        manager
    }

    /// Register a disk under its own name, replacing any previous one
    pub fn register(&mut self, disk: Arc<dyn Disk>) {
        self.disks.insert(disk.name().to_string(), disk);
    }

    pub fn disk(&self, name: &str) -> Result<Arc<dyn Disk>, StorageError> {
        self.disks
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::UnknownDisk(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.disks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for StorageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageManager")
            .field("disks", &self.names())
            .finish()
    }
}
