//! Filesystem disk
//!
//! Paths are resolved under a root directory. Writes go to a uniquely named
//! staging file beside the destination and are renamed into place.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use super::error::StorageError;
use super::storage::Disk;

#[derive(Debug, Clone)]
pub struct FilesystemDisk {
    name: String,
    root: PathBuf,
}

impl FilesystemDisk {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a relative disk path, refusing anything that escapes the root
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => return Err(StorageError::InvalidPath(path.to_string())),
            }
        }
        Ok(resolved)
    }

    /// Ensure parent directories exist for a file path
    async fn ensure_parent_dirs(&self, path: &Path) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn staging_path(dest: &Path) -> PathBuf {
        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        dest.with_file_name(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4().simple()))
    }

    fn file_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let resolved = self.resolve(path)?;
        if resolved == self.root {
            return Err(StorageError::InvalidPath(path.to_string()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl Disk for FilesystemDisk {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let resolved = self.resolve(path)?;
        Ok(fs::try_exists(&resolved).await?)
    }

    async fn make_directory(&self, path: &str) -> Result<(), StorageError> {
        let resolved = self.resolve(path)?;
        fs::create_dir_all(&resolved).await?;
        tracing::trace!(disk = %self.name, path = %resolved.display(), "Directory created");
        Ok(())
    }

    async fn put(&self, path: &str, contents: &[u8]) -> Result<(), StorageError> {
        let dest = self.file_path(path)?;
        self.ensure_parent_dirs(&dest).await?;

        let staging = Self::staging_path(&dest);
        fs::write(&staging, contents).await?;
        if let Err(e) = fs::rename(&staging, &dest).await {
            fs::remove_file(&staging).await.ok();
            return Err(StorageError::Io(e));
        }

        tracing::debug!(
            disk = %self.name,
            path = %dest.display(),
            size = contents.len(),
            "File stored"
        );
        Ok(())
    }

    async fn put_file(&self, path: &str, source: &Path) -> Result<(), StorageError> {
        let dest = self.file_path(path)?;
        self.ensure_parent_dirs(&dest).await?;

        // Try atomic rename first (works if same filesystem)
        match fs::rename(source, &dest).await {
            Ok(_) => {
                tracing::debug!(
                    disk = %self.name,
                    path = %dest.display(),
                    "File finalized (rename)"
                );
            }
            Err(_) => {
                // Cross-filesystem: copy next to the destination, then rename
                let staging = Self::staging_path(&dest);
                fs::copy(source, &staging).await?;
                if let Err(e) = fs::rename(&staging, &dest).await {
                    fs::remove_file(&staging).await.ok();
                    return Err(StorageError::Io(e));
                }
                fs::remove_file(source).await.ok();
                tracing::debug!(
                    disk = %self.name,
                    path = %dest.display(),
                    "File finalized (copy+rename)"
                );
            }
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let resolved = self.file_path(path)?;
        match fs::remove_file(&resolved).await {
            Ok(_) => {
                tracing::debug!(disk = %self.name, path = %resolved.display(), "File deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn disk(dir: &TempDir) -> FilesystemDisk {
        FilesystemDisk::new("local", dir.path())
    }

    #[tokio::test]
    async fn test_put_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let disk = disk(&temp_dir);

        disk.put("reports/users.csv", b"id\n1\n").await.unwrap();
        assert_eq!(std::fs::read(temp_dir.path().join("reports/users.csv")).unwrap(), b"id\n1\n");
        assert!(disk.exists("reports").await.unwrap());
        assert!(disk.exists("reports/users.csv").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_leaves_no_staging_files() {
        let temp_dir = TempDir::new().unwrap();
        let disk = disk(&temp_dir);
        disk.put("a/b.csv", b"x").await.unwrap();
        disk.put("a/b.csv", b"y").await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(temp_dir.path().join("a"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("b.csv")]);
        assert_eq!(std::fs::read(temp_dir.path().join("a/b.csv")).unwrap(), b"y");
    }

    #[tokio::test]
    async fn test_put_file_moves_source_and_creates_dirs() {
        let temp_dir = TempDir::new().unwrap();
        let disk = disk(&temp_dir);
        let source = temp_dir.path().join("staged.csv");
        std::fs::write(&source, "name\nAnn\n").unwrap();

        disk.put_file("custom/exports/deep/users.csv", &source)
            .await
            .unwrap();

        assert!(!source.exists());
        assert_eq!(
            std::fs::read(temp_dir.path().join("custom/exports/deep/users.csv")).unwrap(),
            b"name\nAnn\n"
        );
    }

    #[tokio::test]
    async fn test_make_directory() {
        let temp_dir = TempDir::new().unwrap();
        let disk = disk(&temp_dir);
        assert!(!disk.exists("x/y").await.unwrap());
        disk.make_directory("x/y").await.unwrap();
        assert!(temp_dir.path().join("x/y").is_dir());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let disk = disk(&temp_dir);
        disk.put("a.csv", b"1").await.unwrap();
        disk.delete("a.csv").await.unwrap();
        disk.delete("a.csv").await.unwrap();
        assert!(!disk.exists("a.csv").await.unwrap());
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let temp_dir = TempDir::new().unwrap();
        let disk = disk(&temp_dir);
        assert!(matches!(
            disk.put("../outside.csv", b"x").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(
            disk.delete("a/../../b").await,
            Err(StorageError::InvalidPath(_))
        ));
        assert!(matches!(disk.put("", b"x").await, Err(StorageError::InvalidPath(_))));
    }

    #[test]
    fn test_leading_slash_stays_under_root() {
        let disk = FilesystemDisk::new("local", "/srv/storage");
        assert_eq!(
            disk.resolve("/reports/a.csv").unwrap(),
            PathBuf::from("/srv/storage/reports/a.csv")
        );
        assert_eq!(disk.root(), Path::new("/srv/storage"));
    }
}
