use crate::storage::{StorageBackend, StorageError, StorageResult};
use std::path::{Path, PathBuf};

/// Filesystem-based storage backend
///
/// Stores staged files in a directory on the local filesystem, with configurable root path.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    root_path: PathBuf,
}

impl FilesystemStorage {
    /// Create a new filesystem storage backend with the given root path
    pub fn new<P: AsRef<Path>>(root_path: P) -> StorageResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        if !root_path.exists() {
            std::fs::create_dir_all(&root_path).map_err(|e| {
                StorageError::Path(format!(
                    "Failed to create storage root directory '{}': {}",
                    root_path.display(),
                    e
                ))
            })?;
        }

        // Not canonicalized: callers compare staged paths against the root they passed in.
        Ok(Self { root_path })
    }
}

impl StorageBackend for FilesystemStorage {
    fn base_path(&self) -> &Path {
        &self.root_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_filesystem_storage_creation() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let root = temp_dir.path().join("nested/root");
        let storage = FilesystemStorage::new(&root).expect("Failed to create storage");

        assert_eq!(storage.base_path(), root.as_path());
        assert!(root.is_dir());
    }

    #[test]
    fn test_unique_dirs_do_not_collide() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FilesystemStorage::new(temp_dir.path()).expect("Failed to create storage");

        let first = storage.create_unique_dir("session_").unwrap();
        let second = storage.create_unique_dir("session_").unwrap();
        assert_ne!(first, second);
        assert!(first.is_dir() && second.is_dir());

        let name = first.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("session_"));
    }

    #[test]
    fn test_remove_dir_is_idempotent() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let storage = FilesystemStorage::new(temp_dir.path()).expect("Failed to create storage");

        let dir = storage.create_unique_dir("session_").unwrap();
        std::fs::write(dir.join("a.dcm"), b"x").unwrap();

        storage.remove_dir(&dir).expect("first removal");
        assert!(!dir.exists());
        storage.remove_dir(&dir).expect("second removal is a no-op");
    }

    #[test]
    fn test_remove_dir_outside_root_refused() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let other = TempDir::new().expect("Failed to create temp dir");
        let storage = FilesystemStorage::new(temp_dir.path()).expect("Failed to create storage");

        assert!(matches!(
            storage.remove_dir(other.path()),
            Err(StorageError::Path(_))
        ));
        assert!(other.path().exists());
    }
}
