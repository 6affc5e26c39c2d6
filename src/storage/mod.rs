use std::path::{Path, PathBuf};

pub mod filesystem;

pub use filesystem::FilesystemStorage;

/// Error type for storage operations
#[derive(Debug)]
pub enum StorageError {
    Io(std::io::Error),
    Path(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "IO error: {}", e),
            StorageError::Path(e) => write!(f, "Path error: {}", e),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err)
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Storage backend trait for the local staging area
///
/// Staging directories are created under the backend root and removed by
/// whoever created them; the backend itself keeps no record of them.
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Get the base path for this storage backend
    fn base_path(&self) -> &Path;

    /// Create a subpath relative to the storage root
    fn subpath_str(&self, path: &str) -> PathBuf {
        self.base_path().join(path)
    }

    /// Create a fresh, uniquely named directory with the given prefix
    fn create_unique_dir(&self, prefix: &str) -> StorageResult<PathBuf> {
        std::fs::create_dir_all(self.base_path())?;
        let path = self.subpath_str(&format!("{}{}", prefix, uuid::Uuid::new_v4().simple()));
        std::fs::create_dir(&path)?;
        Ok(path)
    }

    /// Remove a directory previously created under the root
    ///
    /// A directory that no longer exists is not an error.
    fn remove_dir(&self, path: &Path) -> StorageResult<()> {
        if !path.starts_with(self.base_path()) {
            return Err(StorageError::Path(format!(
                "refusing to remove '{}' outside storage root '{}'",
                path.display(),
                self.base_path().display()
            )));
        }
        match std::fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
