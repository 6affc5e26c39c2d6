//! Staging directory ownership: creation, sequential naming, guaranteed removal.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::CacheConfig;
use crate::error::{Result, TransferError};
use crate::storage::{FilesystemStorage, StorageBackend};

/// Prefix of the per-session directory under the cache root
const SESSION_DIR_PREFIX: &str = "session_";

/// A file copied into the staging directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Position in the session, contiguous from 0
    pub index: usize,
    /// Location inside the staging directory
    pub path: PathBuf,
    /// Where the file was discovered
    pub source: PathBuf,
}

/// `<prefix>_<6-digit index>.<extension>` naming shared by staging and export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialNaming {
    pub prefix: String,
    pub extension: String,
}

impl SequentialNaming {
    pub fn new(prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    pub fn file_name(&self, index: usize) -> String {
        if self.extension.is_empty() {
            format!("{}_{:06}", self.prefix, index)
        } else {
            format!("{}_{:06}.{}", self.prefix, index, self.extension)
        }
    }
}

/// One caching session: a private staging directory plus the ordered files in it.
///
/// At most one directory is active. Starting a new session while one is
/// active does not delete the old directory; it is kept aside and removed by
/// the next [`CacheSession::cleanup`]. Dropping the session cleans up.
#[derive(Debug)]
pub struct CacheSession {
    storage: FilesystemStorage,
    naming: SequentialNaming,
    directory: Option<PathBuf>,
    retired: Vec<PathBuf>,
    staged: Vec<StagedFile>,
}

impl CacheSession {
    /// Create an idle session whose directories live under `config.root`
    pub fn new(config: &CacheConfig) -> Result<Self> {
        let storage = FilesystemStorage::new(&config.root)
            .map_err(|e| TransferError::Staging(e.to_string()))?;
        Ok(Self::with_storage(
            storage,
            SequentialNaming::new(config.prefix.trim(), config.extension.trim()),
        ))
    }

    pub fn with_storage(storage: FilesystemStorage, naming: SequentialNaming) -> Self {
        Self {
            storage,
            naming,
            directory: None,
            retired: Vec::new(),
            staged: Vec::new(),
        }
    }

    /// Create a fresh staging directory and start an empty file list
    pub fn begin(&mut self) -> Result<&Path> {
        if let Some(previous) = self.directory.take() {
            warn!(
                "Starting a new cache session while {} is still active; \
                 it will be removed on cleanup",
                previous.display()
            );
            self.retired.push(previous);
        }
        self.staged.clear();

        let dir = self
            .storage
            .create_unique_dir(SESSION_DIR_PREFIX)
            .map_err(|e| TransferError::Staging(e.to_string()))?;
        info!("Created staging directory {}", dir.display());
        Ok(self.directory.insert(dir).as_path())
    }

    /// Copy `source` into the staging directory under the next index.
    ///
    /// Content and modification time are preserved, the name is not. On
    /// failure no index is consumed.
    pub fn stage(&mut self, source: &Path) -> Result<&StagedFile> {
        let dir = self
            .directory
            .as_ref()
            .ok_or_else(|| TransferError::precondition("no active cache session"))?;

        let index = self.staged.len();
        let dest = dir.join(self.naming.file_name(index));
        if let Err(e) = copy_preserving_mtime(source, &dest) {
            let _ = fs::remove_file(&dest);
            return Err(e.into());
        }
        debug!("Staged {} as {}", source.display(), dest.display());

        self.staged.push(StagedFile {
            index,
            path: dest,
            source: source.to_path_buf(),
        });
        Ok(&self.staged[index])
    }

    /// Staged files in discovery order
    pub fn staged(&self) -> &[StagedFile] {
        &self.staged
    }

    /// Staged files, or a precondition error when there is nothing to export
    pub fn require_staged(&self) -> Result<&[StagedFile]> {
        if self.directory.is_none() {
            return Err(TransferError::precondition(
                "no cache pass has been run",
            ));
        }
        if self.staged.is_empty() {
            return Err(TransferError::precondition("no staged files to export"));
        }
        Ok(&self.staged)
    }

    /// The active staging directory, if any
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn is_active(&self) -> bool {
        self.directory.is_some()
    }

    /// Remove the staging directory (and any left over from earlier sessions)
    /// and forget the staged files.
    ///
    /// Safe to call with no active session and safe to call repeatedly.
    /// Removal problems are logged, never returned.
    pub fn cleanup(&mut self) {
        self.staged.clear();
        let dirs: Vec<PathBuf> = self
            .directory
            .take()
            .into_iter()
            .chain(self.retired.drain(..))
            .collect();

        for dir in dirs {
            match self.storage.remove_dir(&dir) {
                Ok(()) => info!("Removed staging directory {}", dir.display()),
                Err(e) => warn!("Failed to remove staging directory {}: {}", dir.display(), e),
            }
        }
    }
}

impl Drop for CacheSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// Copy a file and carry over its modification time
pub(crate) fn copy_preserving_mtime(source: &Path, dest: &Path) -> std::io::Result<u64> {
    let bytes = fs::copy(source, dest)?;
    if let Ok(modified) = fs::metadata(source).and_then(|m| m.modified()) {
        let file = File::options().write(true).open(dest)?;
        file.set_modified(modified)?;
    }
    Ok(bytes)
}
