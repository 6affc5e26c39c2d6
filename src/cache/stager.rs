//! Two-pass discovery of DICOM files and staging into the local cache.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::session::CacheSession;
use super::signature::is_valid_container;
use crate::error::{Result, TransferError};
use crate::pipeline::observer::{notify, notify_failure, TransferObserver};

/// Counts reported by one caching pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheOutcome {
    /// Files validated and copied into the staging directory
    pub cached: usize,
    /// Regular files found under the source tree
    pub total: usize,
}

/// Walks a source tree and stages every valid container file.
pub struct CacheStager<'a> {
    observer: &'a dyn TransferObserver,
    cancel: CancellationToken,
}

impl<'a> CacheStager<'a> {
    pub fn new(observer: &'a dyn TransferObserver) -> Self {
        Self {
            observer,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next file boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Stage every DICOM file under `source_dir` into a new session directory.
    ///
    /// The whole tree is listed first so progress has a fixed denominator,
    /// then each file is validated and copied in walk order. Files that fail
    /// to copy are logged and skipped.
    #[tracing::instrument(skip(self, session, source_dir), fields(source = %source_dir.display()))]
    pub fn cache(&self, session: &mut CacheSession, source_dir: &Path) -> Result<CacheOutcome> {
        let files = collect_files(source_dir)?;
        let total = files.len();
        notify(
            self.observer,
            &format!("Found {} files under {}", total, source_dir.display()),
        );

        session.begin()?;

        let mut cached = 0;
        for (i, path) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                notify_failure(
                    self.observer,
                    &format!("Caching cancelled after {} of {} files", i, total),
                );
                break;
            }

            if is_valid_container(path) {
                match session.stage(path) {
                    Ok(staged) => {
                        cached += 1;
                        debug!("Cached {} -> {}", path.display(), staged.path.display());
                    }
                    Err(e) => notify_failure(
                        self.observer,
                        &format!("Failed to cache {}: {}", path.display(), e),
                    ),
                }
            } else {
                debug!("Skipping non-DICOM file {}", path.display());
            }

            self.observer.progress(i + 1, total);
        }

        notify(
            self.observer,
            &format!("Cached {} of {} files", cached, total),
        );
        Ok(CacheOutcome { cached, total })
    }
}

/// Every regular file under `root`, in a stable walk order.
///
/// An unreadable root aborts; unreadable entries below it are skipped.
fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(TransferError::SourceUnreadable {
            path: root.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        match entry {
            Ok(entry) => {
                if entry.path().is_file() {
                    files.push(entry.into_path());
                }
            }
            Err(e) if e.depth() == 0 => {
                let message = e.to_string();
                return Err(TransferError::SourceUnreadable {
                    path: root.to_path_buf(),
                    source: e.into_io_error().unwrap_or_else(|| {
                        std::io::Error::new(std::io::ErrorKind::Other, message)
                    }),
                });
            }
            Err(e) => warn!("Skipping unreadable entry under {}: {}", root.display(), e),
        }
    }
    Ok(files)
}
