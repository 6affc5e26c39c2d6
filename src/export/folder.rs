//! Copies staged files into a destination directory.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ItemResult, TransferOutcome};
use crate::cache::{SequentialNaming, StagedFile};
use crate::pipeline::observer::{notify, notify_failure, TransferObserver};

/// Copies staged files into a folder under fresh sequential names.
///
/// Names already present in the destination are skipped over, so repeated
/// exports into the same folder add files instead of overwriting them.
pub struct FolderExporter<'a> {
    naming: SequentialNaming,
    observer: &'a dyn TransferObserver,
    cancel: CancellationToken,
}

impl<'a> FolderExporter<'a> {
    pub fn new(naming: SequentialNaming, observer: &'a dyn TransferObserver) -> Self {
        Self {
            naming,
            observer,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next file boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Copy every staged file into `dest_dir`, creating it when needed.
    ///
    /// An empty `staged` slice returns immediately and leaves the filesystem
    /// untouched. A destination that cannot be created ends the pass with
    /// nothing copied.
    #[tracing::instrument(
        skip(self, dest_dir, staged),
        fields(dest = %dest_dir.display(), files = staged.len())
    )]
    pub fn export(&self, dest_dir: &Path, staged: &[StagedFile]) -> TransferOutcome {
        if staged.is_empty() {
            return TransferOutcome::default();
        }

        if let Err(e) = fs::create_dir_all(dest_dir) {
            notify_failure(
                self.observer,
                &format!("Cannot create destination folder {}: {}", dest_dir.display(), e),
            );
            return TransferOutcome::default();
        }

        let total = staged.len();
        let mut copied = 0;
        let mut attempted = 0;
        let mut next_index = 0;

        for (i, file) in staged.iter().enumerate() {
            if self.cancel.is_cancelled() {
                notify_failure(
                    self.observer,
                    &format!("Folder export cancelled after {} of {} files", i, total),
                );
                break;
            }

            attempted += 1;
            match self.copy_one(dest_dir, file, &mut next_index) {
                ItemResult::Done => copied += 1,
                ItemResult::Failed(reason) => notify_failure(
                    self.observer,
                    &format!("Failed to copy {}: {}", file.path.display(), reason),
                ),
            }
            self.observer.progress(i + 1, total);
        }

        notify(
            self.observer,
            &format!("Copied {} of {} files to {}", copied, total, dest_dir.display()),
        );
        TransferOutcome::new(copied, attempted)
    }

    fn copy_one(&self, dest_dir: &Path, file: &StagedFile, next_index: &mut usize) -> ItemResult {
        let (dest, mut output) = match self.create_next(dest_dir, next_index) {
            Ok(created) => created,
            Err(e) => return ItemResult::Failed(e.to_string()),
        };

        let result = File::open(&file.path).and_then(|mut input| {
            io::copy(&mut input, &mut output)?;
            let modified = input.metadata()?.modified()?;
            output.set_modified(modified)
        });

        match result {
            Ok(()) => {
                debug!("Copied {} -> {}", file.path.display(), dest.display());
                ItemResult::Done
            }
            Err(e) => {
                drop(output);
                let _ = fs::remove_file(&dest);
                ItemResult::Failed(e.to_string())
            }
        }
    }

    /// Create the first free `<prefix>_NNNNNN.<ext>` at or after `next_index`
    fn create_next(&self, dest_dir: &Path, next_index: &mut usize) -> io::Result<(PathBuf, File)> {
        loop {
            let candidate = dest_dir.join(self.naming.file_name(*next_index));
            *next_index += 1;
            match File::options().write(true).create_new(true).open(&candidate) {
                Ok(file) => return Ok((candidate, file)),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
    }
}
