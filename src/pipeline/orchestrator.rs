use std::path::Path;
use std::sync::Arc;

use dimse::{Connector, RemoteNode};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::observer::{notify, ChannelObserver, TransferEvent, TransferObserver};
use crate::cache::{CacheOutcome, CacheSession, CacheStager, SequentialNaming};
use crate::config::{CacheConfig, Config, DestinationConfig};
use crate::error::{Result, TransferError};
use crate::export::{FolderExporter, PacsExporter, TransferOutcome};

/// What one full run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSummary {
    pub cache: CacheOutcome,
    /// `None` when nothing was staged and the export phase was skipped
    pub export: Option<TransferOutcome>,
    pub cancelled: bool,
}

/// Sequences cache -> export -> cleanup over one [`CacheSession`].
///
/// All methods block. Run them off any UI or async executor thread, e.g.
/// through [`spawn_transfer`].
pub struct TransferOrchestrator {
    session: CacheSession,
    extension: String,
    observer: Arc<dyn TransferObserver>,
    cancel: CancellationToken,
}

impl TransferOrchestrator {
    pub fn new(cache: &CacheConfig, observer: Arc<dyn TransferObserver>) -> Result<Self> {
        Ok(Self {
            session: CacheSession::new(cache)?,
            extension: cache.extension.trim().to_string(),
            observer,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn session(&self) -> &CacheSession {
        &self.session
    }

    /// Phase 1: stage the DICOM files found under `source`
    pub fn cache(&mut self, source: &Path) -> Result<CacheOutcome> {
        CacheStager::new(self.observer.as_ref())
            .with_cancellation(self.cancel.clone())
            .cache(&mut self.session, source)
    }

    /// Copy staged files into `dest` as `<prefix>_NNNNNN.<ext>`
    pub fn export_to_folder(&self, dest: &Path, prefix: &str) -> Result<TransferOutcome> {
        let staged = self.session.require_staged()?;
        let naming = SequentialNaming::new(prefix, self.extension.as_str());
        Ok(FolderExporter::new(naming, self.observer.as_ref())
            .with_cancellation(self.cancel.clone())
            .export(dest, staged))
    }

    /// Send staged files to `node`, associating as `local_aet`
    pub fn export_to_remote(&self, local_aet: &str, node: &RemoteNode) -> Result<TransferOutcome> {
        let staged = self.session.require_staged()?;
        Ok(PacsExporter::for_local_aet(local_aet, self.observer.as_ref())
            .with_cancellation(self.cancel.clone())
            .export(node, staged))
    }

    /// Send staged files through an arbitrary connector
    pub fn export_with<C: Connector>(
        &self,
        connector: C,
        node: &RemoteNode,
    ) -> Result<TransferOutcome> {
        let staged = self.session.require_staged()?;
        Ok(PacsExporter::new(connector, self.observer.as_ref())
            .with_cancellation(self.cancel.clone())
            .export(node, staged))
    }

    /// Phase 3: drop the staging directory. Idempotent.
    pub fn cleanup(&mut self) {
        self.session.cleanup();
    }

    /// Run all three phases. Cleanup happens whatever the first two did.
    #[tracing::instrument(skip(self, destination), fields(destination = destination.kind()))]
    pub fn run(
        &mut self,
        source: &Path,
        destination: &DestinationConfig,
    ) -> Result<TransferSummary> {
        let observer = Arc::clone(&self.observer);
        notify(observer.as_ref(), "Starting DICOM import/export");

        let result = self.run_phases(source, destination);

        notify(observer.as_ref(), "Phase 3: cleaning up temporary cache");
        self.cleanup();

        match &result {
            Ok(summary) if summary.cancelled => notify(observer.as_ref(), "Operation cancelled"),
            Ok(_) => notify(observer.as_ref(), "Operation completed successfully"),
            Err(e) => notify(observer.as_ref(), &format!("ERROR: {}", e)),
        }
        result
    }

    fn run_phases(
        &mut self,
        source: &Path,
        destination: &DestinationConfig,
    ) -> Result<TransferSummary> {
        notify(self.observer.as_ref(), "Phase 1: caching DICOM files from source");
        let cache = self.cache(source)?;

        if self.cancel.is_cancelled() {
            return Ok(TransferSummary {
                cache,
                export: None,
                cancelled: true,
            });
        }

        if cache.cached == 0 {
            notify(self.observer.as_ref(), "No DICOM files found in source directory");
            return Ok(TransferSummary {
                cache,
                export: None,
                cancelled: false,
            });
        }

        notify(
            self.observer.as_ref(),
            &format!("Phase 2: exporting to {}", destination.kind()),
        );
        let export = match destination {
            DestinationConfig::Folder { path, prefix } => self.export_to_folder(path, prefix)?,
            DestinationConfig::Pacs { local_aet, remote } => {
                self.export_to_remote(local_aet, remote)?
            }
        };

        Ok(TransferSummary {
            cache,
            export: Some(export),
            cancelled: self.cancel.is_cancelled(),
        })
    }
}

/// Run a configured transfer on the blocking thread pool.
///
/// Progress and log lines arrive on the returned receiver; the channel closes
/// when the worker finishes.
pub fn spawn_transfer(
    config: Config,
    cancel: CancellationToken,
) -> (JoinHandle<Result<TransferSummary>>, UnboundedReceiver<TransferEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let observer: Arc<dyn TransferObserver> = Arc::new(ChannelObserver::new(tx));

    let handle = tokio::task::spawn_blocking(move || {
        let mut orchestrator =
            TransferOrchestrator::new(&config.cache, observer)?.with_cancellation(cancel);
        orchestrator.run(&config.source.path, &config.destination)
    });

    (handle, rx)
}

impl From<tokio::task::JoinError> for TransferError {
    fn from(err: tokio::task::JoinError) -> Self {
        TransferError::Join(err.to_string())
    }
}
