//! Sends staged files to a remote archive with C-STORE.

use dimse::{Association, Connector, DimseConfig, RemoteNode, StoreRequest, StoreScu, StoreStatus};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::{ItemResult, TransferOutcome};
use crate::cache::StagedFile;
use crate::pipeline::observer::{notify, notify_failure, TransferObserver};

/// Drives one association per export: negotiate, store each file, release.
pub struct PacsExporter<'a, C> {
    connector: C,
    observer: &'a dyn TransferObserver,
    cancel: CancellationToken,
}

impl<'a> PacsExporter<'a, StoreScu> {
    /// Exporter that associates as `local_aet` over TCP
    pub fn for_local_aet(local_aet: &str, observer: &'a dyn TransferObserver) -> Self {
        Self::new(StoreScu::new(DimseConfig::with_local_aet(local_aet)), observer)
    }
}

impl<'a, C: Connector> PacsExporter<'a, C> {
    pub fn new(connector: C, observer: &'a dyn TransferObserver) -> Self {
        Self {
            connector,
            observer,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop at the next file boundary once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Send every staged file to `node` over a single association.
    ///
    /// A failed negotiation ends the call with nothing attempted. After a
    /// successful negotiation each file is independent: a rejected or
    /// unreadable file is logged and the next one is sent. The association
    /// is released on every path out of this function.
    #[tracing::instrument(skip(self, node, staged), fields(remote = %node, files = staged.len()))]
    pub fn export(&self, node: &RemoteNode, staged: &[StagedFile]) -> TransferOutcome {
        let total = staged.len();
        if total == 0 {
            return TransferOutcome::default();
        }

        notify(self.observer, &format!("Connecting to PACS {}", node));
        let association = match self.connector.associate(node) {
            Ok(association) => association,
            Err(e) => {
                notify_failure(
                    self.observer,
                    &format!("Association with {} failed: {}", node, e),
                );
                return TransferOutcome::default();
            }
        };
        let mut session = Established {
            association,
            peer: node.to_string(),
        };

        let mut sent = 0;
        let mut attempted = 0;
        for (i, file) in staged.iter().enumerate() {
            if self.cancel.is_cancelled() {
                notify_failure(
                    self.observer,
                    &format!("PACS export cancelled after {} of {} files", i, total),
                );
                break;
            }

            attempted += 1;
            match send_one(&mut session.association, file) {
                ItemResult::Done => sent += 1,
                ItemResult::Failed(reason) => notify_failure(
                    self.observer,
                    &format!("Failed to send {}: {}", file.path.display(), reason),
                ),
            }
            self.observer.progress(i + 1, total);
        }

        session.release(self.observer);
        notify(
            self.observer,
            &format!("Sent {} of {} files to {}", sent, total, node),
        );
        TransferOutcome::new(sent, attempted)
    }
}

fn send_one<A: Association>(association: &mut A, file: &StagedFile) -> ItemResult {
    let request = match StoreRequest::from_file(&file.path) {
        Ok(request) => request,
        Err(e) => return ItemResult::Failed(e.to_string()),
    };

    let meta = &request.metadata;
    debug!(
        patient_id = meta.patient_id.as_deref().unwrap_or("-"),
        modality = meta.modality.as_deref().unwrap_or("-"),
        sop_class = dimse::types::storage_class_name(&request.sop_class_uid)
            .unwrap_or(request.sop_class_uid.as_str()),
        sop_instance = %request.sop_instance_uid,
        "Sending {}",
        file.path.display()
    );

    match association.store(&request) {
        Ok(StoreStatus::Success) => ItemResult::Done,
        Ok(status) => ItemResult::Failed(format!("remote returned status {}", status)),
        Err(e) => ItemResult::Failed(e.to_string()),
    }
}

/// Holds an established association and releases it when dropped, so an
/// early return or panic during the transfer still ends the session.
struct Established<A: Association> {
    association: A,
    peer: String,
}

impl<A: Association> Established<A> {
    fn release(&mut self, observer: &dyn TransferObserver) {
        match self.association.release() {
            Ok(()) => debug!("Association with {} released", self.peer),
            Err(e) => notify_failure(
                observer,
                &format!("Release of association with {} failed: {}", self.peer, e),
            ),
        }
    }
}

impl<A: Association> Drop for Established<A> {
    fn drop(&mut self) {
        // no-op when already released
        let _ = self.association.release();
    }
}
