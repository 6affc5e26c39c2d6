//! Destinations for staged files.

pub mod folder;
pub mod pacs;

pub use folder::FolderExporter;
pub use pacs::PacsExporter;

/// Result of one export pass.
///
/// Exporters never fail because of individual items; those are counted in
/// `attempted` but not in `succeeded`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    pub succeeded: usize,
    pub attempted: usize,
}

impl TransferOutcome {
    pub fn new(succeeded: usize, attempted: usize) -> Self {
        Self {
            succeeded,
            attempted,
        }
    }

    pub fn failed(&self) -> usize {
        self.attempted - self.succeeded
    }
}

/// Outcome of sending or copying one staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ItemResult {
    Done,
    Failed(String),
}
