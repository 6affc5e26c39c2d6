//! Error types for the transfer pipeline

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, TransferError>;

/// Errors that abort a whole pass.
///
/// Per-file problems never surface here; they are logged and counted by the
/// pass that hit them.
#[derive(Error, Debug)]
pub enum TransferError {
    /// The operation was asked for in a state where it cannot do anything
    #[error("Operation denied: {0}")]
    Precondition(String),

    #[error("Source directory {path} is unreadable: {source}")]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Staging error: {0}")]
    Staging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Dimse(#[from] dimse::DimseError),

    #[error("Transfer worker failed: {0}")]
    Join(String),
}

impl TransferError {
    /// Create a new precondition violation
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
