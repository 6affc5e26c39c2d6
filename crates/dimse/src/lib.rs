//! DIMSE (DICOM Message Service Element) store client
//!
//! This crate provides the Service Class User side of the DICOM storage
//! service: association negotiation against a remote archive, one C-STORE
//! request per dataset, status evaluation and explicit release.
//!
//! # Features
//! - Fixed storage capability list proposed on every association
//! - Per-request status classification against the single success code
//! - [`Connector`]/[`Association`] seams so callers can drive the protocol
//!   against a fake remote
//! - Read-only inspection of a file's metadata and tags

pub mod config;
pub mod error;
pub mod inspect;
pub mod scu;
pub mod types;

// Re-export commonly used types
pub use config::{DimseConfig, RemoteNode};
pub use error::{DimseError, Result};
pub use inspect::{inspect_file, Inspection, TagEntry};
pub use scu::{Association, Connector, NegotiatedContext, StoreScu, UlAssociation};
pub use types::{DatasetMetadata, StoreRequest, StoreStatus, STORAGE_SOP_CLASSES};

/// Default DICOM port (non-TLS)
pub const DEFAULT_DIMSE_PORT: u16 = 11112;
