//! Discovery and local staging of DICOM files.

pub mod session;
pub mod signature;
pub mod stager;

pub use session::{CacheSession, SequentialNaming, StagedFile};
pub use signature::is_valid_container;
pub use stager::{CacheOutcome, CacheStager};
