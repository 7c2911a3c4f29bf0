//! sluice stage - vetting and staging of content sources
//!
//! This crate turns a source descriptor (zip/tar archive, git URL or local
//! directory) into a writable repository tree. Archives are streamed against
//! a [`SafetyBudget`] before a single byte is extracted.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::cast_precision_loss
)]

pub mod clone;
pub mod error;
pub mod extract;
pub mod safety;
pub mod source;
pub mod stage;
pub mod util;

pub use clone::{Cloner, GitCloner};
pub use error::{BombKind, StageError, StageResult};
pub use safety::{
    ArchiveDescriptor, ArchiveFormat, ArchiveSafetyValidator, ExtractionCounters, SafetyBudget,
    TarCompression,
};
pub use source::{Provenance, SourceKind};
pub use stage::{SourceStager, StagedSource, METADATA_DIR, REPOSITORY_DIR};
