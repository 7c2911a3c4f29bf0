//! Decompression-bomb detection
//!
//! Archives are streamed once, without writing anything, before extraction
//! is allowed to begin. Declared sizes are never trusted: every budget is
//! enforced against the bytes actually produced by the decoder, and checked
//! while streaming so a bomb is abandoned long before it is fully expanded.

mod tarball;
mod zipfile;

pub(crate) use self::tarball::open_tar;

use crate::error::{BombKind, StageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bytes read from a decoder per step
pub const CHUNK_SIZE: usize = 1024;

/// Limits an archive must stay within to be extracted
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyBudget {
    /// Maximum number of entries (inodes) an archive may create
    pub max_entries: u64,
    /// Maximum cumulative uncompressed size in bytes
    pub max_total_uncompressed_bytes: u64,
    /// Maximum uncompressed/compressed ratio of a single zip entry
    pub max_compression_ratio: f64,
}

impl Default for SafetyBudget {
    fn default() -> Self {
        Self {
            max_entries: 10_000,
            max_total_uncompressed_bytes: 1_000_000_000,
            max_compression_ratio: 100.0,
        }
    }
}

/// Compression layered over a tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TarCompression {
    None,
    Gzip,
    Bzip2,
    Xz,
}

/// Archive formats sluice knows how to vet and expand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArchiveFormat {
    Zip,
    Tar(TarCompression),
}

const TAR_SUFFIXES: [(&str, TarCompression); 7] = [
    (".tar", TarCompression::None),
    (".tar.gz", TarCompression::Gzip),
    (".tgz", TarCompression::Gzip),
    (".tar.bz2", TarCompression::Bzip2),
    (".tbz2", TarCompression::Bzip2),
    (".tar.xz", TarCompression::Xz),
    (".txz", TarCompression::Xz),
];

impl ArchiveFormat {
    /// Detect the format from a source name's suffix
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name.ends_with(".zip") {
            return Some(Self::Zip);
        }
        TAR_SUFFIXES
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map(|(_, compression)| Self::Tar(*compression))
    }

    /// Human-readable format name used in error messages
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Zip => "zip file",
            Self::Tar(_) => "tar archive file",
        }
    }
}

/// An archive on disk together with the format it claims to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    pub path: PathBuf,
    pub format: ArchiveFormat,
}

impl ArchiveDescriptor {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, format: ArchiveFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    /// Build a descriptor when the path carries a supported archive suffix
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        ArchiveFormat::from_name(&path.to_string_lossy()).map(|format| Self::new(path, format))
    }
}

/// Running totals for one validation pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionCounters {
    /// Entries seen so far
    pub entries: u64,
    /// Uncompressed bytes streamed so far
    pub total_bytes: u64,
}

impl ExtractionCounters {
    /// Count one more entry
    ///
    /// # Errors
    /// Returns [`BombKind::TooManyEntries`] once the entry budget is exceeded
    pub fn record_entry(&mut self, budget: &SafetyBudget) -> Result<(), BombKind> {
        self.entries += 1;
        if self.entries > budget.max_entries {
            return Err(BombKind::TooManyEntries);
        }
        Ok(())
    }

    /// Count a chunk of uncompressed bytes
    ///
    /// # Errors
    /// Returns [`BombKind::UncompressedTooLarge`] once the size budget is exceeded
    pub fn record_bytes(&mut self, bytes: u64, budget: &SafetyBudget) -> Result<(), BombKind> {
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        if self.total_bytes > budget.max_total_uncompressed_bytes {
            return Err(BombKind::UncompressedTooLarge);
        }
        Ok(())
    }
}

/// Streams an archive against a [`SafetyBudget`] without extracting it
#[derive(Debug, Clone, Default)]
pub struct ArchiveSafetyValidator {
    budget: SafetyBudget,
}

impl ArchiveSafetyValidator {
    #[must_use]
    pub fn new(budget: SafetyBudget) -> Self {
        Self { budget }
    }

    #[must_use]
    pub fn budget(&self) -> &SafetyBudget {
        &self.budget
    }

    /// Make sure expanding the archive is safe
    ///
    /// # Errors
    /// Returns [`StageError::MalformedArchive`](crate::StageError::MalformedArchive)
    /// if the file is not a valid instance of its format, or
    /// [`StageError::BombSuspected`](crate::StageError::BombSuspected) if any
    /// budget is exceeded
    pub fn validate(&self, archive: &ArchiveDescriptor) -> StageResult<()> {
        debug!(path = %archive.path.display(), format = ?archive.format, "validating archive");

        let outcome = match archive.format {
            ArchiveFormat::Zip => zipfile::validate_zip(&archive.path, &self.budget),
            ArchiveFormat::Tar(compression) => {
                tarball::validate_tar(&archive.path, compression, &self.budget)
            }
        };

        match &outcome {
            Ok(counters) => debug!(
                entries = counters.entries,
                bytes = counters.total_bytes,
                "archive is within budget"
            ),
            Err(e) => warn!(
                path = %archive.path.display(),
                code = e.code(),
                reason = e.reason().unwrap_or_default(),
                "{e}"
            ),
        }

        outcome.map(|_| ())
    }
}
