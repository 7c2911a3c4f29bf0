//! Error types for source staging

use std::fmt::Display;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::safety::ArchiveFormat;
use crate::util::PathError;

/// Result type for staging operations
pub type StageResult<T> = Result<T, StageError>;

/// Why an archive was judged to be a decompression bomb
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BombKind {
    /// Entry count budget exceeded
    #[error("too many entries in this archive, can lead to inodes exhaustion of the system")]
    TooManyEntries,

    /// Cumulative uncompressed size budget exceeded
    #[error("the uncompressed data size is too much for the application resource capacity")]
    UncompressedTooLarge,

    /// A single entry expands far beyond its compressed size
    #[error(
        "ratio between compressed and uncompressed data is highly suspicious, looks like a Zip Bomb Attack"
    )]
    SuspiciousRatio,
}

/// Errors that can occur while vetting and staging a source
#[derive(Error, Debug)]
pub enum StageError {
    /// The file is not a structurally valid instance of its declared format
    #[error("{} is not a valid {}.", path.display(), format.describe())]
    MalformedArchive {
        path: PathBuf,
        format: ArchiveFormat,
        reason: String,
    },

    /// Expanding the archive would exhaust disk or inode budgets
    #[error(transparent)]
    BombSuspected(#[from] BombKind),

    /// The output root already holds files from somewhere else
    #[error("Output directory is not empty: {}", path.display())]
    DirtyOutput { path: PathBuf },

    /// The source is neither an archive, a git URL nor a directory
    #[error("{descriptor} is not a supported archive, git URL or directory")]
    InvalidSource { descriptor: String },

    /// The clone collaborator could not materialize the repository
    #[error("Failed to clone {url}: {message}")]
    CloneFailed { url: String, message: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Directory walk failed
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    /// An archive entry or report path tried to leave its root
    #[error("Path security error: {0}")]
    PathSecurity(#[from] PathError),
}

impl StageError {
    pub(crate) fn malformed(path: &Path, format: ArchiveFormat, reason: impl Display) -> Self {
        Self::MalformedArchive {
            path: path.to_path_buf(),
            format,
            reason: reason.to_string(),
        }
    }

    /// Get the error code for CLI output and logs
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedArchive { .. } => "MALFORMED_ARCHIVE",
            Self::BombSuspected(_) => "BOMB_SUSPECTED",
            Self::DirtyOutput { .. } => "DIRTY_OUTPUT",
            Self::InvalidSource { .. } => "INVALID_SOURCE",
            Self::CloneFailed { .. } => "CLONE_FAILED",
            Self::Io(_) | Self::Walk(_) => "IO_ERROR",
            Self::PathSecurity(_) => "PATH_SECURITY",
        }
    }

    /// Why the archive was judged malformed, if it was
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::MalformedArchive { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// The bomb classification, if this is one
    #[must_use]
    pub fn bomb_kind(&self) -> Option<BombKind> {
        match self {
            Self::BombSuspected(kind) => Some(*kind),
            _ => None,
        }
    }
}
