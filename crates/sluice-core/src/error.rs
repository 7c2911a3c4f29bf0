//! Error types for the lint pipeline

use sluice_stage::util::PathError;
use sluice_stage::StageError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for pipeline operations
pub type CoreResult<T> = Result<T, PipelineError>;

/// Errors that can end a run
///
/// Structural findings are not in here: they are ordinary data that feed the
/// exclusion set, and a run that excludes files still succeeds.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Staging the source failed
    #[error(transparent)]
    Stage(#[from] StageError),

    /// No-exclude mode and the first analyzer pass did not come back clean
    #[error("One or more lint errors were found by the analyzer (exit status {exit_status})")]
    FatalFinding { exit_status: i32 },

    /// The analyzer could not be run or produced unusable output
    #[error("Analyzer {program} failed: {message}")]
    Analyzer { program: String, message: String },

    /// The findings report could not be read
    #[error("Cannot read findings report {}: {message}", path.display())]
    FindingsReport { path: PathBuf, message: String },

    /// The transform step failed
    #[error("Transformer {program} failed: {message}")]
    Transform { program: String, message: String },

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error occurred
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A path named by the analyzer tried to leave the working directory
    #[error("Path security error: {0}")]
    PathSecurity(#[from] PathError),
}

impl PipelineError {
    /// Get the error code for CLI output and logs
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Stage(e) => e.code(),
            Self::FatalFinding { .. } => "FATAL_FINDING",
            Self::Analyzer { .. } => "ANALYZER_FAILED",
            Self::FindingsReport { .. } => "FINDINGS_REPORT",
            Self::Transform { .. } => "TRANSFORM_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "PARSE_ERROR",
            Self::PathSecurity(_) => "PATH_SECURITY",
        }
    }
}
