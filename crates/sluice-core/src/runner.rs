//! One analyzer pass with its persisted output

use crate::analyzer::{AnalysisRequest, Analyzer};
use crate::artifact::{LintResultFile, SourceArtifact};
use crate::config::LintOptions;
use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use tracing::info;

/// Which of the two analyzer passes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    First,
    Second,
}

impl Pass {
    #[must_use]
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }

    #[must_use]
    pub fn sarif_file_name(self) -> &'static str {
        match self {
            Self::First => "sarif.json",
            Self::Second => "sarif-2.json",
        }
    }

    #[must_use]
    pub fn lint_result_file_name(self) -> &'static str {
        match self {
            Self::First => "lint-result.json",
            Self::Second => "lint-result-2.json",
        }
    }
}

/// Result of one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassOutcome {
    pub pass: Pass,
    pub artifacts: Vec<SourceArtifact>,
    pub exit_status: i32,
    /// Findings report written by the analyzer
    pub sarif_path: PathBuf,
    /// Artifact list written by the runner
    pub lint_result_path: PathBuf,
    /// Paths this pass was told to skip
    pub excluded: Vec<String>,
}

/// Invokes the analyzer over a working directory and records each pass under
/// the metadata directory
pub struct AnalysisRunner<'a> {
    analyzer: &'a dyn Analyzer,
    options: &'a LintOptions,
    working_dir: PathBuf,
    metadata_dir: PathBuf,
}

impl<'a> AnalysisRunner<'a> {
    pub fn new(
        analyzer: &'a dyn Analyzer,
        options: &'a LintOptions,
        working_dir: &Path,
        metadata_dir: &Path,
    ) -> Self {
        Self {
            analyzer,
            options,
            working_dir: working_dir.to_path_buf(),
            metadata_dir: metadata_dir.to_path_buf(),
        }
    }

    /// Run one pass
    ///
    /// The second pass's lint result also records `exclude` under
    /// `"excluded"`.
    ///
    /// # Errors
    /// Returns an error if the analyzer cannot be run or the lint result
    /// cannot be written
    pub fn run(&self, pass: Pass, exclude: &[String]) -> CoreResult<PassOutcome> {
        let sarif_path = self.metadata_dir.join(pass.sarif_file_name());
        let lint_result_path = self.metadata_dir.join(pass.lint_result_file_name());

        info!(
            pass = pass.number(),
            analyzer = %self.analyzer.name(),
            excluded = exclude.len(),
            "running analyzer"
        );

        let run = self.analyzer.analyze(&AnalysisRequest {
            working_dir: &self.working_dir,
            sarif_path: &sarif_path,
            exclude_paths: exclude,
            options: self.options,
        })?;

        let record = LintResultFile {
            files: run.artifacts.clone(),
            excluded: match pass {
                Pass::First => None,
                Pass::Second => Some(exclude.to_vec()),
            },
        };
        record.write(&lint_result_path)?;

        info!(
            pass = pass.number(),
            exit_status = run.exit_status,
            artifacts = run.artifacts.len(),
            "analyzer finished"
        );

        Ok(PassOutcome {
            pass,
            artifacts: run.artifacts,
            exit_status: run.exit_status,
            sarif_path,
            lint_result_path,
            excluded: exclude.to_vec(),
        })
    }
}
