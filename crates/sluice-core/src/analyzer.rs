//! The analyzer seam
//!
//! The analyzer is a black box: it gets a working directory, a path to write
//! its SARIF findings to and a set of options, and hands back the artifacts it
//! looked at plus an exit status.

use crate::artifact::{parse_artifact_listing, SourceArtifact};
use crate::config::LintOptions;
use crate::error::{CoreResult, PipelineError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Executable used when none is configured
pub const DEFAULT_ANALYZER: &str = "ansible-lint";

/// One analyzer invocation
#[derive(Debug, Clone, Copy)]
pub struct AnalysisRequest<'a> {
    /// Directory the analyzer runs in; artifact paths are relative to it
    pub working_dir: &'a Path,
    /// Where the SARIF findings report must be written
    pub sarif_path: &'a Path,
    /// Paths, relative to `working_dir`, the analyzer must skip
    pub exclude_paths: &'a [String],
    pub options: &'a LintOptions,
}

/// What an invocation returned
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnalysisRun {
    pub artifacts: Vec<SourceArtifact>,
    /// 0 when clean, anything else for findings or failure
    pub exit_status: i32,
}

/// Static analysis collaborator
pub trait Analyzer {
    /// Run the analysis
    ///
    /// Findings are not errors. An `Err` means the analyzer could not be run.
    fn analyze(&self, request: &AnalysisRequest<'_>) -> CoreResult<AnalysisRun>;

    /// Whether `exclude_paths` is honoured exactly, so excluded files need
    /// not be renamed before the second pass
    fn honors_exact_excludes(&self) -> bool {
        false
    }

    /// Name used in logs and errors
    fn name(&self) -> String {
        "analyzer".to_string()
    }
}

/// Runs an external analyzer executable
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    program: PathBuf,
    exact_excludes: bool,
}

impl Default for CommandAnalyzer {
    fn default() -> Self {
        Self {
            program: PathBuf::from(DEFAULT_ANALYZER),
            exact_excludes: false,
        }
    }
}

impl CommandAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// Declare that the executable's `--exclude` is exact
    #[must_use]
    pub fn with_exact_excludes(mut self, exact: bool) -> Self {
        self.exact_excludes = exact;
        self
    }

    /// Command-line arguments for one invocation
    #[must_use]
    pub fn arguments(&self, request: &AnalysisRequest<'_>) -> Vec<OsString> {
        let options = request.options;
        let mut args: Vec<OsString> = vec!["--sarif-file".into(), request.sarif_path.into()];

        if !request.exclude_paths.is_empty() {
            args.push("--exclude".into());
            args.extend(request.exclude_paths.iter().map(OsString::from));
        }
        args.push(format!("--fix={}", options.write_list()).into());
        if options.verbose {
            args.push("-v".into());
        }
        if let Some(config_file) = &options.config_file {
            args.push("--config-file".into());
            args.push(config_file.into());
        }
        if let Some(profile) = options.profile {
            args.push("--profile".into());
            args.push(profile.as_str().into());
        }
        args
    }
}

impl Analyzer for CommandAnalyzer {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> CoreResult<AnalysisRun> {
        let args = self.arguments(request);
        debug!(program = %self.program.display(), ?args, "running analyzer");

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(request.working_dir)
            // Skip checks that need collections or modules to be installed.
            .env("ANSIBLE_LINT_NODEPS", "1")
            .stdin(Stdio::null())
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| PipelineError::Analyzer {
                program: self.name(),
                message: e.to_string(),
            })?;

        // Killed by a signal.
        let exit_status = output.status.code().unwrap_or(-1);

        let stdout = String::from_utf8_lossy(&output.stdout);
        let artifacts = parse_artifact_listing(&stdout).unwrap_or_else(|e| {
            warn!(program = %self.program.display(), error = %e, "analyzer printed no artifact list");
            Vec::new()
        });

        Ok(AnalysisRun {
            artifacts,
            exit_status,
        })
    }

    fn honors_exact_excludes(&self) -> bool {
        self.exact_excludes
    }

    fn name(&self) -> String {
        self.program.display().to_string()
    }
}
