//! The transform step that runs after linting

use crate::config::SourceInfo;
use crate::error::{CoreResult, PipelineError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// Input to one transform run
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    /// Staged project tree, with excluded files already renamed
    pub target_dir: &'a Path,
    /// First-pass lint result, absent when lint was skipped
    pub lint_result: Option<&'a Path>,
    /// Where the transformer writes its output
    pub output_dir: &'a Path,
    pub source: &'a SourceInfo,
}

/// Downstream collaborator fed with the vetted tree
pub trait Transformer {
    fn transform(&self, request: &TransformRequest<'_>) -> CoreResult<()>;
}

/// Runs an external transformer executable
#[derive(Debug, Clone)]
pub struct CommandTransformer {
    program: PathBuf,
}

impl CommandTransformer {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    #[must_use]
    pub fn arguments(&self, request: &TransformRequest<'_>) -> Vec<OsString> {
        let source = request.source;
        let mut args: Vec<OsString> = vec![
            "--target-dir".into(),
            request.target_dir.into(),
            "--output-dir".into(),
            request.output_dir.into(),
        ];
        if let Some(lint_result) = request.lint_result {
            args.push("--lint-result".into());
            args.push(lint_result.into());
        }
        for (flag, value) in [
            ("--repo-name", &source.repo_name),
            ("--repo-url", &source.repo_url),
            ("--license", &source.license),
            ("--description", &source.description),
        ] {
            args.push(flag.into());
            args.push(value.into());
        }
        args
    }
}

impl Transformer for CommandTransformer {
    fn transform(&self, request: &TransformRequest<'_>) -> CoreResult<()> {
        let program = self.program.display().to_string();
        let args = self.arguments(request);
        debug!(%program, ?args, "running transformer");

        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .status()
            .map_err(|e| PipelineError::Transform {
                program: program.clone(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(PipelineError::Transform {
                program,
                message: format!("exited with {status}"),
            });
        }

        info!(output = %request.output_dir.display(), "transform finished");
        Ok(())
    }
}
