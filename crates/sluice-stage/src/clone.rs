//! Remote repository cloning

use crate::error::{StageError, StageResult};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::info;

/// Materializes a remote repository as a working tree
pub trait Cloner {
    /// Clone `url` into `destination`
    ///
    /// # Errors
    /// Returns [`StageError::CloneFailed`] if no working tree was produced
    fn clone_repository(&self, url: &str, destination: &Path) -> StageResult<()>;
}

/// Clones with the `git` executable
#[derive(Debug, Clone)]
pub struct GitCloner {
    program: PathBuf,
}

impl Default for GitCloner {
    fn default() -> Self {
        Self {
            program: PathBuf::from("git"),
        }
    }
}

impl GitCloner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific git executable
    #[must_use]
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    /// A git command that ignores system and global configuration, so a
    /// hostile config cannot inject hooks or rewrite URLs
    fn secure_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.env("GIT_CONFIG_NOSYSTEM", "1");
        cmd.env("GIT_CONFIG_GLOBAL", "/dev/null");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        cmd.env("GIT_ADVICE", "0");
        cmd
    }
}

impl Cloner for GitCloner {
    fn clone_repository(&self, url: &str, destination: &Path) -> StageResult<()> {
        info!(url, dest = %destination.display(), "cloning repository");

        let output = self
            .secure_command()
            .args(["clone", "--quiet", "--", url])
            .arg(destination)
            .output()
            .map_err(|e| StageError::CloneFailed {
                url: url.to_string(),
                message: format!("cannot run {}: {e}", self.program.display()),
            })?;

        if !output.status.success() {
            return Err(StageError::CloneFailed {
                url: url.to_string(),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}
