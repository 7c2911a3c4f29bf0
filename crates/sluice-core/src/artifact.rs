//! Artifacts reported by the analyzer

use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One file the analyzer examined
///
/// Whether it is excluded is never stored here; that is decided by
/// membership in the run's exclusion set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceArtifact {
    /// Path relative to the analyzer's working directory
    pub filename: String,
    pub dir: String,
    /// Kind assigned by the analyzer, empty when it could not tell
    pub kind: String,
    pub base_kind: String,
    pub name: String,
    pub role: String,
    pub parent: Option<String>,
    /// Processing error text
    pub exc: Option<String>,
    pub stop_processing: bool,
    /// The analyzer rewrote the file (autofix)
    pub updated: bool,
}

impl SourceArtifact {
    #[must_use]
    pub fn new(filename: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Whether the analyzer recognised the file
    #[must_use]
    pub fn is_identified(&self) -> bool {
        !self.kind.is_empty()
    }
}

/// Contents of `lint-result.json` / `lint-result-2.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintResultFile {
    pub files: Vec<SourceArtifact>,
    /// Paths handed to the second pass as excludes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded: Option<Vec<String>>,
}

impl LintResultFile {
    pub fn read(path: &Path) -> CoreResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn write(&self, path: &Path) -> CoreResult<()> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactListing {
    Bare(Vec<SourceArtifact>),
    Wrapped { files: Vec<SourceArtifact> },
}

/// Parse the artifact list an analyzer printed: either `{"files": [...]}`
/// or a bare array
pub fn parse_artifact_listing(text: &str) -> Result<Vec<SourceArtifact>, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(match serde_json::from_str(text)? {
        ArtifactListing::Bare(files) | ArtifactListing::Wrapped { files } => files,
    })
}
