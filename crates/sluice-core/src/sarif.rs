//! The subset of SARIF 2.1 the pipeline reads
//!
//! Only `runs[].results[]` matter: rule id, level, message and the physical
//! locations each result points at.

use crate::error::{CoreResult, PipelineError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Rule id prefix of findings that mean a file could not be parsed at all
pub const STRUCTURAL_RULE_PREFIX: &str = "syntax-check";

/// Result severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
    Note,
    None,
}

impl Level {
    pub const ALL: [Self; 4] = [Self::Error, Self::Warning, Self::Note, Self::None];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Note => "note",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SarifLog {
    #[serde(default)]
    pub runs: Vec<SarifRun>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SarifRun {
    #[serde(default)]
    pub results: Vec<SarifResult>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifResult {
    #[serde(default)]
    pub rule_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
    #[serde(default)]
    pub message: SarifMessage,
    #[serde(default)]
    pub locations: Vec<SarifLocation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SarifMessage {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SarifLocation {
    pub physical_location: PhysicalLocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalLocation {
    pub artifact_location: ArtifactLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Region>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactLocation {
    pub uri: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub start_line: Option<u64>,
    pub start_column: Option<u64>,
}

impl SarifLog {
    /// Load a findings report from disk
    ///
    /// # Errors
    /// Returns [`PipelineError::FindingsReport`] if the file is missing or
    /// not valid SARIF
    pub fn read(path: &Path) -> CoreResult<Self> {
        let report_error = |message: String| PipelineError::FindingsReport {
            path: path.to_path_buf(),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| report_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| report_error(e.to_string()))
    }

    /// Every result of every run, flattened
    #[must_use]
    pub fn findings(&self) -> Vec<Finding> {
        self.runs
            .iter()
            .flat_map(|run| run.results.iter())
            .map(Finding::from)
            .collect()
    }
}

/// One issue reported by the analyzer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub rule_id: String,
    /// A result without a level counts as an error
    pub level: Level,
    pub message: String,
    pub locations: Vec<FindingLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FindingLocation {
    pub uri: String,
    pub line: Option<u64>,
    pub column: Option<u64>,
}

impl Finding {
    /// Whether the rule id belongs to the family starting with `prefix`,
    /// e.g. [`STRUCTURAL_RULE_PREFIX`] for files that could not be parsed
    #[must_use]
    pub fn has_rule_prefix(&self, prefix: &str) -> bool {
        self.rule_id.starts_with(prefix)
    }
}

impl From<&SarifResult> for Finding {
    fn from(result: &SarifResult) -> Self {
        Self {
            rule_id: result.rule_id.clone(),
            level: result.level.unwrap_or(Level::Error),
            message: result.message.text.clone(),
            locations: result
                .locations
                .iter()
                .map(|l| {
                    let region = l.physical_location.region.as_ref();
                    FindingLocation {
                        uri: l.physical_location.artifact_location.uri.clone(),
                        line: region.and_then(|r| r.start_line),
                        column: region.and_then(|r| r.start_column),
                    }
                })
                .collect(),
        }
    }
}
