//! Deciding which artifacts leave the pipeline

use crate::error::CoreResult;
use crate::sarif::{Level, SarifLog, STRUCTURAL_RULE_PREFIX};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::debug;

/// Sorted set of excluded artifact paths
///
/// Paths only ever join the set during a run; there is no way to take one
/// back out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExclusionSet(BTreeSet<String>);

impl ExclusionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a path, returning whether it was new
    pub fn insert(&mut self, path: impl Into<String>) -> bool {
        self.0.insert(path.into())
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.0.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl Extend<String> for ExclusionSet {
    fn extend<I: IntoIterator<Item = String>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl FromIterator<String> for ExclusionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Selects artifact paths to exclude from a findings report
#[derive(Debug, Clone)]
pub struct ExclusionPlanner {
    structural_prefix: String,
}

impl Default for ExclusionPlanner {
    fn default() -> Self {
        Self {
            structural_prefix: STRUCTURAL_RULE_PREFIX.to_string(),
        }
    }
}

impl ExclusionPlanner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use another rule id prefix for structural findings
    #[must_use]
    pub fn with_structural_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.structural_prefix = prefix.into();
        self
    }

    /// Read the report at `report_path` and plan from it
    ///
    /// # Errors
    /// Returns an error if the report cannot be read or parsed
    pub fn plan(&self, report_path: &Path, structural_only: bool) -> CoreResult<Vec<String>> {
        let log = SarifLog::read(report_path)?;
        let paths = self.select(&log, structural_only);
        debug!(
            report = %report_path.display(),
            structural_only,
            count = paths.len(),
            "exclusions planned"
        );
        Ok(paths)
    }

    /// Sorted, unique locations of every selected result
    ///
    /// With `structural_only`, a result is selected when its rule id carries
    /// the structural prefix. Otherwise every error (or level-less) result is.
    #[must_use]
    pub fn select(&self, log: &SarifLog, structural_only: bool) -> Vec<String> {
        let selected: BTreeSet<String> = log
            .findings()
            .into_iter()
            .filter(|f| {
                if structural_only {
                    f.has_rule_prefix(&self.structural_prefix)
                } else {
                    f.level == Level::Error
                }
            })
            .flat_map(|f| f.locations.into_iter().map(|l| l.uri))
            .collect();
        selected.into_iter().collect()
    }
}
