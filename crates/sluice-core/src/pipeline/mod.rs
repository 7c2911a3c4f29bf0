//! The two-pass exclusion pipeline
//!
//! ```text
//! Staged -> FirstPass -> Excluding -> SecondPass? -> Finalized
//! ```
//!
//! The first pass runs over everything. Files it could not parse at all are
//! excluded and the second pass runs over the rest. The final inventory
//! merges both passes.

mod marking;

pub use marking::{mark_excluded, EXCLUDED_SUFFIX};

use crate::analyzer::Analyzer;
use crate::artifact::SourceArtifact;
use crate::config::PipelineConfig;
use crate::error::CoreResult;
use crate::exclusion::{ExclusionPlanner, ExclusionSet};
use crate::runner::{AnalysisRunner, Pass, PassOutcome};
use sluice_stage::StagedSource;
use std::collections::HashSet;
use tracing::{info, warn};

/// States the pipeline moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Staged,
    FirstPass,
    Excluding,
    SecondPass,
    Finalized,
}

/// How the pipeline ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Success,
    /// No-exclude mode and the first pass exited non-zero
    FatalFinding { exit_status: i32 },
}

/// Everything a run of the pipeline produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Absent when lint was skipped
    pub first: Option<PassOutcome>,
    pub second: Option<PassOutcome>,
    /// The set handed to the second pass
    pub initially_excluded: Vec<String>,
    /// Every path excluded by either pass
    pub excluded: ExclusionSet,
    /// Merged artifact inventory
    pub artifacts: Vec<SourceArtifact>,
    /// States visited, in order
    pub trace: Vec<PipelineState>,
    pub status: PipelineStatus,
}

impl PipelineResult {
    fn new() -> Self {
        Self {
            first: None,
            second: None,
            initially_excluded: Vec::new(),
            excluded: ExclusionSet::new(),
            artifacts: Vec::new(),
            trace: vec![PipelineState::Staged],
            status: PipelineStatus::Success,
        }
    }

    fn enter(&mut self, state: PipelineState) {
        self.trace.push(state);
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == PipelineStatus::Success
    }
}

/// Drives the analyzer through both passes over a staged source
pub struct Orchestrator<'a> {
    analyzer: &'a dyn Analyzer,
    config: &'a PipelineConfig,
    planner: ExclusionPlanner,
}

impl<'a> Orchestrator<'a> {
    pub fn new(analyzer: &'a dyn Analyzer, config: &'a PipelineConfig) -> Self {
        Self {
            analyzer,
            config,
            planner: ExclusionPlanner::default(),
        }
    }

    #[must_use]
    pub fn with_planner(mut self, planner: ExclusionPlanner) -> Self {
        self.planner = planner;
        self
    }

    /// Run the pipeline
    ///
    /// A failing first pass in no-exclude mode is reported through
    /// [`PipelineResult::status`] so the caller can still write a report.
    ///
    /// # Errors
    /// Returns an error if the analyzer cannot be run, a findings report
    /// cannot be read, or an excluded file cannot be renamed
    pub fn run(&self, staged: &StagedSource) -> CoreResult<PipelineResult> {
        let mut result = PipelineResult::new();

        if self.config.skip_lint {
            info!("analyzer skipped");
            result.enter(PipelineState::Finalized);
            return Ok(result);
        }

        let work_dir = &staged.project_root;
        let runner = AnalysisRunner::new(
            self.analyzer,
            &self.config.lint,
            work_dir,
            &staged.metadata_dir,
        );

        result.enter(PipelineState::FirstPass);
        let first = runner.run(Pass::First, &[])?;

        if self.config.no_exclude {
            result.enter(PipelineState::Finalized);
            if first.exit_status != 0 {
                result.status = PipelineStatus::FatalFinding {
                    exit_status: first.exit_status,
                };
            }
            result.artifacts = first.artifacts.clone();
            result.first = Some(first);
            return Ok(result);
        }

        result.enter(PipelineState::Excluding);
        let initial = self.planner.plan(&first.sarif_path, true)?;

        if initial.is_empty() {
            info!("no structural findings, second pass not needed");
            result.enter(PipelineState::Finalized);
            result.artifacts = first.artifacts.clone();
            result.first = Some(first);
            return Ok(result);
        }

        warn!(
            count = initial.len(),
            files = %initial.join(","),
            "files excluded from the second pass"
        );
        result.excluded.extend(initial.iter().cloned());

        let mut marked: HashSet<String> = HashSet::new();
        if !self.analyzer.honors_exact_excludes() {
            mark_excluded(work_dir, initial.iter().map(String::as_str))?;
            marked.extend(initial.iter().cloned());
        }

        result.enter(PipelineState::SecondPass);
        let second = runner.run(Pass::Second, &initial)?;

        let late: Vec<String> = self
            .planner
            .plan(&second.sarif_path, false)?
            .into_iter()
            .filter(|path| result.excluded.insert(path.clone()))
            .collect();
        if !late.is_empty() {
            warn!(
                count = late.len(),
                files = %late.join(","),
                "files excluded after the second pass"
            );
        }

        // Nothing excluded may reach the transform step under its own name.
        mark_excluded(
            work_dir,
            result.excluded.iter().filter(|p| !marked.contains(*p)),
        )?;

        result.enter(PipelineState::Finalized);
        result.artifacts = merge_artifacts(&first.artifacts, &second.artifacts, &result.excluded);
        result.initially_excluded = initial;
        result.first = Some(first);
        result.second = Some(second);
        Ok(result)
    }
}

/// Pass-2 artifacts plus the pass-1 artifacts that pass 2 never saw because
/// they were excluded
#[must_use]
pub fn merge_artifacts(
    first: &[SourceArtifact],
    second: &[SourceArtifact],
    excluded: &ExclusionSet,
) -> Vec<SourceArtifact> {
    let reported: HashSet<&str> = second.iter().map(|a| a.filename.as_str()).collect();

    let mut merged = second.to_vec();
    merged.extend(
        first
            .iter()
            .filter(|a| excluded.contains(&a.filename) && !reported.contains(a.filename.as_str()))
            .cloned(),
    );
    merged
}
