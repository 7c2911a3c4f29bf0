//! One end-to-end run: stage, lint, report, transform

use crate::analyzer::Analyzer;
use crate::config::{PipelineConfig, SourceInfo};
use crate::error::{CoreResult, PipelineError};
use crate::pipeline::{Orchestrator, PipelineResult, PipelineStatus};
use crate::report::{ReportAssembler, ReportContext, REPORT_FILE};
use crate::transform::{TransformRequest, Transformer};
use chrono::Utc;
use sluice_stage::{Cloner, SafetyBudget, SourceStager, StagedSource};
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use uuid::Uuid;

/// Version written into reports
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// What to run
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Archive path, git URL or directory
    pub source: String,
    /// Output root, created if missing, must be empty
    pub output: PathBuf,
    pub budget: SafetyBudget,
    pub pipeline: PipelineConfig,
    pub license: String,
    pub description: String,
    /// Overrides the name derived from the source
    pub repo_name: Option<String>,
    /// Overrides the URL derived from the source
    pub repo_url: Option<String>,
}

/// What a successful run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub staged: StagedSource,
    pub pipeline: PipelineResult,
    pub report_path: PathBuf,
}

/// Wires the collaborators together for a run
pub struct RunDriver<'a> {
    cloner: &'a dyn Cloner,
    analyzer: &'a dyn Analyzer,
    report: &'a dyn ReportAssembler,
    transformer: Option<&'a dyn Transformer>,
}

impl<'a> RunDriver<'a> {
    pub fn new(
        cloner: &'a dyn Cloner,
        analyzer: &'a dyn Analyzer,
        report: &'a dyn ReportAssembler,
    ) -> Self {
        Self {
            cloner,
            analyzer,
            report,
            transformer: None,
        }
    }

    #[must_use]
    pub fn with_transformer(mut self, transformer: &'a dyn Transformer) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Execute a run
    ///
    /// The report is written even when the pipeline ends in a fatal finding.
    ///
    /// # Errors
    /// Returns the staging error, [`PipelineError::FatalFinding`] in
    /// no-exclude mode, or whatever stopped the analyzer, report or
    /// transformer
    pub fn execute(&self, request: &RunRequest) -> CoreResult<RunSummary> {
        let run_id = Uuid::new_v4();
        info!(%run_id, source = %request.source, output = %request.output.display(), "run started");

        let outcome = self.execute_inner(run_id, request);
        if let Err(e) = &outcome {
            error!(%run_id, code = e.code(), error = %e, "run failed");
        }
        outcome
    }

    fn execute_inner(&self, run_id: Uuid, request: &RunRequest) -> CoreResult<RunSummary> {
        let stager = SourceStager::new(request.budget, self.cloner);
        let mut staged = stager.stage(&request.source, &request.output)?;
        if let Some(name) = &request.repo_name {
            staged.provenance.repo_name.clone_from(name);
        }
        if let Some(url) = &request.repo_url {
            staged.provenance.repo_url.clone_from(url);
        }

        let pipeline = Orchestrator::new(self.analyzer, &request.pipeline).run(&staged)?;

        let report_path = request.output.join(REPORT_FILE);
        let report = self.report.assemble(&ReportContext {
            run_id,
            generated_at: Utc::now(),
            version: VERSION,
            source: &request.source,
            output: &request.output,
            provenance: &staged.provenance,
            result: &pipeline,
        })?;
        fs::write(&report_path, report)?;
        info!(path = %report_path.display(), "report written");

        if let PipelineStatus::FatalFinding { exit_status } = pipeline.status {
            return Err(PipelineError::FatalFinding { exit_status });
        }

        if let Some(transformer) = self.transformer {
            let source = SourceInfo {
                description: request.description.clone(),
                license: request.license.clone(),
                repo_name: staged.provenance.repo_name.clone(),
                repo_url: staged.provenance.repo_url.clone(),
            };
            transformer.transform(&TransformRequest {
                target_dir: &staged.project_root,
                lint_result: pipeline.first.as_ref().map(|p| p.lint_result_path.as_path()),
                output_dir: &staged.metadata_dir,
                source: &source,
            })?;
        }

        info!(
            %run_id,
            excluded = pipeline.excluded.len(),
            artifacts = pipeline.artifacts.len(),
            "run finished"
        );

        Ok(RunSummary {
            run_id,
            staged,
            pipeline,
            report_path,
        })
    }
}
