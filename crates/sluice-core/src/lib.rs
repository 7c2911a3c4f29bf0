//! sluice core - two-pass lint and exclusion pipeline
//!
//! Runs an external analyzer over a staged source, excludes the files it
//! could not parse, re-runs it over the rest and merges both passes into one
//! report.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod analyzer;
pub mod artifact;
pub mod config;
pub mod error;
pub mod exclusion;
pub mod pipeline;
pub mod report;
pub mod run;
pub mod runner;
pub mod sarif;
pub mod transform;

pub use sluice_stage;

pub use analyzer::{AnalysisRequest, AnalysisRun, Analyzer, CommandAnalyzer};
pub use artifact::{LintResultFile, SourceArtifact};
pub use config::{LintOptions, PipelineConfig, Profile, SourceInfo};
pub use error::{CoreResult, PipelineError};
pub use exclusion::{ExclusionPlanner, ExclusionSet};
pub use pipeline::{Orchestrator, PipelineResult, PipelineState, PipelineStatus};
pub use report::{ReportAssembler, TextReport};
pub use run::{RunDriver, RunRequest, RunSummary};
pub use runner::{AnalysisRunner, Pass, PassOutcome};
pub use sarif::{Finding, Level, SarifLog};
pub use transform::{CommandTransformer, TransformRequest, Transformer};
