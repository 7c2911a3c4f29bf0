//! End-to-end runs through the driver with in-process collaborators

use serde_json::json;
use sluice_core::{
    AnalysisRequest, AnalysisRun, Analyzer, CoreResult, PipelineConfig, RunDriver, RunRequest,
    SourceArtifact, SourceInfo, TextReport, TransformRequest, Transformer,
};
use sluice_stage::{Cloner, GitCloner, StageResult};
use std::cell::{Cell, RefCell};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Reports `broken.yml` as unparsable on the first pass, clean afterwards
struct OneBrokenFile {
    calls: Cell<u32>,
}

impl Analyzer for OneBrokenFile {
    fn analyze(&self, request: &AnalysisRequest<'_>) -> CoreResult<AnalysisRun> {
        let call = self.calls.get() + 1;
        self.calls.set(call);

        let (results, artifacts, exit_status) = if call == 1 {
            (
                json!([{
                    "ruleId": "syntax-check[specific]",
                    "level": "error",
                    "message": {"text": "couldn't parse"},
                    "locations": [{"physicalLocation": {"artifactLocation": {"uri": "broken.yml"}}}]
                }]),
                vec![
                    SourceArtifact::new("site.yml", "playbook"),
                    SourceArtifact::new("broken.yml", "playbook"),
                ],
                2,
            )
        } else {
            (
                json!([]),
                vec![SourceArtifact {
                    updated: true,
                    ..SourceArtifact::new("site.yml", "playbook")
                }],
                0,
            )
        };
        fs::write(
            request.sarif_path,
            json!({"runs": [{"results": results}]}).to_string(),
        )?;
        Ok(AnalysisRun {
            artifacts,
            exit_status,
        })
    }
}

/// Remembers what it was asked to transform
#[derive(Default)]
struct RecordingTransformer {
    seen: RefCell<Option<(PathBuf, Option<PathBuf>, SourceInfo, Vec<String>)>>,
}

impl Transformer for RecordingTransformer {
    fn transform(&self, request: &TransformRequest<'_>) -> CoreResult<()> {
        let mut files: Vec<String> = fs::read_dir(request.target_dir)?
            .map(|e| e.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<Result<_, _>>()?;
        files.sort();
        *self.seen.borrow_mut() = Some((
            request.target_dir.to_path_buf(),
            request.lint_result.map(Path::to_path_buf),
            request.source.clone(),
            files,
        ));
        Ok(())
    }
}

struct NoClone;

impl Cloner for NoClone {
    fn clone_repository(&self, url: &str, _destination: &Path) -> StageResult<()> {
        panic!("unexpected clone of {url}");
    }
}

fn source_dir(temp: &TempDir) -> PathBuf {
    let src = temp.path().join("my.roles");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("site.yml"), "---\n- hosts: all\n").unwrap();
    fs::write(src.join("broken.yml"), "- hosts: [\n").unwrap();
    src
}

fn request(src: &Path, output: &Path) -> RunRequest {
    RunRequest {
        source: src.to_string_lossy().into_owned(),
        output: output.to_path_buf(),
        license: "MIT".to_string(),
        description: "Sample roles".to_string(),
        ..RunRequest::default()
    }
}

#[test]
fn test_run_writes_report_and_feeds_transformer() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let output = temp.path().join("out");
    let analyzer = OneBrokenFile { calls: Cell::new(0) };
    let transformer = RecordingTransformer::default();

    let summary = RunDriver::new(&NoClone, &analyzer, &TextReport)
        .with_transformer(&transformer)
        .execute(&request(&src, &output))
        .unwrap();

    assert_eq!(summary.report_path, output.join("report.txt"));
    let report = fs::read_to_string(&summary.report_path).unwrap();
    assert!(report.contains(&summary.run_id.to_string()));
    assert!(report.contains("[ File counts per type ]"));
    assert!(report.contains("(Second run)"));
    let broken_row = report
        .lines()
        .find(|l| l.starts_with("broken.yml "))
        .unwrap();
    assert!(broken_row.trim_end().ends_with("excluded"));
    let site_row = report.lines().find(|l| l.starts_with("site.yml ")).unwrap();
    assert!(site_row.trim_end().ends_with("autofixed"));

    let seen = transformer.seen.borrow();
    let (target, lint_result, source, files) = seen.as_ref().unwrap();
    assert_eq!(target, &summary.staged.project_root);
    assert_eq!(
        lint_result.as_deref(),
        Some(summary.staged.metadata_dir.join("lint-result.json").as_path())
    );
    assert_eq!(source.repo_name, "my");
    assert_eq!(source.license, "MIT");
    assert!(source.repo_url.starts_with("file://"));
    assert_eq!(
        files,
        &vec!["broken.yml.__EXCLUDED__".to_string(), "site.yml".to_string()]
    );
}

#[test]
fn test_repo_overrides() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let analyzer = OneBrokenFile { calls: Cell::new(0) };
    let transformer = RecordingTransformer::default();
    let mut req = request(&src, &temp.path().join("out"));
    req.repo_name = Some("roles".to_string());
    req.repo_url = Some("https://example.com/org/roles".to_string());

    RunDriver::new(&NoClone, &analyzer, &TextReport)
        .with_transformer(&transformer)
        .execute(&req)
        .unwrap();

    let seen = transformer.seen.borrow();
    let source = &seen.as_ref().unwrap().2;
    assert_eq!(source.repo_name, "roles");
    assert_eq!(source.repo_url, "https://example.com/org/roles");
}

#[test]
fn test_fatal_finding_still_writes_report() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let output = temp.path().join("out");
    let analyzer = OneBrokenFile { calls: Cell::new(0) };
    let transformer = RecordingTransformer::default();
    let mut req = request(&src, &output);
    req.pipeline = PipelineConfig {
        no_exclude: true,
        ..PipelineConfig::default()
    };

    let err = RunDriver::new(&NoClone, &analyzer, &TextReport)
        .with_transformer(&transformer)
        .execute(&req)
        .unwrap_err();

    assert_eq!(err.code(), "FATAL_FINDING");
    assert!(output.join("report.txt").is_file());
    assert!(transformer.seen.borrow().is_none());
    assert!(output.join("repository/broken.yml").is_file());
}

#[test]
fn test_skip_lint_report() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let output = temp.path().join("out");
    let analyzer = OneBrokenFile { calls: Cell::new(0) };
    let mut req = request(&src, &output);
    req.pipeline.skip_lint = true;

    let summary = RunDriver::new(&GitCloner::new(), &analyzer, &TextReport)
        .execute(&req)
        .unwrap();

    assert_eq!(analyzer.calls.get(), 0);
    let report = fs::read_to_string(summary.report_path).unwrap();
    assert!(report.contains("The analyzer was skipped."));
    assert!(!output.join("metadata/lint-result.json").exists());
}

#[test]
fn test_dirty_output_fails_before_analysis() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let output = temp.path().join("out");
    fs::create_dir(&output).unwrap();
    fs::write(output.join("keep.txt"), "mine").unwrap();
    let analyzer = OneBrokenFile { calls: Cell::new(0) };

    let err = RunDriver::new(&NoClone, &analyzer, &TextReport)
        .execute(&request(&src, &output))
        .unwrap_err();

    assert_eq!(err.code(), "DIRTY_OUTPUT");
    assert_eq!(analyzer.calls.get(), 0);
    assert_eq!(fs::read_dir(&output).unwrap().count(), 1);
}
