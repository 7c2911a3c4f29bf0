//! Human-readable run report (`report.txt`)

use crate::artifact::SourceArtifact;
use crate::error::CoreResult;
use crate::exclusion::ExclusionSet;
use crate::pipeline::PipelineResult;
use crate::runner::PassOutcome;
use crate::sarif::{Level, SarifLog};
use chrono::{DateTime, Utc};
use sluice_stage::Provenance;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

/// File name of the report under the output root
pub const REPORT_FILE: &str = "report.txt";

const LABEL_COUNT: &str = "Count";
const LABEL_FILE_TYPE: &str = "File Type";
const LABEL_FILE_PATH: &str = "File Path";
const LABEL_FILE_STATE: &str = "Excluded/Autofixed";
const LABEL_TOTAL: &str = "TOTAL";
const UNIDENTIFIED_KIND: &str = "(file type not identified)";

/// Everything a report may draw on
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub version: &'a str,
    pub source: &'a str,
    pub output: &'a Path,
    pub provenance: &'a Provenance,
    pub result: &'a PipelineResult,
}

/// Turns a finished run into a report
pub trait ReportAssembler {
    fn assemble(&self, context: &ReportContext<'_>) -> CoreResult<String>;
}

/// Plain-text tables
#[derive(Debug, Clone, Copy, Default)]
pub struct TextReport;

impl ReportAssembler for TextReport {
    fn assemble(&self, context: &ReportContext<'_>) -> CoreResult<String> {
        let mut report = header(context);
        let result = context.result;

        let Some(first) = &result.first else {
            report.push_str("\nThe analyzer was skipped.\n");
            return Ok(report);
        };

        let _ = write!(
            report,
            "\n\n[ File counts per type ]\n\n{}\n\n\n[ List of files identified ]\n\n{}\n\n\n[ Issues found by the analyzer ]\n",
            kind_summary(&result.artifacts),
            file_list(&result.artifacts, &result.excluded),
        );

        match &result.second {
            Some(second) => {
                let _ = write!(
                    report,
                    "\n(First run)\n{}\n(Second run)\n\n- Files excluded from the second run due to syntax-check errors found in the first run\n\n{}\n{}",
                    findings_summary(first),
                    path_list(&result.initially_excluded),
                    findings_summary(second),
                );
            }
            None => {
                let _ = write!(report, "\n{}", findings_summary(first));
            }
        }

        if !result.excluded.is_empty() {
            let _ = write!(
                report,
                "\n\n[ Files excluded from further processing ]\n\n{}",
                path_list(&result.excluded.to_vec()),
            );
        }

        Ok(report)
    }
}

fn header(context: &ReportContext<'_>) -> String {
    let stars = "*".repeat(80);
    let title = "sluice Execution Report";
    let mut header = format!(
        "\n{stars}\n****{:^72}****\n{stars}\n\n\
         Date/Time         : {}\n\
         sluice Version    : {}\n\
         Run Id            : {}\n\
         Source Repository : {}\n\
         Output Directory  : {}\n",
        title,
        context.generated_at.to_rfc3339(),
        context.version,
        context.run_id,
        context.source,
        context.output.display(),
    );
    if let Some(sha256) = &context.provenance.sha256 {
        let _ = writeln!(header, "Archive SHA-256   : {sha256}");
    }
    header
}

/// Artifact counts per kind, most frequent first
pub fn kind_summary(artifacts: &[SourceArtifact]) -> String {
    // One kind per file name; later entries win.
    let kinds: BTreeMap<&str, &str> = artifacts
        .iter()
        .map(|a| (a.filename.as_str(), a.kind.as_str()))
        .collect();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for kind in kinds.values() {
        *counts.entry(*kind).or_default() += 1;
    }
    let mut entries: Vec<(&str, usize)> = counts
        .into_iter()
        .map(|(kind, n)| (if kind.is_empty() { UNIDENTIFIED_KIND } else { kind }, n))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

    let total: usize = entries.iter().map(|e| e.1).sum();
    let kind_width = entries
        .iter()
        .map(|e| e.0.len())
        .chain([LABEL_FILE_TYPE.len(), LABEL_TOTAL.len()])
        .max()
        .unwrap_or_default();
    let count_width = total.to_string().len().max(LABEL_COUNT.len());
    let separator = "-".repeat(kind_width + 5 + count_width);

    let mut out = format!("{separator}\n{LABEL_FILE_TYPE:<kind_width$}     {LABEL_COUNT:>count_width$}\n{separator}\n");
    for (kind, n) in &entries {
        let _ = writeln!(out, "{kind:<kind_width$}     {n:>count_width$}");
    }
    let _ = write!(
        out,
        "{separator}\n{LABEL_TOTAL:<kind_width$}     {total:>count_width$}\n{separator}"
    );
    out
}

/// Identified files with their excluded/autofixed state
pub fn file_list(artifacts: &[SourceArtifact], excluded: &ExclusionSet) -> String {
    let files: BTreeMap<&str, &SourceArtifact> = artifacts
        .iter()
        .filter(|a| a.is_identified())
        .map(|a| (a.filename.as_str(), a))
        .collect();

    let rows: Vec<(&str, &str, &str)> = files
        .iter()
        .map(|(name, artifact)| {
            let state = if excluded.contains(name) {
                "excluded"
            } else if artifact.updated {
                "autofixed"
            } else {
                ""
            };
            (*name, artifact.kind.as_str(), state)
        })
        .collect();

    let name_width = rows
        .iter()
        .map(|r| r.0.len())
        .chain([LABEL_FILE_PATH.len()])
        .max()
        .unwrap_or_default();
    let kind_width = rows
        .iter()
        .map(|r| r.1.len())
        .chain([LABEL_FILE_TYPE.len()])
        .max()
        .unwrap_or_default();
    let separator = "-".repeat(name_width + 2 + kind_width + 2 + LABEL_FILE_STATE.len());

    let mut out = format!(
        "{separator}\n{LABEL_FILE_PATH:<name_width$}  {LABEL_FILE_TYPE:<kind_width$}  {LABEL_FILE_STATE}\n{separator}\n"
    );
    for (name, kind, state) in rows {
        let _ = writeln!(out, "{name:<name_width$}  {kind:<kind_width$}  {state}");
    }
    out.push_str(&separator);
    out
}

/// A framed list of paths
pub fn path_list<S: AsRef<str>>(paths: &[S]) -> String {
    let width = paths
        .iter()
        .map(|p| p.as_ref().len())
        .chain([LABEL_FILE_PATH.len()])
        .max()
        .unwrap_or_default();
    let separator = "-".repeat(width);

    let mut out = format!("{separator}\n{LABEL_FILE_PATH}\n{separator}\n");
    for path in paths {
        let _ = writeln!(out, "{}", path.as_ref());
    }
    let _ = writeln!(out, "{separator}");
    out
}

/// Counts per level, then per rule within each level
fn findings_summary(pass: &PassOutcome) -> String {
    let log = match SarifLog::read(&pass.sarif_path) {
        Ok(log) => log,
        Err(e) => {
            warn!(pass = pass.pass.number(), error = %e, "findings report unavailable");
            return "(findings report unavailable)\n".to_string();
        }
    };

    let mut by_level: BTreeMap<Level, BTreeMap<String, usize>> = BTreeMap::new();
    for finding in log.findings() {
        *by_level
            .entry(finding.level)
            .or_default()
            .entry(finding.rule_id)
            .or_default() += 1;
    }

    let mut out = String::new();
    for level in Level::ALL {
        let count: usize = by_level.get(&level).map_or(0, |rules| rules.values().sum());
        let _ = writeln!(out, "{}: {count}", level.as_str());
    }
    for (level, rules) in &by_level {
        let _ = write!(out, "\n{} summary:\n", level.as_str());
        let mut rules: Vec<_> = rules.iter().collect();
        rules.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        for (rule, n) in rules {
            let _ = writeln!(out, "  {rule}: {n}");
        }
    }
    out
}
