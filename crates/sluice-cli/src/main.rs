//! sluice CLI - vet a content source and run the two-pass lint pipeline
//!
//! `sluice [OPTIONS] <SOURCE> <OUTPUT>`

mod logging;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use sluice_core::analyzer::DEFAULT_ANALYZER;
use sluice_core::{
    CommandAnalyzer, CommandTransformer, LintOptions, PipelineConfig, Profile, RunDriver,
    RunRequest, TextReport,
};
use sluice_stage::{GitCloner, SafetyBudget};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sluice")]
#[command(about = "Vet an archive, git URL or directory and lint it in two passes, excluding files that cannot be parsed")]
#[command(version)]
struct Cli {
    /// Source: a zip/tar archive, a git URL or a local directory
    source: String,

    /// Output directory (created if missing, must be empty)
    output: PathBuf,

    /// Configuration file for the analyzer
    #[arg(long, value_name = "FILE")]
    config_file: Option<PathBuf>,

    /// Rule profile for the analyzer
    #[arg(long, value_enum)]
    profile: Option<ProfileArg>,

    /// Rules allowed to autofix: `all`, `none` or a comma separated list
    #[arg(long = "fix", value_name = "WRITE_LIST")]
    write_list: Option<String>,

    /// Do not run the analyzer
    #[arg(short = 'S', long)]
    skip_lint: bool,

    /// Do not exclude files; any lint error ends the run
    #[arg(long)]
    no_exclude: bool,

    /// Explain what is being done
    #[arg(short, long)]
    verbose: bool,

    /// License recorded with the source
    #[arg(long, default_value = "")]
    source_license: String,

    /// Description recorded with the source
    #[arg(long, default_value = "")]
    source_description: String,

    /// Repository name (derived from the source if omitted)
    #[arg(long)]
    repo_name: Option<String>,

    /// Repository URL (derived from the source if omitted)
    #[arg(long)]
    repo_url: Option<String>,

    /// Analyzer executable
    #[arg(long, env = "SLUICE_ANALYZER", default_value = DEFAULT_ANALYZER)]
    analyzer: PathBuf,

    /// The analyzer's --exclude is exact; skip renaming before the second pass
    #[arg(long)]
    exact_excludes: bool,

    /// Executable run over the vetted tree after linting
    #[arg(long, env = "SLUICE_TRANSFORMER")]
    transformer: Option<PathBuf>,

    /// Maximum number of entries in an archive
    #[arg(long, value_name = "COUNT")]
    max_entries: Option<u64>,

    /// Maximum total uncompressed size of an archive, in bytes
    #[arg(long, value_name = "BYTES")]
    max_total_bytes: Option<u64>,

    /// Maximum compression ratio of a single zip entry
    #[arg(long, value_name = "RATIO", value_parser = parse_ratio)]
    max_ratio: Option<f64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ProfileArg {
    Min,
    Basic,
    Moderate,
    Safety,
    Shared,
    Production,
}

impl From<ProfileArg> for Profile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Min => Self::Min,
            ProfileArg::Basic => Self::Basic,
            ProfileArg::Moderate => Self::Moderate,
            ProfileArg::Safety => Self::Safety,
            ProfileArg::Shared => Self::Shared,
            ProfileArg::Production => Self::Production,
        }
    }
}

fn parse_ratio(s: &str) -> Result<f64, String> {
    let ratio: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if ratio.is_finite() && ratio > 0.0 {
        Ok(ratio)
    } else {
        Err(format!("ratio must be a positive number, got {s}"))
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let request = build_request(&cli)?;

    let cloner = GitCloner::new();
    let analyzer = CommandAnalyzer::new()
        .with_program(&cli.analyzer)
        .with_exact_excludes(cli.exact_excludes);
    let transformer = cli.transformer.as_ref().map(CommandTransformer::new);

    let mut driver = RunDriver::new(&cloner, &analyzer, &TextReport);
    if let Some(transformer) = &transformer {
        driver = driver.with_transformer(transformer);
    }

    let summary = driver.execute(&request)?;

    println!("Report written to {}", summary.report_path.display());
    let excluded = &summary.pipeline.excluded;
    if !excluded.is_empty() {
        println!("Excluded {} file(s):", excluded.len());
        for path in excluded.iter() {
            println!("  {path}");
        }
    }
    Ok(())
}

fn build_request(cli: &Cli) -> anyhow::Result<RunRequest> {
    let defaults = SafetyBudget::default();
    let budget = SafetyBudget {
        max_entries: cli.max_entries.unwrap_or(defaults.max_entries),
        max_total_uncompressed_bytes: cli
            .max_total_bytes
            .unwrap_or(defaults.max_total_uncompressed_bytes),
        max_compression_ratio: cli.max_ratio.unwrap_or(defaults.max_compression_ratio),
    };

    let config_file = cli
        .config_file
        .as_deref()
        .map(absolute)
        .transpose()
        .context("cannot resolve --config-file")?;

    Ok(RunRequest {
        source: cli.source.clone(),
        output: absolute(&cli.output).context("cannot resolve the output directory")?,
        budget,
        pipeline: PipelineConfig {
            no_exclude: cli.no_exclude,
            skip_lint: cli.skip_lint,
            lint: LintOptions {
                write_list: cli.write_list.clone(),
                profile: cli.profile.map(Profile::from),
                config_file,
                verbose: cli.verbose,
            },
        },
        license: cli.source_license.clone(),
        description: cli.source_description.clone(),
        repo_name: cli.repo_name.clone().filter(|s| !s.is_empty()),
        repo_url: cli.repo_url.clone().filter(|s| !s.is_empty()),
    })
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}
