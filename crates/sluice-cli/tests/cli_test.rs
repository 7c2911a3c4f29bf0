//! CLI integration tests using assert_cmd
//!
//! These run the real `sluice` binary end-to-end. Analyzer runs use a small
//! shell script standing in for the real tool.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Get a command instance for the sluice binary
fn sluice_cmd() -> Command {
    let mut cmd = Command::cargo_bin("sluice").expect("Failed to find sluice binary");
    cmd.env_remove("SLUICE_ANALYZER");
    cmd.env_remove("SLUICE_TRANSFORMER");
    cmd
}

fn source_dir(temp: &TempDir) -> PathBuf {
    let src = temp.path().join("roles");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("site.yml"), "---\n- hosts: all\n").unwrap();
    fs::write(src.join("broken.yml"), "- hosts: [\n").unwrap();
    src
}

#[test]
fn test_help_command() {
    sluice_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Vet an archive, git URL or directory"))
        .stdout(predicate::str::contains("--skip-lint"));
}

#[test]
fn test_version_command() {
    sluice_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sluice"));
}

#[test]
fn test_missing_arguments_is_usage_error() {
    sluice_cmd().assert().code(2);
}

#[test]
fn test_unknown_profile_is_usage_error() {
    let temp = TempDir::new().unwrap();
    sluice_cmd()
        .args(["--profile", "strict"])
        .arg(temp.path())
        .arg(temp.path().join("out"))
        .assert()
        .code(2);
}

#[test]
fn test_nan_ratio_is_usage_error() {
    let temp = TempDir::new().unwrap();
    sluice_cmd()
        .args(["--max-ratio", "NaN"])
        .arg(temp.path())
        .arg(temp.path().join("out"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("positive number"));
    assert!(!temp.path().join("out").exists());
}

#[test]
fn test_plain_file_source_fails() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("playbook.yml");
    fs::write(&file, "---\n").unwrap();

    sluice_cmd()
        .arg("--skip-lint")
        .arg(&file)
        .arg(temp.path().join("out"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "is not a supported archive, git URL or directory",
        ));
}

#[test]
fn test_dirty_output_fails_without_writing() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let out = temp.path().join("out");
    fs::create_dir(&out).unwrap();
    fs::write(out.join("previous-run.txt"), "keep me").unwrap();

    sluice_cmd()
        .arg("--skip-lint")
        .arg(&src)
        .arg(&out)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Output directory is not empty"));

    let entries: Vec<_> = fs::read_dir(&out).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_skip_lint_stages_directory() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let out = temp.path().join("out");

    sluice_cmd()
        .arg("-S")
        .arg(&src)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("report.txt"));

    assert!(out.join("repository/site.yml").is_file());
    assert!(out.join("repository/broken.yml").is_file());
    assert!(out.join("metadata").is_dir());
    let report = fs::read_to_string(out.join("report.txt")).unwrap();
    assert!(report.contains("The analyzer was skipped."));
}

#[test]
fn test_zip_bomb_is_rejected() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("bomb.zip");
    let mut zip = ZipWriter::new(File::create(&archive).unwrap());
    zip.start_file(
        "a.txt",
        FileOptions::default().compression_method(CompressionMethod::Deflated),
    )
    .unwrap();
    zip.write_all(&[b'A'; 4096]).unwrap();
    zip.finish().unwrap();
    let out = temp.path().join("out");

    sluice_cmd()
        .arg("--skip-lint")
        .arg(&archive)
        .arg(&out)
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "ratio between compressed and uncompressed data is highly suspicious, looks like a Zip Bomb Attack",
        ));

    assert!(!out.join("repository").exists());
}

#[test]
fn test_entry_budget_flag() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("many.zip");
    let mut zip = ZipWriter::new(File::create(&archive).unwrap());
    for i in 0..5 {
        zip.start_file(format!("{i}.yml"), FileOptions::default())
            .unwrap();
        zip.write_all(b"---\n").unwrap();
    }
    zip.finish().unwrap();

    sluice_cmd()
        .args(["--skip-lint", "--max-entries", "4"])
        .arg(&archive)
        .arg(temp.path().join("out"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("too many entries in this archive"));
}

// =============================================================================
// With a scripted analyzer
// =============================================================================

#[cfg(unix)]
const FAKE_ANALYZER: &str = r#"#!/bin/sh
# $1 is --sarif-file, $2 the report path
sarif="$2"
case "$sarif" in
  *sarif-2.json)
    printf '{"runs":[{"results":[]}]}' > "$sarif"
    printf '{"files":[{"filename":"site.yml","kind":"playbook"}]}'
    exit 0
    ;;
  *)
    printf '{"runs":[{"results":[{"ruleId":"syntax-check[specific]","level":"error","message":{"text":"could not parse"},"locations":[{"physicalLocation":{"artifactLocation":{"uri":"broken.yml"}}}]}]}]}' > "$sarif"
    printf '{"files":[{"filename":"site.yml","kind":"playbook"},{"filename":"broken.yml","kind":"playbook"}]}'
    exit 2
    ;;
esac
"#;

#[cfg(unix)]
fn fake_analyzer(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-lint");
    fs::write(&path, FAKE_ANALYZER).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn test_two_pass_run_excludes_broken_file() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let out = temp.path().join("out");
    let analyzer = fake_analyzer(temp.path());

    sluice_cmd()
        .arg("--analyzer")
        .arg(&analyzer)
        .arg(&src)
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("Excluded 1 file(s):"))
        .stdout(predicate::str::contains("broken.yml"));

    assert!(out.join("repository/broken.yml.__EXCLUDED__").is_file());
    assert!(out.join("repository/site.yml").is_file());
    for name in ["sarif.json", "sarif-2.json", "lint-result.json", "lint-result-2.json"] {
        assert!(out.join("metadata").join(name).is_file(), "{name} missing");
    }

    let second: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("metadata/lint-result-2.json")).unwrap())
            .unwrap();
    assert_eq!(second["excluded"], serde_json::json!(["broken.yml"]));
}

#[cfg(unix)]
#[test]
fn test_no_exclude_run_fails_on_findings() {
    let temp = TempDir::new().unwrap();
    let src = source_dir(&temp);
    let out = temp.path().join("out");
    let analyzer = fake_analyzer(temp.path());

    sluice_cmd()
        .env("SLUICE_ANALYZER", &analyzer)
        .arg("--no-exclude")
        .arg(&src)
        .arg(&out)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("One or more lint errors"));

    assert!(out.join("report.txt").is_file());
    assert!(out.join("repository/broken.yml").is_file());
}
