//! Staging a source into the output root

use crate::clone::Cloner;
use crate::error::{StageError, StageResult};
use crate::extract::extract_archive;
use crate::safety::{ArchiveSafetyValidator, SafetyBudget};
use crate::source::{Provenance, SourceKind};
use crate::util::is_dir_empty;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Directory under the output root holding the staged tree
pub const REPOSITORY_DIR: &str = "repository";
/// Directory under the output root holding per-pass analyzer output
pub const METADATA_DIR: &str = "metadata";

/// A source materialized on local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedSource {
    /// The output root the run owns
    pub output_root: PathBuf,
    /// `output/repository`
    pub repository_root: PathBuf,
    /// Effective project root (a single wrapping directory is unwrapped)
    pub project_root: PathBuf,
    /// `output/metadata`
    pub metadata_dir: PathBuf,
    /// Where the content came from
    pub provenance: Provenance,
}

/// Turns a source descriptor into a writable repository tree
pub struct SourceStager<'a> {
    validator: ArchiveSafetyValidator,
    cloner: &'a dyn Cloner,
}

impl<'a> SourceStager<'a> {
    #[must_use]
    pub fn new(budget: SafetyBudget, cloner: &'a dyn Cloner) -> Self {
        Self {
            validator: ArchiveSafetyValidator::new(budget),
            cloner,
        }
    }

    /// Stage `source` under `output_root`
    ///
    /// # Errors
    /// Returns [`StageError::DirtyOutput`] if `output_root` already holds
    /// anything, [`StageError::InvalidSource`] for unsupported sources, and
    /// validation, clone or IO errors from the chosen strategy
    pub fn stage(&self, source: &str, output_root: &Path) -> StageResult<StagedSource> {
        prepare_output(output_root)?;

        let kind = SourceKind::classify(source)?;
        let repository_root = output_root.join(REPOSITORY_DIR);
        let mut provenance = Provenance::derive(source, &kind);

        let project_root = match &kind {
            SourceKind::Archive(archive) => {
                self.validator.validate(archive)?;
                provenance.sha256 = Some(sha256_file(&archive.path)?);
                fs::create_dir(&repository_root)?;
                extract_archive(archive, &repository_root)?;
                project_root(&repository_root)?
            }
            SourceKind::GitUrl(url) => {
                fs::create_dir(&repository_root)?;
                self.cloner.clone_repository(url, &repository_root)?;
                repository_root.clone()
            }
            SourceKind::Directory(dir) => {
                copy_tree(dir, &repository_root, output_root)?;
                repository_root.clone()
            }
        };

        let metadata_dir = output_root.join(METADATA_DIR);
        fs::create_dir(&metadata_dir)?;

        info!(
            source,
            repository = %repository_root.display(),
            project = %project_root.display(),
            "source staged"
        );

        Ok(StagedSource {
            output_root: output_root.to_path_buf(),
            repository_root,
            project_root,
            metadata_dir,
            provenance,
        })
    }
}

/// Make sure the output root exists and holds nothing yet
///
/// # Errors
/// Returns [`StageError::DirtyOutput`] if it is a file or not empty
pub fn prepare_output(output_root: &Path) -> StageResult<()> {
    if output_root.exists() {
        if !output_root.is_dir() || !is_dir_empty(output_root)? {
            return Err(StageError::DirtyOutput {
                path: output_root.to_path_buf(),
            });
        }
    } else {
        fs::create_dir_all(output_root)?;
    }
    Ok(())
}

/// If the repository holds exactly one directory, treat it as the project
/// root. One level only.
///
/// # Errors
/// Returns an error if the repository directory cannot be read
pub fn project_root(repository_root: &Path) -> io::Result<PathBuf> {
    let mut entries = fs::read_dir(repository_root)?;
    let first = entries.next().transpose()?;
    let second = entries.next().transpose()?;

    match (first, second) {
        (Some(only), None) if only.path().is_dir() => Ok(only.path()),
        _ => Ok(repository_root.to_path_buf()),
    }
}

/// Recursively copy `source` into `destination`, skipping symlinks and
/// anything under `output_root` (the output may live inside the source)
fn copy_tree(source: &Path, destination: &Path, output_root: &Path) -> StageResult<()> {
    let source = source.canonicalize()?;
    let output_root = output_root.canonicalize()?;

    let walker = WalkDir::new(&source)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !e.path().starts_with(&output_root));

    for entry in walker {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&source)
            .map_err(io::Error::other)?;
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            fs::copy(entry.path(), &target)?;
        } else {
            debug!(path = %entry.path().display(), "skipping non-regular file");
        }
    }

    Ok(())
}

fn sha256_file(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
