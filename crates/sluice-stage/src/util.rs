//! Path helpers for untrusted names
//!
//! Archive entry names and findings-report URIs both come from content we do
//! not control, so every join goes through [`safe_join`].

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Errors related to path validation
#[derive(Error, Debug)]
pub enum PathError {
    #[error("Path traversal attempt detected: {0}")]
    TraversalAttempt(String),

    #[error("Path escapes root directory: {0}")]
    EscapesRoot(String),

    #[error("Invalid path component: {0}")]
    InvalidComponent(String),
}

/// Join an untrusted relative path onto `root`, refusing anything that
/// would land outside of it
///
/// # Errors
/// Returns an error for absolute paths, NUL bytes, or `..` components that
/// climb above `root`
pub fn safe_join(root: &Path, untrusted: &Path) -> Result<PathBuf, PathError> {
    let relative = normalize(untrusted)?;
    let joined = root.join(relative);

    // Only existing paths can be resolved through symlinks.
    if joined.exists() {
        let canonical_root = root
            .canonicalize()
            .map_err(|_| PathError::EscapesRoot(joined.display().to_string()))?;
        let canonical = joined
            .canonicalize()
            .map_err(|_| PathError::EscapesRoot(joined.display().to_string()))?;
        if !canonical.starts_with(&canonical_root) {
            return Err(PathError::EscapesRoot(joined.display().to_string()));
        }
    }

    Ok(joined)
}

fn normalize(path: &Path) -> Result<PathBuf, PathError> {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::Normal(part) => {
                if part.to_string_lossy().contains('\0') {
                    return Err(PathError::InvalidComponent("Null byte in path".to_string()));
                }
                normalized.push(part);
            }
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return Err(PathError::TraversalAttempt(path.display().to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::InvalidComponent(format!(
                    "Absolute path not allowed: {}",
                    path.display()
                )));
            }
        }
    }

    Ok(normalized)
}

/// Append `suffix` to the final component of `path` (`a/b.yml` → `a/b.yml.x`)
#[must_use]
pub fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Whether `dir` has no entries at all
///
/// # Errors
/// Returns an error if the directory cannot be read
pub fn is_dir_empty(dir: &Path) -> io::Result<bool> {
    Ok(fs::read_dir(dir)?.next().is_none())
}
