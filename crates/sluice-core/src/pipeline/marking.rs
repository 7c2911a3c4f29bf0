//! Sentinel renaming of excluded files

use crate::error::CoreResult;
use sluice_stage::util::{append_suffix, safe_join};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Suffix appended to an excluded file's name
pub const EXCLUDED_SUFFIX: &str = ".__EXCLUDED__";

/// Rename every plain file among `paths` (relative to `root`) to
/// `<name>.__EXCLUDED__`
///
/// Directories and paths that do not exist are left alone. Paths that would
/// resolve outside `root` are skipped. Returns the new locations.
///
/// # Errors
/// Returns an error if a rename fails
pub fn mark_excluded<'p, I>(root: &Path, paths: I) -> CoreResult<Vec<PathBuf>>
where
    I: IntoIterator<Item = &'p str>,
{
    let mut renamed = Vec::new();

    for path in paths {
        let target = match safe_join(root, Path::new(path)) {
            Ok(target) => target,
            Err(e) => {
                warn!(path, error = %e, "not renaming excluded path outside the working directory");
                continue;
            }
        };

        // `symlink_metadata` so a link is never followed out of the tree.
        let is_file = fs::symlink_metadata(&target)
            .map(|m| m.file_type().is_file())
            .unwrap_or(false);
        if !is_file {
            debug!(path, "excluded path is not a plain file, left in place");
            continue;
        }

        let marked = append_suffix(&target, EXCLUDED_SUFFIX);
        fs::rename(&target, &marked)?;
        debug!(from = %target.display(), to = %marked.display(), "excluded file renamed");
        renamed.push(marked);
    }

    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_files_are_renamed() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("playbooks")).unwrap();
        fs::write(dir.path().join("playbooks/broken.yml"), "- hosts: [").unwrap();

        let renamed = mark_excluded(dir.path(), ["playbooks/broken.yml"]).unwrap();

        assert_eq!(renamed.len(), 1);
        assert!(!dir.path().join("playbooks/broken.yml").exists());
        assert!(dir
            .path()
            .join("playbooks/broken.yml.__EXCLUDED__")
            .is_file());
    }

    #[test]
    fn test_directories_and_missing_paths_untouched() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("roles/web")).unwrap();

        let renamed = mark_excluded(dir.path(), ["roles/web", "gone.yml"]).unwrap();

        assert!(renamed.is_empty());
        assert!(dir.path().join("roles/web").is_dir());
    }

    #[test]
    fn test_paths_outside_root_are_skipped() {
        let parent = TempDir::new().unwrap();
        let root = parent.path().join("repo");
        fs::create_dir(&root).unwrap();
        fs::write(parent.path().join("outside.yml"), "---\n").unwrap();

        let renamed = mark_excluded(&root, ["../outside.yml", "/etc/hostname"]).unwrap();

        assert!(renamed.is_empty());
        assert!(parent.path().join("outside.yml").is_file());
    }
}
