//! Source descriptor classification and provenance

use crate::error::{StageError, StageResult};
use crate::safety::ArchiveDescriptor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use url::Url;

/// What a user-supplied source string turned out to be
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    /// A zip or tar archive on disk
    Archive(ArchiveDescriptor),
    /// A remote git repository
    GitUrl(String),
    /// A local directory tree
    Directory(PathBuf),
}

impl SourceKind {
    /// Classify a source, trying archive suffixes, then git URL shapes, then
    /// an existing directory
    ///
    /// # Errors
    /// Returns [`StageError::InvalidSource`] when nothing matches
    pub fn classify(source: &str) -> StageResult<Self> {
        if let Some(archive) = ArchiveDescriptor::from_path(Path::new(source)) {
            return Ok(Self::Archive(archive));
        }
        if is_git_url(source) {
            return Ok(Self::GitUrl(source.to_string()));
        }
        let path = Path::new(source);
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }
        Err(StageError::InvalidSource {
            descriptor: source.to_string(),
        })
    }

    /// Whether the source lives on the local file system
    #[must_use]
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::GitUrl(_))
    }
}

fn git_url_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // https://host/owner/repo(.git), ssh://git@host:22/owner/repo, git://...
            Regex::new(
                r"^(?:https?|git|ssh|git\+ssh)://(?:[^@/\s]+@)?[A-Za-z0-9.-]+(?::\d+)?(?:/[\w.~-]+){2,}/?$",
            )
            .expect("valid git url pattern"),
            // git@host:owner/repo(.git)
            Regex::new(r"^[\w.-]+@[A-Za-z0-9.-]+:[\w.~-]+(?:/[\w.~-]+)+/?$")
                .expect("valid scp-like pattern"),
        ]
    })
}

/// Whether `source` has the shape of a remote git repository URL
#[must_use]
pub fn is_git_url(source: &str) -> bool {
    git_url_patterns().iter().any(|re| re.is_match(source))
}

/// Where the staged content came from
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// The source exactly as given
    pub source: String,
    /// Short repository name
    pub repo_name: String,
    /// URL identifying the repository
    pub repo_url: String,
    /// SHA-256 of the archive, for archive sources
    pub sha256: Option<String>,
}

impl Provenance {
    /// Derive a repository name and URL from the source descriptor
    #[must_use]
    pub fn derive(source: &str, kind: &SourceKind) -> Self {
        Self {
            source: source.to_string(),
            repo_name: derive_repo_name(source),
            repo_url: derive_repo_url(source, kind.is_local()),
            sha256: None,
        }
    }
}

/// `https://host/org/my.repo.git` → `my`, `/tmp/roles/` → `roles`
#[must_use]
pub fn derive_repo_name(source: &str) -> String {
    let trimmed = source.strip_suffix('/').unwrap_or(source);
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    last.split('.').next().unwrap_or(last).to_string()
}

fn derive_repo_url(source: &str, is_local: bool) -> String {
    if !is_local {
        return source.to_string();
    }
    let path = Path::new(source);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let absolute: PathBuf = joined
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    // Only fails for a relative path, i.e. when the cwd is unavailable.
    Url::from_file_path(&absolute).map_or_else(
        |()| format!("file://{}", absolute.display()),
        String::from,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safety::{ArchiveFormat, TarCompression};

    #[test]
    fn test_git_url_shapes() {
        assert!(is_git_url("https://github.com/ansible/ansible-examples"));
        assert!(is_git_url("https://github.com/ansible/ansible-examples.git"));
        assert!(is_git_url("git@github.com:ansible/ansible-examples.git"));
        assert!(is_git_url("ssh://git@gitlab.example.com:2222/group/sub/repo.git"));
        assert!(is_git_url("git://example.org/owner/repo"));
    }

    #[test]
    fn test_non_git_sources() {
        assert!(!is_git_url("/tmp/repo"));
        assert!(!is_git_url("./repo"));
        assert!(!is_git_url("https://example.com"));
        assert!(!is_git_url("https://example.com/only-one"));
        assert!(!is_git_url("playbook.yml"));
    }

    #[test]
    fn test_classify_archives_before_urls() {
        let kind = SourceKind::classify("https://example.com/releases/repo.tar.gz").unwrap();
        assert_eq!(
            kind,
            SourceKind::Archive(ArchiveDescriptor::new(
                "https://example.com/releases/repo.tar.gz",
                ArchiveFormat::Tar(TarCompression::Gzip)
            ))
        );
    }

    #[test]
    fn test_classify_rejects_plain_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("playbook.yml");
        std::fs::write(&file, "---\n").unwrap();

        let err = SourceKind::classify(&file.to_string_lossy()).unwrap_err();
        assert_eq!(err.code(), "INVALID_SOURCE");
    }

    #[test]
    fn test_derive_repo_name() {
        assert_eq!(derive_repo_name("/tmp/sources/collection/"), "collection");
        assert_eq!(derive_repo_name("repo_name.tar.gz"), "repo_name");
        assert_eq!(
            derive_repo_name("https://github.com/ansible/ansible-examples.git"),
            "ansible-examples"
        );
    }

    #[test]
    fn test_provenance_for_git_keeps_url() {
        let url = "https://github.com/ansible/ansible-examples";
        let provenance = Provenance::derive(url, &SourceKind::GitUrl(url.to_string()));
        assert_eq!(provenance.repo_url, url);
        assert_eq!(provenance.repo_name, "ansible-examples");
    }

    #[test]
    fn test_provenance_for_local_is_file_uri() {
        let provenance = Provenance::derive(
            "/srv/content",
            &SourceKind::Directory(PathBuf::from("/srv/content")),
        );
        assert_eq!(provenance.repo_url, "file:///srv/content");
    }

    #[test]
    fn test_local_uri_is_percent_encoded() {
        let provenance = Provenance::derive(
            "/srv/my repo#1",
            &SourceKind::Directory(PathBuf::from("/srv/my repo#1")),
        );
        assert_eq!(provenance.repo_url, "file:///srv/my%20repo%231");
    }

    #[test]
    fn test_local_uri_drops_current_dir_segments() {
        let provenance =
            Provenance::derive("./repo", &SourceKind::Directory(PathBuf::from("./repo")));
        let cwd = Url::from_file_path(std::env::current_dir().unwrap()).unwrap();

        assert!(!provenance.repo_url.contains("/./"));
        assert_eq!(provenance.repo_url, format!("{cwd}/repo"));
    }
}
