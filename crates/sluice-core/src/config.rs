//! Run configuration
//!
//! Everything the analyzer and the pipeline need is carried in explicit
//! values handed down from the CLI. Nothing here is global.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Fix list used when none is given
pub const DEFAULT_WRITE_LIST: &str = "all";

/// Analyzer rule profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    Min,
    Basic,
    Moderate,
    Safety,
    Shared,
    Production,
}

impl Profile {
    pub const ALL: [Self; 6] = [
        Self::Min,
        Self::Basic,
        Self::Moderate,
        Self::Safety,
        Self::Shared,
        Self::Production,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Basic => "basic",
            Self::Moderate => "moderate",
            Self::Safety => "safety",
            Self::Shared => "shared",
            Self::Production => "production",
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown profile: {s}"))
    }
}

/// Options forwarded to every analyzer pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LintOptions {
    /// Rules allowed to autofix (`all`, `none` or a comma separated list)
    pub write_list: Option<String>,
    /// Rule profile
    pub profile: Option<Profile>,
    /// Analyzer configuration file, absolute
    pub config_file: Option<PathBuf>,
    /// Ask the analyzer for verbose output
    pub verbose: bool,
}

impl LintOptions {
    /// The effective fix list
    #[must_use]
    pub fn write_list(&self) -> &str {
        self.write_list.as_deref().unwrap_or(DEFAULT_WRITE_LIST)
    }
}

/// How the two-pass pipeline behaves
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Do not exclude anything: a failing first pass ends the run
    pub no_exclude: bool,
    /// Do not run the analyzer at all
    pub skip_lint: bool,
    /// Options for the analyzer
    pub lint: LintOptions,
}

/// Provenance handed to the transform step
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    #[serde(rename = "data_source_description")]
    pub description: String,
    pub license: String,
    pub repo_name: String,
    pub repo_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_write_list() {
        let options = LintOptions::default();
        assert_eq!(options.write_list(), "all");

        let options = LintOptions {
            write_list: Some("yaml,name".to_string()),
            ..LintOptions::default()
        };
        assert_eq!(options.write_list(), "yaml,name");
    }

    #[test]
    fn test_profile_parse() {
        assert_eq!("shared".parse::<Profile>().unwrap(), Profile::Shared);
        assert!("strict".parse::<Profile>().is_err());
        for profile in Profile::ALL {
            assert_eq!(profile.to_string().parse::<Profile>().unwrap(), profile);
        }
    }

    #[test]
    fn test_source_info_field_names() {
        let info = SourceInfo {
            description: "Samples".to_string(),
            license: "MIT".to_string(),
            repo_name: "examples".to_string(),
            repo_url: "https://example.com/org/examples".to_string(),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["data_source_description"], "Samples");
        assert_eq!(json["repo_url"], "https://example.com/org/examples");
    }
}
