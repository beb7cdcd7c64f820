//! Environment snapshot, pre-flight validation and resolved release settings.

use crate::error::{ConfigError, Result};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Release-host authentication token
pub const TOKEN_VAR: &str = "GH_TOKEN";
/// `owner/repo` identifier of the hosting repository
pub const REPOSITORY_VAR: &str = "GITHUB_REPOSITORY";
/// CI run identifier used to link the failing run from pull-request comments
pub const RUN_ID_VAR: &str = "GITHUB_RUN_ID";
/// Base URL of the hosting web UI
pub const SERVER_URL_VAR: &str = "GITHUB_SERVER_URL";
/// Base URL of the hosting REST API
pub const API_URL_VAR: &str = "GITHUB_API_URL";

/// Default package registry
pub const DEFAULT_REGISTRY: &str = "https://npm.pkg.github.com/";
const DEFAULT_SERVER_URL: &str = "https://github.com";
const DEFAULT_API_URL: &str = "https://api.github.com";

/// Immutable snapshot of the process environment.
///
/// Captured once at startup so nothing downstream reads ambient state.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    vars: HashMap<String, String>,
}

impl EnvConfig {
    /// Snapshot the current process environment
    pub fn from_env() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    /// Build a snapshot from explicit pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Get a variable, treating empty values as unset
    pub fn get(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// `owner/repo` pair identifying the hosting repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositorySlug {
    /// Repository owner (user or organisation)
    pub owner: String,
    /// Repository name
    pub repo: String,
}

impl RepositorySlug {
    /// Parse an `owner/repo` identifier
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || ConfigError::InvalidRepository {
            value: value.to_string(),
        };
        let (owner, repo) = value.trim().split_once('/').ok_or_else(invalid)?;
        if owner.is_empty() || repo.is_empty() || repo.contains('/') {
            return Err(invalid().into());
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }
}

impl fmt::Display for RepositorySlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Credentials and identifiers validated before any work starts
#[derive(Debug, Clone)]
pub struct Preflight {
    /// Release-host token
    pub token: String,
    /// Hosting repository
    pub repository: RepositorySlug,
    /// Link to the current CI run, when running under CI
    pub run_url: Option<String>,
    /// REST API base URL
    pub api_url: String,
}

impl Preflight {
    /// Validate required environment, reporting every missing variable at once
    pub fn validate(env: &EnvConfig) -> Result<Self> {
        let token = env.get(TOKEN_VAR);
        let repository = env.get(REPOSITORY_VAR);

        let missing: Vec<String> = [(TOKEN_VAR, &token), (REPOSITORY_VAR, &repository)]
            .into_iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| name.to_string())
            .collect();

        let (Some(token), Some(repository)) = (token, repository) else {
            for name in &missing {
                log::error!("{name} environment variable is required for releasing");
            }
            return Err(ConfigError::MissingEnvironment { names: missing }.into());
        };

        let repository = RepositorySlug::parse(&repository)?;
        let server = env
            .get(SERVER_URL_VAR)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let run_url = env.get(RUN_ID_VAR).map(|run_id| {
            format!(
                "{}/{}/actions/runs/{}",
                server.trim_end_matches('/'),
                repository,
                run_id
            )
        });
        let api_url = env
            .get(API_URL_VAR)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            token,
            repository,
            run_url,
            api_url,
        })
    }

    /// Verify that the external executables the pipeline shells out to exist
    pub fn require_tools(tools: &[&str]) -> Result<()> {
        for tool in tools {
            if which::which(tool).is_err() {
                return Err(ConfigError::ToolNotFound {
                    tool: (*tool).to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Fully resolved settings for one release run
#[derive(Debug, Clone)]
pub struct ReleaseSettings {
    /// Repository root (directory holding the root package.json)
    pub root: PathBuf,
    /// Registry URL passed to every npm publish/unpublish
    pub registry: String,
    /// Git remote to push to
    pub remote: String,
    /// Branch to push and force-push on rollback
    pub branch: String,
    /// Lockfile synchronised after manifests are rewritten; `None` disables the step
    pub lockfile: Option<String>,
    /// Upper bound for any single subprocess call
    pub command_timeout: Option<Duration>,
}

impl ReleaseSettings {
    /// Settings with defaults for everything but root and branch
    pub fn new(root: impl Into<PathBuf>, branch: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            registry: DEFAULT_REGISTRY.to_string(),
            remote: "origin".to_string(),
            branch: branch.into(),
            lockfile: Some("package-lock.json".to_string()),
            command_timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReleaseError;

    #[test]
    fn test_preflight_reports_both_missing_variables() {
        let env = EnvConfig::from_pairs([("GH_TOKEN", "  ")]);
        match Preflight::validate(&env) {
            Err(ReleaseError::Config(ConfigError::MissingEnvironment { names })) => {
                assert_eq!(names, vec!["GH_TOKEN", "GITHUB_REPOSITORY"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_preflight_reports_only_missing_repository() {
        let env = EnvConfig::from_pairs([("GH_TOKEN", "t")]);
        match Preflight::validate(&env) {
            Err(ReleaseError::Config(ConfigError::MissingEnvironment { names })) => {
                assert_eq!(names, vec!["GITHUB_REPOSITORY"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_preflight_builds_run_url() {
        let env = EnvConfig::from_pairs([
            ("GH_TOKEN", "t"),
            ("GITHUB_REPOSITORY", "acme/widgets"),
            ("GITHUB_RUN_ID", "42"),
        ]);
        let preflight = Preflight::validate(&env).expect("valid env");
        assert_eq!(preflight.repository.owner, "acme");
        assert_eq!(
            preflight.run_url.as_deref(),
            Some("https://github.com/acme/widgets/actions/runs/42")
        );
        assert_eq!(preflight.api_url, "https://api.github.com");
    }

    #[test]
    fn test_repository_slug_rejects_bad_shapes() {
        assert!(RepositorySlug::parse("acme").is_err());
        assert!(RepositorySlug::parse("/widgets").is_err());
        assert!(RepositorySlug::parse("acme/widgets/extra").is_err());
        assert_eq!(
            RepositorySlug::parse("acme/widgets").map(|s| s.to_string()).ok(),
            Some("acme/widgets".to_string())
        );
    }
}
