//! Error types for voidstone release operations.
//!
//! Every failure carries enough context (command line, working directory,
//! captured output, manifest path) to diagnose a CI run without re-running it.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for voidstone operations
pub type Result<T> = std::result::Result<T, ReleaseError>;

/// Main error type for all voidstone operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    /// Pre-flight configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Workspace discovery and manifest errors
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    /// Version computation errors
    #[error("Version error: {0}")]
    Version(#[from] VersionError),

    /// Subprocess (git / npm) errors
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Changelog generation errors
    #[error("Changelog error: {0}")]
    Changelog(#[from] ChangelogError),

    /// Release host (GitHub) errors
    #[error("Release host error: {0}")]
    Host(#[from] HostError),

    /// Run report persistence errors
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A background bump computation panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// The release failed and compensating it failed too
    #[error("{original} (rollback also failed: {rollback})")]
    RollbackFailed {
        /// Error that triggered the rollback
        original: Box<ReleaseError>,
        /// Error raised by the rollback itself
        rollback: Box<ReleaseError>,
    },
}

/// Pre-flight configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// One or more required environment variables are unset or empty
    #[error("Missing required environment variables: {}", names.join(", "))]
    MissingEnvironment {
        /// Names of the missing variables
        names: Vec<String>,
    },

    /// Repository identifier is not `owner/repo`
    #[error("Invalid repository identifier '{value}': expected 'owner/repo'")]
    InvalidRepository {
        /// Value that was supplied
        value: String,
    },

    /// Required executable not found on PATH
    #[error("Required executable '{tool}' not found on PATH")]
    ToolNotFound {
        /// Executable name
        tool: String,
    },

    /// HEAD is detached and no branch was given
    #[error("HEAD is detached; pass --branch to name the branch to release from")]
    DetachedHead,

    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

/// Workspace discovery and manifest errors
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// No package.json found walking up from the start directory
    #[error("Could not find package.json in {start} or any parent directory")]
    RootNotFound {
        /// Directory the search started from
        start: PathBuf,
    },

    /// Root `workspaces` field has the wrong shape
    #[error("Invalid workspaces field in {path}: {reason}")]
    InvalidWorkspaces {
        /// Path to the root manifest
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },

    /// Workspace glob pattern could not be compiled
    #[error("Invalid workspace pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// Offending pattern
        pattern: String,
        /// Reason for the error
        reason: String,
    },

    /// Manifest lacks a required field
    #[error("Missing required field '{field}' in {path}")]
    MissingField {
        /// Path to the manifest
        path: PathBuf,
        /// Field name
        field: String,
    },

    /// Manifest could not be read
    #[error("Failed to read {path}: {source}")]
    ManifestRead {
        /// Path to the manifest
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid JSON
    #[error("Malformed package.json in {path}: {source}")]
    ManifestParse {
        /// Path to the manifest
        path: PathBuf,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Manifest could not be written
    #[error("Failed to write {path}: {source}")]
    ManifestWrite {
        /// Path to the manifest
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// Version computation errors
#[derive(Error, Debug)]
pub enum VersionError {
    /// Version parsing failed
    #[error("Failed to parse version '{version}' of '{package}': {source}")]
    ParseFailed {
        /// Package name
        package: String,
        /// Version string
        version: String,
        /// Parsing error
        #[source]
        source: semver::Error,
    },

    /// Bump classification could not be applied
    #[error("Cannot apply {release_type} bump to '{package}' at {version}")]
    UnsupportedBump {
        /// Package name
        package: String,
        /// Current version
        version: String,
        /// Requested release type
        release_type: String,
    },
}

/// Subprocess errors
#[derive(Error, Debug)]
pub enum CommandError {
    /// The executable could not be started
    #[error("Failed to spawn `{command}` in {cwd}: {source}")]
    Spawn {
        /// Rendered command line
        command: String,
        /// Working directory
        cwd: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// The command exited unsuccessfully
    #[error("`{command}` failed in {cwd} ({status}): {}", summarize(stderr, stdout))]
    Failed {
        /// Rendered command line
        command: String,
        /// Working directory
        cwd: PathBuf,
        /// Exit status description
        status: String,
        /// Captured stdout
        stdout: String,
        /// Captured stderr
        stderr: String,
    },

    /// The command exceeded the configured timeout
    #[error("`{command}` in {cwd} timed out after {seconds}s")]
    TimedOut {
        /// Rendered command line
        command: String,
        /// Working directory
        cwd: PathBuf,
        /// Configured limit
        seconds: u64,
    },
}

fn summarize(stderr: &str, stdout: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        stdout.trim().to_string()
    } else {
        stderr.to_string()
    }
}

/// Changelog generation errors
#[derive(Error, Debug)]
pub enum ChangelogError {
    /// Generated changelog has a header and nothing else
    #[error(
        "Generated changelog for '{package}' has no entries; check the commit range and path filter"
    )]
    Empty {
        /// Package name
        package: String,
    },

    /// Generator could not produce text
    #[error("Failed to generate changelog for '{package}': {reason}")]
    Generation {
        /// Package name
        package: String,
        /// Reason for the error
        reason: String,
    },
}

/// Release host (GitHub REST) errors
#[derive(Error, Debug)]
pub enum HostError {
    /// Transport-level failure
    #[error("{operation} request failed: {source}")]
    Request {
        /// Operation name
        operation: String,
        /// Underlying HTTP error
        #[source]
        source: reqwest::Error,
    },

    /// Non-success HTTP status
    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        /// Operation name
        operation: String,
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Response body did not have the expected shape
    #[error("{operation} returned an unexpected response: {reason}")]
    InvalidResponse {
        /// Operation name
        operation: String,
        /// Reason for the error
        reason: String,
    },
}

/// Run report persistence errors
#[derive(Error, Debug)]
pub enum StateError {
    /// Failed to save the report
    #[error("Failed to save run report to {path}: {reason}")]
    SaveFailed {
        /// Target path
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

impl ReleaseError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            ReleaseError::Config(ConfigError::MissingEnvironment { names }) => names
                .iter()
                .map(|name| format!("Export {name} before running the release"))
                .collect(),
            ReleaseError::Config(ConfigError::InvalidRepository { .. }) => vec![
                "Set GITHUB_REPOSITORY to the 'owner/repo' form, e.g. acme/widgets".to_string(),
            ],
            ReleaseError::Config(ConfigError::ToolNotFound { tool }) => {
                vec![format!("Install {tool} and make sure it is on PATH")]
            }
            ReleaseError::Config(ConfigError::DetachedHead) => vec![
                "Check out the release branch: git checkout main".to_string(),
                "Or pass --branch <name> explicitly".to_string(),
            ],
            ReleaseError::Workspace(WorkspaceError::RootNotFound { .. }) => vec![
                "Run from inside an npm project or pass --cwd <dir>".to_string(),
            ],
            ReleaseError::Workspace(WorkspaceError::InvalidWorkspaces { .. }) => vec![
                "The root 'workspaces' field must be an array of glob strings".to_string(),
            ],
            ReleaseError::Changelog(ChangelogError::Empty { package }) => vec![
                format!("Inspect commits for {package}: git log -- <package dir>"),
                "Commits marked [skip ci] are excluded from release notes".to_string(),
            ],
            ReleaseError::Host(HostError::Status { status: 401, .. })
            | ReleaseError::Host(HostError::Status { status: 403, .. }) => vec![
                "Verify GH_TOKEN is valid and has contents and pull-request write access"
                    .to_string(),
            ],
            ReleaseError::Command(CommandError::TimedOut { .. }) => vec![
                "Raise --command-timeout or omit it to wait indefinitely".to_string(),
            ],
            ReleaseError::RollbackFailed { .. } => vec![
                "Rollback did not complete; inspect tags, the branch head and the registry manually"
                    .to_string(),
                "Compare the remote branch with the pre-release revision in the run report"
                    .to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Whether this error was raised before any repository state was touched
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            ReleaseError::Config(_) | ReleaseError::Workspace(WorkspaceError::RootNotFound { .. })
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_environment_lists_every_name() {
        let err = ReleaseError::from(ConfigError::MissingEnvironment {
            names: vec!["GH_TOKEN".to_string(), "GITHUB_REPOSITORY".to_string()],
        });
        let text = err.to_string();
        assert!(text.contains("GH_TOKEN, GITHUB_REPOSITORY"));
        assert_eq!(err.recovery_suggestions().len(), 2);
        assert!(err.is_preflight());
    }

    #[test]
    fn test_command_failure_prefers_stderr() {
        let err = CommandError::Failed {
            command: "git push".to_string(),
            cwd: PathBuf::from("/repo"),
            status: "exit code 1".to_string(),
            stdout: "ignored".to_string(),
            stderr: "rejected\n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "`git push` failed in /repo (exit code 1): rejected"
        );
    }

    #[test]
    fn test_rollback_failure_keeps_original_first() {
        let err = ReleaseError::RollbackFailed {
            original: Box::new(ChangelogError::Empty { package: "a".into() }.into()),
            rollback: Box::new(HostError::InvalidResponse {
                operation: "reopen".into(),
                reason: "boom".into(),
            }
            .into()),
        };
        assert!(err.to_string().starts_with("Changelog error"));
        assert!(!err.is_preflight());
    }
}
