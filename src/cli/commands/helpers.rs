//! Shared helper functions for command execution.

use crate::cli::{Args, RuntimeConfig};
use crate::config::ReleaseSettings;
use crate::error::{ConfigError, ReleaseError, Result};
use crate::git::Git;
use crate::process::CommandRunner;
use crate::workspace::find_repo_root;
use path_absolutize::Absolutize;
use std::path::PathBuf;

/// Workspace root containing `--cwd` (or the current directory)
pub(super) fn resolve_root(args: &Args) -> Result<PathBuf> {
    let start = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let start = start.absolutize()?.to_path_buf();
    find_repo_root(&start)
}

/// `--branch`, or the branch HEAD is on
pub(super) async fn resolve_branch<R: CommandRunner>(args: &Args, git: &Git<R>) -> Result<String> {
    if let Some(branch) = &args.branch {
        return Ok(branch.clone());
    }
    git.current_branch()
        .await?
        .ok_or_else(|| ConfigError::DetachedHead.into())
}

/// Settings for a run rooted at `root`
pub(super) fn settings_from_args(args: &Args, root: PathBuf, branch: String) -> ReleaseSettings {
    ReleaseSettings {
        registry: args.registry.clone(),
        remote: args.remote.clone(),
        lockfile: args.lockfile(),
        command_timeout: args.timeout(),
        ..ReleaseSettings::new(root, branch)
    }
}

/// Print the error's recovery suggestions, if it has any specific ones
pub(super) fn print_recovery_suggestions(config: &RuntimeConfig, error: &ReleaseError) {
    let suggestions = error.recovery_suggestions();
    if suggestions.is_empty() {
        return;
    }
    config.info_println("💡 Recovery suggestions:");
    for suggestion in suggestions {
        config.indent(&format!("• {suggestion}"));
    }
}
