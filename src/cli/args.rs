//! Command line argument parsing and validation.
//!
//! Running `voidstone` with no subcommand performs a release of the workspace
//! the current directory belongs to.

use crate::config::DEFAULT_REGISTRY;
use crate::version::ReleaseChannel;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Release orchestrator for npm workspaces
#[derive(Parser, Debug)]
#[command(
    name = "voidstone",
    version,
    about = "Release every changed package of an npm workspace",
    long_about = "Compute version bumps from conventional commits, propagate them to \
internal dependents, write changelogs, tag, publish and create GitHub releases. \
A failure after the first durable change rolls everything back.

Usage:
  voidstone                 # release from the current directory
  voidstone --channel beta  # publish beta prereleases
  voidstone plan            # show what would be released

Requires GH_TOKEN and GITHUB_REPOSITORY in the environment."
)]
pub struct Args {
    /// Subcommand; defaults to `release`
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Directory inside the workspace to release
    #[arg(long, global = true, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Registry to publish to
    #[arg(long, global = true, env = "VOIDSTONE_REGISTRY", default_value = DEFAULT_REGISTRY)]
    pub registry: String,

    /// Git remote to push to
    #[arg(long, global = true, default_value = "origin")]
    pub remote: String,

    /// Branch to release from (defaults to the checked-out branch)
    #[arg(long, global = true, env = "VOIDSTONE_BRANCH")]
    pub branch: Option<String>,

    /// Force every bump onto a release channel
    #[arg(long, global = true, value_enum)]
    pub channel: Option<ReleaseChannel>,

    /// Skip reinstalling and committing the lockfile
    #[arg(long, global = true)]
    pub no_lockfile_sync: bool,

    /// Lockfile kept in sync with rewritten manifests
    #[arg(long, global = true, default_value = "package-lock.json", value_name = "FILE")]
    pub lockfile: String,

    /// Write a JSON run report to this path
    #[arg(long, global = true, value_name = "FILE")]
    pub state_file: Option<PathBuf>,

    /// Abort any single git/npm command running longer than this
    #[arg(long, global = true, value_name = "SECS")]
    pub command_timeout: Option<u64>,

    /// Show extra detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Release every package with releasable changes (default)
    Release,
    /// Show direct bumps and dependency rewrites without changing anything
    Plan,
}

impl Command {
    /// Name used in messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Release => "release",
            Command::Plan => "plan",
        }
    }
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Subcommand to run
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Release)
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        if self.registry.trim().is_empty() {
            return Err("--registry must not be empty".to_string());
        }
        if self.remote.trim().is_empty() {
            return Err("--remote must not be empty".to_string());
        }
        if self.branch.as_deref().is_some_and(|b| b.trim().is_empty()) {
            return Err("--branch must not be empty".to_string());
        }
        if self.command_timeout == Some(0) {
            return Err("--command-timeout must be at least 1 second".to_string());
        }
        Ok(())
    }

    /// Per-command time limit
    pub fn timeout(&self) -> Option<Duration> {
        self.command_timeout.map(Duration::from_secs)
    }

    /// Lockfile to sync, unless disabled
    pub fn lockfile(&self) -> Option<String> {
        (!self.no_lockfile_sync).then(|| self.lockfile.clone())
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Print info message
    pub fn info_println(&self, message: &str) {
        let _ = self.output.info(message);
    }

    /// Print message only in verbose mode
    pub fn verbose_println(&self, message: &str) {
        let _ = self.output.verbose(message);
    }

    /// Print error message (always shown)
    pub fn error_println(&self, message: &str) {
        self.output.error(message);
    }

    /// Print warning message
    pub fn warning_println(&self, message: &str) {
        let _ = self.output.warn(message);
    }

    /// Print success message
    pub fn success_println(&self, message: &str) {
        let _ = self.output.success(message);
    }

    /// Print section header
    pub fn section(&self, title: &str) {
        let _ = self.output.section(title);
    }

    /// Print indented text
    pub fn indent(&self, message: &str) {
        let _ = self.output.indent(message);
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}
