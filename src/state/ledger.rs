//! Record of durable actions taken during a release.

use crate::error::{ConfigError, Result};
use crate::git::Git;
use crate::process::CommandRunner;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Phase of the release state machine; the ledger stores the last one completed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleasePhase {
    /// Plan built, nothing executed
    #[default]
    Planned,
    /// Every package passed a publish simulation
    DryRunVerified,
    /// New versions and ranges written to manifests
    ManifestsUpdated,
    /// Outstanding dependency rewrites committed
    DepCommitsDone,
    /// Changelogs regenerated on disk
    ChangelogsWritten,
    /// Release commit, tags and push done
    CommittedAndTagged,
    /// Packages published and remote releases created
    PublishedAndReleased,
    /// Run finished
    Done,
}

impl ReleasePhase {
    /// Phase that follows this one
    pub fn successor(self) -> Self {
        match self {
            ReleasePhase::Planned => ReleasePhase::DryRunVerified,
            ReleasePhase::DryRunVerified => ReleasePhase::ManifestsUpdated,
            ReleasePhase::ManifestsUpdated => ReleasePhase::DepCommitsDone,
            ReleasePhase::DepCommitsDone => ReleasePhase::ChangelogsWritten,
            ReleasePhase::ChangelogsWritten => ReleasePhase::CommittedAndTagged,
            ReleasePhase::CommittedAndTagged => ReleasePhase::PublishedAndReleased,
            ReleasePhase::PublishedAndReleased | ReleasePhase::Done => ReleasePhase::Done,
        }
    }
}

impl fmt::Display for ReleasePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReleasePhase::Planned => "PLANNED",
            ReleasePhase::DryRunVerified => "DRY_RUN_VERIFIED",
            ReleasePhase::ManifestsUpdated => "MANIFESTS_UPDATED",
            ReleasePhase::DepCommitsDone => "DEP_COMMITS_DONE",
            ReleasePhase::ChangelogsWritten => "CHANGELOGS_WRITTEN",
            ReleasePhase::CommittedAndTagged => "COMMITTED_AND_TAGGED",
            ReleasePhase::PublishedAndReleased => "PUBLISHED_AND_RELEASED",
            ReleasePhase::Done => "DONE",
        })
    }
}

/// Append-only record of what has durably happened.
///
/// Every `record_*` call must follow the action it records, never precede it.
/// The caller owns the ledger so it outlives an error unwinding the executor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLedger {
    phase: ReleasePhase,
    tags_created: Vec<String>,
    commits_made: usize,
    packages_published: Vec<String>,
    remote_release_ids: BTreeMap<String, u64>,
    files_modified: Vec<PathBuf>,
    push_attempted: bool,
}

impl ExecutionLedger {
    /// Fresh ledger in the `PLANNED` phase
    pub fn new() -> Self {
        Self::default()
    }

    /// Last completed phase
    pub fn phase(&self) -> ReleasePhase {
        self.phase
    }

    /// Mark `phase` as completed
    pub fn complete(&mut self, phase: ReleasePhase) {
        log::debug!("Phase {phase} complete");
        self.phase = phase;
    }

    /// A tag now exists locally
    pub fn record_tag(&mut self, tag: impl Into<String>) {
        self.tags_created.push(tag.into());
    }

    /// A commit now exists on the release branch
    pub fn record_commit(&mut self) {
        self.commits_made += 1;
    }

    /// `name@version` is live on the registry
    pub fn record_publish(&mut self, spec: impl Into<String>) {
        self.packages_published.push(spec.into());
    }

    /// A remote release record exists
    pub fn record_remote_release(&mut self, package: impl Into<String>, id: u64) {
        self.remote_release_ids.insert(package.into(), id);
    }

    /// A working-tree file was rewritten
    pub fn record_file(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if !self.files_modified.contains(&path) {
            self.files_modified.push(path);
        }
    }

    /// A push to the remote was started; the remote may now hold our commits
    pub fn record_push_attempt(&mut self) {
        self.push_attempted = true;
    }

    /// Tags created so far, in creation order
    pub fn tags_created(&self) -> &[String] {
        &self.tags_created
    }

    /// Commits made so far
    pub fn commits_made(&self) -> usize {
        self.commits_made
    }

    /// Published `name@version` specs
    pub fn packages_published(&self) -> &[String] {
        &self.packages_published
    }

    /// Remote release ids by package name
    pub fn remote_release_ids(&self) -> &BTreeMap<String, u64> {
        &self.remote_release_ids
    }

    /// Files rewritten in the working tree
    pub fn files_modified(&self) -> &[PathBuf] {
        &self.files_modified
    }

    /// Whether a push was attempted
    pub fn push_attempted(&self) -> bool {
        self.push_attempted
    }

    /// Anything beyond working-tree edits has happened
    pub fn has_durable_effects(&self) -> bool {
        self.commits_made > 0
            || !self.tags_created.is_empty()
            || self.push_attempted
            || !self.packages_published.is_empty()
            || !self.remote_release_ids.is_empty()
    }
}

/// Repository position captured before the first mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalRepositoryState {
    /// Commit SHA of HEAD
    pub revision: String,
    /// Branch being released
    pub branch: String,
}

impl OriginalRepositoryState {
    /// Snapshot HEAD and the branch name (`branch` overrides detection)
    pub async fn capture<R: CommandRunner>(git: &Git<R>, branch: Option<&str>) -> Result<Self> {
        let revision = git.rev_parse_head().await?;
        let branch = match branch {
            Some(name) => name.to_string(),
            None => git
                .current_branch()
                .await?
                .ok_or(ConfigError::DetachedHead)?,
        };
        log::info!("Release starts from {branch} at {revision}");
        Ok(Self { revision, branch })
    }
}
