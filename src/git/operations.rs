//! Typed git operations over a [`CommandRunner`].

use super::commits::{LOG_FORMAT, RawCommit};
use crate::error::Result;
use crate::process::{CommandRunner, Invocation, OutputMode};
use semver::Version;
use std::path::{Path, PathBuf};

/// Git client bound to one working directory
#[derive(Debug, Clone)]
pub struct Git<R> {
    runner: R,
    cwd: PathBuf,
}

impl<R: CommandRunner> Git<R> {
    /// Client running git in `cwd`
    pub fn new(runner: R, cwd: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            cwd: cwd.into(),
        }
    }

    /// Same client, different working directory
    pub fn at(&self, cwd: impl Into<PathBuf>) -> Self {
        Self {
            runner: self.runner.clone(),
            cwd: cwd.into(),
        }
    }

    /// Working directory of this client
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    async fn run<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.runner
            .execute(&Invocation::git(&self.cwd).args(args))
            .await
    }

    /// SHA of the current HEAD
    pub async fn rev_parse_head(&self) -> Result<String> {
        Ok(self.run(["rev-parse", "HEAD"]).await?.trim().to_string())
    }

    /// Checked-out branch, `None` when HEAD is detached
    pub async fn current_branch(&self) -> Result<Option<String>> {
        let name = self.run(["rev-parse", "--abbrev-ref", "HEAD"]).await?;
        let name = name.trim();
        Ok((!name.is_empty() && name != "HEAD").then(|| name.to_string()))
    }

    /// Full message of a commit
    pub async fn commit_message(&self, rev: &str) -> Result<String> {
        self.run(["log", "-1", "--format=%B", rev]).await
    }

    /// Stage paths
    pub async fn add(&self, paths: &[String]) -> Result<()> {
        self.run(["add", "--"].into_iter().map(str::to_string).chain(paths.iter().cloned()))
            .await
            .map(drop)
    }

    /// Commit the index
    pub async fn commit(&self, message: &str) -> Result<()> {
        self.run(["commit", "-m", message]).await.map(drop)
    }

    /// Commit the index, succeeding even when nothing is staged
    pub async fn commit_allow_empty(&self, message: &str) -> Result<()> {
        self.run(["commit", "--allow-empty", "-m", message])
            .await
            .map(drop)
    }

    /// Commit only the given paths, leaving the rest of the index staged
    pub async fn commit_paths(&self, message: &str, paths: &[String]) -> Result<()> {
        self.run(
            ["commit", "-m", message, "--"]
                .into_iter()
                .map(str::to_string)
                .chain(paths.iter().cloned()),
        )
        .await
        .map(drop)
    }

    /// Create an annotated tag whose message is its own name
    pub async fn create_annotated_tag(&self, tag: &str) -> Result<()> {
        self.run(["tag", "-a", tag, "-m", tag]).await.map(drop)
    }

    /// Delete a local tag
    pub async fn delete_tag(&self, tag: &str) -> Result<()> {
        self.run(["tag", "-d", tag]).await.map(drop)
    }

    /// Delete a tag on the remote
    pub async fn delete_remote_tag(&self, remote: &str, tag: &str) -> Result<()> {
        self.run(["push".to_string(), remote.to_string(), format!(":refs/tags/{tag}")])
            .await
            .map(drop)
    }

    /// Push the branch along with annotated tags reachable from it
    pub async fn push_follow_tags(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(["push", "--follow-tags", remote, branch])
            .await
            .map(drop)
    }

    /// Reset the working tree, index and branch to `rev`
    pub async fn reset_hard(&self, rev: &str) -> Result<()> {
        self.run(["reset", "--hard", rev]).await.map(drop)
    }

    /// Overwrite the remote branch with the local one
    pub async fn force_push(&self, remote: &str, branch: &str) -> Result<()> {
        self.run(["push", remote, branch, "--force"]).await.map(drop)
    }

    /// Fetch remote tags, pruning stale ones
    pub async fn fetch_tags(&self) -> Result<()> {
        self.run(["fetch", "--tags", "--prune"]).await.map(drop)
    }

    /// Discard working-tree changes to the given paths
    pub async fn checkout_paths(&self, paths: &[String]) -> Result<()> {
        self.run(
            ["checkout", "--"]
                .into_iter()
                .map(str::to_string)
                .chain(paths.iter().cloned()),
        )
        .await
        .map(drop)
    }

    /// Whether `path` differs from HEAD (staged, unstaged or untracked)
    pub async fn is_path_modified(&self, path: &str) -> Result<bool> {
        let status = self
            .runner
            .execute(
                &Invocation::git(&self.cwd)
                    .args(["status", "--porcelain", "--", path])
                    .mode(OutputMode::Quiet),
            )
            .await?;
        Ok(!status.trim().is_empty())
    }

    /// Released versions of `package` reachable from HEAD, ascending
    pub async fn release_versions(&self, package: &str) -> Result<Vec<Version>> {
        let prefix = format!("{package}@");
        let listing = self
            .runner
            .execute(
                &Invocation::git(&self.cwd)
                    .args(["tag", "--list", "--merged", "HEAD"])
                    .arg(format!("{prefix}*"))
                    .mode(OutputMode::Quiet),
            )
            .await?;
        let mut versions: Vec<Version> = listing
            .lines()
            .filter_map(|line| line.trim().strip_prefix(&prefix))
            .filter_map(|v| Version::parse(v).ok())
            .collect();
        versions.sort();
        Ok(versions)
    }

    /// Most recent released version of `package`
    pub async fn latest_release(&self, package: &str) -> Result<Option<Version>> {
        Ok(self.release_versions(package).await?.pop())
    }

    /// Whether a local tag named exactly `tag` exists
    pub async fn tag_exists(&self, tag: &str) -> Result<bool> {
        let listing = self
            .runner
            .execute(
                &Invocation::git(&self.cwd)
                    .args(["tag", "--list", tag])
                    .mode(OutputMode::Quiet),
            )
            .await?;
        Ok(listing.lines().any(|line| line.trim() == tag))
    }

    /// Commits in `range` (or all of HEAD's history) touching `path`, newest first
    pub async fn log(&self, range: Option<&str>, path: &str) -> Result<Vec<RawCommit>> {
        let invocation = Invocation::git(&self.cwd)
            .arg("log")
            .arg(format!("--format={LOG_FORMAT}"))
            .arg(range.unwrap_or("HEAD"))
            .args(["--", path])
            .mode(OutputMode::Quiet);
        let output = self.runner.execute(&invocation).await?;
        Ok(RawCommit::parse_log(&output))
    }
}
