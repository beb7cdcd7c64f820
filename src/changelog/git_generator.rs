//! Changelog generator reading conventional commits from git.

use super::sections::{ReleaseSection, render_document};
use super::{ChangelogGenerator, ChangelogRequest};
use crate::error::Result;
use crate::git::{ConventionalCommit, Git, release_tag};
use crate::process::CommandRunner;
use semver::Version;

/// Builds changelogs from `git log`, one section per release tag
#[derive(Debug, Clone)]
pub struct GitChangelogGenerator<R> {
    git: Git<R>,
}

impl<R: CommandRunner> GitChangelogGenerator<R> {
    /// Generator running git at the repository root
    pub fn new(git: Git<R>) -> Self {
        Self { git }
    }

    async fn section(&self, request: &ChangelogRequest) -> Result<ReleaseSection> {
        let range = request.range();
        let raw = self.git.log(Some(&range), &request.path).await?;
        let date = raw
            .first()
            .map(|c| c.date.clone())
            .unwrap_or_else(|| chrono::Utc::now().format("%Y-%m-%d").to_string());
        log::debug!(
            "{}: {} commit(s) in {range} -- {}",
            request.package,
            raw.len(),
            request.path
        );
        let commits = raw.iter().map(ConventionalCommit::parse).collect();
        Ok(ReleaseSection::new(request.version.clone(), date, commits))
    }
}

impl<R: CommandRunner> ChangelogGenerator for GitChangelogGenerator<R> {
    async fn generate(&self, request: &ChangelogRequest) -> Result<String> {
        Ok(self.section(request).await?.render())
    }

    async fn generate_document(&self, package: &str, next: &Version, path: &str) -> Result<String> {
        let released = self.git.release_versions(package).await?;

        let mut requests = Vec::with_capacity(released.len() + 1);
        let mut previous: Option<String> = None;
        for version in released.iter().filter(|v| *v <= next) {
            let tag = release_tag(package, version);
            requests.push(ChangelogRequest {
                package: package.to_string(),
                version: version.clone(),
                from: previous.replace(tag.clone()),
                to: tag,
                path: path.to_string(),
            });
        }
        if !released.contains(next) {
            requests.push(ChangelogRequest {
                package: package.to_string(),
                version: next.clone(),
                from: previous,
                to: "HEAD".to_string(),
                path: path.to_string(),
            });
        }

        let mut sections = Vec::with_capacity(requests.len());
        for request in requests.iter().rev() {
            sections.push(self.section(request).await?);
        }
        Ok(render_document(&sections))
    }
}
