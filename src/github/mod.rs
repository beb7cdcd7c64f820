//! GitHub integration for release operations

mod release_manager;

pub use release_manager::GitHubReleaseManager;

use crate::config::RepositorySlug;
use crate::error::Result;
use serde::Serialize;

/// Target state of a pull request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    /// Reopened
    Open,
    /// Closed
    Closed,
}

/// Remote release records and pull-request notifications
pub trait ReleaseHost: Send + Sync {
    /// Create a release for `tag`, returning its id
    fn create_release(
        &self,
        repo: &RepositorySlug,
        tag: &str,
        title: &str,
        body: &str,
    ) -> impl Future<Output = Result<u64>> + Send;

    /// Delete a release by id
    fn delete_release(&self, repo: &RepositorySlug, id: u64) -> impl Future<Output = Result<()>> + Send;

    /// Open or close a pull request
    fn update_pull_request(
        &self,
        repo: &RepositorySlug,
        number: u64,
        state: PullRequestState,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Comment on a pull request
    fn create_comment(
        &self,
        repo: &RepositorySlug,
        number: u64,
        body: &str,
    ) -> impl Future<Output = Result<()>> + Send;
}
