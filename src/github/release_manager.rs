//! GitHub REST client for releases, pull requests and comments

use super::{PullRequestState, ReleaseHost};
use crate::config::RepositorySlug;
use crate::error::{HostError, Result};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;

const API_VERSION: &str = "2022-11-28";

/// GitHub release manager
#[derive(Debug, Clone)]
pub struct GitHubReleaseManager {
    client: Client,
    api_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRelease {
    id: Option<u64>,
}

impl GitHubReleaseManager {
    /// Client for the API at `api_url` authenticated with `token`
    pub fn new(token: impl Into<String>, api_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("voidstone/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| HostError::Request {
                operation: "client setup".to_string(),
                source,
            })?;
        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn request(&self, method: Method, repo: &RepositorySlug, path: &str) -> RequestBuilder {
        let url = format!("{}/repos/{}/{}/{path}", self.api_url, repo.owner, repo.repo);
        self.client
            .request(method, url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    async fn send(&self, operation: &str, request: RequestBuilder) -> Result<Response> {
        log::debug!("GitHub: {operation}");
        let response = request.send().await.map_err(|source| HostError::Request {
            operation: operation.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostError::Status {
                operation: operation.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }
        Ok(response)
    }
}

impl ReleaseHost for GitHubReleaseManager {
    async fn create_release(&self, repo: &RepositorySlug, tag: &str, title: &str, body: &str) -> Result<u64> {
        let operation = format!("create release {tag}");
        let request = self
            .request(Method::POST, repo, "releases")
            .json(&json!({ "tag_name": tag, "name": title, "body": body }));
        let response = self.send(&operation, request).await?;

        let created: CreatedRelease = response.json().await.map_err(|source| HostError::Request {
            operation: operation.clone(),
            source,
        })?;
        let id = created.id.ok_or_else(|| HostError::InvalidResponse {
            operation: operation.clone(),
            reason: "response carried no release id".to_string(),
        })?;
        log::info!("Created GitHub release {tag} (id {id})");
        Ok(id)
    }

    async fn delete_release(&self, repo: &RepositorySlug, id: u64) -> Result<()> {
        let request = self.request(Method::DELETE, repo, &format!("releases/{id}"));
        self.send(&format!("delete release {id}"), request).await?;
        log::info!("Deleted GitHub release {id}");
        Ok(())
    }

    async fn update_pull_request(&self, repo: &RepositorySlug, number: u64, state: PullRequestState) -> Result<()> {
        let request = self
            .request(Method::PATCH, repo, &format!("pulls/{number}"))
            .json(&json!({ "state": state }));
        self.send(&format!("update pull request #{number}"), request)
            .await
            .map(drop)
    }

    async fn create_comment(&self, repo: &RepositorySlug, number: u64, body: &str) -> Result<()> {
        let request = self
            .request(Method::POST, repo, &format!("issues/{number}/comments"))
            .json(&json!({ "body": body }));
        self.send(&format!("comment on #{number}"), request)
            .await
            .map(drop)
    }
}
