//! Repository host access: branch listing.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::PlatformError;

pub const DEFAULT_API_URL: &str = "https://api.github.com";

pub(crate) const USER_AGENT: &str = concat!("hoist/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Branch {
    pub name: String,
}

impl Branch {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Branches of `owner/repo` in the order the host lists them.
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, PlatformError>;
}

/// GitHub REST API client.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: impl Into<String>, token: Option<String>) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn branches_url(&self, owner: &str, repo: &str) -> String {
        format!("{}/repos/{}/{}/branches", self.api_url, owner, repo)
    }
}

#[async_trait]
impl RepoHost for GitHubClient {
    async fn list_branches(&self, owner: &str, repo: &str) -> Result<Vec<Branch>, PlatformError> {
        let url = self.branches_url(owner, repo);
        tracing::debug!(%url, "Listing branches");

        let mut request = self
            .http
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, format!("token {token}"));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::api(status.as_u16(), body));
        }

        response
            .json::<Vec<Branch>>()
            .await
            .map_err(|e| PlatformError::Decode(e.to_string()))
    }
}
