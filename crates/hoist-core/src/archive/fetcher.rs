//! Download branch snapshots from the repository host.

use anyhow::Context;
use async_trait::async_trait;

use super::ArchiveSource;
use crate::error::DeployError;
use crate::github::USER_AGENT;

pub const DEFAULT_HOST: &str = "github.com";

/// Fetches `{base}/{owner}/{repo}/archive/{branch}.zip`.
#[derive(Debug, Clone)]
pub struct ArchiveFetcher {
    http: reqwest::Client,
    base: String,
}

impl ArchiveFetcher {
    /// `host` is a bare host (`github.com`, https is implied) or a URL
    /// whose scheme should be kept (`http://git.internal`).
    pub fn new(host: &str) -> anyhow::Result<Self> {
        let base = Self::base_url(host)?;
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, base })
    }

    fn base_url(host: &str) -> anyhow::Result<String> {
        let host = host.trim();
        let raw = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        let parsed =
            url::Url::parse(&raw).with_context(|| format!("Invalid repository host: {host}"))?;
        if parsed.host_str().is_none() {
            anyhow::bail!("Invalid repository host: {host}");
        }
        Ok(raw.trim_end_matches('/').to_string())
    }

    pub fn archive_url(&self, owner: &str, repo: &str, branch: &str) -> String {
        format!("{}/{}/{}/archive/{}.zip", self.base, owner, repo, branch)
    }
}

impl Default for ArchiveFetcher {
    fn default() -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("https://{DEFAULT_HOST}"),
        }
    }
}

#[async_trait]
impl ArchiveSource for ArchiveFetcher {
    async fn fetch(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<u8>, DeployError> {
        let url = self.archive_url(owner, repo, branch);
        tracing::info!(%url, "Obtaining application code");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DeployError::Fetch {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::error!(%url, status = %response.status(), "Unable to obtain archive");
            return Err(DeployError::Fetch {
                url,
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| DeployError::Fetch {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        tracing::info!(%url, size = bytes.len(), "Obtained archive");
        Ok(bytes.to_vec())
    }
}
