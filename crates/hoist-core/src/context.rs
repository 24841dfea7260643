//! Application context for unified dependency injection.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use crate::archive::ArchiveFetcher;
use crate::config::{ConfigStore, HoistConfig};
use crate::dialog::Notifier;
use crate::github::GitHubClient;
use crate::pipeline::DeployPipeline;
use crate::platform::{CloudFoundryClient, SpaceTarget};
use crate::registry::FileRegistry;

/// Loaded configuration plus factories for the live collaborators.
///
/// Frontends create this once and hand the pieces to the resolver and
/// the pipeline.
#[derive(Debug, Clone)]
pub struct AppContext {
    config: HoistConfig,
    config_dir: PathBuf,
}

impl AppContext {
    pub fn new(config: HoistConfig, config_dir: PathBuf) -> Self {
        Self { config, config_dir }
    }

    /// Load `hoist.toml` from the user config dir and apply env overrides.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&ConfigStore::from_default_dir()?)
    }

    pub fn load_from(store: &ConfigStore) -> anyhow::Result<Self> {
        let config = store.load()?.with_env_overrides();
        Ok(Self::new(config, store.config_dir().to_path_buf()))
    }

    pub fn config(&self) -> &HoistConfig {
        &self.config
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn registry_path(&self) -> PathBuf {
        self.config.registry_path(&self.config_dir)
    }

    pub fn registry(&self) -> FileRegistry {
        FileRegistry::new(self.registry_path())
    }

    pub fn repo_host(&self) -> anyhow::Result<GitHubClient> {
        GitHubClient::new(&self.config.github.api_url, self.config.github.token.clone())
            .context("Failed to create repository host client")
    }

    pub fn archive_fetcher(&self) -> anyhow::Result<ArchiveFetcher> {
        ArchiveFetcher::new(&self.config.github.domain)
    }

    /// Log in and resolve the configured org and space.
    pub async fn connect_platform(&self) -> anyhow::Result<(CloudFoundryClient, SpaceTarget)> {
        let credentials = self.config.platform.credentials()?;
        let (org, space) = self.config.platform.target()?;

        let client = CloudFoundryClient::login(&credentials)
            .await
            .with_context(|| format!("Failed to log in to {}", credentials.api))?;
        let target = client
            .resolve_space(&org, &space)
            .await
            .with_context(|| format!("Failed to resolve space {org}/{space}"))?;

        Ok((client, target))
    }

    /// Build a pipeline against the live platform.
    pub async fn pipeline(&self, notifier: Arc<dyn Notifier>) -> anyhow::Result<DeployPipeline> {
        let (client, target) = self.connect_platform().await?;
        let mut pipeline = DeployPipeline::new(
            Arc::new(client),
            Arc::new(self.archive_fetcher()?),
            notifier,
            target,
        )
        .with_status_delay(self.config.deploy.status_check_delay());

        if let Some(dir) = &self.config.deploy.staging_dir {
            pipeline = pipeline.with_staging_dir(dir);
        }
        Ok(pipeline)
    }
}
