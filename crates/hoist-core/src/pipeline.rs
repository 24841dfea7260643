//! Deployment pipeline: fetch, restructure, parse, provision, upload, launch.
//!
//! Stages run strictly in order. The first fatal error stops the chain and
//! produces exactly one failure notification; resources created by earlier
//! stages are left in place.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::archive::{ArchiveSource, Package, restructure};
use crate::dialog::Notifier;
use crate::error::DeployError;
use crate::launch::{DeploymentOutcome, Launcher, STATUS_CHECK_DELAY, StatusCheck};
use crate::manifest::{Descriptor, read_descriptor};
use crate::platform::{Platform, SpaceTarget};
use crate::provision::{ProvisionReport, Provisioner};
use crate::request::DeploymentRequest;
use crate::upload::Uploader;

/// A deployment that made it through launch.
#[derive(Debug)]
pub struct Deployment {
    pub request: DeploymentRequest,
    pub descriptor: Descriptor,
    pub provision: ProvisionReport,
    status_check: StatusCheck,
}

impl Deployment {
    pub fn app_guid(&self) -> &str {
        &self.provision.app_guid
    }

    /// Wait for the post-start check. A cancelled check counts as unknown.
    pub async fn outcome(self) -> DeploymentOutcome {
        self.status_check
            .wait()
            .await
            .unwrap_or_else(DeploymentOutcome::unknown)
    }

    /// Let the status check run without observing it.
    pub fn detach(self) {
        self.status_check.detach();
    }
}

pub struct DeployPipeline {
    platform: Arc<dyn Platform>,
    archives: Arc<dyn ArchiveSource>,
    notifier: Arc<dyn Notifier>,
    target: SpaceTarget,
    staging_dir: PathBuf,
    status_delay: Duration,
}

impl DeployPipeline {
    pub fn new(
        platform: Arc<dyn Platform>,
        archives: Arc<dyn ArchiveSource>,
        notifier: Arc<dyn Notifier>,
        target: SpaceTarget,
    ) -> Self {
        Self {
            platform,
            archives,
            notifier,
            target,
            staging_dir: std::env::temp_dir().join("hoist"),
            status_delay: STATUS_CHECK_DELAY,
        }
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }

    pub fn with_status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn target(&self) -> &SpaceTarget {
        &self.target
    }

    /// Run every stage for `request`.
    ///
    /// On failure the notifier receives one message carrying the error.
    pub async fn deploy(&self, request: &DeploymentRequest) -> Result<Deployment, DeployError> {
        let result = self.run_stages(request).await;
        if let Err(err) = &result {
            tracing::error!(app = %request.app, error = %err, "Deployment failed");
            self.notifier.progress(&format!(
                "An error occurred deploying {}: {}",
                request.app, err
            ));
        }
        result
    }

    /// Deploy and wait for the post-start check.
    pub async fn deploy_and_wait(&self, request: &DeploymentRequest) -> DeploymentOutcome {
        match self.deploy(request).await {
            Ok(deployment) => deployment.outcome().await,
            Err(err) => DeploymentOutcome::failed(err),
        }
    }

    async fn run_stages(&self, request: &DeploymentRequest) -> Result<Deployment, DeployError> {
        tracing::info!(
            app = %request.app,
            owner = %request.owner,
            repo = %request.repo,
            branch = %request.branch,
            "Beginning deployment"
        );
        self.notifier.progress(&format!(
            "Deploying {} from branch {} of {}.",
            request.app, request.branch, request.url
        ));

        let existing = self
            .platform
            .get_app_by_name(&request.app, &self.target.guid)
            .await
            .map_err(|source| DeployError::Provision {
                app: request.app.clone(),
                source,
            })?;

        let raw = self
            .archives
            .fetch(&request.owner, &request.repo, &request.branch)
            .await?;
        self.notifier
            .progress(&format!("Obtained the source archive for {}.", request.app));

        let package = restructure(&raw)?;
        let descriptor = read_descriptor(&package);
        let staged = self.stage(request, &package).await?;

        let provision = match Provisioner::new(self.platform.as_ref(), self.notifier.as_ref())
            .provision(
                request,
                &descriptor,
                &self.target.guid,
                existing.as_ref().map(|app| app.guid.as_str()),
            )
            .await
        {
            Ok(report) => report,
            Err(err) => {
                staged.remove();
                return Err(err);
            }
        };

        self.notifier.progress(&format!(
            "Uploading {} to {}/{}.",
            request.app, self.target.org, self.target.name
        ));
        let uploaded = Uploader::new(self.platform.as_ref())
            .upload(&provision.app_guid, &staged.file)
            .await;
        staged.remove();
        uploaded?;

        let status_check = Launcher::new(Arc::clone(&self.platform), Arc::clone(&self.notifier))
            .with_delay(self.status_delay)
            .launch(&request.app, &provision.app_guid)
            .await?;

        Ok(Deployment {
            request: request.clone(),
            descriptor,
            provision,
            status_check,
        })
    }

    /// Write the package into a fresh directory under the staging root.
    async fn stage(
        &self,
        request: &DeploymentRequest,
        package: &Package,
    ) -> Result<StagedPackage, DeployError> {
        let stamp = chrono::Utc::now().timestamp_millis();
        tokio::fs::create_dir_all(&self.staging_dir).await?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{stamp}-{}-", path_component(&request.app)))
            .tempdir_in(&self.staging_dir)?;
        let file = dir
            .path()
            .join(format!("{}_{stamp}.zip", path_component(&request.repo)));
        package.write_to(&file).await?;
        tracing::debug!(file = %file.display(), "Package staged");
        Ok(StagedPackage { dir, file })
    }
}

/// Keep only characters that cannot change the meaning of a path.
fn path_component(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

struct StagedPackage {
    dir: tempfile::TempDir,
    file: PathBuf,
}

impl StagedPackage {
    fn remove(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(err) = self.dir.close() {
            tracing::debug!(dir = %path.display(), error = %err, "Failed to remove staging dir");
        }
    }
}
