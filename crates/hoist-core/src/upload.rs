//! Push packaged bits to the platform.

use std::path::Path;

use crate::error::DeployError;
use crate::platform::Platform;

pub struct Uploader<'a> {
    platform: &'a dyn Platform,
}

impl<'a> Uploader<'a> {
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self { platform }
    }

    /// Upload `package` for `app_guid`, returning once the platform accepted it.
    pub async fn upload(&self, app_guid: &str, package: &Path) -> Result<(), DeployError> {
        if !tokio::fs::try_exists(package).await.unwrap_or(false) {
            return Err(DeployError::Upload(format!(
                "no package at {}",
                package.display()
            )));
        }

        tracing::info!(guid = app_guid, package = %package.display(), "Uploading application bits");
        self.platform
            .upload_bits(app_guid, package)
            .await
            .map_err(|e| DeployError::Upload(e.to_string()))?;
        tracing::info!(guid = app_guid, "Upload accepted");
        Ok(())
    }
}
