//! TOML-file backed registry.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::AppRegistry;
use crate::error::RegistryError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    apps: BTreeMap<String, String>,
}

/// Registry persisted as `[apps]` in a TOML file.
///
/// Each read-modify-write holds `write_lock` for its whole duration so two
/// deployments upserting at once cannot drop each other's entries.
#[derive(Debug)]
pub struct FileRegistry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<RegistryFile, RegistryError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(RegistryFile::default()),
            Err(err) => Err(err.into()),
        }
    }

    async fn save(&self, file: &RegistryFile) -> Result<(), RegistryError> {
        let content = toml::to_string_pretty(file)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Readers do not take the lock, so replace the file in one step.
        let staged = self.path.with_extension("toml.tmp");
        tokio::fs::write(&staged, content).await?;
        tokio::fs::rename(&staged, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl AppRegistry for FileRegistry {
    async fn get(&self, app: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.load().await?.apps.remove(app))
    }

    async fn upsert(&self, app: &str, url: &str) -> Result<(), RegistryError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        file.apps.insert(app.to_string(), url.to_string());
        self.save(&file).await?;
        tracing::debug!(app, url, path = %self.path.display(), "Registry entry saved");
        Ok(())
    }

    async fn remove(&self, app: &str) -> Result<bool, RegistryError> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.load().await?;
        let removed = file.apps.remove(app).is_some();
        if removed {
            self.save(&file).await?;
        }
        Ok(removed)
    }

    async fn entries(&self) -> Result<BTreeMap<String, String>, RegistryError> {
        Ok(self.load().await?.apps)
    }
}
