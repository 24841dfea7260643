//! Config store for loading and saving hoist.toml.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{APP_DIR, HoistConfig, parse_config_str, to_toml};

pub const CONFIG_FILE: &str = "hoist.toml";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store rooted at `<config_dir>/hoist`.
    pub fn from_default_dir() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join(APP_DIR);
        Ok(Self::from_dir(dir))
    }

    pub fn from_dir(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        let config_path = config_dir.join(CONFIG_FILE);
        Self {
            config_dir,
            config_path,
        }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file, or defaults when it does not exist.
    pub fn load(&self) -> anyhow::Result<HoistConfig> {
        if !self.config_path.exists() {
            tracing::debug!(path = %self.config_path.display(), "No config file, using defaults");
            return Ok(HoistConfig::new());
        }
        let content = std::fs::read_to_string(&self.config_path).with_context(|| {
            format!("Failed to read config file: {}", self.config_path.display())
        })?;
        parse_config_str(&content).with_context(|| {
            format!("Failed to parse config file: {}", self.config_path.display())
        })
    }

    pub fn save(&self, config: &HoistConfig) -> anyhow::Result<()> {
        let content = to_toml(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::from_dir(temp.path().join("hoist"));
        assert_eq!(store.load().unwrap(), HoistConfig::default());
    }

    #[test]
    fn save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::from_dir(temp.path().join("nested").join("hoist"));

        let mut config = HoistConfig::new();
        config.platform.org = Some("acme".into());
        config.deploy.prompt_timeout_secs = 30;
        store.save(&config).unwrap();

        assert!(store.config_path().exists());
        assert_eq!(store.load().unwrap(), config);
    }

    #[test]
    fn corrupt_file_reports_path() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::from_dir(temp.path());
        std::fs::write(store.config_path(), "[github\n").unwrap();

        let err = store.load().unwrap_err();
        assert!(format!("{err:#}").contains(CONFIG_FILE));
    }
}
