//! Runtime configuration
//!
//! Settings come from `hoist.toml` in the user config directory. Every field
//! has a default, and the environment overrides the file for the values an
//! operator typically injects at deploy time (endpoints and secrets).

pub mod store;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::archive::DEFAULT_HOST;
use crate::github::DEFAULT_API_URL;
use crate::launch::STATUS_CHECK_DELAY;
use crate::platform::cloud_foundry::Credentials;

pub use store::ConfigStore;

/// Directory name under the platform config dir.
pub const APP_DIR: &str = "hoist";

const DEFAULT_PROMPT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoistConfig {
    pub github: GitHubSettings,
    pub platform: PlatformSettings,
    pub deploy: DeploySettings,
    pub registry: RegistrySettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubSettings {
    /// Host serving archive downloads. A `http://` prefix selects plain HTTP.
    pub domain: String,
    pub api_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            domain: DEFAULT_HOST.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl PlatformSettings {
    /// Login settings, failing on the first missing field.
    pub fn credentials(&self) -> anyhow::Result<Credentials> {
        Ok(Credentials {
            api: required(&self.api, "platform.api")?,
            user: required(&self.user, "platform.user")?,
            password: required(&self.password, "platform.password")?,
        })
    }

    /// `(org, space)` to deploy into.
    pub fn target(&self) -> anyhow::Result<(String, String)> {
        Ok((
            required(&self.org, "platform.org")?,
            required(&self.space, "platform.space")?,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploySettings {
    pub status_check_delay_secs: u64,
    pub prompt_timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staging_dir: Option<PathBuf>,
}

impl Default for DeploySettings {
    fn default() -> Self {
        Self {
            status_check_delay_secs: STATUS_CHECK_DELAY.as_secs(),
            prompt_timeout_secs: DEFAULT_PROMPT_TIMEOUT_SECS,
            staging_dir: None,
        }
    }
}

impl DeploySettings {
    pub fn status_check_delay(&self) -> Duration {
        Duration::from_secs(self.status_check_delay_secs)
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl HoistConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply `HOIST_*` environment overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(domain) = get("HOIST_GITHUB_DOMAIN") {
            self.github.domain = domain;
        }
        if let Some(api) = get("HOIST_GITHUB_API") {
            self.github.api_url = api;
        }
        if let Some(token) = get("HOIST_GITHUB_TOKEN") {
            self.github.token = Some(token);
        }
        if let Some(api) = get("HOIST_PLATFORM_API") {
            self.platform.api = Some(api);
        }
        if let Some(org) = get("HOIST_PLATFORM_ORG") {
            self.platform.org = Some(org);
        }
        if let Some(space) = get("HOIST_PLATFORM_SPACE") {
            self.platform.space = Some(space);
        }
        if let Some(user) = get("HOIST_PLATFORM_USER") {
            self.platform.user = Some(user);
        }
        if let Some(password) = get("HOIST_PLATFORM_PASSWORD") {
            self.platform.password = Some(password);
        }
        if let Some(path) = get("HOIST_REGISTRY") {
            self.registry.path = Some(PathBuf::from(path));
        }
        self
    }

    /// Registry file, defaulting to `apps.toml` next to the config file.
    pub fn registry_path(&self, config_dir: &std::path::Path) -> PathBuf {
        self.registry
            .path
            .clone()
            .unwrap_or_else(|| config_dir.join("apps.toml"))
    }
}

/// Parse `hoist.toml` content.
pub fn parse_config_str(content: &str) -> anyhow::Result<HoistConfig> {
    toml::from_str(content).context("Failed to parse hoist configuration")
}

pub fn to_toml(config: &HoistConfig) -> anyhow::Result<String> {
    toml::to_string_pretty(config).context("Failed to serialize hoist configuration")
}

fn required(value: &Option<String>, key: &str) -> anyhow::Result<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .with_context(|| format!("Missing required setting `{key}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = parse_config_str("").unwrap();
        assert_eq!(config, HoistConfig::default());
        assert_eq!(config.github.domain, "github.com");
        assert_eq!(config.deploy.status_check_delay(), Duration::from_secs(60));
        assert_eq!(config.deploy.prompt_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn parse_partial_sections() {
        let config = parse_config_str(
            r#"
[github]
domain = "http://git.internal"

[platform]
api = "https://api.cf.example.com"
org = "acme"
space = "dev"

[deploy]
status_check_delay_secs = 5
"#,
        )
        .unwrap();

        assert_eq!(config.github.domain, "http://git.internal");
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert_eq!(config.deploy.status_check_delay_secs, 5);
        assert_eq!(config.deploy.prompt_timeout_secs, 300);
        assert_eq!(
            config.platform.target().unwrap(),
            ("acme".to_string(), "dev".to_string())
        );
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("HOIST_GITHUB_DOMAIN", "ghe.example.com"),
            ("HOIST_PLATFORM_USER", "deployer"),
            ("HOIST_PLATFORM_PASSWORD", "secret"),
            ("HOIST_PLATFORM_API", "https://api.cf"),
            ("HOIST_PLATFORM_ORG", ""),
        ]
        .into_iter()
        .collect();

        let mut config = HoistConfig::new();
        config.platform.org = Some("from-file".into());
        let config = config.with_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.github.domain, "ghe.example.com");
        assert_eq!(config.platform.org.as_deref(), Some("from-file"));
        let credentials = config.platform.credentials().unwrap();
        assert_eq!(credentials.user, "deployer");
        assert_eq!(credentials.api, "https://api.cf");
    }

    #[test]
    fn missing_credentials_name_the_key() {
        let err = PlatformSettings::default().credentials().unwrap_err();
        assert!(err.to_string().contains("platform.api"));
    }

    #[test]
    fn registry_path_defaults_next_to_config() {
        let config = HoistConfig::new();
        let dir = std::path::Path::new("/tmp/cfg");
        assert_eq!(config.registry_path(dir), dir.join("apps.toml"));
    }

    #[test]
    fn secrets_are_not_serialized_when_absent() {
        let rendered = to_toml(&HoistConfig::new()).unwrap();
        assert!(!rendered.contains("password"));
        assert!(rendered.contains("[github]"));
    }
}
