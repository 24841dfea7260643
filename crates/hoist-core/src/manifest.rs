//! Deployment descriptor (`manifest.yml`) parsing.
//!
//! The descriptor is optional. A missing or unparsable file yields an empty
//! [`Descriptor`], which means "platform defaults" for every field.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::archive::Package;

/// Reserved descriptor entry name at the package root.
pub const MANIFEST_FILE: &str = "manifest.yml";

/// Normalized settings from the first application block of a descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Descriptor {
    /// Memory limit in MB
    pub memory: Option<u64>,
    /// Disk quota in MB
    pub disk_quota: Option<u64>,
    pub instances: Option<u32>,
    pub env: Option<BTreeMap<String, Value>>,
    /// Route domain name, honored for new applications only
    pub domain: Option<String>,
    /// Route host, defaults to the app name
    pub host: Option<String>,
    pub buildpack: Option<String>,
    /// Start command override
    pub command: Option<String>,
}

impl Descriptor {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Route host for `app`.
    pub fn host_or<'a>(&'a self, app: &'a str) -> &'a str {
        self.host.as_deref().unwrap_or(app)
    }
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    #[serde(default)]
    applications: Vec<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
struct ManifestApplication {
    memory: Option<SizeValue>,
    disk_quota: Option<SizeValue>,
    instances: Option<u32>,
    env: Option<BTreeMap<String, Value>>,
    domain: Option<String>,
    host: Option<String>,
    buildpack: Option<String>,
    command: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Megabytes(u64),
    Text(String),
}

impl SizeValue {
    fn to_mb(&self, field: &str) -> Option<u64> {
        match self {
            Self::Megabytes(mb) => Some(*mb),
            Self::Text(text) => {
                let mb = size_in_mb(text);
                if mb.is_none() {
                    tracing::warn!(field, value = %text, "Ignoring size without a number");
                }
                mb
            }
        }
    }
}

/// Convert a size like `512M` or `2G` to megabytes.
///
/// The unit is the last character: `G` multiplies by 1024, `M` is taken
/// as-is, anything else is treated as `M` with a warning. Returns `None`
/// when the value holds no digits.
pub fn size_in_mb(value: &str) -> Option<u64> {
    let value = value.trim();
    let digits: String = value
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let number: u64 = digits.parse().ok()?;

    match value.chars().last() {
        Some('G') => Some(number.saturating_mul(1024)),
        Some('M') => Some(number),
        _ => {
            tracing::warn!(value, "Invalid unit in value, assuming M");
            Some(number)
        }
    }
}

/// Parse descriptor text. Only `applications[0]` is read.
pub fn parse_descriptor(content: &str) -> Descriptor {
    let manifest: ManifestFile = match serde_yaml::from_str(content) {
        Ok(manifest) => manifest,
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring unparsable {}", MANIFEST_FILE);
            return Descriptor::default();
        }
    };

    // Later blocks are not type-checked.
    let Some(first) = manifest.applications.into_iter().next() else {
        return Descriptor::default();
    };
    let app: ManifestApplication = match serde_yaml::from_value(first) {
        Ok(app) => app,
        Err(err) => {
            tracing::warn!(error = %err, "Ignoring invalid first application in {}", MANIFEST_FILE);
            return Descriptor::default();
        }
    };

    Descriptor {
        memory: app.memory.as_ref().and_then(|v| v.to_mb("memory")),
        disk_quota: app.disk_quota.as_ref().and_then(|v| v.to_mb("disk_quota")),
        instances: app.instances,
        env: app.env,
        domain: app.domain,
        host: app.host,
        buildpack: app.buildpack,
        command: app.command,
    }
}

/// Read the descriptor from a package, if it carries one.
pub fn read_descriptor(package: &Package) -> Descriptor {
    match package.read_text(MANIFEST_FILE) {
        Some(content) if !content.trim().is_empty() => {
            tracing::info!("Using {} found in repository", MANIFEST_FILE);
            parse_descriptor(&content)
        }
        _ => Descriptor::default(),
    }
}
