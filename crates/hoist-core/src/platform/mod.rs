//! Cloud platform collaborator surface.

pub mod cloud_foundry;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PlatformError;
use crate::manifest::Descriptor;

pub use cloud_foundry::CloudFoundryClient;

/// The org/space deployments land in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaceTarget {
    pub guid: String,
    pub name: String,
    pub org: String,
}

/// An application known to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRecord {
    pub guid: String,
    pub name: String,
    pub space_guid: String,
    /// Whether the app existed before this deployment
    pub existing: bool,
}

/// Body of a create-app call. `None` fields are left to platform defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateAppRequest {
    pub name: String,
    pub space_guid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_quota: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment_json: Option<BTreeMap<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
}

impl CreateAppRequest {
    pub fn new(name: impl Into<String>, space_guid: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            space_guid: space_guid.into(),
            ..Self::default()
        }
    }

    /// Apply the descriptor's resource and runtime settings.
    pub fn with_descriptor(mut self, descriptor: &Descriptor) -> Self {
        self.memory = descriptor.memory;
        self.disk_quota = descriptor.disk_quota;
        self.instances = descriptor.instances;
        self.environment_json = descriptor.env.clone();
        self.buildpack = descriptor.buildpack.clone();
        self.command = descriptor.command.clone();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedDomain {
    pub guid: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub guid: String,
    pub host: String,
    pub domain_guid: String,
}

/// Post-start application summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppSummary {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub routes: Vec<SummaryRoute>,
}

impl AppSummary {
    pub fn is_started(&self) -> bool {
        self.state.eq_ignore_ascii_case("started")
    }

    /// `http://{host}.{domain}` of the first route, if any.
    pub fn first_route_url(&self) -> Option<String> {
        self.routes.first().map(SummaryRoute::url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryRoute {
    pub host: String,
    pub domain: SummaryDomain,
}

impl SummaryRoute {
    pub fn url(&self) -> String {
        if self.host.is_empty() {
            format!("http://{}", self.domain.name)
        } else {
            format!("http://{}.{}", self.host, self.domain.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SummaryDomain {
    pub name: String,
}

/// Platform operations consumed by provisioning, upload, and launch.
///
/// Each call is attempted once; callers never retry.
#[async_trait]
pub trait Platform: Send + Sync {
    async fn get_app_by_name(
        &self,
        name: &str,
        space_guid: &str,
    ) -> Result<Option<AppRecord>, PlatformError>;

    async fn create_app(&self, request: &CreateAppRequest) -> Result<AppRecord, PlatformError>;

    async fn list_shared_domains(&self) -> Result<Vec<SharedDomain>, PlatformError>;

    async fn list_routes(&self, host: &str, domain_guid: &str) -> Result<Vec<Route>, PlatformError>;

    async fn create_route(
        &self,
        host: &str,
        domain_guid: &str,
        space_guid: &str,
    ) -> Result<Route, PlatformError>;

    async fn associate_route(&self, app_guid: &str, route_guid: &str)
    -> Result<(), PlatformError>;

    /// Upload a zip package; returns once the platform has accepted it.
    async fn upload_bits(&self, app_guid: &str, package: &Path) -> Result<(), PlatformError>;

    async fn start_app(&self, app_guid: &str) -> Result<(), PlatformError>;

    async fn get_app_summary(&self, app_guid: &str) -> Result<AppSummary, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_omits_defaults() {
        let request = CreateAppRequest::new("app", "space-guid");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "name": "app", "space_guid": "space-guid" })
        );
    }

    #[test]
    fn create_request_takes_descriptor_fields() {
        let descriptor = Descriptor {
            memory: Some(512),
            instances: Some(3),
            buildpack: Some("go_buildpack".into()),
            host: Some("ignored-here".into()),
            ..Descriptor::default()
        };
        let request = CreateAppRequest::new("app", "space").with_descriptor(&descriptor);
        assert_eq!(request.memory, Some(512));
        assert_eq!(request.instances, Some(3));
        assert_eq!(request.buildpack.as_deref(), Some("go_buildpack"));
        assert_eq!(request.disk_quota, None);
    }

    #[test]
    fn summary_route_url() {
        let summary: AppSummary = serde_json::from_value(serde_json::json!({
            "state": "STARTED",
            "routes": [{ "host": "app", "domain": { "name": "example.com" } }]
        }))
        .unwrap();
        assert!(summary.is_started());
        assert_eq!(
            summary.first_route_url().as_deref(),
            Some("http://app.example.com")
        );
    }

    #[test]
    fn summary_without_routes() {
        let summary: AppSummary =
            serde_json::from_value(serde_json::json!({ "state": "staging" })).unwrap();
        assert!(!summary.is_started());
        assert_eq!(summary.first_route_url(), None);
    }
}
