//! Cloud Foundry v2 REST API client.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{AppRecord, AppSummary, CreateAppRequest, Platform, Route, SharedDomain, SpaceTarget};
use crate::error::PlatformError;
use crate::github::USER_AGENT;

/// Login settings for [`CloudFoundryClient::login`].
#[derive(Debug, Clone)]
pub struct Credentials {
    pub api: String,
    pub user: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    resources: Vec<Resource<T>>,
}

#[derive(Debug, Deserialize)]
struct Resource<T> {
    metadata: Metadata,
    entity: T,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    guid: String,
}

#[derive(Debug, Deserialize)]
struct NamedEntity {
    name: String,
}

#[derive(Debug, Deserialize)]
struct AppEntity {
    name: String,
    #[serde(default)]
    space_guid: String,
}

#[derive(Debug, Deserialize)]
struct RouteEntity {
    #[serde(default)]
    host: String,
    #[serde(default)]
    domain_guid: String,
}

#[derive(Debug, Deserialize)]
struct Info {
    authorization_endpoint: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    description: Option<String>,
}

/// Authenticated client bound to one API endpoint.
#[derive(Debug, Clone)]
pub struct CloudFoundryClient {
    http: reqwest::Client,
    api: String,
    token: String,
}

impl CloudFoundryClient {
    /// Build a client from an already-issued bearer token.
    pub fn with_token(api: &str, token: impl Into<String>) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            http,
            api: api.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Log in with the password grant against the endpoint's UAA.
    pub async fn login(credentials: &Credentials) -> Result<Self, PlatformError> {
        let http = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        let api = credentials.api.trim_end_matches('/');

        let info: Info = decode(http.get(format!("{api}/v2/info")).send().await?).await?;
        tracing::debug!(auth = %info.authorization_endpoint, "Resolved authorization endpoint");

        let response = http
            .post(format!(
                "{}/oauth/token",
                info.authorization_endpoint.trim_end_matches('/')
            ))
            .basic_auth("cf", Some(""))
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.user.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = match decode(response).await {
            Ok(token) => token,
            Err(PlatformError::Api { status, description }) => {
                return Err(PlatformError::Auth(format!("HTTP {status}: {description}")));
            }
            Err(err) => return Err(err),
        };

        tracing::info!(api, user = %credentials.user, "Logged in to platform");
        Self::with_token(api, token.access_token)
    }

    /// Resolve org and space names to the deployment target.
    pub async fn resolve_space(&self, org: &str, space: &str) -> Result<SpaceTarget, PlatformError> {
        let orgs: Page<NamedEntity> = self
            .get_json("/v2/organizations", &[("q", format!("name:{org}"))])
            .await?;
        let org_guid = orgs
            .resources
            .into_iter()
            .next()
            .map(|r| r.metadata.guid)
            .ok_or_else(|| PlatformError::api(404, format!("organization {org} not found")))?;

        let spaces: Page<NamedEntity> = self
            .get_json(
                "/v2/spaces",
                &[
                    ("q", format!("name:{space}")),
                    ("q", format!("organization_guid:{org_guid}")),
                ],
            )
            .await?;
        let found = spaces
            .resources
            .into_iter()
            .next()
            .ok_or_else(|| PlatformError::api(404, format!("space {space} not found in {org}")))?;

        Ok(SpaceTarget {
            guid: found.metadata.guid,
            name: found.entity.name,
            org: org.to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        let response = self
            .http
            .get(self.url(path))
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, PlatformError> {
    let response = check(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| PlatformError::Decode(e.to_string()))
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let description = serde_json::from_str::<ApiErrorBody>(&body)
        .ok()
        .and_then(|b| b.description)
        .unwrap_or(body);
    Err(PlatformError::api(status.as_u16(), description))
}

#[async_trait]
impl Platform for CloudFoundryClient {
    async fn get_app_by_name(
        &self,
        name: &str,
        space_guid: &str,
    ) -> Result<Option<AppRecord>, PlatformError> {
        let page: Page<AppEntity> = self
            .get_json(
                "/v2/apps",
                &[
                    ("q", format!("name:{name}")),
                    ("q", format!("space_guid:{space_guid}")),
                ],
            )
            .await?;

        Ok(page.resources.into_iter().next().map(|r| AppRecord {
            guid: r.metadata.guid,
            name: r.entity.name,
            space_guid: r.entity.space_guid,
            existing: true,
        }))
    }

    async fn create_app(&self, request: &CreateAppRequest) -> Result<AppRecord, PlatformError> {
        let response = self
            .http
            .post(self.url("/v2/apps"))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;
        let created: Resource<AppEntity> = decode(response).await?;

        Ok(AppRecord {
            guid: created.metadata.guid,
            name: created.entity.name,
            space_guid: request.space_guid.clone(),
            existing: false,
        })
    }

    async fn list_shared_domains(&self) -> Result<Vec<SharedDomain>, PlatformError> {
        let page: Page<NamedEntity> = self.get_json("/v2/shared_domains", &[]).await?;
        Ok(page
            .resources
            .into_iter()
            .map(|r| SharedDomain {
                guid: r.metadata.guid,
                name: r.entity.name,
            })
            .collect())
    }

    async fn list_routes(&self, host: &str, domain_guid: &str) -> Result<Vec<Route>, PlatformError> {
        let page: Page<RouteEntity> = self
            .get_json(
                "/v2/routes",
                &[
                    ("q", format!("host:{host}")),
                    ("q", format!("domain_guid:{domain_guid}")),
                ],
            )
            .await?;
        Ok(page
            .resources
            .into_iter()
            .map(|r| Route {
                guid: r.metadata.guid,
                host: r.entity.host,
                domain_guid: r.entity.domain_guid,
            })
            .collect())
    }

    async fn create_route(
        &self,
        host: &str,
        domain_guid: &str,
        space_guid: &str,
    ) -> Result<Route, PlatformError> {
        let response = self
            .http
            .post(self.url("/v2/routes"))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({
                "host": host,
                "domain_guid": domain_guid,
                "space_guid": space_guid,
            }))
            .send()
            .await?;
        let created: Resource<RouteEntity> = decode(response).await?;

        Ok(Route {
            guid: created.metadata.guid,
            host: host.to_string(),
            domain_guid: domain_guid.to_string(),
        })
    }

    async fn associate_route(
        &self,
        app_guid: &str,
        route_guid: &str,
    ) -> Result<(), PlatformError> {
        let response = self
            .http
            .put(self.url(&format!("/v2/apps/{app_guid}/routes/{route_guid}")))
            .bearer_auth(&self.token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn upload_bits(&self, app_guid: &str, package: &Path) -> Result<(), PlatformError> {
        let bytes = tokio::fs::read(package)
            .await
            .map_err(|e| PlatformError::Decode(format!("{}: {e}", package.display())))?;
        let file_name = package
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "application.zip".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/zip")?;
        let form = Form::new()
            .text("resources", "[]")
            .part("application", part);

        let response = self
            .http
            .put(self.url(&format!("/v2/apps/{app_guid}/bits")))
            .bearer_auth(&self.token)
            .query(&[("async", "false")])
            .multipart(form)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn start_app(&self, app_guid: &str) -> Result<(), PlatformError> {
        let response = self
            .http
            .put(self.url(&format!("/v2/apps/{app_guid}")))
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "state": "STARTED" }))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn get_app_summary(&self, app_guid: &str) -> Result<AppSummary, PlatformError> {
        self.get_json(&format!("/v2/apps/{app_guid}/summary"), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_of_apps_deserializes() {
        let json = r#"{
            "total_results": 1,
            "resources": [
                { "metadata": { "guid": "abc123" },
                  "entity": { "name": "node-helloworld", "space_guid": "space1" } }
            ]
        }"#;
        let page: Page<AppEntity> = serde_json::from_str(json).unwrap();
        assert_eq!(page.resources[0].metadata.guid, "abc123");
        assert_eq!(page.resources[0].entity.name, "node-helloworld");
    }

    #[test]
    fn empty_page_deserializes() {
        let page: Page<RouteEntity> = serde_json::from_str(r#"{"resources": []}"#).unwrap();
        assert!(page.resources.is_empty());
    }

    #[test]
    fn api_root_is_normalized() {
        let client = CloudFoundryClient::with_token("https://api.example.com/", "t").unwrap();
        assert_eq!(client.url("/v2/apps"), "https://api.example.com/v2/apps");
    }
}
