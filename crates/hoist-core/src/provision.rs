//! Application and route provisioning.
//!
//! A new application is created from the request and descriptor, then bound
//! to a route on a shared domain. An application that already exists keeps
//! its routing untouched, whatever the descriptor says.
//!
//! Only app creation is fatal. Every route step failure is reported through
//! the notifier and collected as a [`ProvisionWarning`].

use crate::dialog::Notifier;
use crate::error::{DeployError, ProvisionWarning};
use crate::manifest::Descriptor;
use crate::platform::{CreateAppRequest, Platform, Route, SharedDomain};
use crate::request::DeploymentRequest;

#[derive(Debug)]
pub struct ProvisionReport {
    pub app_guid: String,
    /// Whether the application was created by this deployment
    pub created: bool,
    /// Route bound to a newly created application
    pub route: Option<Route>,
    pub warnings: Vec<ProvisionWarning>,
}

pub struct Provisioner<'a> {
    platform: &'a dyn Platform,
    notifier: &'a dyn Notifier,
}

impl<'a> Provisioner<'a> {
    pub fn new(platform: &'a dyn Platform, notifier: &'a dyn Notifier) -> Self {
        Self { platform, notifier }
    }

    pub async fn provision(
        &self,
        request: &DeploymentRequest,
        descriptor: &Descriptor,
        space_guid: &str,
        existing_guid: Option<&str>,
    ) -> Result<ProvisionReport, DeployError> {
        if let Some(guid) = existing_guid {
            tracing::info!(app = %request.app, guid, "Reusing existing application");
            return Ok(ProvisionReport {
                app_guid: guid.to_string(),
                created: false,
                route: None,
                warnings: Vec::new(),
            });
        }

        tracing::info!(app = %request.app, "Application does not exist yet, creating it");
        self.notifier
            .progress(&format!("Creating application {}.", request.app));

        let create = CreateAppRequest::new(&request.app, space_guid).with_descriptor(descriptor);
        let app = self
            .platform
            .create_app(&create)
            .await
            .map_err(|source| DeployError::Provision {
                app: request.app.clone(),
                source,
            })?;
        tracing::info!(app = %request.app, guid = %app.guid, "Application created");

        let host = descriptor.host_or(&request.app);
        let (route, warnings) = match self
            .bind_route(&app.guid, host, descriptor.domain.as_deref(), space_guid)
            .await
        {
            Ok(route) => (Some(route), Vec::new()),
            Err(warning) => {
                tracing::warn!(app = %request.app, "{}", warning);
                self.notifier
                    .progress(&format!("Route setup for {} failed: {}", request.app, warning));
                (None, vec![warning])
            }
        };

        Ok(ProvisionReport {
            app_guid: app.guid,
            created: true,
            route,
            warnings,
        })
    }

    async fn bind_route(
        &self,
        app_guid: &str,
        host: &str,
        domain: Option<&str>,
        space_guid: &str,
    ) -> Result<Route, ProvisionWarning> {
        let domains = self
            .platform
            .list_shared_domains()
            .await
            .map_err(ProvisionWarning::DomainLookup)?;
        let domain = select_domain(&domains, domain).ok_or(ProvisionWarning::NoSharedDomain)?;
        tracing::info!(domain = %domain.name, guid = %domain.guid, host, "Using shared domain");

        let existing = self
            .platform
            .list_routes(host, &domain.guid)
            .await
            .map_err(|source| ProvisionWarning::RouteLookup {
                host: host.to_string(),
                source,
            })?
            .into_iter()
            .find(|route| route.host == host);

        let route = match existing {
            Some(route) => {
                tracing::debug!(route = %route.guid, "Reusing existing route");
                route
            }
            None => self
                .platform
                .create_route(host, &domain.guid, space_guid)
                .await
                .map_err(|source| ProvisionWarning::RouteCreation {
                    host: host.to_string(),
                    source,
                })?,
        };

        tracing::info!(route = %route.guid, app = app_guid, "Binding route to application");
        self.platform
            .associate_route(app_guid, &route.guid)
            .await
            .map_err(|source| ProvisionWarning::RouteAssociation {
                host: host.to_string(),
                source,
            })?;

        Ok(route)
    }
}

/// The named shared domain when available, otherwise the first one.
pub fn select_domain<'d>(
    domains: &'d [SharedDomain],
    wanted: Option<&str>,
) -> Option<&'d SharedDomain> {
    wanted
        .and_then(|name| domains.iter().find(|d| d.name == name))
        .or_else(|| domains.first())
}
