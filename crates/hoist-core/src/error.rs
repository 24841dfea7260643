//! Error taxonomy for resolution and the deployment pipeline.

use thiserror::Error;

/// Failure of a call against the platform or the repository host.
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {description}")]
    Api { status: u16, description: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("authentication failed: {0}")]
    Auth(String),
}

impl PlatformError {
    pub fn api(status: u16, description: impl Into<String>) -> Self {
        Self::Api {
            status,
            description: description.into(),
        }
    }
}

/// Failure of the app-name registry store.
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse registry file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize registry: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// The dialog ended without producing a usable deployment request.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("{0}")]
    Declined(String),

    #[error("no response received in time")]
    TimedOut,

    #[error("'{0}' is not a repository reference (expected <owner>/<repo>)")]
    InvalidRepository(String),

    #[error("no application name was given")]
    MissingAppName,

    #[error("'{0}' is not a valid application name (it may not contain '/', '\\' or '..')")]
    InvalidAppName(String),

    #[error("deploy takes at most two arguments, got {0}")]
    TooManyTokens(usize),

    #[error("'{0}' does not select a listed branch")]
    UnknownBranch(String),

    #[error("dialog failed: {0}")]
    Dialog(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Fatal failure of a pipeline stage.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("failed to download {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("invalid source archive: {0}")]
    Packaging(String),

    #[error("failed to provision application {app}: {source}")]
    Provision {
        app: String,
        #[source]
        source: PlatformError,
    },

    #[error("failed to upload application bits: {0}")]
    Upload(String),

    #[error("failed to start application {app}: {source}")]
    Launch {
        app: String,
        #[source]
        source: PlatformError,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Route binding failure during provisioning. Reported, never propagated.
#[derive(Error, Debug)]
pub enum ProvisionWarning {
    #[error("no shared domain is available for routing")]
    NoSharedDomain,

    #[error("failed to list shared domains: {0}")]
    DomainLookup(PlatformError),

    #[error("failed to look up route {host}: {source}")]
    RouteLookup { host: String, source: PlatformError },

    #[error("failed to create route {host}: {source}")]
    RouteCreation { host: String, source: PlatformError },

    #[error("failed to bind route {host}: {source}")]
    RouteAssociation { host: String, source: PlatformError },
}
