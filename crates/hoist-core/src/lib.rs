//! Hoist Core Library
//!
//! Resolves chat-style deploy requests into a repository, branch and app
//! name, then ships the branch snapshot to a Cloud Foundry space.

pub mod archive;
pub mod config;
pub mod context;
pub mod dialog;
pub mod error;
pub mod github;
pub mod launch;
pub mod manifest;
pub mod pipeline;
pub mod platform;
pub mod provision;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod upload;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, HoistConfig};
    pub use crate::context::AppContext;

    // Resolution
    pub use crate::dialog::{Dialog, DialogError, Notifier};
    pub use crate::registry::{AppRegistry, FileRegistry, MemoryRegistry};
    pub use crate::request::{DeploymentRequest, RepoEntry, RepoRef};
    pub use crate::resolver::{DeployCommand, InputResolver};

    // Pipeline
    pub use crate::archive::{ArchiveFetcher, ArchiveSource, Package};
    pub use crate::github::{Branch, GitHubClient, RepoHost};
    pub use crate::launch::{DeploymentOutcome, OutcomeState, StatusCheck};
    pub use crate::manifest::Descriptor;
    pub use crate::pipeline::{DeployPipeline, Deployment};
    pub use crate::platform::{CloudFoundryClient, Platform, SpaceTarget};

    // Errors
    pub use crate::error::{DeployError, PlatformError, ResolutionError};
}
