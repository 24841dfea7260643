//! Known-app registry: app name to repository reference.
//!
//! The registry is the only state shared between concurrent deployments.
//! Every implementation serializes its writes; concurrent upserts of the
//! same name resolve as last write wins.

mod memory;
mod store;

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::RegistryError;

pub use memory::MemoryRegistry;
pub use store::FileRegistry;

#[async_trait]
pub trait AppRegistry: Send + Sync {
    async fn get(&self, app: &str) -> Result<Option<String>, RegistryError>;

    async fn upsert(&self, app: &str, url: &str) -> Result<(), RegistryError>;

    /// Returns whether an entry was removed.
    async fn remove(&self, app: &str) -> Result<bool, RegistryError>;

    async fn entries(&self) -> Result<BTreeMap<String, String>, RegistryError>;

    async fn is_empty(&self) -> Result<bool, RegistryError> {
        Ok(self.entries().await?.is_empty())
    }
}
