//! In-memory registry, for tests and short-lived sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::AppRegistry;
use crate::error::RegistryError;

/// Process-local registry, lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    data: Arc<RwLock<BTreeMap<String, String>>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            data: Arc::new(RwLock::new(data)),
        }
    }
}

#[async_trait]
impl AppRegistry for MemoryRegistry {
    async fn get(&self, app: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.data.read().await.get(app).cloned())
    }

    async fn upsert(&self, app: &str, url: &str) -> Result<(), RegistryError> {
        self.data
            .write()
            .await
            .insert(app.to_string(), url.to_string());
        Ok(())
    }

    async fn remove(&self, app: &str) -> Result<bool, RegistryError> {
        Ok(self.data.write().await.remove(app).is_some())
    }

    async fn entries(&self) -> Result<BTreeMap<String, String>, RegistryError> {
        Ok(self.data.read().await.clone())
    }
}
