//! Source archive download and repackaging.

mod fetcher;
mod restructure;

use std::io::Read;
use std::path::Path;

use async_trait::async_trait;

use crate::error::DeployError;

pub use fetcher::{ArchiveFetcher, DEFAULT_HOST};
pub use restructure::restructure;

/// Anything that can produce a source snapshot archive for a branch.
#[async_trait]
pub trait ArchiveSource: Send + Sync {
    async fn fetch(&self, owner: &str, repo: &str, branch: &str) -> Result<Vec<u8>, DeployError>;
}

/// A deployable zip archive with the host's top-level directory removed.
#[derive(Debug, Clone)]
pub struct Package {
    bytes: Vec<u8>,
    entries: Vec<String>,
}

impl Package {
    pub(crate) fn new(bytes: Vec<u8>, entries: Vec<String>) -> Self {
        Self { bytes, entries }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Entry names in archive order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Read a file entry as UTF-8 text. `None` when absent or not text.
    pub fn read_text(&self, name: &str) -> Option<String> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&self.bytes)).ok()?;
        let mut file = archive.by_name(name).ok()?;
        let mut content = String::new();
        file.read_to_string(&mut content).ok()?;
        Some(content)
    }

    /// Write the archive to `path`, creating parent directories.
    pub async fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.bytes).await
    }
}
