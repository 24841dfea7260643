//! Strip the host-imposed top-level directory from a branch snapshot.

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;

use super::Package;
use crate::error::DeployError;

/// Rewrite every entry of `data` without its shared top-level directory.
///
/// Relative structure and file content are kept. An archive with no
/// entries, or with nothing under the top-level directory, is rejected.
pub fn restructure(data: &[u8]) -> Result<Package, DeployError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(data))
        .map_err(|e| DeployError::Packaging(format!("not a zip archive: {e}")))?;

    if archive.is_empty() {
        return Err(DeployError::Packaging("archive has no entries".into()));
    }

    let prefix = {
        let first = archive
            .by_index(0)
            .map_err(|e| DeployError::Packaging(e.to_string()))?;
        top_level_prefix(first.name())
    };

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let mut entries = Vec::with_capacity(archive.len());

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .map_err(|e| DeployError::Packaging(format!("failed to read entry {i}: {e}")))?;

        let name = file
            .name()
            .strip_prefix(&prefix)
            .ok_or_else(|| {
                DeployError::Packaging(format!(
                    "entry {} is outside top-level directory {}",
                    file.name(),
                    prefix
                ))
            })?
            .to_string();

        if name.is_empty() {
            continue;
        }

        let mut options = SimpleFileOptions::default();
        if let Some(mode) = file.unix_mode() {
            options = options.unix_permissions(mode);
        }

        if file.is_dir() {
            writer
                .add_directory(name.as_str(), options)
                .map_err(|e| DeployError::Packaging(e.to_string()))?;
        } else {
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)
                .map_err(|e| DeployError::Packaging(format!("failed to read {name}: {e}")))?;
            writer
                .start_file(name.as_str(), options)
                .map_err(|e| DeployError::Packaging(e.to_string()))?;
            writer.write_all(&buffer)?;
        }
        entries.push(name);
    }

    if entries.is_empty() {
        return Err(DeployError::Packaging(format!(
            "archive contains nothing under {prefix}"
        )));
    }

    let bytes = writer
        .finish()
        .map_err(|e| DeployError::Packaging(e.to_string()))?
        .into_inner();

    tracing::debug!(prefix = %prefix, entries = entries.len(), "Archive restructured");
    Ok(Package::new(bytes, entries))
}

fn top_level_prefix(name: &str) -> String {
    match name.split_once('/') {
        Some((top, _)) => format!("{top}/"),
        None => format!("{name}/"),
    }
}
