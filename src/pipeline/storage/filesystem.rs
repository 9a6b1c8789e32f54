use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::base_storage::DocumentStorage;
use super::naming::ArchiveNamer;
use crate::data_model::DocumentInfo;
use crate::error::{PipelineError, Result};
use crate::utils::common::move_file;

/// Archive on the local filesystem, laid out as `<base>/<year>/<month>/`.
#[derive(Debug, Clone)]
pub struct FilesystemStorage {
    namer: ArchiveNamer,
}

impl FilesystemStorage {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        FilesystemStorage {
            namer: ArchiveNamer::new(base),
        }
    }

    pub fn base(&self) -> &Path {
        self.namer.base()
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// `dir/<name>`, or `dir/<stem> (n).<ext>` for the first free `n`.
fn free_destination(dir: &Path, path: &Path) -> Result<PathBuf> {
    let file_name = path.file_name().ok_or_else(|| {
        PipelineError::StorageError(format!("No file name in {}", path.display()))
    })?;
    let mut dest = dir.join(file_name);
    if !dest.exists() {
        return Ok(dest);
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = extension_of(path);
    let mut counter = 1;
    while dest.exists() {
        let candidate = if extension.is_empty() {
            format!("{} ({})", stem, counter)
        } else {
            format!("{} ({}).{}", stem, counter, extension)
        };
        dest = dir.join(candidate);
        counter += 1;
    }
    Ok(dest)
}

#[async_trait]
impl DocumentStorage for FilesystemStorage {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn archive(&self, path: &Path, info: &DocumentInfo) -> Result<PathBuf> {
        // Undated documents file under the current month.
        let date = info.date.unwrap_or_else(|| Local::now().date_naive());
        let relative = self.namer.name_for(date, &info.title, &extension_of(path));
        let dest = self.namer.base().join(&relative);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        move_file(path, &dest).await?;
        info!(stored = %relative.display(), "Document archived");
        Ok(dest)
    }

    async fn archive_sidecar(&self, archived_path: &Path, sidecar_path: &Path) -> Result<PathBuf> {
        let dest = archived_path.with_extension(extension_of(sidecar_path));
        if dest.exists() {
            return Err(PipelineError::StorageError(format!(
                "Sidecar destination already exists: {}",
                dest.display()
            )));
        }
        move_file(sidecar_path, &dest).await?;
        Ok(dest)
    }

    async fn quarantine(&self, path: &Path, quarantine_dir: &Path) -> Result<PathBuf> {
        tokio::fs::create_dir_all(quarantine_dir).await?;
        let dest = free_destination(quarantine_dir, path)?;
        move_file(path, &dest).await?;
        warn!(file = %path.display(), quarantined = %dest.display(), "Quarantined");
        Ok(dest)
    }
}
