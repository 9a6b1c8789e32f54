use crate::data_model::DocumentInfo;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Storage capability: final placement of processed and failed documents.
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Moves `path` into the dated archive and returns where it landed.
    async fn archive(&self, path: &Path, info: &DocumentInfo) -> Result<PathBuf>;

    /// Moves a sidecar next to an already archived document, under its base name.
    async fn archive_sidecar(&self, archived_path: &Path, sidecar_path: &Path) -> Result<PathBuf>;

    /// Moves `path` into `quarantine_dir`, keeping its file name where possible.
    async fn quarantine(&self, path: &Path, quarantine_dir: &Path) -> Result<PathBuf>;
}
