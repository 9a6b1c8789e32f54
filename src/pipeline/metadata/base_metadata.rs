use crate::data_model::DocumentInfo;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub const SIDECAR_EXTENSION: &str = "yaml";

/// Metadata-write capability: embeds a record into the document and writes a
/// structured sidecar next to it.
#[async_trait]
pub trait MetadataWriter: Send + Sync {
    fn name(&self) -> &'static str;

    async fn update_embedded(&self, path: &Path, info: &DocumentInfo) -> Result<()>;

    /// Returns the path of the sidecar that was written.
    async fn write_sidecar(&self, path: &Path, info: &DocumentInfo) -> Result<PathBuf>;
}

/// `<path without extension>.yaml`
pub fn yaml_sidecar_path(path: &Path) -> PathBuf {
    path.with_extension(SIDECAR_EXTENSION)
}
