use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// OCR capability: rewrites a PDF in place and leaves a plain-text sidecar next to it.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &'static str;

    /// Runs OCR on `path`, replacing the file. Running twice must be harmless.
    async fn run(&self, path: &Path) -> Result<PathBuf>;

    /// Reads the text produced by `run`. Fails with `SidecarNotFound` if there is none.
    async fn extract_text(&self, path: &Path) -> Result<String>;
}

/// `<path without extension>.txt`
pub fn text_sidecar_path(path: &Path) -> PathBuf {
    path.with_extension("txt")
}
