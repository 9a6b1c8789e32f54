use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::base_ocr::{text_sidecar_path, OcrEngine};
use crate::error::{PipelineError, Result};
use crate::utils::temp_sibling;

/// OCR via the `ocrmypdf` command line tool (PDF/A output plus a text sidecar).
#[derive(Debug, Clone)]
pub struct OcrMyPdf {
    command: String,
}

impl OcrMyPdf {
    pub fn new(command: impl Into<String>) -> Self {
        OcrMyPdf {
            command: command.into(),
        }
    }

    fn temp_output_path(path: &Path) -> PathBuf {
        temp_sibling(path, "ocr-tmp")
    }
}

impl Default for OcrMyPdf {
    fn default() -> Self {
        OcrMyPdf::new("ocrmypdf")
    }
}

#[async_trait]
impl OcrEngine for OcrMyPdf {
    fn name(&self) -> &'static str {
        "ocrmypdf"
    }

    async fn run(&self, path: &Path) -> Result<PathBuf> {
        info!(path = %path.display(), "Running OCR");

        let sidecar = text_sidecar_path(path);
        let tmp_path = Self::temp_output_path(path);

        let output = Command::new(&self.command)
            .arg("--quiet")
            .arg("--force-ocr")
            .args(["--optimize", "1"])
            .args(["--output-type", "pdfa"])
            .arg("--sidecar")
            .arg(&sidecar)
            .arg(path)
            .arg(&tmp_path)
            .output()
            .await
            .map_err(|e| {
                PipelineError::OcrFailed(format!("failed to start '{}': {}", self.command, e))
            })?;

        if !output.status.success() {
            if tmp_path.exists() {
                if let Err(e) = tokio::fs::remove_file(&tmp_path).await {
                    warn!(path = %tmp_path.display(), error = %e, "Could not remove OCR temp file");
                }
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PipelineError::OcrFailed(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                stderr.trim()
            )));
        }

        tokio::fs::rename(&tmp_path, path).await?;
        debug!(sidecar = %sidecar.display(), "OCR complete (PDF/A + sidecar)");
        Ok(path.to_path_buf())
    }

    async fn extract_text(&self, path: &Path) -> Result<String> {
        let sidecar = text_sidecar_path(path);
        if !sidecar.exists() {
            return Err(PipelineError::SidecarNotFound(sidecar));
        }
        Ok(tokio::fs::read_to_string(&sidecar).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_extract_text_reads_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();
        std::fs::write(dir.path().join("scan.txt"), "Rechnung 42").unwrap();

        let text = OcrMyPdf::default().extract_text(&pdf).await.unwrap();
        assert_eq!(text, "Rechnung 42");
    }

    #[tokio::test]
    async fn test_extract_text_without_sidecar_fails() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let result = OcrMyPdf::default().extract_text(&pdf).await;
        assert!(matches!(result, Err(PipelineError::SidecarNotFound(_))));
    }

    #[test]
    fn test_temp_output_is_not_a_document_name() {
        let tmp = OcrMyPdf::temp_output_path(Path::new("/base/.pending/scan.pdf"));
        assert_eq!(tmp, PathBuf::from("/base/.pending/scan.pdf.ocr-tmp"));
        let patterns = crate::utils::FilePatterns::new(&["*.pdf".to_string()]).unwrap();
        assert!(!patterns.matches("scan.pdf.ocr-tmp"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_ocr_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("scan.pdf");
        std::fs::write(&pdf, b"%PDF-1.4").unwrap();

        let engine = OcrMyPdf::new("papertrail-no-such-ocr-binary");
        let result = engine.run(&pdf).await;
        assert!(matches!(result, Err(PipelineError::OcrFailed(_))));
        assert!(pdf.exists());
    }
}
