use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::config::Settings;
use crate::data_model::ProcessingResult;
use crate::error::{PipelineError, Result};
use crate::pipeline::analysis::create_analyzer;
use crate::pipeline::metadata::{yaml_sidecar_path, PdfMetadataWriter};
use crate::pipeline::ocr::{text_sidecar_path, OcrMyPdf};
use crate::pipeline::storage::FilesystemStorage;
use crate::pipeline::{DocumentAnalyzer, DocumentStorage, MetadataWriter, OcrEngine};
use crate::utils::prometheus_metrics::{
    DOCUMENTS_FAILED_TOTAL, DOCUMENTS_IN_FLIGHT, DOCUMENTS_PROCESSED_TOTAL,
    DOCUMENTS_QUARANTINED_TOTAL, DOCUMENT_PROCESSING_DURATION_SECONDS,
};

/// Input rejection: anything without a `.pdf` extension (case-insensitive).
fn check_supported(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("pdf") => Ok(()),
        Some(_) => Err(PipelineError::UnsupportedFileType(format!(
            ".{}",
            path.extension()
                .map(|ext| ext.to_string_lossy())
                .unwrap_or_default()
        ))),
        None => Err(PipelineError::UnsupportedFileType(String::new())),
    }
}

fn step<T>(name: &str, outcome: Result<T>) -> Result<T> {
    outcome.map_err(|e| PipelineError::in_step(name, e))
}

/// OCR, text extraction, analysis and the two metadata writes. Both services
/// run these against a file without moving it.
#[derive(Clone)]
struct InPlaceSteps {
    ocr: Arc<dyn OcrEngine>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    metadata: Arc<dyn MetadataWriter>,
}

impl InPlaceSteps {
    /// Fills in `text_length` and `document_info` as it goes; returns the sidecar path.
    async fn run(&self, path: &Path, result: &mut ProcessingResult) -> Result<PathBuf> {
        step("ocr", self.ocr.run(path).await)?;

        let text = step("extract_text", self.ocr.extract_text(path).await)?;
        result.text_length = text.chars().count();
        if text.trim().is_empty() {
            return Err(PipelineError::NoTextExtracted);
        }

        let info = step("analyze", self.analyzer.analyze(&text).await)?;
        // Attached before the writes so a caller can see what was extracted.
        result.document_info = Some(info.clone());

        step(
            "update_embedded",
            self.metadata.update_embedded(path, &info).await,
        )?;
        step("write_sidecar", self.metadata.write_sidecar(path, &info).await)
    }
}

/// Full pipeline for a newly arrived document, from OCR to its archive slot.
#[derive(Clone)]
pub struct ProcessingService {
    steps: InPlaceSteps,
    storage: Arc<dyn DocumentStorage>,
    quarantine_dir: Option<PathBuf>,
}

impl ProcessingService {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        metadata: Arc<dyn MetadataWriter>,
        storage: Arc<dyn DocumentStorage>,
        quarantine_dir: Option<PathBuf>,
    ) -> Self {
        ProcessingService {
            steps: InPlaceSteps {
                ocr,
                analyzer,
                metadata,
            },
            storage,
            quarantine_dir,
        }
    }

    pub fn quarantine_dir(&self) -> Option<&Path> {
        self.quarantine_dir.as_deref()
    }

    /// Runs one document through the pipeline. Never fails: every error ends
    /// up in the returned result's `errors`, and failed documents are moved
    /// to quarantine when one is configured.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn process(&self, path: &Path, keep_in_place: bool) -> ProcessingResult {
        let timer = DOCUMENT_PROCESSING_DURATION_SECONDS.start_timer();
        DOCUMENTS_IN_FLIGHT.inc();
        info!("Processing document");

        let mut result = ProcessingResult::new(path);
        if let Err(e) = self.run_steps(path, keep_in_place, &mut result).await {
            error!(error = %e, "Processing failed");
            result.errors.push(e.to_string());
        }

        if result.success() {
            DOCUMENTS_PROCESSED_TOTAL.inc();
        } else {
            DOCUMENTS_FAILED_TOTAL.inc();
            self.quarantine_on_error(path, &mut result).await;
        }

        DOCUMENTS_IN_FLIGHT.dec();
        timer.observe_duration();
        result
    }

    async fn run_steps(
        &self,
        path: &Path,
        keep_in_place: bool,
        result: &mut ProcessingResult,
    ) -> Result<()> {
        check_supported(path)?;

        let sidecar = self.steps.run(path, result).await?;
        let info = result
            .document_info
            .clone()
            .ok_or_else(|| PipelineError::Unexpected("analysis produced no record".to_string()))?;

        if keep_in_place {
            result.output_path = Some(path.to_path_buf());
            result.sidecar_path = Some(sidecar);
            info!("Kept in place");
            return Ok(());
        }

        let archived = step("archive", self.storage.archive(path, &info).await)?;
        result.output_path = Some(archived.clone());

        let archived_sidecar = step(
            "archive_sidecar",
            self.storage.archive_sidecar(&archived, &sidecar).await,
        )?;
        result.sidecar_path = Some(archived_sidecar);

        let text_sidecar = text_sidecar_path(path);
        if text_sidecar.exists() {
            step(
                "archive_sidecar",
                self.storage.archive_sidecar(&archived, &text_sidecar).await,
            )?;
        }

        info!(output = %archived.display(), "Stored");
        Ok(())
    }

    /// Moves a failed document and its sidecars into quarantine. Only acts when
    /// a quarantine directory is configured, the result is not a success and
    /// the source still exists. Failures here are logged and recorded, not retried.
    async fn quarantine_on_error(&self, path: &Path, result: &mut ProcessingResult) {
        let Some(quarantine_dir) = self.quarantine_dir.as_deref() else {
            return;
        };
        if result.success() || !path.exists() {
            return;
        }

        match self.storage.quarantine(path, quarantine_dir).await {
            Ok(dest) => {
                DOCUMENTS_QUARANTINED_TOTAL.inc();
                result.output_path = Some(dest);
            }
            Err(e) => {
                error!(error = %e, "Quarantine failed");
                result.errors.push(format!("Quarantine failed: {}", e));
                return;
            }
        }

        for sidecar in [text_sidecar_path(path), yaml_sidecar_path(path)] {
            if !sidecar.exists() {
                continue;
            }
            if let Err(e) = self.storage.quarantine(&sidecar, quarantine_dir).await {
                warn!(sidecar = %sidecar.display(), error = %e, "Could not quarantine sidecar");
                result.errors.push(format!("Quarantine failed: {}", e));
            }
        }
    }
}

/// Refreshes metadata of an archived document where it lies.
#[derive(Clone)]
pub struct ReprocessingService {
    steps: InPlaceSteps,
}

impl ReprocessingService {
    pub fn new(
        ocr: Arc<dyn OcrEngine>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        metadata: Arc<dyn MetadataWriter>,
    ) -> Self {
        ReprocessingService {
            steps: InPlaceSteps {
                ocr,
                analyzer,
                metadata,
            },
        }
    }

    /// Same steps as `ProcessingService::process` up to the sidecar, but the
    /// file is never moved and nothing is quarantined.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn reprocess(&self, path: &Path) -> ProcessingResult {
        let mut result = ProcessingResult::new(path);
        let outcome = match check_supported(path) {
            Ok(()) => self.steps.run(path, &mut result).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(sidecar) => {
                result.output_path = Some(path.to_path_buf());
                result.sidecar_path = Some(sidecar);
                debug!("Reprocessed in place");
            }
            Err(e) => {
                warn!(error = %e, "Reprocessing failed");
                result.errors.push(e.to_string());
            }
        }
        result
    }
}

fn default_adapters(
    settings: &Settings,
) -> Result<(Arc<dyn OcrEngine>, Arc<dyn DocumentAnalyzer>, Arc<dyn MetadataWriter>)> {
    let ocr: Arc<dyn OcrEngine> = Arc::new(OcrMyPdf::new(&settings.ocr.command));
    let analyzer = create_analyzer(&settings.llm)?;
    let metadata: Arc<dyn MetadataWriter> = Arc::new(PdfMetadataWriter::new());
    Ok((ocr, analyzer, metadata))
}

/// Wires the configured adapters into a `ProcessingService`.
pub fn build_processing_service(
    settings: &Settings,
    quarantine_dir: Option<PathBuf>,
) -> Result<ProcessingService> {
    let (ocr, analyzer, metadata) = default_adapters(settings)?;
    let storage: Arc<dyn DocumentStorage> = Arc::new(FilesystemStorage::new(&settings.paths.base));
    Ok(ProcessingService::new(
        ocr,
        analyzer,
        metadata,
        storage,
        quarantine_dir,
    ))
}

pub fn build_reprocessing_service(settings: &Settings) -> Result<ReprocessingService> {
    let (ocr, analyzer, metadata) = default_adapters(settings)?;
    Ok(ReprocessingService::new(ocr, analyzer, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_supported() {
        assert!(check_supported(Path::new("/in/scan.pdf")).is_ok());
        assert!(check_supported(Path::new("/in/SCAN.PDF")).is_ok());

        let err = check_supported(Path::new("/in/letter.docx")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: .docx");

        let err = check_supported(Path::new("/in/README")).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported file type: ");
    }

    #[test]
    fn test_step_error_message_names_step() {
        let err = step::<()>("ocr", Err(PipelineError::OcrFailed("boom".to_string()))).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error in processing step 'ocr': OCR failed: boom"
        );
    }

    #[test]
    fn test_build_services_from_default_settings() {
        let settings = Settings::default();
        let service = build_processing_service(&settings, Some(settings.paths.quarantine())).unwrap();
        assert_eq!(service.quarantine_dir(), Some(settings.paths.quarantine().as_path()));
        assert!(build_reprocessing_service(&settings).is_ok());
    }
}
