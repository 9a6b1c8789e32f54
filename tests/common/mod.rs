// Shared fixtures: capability mocks that record how they were called.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use papertrail::data_model::DocumentInfo;
use papertrail::error::{PipelineError, Result};
use papertrail::executor::{ProcessingService, ReprocessingService};
use papertrail::pipeline::metadata::yaml_sidecar_path;
use papertrail::pipeline::ocr::text_sidecar_path;
use papertrail::pipeline::storage::FilesystemStorage;
use papertrail::pipeline::{DocumentAnalyzer, DocumentStorage, MetadataWriter, OcrEngine};

/// Writes `text` as the OCR sidecar on `run`, like ocrmypdf does.
pub struct MockOcr {
    pub text: Option<String>,
    pub fail_run: bool,
    pub run_calls: AtomicUsize,
}

impl MockOcr {
    pub fn with_text(text: &str) -> Self {
        MockOcr {
            text: Some(text.to_string()),
            fail_run: false,
            run_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        MockOcr {
            text: None,
            fail_run: true,
            run_calls: AtomicUsize::new(0),
        }
    }

    pub fn runs(&self) -> usize {
        self.run_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    fn name(&self) -> &'static str {
        "mock-ocr"
    }

    async fn run(&self, path: &Path) -> Result<PathBuf> {
        self.run_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_run {
            return Err(PipelineError::OcrFailed("ocrmypdf exited with 2".to_string()));
        }
        if let Some(text) = &self.text {
            std::fs::write(text_sidecar_path(path), text)?;
        }
        Ok(path.to_path_buf())
    }

    async fn extract_text(&self, path: &Path) -> Result<String> {
        let sidecar = text_sidecar_path(path);
        if !sidecar.exists() {
            return Err(PipelineError::SidecarNotFound(sidecar));
        }
        Ok(std::fs::read_to_string(sidecar)?)
    }
}

pub struct MockAnalyzer {
    pub info: DocumentInfo,
    pub fail: bool,
    pub seen: Mutex<Vec<String>>,
}

impl MockAnalyzer {
    pub fn returning(info: DocumentInfo) -> Self {
        MockAnalyzer {
            info,
            fail: false,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        MockAnalyzer {
            info: DocumentInfo::sentinel(),
            fail: true,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentAnalyzer for MockAnalyzer {
    fn name(&self) -> &'static str {
        "mock-analyzer"
    }

    async fn analyze(&self, text: &str) -> Result<DocumentInfo> {
        self.seen.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(PipelineError::AnalysisFailed("model unavailable".to_string()));
        }
        Ok(self.info.clone())
    }
}

/// Records calls; `write_sidecar` writes a small YAML file.
#[derive(Default)]
pub struct MockMetadata {
    pub fail_update: bool,
    pub calls: Mutex<Vec<(&'static str, PathBuf)>>,
}

impl MockMetadata {
    pub fn failing_update() -> Self {
        MockMetadata {
            fail_update: true,
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|(name, _)| *name).collect()
    }
}

#[async_trait]
impl MetadataWriter for MockMetadata {
    fn name(&self) -> &'static str {
        "mock-metadata"
    }

    async fn update_embedded(&self, path: &Path, _info: &DocumentInfo) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(("update_embedded", path.to_path_buf()));
        if self.fail_update {
            return Err(PipelineError::Unexpected("PDF is encrypted".to_string()));
        }
        Ok(())
    }

    async fn write_sidecar(&self, path: &Path, info: &DocumentInfo) -> Result<PathBuf> {
        self.calls
            .lock()
            .unwrap()
            .push(("write_sidecar", path.to_path_buf()));
        let sidecar = yaml_sidecar_path(path);
        std::fs::write(&sidecar, format!("title: {}\n", info.title))?;
        Ok(sidecar)
    }
}

/// Real filesystem storage, with every call recorded.
pub struct RecordingStorage {
    inner: FilesystemStorage,
    pub archived: Mutex<Vec<PathBuf>>,
    pub quarantined: Mutex<Vec<PathBuf>>,
}

impl RecordingStorage {
    pub fn new(base: &Path) -> Self {
        RecordingStorage {
            inner: FilesystemStorage::new(base),
            archived: Mutex::new(Vec::new()),
            quarantined: Mutex::new(Vec::new()),
        }
    }

    pub fn archive_calls(&self) -> usize {
        self.archived.lock().unwrap().len()
    }

    pub fn quarantine_calls(&self) -> usize {
        self.quarantined.lock().unwrap().len()
    }
}

#[async_trait]
impl DocumentStorage for RecordingStorage {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn archive(&self, path: &Path, info: &DocumentInfo) -> Result<PathBuf> {
        self.archived.lock().unwrap().push(path.to_path_buf());
        self.inner.archive(path, info).await
    }

    async fn archive_sidecar(&self, archived_path: &Path, sidecar_path: &Path) -> Result<PathBuf> {
        self.inner.archive_sidecar(archived_path, sidecar_path).await
    }

    async fn quarantine(&self, path: &Path, quarantine_dir: &Path) -> Result<PathBuf> {
        self.quarantined.lock().unwrap().push(path.to_path_buf());
        self.inner.quarantine(path, quarantine_dir).await
    }
}

pub fn stromrechnung() -> DocumentInfo {
    DocumentInfo {
        title: "Stromrechnung".to_string(),
        subject: "Energie".to_string(),
        issuer: "Stadtwerke".to_string(),
        summary: "Jahresabrechnung 2023".to_string(),
        date: NaiveDate::from_ymd_opt(2024, 3, 5),
        tax_relevant: true,
    }
}

/// A temp archive root plus one set of mocks.
pub struct Harness {
    pub dir: TempDir,
    pub ocr: Arc<MockOcr>,
    pub analyzer: Arc<MockAnalyzer>,
    pub metadata: Arc<MockMetadata>,
    pub storage: Arc<RecordingStorage>,
}

impl Harness {
    pub fn new(ocr: MockOcr, analyzer: MockAnalyzer, metadata: MockMetadata) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let storage = Arc::new(RecordingStorage::new(&dir.path().join("archive")));
        Harness {
            dir,
            ocr: Arc::new(ocr),
            analyzer: Arc::new(analyzer),
            metadata: Arc::new(metadata),
            storage,
        }
    }

    pub fn happy() -> Self {
        Self::new(
            MockOcr::with_text("Stadtwerke Musterstadt Jahresabrechnung"),
            MockAnalyzer::returning(stromrechnung()),
            MockMetadata::default(),
        )
    }

    pub fn archive(&self) -> PathBuf {
        self.dir.path().join("archive")
    }

    pub fn quarantine(&self) -> PathBuf {
        self.archive().join(".quarantine")
    }

    pub fn inbox(&self) -> PathBuf {
        let inbox = self.dir.path().join("inbox");
        std::fs::create_dir_all(&inbox).expect("Failed to create inbox");
        inbox
    }

    /// Drops a file with some content into the inbox.
    pub fn input(&self, name: &str) -> PathBuf {
        let path = self.inbox().join(name);
        std::fs::write(&path, b"%PDF-1.4 scanned").expect("Failed to write input");
        path
    }

    pub fn service(&self, with_quarantine: bool) -> ProcessingService {
        ProcessingService::new(
            self.ocr.clone(),
            self.analyzer.clone(),
            self.metadata.clone(),
            self.storage.clone(),
            with_quarantine.then(|| self.quarantine()),
        )
    }

    pub fn reprocessing_service(&self) -> ReprocessingService {
        ReprocessingService::new(self.ocr.clone(), self.analyzer.clone(), self.metadata.clone())
    }
}
