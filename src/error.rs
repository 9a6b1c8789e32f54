use std::path::PathBuf;
use thiserror::Error;

/// Custom Result type for this crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// The Error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Configuration validation error: {0}")]
    ConfigValidationError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization/Deserialization error: {source}")]
    SerializationError {
        #[from]
        source: serde_json::Error,
    },

    #[error("YAML error: {source}")]
    YamlError {
        #[from]
        source: serde_yaml::Error,
    },

    #[error("HTTP error: {source}")]
    HttpError {
        #[from]
        source: reqwest::Error,
    },

    #[error("PDF error: {source}")]
    PdfError {
        #[from]
        source: lopdf::Error,
    },

    #[error("Watcher error: {source}")]
    WatcherError {
        #[from]
        source: notify::Error,
    },

    // The two input rejections below are user-visible verbatim in results.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("No text extracted from document")]
    NoTextExtracted,

    #[error("Text sidecar not found: {}", .0.display())]
    SidecarNotFound(PathBuf),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Error in processing step '{step_name}': {source}")]
    StepError {
        step_name: String,
        source: Box<PipelineError>,
    },

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Wraps an error with the name of the pipeline step that produced it.
    pub fn in_step(step_name: &str, source: PipelineError) -> Self {
        PipelineError::StepError {
            step_name: step_name.to_string(),
            source: Box::new(source),
        }
    }
}
