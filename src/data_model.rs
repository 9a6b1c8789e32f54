use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const UNTITLED: &str = "Untitled";
pub const UNKNOWN_ISSUER: &str = "Unknown";

/// Metadata extracted from a document by the analysis step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub title: String,
    pub subject: String,
    pub issuer: String,
    pub summary: String,
    pub date: Option<NaiveDate>, // The document's own issue date, not processing time
    #[serde(default)]
    pub tax_relevant: bool, // Relevant for a personal tax declaration
}

impl DocumentInfo {
    /// Record used when analysis produced nothing usable.
    pub fn sentinel() -> Self {
        DocumentInfo {
            title: UNTITLED.to_string(),
            subject: String::new(),
            issuer: UNKNOWN_ISSUER.to_string(),
            summary: String::new(),
            date: None,
            tax_relevant: false,
        }
    }
}

impl Default for DocumentInfo {
    fn default() -> Self {
        Self::sentinel()
    }
}

/// Outcome of running one document through the pipeline.
///
/// Built up step by step while the pipeline runs and handed back unchanged
/// once `process`/`reprocess` return.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingResult {
    pub source_path: PathBuf,
    pub document_info: Option<DocumentInfo>,
    pub output_path: Option<PathBuf>, // Archive or quarantine location
    pub sidecar_path: Option<PathBuf>,
    pub text_length: usize,
    pub errors: Vec<String>,
}

impl ProcessingResult {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        ProcessingResult {
            source_path: source_path.into(),
            document_info: None,
            output_path: None,
            sidecar_path: None,
            text_length: 0,
            errors: Vec::new(),
        }
    }

    /// A run only counts as successful when metadata was produced and nothing failed.
    pub fn success(&self) -> bool {
        self.errors.is_empty() && self.document_info.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_result_is_not_success() {
        let result = ProcessingResult::new("/tmp/doc.pdf");
        assert!(result.errors.is_empty());
        assert!(!result.success());
    }

    #[test]
    fn test_info_with_error_is_not_success() {
        let mut result = ProcessingResult::new("/tmp/doc.pdf");
        result.document_info = Some(DocumentInfo::sentinel());
        result.errors.push("boom".to_string());
        assert!(!result.success());
    }

    #[test]
    fn test_info_without_errors_is_success() {
        let mut result = ProcessingResult::new("/tmp/doc.pdf");
        result.document_info = Some(DocumentInfo::sentinel());
        assert!(result.success());
    }

    #[test]
    fn test_sentinel_values() {
        let info = DocumentInfo::default();
        assert_eq!(info.title, "Untitled");
        assert_eq!(info.issuer, "Unknown");
        assert!(info.subject.is_empty());
        assert!(info.date.is_none());
        assert!(!info.tax_relevant);
    }
}
