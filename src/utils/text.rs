// src/utils/text.rs

use glob::{MatchOptions, Pattern};

use crate::error::{PipelineError, Result};

/// Returns the first `max_chars` characters of `text`, or `None` if it is
/// already short enough. Never splits a UTF-8 sequence.
pub fn truncate_chars(text: &str, max_chars: usize) -> Option<&str> {
    text.char_indices()
        .nth(max_chars)
        .map(|(byte_idx, _)| &text[..byte_idx])
}

/// Ordered set of file-name globs. Matching is case-insensitive so scanner
/// output like `SCAN.PDF` is picked up by `*.pdf`.
#[derive(Debug, Clone)]
pub struct FilePatterns {
    patterns: Vec<Pattern>,
}

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

impl FilePatterns {
    pub fn new(patterns: &[String]) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| {
                    PipelineError::ConfigValidationError(format!(
                        "Invalid watch pattern '{}': {}",
                        p, e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(FilePatterns { patterns: compiled })
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.position(file_name).is_some()
    }

    /// Index of the first pattern that matches, used to sweep in pattern order.
    pub fn position(&self, file_name: &str) -> Option<usize> {
        self.patterns
            .iter()
            .position(|pattern| pattern.matches_with(file_name, MATCH_OPTIONS))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
