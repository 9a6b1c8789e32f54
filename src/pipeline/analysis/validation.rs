// Pre/post-processing around the model call: input capping, delimiting, and
// rejecting answers that look like injection attempts.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::warn;

use crate::data_model::{DocumentInfo, UNKNOWN_ISSUER, UNTITLED};
use crate::utils::text::truncate_chars;

pub const DOC_BEGIN: &str = "<<<DOCUMENT_TEXT_BEGIN>>>";
pub const DOC_END: &str = "<<<DOCUMENT_TEXT_END>>>";

pub const MAX_INPUT_CHARS: usize = 100_000;
pub const TRUNCATION_MARKER: &str = "\n\n[Truncated...]";

// Path traversal, code/markup-like characters, control characters.
static SUSPICIOUS_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.\./|[{}<>`]|[\x00-\x1f]").expect("suspicious-field pattern is valid")
});

/// Caps the text at `MAX_INPUT_CHARS` (appending a marker) and wraps it in delimiters.
pub fn prepare_input(text: &str) -> String {
    let body = match truncate_chars(text, MAX_INPUT_CHARS) {
        Some(truncated) => format!("{}{}", truncated, TRUNCATION_MARKER),
        None => text.to_string(),
    };
    format!("{}\n{}\n{}", DOC_BEGIN, body, DOC_END)
}

pub fn looks_suspicious(text: &str) -> bool {
    !text.is_empty() && SUSPICIOUS_PATTERN.is_match(text)
}

/// Returns the field if it is present and safe, otherwise the fallback.
pub fn sanitize_field(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(text) if !text.is_empty() && !looks_suspicious(text) => text.to_string(),
        _ => fallback.to_string(),
    }
}

fn parse_document_date(value: Option<&Value>) -> Option<NaiveDate> {
    let raw = value?.as_str()?.trim();
    if raw.is_empty() || matches!(raw.to_ascii_lowercase().as_str(), "null" | "unknown" | "none") {
        return None;
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            warn!(date = %raw, "Invalid date format in analysis response");
            None
        }
    }
}

/// Builds a record from the model's JSON object, substituting sentinels for
/// missing or unsafe fields.
pub fn info_from_value(data: &Value) -> DocumentInfo {
    let raw_title = data.get("title").and_then(Value::as_str);
    if let Some(title) = raw_title {
        if looks_suspicious(title) {
            let preview: String = title.chars().take(50).collect();
            warn!(title = %preview, "Suspicious title rejected");
        }
    }

    DocumentInfo {
        title: sanitize_field(raw_title, UNTITLED),
        subject: sanitize_field(data.get("subject").and_then(Value::as_str), ""),
        issuer: sanitize_field(data.get("issuer").and_then(Value::as_str), UNKNOWN_ISSUER),
        // Free-form text, never used in a path
        summary: data
            .get("summary")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        date: parse_document_date(data.get("date")),
        tax_relevant: data
            .get("steuerrelevant")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

/// Parses a raw model answer. Malformed JSON degrades to the sentinel record.
pub fn parse_response(text: &str) -> DocumentInfo {
    match serde_json::from_str::<Value>(text) {
        Ok(data) => info_from_value(&data),
        Err(e) => {
            let preview: String = text.chars().take(200).collect();
            warn!(error = %e, response = %preview, "Invalid JSON response");
            DocumentInfo::sentinel()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_text_not_suspicious() {
        assert!(!looks_suspicious("Rechnung für März"));
        assert!(!looks_suspicious(""));
        assert!(!looks_suspicious("Invoice 2024-03 (copy)"));
    }

    #[test]
    fn test_suspicious_patterns() {
        assert!(looks_suspicious("../../etc/passwd"));
        assert!(looks_suspicious("<script>alert(1)</script>"));
        assert!(looks_suspicious("{\"title\": \"x\"}"));
        assert!(looks_suspicious("`rm -rf`"));
        assert!(looks_suspicious("line\nbreak"));
        assert!(looks_suspicious("null\0byte"));
    }

    #[test]
    fn test_sanitize_field_fallbacks() {
        assert_eq!(sanitize_field(None, "Untitled"), "Untitled");
        assert_eq!(sanitize_field(Some(""), "Untitled"), "Untitled");
        assert_eq!(sanitize_field(Some("<b>x</b>"), "Unknown"), "Unknown");
        assert_eq!(sanitize_field(Some("Stadtwerke"), "Unknown"), "Stadtwerke");
    }

    #[test]
    fn test_prepare_input_wraps_short_text() {
        let prepared = prepare_input("hello");
        assert_eq!(prepared, format!("{}\nhello\n{}", DOC_BEGIN, DOC_END));
    }

    #[test]
    fn test_prepare_input_truncates_long_text() {
        let long = "ä".repeat(MAX_INPUT_CHARS + 10);
        let prepared = prepare_input(&long);
        assert!(prepared.contains(TRUNCATION_MARKER));
        let body = prepared
            .strip_prefix(&format!("{}\n", DOC_BEGIN))
            .and_then(|s| s.strip_suffix(&format!("{}\n{}", TRUNCATION_MARKER, DOC_END)))
            .unwrap();
        assert_eq!(body.chars().count(), MAX_INPUT_CHARS);
    }

    #[test]
    fn test_parse_full_response() {
        let info = parse_response(
            r#"{"title": "Stromrechnung", "subject": "Energie", "issuer": "Stadtwerke",
                "summary": "Jahresabrechnung.", "date": "2024-03-05", "steuerrelevant": true}"#,
        );
        assert_eq!(info.title, "Stromrechnung");
        assert_eq!(info.subject, "Energie");
        assert_eq!(info.issuer, "Stadtwerke");
        assert_eq!(info.summary, "Jahresabrechnung.");
        assert_eq!(info.date, NaiveDate::from_ymd_opt(2024, 3, 5));
        assert!(info.tax_relevant);
    }

    #[test]
    fn test_parse_invalid_json_gives_sentinel() {
        assert_eq!(parse_response("not json at all"), DocumentInfo::sentinel());
    }

    #[test]
    fn test_parse_rejects_injected_fields() {
        let info = parse_response(
            r#"{"title": "../../../etc/passwd", "issuer": "<img src=x>", "subject": "{x}",
                "summary": "ok", "date": "unknown"}"#,
        );
        assert_eq!(info.title, "Untitled");
        assert_eq!(info.issuer, "Unknown");
        assert_eq!(info.subject, "");
        assert!(info.date.is_none());
        assert!(!info.tax_relevant);
    }

    #[test]
    fn test_parse_bad_and_null_dates() {
        assert!(parse_response(r#"{"date": "05.03.2024"}"#).date.is_none());
        assert!(parse_response(r#"{"date": null}"#).date.is_none());
        assert!(parse_response(r#"{"date": "None"}"#).date.is_none());
    }
}
