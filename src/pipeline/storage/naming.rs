// Archive file naming: untrusted titles in, collision-free relative paths out.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

use crate::data_model::UNTITLED;
use crate::utils::text::truncate_chars;

/// Longest title kept in a file name, leaving room for the date suffix.
pub const MAX_TITLE_LENGTH: usize = 180;

static ILLEGAL_CHARS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[<>:"/\\|?*\x01-\x1f]"#).expect("illegal filename character pattern is valid")
});

static SEPARATOR_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[_\s]+").expect("separator pattern is valid"));

fn trim_dots_and_spaces(name: &str) -> &str {
    name.trim_matches(|c| c == '.' || c == ' ')
}

/// Makes an arbitrary string safe to use as a file name.
///
/// Null bytes are dropped, `..` and characters that are illegal in file names
/// become separators, separator runs collapse to one space, and the result is
/// trimmed of dots and spaces and cut at a word boundary to `max_len` chars.
/// An empty result becomes `Untitled`. Applying it twice changes nothing.
pub fn sanitize_filename(name: &str, max_len: usize) -> String {
    let name = name.replace('\0', "").replace("..", "_");
    let name = ILLEGAL_CHARS.replace_all(&name, "_");
    let name = SEPARATOR_RUNS.replace_all(&name, " ");
    let mut name = trim_dots_and_spaces(&name).to_string();

    if let Some(prefix) = truncate_chars(&name, max_len) {
        let cut = match prefix.rfind(' ') {
            Some(idx) => &prefix[..idx],
            None => prefix,
        };
        name = trim_dots_and_spaces(cut).to_string();
    }

    if name.is_empty() {
        UNTITLED.to_string()
    } else {
        name
    }
}

/// Derives `<year>/<month>/<title> - <date>.<ext>` paths under an archive root.
#[derive(Debug, Clone)]
pub struct ArchiveNamer {
    base: PathBuf,
}

impl ArchiveNamer {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        ArchiveNamer { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn month_dir(date: NaiveDate) -> PathBuf {
        PathBuf::from(date.format("%Y").to_string()).join(date.format("%m").to_string())
    }

    fn file_name(title: &str, date: NaiveDate, counter: Option<u32>, extension: &str) -> String {
        let mut name = format!("{} - {}", title, date.format("%Y-%m-%d"));
        if let Some(n) = counter {
            name.push_str(&format!(" ({})", n));
        }
        if !extension.is_empty() {
            name.push('.');
            name.push_str(extension);
        }
        name
    }

    /// Returns a path relative to the archive root that does not exist yet.
    ///
    /// `title` is sanitized here; `extension` is given without the leading dot.
    pub fn name_for(&self, date: NaiveDate, title: &str, extension: &str) -> PathBuf {
        let title = sanitize_filename(title, MAX_TITLE_LENGTH);
        let dir = Self::month_dir(date);

        let mut relative = dir.join(Self::file_name(&title, date, None, extension));
        let mut counter = 1;
        while self.base.join(&relative).exists() {
            relative = dir.join(Self::file_name(&title, date, Some(counter), extension));
            counter += 1;
        }
        relative
    }
}
