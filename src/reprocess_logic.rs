use chrono::NaiveDate;
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::executor::{build_reprocessing_service, ReprocessingService};
use crate::pipeline::metadata::yaml_sidecar_path;
use crate::utils::common::create_progress_bar;

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

const RANGE_FORMAT_ERROR: &str = "Date range must be YYYY-MM-DD..YYYY-MM-DD";

/// Which archived files a reprocess run should touch.
#[derive(Debug, Clone, Default)]
pub struct ReprocessOptions {
    pub recursive: bool,
    pub dry_run: bool,
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub missing_field: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReprocessSummary {
    pub succeeded: usize,
    pub failed: usize,
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// A PDF file yields itself; a directory yields its PDFs, sorted.
pub fn collect_pdfs(path: &Path, recursive: bool) -> Vec<PathBuf> {
    if path.is_file() {
        return if is_pdf(path) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        };
    }

    let walker = WalkDir::new(path).min_depth(1);
    let walker = if recursive { walker } else { walker.max_depth(1) };
    walker
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_pdf(entry.path()))
        .map(|entry| entry.into_path())
        .sorted()
        .collect()
}

/// Parses `YYYY-MM-DD..YYYY-MM-DD` into an inclusive range.
pub fn parse_date_range(range: &str) -> Result<(NaiveDate, NaiveDate)> {
    let (start, end) = range
        .split_once("..")
        .ok_or_else(|| PipelineError::ConfigValidationError(RANGE_FORMAT_ERROR.to_string()))?;
    if !DATE_PATTERN.is_match(start) || !DATE_PATTERN.is_match(end) {
        return Err(PipelineError::ConfigValidationError(
            RANGE_FORMAT_ERROR.to_string(),
        ));
    }
    let parse = |s: &str| {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
            PipelineError::ConfigValidationError(format!("{} ({}: {})", RANGE_FORMAT_ERROR, s, e))
        })
    };
    let (start, end) = (parse(start)?, parse(end)?);
    if start > end {
        return Err(PipelineError::ConfigValidationError(
            "Start date must be before end date".to_string(),
        ));
    }
    Ok((start, end))
}

/// Date of the first `YYYY/MM` folder pair in `path`, as the 1st of that month.
fn archive_folder_date(path: &Path) -> Option<NaiveDate> {
    let parts: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    let is_digits = |s: &str, len: usize| s.len() == len && s.chars().all(|c| c.is_ascii_digit());
    parts.windows(2).find_map(|pair| {
        if is_digits(&pair[0], 4) && is_digits(&pair[1], 2) {
            let year = pair[0].parse().ok()?;
            let month = pair[1].parse().ok()?;
            Some(NaiveDate::from_ymd_opt(year, month, 1))
        } else {
            None
        }
    })?
}

/// Month granularity: a file under `2024/03/` counts as 2024-03-01, so a range
/// starting mid-month excludes that month.
pub fn in_date_range(path: &Path, start: NaiveDate, end: NaiveDate) -> bool {
    match archive_folder_date(path) {
        Some(folder_date) => start <= folder_date && folder_date <= end,
        None => false,
    }
}

/// True unless the YAML sidecar exists, parses and has a non-null `field`.
pub fn is_missing_field(path: &Path, field: &str) -> bool {
    let sidecar = yaml_sidecar_path(path);
    let content = match std::fs::read_to_string(&sidecar) {
        Ok(content) => content,
        Err(_) => return true,
    };
    match serde_yaml::from_str::<serde_yaml::Value>(&content) {
        Ok(serde_yaml::Value::Mapping(map)) => map
            .get(field)
            .map(serde_yaml::Value::is_null)
            .unwrap_or(true),
        Ok(_) => true,
        Err(e) => {
            warn!(sidecar = %sidecar.display(), error = %e, "Failed to parse sidecar");
            true
        }
    }
}

/// Applies the filters in `options` to the PDFs found under `path`.
pub fn select_for_reprocess(path: &Path, options: &ReprocessOptions) -> Vec<PathBuf> {
    collect_pdfs(path, options.recursive)
        .into_iter()
        .filter(|pdf| match options.date_range {
            Some((start, end)) => in_date_range(pdf, start, end),
            None => true,
        })
        .filter(|pdf| match options.missing_field.as_deref() {
            Some(field) => is_missing_field(pdf, field),
            None => true,
        })
        .collect()
}

/// Reprocesses `files` one after another under a progress bar.
pub async fn reprocess_files(service: &ReprocessingService, files: &[PathBuf]) -> ReprocessSummary {
    let pb = create_progress_bar(
        files.len() as u64,
        "Reprocessing",
        "{msg} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
    );
    let mut summary = ReprocessSummary::default();

    for pdf in files {
        let name = pdf
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let result = service.reprocess(pdf).await;
        if result.success() {
            summary.succeeded += 1;
            if let Some(info) = &result.document_info {
                pb.println(format!("✓ {}: tax_relevant={}", name, info.tax_relevant));
            }
        } else {
            summary.failed += 1;
            pb.println(format!("✗ {}: {:?}", name, result.errors));
        }
        pb.inc(1);
    }

    pb.finish_with_message("Reprocessing complete");
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "Reprocess finished"
    );
    summary
}

/// The `reprocess` command: select, optionally list, then refresh in place.
pub async fn run_reprocess(
    settings: &Settings,
    path: &Path,
    options: &ReprocessOptions,
) -> Result<ReprocessSummary> {
    let files = select_for_reprocess(path, options);
    if files.is_empty() {
        println!("No files to reprocess");
        return Ok(ReprocessSummary::default());
    }

    if options.dry_run {
        println!("Would reprocess {} files:", files.len());
        for file in &files {
            println!("  {}", file.display());
        }
        return Ok(ReprocessSummary::default());
    }

    let service = build_reprocessing_service(settings)?;
    let summary = reprocess_files(&service, &files).await;
    println!(
        "\nReprocessed: {} success, {} errors",
        summary.succeeded, summary.failed
    );
    Ok(summary)
}
