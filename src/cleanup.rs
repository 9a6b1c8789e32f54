use chrono::{DateTime, Duration, Local};
use std::path::Path;
use tracing::{info, warn};

use crate::error::Result;
use crate::utils::prometheus_metrics::TRASH_FILES_REMOVED_TOTAL;

/// Deletes regular files directly inside `trash_dir` whose modification time
/// is older than `retention_days`. Returns how many were removed.
pub fn run_cleanup(trash_dir: &Path, retention_days: u32) -> Result<usize> {
    let cutoff = Local::now() - Duration::days(i64::from(retention_days));
    sweep_older_than(trash_dir, cutoff)
}

pub fn sweep_older_than(trash_dir: &Path, cutoff: DateTime<Local>) -> Result<usize> {
    if !trash_dir.exists() {
        warn!(trash = %trash_dir.display(), "Trash directory not found");
        return Ok(0);
    }

    let mut removed = 0;
    for entry in std::fs::read_dir(trash_dir)? {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(trash = %trash_dir.display(), error = %e, "Could not read trash entry");
                continue;
            }
        };
        match remove_if_expired(&path, cutoff) {
            Ok(true) => removed += 1,
            Ok(false) => {}
            Err(e) => warn!(file = %path.display(), error = %e, "Skipping trash entry"),
        }
    }

    TRASH_FILES_REMOVED_TOTAL.inc_by(removed as f64);
    info!(removed, "Cleanup complete");
    Ok(removed)
}

/// Removes `path` if it is a regular file last modified before `cutoff`.
fn remove_if_expired(path: &Path, cutoff: DateTime<Local>) -> Result<bool> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Ok(false);
    }
    let modified: DateTime<Local> = metadata.modified()?.into();
    if modified >= cutoff {
        return Ok(false);
    }
    info!(file = %path.display(), "Removing old file");
    std::fs::remove_file(path)?;
    Ok(true)
}
