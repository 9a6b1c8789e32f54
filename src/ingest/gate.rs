use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{info, instrument, warn};

use super::probe::{is_file_ready, SyncProbe};
use crate::config::Settings;
use crate::error::{PipelineError, Result};
use crate::utils::common::{move_file, timestamp_prefix};
use crate::utils::prometheus_metrics::{FILES_INGESTED_TOTAL, FILES_UNSTABLE_TOTAL};

/// How a wait on a freshly seen file ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    Ready,
    /// Never reported ready, but still present with content when time ran out.
    ForcedAfterTimeout,
    Abandoned,
}

impl Stability {
    pub fn admitted(self) -> bool {
        !matches!(self, Stability::Abandoned)
    }
}

/// Polls a file until it is safe to touch or the timeout runs out.
#[derive(Clone)]
pub struct StabilityGate {
    probe: Arc<dyn SyncProbe>,
    poll_interval: Duration,
    timeout: Duration,
}

impl StabilityGate {
    pub fn new(probe: Arc<dyn SyncProbe>, poll_interval: Duration, timeout: Duration) -> Self {
        StabilityGate {
            probe,
            poll_interval,
            timeout,
        }
    }

    pub fn from_settings(settings: &Settings, probe: Arc<dyn SyncProbe>) -> Self {
        Self::new(
            probe,
            settings.watch.poll_interval(),
            settings.watch.stability_timeout(),
        )
    }

    #[instrument(skip(self), fields(probe = self.probe.name()))]
    pub async fn wait(&self, path: &Path) -> Stability {
        let start = Instant::now();
        while start.elapsed() < self.timeout {
            if !path.exists() {
                FILES_UNSTABLE_TOTAL.inc();
                info!(path = %path.display(), "File disappeared before it became ready");
                return Stability::Abandoned;
            }
            if is_file_ready(path, self.probe.as_ref()) {
                return Stability::Ready;
            }
            sleep(self.poll_interval).await;
        }

        warn!(path = %path.display(), "Timeout waiting for file");
        let has_content = std::fs::metadata(path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false);
        if has_content {
            Stability::ForcedAfterTimeout
        } else {
            FILES_UNSTABLE_TOTAL.inc();
            Stability::Abandoned
        }
    }
}

/// Claims a ready source file: copy into pending, retire the original to trash.
#[derive(Debug, Clone)]
pub struct Ingestor {
    pending: PathBuf,
    trash: PathBuf,
}

/// First of `dir/<name>`, `dir/<prefix>_<name>`, `dir/<prefix>_<n>_<name>` that is free.
fn unique_in(dir: &Path, name: &str, prefix: &str, always_prefix: bool) -> PathBuf {
    if !always_prefix {
        let plain = dir.join(name);
        if !plain.exists() {
            return plain;
        }
    }
    let mut candidate = dir.join(format!("{}_{}", prefix, name));
    let mut counter = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{}_{}_{}", prefix, counter, name));
        counter += 1;
    }
    candidate
}

impl Ingestor {
    pub fn new(pending: impl Into<PathBuf>, trash: impl Into<PathBuf>) -> Self {
        Ingestor {
            pending: pending.into(),
            trash: trash.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.paths.pending(), settings.paths.trash())
    }

    pub fn pending(&self) -> &Path {
        &self.pending
    }

    /// Returns the staged copy the pipeline should work on.
    pub async fn ingest(&self, path: &Path) -> Result<PathBuf> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                PipelineError::StorageError(format!("No file name in {}", path.display()))
            })?;
        let prefix = timestamp_prefix();

        tokio::fs::create_dir_all(&self.pending).await?;
        tokio::fs::create_dir_all(&self.trash).await?;

        let staged = unique_in(&self.pending, &name, &prefix, false);
        tokio::fs::copy(path, &staged).await?;
        info!(staged = %staged.display(), "Copied to pending");

        let trashed = unique_in(&self.trash, &name, &prefix, true);
        retire_original(path, &staged, &trashed).await?;

        FILES_INGESTED_TOTAL.inc();
        Ok(staged)
    }
}

/// Moves the source to trash. If that fails the staged copy is removed again,
/// so the file stays claimed by the source folder alone.
async fn retire_original(source: &Path, staged: &Path, trashed: &Path) -> Result<()> {
    if let Err(e) = move_file(source, trashed).await {
        if let Err(cleanup) = tokio::fs::remove_file(staged).await {
            warn!(staged = %staged.display(), error = %cleanup, "Could not roll back staged copy");
        }
        return Err(e);
    }
    info!(trashed = %trashed.display(), "Moved original to trash");
    Ok(())
}
