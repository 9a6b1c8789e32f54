use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::error::Result;

/// Download state reported by a sync provider for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadState {
    Current,
    Downloaded,
    NotDownloaded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncStatus {
    pub uploading: bool,
    pub downloading: bool,
    pub download_state: Option<DownloadState>,
}

impl SyncStatus {
    pub fn settled() -> Self {
        SyncStatus {
            uploading: false,
            downloading: false,
            download_state: Some(DownloadState::Current),
        }
    }

    pub fn is_settled(&self) -> bool {
        !self.uploading
            && !self.downloading
            && matches!(
                self.download_state,
                None | Some(DownloadState::Current) | Some(DownloadState::Downloaded)
            )
    }
}

/// Platform sync-readiness probe. `Ok(None)` means the platform has nothing
/// to say about this file.
pub trait SyncProbe: Send + Sync {
    fn name(&self) -> &'static str;

    fn status(&self, path: &Path) -> Result<Option<SyncStatus>>;
}

/// Fallback probe: never has sync information.
#[derive(Debug, Clone, Copy, Default)]
pub struct PresenceProbe;

impl SyncProbe for PresenceProbe {
    fn name(&self) -> &'static str {
        "presence"
    }

    fn status(&self, _path: &Path) -> Result<Option<SyncStatus>> {
        Ok(None)
    }
}

/// iCloud Drive keeps a `.<name>.icloud` placeholder beside a file until its
/// content has been fully materialized.
#[derive(Debug, Clone, Copy, Default)]
pub struct ICloudPlaceholderProbe;

impl ICloudPlaceholderProbe {
    fn placeholder_for(path: &Path) -> Option<std::path::PathBuf> {
        let name = path.file_name()?.to_string_lossy();
        Some(path.with_file_name(format!(".{}.icloud", name)))
    }
}

impl SyncProbe for ICloudPlaceholderProbe {
    fn name(&self) -> &'static str {
        "icloud-placeholder"
    }

    fn status(&self, path: &Path) -> Result<Option<SyncStatus>> {
        let Some(placeholder) = Self::placeholder_for(path) else {
            return Ok(None);
        };
        if placeholder.try_exists()? {
            return Ok(Some(SyncStatus {
                uploading: false,
                downloading: true,
                download_state: Some(DownloadState::NotDownloaded),
            }));
        }
        Ok(Some(SyncStatus::settled()))
    }
}

/// Picks the probe for the watched folder.
pub fn detect_probe(source: &Path) -> Arc<dyn SyncProbe> {
    let in_icloud_drive = source
        .components()
        .any(|c| c.as_os_str() == "Mobile Documents");
    if cfg!(target_os = "macos") && in_icloud_drive {
        Arc::new(ICloudPlaceholderProbe)
    } else {
        Arc::new(PresenceProbe)
    }
}

/// True once the file has content and the probe reports no sync activity.
/// Probe errors fall back to the presence + size check.
pub fn is_file_ready(path: &Path, probe: &dyn SyncProbe) -> bool {
    let size = match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => meta.len(),
        _ => return false,
    };
    if size == 0 {
        return false;
    }

    match probe.status(path) {
        Ok(Some(status)) => {
            if !status.is_settled() {
                debug!(path = %path.display(), ?status, "File still syncing");
            }
            status.is_settled()
        }
        Ok(None) => true,
        Err(e) => {
            debug!(path = %path.display(), error = %e, probe = probe.name(), "Sync probe failed");
            true
        }
    }
}
