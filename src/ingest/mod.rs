// src/ingest/mod.rs

pub mod gate;
pub mod probe;

pub use gate::{Ingestor, Stability, StabilityGate};
pub use probe::{
    detect_probe, is_file_ready, DownloadState, ICloudPlaceholderProbe, PresenceProbe, SyncProbe,
    SyncStatus,
};
