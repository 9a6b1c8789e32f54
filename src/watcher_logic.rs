use notify::event::{Event, EventKind};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::data_model::ProcessingResult;
use crate::error::{PipelineError, Result};
use crate::executor::{build_processing_service, ProcessingService};
use crate::ingest::{detect_probe, Ingestor, StabilityGate};
use crate::utils::text::FilePatterns;

/// How long to wait for the notification backend to release the channel on shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

pub type EventReceiver = UnboundedReceiver<notify::Result<Event>>;

/// Drives one source path through the gate, ingestion and the pipeline.
pub struct DocumentHandler {
    patterns: FilePatterns,
    gate: StabilityGate,
    ingestor: Ingestor,
    service: ProcessingService,
}

impl DocumentHandler {
    pub fn new(
        patterns: FilePatterns,
        gate: StabilityGate,
        ingestor: Ingestor,
        service: ProcessingService,
    ) -> Self {
        DocumentHandler {
            patterns,
            gate,
            ingestor,
            service,
        }
    }

    pub fn from_settings(settings: &Settings, service: ProcessingService) -> Result<Self> {
        let probe = detect_probe(&settings.paths.source);
        info!(probe = probe.name(), "Sync probe selected");
        Ok(Self::new(
            FilePatterns::new(&settings.watch.patterns)?,
            StabilityGate::from_settings(settings, probe),
            Ingestor::from_settings(settings),
            service,
        ))
    }

    pub fn patterns(&self) -> &FilePatterns {
        &self.patterns
    }

    pub fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .map(|name| self.patterns.matches(&name.to_string_lossy()))
            .unwrap_or(false)
    }

    /// Gate, ingest, process. Returns `None` when the file was never admitted
    /// or could not be ingested.
    pub async fn handle_file(&self, path: &Path) -> Option<ProcessingResult> {
        info!(path = %path.display(), "New file detected");

        let stability = self.gate.wait(path).await;
        if !stability.admitted() {
            warn!(path = %path.display(), "File never stabilized");
            return None;
        }

        let staged = match self.ingestor.ingest(path).await {
            Ok(staged) => staged,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to ingest");
                return None;
            }
        };
        Some(self.process_staged(&staged).await)
    }

    /// Runs the pipeline on a file already sitting in pending.
    pub async fn process_staged(&self, path: &Path) -> ProcessingResult {
        let result = self.service.process(path, false).await;
        if result.success() {
            info!(
                path = %path.display(),
                output = %result.output_path.as_deref().unwrap_or(path).display(),
                "Processed"
            );
        } else {
            error!(path = %path.display(), errors = ?result.errors, "Processing failed");
        }
        result
    }

    /// Handles every created regular file in `event` that matches a pattern.
    pub async fn handle_event(&self, event: Event) {
        if !matches!(event.kind, EventKind::Create(_)) {
            return;
        }
        for path in event.paths {
            if !path.is_file() || !self.matches(&path) {
                debug!(path = %path.display(), "Ignoring event");
                continue;
            }
            self.handle_file(&path).await;
        }
    }
}

/// Regular files directly inside `dir` matching a pattern, ordered by the
/// first pattern they match and then by name.
pub fn sweep_order(dir: &Path, patterns: &FilePatterns) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if let Some(rank) = patterns.position(&name) {
            found.push((rank, name, entry.path()));
        }
    }
    found.sort();
    Ok(found.into_iter().map(|(_, _, path)| path).collect())
}

/// Startup sweep: files already in the source folder, then leftovers in pending.
pub async fn initial_scan(handler: &DocumentHandler, source: &Path, pending: &Path) {
    match sweep_order(source, handler.patterns()) {
        Ok(paths) => {
            for path in paths {
                handler.handle_file(&path).await;
            }
        }
        Err(e) => warn!(source = %source.display(), error = %e, "Could not scan source directory"),
    }

    if !pending.exists() {
        return;
    }
    match sweep_order(pending, handler.patterns()) {
        Ok(paths) => {
            for path in paths {
                info!(path = %path.display(), "Processing pending file");
                handler.process_staged(&path).await;
            }
        }
        Err(e) => warn!(pending = %pending.display(), error = %e, "Could not scan pending directory"),
    }
}

/// Handles events one at a time until `shutdown` resolves or the channel closes.
/// Shutdown is only observed between events; a document in flight finishes first.
pub async fn consume_events<F>(handler: &DocumentHandler, rx: &mut EventReceiver, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
            received = rx.recv() => {
                match received {
                    Some(Ok(event)) => handler.handle_event(event).await,
                    Some(Err(e)) => warn!(error = %e, "Watcher error"),
                    None => {
                        warn!("Event channel closed");
                        break;
                    }
                }
            }
        }
    }
}

/// Waits until every sender has gone, discarding what is left.
async fn drain(rx: &mut EventReceiver) {
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        let mut dropped = 0usize;
        while rx.recv().await.is_some() {
            dropped += 1;
        }
        dropped
    })
    .await;
    match drained {
        Ok(dropped) => debug!(dropped, "Watcher stopped"),
        Err(_) => warn!("Timed out waiting for the watcher to stop"),
    }
}

/// Runs the watcher daemon until `shutdown` resolves.
pub async fn run_watcher<F>(settings: &Settings, shutdown: F) -> Result<()>
where
    F: Future<Output = ()>,
{
    let source = settings.paths.source.clone();
    if !source.is_dir() {
        return Err(PipelineError::ConfigError(format!(
            "Source directory not found: {}",
            source.display()
        )));
    }
    settings.ensure_dirs()?;

    let service = build_processing_service(settings, Some(settings.paths.quarantine()))?;
    let handler = DocumentHandler::from_settings(settings, service)?;

    // Registered before the sweep so nothing created meanwhile is missed.
    let (tx, mut rx) = unbounded_channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        },
        Config::default(),
    )?;
    watcher.watch(&source, RecursiveMode::NonRecursive)?;

    info!(source = %source.display(), "Watching");
    info!(pending = %settings.paths.pending().display(), "Pending");
    info!(trash = %settings.paths.trash().display(), "Trash");
    info!(quarantine = %settings.paths.quarantine().display(), "Quarantine");
    info!(output = %settings.paths.base.join("yyyy/mm").display(), "Output");
    info!(patterns = ?settings.watch.patterns, "Patterns");

    initial_scan(&handler, &source, &settings.paths.pending()).await;
    consume_events(&handler, &mut rx, shutdown).await;

    drop(watcher);
    drain(&mut rx).await;
    info!("Watcher stopped");
    Ok(())
}
