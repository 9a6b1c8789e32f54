mod common;

use notify::event::{CreateKind, Event, EventKind, ModifyKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::unbounded_channel;

use common::Harness;
use papertrail::ingest::{Ingestor, PresenceProbe, StabilityGate};
use papertrail::utils::text::FilePatterns;
use papertrail::watcher_logic::{consume_events, initial_scan, DocumentHandler};

fn handler(h: &Harness) -> DocumentHandler {
    let patterns = FilePatterns::new(&["*.pdf".to_string(), "*.png".to_string()]).unwrap();
    let gate = StabilityGate::new(
        Arc::new(PresenceProbe),
        Duration::from_millis(10),
        Duration::from_millis(100),
    );
    let ingestor = Ingestor::new(pending(h), trash(h));
    DocumentHandler::new(patterns, gate, ingestor, h.service(true))
}

fn pending(h: &Harness) -> PathBuf {
    h.archive().join(".pending")
}

fn trash(h: &Harness) -> PathBuf {
    h.archive().join(".trash")
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .map(|entries| entries.filter(|e| e.as_ref().unwrap().path().is_file()).count())
        .unwrap_or(0)
}

fn created(path: &Path) -> Event {
    Event::new(EventKind::Create(CreateKind::File)).add_path(path.to_path_buf())
}

#[tokio::test]
async fn test_handle_file_ingests_then_processes() {
    let h = Harness::happy();
    let source = h.input("scan.pdf");

    let result = handler(&h).handle_file(&source).await.expect("file admitted");

    assert!(result.success(), "errors: {:?}", result.errors);
    assert_eq!(result.source_path, pending(&h).join("scan.pdf"));
    assert!(!source.exists());
    assert_eq!(count_files(&trash(&h)), 1);
    assert_eq!(count_files(&pending(&h)), 0);
    assert!(h
        .archive()
        .join("2024/03/Stromrechnung - 2024-03-05.pdf")
        .exists());
}

#[tokio::test]
async fn test_vanished_file_is_skipped() {
    let h = Harness::happy();
    let missing = h.inbox().join("gone.pdf");

    assert!(handler(&h).handle_file(&missing).await.is_none());
    assert_eq!(h.ocr.runs(), 0);
}

#[tokio::test]
async fn test_failed_document_quarantined_from_pending() {
    let h = Harness::happy();
    let source = h.input("photo.png");

    let result = handler(&h).handle_file(&source).await.expect("file admitted");

    assert!(!result.success());
    assert!(h.quarantine().join("photo.png").exists());
    assert_eq!(count_files(&trash(&h)), 1);
    assert_eq!(count_files(&pending(&h)), 0);
}

#[tokio::test]
async fn test_initial_scan_handles_source_and_pending() {
    let h = Harness::happy();
    h.input("one.pdf");
    h.input("ignored.txt");
    std::fs::create_dir_all(pending(&h)).unwrap();
    std::fs::write(pending(&h).join("leftover.pdf"), b"%PDF").unwrap();

    initial_scan(&handler(&h), &h.inbox(), &pending(&h)).await;

    // one.pdf from the source plus leftover.pdf from pending
    assert_eq!(h.ocr.runs(), 2);
    assert_eq!(h.storage.archive_calls(), 2);
    assert!(h.inbox().join("ignored.txt").exists());
    assert_eq!(count_files(&trash(&h)), 1);
    assert_eq!(count_files(&pending(&h)), 0);
}

#[tokio::test]
async fn test_consume_events_filters_and_stops_on_close() {
    let h = Harness::happy();
    let pdf = h.input("scan.pdf");
    let txt = h.input("notes.txt");
    let handler = handler(&h);

    let (tx, mut rx) = unbounded_channel();
    tx.send(Ok(created(&txt))).unwrap();
    tx.send(Ok(Event::new(EventKind::Modify(ModifyKind::Any)).add_path(pdf.clone())))
        .unwrap();
    tx.send(Err(notify::Error::generic("backend hiccup"))).unwrap();
    tx.send(Ok(created(&pdf))).unwrap();
    drop(tx);

    consume_events(&handler, &mut rx, std::future::pending::<()>()).await;

    assert_eq!(h.ocr.runs(), 1);
    assert!(!pdf.exists());
    assert!(txt.exists());
    assert_eq!(h.storage.archive_calls(), 1);
}

#[tokio::test]
async fn test_consume_events_returns_on_shutdown() {
    let h = Harness::happy();
    let handler = handler(&h);
    let (_tx, mut rx) = unbounded_channel();

    tokio::time::timeout(
        Duration::from_secs(5),
        consume_events(&handler, &mut rx, async {}),
    )
    .await
    .expect("consume_events should stop when shutdown resolves");
    assert_eq!(h.ocr.runs(), 0);
}
