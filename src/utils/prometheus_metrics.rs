// src/utils/prometheus_metrics.rs

use once_cell::sync::Lazy;
use prometheus::{register_counter, register_gauge, register_histogram, Counter, Gauge, Histogram};

// Pipeline
pub static DOCUMENTS_PROCESSED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "papertrail_documents_processed_total",
        "Total number of documents processed successfully."
    )
    .expect("Failed to register DOCUMENTS_PROCESSED_TOTAL counter")
});

pub static DOCUMENTS_FAILED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "papertrail_documents_failed_total",
        "Total number of documents whose processing failed."
    )
    .expect("Failed to register DOCUMENTS_FAILED_TOTAL counter")
});

pub static DOCUMENTS_QUARANTINED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "papertrail_documents_quarantined_total",
        "Total number of documents moved to quarantine."
    )
    .expect("Failed to register DOCUMENTS_QUARANTINED_TOTAL counter")
});

pub static DOCUMENT_PROCESSING_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "papertrail_document_processing_duration_seconds",
        "Histogram of end-to-end document processing durations.",
        vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0]
    )
    .expect("Failed to register papertrail_document_processing_duration_seconds histogram")
});

pub static DOCUMENTS_IN_FLIGHT: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "papertrail_documents_in_flight",
        "Number of documents currently in the pipeline."
    )
    .expect("Failed to register papertrail_documents_in_flight gauge")
});

// Ingestion
pub static FILES_INGESTED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "papertrail_files_ingested_total",
        "Total number of source files copied to pending and retired to trash."
    )
    .expect("Failed to register FILES_INGESTED_TOTAL counter")
});

pub static FILES_UNSTABLE_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "papertrail_files_unstable_total",
        "Total number of source files abandoned because they never became ready."
    )
    .expect("Failed to register FILES_UNSTABLE_TOTAL counter")
});

// Retention
pub static TRASH_FILES_REMOVED_TOTAL: Lazy<Counter> = Lazy::new(|| {
    register_counter!(
        "papertrail_trash_files_removed_total",
        "Total number of expired files removed from trash."
    )
    .expect("Failed to register TRASH_FILES_REMOVED_TOTAL counter")
});
