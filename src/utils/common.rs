// src/utils/common.rs

use axum::{http::StatusCode, routing::get, serve, Router};
use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use prometheus::{gather, Encoder, TextEncoder};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::error::Result;

/// `YYYYmmdd_HHMMSS`, used to prefix staged and trashed file names.
pub fn timestamp_prefix() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Scratch path next to `path` with `.{tag}` appended to the full file name
/// (`scan.pdf` -> `scan.pdf.ocr-tmp`), so it never matches a document glob.
pub fn temp_sibling(path: &Path, tag: &str) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".");
    name.push(tag);
    path.with_file_name(name)
}

/// Moves a file, falling back to copy + remove when a rename is not possible
/// (e.g. across filesystems).
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                from = %from.display(),
                to = %to.display(),
                error = %rename_err,
                "Rename failed, copying instead"
            );
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await?;
            Ok(())
        }
    }
}

pub fn create_progress_bar(total_items: u64, message: &str, template: &str) -> ProgressBar {
    let pb = if total_items == 0 {
        ProgressBar::new_spinner()
    } else {
        ProgressBar::new(total_items)
    };
    pb.set_message(message.to_string());
    pb.set_style(
        ProgressStyle::default_bar()
            .template(template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    pb
}

async fn metrics_handler() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&gather(), &mut buffer) {
        error!("Could not encode prometheus metrics: {}", e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Could not encode prometheus metrics: {}", e),
        );
    }
    match String::from_utf8(buffer) {
        Ok(s) => (StatusCode::OK, s),
        Err(e) => {
            error!("Prometheus metrics UTF-8 error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Prometheus metrics UTF-8 error: {}", e),
            )
        }
    }
}

/// Serves `/metrics` in the background when a port is configured.
pub async fn setup_prometheus_metrics(metrics_port: Option<u16>) -> Result<()> {
    let Some(port) = metrics_port else {
        info!("Prometheus metrics endpoint not configured (no port specified).");
        return Ok(());
    };

    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener_addr = format!("0.0.0.0:{}", port);
    info!(
        "Metrics endpoint will be available at http://{}/metrics",
        listener_addr
    );

    tokio::spawn(async move {
        match TcpListener::bind(&listener_addr).await {
            Ok(listener) => {
                if let Err(e) = serve(listener, app).await {
                    error!("Metrics server error: {}", e);
                }
            }
            Err(e) => {
                // Metrics are optional; the daemon keeps running without them.
                error!("Failed to bind metrics server to {}: {}", listener_addr, e);
            }
        }
    });
    Ok(())
}
