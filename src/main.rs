use anyhow::{bail, Context};
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use papertrail::cleanup::run_cleanup;
use papertrail::config::{load_settings, Args, Command, Settings};
use papertrail::executor::build_processing_service;
use papertrail::reprocess_logic::{parse_date_range, run_reprocess, ReprocessOptions};
use papertrail::utils::common::setup_prometheus_metrics;
use papertrail::watcher_logic::run_watcher;

const LOG_FILE_NAME: &str = "papertrail.log";

/// Console logging, plus a daily rolling file when `log_dir` is set.
/// The returned guard must live until exit so buffered lines are flushed.
fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let Some(dir) = log_dir else {
        fmt::Subscriber::builder().with_env_filter(filter).init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, LOG_FILE_NAME));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for ctrl-c: {}", e);
        // Without a signal handler the daemon just runs until killed.
        std::future::pending::<()>().await;
    }
}

async fn process_command(settings: &Settings, file: &Path, keep: bool) -> anyhow::Result<ExitCode> {
    if !file.exists() {
        bail!("File not found: {}", file.display());
    }
    settings.ensure_dirs()?;

    let quarantine = if keep {
        None
    } else {
        Some(settings.paths.quarantine())
    };
    let service = build_processing_service(settings, quarantine)?;
    let result = service.process(file, keep).await;

    match (&result.document_info, result.success()) {
        (Some(info), true) => {
            println!("title: {}", info.title);
            println!("subject: {}", info.subject);
            println!("issuer: {}", info.issuer);
            match info.date {
                Some(date) => println!("date: {}", date),
                None => println!("date: None"),
            }
            println!("summary: {}", info.summary);
            println!("tax_relevant: {}", info.tax_relevant);
            println!("text_length: {}", result.text_length);
            if let Some(output) = &result.output_path {
                println!("output: {}", output.display());
            }
            if let Some(sidecar) = &result.sidecar_path {
                println!("sidecar: {}", sidecar.display());
            }
            Ok(ExitCode::SUCCESS)
        }
        _ => {
            eprintln!("Errors: {:?}", result.errors);
            if let Some(output) = &result.output_path {
                eprintln!("Quarantined: {}", output.display());
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let settings =
        load_settings(args.config.as_deref()).context("Failed to load configuration")?;
    let _log_guard = init_tracing(args.verbose, settings.logging.log_dir.as_deref())?;

    match args.command {
        Command::Watch => {
            setup_prometheus_metrics(settings.metrics.port).await?;
            run_watcher(&settings, shutdown_signal()).await?;
        }
        Command::Process { file, keep } => {
            return process_command(&settings, &file, keep).await;
        }
        Command::Reprocess {
            path,
            no_recursive,
            dry_run,
            filter_date,
            missing_field,
        } => {
            if !path.exists() {
                bail!("Path not found: {}", path.display());
            }
            let options = ReprocessOptions {
                recursive: !no_recursive,
                dry_run,
                date_range: filter_date.as_deref().map(parse_date_range).transpose()?,
                missing_field,
            };
            run_reprocess(&settings, &path, &options).await?;
        }
        Command::Cleanup => {
            let removed = run_cleanup(&settings.paths.trash(), settings.cleanup.retention_days)?;
            println!("Removed {} files from trash", removed);
        }
    }

    info!("Done");
    Ok(ExitCode::SUCCESS)
}
