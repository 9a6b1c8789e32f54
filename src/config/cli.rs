use std::path::PathBuf;

use clap::{Parser, Subcommand};

// Define command-line arguments
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Papertrail - scan drop folder watcher and archiver", long_about = None)]
pub struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the configuration YAML file (defaults to ~/.config/papertrail/config.yaml)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the document watcher daemon
    Watch,

    /// Process a single document file
    Process {
        /// The document to process
        file: PathBuf,

        /// Keep file in place (don't move to storage)
        #[arg(long)]
        keep: bool,
    },

    /// Reprocess stored documents (update metadata in place)
    Reprocess {
        /// A PDF file or a directory of archived documents
        path: PathBuf,

        /// Only look at the top level of the directory
        #[arg(long)]
        no_recursive: bool,

        /// Show what would be processed
        #[arg(long)]
        dry_run: bool,

        /// YYYY-MM-DD..YYYY-MM-DD (month granularity)
        #[arg(long)]
        filter_date: Option<String>,

        /// Only files whose sidecar is missing this field
        #[arg(long)]
        missing_field: Option<String>,
    },

    /// Remove old files from trash
    Cleanup,
}
