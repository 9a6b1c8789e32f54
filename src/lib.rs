// Library half of papertrail; `src/main.rs` is a thin CLI over these modules.
pub mod cleanup;
pub mod config;
pub mod data_model;
pub mod error;
pub mod executor;
pub mod ingest;
pub mod pipeline;
pub mod reprocess_logic;
pub mod utils;
pub mod watcher_logic;

pub use data_model::{DocumentInfo, ProcessingResult};
pub use error::{PipelineError, Result};
pub use executor::{ProcessingService, ReprocessingService};
