// Utils

pub mod common;
pub mod prometheus_metrics;
pub mod text;

pub use common::{move_file, temp_sibling, timestamp_prefix};
pub use text::{truncate_chars, FilePatterns};
