// src/pipeline/storage/mod.rs

pub mod base_storage;
pub mod filesystem;
pub mod naming;

pub use base_storage::DocumentStorage;
pub use filesystem::FilesystemStorage;
pub use naming::{sanitize_filename, ArchiveNamer, MAX_TITLE_LENGTH};
