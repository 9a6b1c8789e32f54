// src/pipeline/metadata/mod.rs

pub mod base_metadata;
pub mod pdf_metadata;

pub use base_metadata::{yaml_sidecar_path, MetadataWriter, SIDECAR_EXTENSION};
pub use pdf_metadata::PdfMetadataWriter;
