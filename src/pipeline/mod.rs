// src/pipeline/mod.rs

pub mod analysis;
pub mod metadata;
pub mod ocr;
pub mod storage;

// The four capabilities the processing pipeline is written against.
pub use analysis::DocumentAnalyzer;
pub use metadata::MetadataWriter;
pub use ocr::OcrEngine;
pub use storage::DocumentStorage;
