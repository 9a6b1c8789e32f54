// src/pipeline/ocr/mod.rs

pub mod base_ocr;
pub mod ocrmypdf;

pub use base_ocr::{text_sidecar_path, OcrEngine};
pub use ocrmypdf::OcrMyPdf;
