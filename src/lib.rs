//! # pdf2png
//!
//! Render one page of a PDF to a PNG image at a chosen resolution.
//!
//! Parsing and rasterisation are delegated to [PDFium](https://pdfium.googlesource.com/pdfium/)
//! through `pdfium-render`. This crate validates the request, converts DPI
//! into a zoom factor, encodes the pixels as PNG and shapes the response.
//!
//! ## Pipeline Overview
//!
//! ```text
//! request
//!  │
//!  ├─ 1. Resolve  pageNumber / dpi / source → PDF bytes (S3, base64, file)
//!  ├─ 2. Render   bounds-check the page, rasterise at dpi/72 (spawn_blocking)
//!  ├─ 3. Encode   RGB pixels → PNG
//!  └─ 4. Respond  { statusCode, body } for the handler, or a file for the CLI
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2png::{Converter, ConverterConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let converter = Converter::from_config(ConverterConfig::from_env()?)?;
//!     let response = converter
//!         .handle_event(&json!({ "s3Bucket": "docs", "s3Key": "report.pdf", "dpi": 200 }))
//!         .await;
//!     println!("{} {}", response.status_code, response.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2png` and `bootstrap` binaries (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod runtime;
pub mod storage;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterConfig, ConverterConfigBuilder};
pub use convert::Converter;
pub use error::{ConvertError, ErrorKind};
pub use output::{ConversionResult, ErrorBody, HandlerResponse, RenderedPage, SuccessBody};
pub use pipeline::input::{ConversionRequest, PdfSource};
pub use pipeline::render::{PageRequest, PdfEngine, PdfiumEngine};
pub use progress::{ProgressCallback, SharedProgress, Stage};
pub use storage::{HttpObjectStore, LocalObjectStore, ObjectStore, S3ObjectStore, StorageError};
