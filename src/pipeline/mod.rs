//! Pipeline stages for single-page PDF-to-PNG conversion.
//!
//! Each submodule implements exactly one transformation step.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ encode
//! (event/   (pdfium)   (PNG,
//!  bytes)              base64)
//! ```
//!
//! 1. [`input`]: validate request fields and obtain the PDF bytes from
//!    object storage, embedded base64, or a local file
//! 2. [`render`]: check the page number against the page count and rasterise
//!    at `dpi / 72` zoom; runs in `spawn_blocking`
//! 3. [`encode`]: lossless PNG, plus base64 for JSON responses

pub mod encode;
pub mod input;
pub mod render;
