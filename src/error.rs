//! Error types for the pdf2png library.
//!
//! Every failure in the pipeline is terminal: nothing is retried and no
//! partial image is ever returned. [`ConvertError`] carries the details a
//! human needs (requested page, page count, storage location), while
//! [`ErrorKind`] is the coarse category that ends up in the `type` field of a
//! handler response and decides its HTTP-style status code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the conversion pipeline.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Request errors ────────────────────────────────────────────────────
    /// Neither an object-storage location nor embedded bytes were supplied.
    #[error("s3Bucket+s3Key or pdfBase64 is required")]
    MissingSource,

    /// A request field has the wrong type or an unacceptable value.
    #[error("Invalid {field}: {detail}")]
    InvalidParameter { field: &'static str, detail: String },

    /// `pdfBase64` is not valid base64.
    #[error("Invalid base64 in pdfBase64: {detail}")]
    InvalidEncoding { detail: String },

    // ── Source errors ─────────────────────────────────────────────────────
    /// The PDF could not be fetched from its location.
    #[error("Failed to read PDF from '{location}': {reason}")]
    SourceUnavailable { location: String, reason: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// The bytes are not a PDF, are corrupt, or need a (different) password.
    #[error("Not a readable PDF: {detail}")]
    InvalidDocument { detail: String },

    /// The requested 1-based page does not exist in the document.
    #[error("Invalid page number: {page}. PDF has {total} page(s).")]
    PageOutOfRange { page: i64, total: usize },

    /// PDFium failed to rasterise the page or the PNG encoder failed.
    #[error("Rendering failed for page {page}: {detail}")]
    RenderFailed { page: i64, detail: String },

    /// The PDFium library could not be loaded.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or install pdfium system-wide."
    )]
    EngineUnavailable(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PNG file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    /// The category reported to callers alongside the message.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConvertError::MissingSource => ErrorKind::MissingSource,
            ConvertError::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            ConvertError::InvalidEncoding { .. } => ErrorKind::InvalidEncoding,
            ConvertError::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            ConvertError::InvalidDocument { .. } => ErrorKind::InvalidDocument,
            ConvertError::PageOutOfRange { .. } => ErrorKind::PageOutOfRange,
            ConvertError::RenderFailed { .. } | ConvertError::EngineUnavailable(_) => {
                ErrorKind::RenderFailure
            }
            ConvertError::OutputWriteFailed { .. }
            | ConvertError::InvalidConfig(_)
            | ConvertError::Internal(_) => ErrorKind::InternalError,
        }
    }
}

/// Coarse failure category, serialised verbatim as the response `type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    MissingSource,
    SourceUnavailable,
    InvalidEncoding,
    InvalidParameter,
    InvalidDocument,
    PageOutOfRange,
    RenderFailure,
    InternalError,
}

impl ErrorKind {
    /// HTTP-style status code used by the cloud handler.
    ///
    /// Problems with the caller's input are 400; anything that went wrong on
    /// our side of the boundary (storage, PDFium, I/O) is 500.
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::MissingSource
            | ErrorKind::InvalidEncoding
            | ErrorKind::InvalidParameter
            | ErrorKind::InvalidDocument
            | ErrorKind::PageOutOfRange => 400,
            ErrorKind::SourceUnavailable | ErrorKind::RenderFailure | ErrorKind::InternalError => {
                500
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::MissingSource => "MissingSource",
            ErrorKind::SourceUnavailable => "SourceUnavailable",
            ErrorKind::InvalidEncoding => "InvalidEncoding",
            ErrorKind::InvalidParameter => "InvalidParameter",
            ErrorKind::InvalidDocument => "InvalidDocument",
            ErrorKind::PageOutOfRange => "PageOutOfRange",
            ErrorKind::RenderFailure => "RenderFailure",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
