//! Progress callbacks for the conversion state machine.
//!
//! A conversion moves strictly forward through
//! `Resolving → Rendering → Responding` and ends in either
//! [`ProgressCallback::on_complete`] or [`ProgressCallback::on_error`].
//! Callbacks are purely observational: they cannot alter or abort the
//! conversion. The CLI uses them to drive a spinner; the cloud handler does
//! not install one and relies on `tracing` output instead.

use crate::error::ConvertError;
use crate::output::RenderedPage;
use std::fmt;
use std::sync::Arc;

/// A step of the linear conversion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Fetching or decoding the PDF bytes.
    Resolving,
    /// Rasterising the page and encoding the PNG.
    Rendering,
    /// Writing the file or shaping the response.
    Responding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Resolving => "Reading PDF",
            Stage::Rendering => "Converting",
            Stage::Responding => "Writing",
        })
    }
}

/// Receives pipeline events. All methods default to no-ops.
pub trait ProgressCallback: Send + Sync {
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    fn on_complete(&self, page: &RenderedPage) {
        let _ = page;
    }

    fn on_error(&self, error: &ConvertError) {
        let _ = error;
    }
}

/// Shared handle stored in [`crate::Converter`].
pub type SharedProgress = Arc<dyn ProgressCallback>;

/// A callback that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressCallback for NoopProgress {}
