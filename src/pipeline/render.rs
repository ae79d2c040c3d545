//! PDF rasterisation: render one page to an RGB pixel buffer.
//!
//! Rendering is the external capability of this crate. Everything PDF-specific
//! sits behind [`PdfEngine`], whose production implementation is
//! [`PdfiumEngine`]. The crate's own contribution is the arithmetic around it:
//! turning a DPI into a zoom factor and a 1-based page number into a checked
//! 0-based index ([`PageRequest::index_within`]), which every engine shares.
//!
//! ## Why spawn_blocking?
//!
//! pdfium is a synchronous C++ library doing CPU-heavy work. [`render_page`]
//! moves the call onto tokio's blocking pool so the runtime thread that
//! polls the storage download and the Lambda runtime API never stalls.

use crate::error::ConvertError;
use crate::output::RenderedPage;
use crate::pipeline::encode;
use image::RgbImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Native resolution of PDF user space: 72 points per inch.
pub const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Zoom factor that maps PDF points to pixels at `dpi`.
pub fn zoom_for_dpi(dpi: u32) -> f32 {
    dpi as f32 / PDF_POINTS_PER_INCH
}

/// Pixel length of `points` at `zoom`, never less than one pixel.
pub fn scaled_pixels(points: f32, zoom: f32) -> u32 {
    (points * zoom).round().max(1.0) as u32
}

/// Which page to rasterise, and how large.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRequest {
    /// 1-based, as supplied by the caller (may be out of range).
    pub page_number: i64,
    /// Uniform scale applied to both axes.
    pub zoom: f32,
}

impl PageRequest {
    pub fn at_dpi(page_number: i64, dpi: u32) -> Self {
        Self {
            page_number,
            zoom: zoom_for_dpi(dpi),
        }
    }

    /// 0-based index of the page, provided `1 <= page_number <= page_count`.
    pub fn index_within(&self, page_count: usize) -> Result<usize, ConvertError> {
        usize::try_from(self.page_number)
            .ok()
            .filter(|&p| p >= 1 && p <= page_count)
            .map(|p| p - 1)
            .ok_or(ConvertError::PageOutOfRange {
                page: self.page_number,
                total: page_count,
            })
    }
}

/// A PDF rasteriser.
///
/// Implementations open `pdf`, count its pages, resolve the page with
/// [`PageRequest::index_within`], render it at `page.zoom` and return the
/// pixels without an alpha channel. The document must be closed again before
/// returning.
pub trait PdfEngine: Send + Sync {
    fn rasterize(
        &self,
        pdf: &[u8],
        password: Option<&str>,
        page: &PageRequest,
    ) -> Result<RgbImage, ConvertError>;
}

/// [`PdfEngine`] backed by the PDFium shared library.
///
/// The library is bound on every call, so the engine itself is just the
/// location to bind from and is cheap to share across threads.
#[derive(Debug, Clone, Default)]
pub struct PdfiumEngine {
    library_path: Option<PathBuf>,
}

impl PdfiumEngine {
    /// Bind from `library_path` if given; otherwise look next to the working
    /// directory and then fall back to the system library.
    pub fn new(library_path: Option<PathBuf>) -> Self {
        Self { library_path }
    }

    fn bind(&self) -> Result<Pdfium, ConvertError> {
        let bindings = match &self.library_path {
            Some(path) => Pdfium::bind_to_library(path),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ConvertError::EngineUnavailable(e.to_string()))?;
        Ok(Pdfium::new(bindings))
    }
}

impl PdfEngine for PdfiumEngine {
    fn rasterize(
        &self,
        pdf: &[u8],
        password: Option<&str>,
        page: &PageRequest,
    ) -> Result<RgbImage, ConvertError> {
        let pdfium = self.bind()?;

        let document = pdfium
            .load_pdf_from_byte_slice(pdf, password)
            .map_err(|e| {
                let err_str = format!("{:?}", e);
                let detail = if err_str.contains("Password") || err_str.contains("password") {
                    if password.is_some() {
                        "wrong password".to_string()
                    } else {
                        "document is encrypted and requires a password".to_string()
                    }
                } else {
                    err_str
                };
                ConvertError::InvalidDocument { detail }
            })?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        debug!("PDF loaded: {} pages", total_pages);

        let index = page.index_within(total_pages)?;
        let render_failed = |detail: String| ConvertError::RenderFailed {
            page: page.page_number,
            detail,
        };

        let index = u16::try_from(index).map_err(|_| render_failed("page index exceeds u16".into()))?;
        let pdf_page = pages.get(index).map_err(|e| render_failed(format!("{:?}", e)))?;

        let width = scaled_pixels(pdf_page.width().value, page.zoom);
        let height = scaled_pixels(pdf_page.height().value, page.zoom);
        let render_config = PdfRenderConfig::new()
            .set_target_width(to_i32(width).map_err(&render_failed)?)
            .set_target_height(to_i32(height).map_err(&render_failed)?);

        let bitmap = pdf_page
            .render_with_config(&render_config)
            .map_err(|e| render_failed(format!("{:?}", e)))?;

        // PDFium paints a white background, so the alpha channel is opaque.
        Ok(bitmap.as_image().into_rgb8())
    }
}

fn to_i32(px: u32) -> Result<i32, String> {
    i32::try_from(px).map_err(|_| format!("{px} px exceeds the renderer's limit"))
}

/// Rasterise `page_number` of `pdf` at `dpi` and encode it as PNG.
///
/// Runs the engine on the blocking pool; see the module docs.
pub async fn render_page(
    engine: Arc<dyn PdfEngine>,
    pdf: Vec<u8>,
    password: Option<String>,
    page_number: i64,
    dpi: u32,
) -> Result<RenderedPage, ConvertError> {
    info!("Converting page {} at {} DPI...", page_number, dpi);
    let request = PageRequest::at_dpi(page_number, dpi);

    tokio::task::spawn_blocking(move || {
        let pixels = engine.rasterize(&pdf, password.as_deref(), &request)?;
        debug!(
            "Rendered page {} → {}x{} px",
            page_number,
            pixels.width(),
            pixels.height()
        );
        let png = encode::encode_png(&pixels).map_err(|e| ConvertError::RenderFailed {
            page: page_number,
            detail: format!("PNG encoding failed: {}", e),
        })?;
        Ok(RenderedPage::new(pixels.width(), pixels.height(), png))
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Render task panicked: {}", e)))?
}
