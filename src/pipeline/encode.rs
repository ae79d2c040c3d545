//! Image encoding: RGB pixel buffer → PNG bytes → base64 text.
//!
//! The base64 form is only used inside JSON handler responses.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Encode a rendered page as PNG.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;
    debug!("Encoded {}x{} image → {} bytes PNG", img.width(), img.height(), buf.len());
    Ok(buf)
}

/// Standard padded base64, as expected by JSON consumers.
pub fn to_base64(png: &[u8]) -> String {
    STANDARD.encode(png)
}
