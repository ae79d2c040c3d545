//! Conversion results and the response shapes built from them.
//!
//! [`ConversionResult`] is the single outcome of a request: success and
//! failure are mutually exclusive, and a failure never carries partial image
//! data. The cloud handler turns it into a [`HandlerResponse`]; the CLI writes
//! the PNG to disk instead.

use crate::error::{ConvertError, ErrorKind};
use crate::pipeline::encode;
use serde::{Deserialize, Serialize};
use tracing::error;

/// A rendered page. Immutable once created; `size()` always equals the PNG
/// byte length.
#[derive(Clone, PartialEq, Eq)]
pub struct RenderedPage {
    width: u32,
    height: u32,
    size: usize,
    png: Vec<u8>,
}

impl RenderedPage {
    pub fn new(width: u32, height: u32, png: Vec<u8>) -> Self {
        Self {
            width,
            height,
            size: png.len(),
            png,
        }
    }

    /// Pixel width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Pixel height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// PNG size in bytes.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("size", &self.size)
            .finish()
    }
}

/// Outcome of one conversion request.
#[derive(Debug)]
pub enum ConversionResult {
    Success {
        page: RenderedPage,
        page_number: i64,
        dpi: u32,
    },
    Failure {
        message: String,
        kind: ErrorKind,
    },
}

impl From<ConvertError> for ConversionResult {
    fn from(e: ConvertError) -> Self {
        ConversionResult::Failure {
            message: e.to_string(),
            kind: e.kind(),
        }
    }
}

impl ConversionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ConversionResult::Success { .. })
    }

    /// Shape the result as a cloud-function response.
    pub fn into_response(self) -> HandlerResponse {
        match self {
            ConversionResult::Success {
                page,
                page_number,
                dpi,
            } => {
                let body = SuccessBody {
                    image_base64: encode::to_base64(page.png()),
                    width: page.width(),
                    height: page.height(),
                    size: page.size(),
                    page_number,
                    dpi,
                };
                HandlerResponse::json(200, &body)
            }
            ConversionResult::Failure { message, kind } => {
                let body = ErrorBody {
                    error: message,
                    kind,
                };
                HandlerResponse::json(kind.status_code(), &body)
            }
        }
    }
}

/// Body of a successful handler response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessBody {
    pub image_base64: String,
    pub width: u32,
    pub height: u32,
    pub size: usize,
    pub page_number: i64,
    pub dpi: u32,
}

/// Body of a failed handler response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
}

/// `{ statusCode, body }` where `body` is a JSON-encoded string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerResponse {
    pub status_code: u16,
    pub body: String,
}

impl HandlerResponse {
    fn json<T: Serialize>(status_code: u16, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self { status_code, body },
            Err(e) => {
                // Only reachable if serde_json itself misbehaves; still answer
                // with a well-formed error body.
                error!("Failed to serialise response body: {}", e);
                Self {
                    status_code: 500,
                    body: r#"{"error":"failed to serialise response","type":"InternalError"}"#
                        .to_string(),
                }
            }
        }
    }
}
