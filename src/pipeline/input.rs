//! Request resolution: turn a loosely-typed event into a [`ConversionRequest`]
//! and then into raw PDF bytes.
//!
//! Resolution happens in two steps. [`parse_event`] is pure and checks field
//! types and source presence; [`load_pdf`] performs the single external read
//! (object storage, base64 decode, or local file).

use crate::config::{ConverterConfig, MIN_DPI};
use crate::error::ConvertError;
use crate::storage::ObjectStore;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info};

/// Where the PDF comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum PdfSource {
    /// `s3://bucket/key`, fetched through the injected [`ObjectStore`].
    ObjectStorage { bucket: String, key: String },
    /// Base64 text carried inside the request.
    Embedded { base64: String },
    /// A file on the local disk (command-line variant).
    File { path: PathBuf },
}

// Embedded payloads can be megabytes; keep them out of logs.
impl fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfSource::ObjectStorage { bucket, key } => f
                .debug_struct("ObjectStorage")
                .field("bucket", bucket)
                .field("key", key)
                .finish(),
            PdfSource::Embedded { base64 } => f
                .debug_struct("Embedded")
                .field("len", &base64.len())
                .finish(),
            PdfSource::File { path } => f.debug_struct("File").field("path", path).finish(),
        }
    }
}

impl fmt::Display for PdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfSource::ObjectStorage { bucket, key } => write!(f, "s3://{bucket}/{key}"),
            PdfSource::Embedded { base64 } => write!(f, "<{} base64 chars>", base64.len()),
            PdfSource::File { path } => write!(f, "{}", path.display()),
        }
    }
}

/// A validated conversion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    /// 1-based page number. Not range-checked here: only the renderer knows
    /// the page count.
    pub page_number: i64,
    /// Target resolution, already within `1..=max_dpi`.
    pub dpi: u32,
    /// User password for encrypted documents.
    pub password: Option<String>,
    pub source: PdfSource,
}

impl ConversionRequest {
    /// Request for a local file, validating `dpi` the same way events are.
    pub fn for_file(
        path: impl Into<PathBuf>,
        page_number: i64,
        dpi: Option<i64>,
        config: &ConverterConfig,
    ) -> Result<Self, ConvertError> {
        let dpi = match dpi {
            Some(d) => check_dpi(d, config)?,
            None => config.default_dpi,
        };
        Ok(Self {
            page_number,
            dpi,
            password: None,
            source: PdfSource::File { path: path.into() },
        })
    }

    pub fn with_password(mut self, password: Option<String>) -> Self {
        self.password = password;
        self
    }
}

/// Parse a handler event.
///
/// Accepted fields: `s3Bucket`, `s3Key`, `pdfBase64`, `pageNumber`, `dpi`,
/// `password`. Unknown fields are ignored. When both an object-storage
/// location and embedded bytes are present, object storage wins.
pub fn parse_event(event: &Value, config: &ConverterConfig) -> Result<ConversionRequest, ConvertError> {
    let map = event.as_object().ok_or_else(|| ConvertError::InvalidParameter {
        field: "event",
        detail: format!("expected a JSON object, got {}", type_name(event)),
    })?;

    let page_number = match field(map, "pageNumber") {
        Some(v) => v.as_i64().ok_or_else(|| ConvertError::InvalidParameter {
            field: "pageNumber",
            detail: format!("expected an integer, got {v}"),
        })?,
        None => config.default_page,
    };

    let dpi = match field(map, "dpi") {
        Some(v) => {
            let raw = v.as_i64().ok_or_else(|| ConvertError::InvalidParameter {
                field: "dpi",
                detail: format!("expected an integer, got {v}"),
            })?;
            check_dpi(raw, config)?
        }
        None => config.default_dpi,
    };

    let bucket = string_field(map, "s3Bucket")?;
    let key = string_field(map, "s3Key")?;
    let embedded = string_field(map, "pdfBase64")?;
    let password = string_field(map, "password")?;

    let source = match (bucket, key, embedded) {
        (Some(bucket), Some(key), _) => PdfSource::ObjectStorage { bucket, key },
        (_, _, Some(base64)) => PdfSource::Embedded { base64 },
        _ => return Err(ConvertError::MissingSource),
    };

    debug!("Parsed request: page {} at {} DPI from {:?}", page_number, dpi, source);

    Ok(ConversionRequest {
        page_number,
        dpi,
        password,
        source,
    })
}

/// Obtain the PDF bytes for `source` and check the `%PDF` magic.
pub async fn load_pdf(source: &PdfSource, store: &dyn ObjectStore) -> Result<Vec<u8>, ConvertError> {
    let bytes = match source {
        PdfSource::ObjectStorage { bucket, key } => {
            info!("Downloading PDF: s3://{}/{}", bucket, key);
            let bytes = store.get_object(bucket, key).await.map_err(|e| {
                ConvertError::SourceUnavailable {
                    location: source.to_string(),
                    reason: e.to_string(),
                }
            })?;
            info!("Downloaded: {} bytes", bytes.len());
            bytes
        }
        PdfSource::Embedded { base64 } => {
            info!("Decoding base64 PDF...");
            let bytes = decode_base64(base64)?;
            info!("Decoded: {} bytes", bytes.len());
            bytes
        }
        PdfSource::File { path } => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|e| ConvertError::SourceUnavailable {
                    location: path.display().to_string(),
                    reason: e.to_string(),
                })?;
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            bytes
        }
    };

    check_magic(&bytes)?;
    Ok(bytes)
}

/// Decode standard (padded) base64, tolerating surrounding whitespace and
/// line breaks as produced by `base64` CLI tools.
pub fn decode_base64(text: &str) -> Result<Vec<u8>, ConvertError> {
    let compact: String = text.split_ascii_whitespace().collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| ConvertError::InvalidEncoding {
            detail: e.to_string(),
        })
}

/// How far into the file a `%PDF` header may start; PDFium allows leading junk.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Reject anything without a `%PDF` header near the start before pdfium sees it.
fn check_magic(bytes: &[u8]) -> Result<(), ConvertError> {
    let window = &bytes[..bytes.len().min(HEADER_SEARCH_WINDOW)];
    if window.windows(4).any(|w| w == b"%PDF") {
        return Ok(());
    }
    let head = &bytes[..bytes.len().min(4)];
    Err(ConvertError::InvalidDocument {
        detail: format!(
            "no %PDF header in the first {HEADER_SEARCH_WINDOW} bytes (starts with {head:?})"
        ),
    })
}

fn check_dpi(dpi: i64, config: &ConverterConfig) -> Result<u32, ConvertError> {
    u32::try_from(dpi)
        .ok()
        .filter(|d| (MIN_DPI..=config.max_dpi).contains(d))
        .ok_or_else(|| ConvertError::InvalidParameter {
            field: "dpi",
            detail: format!(
                "must be between {MIN_DPI} and {} (the limit is set by PDF2PNG_MAX_DPI), got {dpi}",
                config.max_dpi
            ),
        })
}

/// A present, non-null field.
fn field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    map.get(name).filter(|v| !v.is_null())
}

fn string_field(map: &Map<String, Value>, name: &'static str) -> Result<Option<String>, ConvertError> {
    match field(map, name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ConvertError::InvalidParameter {
            field: name,
            detail: format!("expected a string, got {}", type_name(other)),
        }),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LocalObjectStore;
    use serde_json::json;

    fn config() -> ConverterConfig {
        ConverterConfig::default()
    }

    #[test]
    fn defaults_apply_when_fields_absent() {
        let req = parse_event(&json!({ "pdfBase64": "JVBERg==" }), &config()).unwrap();
        assert_eq!(req.page_number, 1);
        assert_eq!(req.dpi, 150);
        assert!(req.password.is_none());
        assert!(matches!(req.source, PdfSource::Embedded { .. }));
    }

    #[test]
    fn null_fields_count_as_absent() {
        let req = parse_event(
            &json!({ "pdfBase64": "JVBERg==", "pageNumber": null, "dpi": null }),
            &config(),
        )
        .unwrap();
        assert_eq!((req.page_number, req.dpi), (1, 150));
    }

    #[test]
    fn object_storage_wins_over_embedded() {
        let req = parse_event(
            &json!({ "s3Bucket": "docs", "s3Key": "a.pdf", "pdfBase64": "JVBERg==" }),
            &config(),
        )
        .unwrap();
        assert_eq!(
            req.source,
            PdfSource::ObjectStorage {
                bucket: "docs".into(),
                key: "a.pdf".into()
            }
        );
    }

    #[test]
    fn missing_source() {
        let err = parse_event(&json!({ "pageNumber": 2 }), &config()).unwrap_err();
        assert!(matches!(err, ConvertError::MissingSource));
    }

    #[test]
    fn bucket_without_key_is_not_a_source() {
        let err = parse_event(&json!({ "s3Bucket": "docs" }), &config()).unwrap_err();
        assert!(matches!(err, ConvertError::MissingSource));
    }

    #[test]
    fn negative_page_passes_through_to_renderer() {
        let req = parse_event(&json!({ "pdfBase64": "", "pageNumber": -3 }), &config()).unwrap();
        assert_eq!(req.page_number, -3);
    }

    #[test]
    fn dpi_policy() {
        for bad in [json!(0), json!(-72), json!(150.5), json!("150"), json!(601)] {
            let err = parse_event(&json!({ "pdfBase64": "", "dpi": bad }), &config()).unwrap_err();
            assert!(
                matches!(err, ConvertError::InvalidParameter { field: "dpi", .. }),
                "dpi {bad} gave {err:?}"
            );
        }
        let req = parse_event(&json!({ "pdfBase64": "", "dpi": 600 }), &config()).unwrap();
        assert_eq!(req.dpi, 600);
    }

    #[test]
    fn non_integer_page_is_invalid_parameter() {
        let err = parse_event(&json!({ "pdfBase64": "", "pageNumber": "2" }), &config()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidParameter { field: "pageNumber", .. }));
    }

    #[test]
    fn non_string_source_is_invalid_parameter() {
        let err = parse_event(&json!({ "pdfBase64": 42 }), &config()).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidParameter { field: "pdfBase64", .. }));
    }

    #[test]
    fn non_object_event_is_rejected() {
        let err = parse_event(&json!([1, 2]), &config()).unwrap_err();
        assert!(err.to_string().contains("an array"));
    }

    #[test]
    fn for_file_validates_dpi() {
        assert!(ConversionRequest::for_file("a.pdf", 1, Some(0), &config()).is_err());
        let req = ConversionRequest::for_file("a.pdf", 2, None, &config()).unwrap();
        assert_eq!(req.dpi, 150);
        assert_eq!(req.page_number, 2);
    }

    #[test]
    fn decode_tolerates_line_breaks() {
        assert_eq!(decode_base64("JVBE\nRi0x\r\n").unwrap(), b"%PDF-1");
    }

    #[test]
    fn malformed_base64_is_invalid_encoding() {
        let err = decode_base64("not*base64!").unwrap_err();
        assert!(matches!(err, ConvertError::InvalidEncoding { .. }));
    }

    #[test]
    fn embedded_payload_is_not_logged() {
        let src = PdfSource::Embedded {
            base64: "A".repeat(1000),
        };
        assert!(!format!("{src:?}").contains("AAAA"));
    }

    #[tokio::test]
    async fn load_rejects_non_pdf_bytes() {
        let store = LocalObjectStore::new("/nonexistent");
        let src = PdfSource::Embedded {
            base64: STANDARD.encode(b"GIF89a"),
        };
        let err = load_pdf(&src, &store).await.unwrap_err();
        assert!(matches!(err, ConvertError::InvalidDocument { .. }));
    }

    #[test]
    fn header_may_follow_leading_junk() {
        assert!(check_magic(b"\xEF\xBB\xBF%PDF-1.7\n").is_ok());

        let mut late = vec![b' '; HEADER_SEARCH_WINDOW];
        late.extend_from_slice(b"%PDF-1.7\n");
        assert!(matches!(
            check_magic(&late),
            Err(ConvertError::InvalidDocument { .. })
        ));

        let mut edge = vec![b' '; HEADER_SEARCH_WINDOW - 4];
        edge.extend_from_slice(b"%PDF-1.7\n");
        assert!(check_magic(&edge).is_ok());
    }

    #[test]
    fn dpi_above_cap_names_the_limit() {
        let err = parse_event(&json!({ "pdfBase64": "", "dpi": 900 }), &config()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("600"), "got: {msg}");
        assert!(msg.contains("PDF2PNG_MAX_DPI"), "got: {msg}");
        assert!(msg.contains("900"), "got: {msg}");
    }

    #[tokio::test]
    async fn load_reports_unavailable_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path());
        let src = PdfSource::ObjectStorage {
            bucket: "docs".into(),
            key: "missing.pdf".into(),
        };
        let err = load_pdf(&src, &store).await.unwrap_err();
        match err {
            ConvertError::SourceUnavailable { location, .. } => {
                assert_eq!(location, "s3://docs/missing.pdf")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn load_reads_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.pdf");
        std::fs::write(&path, b"%PDF-1.7\n").unwrap();
        let store = LocalObjectStore::new(dir.path());
        let bytes = load_pdf(&PdfSource::File { path }, &store).await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }
}
