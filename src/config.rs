//! Configuration for the conversion pipeline.
//!
//! [`ConverterConfig`] holds the process-wide knobs: request defaults, the
//! DPI ceiling, and where the external collaborators (object storage, the
//! PDFium library) live. Per-request parameters travel in
//! [`crate::pipeline::input::ConversionRequest`] instead.
//!
//! Build it with [`ConverterConfig::builder()`], or read it from the
//! environment with [`ConverterConfig::from_env()`] (the cloud handler does
//! this at cold start).

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Smallest DPI accepted anywhere in the pipeline.
pub const MIN_DPI: u32 = 1;

/// Configuration for PDF page conversion.
///
/// # Example
/// ```rust
/// use pdf2png::ConverterConfig;
///
/// let config = ConverterConfig::builder()
///     .default_dpi(200)
///     .max_dpi(400)
///     .build()
///     .unwrap();
/// assert_eq!(config.default_dpi, 200);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// DPI used when a request does not specify one. Default: 150.
    pub default_dpi: u32,

    /// Upper bound on requested DPI. Default: 600.
    ///
    /// A 600-DPI render of an A4 page is roughly 5 000 × 7 000 px (about
    /// 100 MB of RGB pixels). Requests above the cap are rejected with
    /// `InvalidParameter` instead of exhausting the function's memory.
    pub max_dpi: u32,

    /// Page used when a request does not specify one (1-based). Default: 1.
    pub default_page: i64,

    /// Timeout for object-storage downloads in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Unsigned S3-compatible endpoint. If None, objects are read from
    /// Amazon S3 with the default AWS credential chain.
    pub storage_endpoint: Option<String>,

    /// Serve `bucket/key` from this directory instead of over HTTP.
    pub storage_root: Option<PathBuf>,

    /// Explicit path to the PDFium shared library.
    pub pdfium_library: Option<PathBuf>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            default_dpi: 150,
            max_dpi: 600,
            default_page: 1,
            download_timeout_secs: 120,
            storage_endpoint: None,
            storage_root: None,
            pdfium_library: None,
        }
    }
}

impl ConverterConfig {
    /// Create a new builder for `ConverterConfig`.
    pub fn builder() -> ConverterConfigBuilder {
        ConverterConfigBuilder {
            config: Self::default(),
        }
    }

    /// Read configuration from `PDF2PNG_*` environment variables.
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `PDF2PNG_DEFAULT_DPI` | `default_dpi` |
    /// | `PDF2PNG_MAX_DPI` | `max_dpi` |
    /// | `PDF2PNG_DOWNLOAD_TIMEOUT` | `download_timeout_secs` |
    /// | `PDF2PNG_S3_ENDPOINT` | `storage_endpoint` |
    /// | `PDF2PNG_STORAGE_DIR` | `storage_root` |
    /// | `PDFIUM_LIB_PATH` | `pdfium_library` |
    ///
    /// Unset or empty variables keep their defaults; unparsable numbers are
    /// an [`ConvertError::InvalidConfig`].
    pub fn from_env() -> Result<Self, ConvertError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConvertError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut builder = Self::builder();
        if let Some(v) = var("PDF2PNG_MAX_DPI") {
            builder = builder.max_dpi(parse_number("PDF2PNG_MAX_DPI", &v)?);
        }
        if let Some(v) = var("PDF2PNG_DEFAULT_DPI") {
            builder = builder.default_dpi(parse_number("PDF2PNG_DEFAULT_DPI", &v)?);
        }
        if let Some(v) = var("PDF2PNG_DOWNLOAD_TIMEOUT") {
            builder = builder.download_timeout_secs(parse_number("PDF2PNG_DOWNLOAD_TIMEOUT", &v)?);
        }
        if let Some(v) = var("PDF2PNG_S3_ENDPOINT") {
            builder = builder.storage_endpoint(v);
        }
        if let Some(v) = var("PDF2PNG_STORAGE_DIR") {
            builder = builder.storage_root(v);
        }
        if let Some(v) = var("PDFIUM_LIB_PATH") {
            builder = builder.pdfium_library(v);
        }
        builder.build()
    }
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConvertError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConvertError::InvalidConfig(format!("{name} must be a number, got '{value}'")))
}

/// Builder for [`ConverterConfig`].
#[derive(Debug)]
pub struct ConverterConfigBuilder {
    config: ConverterConfig,
}

impl ConverterConfigBuilder {
    pub fn default_dpi(mut self, dpi: u32) -> Self {
        self.config.default_dpi = dpi.max(MIN_DPI);
        self
    }

    pub fn max_dpi(mut self, dpi: u32) -> Self {
        self.config.max_dpi = dpi.max(MIN_DPI);
        self
    }

    pub fn default_page(mut self, page: i64) -> Self {
        self.config.default_page = page;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs.max(1);
        self
    }

    pub fn storage_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.storage_endpoint = Some(endpoint.into());
        self
    }

    pub fn storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.storage_root = Some(root.into());
        self
    }

    pub fn pdfium_library(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_library = Some(path.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConverterConfig, ConvertError> {
        let c = &self.config;
        if c.default_dpi > c.max_dpi {
            return Err(ConvertError::InvalidConfig(format!(
                "default DPI {} exceeds max DPI {}",
                c.default_dpi, c.max_dpi
            )));
        }
        if c.default_page < 1 {
            return Err(ConvertError::InvalidConfig(format!(
                "default page is 1-based, got {}",
                c.default_page
            )));
        }
        Ok(self.config)
    }
}
