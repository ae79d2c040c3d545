//! The conversion pipeline: Resolver → Renderer → Response Builder.
//!
//! [`Converter`] implements the pipeline once. The two entry points adapt its
//! inputs and outputs:
//!
//! * the cloud handler calls [`Converter::handle_event`] with a JSON event and
//!   gets a [`HandlerResponse`] back;
//! * the CLI calls [`Converter::convert_to_file`] with a local path and gets
//!   the PNG written to disk.
//!
//! The converter owns only immutable, process-scoped collaborators, so one
//! instance serves every invocation of a warm function.

use crate::config::ConverterConfig;
use crate::error::ConvertError;
use crate::output::{ConversionResult, HandlerResponse, RenderedPage};
use crate::pipeline::input::{self, ConversionRequest};
use crate::pipeline::render::{self, PdfEngine, PdfiumEngine};
use crate::progress::{NoopProgress, SharedProgress, Stage};
use crate::storage::{HttpObjectStore, LocalObjectStore, ObjectStore, S3ObjectStore};
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};

/// Converts one PDF page per call.
#[derive(Clone)]
pub struct Converter {
    config: ConverterConfig,
    store: Arc<dyn ObjectStore>,
    engine: Arc<dyn PdfEngine>,
    progress: SharedProgress,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("config", &self.config)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// Assemble a converter from explicit collaborators.
    pub fn new(
        config: ConverterConfig,
        store: Arc<dyn ObjectStore>,
        engine: Arc<dyn PdfEngine>,
    ) -> Self {
        Self {
            config,
            store,
            engine,
            progress: Arc::new(NoopProgress),
        }
    }

    /// Production wiring: PDFium for rendering, and for object storage the
    /// first of `storage_root` (local directory), `storage_endpoint`
    /// (unsigned HTTP) or signed Amazon S3.
    pub fn from_config(config: ConverterConfig) -> Result<Self, ConvertError> {
        let timeout = config.download_timeout_secs;
        let store: Arc<dyn ObjectStore> = match (&config.storage_root, &config.storage_endpoint) {
            (Some(root), _) => Arc::new(LocalObjectStore::new(root)),
            (None, Some(endpoint)) => Arc::new(
                HttpObjectStore::new(endpoint, timeout)
                    .map_err(|e| ConvertError::InvalidConfig(e.to_string()))?,
            ),
            (None, None) => Arc::new(S3ObjectStore::new(timeout)),
        };
        let engine = Arc::new(PdfiumEngine::new(config.pdfium_library.clone()));
        Ok(Self::new(config, store, engine))
    }

    pub fn with_progress(mut self, progress: SharedProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Resolve the source of `request` and render its page.
    pub async fn convert(&self, request: &ConversionRequest) -> Result<RenderedPage, ConvertError> {
        let started = Instant::now();

        self.stage(Stage::Resolving);
        let pdf = input::load_pdf(&request.source, self.store.as_ref()).await?;

        self.stage(Stage::Rendering);
        let page = render::render_page(
            Arc::clone(&self.engine),
            pdf,
            request.password.clone(),
            request.page_number,
            request.dpi,
        )
        .await?;

        info!(
            "Converted: {}x{} pixels, {} bytes in {}ms",
            page.width(),
            page.height(),
            page.size(),
            started.elapsed().as_millis()
        );
        Ok(page)
    }

    /// Run the pipeline for a parsed request and fold the outcome into a
    /// [`ConversionResult`].
    pub async fn run(&self, request: &ConversionRequest) -> ConversionResult {
        match self.convert(request).await {
            Ok(page) => {
                self.stage(Stage::Responding);
                self.progress.on_complete(&page);
                ConversionResult::Success {
                    page,
                    page_number: request.page_number,
                    dpi: request.dpi,
                }
            }
            Err(e) => self.fail(e),
        }
    }

    /// Cloud-function entry point: event in, `{ statusCode, body }` out.
    ///
    /// Never returns an error; every failure becomes a structured response.
    pub async fn handle_event(&self, event: &Value) -> HandlerResponse {
        let result = match input::parse_event(event, &self.config) {
            Ok(request) => self.run(&request).await,
            Err(e) => self.fail(e),
        };
        let response = result.into_response();
        debug!("Responding with status {}", response.status_code);
        response
    }

    /// Command-line entry point: render a page of a local PDF to `output_path`.
    pub async fn convert_to_file(
        &self,
        request: &ConversionRequest,
        output_path: impl AsRef<Path>,
    ) -> Result<RenderedPage, ConvertError> {
        let result = self.convert_and_write(request, output_path.as_ref()).await;
        match &result {
            Ok(page) => self.progress.on_complete(page),
            Err(e) => self.report(e),
        }
        result
    }

    async fn convert_and_write(
        &self,
        request: &ConversionRequest,
        output_path: &Path,
    ) -> Result<RenderedPage, ConvertError> {
        let page = self.convert(request).await?;
        self.stage(Stage::Responding);
        write_atomic(output_path, page.png()).await?;
        Ok(page)
    }

    fn stage(&self, stage: Stage) {
        debug!("Stage: {:?}", stage);
        self.progress.on_stage(stage);
    }

    fn fail(&self, e: ConvertError) -> ConversionResult {
        self.report(&e);
        ConversionResult::from(e)
    }

    fn report(&self, e: &ConvertError) {
        error!("Error ({}): {}", e.kind(), e);
        self.progress.on_error(e);
    }
}

/// Write `bytes` to `path` through a temp file in the same directory, so a
/// crash never leaves a truncated PNG behind.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), ConvertError> {
    let write_failed = |source: std::io::Error| ConvertError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    tokio::fs::create_dir_all(&parent).await.map_err(write_failed)?;

    let path_owned = path.to_path_buf();
    let bytes = bytes.to_vec();
    tokio::task::spawn_blocking(move || -> std::io::Result<()> {
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path_owned).map_err(|e| e.error)?;
        Ok(())
    })
    .await
    .map_err(|e| ConvertError::Internal(format!("Write task panicked: {}", e)))?
    .map_err(write_failed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_atomic_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/deeper/page.png");
        write_atomic(&out, b"png-bytes").await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn write_atomic_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("page.png");
        std::fs::write(&out, b"old").unwrap();
        write_atomic(&out, b"new").await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"new");
    }

    #[tokio::test]
    async fn from_config_prefers_local_storage() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/a.pdf"), b"GIF89a").unwrap();

        let config = ConverterConfig::builder()
            .storage_root(dir.path())
            .storage_endpoint("http://127.0.0.1:9")
            .build()
            .unwrap();
        let converter = Converter::from_config(config).unwrap();

        // Only the directory holds these bytes, so getting as far as the
        // header check proves where they came from.
        let resp = converter
            .handle_event(&serde_json::json!({ "s3Bucket": "docs", "s3Key": "a.pdf" }))
            .await;
        assert_eq!(resp.status_code, 400, "body: {}", resp.body);
        assert!(resp.body.contains("InvalidDocument"), "body: {}", resp.body);
    }

    #[test]
    fn from_config_defaults_to_signed_s3() {
        let converter = Converter::from_config(ConverterConfig::default()).unwrap();
        let debug = format!("{converter:?}");
        assert!(debug.contains("S3ObjectStore"), "got: {debug}");
        assert!(!debug.contains("HttpObjectStore"), "got: {debug}");
    }

    #[test]
    fn explicit_endpoint_uses_unsigned_http() {
        let config = ConverterConfig::builder()
            .storage_endpoint("http://localhost:9000")
            .build()
            .unwrap();
        let debug = format!("{:?}", Converter::from_config(config).unwrap());
        assert!(debug.contains("HttpObjectStore"), "got: {debug}");
        assert!(!debug.contains("S3ObjectStore"), "got: {debug}");
    }

    #[test]
    fn from_config_rejects_bad_endpoint() {
        let config = ConverterConfig::builder()
            .storage_endpoint("::not a url::")
            .build()
            .unwrap();
        assert!(Converter::from_config(config).is_err());
    }
}
