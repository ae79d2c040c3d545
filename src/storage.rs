//! Object-storage collaborator: fetch raw PDF bytes by bucket and key.
//!
//! The resolver only needs one capability from storage, so [`ObjectStore`]
//! exposes exactly that. The store is constructed once per process and
//! injected into [`crate::Converter`]; nothing here is a global client.
//!
//! Three implementations ship with the crate:
//!
//! * [`S3ObjectStore`]: Amazon S3 through `aws-sdk-s3`, signed with the
//!   default credential chain (the function's IAM role inside Lambda). This
//!   is what [`crate::Converter::from_config`] uses unless told otherwise.
//! * [`HttpObjectStore`]: unsigned path-style `GET {endpoint}/{bucket}/{key}`
//!   for an explicit `PDF2PNG_S3_ENDPOINT` (public buckets, signing gateways,
//!   local S3 emulators).
//! * [`LocalObjectStore`]: serves `{root}/{bucket}/{key}` from disk. Handy
//!   for local invocations and tests.

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use futures::future::BoxFuture;
use reqwest::Url;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::debug;

/// Errors returned by an [`ObjectStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found")]
    NotFound,

    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("{0}")]
    Transport(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Get-object-by-bucket-and-key.
pub trait ObjectStore: Send + Sync + fmt::Debug {
    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>>;
}

// ── Amazon S3 ─────────────────────────────────────────────────────────────

/// Signed reader for Amazon S3.
///
/// The SDK client is built on first use, so constructing the store never
/// touches the network or the credential chain.
pub struct S3ObjectStore {
    client: OnceCell<aws_sdk_s3::Client>,
    timeout_secs: u64,
}

impl S3ObjectStore {
    /// Store configured from the environment (`AWS_REGION`, credentials chain).
    pub fn new(timeout_secs: u64) -> Self {
        Self {
            client: OnceCell::new(),
            timeout_secs,
        }
    }

    /// Store around an already-configured client.
    pub fn with_client(client: aws_sdk_s3::Client, timeout_secs: u64) -> Self {
        Self {
            client: OnceCell::new_with(Some(client)),
            timeout_secs,
        }
    }

    async fn client(&self) -> &aws_sdk_s3::Client {
        let timeout_secs = self.timeout_secs;
        self.client
            .get_or_init(|| async move {
                let timeouts = aws_config::timeout::TimeoutConfig::builder()
                    .operation_timeout(Duration::from_secs(timeout_secs))
                    .build();
                let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                    .timeout_config(timeouts)
                    .load()
                    .await;
                debug!("S3 client ready (region {:?})", config.region());
                aws_sdk_s3::Client::new(&config)
            })
            .await
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        if bucket.is_empty() || key.is_empty() {
            return Err(StorageError::InvalidKey(format!("{bucket}/{key}")));
        }

        let output = self
            .client()
            .await
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e {
                SdkError::TimeoutError(_) => StorageError::Timeout(self.timeout_secs),
                other => match other.into_service_error() {
                    GetObjectError::NoSuchKey(_) => StorageError::NotFound,
                    service => StorageError::Transport(DisplayErrorContext(service).to_string()),
                },
            })?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(bytes.into_bytes().to_vec())
    }
}

impl fmt::Debug for S3ObjectStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3ObjectStore")
            .field("timeout_secs", &self.timeout_secs)
            .field("initialised", &self.client.initialized())
            .finish()
    }
}

impl ObjectStore for S3ObjectStore {
    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(self.fetch(bucket, key))
    }
}

// ── HTTP ──────────────────────────────────────────────────────────────────

/// Anonymous path-style reader for S3-compatible endpoints.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    endpoint: Url,
    timeout_secs: u64,
}

impl HttpObjectStore {
    /// Create a store for `endpoint`, e.g. `https://s3.eu-west-1.amazonaws.com`
    /// or `http://localhost:9000`.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, StorageError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StorageError::Transport(format!("bad endpoint '{endpoint}': {e}")))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("pdf2png/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            timeout_secs,
        })
    }

    /// Build the object URL. Each key segment is percent-encoded separately
    /// so that `/` inside the key keeps its meaning.
    pub fn object_url(&self, bucket: &str, key: &str) -> Result<Url, StorageError> {
        if bucket.is_empty() || key.is_empty() {
            return Err(StorageError::InvalidKey(format!("{bucket}/{key}")));
        }
        let mut url = self.endpoint.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| StorageError::Transport("endpoint cannot be a base URL".into()))?;
            segments.pop_if_empty().push(bucket).extend(key.split('/'));
        }
        Ok(url)
    }

    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.object_url(bucket, key)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                StorageError::Timeout(self.timeout_secs)
            } else {
                StorageError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound);
        }
        if !status.is_success() {
            return Err(StorageError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Transport(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

impl ObjectStore for HttpObjectStore {
    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(self.fetch(bucket, key))
    }
}

// ── Local directory ───────────────────────────────────────────────────────

/// Reads objects from `{root}/{bucket}/{key}`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Map `bucket/key` onto a path under the root. Keys that would climb out
    /// of the root (`..`, absolute paths) are refused.
    pub fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(bucket).join(key);
        let escapes = bucket.is_empty()
            || key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::InvalidKey(format!("{bucket}/{key}")));
        }
        Ok(self.root.join(relative))
    }

    async fn read(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.object_path(bucket, key)?;
        debug!("Reading {}", path.display());
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound
            } else {
                StorageError::Io(e)
            }
        })
    }
}

impl ObjectStore for LocalObjectStore {
    fn get_object<'a>(
        &'a self,
        bucket: &'a str,
        key: &'a str,
    ) -> BoxFuture<'a, Result<Vec<u8>, StorageError>> {
        Box::pin(self.read(bucket, key))
    }
}
