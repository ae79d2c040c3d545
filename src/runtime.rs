//! Minimal AWS Lambda custom-runtime client.
//!
//! The `bootstrap` binary speaks the Lambda Runtime API directly over HTTP:
//!
//! ```text
//! loop {
//!     GET  /2018-06-01/runtime/invocation/next          → event + request id
//!     POST /2018-06-01/runtime/invocation/{id}/response ← { statusCode, body }
//! }
//! ```
//!
//! Conversion failures are ordinary responses (status 400/500 in the body).
//! The `/error` endpoint is used when the event payload is not JSON, or when
//! the Runtime API refuses the response (413 for anything over 6 MB).
//! Invocations are processed one at a time, and only a failing
//! `/invocation/next` ends the loop.

use crate::convert::Converter;
use crate::output::HandlerResponse;
use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

const API_VERSION: &str = "2018-06-01";
const REQUEST_ID_HEADER: &str = "Lambda-Runtime-Aws-Request-Id";
const TRACE_ID_HEADER: &str = "Lambda-Runtime-Trace-Id";

/// Errors talking to the Runtime API itself.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("AWS_LAMBDA_RUNTIME_API is not set")]
    NotInLambda,

    #[error("Runtime API request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Runtime API returned HTTP {status} for {endpoint}")]
    Status { endpoint: String, status: u16 },

    #[error("Runtime API response is missing the {0} header")]
    MissingHeader(&'static str),
}

/// One invocation pulled from `/invocation/next`.
#[derive(Debug)]
pub struct Invocation {
    pub request_id: String,
    pub trace_id: Option<String>,
    pub payload: Vec<u8>,
}

/// Error document accepted by the `/error` endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeErrorBody {
    pub error_message: String,
    pub error_type: String,
}

/// HTTP client for the Lambda Runtime API.
#[derive(Debug, Clone)]
pub struct RuntimeClient {
    client: reqwest::Client,
    base: String,
}

impl RuntimeClient {
    /// `api` is the `host:port` from `AWS_LAMBDA_RUNTIME_API`.
    pub fn new(api: &str) -> Result<Self, RuntimeError> {
        // No timeout: `/invocation/next` long-polls until an event arrives.
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            base: format!("http://{}/{}/runtime", api.trim_end_matches('/'), API_VERSION),
        })
    }

    pub fn from_env() -> Result<Self, RuntimeError> {
        let api = std::env::var("AWS_LAMBDA_RUNTIME_API").map_err(|_| RuntimeError::NotInLambda)?;
        Self::new(&api)
    }

    pub fn next_url(&self) -> String {
        format!("{}/invocation/next", self.base)
    }

    pub fn response_url(&self, request_id: &str) -> String {
        format!("{}/invocation/{}/response", self.base, request_id)
    }

    pub fn invocation_error_url(&self, request_id: &str) -> String {
        format!("{}/invocation/{}/error", self.base, request_id)
    }

    pub fn init_error_url(&self) -> String {
        format!("{}/init/error", self.base)
    }

    /// Block until the next event is available.
    pub async fn next_invocation(&self) -> Result<Invocation, RuntimeError> {
        let url = self.next_url();
        let response = self.client.get(&url).send().await?;
        check_status(&url, response.status())?;

        let headers = response.headers().clone();
        let request_id =
            header(&headers, REQUEST_ID_HEADER).ok_or(RuntimeError::MissingHeader(REQUEST_ID_HEADER))?;
        let trace_id = header(&headers, TRACE_ID_HEADER);
        let payload = response.bytes().await?.to_vec();

        Ok(Invocation {
            request_id,
            trace_id,
            payload,
        })
    }

    pub async fn send_response(
        &self,
        request_id: &str,
        response: &HandlerResponse,
    ) -> Result<(), RuntimeError> {
        self.post(&self.response_url(request_id), response).await
    }

    pub async fn send_invocation_error(
        &self,
        request_id: &str,
        body: &RuntimeErrorBody,
    ) -> Result<(), RuntimeError> {
        self.post(&self.invocation_error_url(request_id), body).await
    }

    /// Report a failure during cold start; Lambda then recycles the sandbox.
    pub async fn send_init_error(&self, body: &RuntimeErrorBody) -> Result<(), RuntimeError> {
        self.post(&self.init_error_url(), body).await
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &str, body: &T) -> Result<(), RuntimeError> {
        let response = self.client.post(url).json(body).send().await?;
        check_status(url, response.status())
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn check_status(endpoint: &str, status: reqwest::StatusCode) -> Result<(), RuntimeError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(RuntimeError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
        })
    }
}

/// Serve invocations forever.
///
/// Returns only when `/invocation/next` fails. Anything that goes wrong with a
/// single invocation is reported for that invocation and the loop moves on.
pub async fn run(client: &RuntimeClient, converter: &Converter) -> Result<(), RuntimeError> {
    info!("Lambda runtime loop started");
    loop {
        let invocation = client.next_invocation().await?;
        debug!(
            "Invocation {} (trace {:?}), {} byte payload",
            invocation.request_id,
            invocation.trace_id,
            invocation.payload.len()
        );

        if let Err(e) = handle_invocation(client, converter, &invocation).await {
            error!("Invocation {} could not be reported: {}", invocation.request_id, e);
        }
    }
}

async fn handle_invocation(
    client: &RuntimeClient,
    converter: &Converter,
    invocation: &Invocation,
) -> Result<(), RuntimeError> {
    let request_id = invocation.request_id.as_str();

    let event = match serde_json::from_slice::<Value>(&invocation.payload) {
        Ok(event) => event,
        Err(e) => {
            warn!("Invocation {} has a non-JSON payload: {}", request_id, e);
            let body = RuntimeErrorBody {
                error_message: format!("event is not valid JSON: {e}"),
                error_type: "InvalidEvent".to_string(),
            };
            return client.send_invocation_error(request_id, &body).await;
        }
    };

    let response = converter.handle_event(&event).await;
    match client.send_response(request_id, &response).await {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Response for {} was not accepted: {}", request_id, e);
            let body = RuntimeErrorBody {
                error_message: e.to_string(),
                error_type: rejection_type(&e).to_string(),
            };
            client.send_invocation_error(request_id, &body).await
        }
    }
}

fn rejection_type(e: &RuntimeError) -> &'static str {
    match e {
        RuntimeError::Status { status: 413, .. } => "ResponseTooLarge",
        _ => "ResponseRejected",
    }
}
