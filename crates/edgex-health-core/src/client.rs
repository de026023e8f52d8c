//! Retrying request executor for a single backend.
//!
//! [`BackendClient`] turns a method, a path and a set of [`RequestOptions`]
//! into one or more transport attempts. It owns the retry policy, enforces
//! the caller's deadline, and classifies every failure as a [`Fault`] (or a
//! body encode/decode error) before handing it back.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::fault::{Fault, Status};
use crate::http_client::{
    HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    RequestAuthenticator,
};
use crate::retry::RetryConfig;

/// Code for a response whose status differs from the expected one.
pub const UNEXPECTED_STATUS_CODE: &str = "unexpected_status_code";
/// Code for a call whose deadline elapsed.
pub const DEADLINE_EXCEEDED_CODE: &str = "deadline_exceeded";
/// Code for a transport failure that survived every retry.
pub const TRANSPORT_ERROR_CODE: &str = "transport_error";

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const USER_AGENT: &str = concat!("edgex-health/", env!("CARGO_PKG_VERSION"));

/// Per-call deadline and correlation id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    deadline: Option<Instant>,
    request_id: Option<String>,
}

impl RequestContext {
    /// A context without deadline or request id.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            request_id: None,
        }
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn maybe_request_id(mut self, request_id: Option<&str>) -> Self {
        self.request_id = request_id.map(str::to_owned);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn is_expired(&self) -> bool {
        self.deadline
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}

/// Options of one request. Built once, then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOptions {
    body: Option<String>,
    expected_status: u16,
    headers: BTreeMap<String, String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            body: None,
            expected_status: 200,
            headers: BTreeMap::new(),
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serializes `body` as the JSON request payload.
    pub fn with_json_body<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, RequestError> {
        self.body = Some(serde_json::to_string(body).map_err(RequestError::Encode)?);
        Ok(self)
    }

    /// Sets the status a successful response must carry.
    pub fn with_expected_status(mut self, status: u16) -> Result<Self, RequestError> {
        if !(100..=599).contains(&status) {
            return Err(Fault::new(
                Status::InvalidArgument,
                "invalid_expected_status",
                format!("expected status {status} is not a valid HTTP status code"),
            )
            .into());
        }
        self.expected_status = status;
        Ok(self)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub const fn expected_status(&self) -> u16 {
        self.expected_status
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// Failure of a client call.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),
}

impl RequestError {
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::Fault(fault) => Some(fault),
            Self::Encode(_) | Self::Decode(_) => None,
        }
    }

    pub fn status(&self) -> Option<Status> {
        self.fault().map(Fault::status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(Status::NotFound)
    }
}

/// Error body returned by the EdgeX services on failure.
#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorPayload {
    #[serde(default)]
    #[allow(dead_code)]
    status: serde_json::Value,
    #[serde(default)]
    error: ErrorDetail,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    detail: String,
    #[serde(default)]
    message: String,
}

/// HTTP client bound to one backend base URL.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
    retry: RetryConfig,
    auth: Option<Arc<dyn RequestAuthenticator>>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, http: Arc<dyn HttpClient>, retry: RetryConfig) -> Self {
        Self {
            base_url: base_url.into(),
            http,
            retry,
            auth: None,
        }
    }

    pub fn with_authenticator(mut self, auth: Arc<dyn RequestAuthenticator>) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    pub async fn get(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<(), RequestError> {
        self.execute(ctx, HttpMethod::Get, path, options).await.map(drop)
    }

    /// GET and decode the response body into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<T, RequestError> {
        let response = self.execute(ctx, HttpMethod::Get, path, options).await?;
        decode_body(&response)
    }

    pub async fn post(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<(), RequestError> {
        self.execute(ctx, HttpMethod::Post, path, options).await.map(drop)
    }

    pub async fn patch(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<(), RequestError> {
        self.execute(ctx, HttpMethod::Patch, path, options).await.map(drop)
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        path: &str,
        options: &RequestOptions,
    ) -> Result<(), RequestError> {
        self.execute(ctx, HttpMethod::Delete, path, options).await.map(drop)
    }

    /// Runs the attempt loop and returns the response carrying the expected
    /// status.
    pub async fn execute(
        &self,
        ctx: &RequestContext,
        method: HttpMethod,
        path: &str,
        options: &RequestOptions,
    ) -> Result<HttpResponse, RequestError> {
        let url = self.url_for(path);

        if ctx.is_expired() {
            return Err(deadline_fault(method, &url).into());
        }

        let mut retries = 0_u32;
        loop {
            let request = self.build_request(ctx, method, &url, options)?;
            debug!(method = %method, url = %url, attempt = retries + 1, "processing request");

            let outcome = match ctx.deadline() {
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, self.http.execute(request)).await {
                        Ok(outcome) => outcome,
                        Err(_) => return Err(deadline_fault(method, &url).into()),
                    }
                }
                None => self.http.execute(request).await,
            };

            let retryable = match &outcome {
                Ok(response) => self.retry.should_retry_status(response.status),
                Err(error) => self.retry.should_retry_error(error),
            };

            if !retryable || !self.retry.has_budget(retries) {
                return match outcome {
                    Ok(response) => self.finish(method, &url, options, response),
                    Err(error) => Err(transport_fault(method, &url, error).into()),
                };
            }

            let delay = self.retry.delay_for_attempt(retries);
            match &outcome {
                Ok(response) => warn!(
                    method = %method,
                    url = %url,
                    status = response.status,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request after retryable status"
                ),
                Err(error) => warn!(
                    method = %method,
                    url = %url,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "retrying request after transport error"
                ),
            }

            if let Some(deadline) = ctx.deadline() {
                if Instant::now() + delay >= deadline {
                    return Err(deadline_fault(method, &url).into());
                }
            }
            tokio::time::sleep(delay).await;
            retries += 1;
        }
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn build_request(
        &self,
        ctx: &RequestContext,
        method: HttpMethod,
        url: &str,
        options: &RequestOptions,
    ) -> Result<HttpRequest, RequestError> {
        let mut request = HttpRequest::new(method, url).with_header("user-agent", USER_AGENT);

        if let Some(id) = ctx.id() {
            request.set_header(REQUEST_ID_HEADER, id);
        }

        if let Some(body) = options.body() {
            request = request
                .with_header("content-type", "application/json")
                .with_body(body);
        }

        for (name, value) in options.headers() {
            request.set_header(name.as_str(), value.as_str());
        }

        if let Some(remaining) = ctx.remaining() {
            request = request.with_timeout(remaining);
        }

        if let Some(auth) = &self.auth {
            auth.authenticate(&mut request)?;
        }

        Ok(request)
    }

    fn finish(
        &self,
        method: HttpMethod,
        url: &str,
        options: &RequestOptions,
        response: HttpResponse,
    ) -> Result<HttpResponse, RequestError> {
        if response.status == options.expected_status() {
            debug!(method = %method, url = %url, status = response.status, "request succeeded");
            return Ok(response);
        }

        Err(status_error(&response))
    }
}

fn decode_body<T: DeserializeOwned>(response: &HttpResponse) -> Result<T, RequestError> {
    let decoded = serde_json::from_str(&response.body).map_err(RequestError::Decode)?;
    debug!(bytes = response.body.len(), "decoded response body");
    Ok(decoded)
}

/// Classifies a response whose status differs from the expected one.
fn status_error(response: &HttpResponse) -> RequestError {
    let code = response.status;
    let status = Status::from_http_status(code);
    let body = response.body.trim();

    let (payload_code, detail) = if body.is_empty() {
        (String::new(), format!("Unexpected status code {code}"))
    } else if body.starts_with('{') {
        match serde_json::from_str::<ErrorPayload>(body) {
            Ok(payload) => {
                let detail = if payload.error.detail.is_empty() {
                    format!("Unexpected status code {code}")
                } else {
                    payload.error.detail
                };
                (payload.error.message, detail)
            }
            Err(error) => return RequestError::Decode(error),
        }
    } else {
        (String::new(), body.to_owned())
    };

    let fault_code = if Status::is_mapped_http_status(code) && !payload_code.is_empty() {
        payload_code
    } else {
        UNEXPECTED_STATUS_CODE.to_owned()
    };

    Fault::new(status, fault_code, detail).into()
}

fn deadline_fault(method: HttpMethod, url: &str) -> Fault {
    Fault::new(
        Status::DeadlineExceeded,
        DEADLINE_EXCEEDED_CODE,
        format!("{method} {url}: deadline exceeded"),
    )
}

fn transport_fault(method: HttpMethod, url: &str, error: HttpError) -> Fault {
    let status = match error.kind() {
        HttpErrorKind::Timeout => Status::DeadlineExceeded,
        HttpErrorKind::Connect => Status::Unavailable,
        HttpErrorKind::Other => Status::Unknown,
    };

    Fault::new_from(
        error,
        status,
        TRANSPORT_ERROR_CODE,
        format!("{method} {url} failed"),
    )
}
