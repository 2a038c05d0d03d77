//! # HTTP Transport
//!
//! The single seam between the engine and the network.
//!
//! ## Layering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   RequestClient (retry, classification, token handling)                 │
//! │        │                                                                │
//! │        │  ApiRequest + bearer token                                     │
//! │        ▼                                                                │
//! │   Transport trait ──────────► ReqwestTransport (production)             │
//! │        │                      scripted transports (tests)               │
//! │        ▼                                                                │
//! │   RawResponse { status, body }   or   TransportFailure { kind }         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A transport never interprets status codes. Any response that arrived,
//! including a 500, is a [`RawResponse`]; only requests that produced no
//! response at all become a [`TransportFailure`].

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, trace};
use url::Url;

use crate::error::{ClientError, ClientResult};

// =============================================================================
// Request / Response
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A request relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path below the base URL, e.g. `invoices/abc/payments`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        ApiRequest {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    /// POST with a JSON body.
    pub fn post<B: Serialize>(path: impl Into<String>, body: &B) -> ClientResult<Self> {
        Self::new(HttpMethod::Post, path).with_json(body)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_json<B: Serialize>(mut self, body: &B) -> ClientResult<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Whatever came back, unclassified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        RawResponse {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// =============================================================================
// Transport Failures
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, reset, DNS or TLS failure.
    Network,
    /// No response within the request timeout.
    Timeout,
    /// The request could not be built; nothing was sent.
    InvalidRequest,
}

/// A request that produced no HTTP response.
#[derive(Debug, Clone, Error)]
#[error("{kind:?}: {message}")]
pub struct TransportFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl TransportFailure {
    pub fn network(message: impl Into<String>) -> Self {
        TransportFailure {
            kind: FailureKind::Network,
            message: message.into(),
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        TransportFailure {
            kind: FailureKind::Timeout,
            message: message.into(),
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        TransportFailure {
            kind: FailureKind::InvalidRequest,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportFailure::timeout(err.to_string())
        } else if err.is_builder() {
            TransportFailure::invalid_request(err.to_string())
        } else {
            TransportFailure::network(err.to_string())
        }
    }
}

impl From<TransportFailure> for ClientError {
    fn from(failure: TransportFailure) -> Self {
        match failure.kind {
            FailureKind::Network => ClientError::Network(failure.message),
            FailureKind::Timeout => ClientError::Timeout(failure.message),
            FailureKind::InvalidRequest => ClientError::InvalidConfig(failure.message),
        }
    }
}

// =============================================================================
// Transport Trait
// =============================================================================

/// Sends one request, once. Retrying is the caller's job.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer_token: Option<&str>,
    ) -> Result<RawResponse, TransportFailure>;
}

// =============================================================================
// reqwest Implementation
// =============================================================================

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ReqwestTransport {
            client,
            base_url: normalize_base_url(base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, TransportFailure> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportFailure::invalid_request(format!("bad path {path:?}: {e}")))
    }
}

/// Ensures a trailing slash so `join` appends instead of replacing the last
/// path segment (`/api` + `invoices` must give `/api/invoices`).
pub fn normalize_base_url(base_url: &str) -> ClientResult<Url> {
    let trimmed = base_url.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    Ok(Url::parse(&with_slash)?)
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer_token: Option<&str>,
    ) -> Result<RawResponse, TransportFailure> {
        let url = self.endpoint(&request.path)?;
        trace!(method = %request.method, %url, "Sending request");

        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
            HttpMethod::Put => self.client.put(url),
            HttpMethod::Patch => self.client.patch(url),
            HttpMethod::Delete => self.client.delete(url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(token) = bearer_token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(request = %request, status, "Response received");
        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_base_url_join_keeps_prefix() {
        let transport =
            ReqwestTransport::new("https://pos.example.com/api", Duration::from_secs(5)).unwrap();
        let url = transport.endpoint("/invoices/abc/payments").unwrap();
        assert_eq!(url.as_str(), "https://pos.example.com/api/invoices/abc/payments");

        let again = normalize_base_url("https://pos.example.com/api/").unwrap();
        assert_eq!(again.as_str(), "https://pos.example.com/api/");
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            normalize_base_url("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_request_builders() {
        let req = ApiRequest::get("day-cycles/current").with_query("branchId", "b1");
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.query, vec![("branchId".to_string(), "b1".to_string())]);
        assert!(req.body.is_none());
        assert_eq!(req.to_string(), "GET day-cycles/current");

        let post = ApiRequest::post("invoices", &json!({"shelfId": "S1"})).unwrap();
        assert_eq!(post.method, HttpMethod::Post);
        assert_eq!(post.body, Some(json!({"shelfId": "S1"})));
    }

    #[test]
    fn test_failure_maps_to_client_error() {
        assert!(ClientError::from(TransportFailure::network("reset")).is_retryable());
        assert!(ClientError::from(TransportFailure::timeout("30s")).is_retryable());
        assert!(!ClientError::from(TransportFailure::invalid_request("bad")).is_retryable());
    }
}
