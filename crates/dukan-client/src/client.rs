//! # Request Client
//!
//! Authenticated, retrying JSON calls against the POS API.
//!
//! ## Call Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   call(request)                                                         │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │   ┌──────────────┐    ┌──────────────┐    ┌────────────────────────┐   │
//! │   │ attach token │───►│  Transport   │───►│ classify response      │   │
//! │   └──────────────┘    └──────────────┘    └───────────┬────────────┘   │
//! │          ▲                                            │                │
//! │          │        retryable? (5xx/408/429/network)    │                │
//! │          └──── sleep base × 2^n ◄─── yes ─────────────┤                │
//! │                                                       │ no / budget    │
//! │                                                       ▼   exhausted    │
//! │                                          Ok(data) or last error        │
//! │                                          (401 clears the token once)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Response Classification
//! | Response                                   | Result                  |
//! |--------------------------------------------|-------------------------|
//! | 401, or envelope code `UNAUTHORIZED`       | `Unauthorized`          |
//! | 409, or envelope code `INSUFFICIENT_STOCK` | `StockConflict`         |
//! | 408, 429, 500, 502, 503, 504               | `Http` (retried)        |
//! | other 4xx                                  | `Validation`            |
//! | other non-2xx                              | `Http` (not retried)    |
//! | 2xx with `success: false`                  | `Api`                   |
//! | 2xx otherwise                              | `data` (or whole body)  |

use backoff::backoff::Backoff;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, warn};

use crate::auth::TokenStore;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult, RETRYABLE_STATUSES};
use crate::retry::RetryPolicy;
use crate::transport::{ApiRequest, RawResponse, ReqwestTransport, Transport};

/// Envelope code for an invalid or expired credential.
pub const CODE_UNAUTHORIZED: &str = "UNAUTHORIZED";

/// Envelope code for a stock conflict detected by the server.
pub const CODE_INSUFFICIENT_STOCK: &str = "INSUFFICIENT_STOCK";

/// Longest slice of a non-JSON body quoted in an error message.
const MAX_BODY_EXCERPT: usize = 200;

/// The server's standard response wrapper.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    success: Option<bool>,
    #[serde(default)]
    data: Option<Value>,
    message: Option<String>,
    error: Option<String>,
    code: Option<String>,
}

impl Envelope {
    fn parse(body: &str) -> Option<Envelope> {
        serde_json::from_str::<Envelope>(body).ok()
    }

    fn message(&self) -> Option<String> {
        self.message.clone().or_else(|| self.error.clone())
    }
}

// =============================================================================
// Request Client
// =============================================================================

/// Sends [`ApiRequest`]s with the stored bearer token and retries transient
/// failures.
#[derive(Clone)]
pub struct RequestClient {
    transport: Arc<dyn Transport>,
    tokens: Arc<dyn TokenStore>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for RequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestClient")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RequestClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenStore>,
        policy: RetryPolicy,
    ) -> Self {
        RequestClient {
            transport,
            tokens,
            policy,
        }
    }

    /// Builds a client over HTTP from validated configuration.
    pub fn from_config(config: &ClientConfig, tokens: Arc<dyn TokenStore>) -> ClientResult<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(&config.api.base_url, config.request_timeout())?;
        Ok(Self::new(Arc::new(transport), tokens, config.retry_policy()))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Sends `request` under the client's default retry policy.
    pub async fn call<T: DeserializeOwned>(&self, request: &ApiRequest) -> ClientResult<T> {
        self.call_with(request, self.policy).await
    }

    /// Sends `request` under an explicit retry policy.
    ///
    /// Returns the decoded payload, or the error from the last attempt once
    /// the retry budget is spent. Non-retryable errors return immediately.
    pub async fn call_with<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        policy: RetryPolicy,
    ) -> ClientResult<T> {
        let mut backoff = policy.backoff();
        let mut attempt: u32 = 0;

        loop {
            let err = match self.attempt::<T>(request).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(request = %request, attempt, "Request succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if err.is_auth_error() {
                warn!(request = %request, "Credential rejected, clearing token");
                self.tokens.clear_token().await;
                return Err(err);
            }

            if !err.is_retryable() {
                debug!(request = %request, error = %err, "Request failed");
                return Err(err);
            }

            match backoff.next_backoff() {
                Some(delay) => {
                    warn!(
                        request = %request,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    error!(
                        request = %request,
                        attempts = attempt + 1,
                        error = %err,
                        "Retries exhausted"
                    );
                    return Err(err);
                }
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(&self, request: &ApiRequest) -> ClientResult<T> {
        let token = self.tokens.get_token().await;
        let response = self.transport.send(request, token.as_deref()).await?;
        classify_response(response)
    }
}

// =============================================================================
// Response Classification
// =============================================================================

/// Turns a raw response into a payload or a typed error.
pub fn classify_response<T: DeserializeOwned>(response: RawResponse) -> ClientResult<T> {
    let RawResponse { status, body } = response;
    let envelope = Envelope::parse(&body);
    let code = envelope.as_ref().and_then(|e| e.code.clone());
    let message = envelope
        .as_ref()
        .and_then(Envelope::message)
        .unwrap_or_else(|| fallback_message(status, &body));

    if status == 401 || code.as_deref() == Some(CODE_UNAUTHORIZED) {
        return Err(ClientError::Unauthorized(message));
    }
    if status == 409 || code.as_deref() == Some(CODE_INSUFFICIENT_STOCK) {
        return Err(ClientError::StockConflict(message));
    }

    if !(200..300).contains(&status) {
        return Err(if RETRYABLE_STATUSES.contains(&status) {
            ClientError::Http { status, message }
        } else if (400..500).contains(&status) {
            ClientError::Validation { status, message }
        } else {
            ClientError::Http { status, message }
        });
    }

    if envelope.as_ref().and_then(|e| e.success) == Some(false) {
        return Err(ClientError::Api { code, message });
    }

    let payload = if body.trim().is_empty() {
        Value::Null
    } else {
        let value: Value = serde_json::from_str(&body)?;
        match value {
            Value::Object(mut map) if map.contains_key("success") => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        }
    };

    Ok(serde_json::from_value(payload)?)
}

fn fallback_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return format!("HTTP {status}");
    }
    let excerpt: String = trimmed.chars().take(MAX_BODY_EXCERPT).collect();
    format!("HTTP {status}: {excerpt}")
}
