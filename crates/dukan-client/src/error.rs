//! # Client Error Types
//!
//! Error types for every remote call and local configuration step.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Client Error Categories                            │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │   Transport     │  │     Server              │ │
//! │  │                 │  │   (retryable)   │  │                         │ │
//! │  │  InvalidConfig  │  │  Network        │  │  Http {408,429,5xx} ↻  │ │
//! │  │  InvalidUrl     │  │  Timeout        │  │  Validation (4xx)       │ │
//! │  │  ConfigLoad/Save│  │                 │  │  Unauthorized (401)     │ │
//! │  └─────────────────┘  └─────────────────┘  │  StockConflict (409)    │ │
//! │                                            │  Api (2xx, success=false)│ │
//! │  ┌─────────────────┐  ┌─────────────────┐  └─────────────────────────┘ │
//! │  │    Protocol     │  │     Core        │                              │
//! │  │  Decode         │  │  CoreError      │  ↻ = retried within budget   │
//! │  └─────────────────┘  └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Classification is done on typed fields (status codes, transport kind),
//! never on message text.

use dukan_core::CoreError;
use thiserror::Error;

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// HTTP statuses that are retried.
pub const RETRYABLE_STATUSES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Client error type covering all remote and configuration failures.
#[derive(Debug, Error)]
pub enum ClientError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Transport Errors
    // =========================================================================
    /// Connection refused, DNS failure, reset, TLS failure.
    #[error("Network error: {0}")]
    Network(String),

    /// The request did not complete in time.
    #[error("Request timed out: {0}")]
    Timeout(String),

    // =========================================================================
    // Server Errors
    // =========================================================================
    /// An HTTP failure not covered by a more specific variant.
    #[error("Server returned {status}: {message}")]
    Http { status: u16, message: String },

    /// The server rejected the request as invalid (non-retryable 4xx).
    #[error("Request rejected ({status}): {message}")]
    Validation { status: u16, message: String },

    /// The credential is missing, expired, or revoked.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server's stock differs from what the draft was built against.
    #[error("Stock conflict: {0}")]
    StockConflict(String),

    /// A 2xx response whose envelope reports failure.
    #[error("{message}")]
    Api { code: Option<String>, message: String },

    // =========================================================================
    // Protocol Errors
    // =========================================================================
    #[error("Failed to decode response: {0}")]
    Decode(String),

    // =========================================================================
    // Local Errors
    // =========================================================================
    /// A business rule failed before anything was sent.
    #[error(transparent)]
    Core(#[from] CoreError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else if err.is_builder() {
            ClientError::InvalidConfig(err.to_string())
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Decode(err.to_string())
    }
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        ClientError::InvalidUrl(err.to_string())
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ClientError {
    fn from(err: toml::de::Error) -> Self {
        ClientError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ClientError {
    fn from(err: toml::ser::Error) -> Self {
        ClientError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl ClientError {
    /// Returns true if the request may succeed when sent again.
    ///
    /// ## Retryable
    /// - Network failures and timeouts
    /// - HTTP 408, 429, 500, 502, 503, 504
    ///
    /// ## Non-Retryable
    /// - Other 4xx, including 401 and 409
    /// - Semantic errors in a 2xx envelope
    /// - Decode, configuration and local business errors
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Timeout(_) => true,
            ClientError::Http { status, .. } => RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    /// Returns true if the cached credential should be dropped.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ClientError::InvalidConfig(_)
                | ClientError::InvalidUrl(_)
                | ClientError::ConfigLoadFailed(_)
                | ClientError::ConfigSaveFailed(_)
        )
    }

    /// Short, actionable text for the cashier.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Network(_) => {
                "Cannot reach the server. Check the connection and try again.".to_string()
            }
            ClientError::Timeout(_) => {
                "The server took too long to respond. Try again.".to_string()
            }
            ClientError::Http { status, .. } if *status >= 500 => {
                "The server is having trouble. Try again in a moment.".to_string()
            }
            ClientError::Http { status, message } => format!("Request failed ({status}): {message}"),
            ClientError::Validation { message, .. } => message.clone(),
            ClientError::Unauthorized(_) => "Your session has expired. Please sign in again.".to_string(),
            ClientError::StockConflict(message) => {
                format!("Stock changed on the server: {message}. Refresh the invoice and try again.")
            }
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Decode(_) => "Unexpected response from the server.".to_string(),
            ClientError::Core(err) => err.to_string(),
            ClientError::InvalidConfig(_)
            | ClientError::InvalidUrl(_)
            | ClientError::ConfigLoadFailed(_)
            | ClientError::ConfigSaveFailed(_) => {
                format!("The app is misconfigured: {self}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(ClientError::Network("reset".into()).is_retryable());
        assert!(ClientError::Timeout("30s".into()).is_retryable());
        for status in RETRYABLE_STATUSES {
            assert!(ClientError::Http {
                status,
                message: String::new()
            }
            .is_retryable());
        }

        assert!(!ClientError::Http {
            status: 501,
            message: String::new()
        }
        .is_retryable());
        assert!(!ClientError::Validation {
            status: 404,
            message: "not found".into()
        }
        .is_retryable());
        assert!(!ClientError::Unauthorized("expired".into()).is_retryable());
        assert!(!ClientError::StockConflict("ITM-7".into()).is_retryable());
        assert!(!ClientError::Api {
            code: None,
            message: "Day is closed".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_auth_error() {
        assert!(ClientError::Unauthorized("expired".into()).is_auth_error());
        assert!(!ClientError::Network("down".into()).is_auth_error());
    }

    #[test]
    fn test_user_messages() {
        assert!(ClientError::Network("x".into())
            .user_message()
            .contains("Cannot reach the server"));
        assert_eq!(
            ClientError::Api {
                code: Some("DAY_CLOSED".into()),
                message: "Open the day first".into()
            }
            .user_message(),
            "Open the day first"
        );
        let core = ClientError::from(CoreError::EmptyInvoice);
        assert_eq!(core.user_message(), "Cannot finalize an invoice with no lines");
    }
}
