//! # Credential Store
//!
//! Holds the bearer token attached to API requests.
//!
//! ## Token Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   login screen (external) ── set_token ──► TokenStore                   │
//! │                                               │                         │
//! │   RequestClient ◄──────── get_token ──────────┘                         │
//! │        │                                                                │
//! │        ├── 2xx ──► done                                                 │
//! │        └── 401 ──► clear_token (once per failed call)                   │
//! │                     └──► screen routes the user back to login           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never logs in by itself; it only reads and invalidates.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Token information held by [`MemoryTokenStore`].
#[derive(Debug, Clone)]
pub struct TokenInfo {
    pub access_token: String,
    /// When the token stops being valid, if the server said.
    pub expires_at: Option<Instant>,
}

impl TokenInfo {
    pub fn new(access_token: impl Into<String>) -> Self {
        TokenInfo {
            access_token: access_token.into(),
            expires_at: None,
        }
    }

    pub fn expiring_in(access_token: impl Into<String>, ttl: Duration) -> Self {
        TokenInfo {
            access_token: access_token.into(),
            expires_at: Some(Instant::now() + ttl),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Storage seam for the bearer credential.
///
/// Implementations may persist to secure device storage; the client only
/// needs these three operations.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Current token, or `None` when signed out or expired.
    async fn get_token(&self) -> Option<String>;

    async fn set_token(&self, token: TokenInfo);

    /// Forgets the token. Called after a 401.
    async fn clear_token(&self);
}

/// In-memory token store.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    token: Arc<RwLock<Option<TokenInfo>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        MemoryTokenStore {
            token: Arc::new(RwLock::new(Some(TokenInfo::new(token)))),
        }
    }

    pub async fn is_authenticated(&self) -> bool {
        self.get_token().await.is_some()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn get_token(&self) -> Option<String> {
        let guard = self.token.read().await;
        match guard.as_ref() {
            Some(info) if info.is_expired() => {
                debug!("Cached token has expired");
                None
            }
            Some(info) => Some(info.access_token.clone()),
            None => None,
        }
    }

    async fn set_token(&self, token: TokenInfo) {
        *self.token.write().await = Some(token);
        debug!("Access token stored");
    }

    async fn clear_token(&self) {
        let previous = self.token.write().await.take();
        if previous.is_some() {
            warn!("Access token cleared");
        }
    }
}
