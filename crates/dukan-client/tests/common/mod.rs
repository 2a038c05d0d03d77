//! Shared fixtures: a scripted transport and a token store that counts
//! invalidations.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use dukan_client::{
    ApiRequest, MemoryTokenStore, RawResponse, RequestClient, RetryPolicy, TokenInfo, TokenStore,
    Transport, TransportFailure,
};

pub type Scripted = Result<RawResponse, TransportFailure>;

/// One request as the transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub request: ApiRequest,
    pub token: Option<String>,
    pub at: Instant,
}

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Scripted>) -> Arc<Self> {
        Arc::new(ScriptedTransport {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.calls().into_iter().map(|c| c.request.path).collect()
    }

    /// Gaps between consecutive calls.
    pub fn gaps(&self) -> Vec<Duration> {
        self.calls()
            .windows(2)
            .map(|pair| pair[1].at - pair[0].at)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        request: &ApiRequest,
        bearer_token: Option<&str>,
    ) -> Result<RawResponse, TransportFailure> {
        self.calls.lock().unwrap().push(RecordedCall {
            request: request.clone(),
            token: bearer_token.map(str::to_string),
            at: Instant::now(),
        });
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure::network("script exhausted")))
    }
}

/// [`MemoryTokenStore`] that counts `clear_token` calls.
#[derive(Default)]
pub struct CountingTokenStore {
    inner: MemoryTokenStore,
    clears: AtomicUsize,
}

impl CountingTokenStore {
    pub fn with_token(token: &str) -> Arc<Self> {
        Arc::new(CountingTokenStore {
            inner: MemoryTokenStore::with_token(token),
            clears: AtomicUsize::new(0),
        })
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenStore for CountingTokenStore {
    async fn get_token(&self) -> Option<String> {
        self.inner.get_token().await
    }

    async fn set_token(&self, token: TokenInfo) {
        self.inner.set_token(token).await
    }

    async fn clear_token(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.inner.clear_token().await
    }
}

// =============================================================================
// Response helpers
// =============================================================================

pub fn status(code: u16) -> Scripted {
    Ok(RawResponse::new(code, ""))
}

pub fn json(code: u16, body: Value) -> Scripted {
    Ok(RawResponse::new(code, body.to_string()))
}

/// A 200 wrapping `data` in the standard envelope.
pub fn ok(data: Value) -> Scripted {
    json(200, serde_json::json!({ "success": true, "data": data }))
}

pub fn network_down() -> Scripted {
    Err(TransportFailure::network("connection refused"))
}

pub fn client(
    transport: Arc<ScriptedTransport>,
    tokens: Arc<CountingTokenStore>,
    policy: RetryPolicy,
) -> RequestClient {
    RequestClient::new(transport, tokens, policy)
}
