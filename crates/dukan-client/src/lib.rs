//! # dukan-client: Resilient API Client for the Dukan POS Engine
//!
//! Everything in the engine that talks to the network lives here; the
//! business rules it applies before talking live in `dukan-core`.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Client Architecture                             │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  Checkout (orchestration)                        │  │
//! │  │  local checks → create invoice → payment → daily totals          │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │  ┌────────────────────────────▼─────────────────────────────────────┐  │
//! │  │                  PosApi (typed endpoints)                        │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │  ┌────────────────────────────▼─────────────────────────────────────┐  │
//! │  │     RequestClient (token, retry with backoff, classification)    │  │
//! │  └──────────────┬──────────────────────────────────┬────────────────┘  │
//! │                 │                                  │                    │
//! │  ┌──────────────▼─────────────┐   ┌────────────────▼───────────────┐  │
//! │  │  Transport (reqwest)       │   │  TokenStore (bearer token)     │  │
//! │  └────────────────────────────┘   └────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`api`] - Endpoint wrappers and request/response bodies
//! - [`auth`] - Token store trait and in-memory implementation
//! - [`checkout`] - Submission and settlement orchestration
//! - [`client`] - Retrying request client and response classification
//! - [`config`] - Client configuration (TOML + environment)
//! - [`error`] - Client error types
//! - [`retry`] - Retry policy and backoff schedule
//! - [`telemetry`] - `tracing` subscriber setup
//! - [`transport`] - HTTP transport seam
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dukan_client::{Checkout, ClientConfig, MemoryTokenStore, SettlementPlan};
//!
//! let config = ClientConfig::load_or_default(None);
//! let tokens = Arc::new(MemoryTokenStore::with_token(access_token));
//! let checkout = Checkout::from_config(&config, tokens)?;
//!
//! let day = checkout.open_day().await?;
//! let report = checkout
//!     .submit(&draft, Some(&day), "shelf-1", SettlementPlan::PayInFull { cash_sdg, card_sdg })
//!     .await?;
//! println!("change: {}", report.change_sdg);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod api;
pub mod auth;
pub mod checkout;
pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod telemetry;
pub mod transport;

// =============================================================================
// Re-exports
// =============================================================================

pub use api::{
    CreateInvoiceRequest, DailyTotalsDelta, InvoiceReceipt, PosApi, RecordPaymentRequest,
    StockLocation,
};
pub use auth::{MemoryTokenStore, TokenInfo, TokenStore};
pub use checkout::{
    Checkout, SecondaryEffect, SecondaryFailure, SettlementOutcome, SettlementPlan,
    SubmissionReport,
};
pub use client::RequestClient;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use retry::RetryPolicy;
pub use telemetry::init_tracing;
pub use transport::{
    ApiRequest, FailureKind, HttpMethod, RawResponse, ReqwestTransport, Transport,
    TransportFailure,
};
