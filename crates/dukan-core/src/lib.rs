//! # dukan-core: Pure Business Logic for the Dukan POS Engine
//!
//! Invoice and settlement logic for a USD/SDG dual-currency business, as
//! pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Dukan POS Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile screens (external)                    │   │
//! │  │   Item search ──► Invoice ──► Tender ──► Receipt               │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                dukan-client (HTTP, retry, checkout)             │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ dukan-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌────────────────┐   │   │
//! │  │   │ currency │ │allocator │ │ invoice  │ │  settlement    │   │   │
//! │  │   │ USD⇄SDG  │ │ FIFO by  │ │ lines &  │ │ tender, change │   │   │
//! │  │   │          │ │ expiry   │ │ totals   │ │ payments       │   │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └────────────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO NETWORK • NO CLOCK READS • PURE FUNCTIONS        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - `Money` (integer minor units) and `DualMoney`
//! - [`currency`] - Exchange rates and USD ⇄ SDG conversion
//! - [`types`] - Domain types (batches, day cycles, statuses, discounts)
//! - [`allocator`] - Expiry-ordered batch selection
//! - [`invoice`] - Drafts, the totals calculator, finalized invoices
//! - [`settlement`] - Tender checks and payment application
//! - [`numbering`] - Invoice number generation
//! - [`validation`] - Field-level input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::{NaiveDate, Utc};
//! use dukan_core::{
//!     CatalogItem, DayCycle, DayCycleStatus, ExchangeRate, InvoiceDraft, InvoiceType, Money,
//!     PaymentEvent, PaymentStatus,
//! };
//! use dukan_core::settlement::apply_payment;
//! use rust_decimal::Decimal;
//!
//! let day = DayCycle {
//!     id: "dc-1".to_string(),
//!     branch_id: "branch-001".to_string(),
//!     date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
//!     status: DayCycleStatus::Open,
//!     rate: ExchangeRate::new(Decimal::from(600)).unwrap(),
//! };
//! let ctx = day.exchange_context().unwrap();
//!
//! let mut draft = InvoiceDraft::new(InvoiceType::Sale);
//! let item = CatalogItem::new("ITM-7", "Sugar 1kg", Money::from_minor(150));
//! draft.add_line(&ctx, &item, None, 2).unwrap();
//! assert_eq!(draft.totals().total.sdg.minor(), 180_000); // 1800.00 SDG
//!
//! let invoice = draft.finalize(Some(&day), "INV-0001", Utc::now()).unwrap();
//! let payment = PaymentEvent::cash(invoice.id(), Money::from_minor(180_000), Utc::now());
//! let invoice = apply_payment(&invoice, &payment).unwrap();
//! assert_eq!(invoice.payment_status(), PaymentStatus::Paid);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocator;
pub mod currency;
pub mod error;
pub mod invoice;
pub mod money;
pub mod numbering;
pub mod settlement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use allocator::{allocate, Allocation, NearExpiryWarning};
pub use currency::{to_sdg, to_usd, ExchangeRate, ExchangeRateContext};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{calculate_totals, Invoice, InvoiceDraft, InvoiceLine, InvoiceTotals};
pub use money::{DualMoney, Money};
pub use numbering::generate_invoice_number;
pub use settlement::{apply_payment, validate_tender, PaymentEvent, TenderAssessment};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single invoice line.
///
/// Wholesale orders run larger than retail ones, but a five-digit quantity
/// is almost always a typo.
pub const MAX_ITEM_QUANTITY: i64 = 9_999;

/// Maximum lines on a single invoice.
pub const MAX_INVOICE_LINES: usize = 200;

/// Maximum length of the branch code embedded in invoice numbers.
pub const MAX_BRANCH_PREFIX_LEN: usize = 8;

/// Maximum length of free-text invoice notes.
pub const MAX_NOTES_LEN: usize = 500;
