//! # Error Types
//!
//! Domain-specific error types for dukan-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  dukan-core errors (this file)                                         │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  dukan-client errors (separate crate)                                  │
//! │  └── ClientError      - Transport, HTTP and server failures            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → Screen message      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Near-expiry stock is NOT an error: see [`crate::allocator::NearExpiryWarning`].

use thiserror::Error;

use crate::money::Money;
use crate::types::PaymentStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is raised before any network call is attempted, so the
/// engine never submits a draft that is known to be inconsistent.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Exchange rate is zero or negative.
    #[error("Invalid exchange rate {rate}: rate must be greater than zero")]
    InvalidRate { rate: String },

    /// Requested quantity is zero or negative.
    #[error("Invalid quantity {quantity}: quantity must be greater than zero")]
    InvalidQuantity { quantity: i64 },

    /// Insufficient stock to satisfy the request.
    ///
    /// ## User Workflow
    /// ```text
    /// Add to invoice (qty: 5)
    ///      │
    ///      ▼
    /// Batches hold 4, draft already holds 0
    ///      │
    ///      ▼
    /// InsufficientStock { item_id: "ITM-7", available: 4, requested: 5 }
    ///      │
    ///      ▼
    /// Screen shows: "Only 4 left for ITM-7"
    /// ```
    #[error("Insufficient stock for {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: String,
        available: i64,
        requested: i64,
    },

    /// Tendered cash and card do not cover the amount due.
    #[error("Insufficient tender: {tendered} tendered, {due} due")]
    InsufficientTender { due: Money, tendered: Money },

    /// Payment would push the paid amount above the invoice total.
    #[error("Payment of {payment} exceeds the outstanding balance of {due}")]
    Overpayment { payment: Money, due: Money },

    /// No open day cycle for the branch.
    #[error("No open day cycle for branch {branch_id}; open the day before invoicing")]
    DayClosed { branch_id: String },

    /// A line was priced against a different exchange-rate context than the draft.
    #[error("Exchange rate changed mid-invoice: draft pinned at {pinned}, got {supplied}")]
    ExchangeRateMismatch { pinned: String, supplied: String },

    /// Line not present in the draft.
    #[error("Invoice line not found: {0}")]
    LineNotFound(String),

    /// Finalizing an invoice with no lines.
    #[error("Cannot finalize an invoice with no lines")]
    EmptyInvoice,

    /// Payment status change not allowed from the current state.
    #[error("Invoice {invoice_number} is {from:?}, cannot move to {to:?}")]
    InvalidStatusTransition {
        invoice_number: String,
        from: PaymentStatus,
        to: PaymentStatus,
    },

    /// Payment event is malformed.
    #[error("Invalid payment amount: {reason}")]
    InvalidPaymentAmount { reason: String },

    /// Payment event belongs to another invoice.
    #[error("Payment for invoice {actual} applied to invoice {expected}")]
    PaymentInvoiceMismatch { expected: String, actual: String },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Invoice has exceeded the maximum number of lines.
    #[error("Invoice cannot have more than {max} lines")]
    InvoiceTooLarge { max: usize },

    /// Arithmetic left the representable money range.
    #[error("Amount out of range while computing {context}")]
    AmountOverflow { context: &'static str },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid branch code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            item_id: "ITM-7".to_string(),
            available: 4,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for ITM-7: available 4, requested 5"
        );

        let err = CoreError::InsufficientTender {
            due: Money::from_minor(6_000_000),
            tendered: Money::from_minor(5_000_000),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient tender: 50000.00 tendered, 60000.00 due"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "item_id".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
