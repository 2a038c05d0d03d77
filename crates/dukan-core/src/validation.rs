//! # Validation Module
//!
//! Field-level input checks run before any business rule.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Mobile screen                                                 │
//! │  └── Empty fields, numeric keyboards                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── Ranges, lengths, formats                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Business rules (allocator, totals, settlement)                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 4: Remote server (authoritative stock and ledger)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_BRANCH_PREFIX_LEN, MAX_INVOICE_LINES, MAX_ITEM_QUANTITY, MAX_NOTES_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an item identifier: non-empty, at most 64 characters.
pub fn validate_item_id(item_id: &str) -> ValidationResult<()> {
    let item_id = item_id.trim();

    if item_id.is_empty() {
        return Err(ValidationError::Required {
            field: "item_id".to_string(),
        });
    }

    if item_id.chars().count() > 64 {
        return Err(ValidationError::TooLong {
            field: "item_id".to_string(),
            max: 64,
        });
    }

    Ok(())
}

/// Validates the branch code embedded in invoice numbers.
///
/// ## Rules
/// - 1 to 8 characters
/// - ASCII letters and digits only
///
/// ## Example
/// ```rust
/// use dukan_core::validation::validate_branch_prefix;
///
/// assert!(validate_branch_prefix("KRT").is_ok());
/// assert!(validate_branch_prefix("KRT-01").is_err());
/// assert!(validate_branch_prefix("").is_err());
/// ```
pub fn validate_branch_prefix(prefix: &str) -> ValidationResult<()> {
    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "branch_prefix".to_string(),
        });
    }

    if prefix.len() > MAX_BRANCH_PREFIX_LEN {
        return Err(ValidationError::TooLong {
            field: "branch_prefix".to_string(),
            max: MAX_BRANCH_PREFIX_LEN,
        });
    }

    if !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "branch_prefix".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

/// Validates free-text invoice notes. Returns the trimmed text, or `None`
/// when nothing but whitespace was entered.
pub fn validate_notes(notes: &str) -> ValidationResult<Option<String>> {
    let notes = notes.trim();

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok((!notes.is_empty()).then(|| notes.to_string()))
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## User Workflow
/// ```text
/// Cashier enters quantity: 12
///      │
///      ▼
/// validate_quantity(12) ← THIS FUNCTION
///      │
///      ├── qty <= 0?    → "quantity must be positive"
///      ├── qty > 9999?  → "quantity must be between 1 and 9999"
///      │
///      └── OK → Batch Allocator
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates that an invoice can take `count` lines.
pub fn validate_line_count(count: usize) -> ValidationResult<()> {
    if count > MAX_INVOICE_LINES {
        return Err(ValidationError::OutOfRange {
            field: "lines".to_string(),
            min: 0,
            max: MAX_INVOICE_LINES as i64,
        });
    }
    Ok(())
}

/// Validates a unit price. Zero is allowed (free samples).
pub fn validate_unit_price(price: Money) -> ValidationResult<()> {
    if price.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: "unit_price".to_string(),
        });
    }
    Ok(())
}

/// Validates one tender column (cash or card).
pub fn validate_tender_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    Ok(())
}
