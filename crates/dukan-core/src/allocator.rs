//! # Batch Allocator
//!
//! Picks the stock batch a new invoice line draws from.
//!
//! ## Policy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  batches for item                                                       │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  drop qty_remaining <= 0                                                │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  stable sort by expiry ascending, no expiry last                        │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  available = Σ qty_remaining - already committed in this draft          │
//! │      │                                                                  │
//! │      ├── requested > available → InsufficientStock                      │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  first batch wins (single-batch FIFO)                                   │
//! │      │                                                                  │
//! │      └── expires within 30 days → NearExpiryWarning (advisory)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The allocator only knows about the current draft. The server may still
//! reject the invoice at submission time if another till sold the stock.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::StockBatch;

/// Batches expiring within this many days (inclusive) raise a warning.
pub const NEAR_EXPIRY_DAYS: i64 = 30;

/// Advisory raised when the selected batch is close to (or past) expiry.
///
/// Not an error: the line is still added, the screen decides how loudly
/// to show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NearExpiryWarning {
    pub batch_id: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    /// Negative when the batch has already expired.
    pub days_until_expiry: i64,
}

impl NearExpiryWarning {
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.days_until_expiry < 0
    }

    pub fn message(&self) -> String {
        if self.is_expired() {
            format!(
                "Batch {} expired on {} ({} days ago)",
                self.batch_id,
                self.expiry_date,
                -self.days_until_expiry
            )
        } else {
            format!(
                "Batch {} expires on {} (in {} days)",
                self.batch_id, self.expiry_date, self.days_until_expiry
            )
        }
    }
}

/// Outcome of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub batch_id: String,
    pub warning: Option<NearExpiryWarning>,
}

/// Sum of `qty_remaining` over the item's sellable batches, saturating at
/// `i64::MAX`.
pub fn total_remaining(item_id: &str, batches: &[StockBatch]) -> i64 {
    batches
        .iter()
        .filter(|b| b.item_id == item_id && b.qty_remaining > 0)
        .fold(0i64, |acc, b| acc.saturating_add(b.qty_remaining))
}

/// Sellable batches for `item_id`, earliest expiry first, undated last.
///
/// The sort is stable, so batches sharing an expiry keep server order.
pub fn ordered_batches<'a>(item_id: &str, batches: &'a [StockBatch]) -> Vec<&'a StockBatch> {
    let mut eligible: Vec<&StockBatch> = batches
        .iter()
        .filter(|b| b.item_id == item_id && b.qty_remaining > 0)
        .collect();
    eligible.sort_by_key(|b| (b.expiry_date.is_none(), b.expiry_date));
    eligible
}

/// Selects the batch for `requested_qty` more units of `item_id`.
///
/// `already_committed_qty` is what the current draft already holds for the
/// same item and counts against availability.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use dukan_core::allocator::allocate;
/// use dukan_core::money::Money;
/// use dukan_core::types::StockBatch;
///
/// let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
/// let batch = |id: &str, qty, days| StockBatch {
///     id: id.to_string(),
///     item_id: "ITM-7".to_string(),
///     qty_remaining: qty,
///     expiry_date: Some(today + chrono::Days::new(days)),
///     unit_cost_usd: Money::zero(),
/// };
/// let batches = vec![batch("B2", 5, 40), batch("B1", 5, 10)];
///
/// let allocation = allocate("ITM-7", &batches, 3, 0, today).unwrap();
/// assert_eq!(allocation.batch_id, "B1");
/// assert!(allocation.warning.is_some());
/// ```
pub fn allocate(
    item_id: &str,
    batches: &[StockBatch],
    requested_qty: i64,
    already_committed_qty: i64,
    today: NaiveDate,
) -> CoreResult<Allocation> {
    if requested_qty <= 0 {
        return Err(CoreError::InvalidQuantity {
            quantity: requested_qty,
        });
    }

    let ordered = ordered_batches(item_id, batches);
    let available = total_remaining(item_id, batches)
        .saturating_sub(already_committed_qty.max(0))
        .max(0);

    if requested_qty > available {
        return Err(CoreError::InsufficientStock {
            item_id: item_id.to_string(),
            available,
            requested: requested_qty,
        });
    }

    // available > 0 guarantees at least one eligible batch
    let selected = ordered.first().ok_or_else(|| CoreError::InsufficientStock {
        item_id: item_id.to_string(),
        available: 0,
        requested: requested_qty,
    })?;

    let warning = selected.expiry_date.and_then(|expiry| {
        let days = (expiry - today).num_days();
        (days <= NEAR_EXPIRY_DAYS).then(|| NearExpiryWarning {
            batch_id: selected.id.clone(),
            expiry_date: expiry,
            days_until_expiry: days,
        })
    });

    Ok(Allocation {
        batch_id: selected.id.clone(),
        warning,
    })
}
