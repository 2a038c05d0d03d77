//! # Invoice Numbering
//!
//! Unique, human-readable invoice numbers.
//!
//! ## Format
//! ```text
//! INV-KRT-260301143005-000042-9F3A
//! ─┬─ ─┬─ ─────┬────── ──┬─── ─┬──
//!  │   │       │         │     └── random suffix (4 hex)
//!  │   │       │         └──────── process-wide sequence
//!  │   │       └────────────────── UTC timestamp, yyMMddHHmmss
//!  │   └────────────────────────── branch code (optional)
//!  └────────────────────────────── invoice type tag
//! ```
//!
//! Within one process the timestamp never goes backwards and the sequence
//! only grows, so numbers with the same tag and branch sort in issue order
//! and never collide.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::types::InvoiceType;
use crate::validation::validate_branch_prefix;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);
static LAST_TIMESTAMP: AtomicI64 = AtomicI64::new(i64::MIN);

/// Generates the next invoice number for `invoice_type`, stamped with `now`.
///
/// A branch prefix must pass [`validate_branch_prefix`]; it is uppercased
/// into the number. Invalid prefixes are rejected, never rewritten.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use dukan_core::numbering::generate_invoice_number;
/// use dukan_core::types::InvoiceType;
///
/// let number = generate_invoice_number(InvoiceType::Wholesale, Some("krt"), Utc::now()).unwrap();
/// assert!(number.starts_with("WHL-KRT-"));
/// assert!(generate_invoice_number(InvoiceType::Sale, Some("KRT-01"), Utc::now()).is_err());
/// ```
pub fn generate_invoice_number(
    invoice_type: InvoiceType,
    branch_prefix: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<String> {
    let branch = match branch_prefix {
        Some(prefix) => {
            validate_branch_prefix(prefix)?;
            Some(prefix.to_ascii_uppercase())
        }
        None => None,
    };

    let requested = now.timestamp();
    let previous = LAST_TIMESTAMP.fetch_max(requested, Ordering::SeqCst);
    let stamp_secs = previous.max(requested);
    let stamp = Utc
        .timestamp_opt(stamp_secs, 0)
        .single()
        .unwrap_or(now)
        .format("%y%m%d%H%M%S");

    let seq = SEQUENCE.fetch_add(1, Ordering::SeqCst) + 1;
    let suffix = Uuid::new_v4().simple().to_string()[..4].to_ascii_uppercase();

    let number = match branch {
        Some(branch) => format!(
            "{}-{}-{}-{:06}-{}",
            invoice_type.tag(),
            branch,
            stamp,
            seq,
            suffix
        ),
        None => format!("{}-{}-{:06}-{}", invoice_type.tag(), stamp, seq, suffix),
    };
    Ok(number)
}
