//! # Settlement Reconciler
//!
//! Tender sufficiency, change, and payment accumulation against an invoice.
//!
//! ## Payment Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Cashier enters cash + card (SDG)                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  validate_tender(due, cash, card)                                       │
//! │       ├── cash + card < due → InsufficientTender                        │
//! │       └── change = cash + card - due                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  apply_payment(invoice, event) → invoice'                               │
//! │       ├── paid + amount > total → Overpayment                           │
//! │       ├── 0 < due < total       → PartiallyPaid                         │
//! │       └── due == 0              → Paid                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SDG is the settlement currency. The USD paid/due figures mirror the SDG
//! ones at the invoice's rate and snap to the USD total once fully paid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::currency::to_usd;
use crate::error::{CoreError, CoreResult};
use crate::invoice::Invoice;
use crate::money::{DualMoney, Money};
use crate::types::{PaymentMethod, PaymentStatus};
use crate::validation::validate_tender_amount;

// =============================================================================
// Tender
// =============================================================================

/// Result of checking a tender against an amount due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TenderAssessment {
    pub sufficient: bool,
    pub tendered: Money,
    /// Zero unless the tender is sufficient and non-zero.
    pub change: Money,
}

/// Checks `cash + card` against `due` without failing on insufficiency.
///
/// Negative columns are rejected as input errors.
pub fn assess_tender(due_sdg: Money, cash_sdg: Money, card_sdg: Money) -> CoreResult<TenderAssessment> {
    validate_tender_amount("cash", cash_sdg)?;
    validate_tender_amount("card", card_sdg)?;

    let tendered = cash_sdg.checked_add(card_sdg)?;
    let sufficient = tendered >= due_sdg;
    let change = if sufficient && tendered.is_positive() {
        tendered - due_sdg.non_negative()
    } else {
        Money::zero()
    };

    Ok(TenderAssessment {
        sufficient,
        tendered,
        change,
    })
}

/// Checkout gate: like [`assess_tender`] but insufficiency is an error.
///
/// ## Example
/// ```rust
/// use dukan_core::money::Money;
/// use dukan_core::settlement::validate_tender;
///
/// let ok = validate_tender(
///     Money::from_minor(6_000_000),
///     Money::from_minor(4_000_000),
///     Money::from_minor(2_000_000),
/// )
/// .unwrap();
/// assert!(ok.change.is_zero());
///
/// assert!(validate_tender(
///     Money::from_minor(6_000_000),
///     Money::from_minor(3_000_000),
///     Money::from_minor(2_000_000),
/// )
/// .is_err());
/// ```
pub fn validate_tender(due_sdg: Money, cash_sdg: Money, card_sdg: Money) -> CoreResult<TenderAssessment> {
    let assessment = assess_tender(due_sdg, cash_sdg, card_sdg)?;
    if !assessment.sufficient {
        return Err(CoreError::InsufficientTender {
            due: due_sdg,
            tendered: assessment.tendered,
        });
    }
    Ok(assessment)
}

// =============================================================================
// Payment Event
// =============================================================================

/// One payment against one invoice. Append-only.
///
/// Bank transfers are recorded in the non-cash (`card_amount_sdg`) column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentEvent {
    pub invoice_id: String,
    pub method: PaymentMethod,
    pub cash_amount_sdg: Money,
    pub card_amount_sdg: Money,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

impl PaymentEvent {
    pub fn cash(invoice_id: impl Into<String>, amount_sdg: Money, recorded_at: DateTime<Utc>) -> Self {
        PaymentEvent {
            invoice_id: invoice_id.into(),
            method: PaymentMethod::Cash,
            cash_amount_sdg: amount_sdg,
            card_amount_sdg: Money::zero(),
            recorded_at,
        }
    }

    pub fn card(invoice_id: impl Into<String>, amount_sdg: Money, recorded_at: DateTime<Utc>) -> Self {
        PaymentEvent {
            invoice_id: invoice_id.into(),
            method: PaymentMethod::Card,
            cash_amount_sdg: Money::zero(),
            card_amount_sdg: amount_sdg,
            recorded_at,
        }
    }

    pub fn bank_transfer(
        invoice_id: impl Into<String>,
        amount_sdg: Money,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        PaymentEvent {
            invoice_id: invoice_id.into(),
            method: PaymentMethod::BankTransfer,
            cash_amount_sdg: Money::zero(),
            card_amount_sdg: amount_sdg,
            recorded_at,
        }
    }

    pub fn mixed(
        invoice_id: impl Into<String>,
        cash_sdg: Money,
        card_sdg: Money,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        PaymentEvent {
            invoice_id: invoice_id.into(),
            method: PaymentMethod::Mixed,
            cash_amount_sdg: cash_sdg,
            card_amount_sdg: card_sdg,
            recorded_at,
        }
    }

    /// Total SDG this event pays.
    pub fn amount_sdg(&self) -> CoreResult<Money> {
        self.cash_amount_sdg.checked_add(self.card_amount_sdg)
    }

    /// Checks signs, a positive total, and that the columns used match the method.
    pub fn validate(&self) -> CoreResult<()> {
        validate_tender_amount("cash_amount_sdg", self.cash_amount_sdg)?;
        validate_tender_amount("card_amount_sdg", self.card_amount_sdg)?;

        if !self.amount_sdg()?.is_positive() {
            return Err(CoreError::InvalidPaymentAmount {
                reason: "payment must be greater than zero".to_string(),
            });
        }

        let consistent = match self.method {
            PaymentMethod::Cash => self.card_amount_sdg.is_zero(),
            PaymentMethod::Card | PaymentMethod::BankTransfer => self.cash_amount_sdg.is_zero(),
            PaymentMethod::Mixed => true,
        };
        if !consistent {
            return Err(CoreError::InvalidPaymentAmount {
                reason: format!("{:?} payment carries an amount in the wrong column", self.method),
            });
        }

        Ok(())
    }
}

// =============================================================================
// Applying Payments
// =============================================================================

/// Applies `event` to `invoice`, returning the updated invoice.
///
/// The input invoice is left untouched, so a failed server call can simply
/// keep using it.
pub fn apply_payment(invoice: &Invoice, event: &PaymentEvent) -> CoreResult<Invoice> {
    if event.invoice_id != invoice.id {
        return Err(CoreError::PaymentInvoiceMismatch {
            expected: invoice.id.clone(),
            actual: event.invoice_id.clone(),
        });
    }
    event.validate()?;

    let total = invoice.totals.total;
    let amount = event.amount_sdg()?;
    let new_paid_sdg = invoice.amount_paid.sdg.checked_add(amount)?;

    let next = if new_paid_sdg >= total.sdg {
        PaymentStatus::Paid
    } else {
        PaymentStatus::PartiallyPaid
    };
    if !invoice.payment_status.accepts_payment() || !invoice.payment_status.can_transition_to(next) {
        return Err(CoreError::InvalidStatusTransition {
            invoice_number: invoice.number.clone(),
            from: invoice.payment_status,
            to: next,
        });
    }

    if new_paid_sdg > total.sdg {
        return Err(CoreError::Overpayment {
            payment: amount,
            due: invoice.amount_due.sdg,
        });
    }

    let due_sdg = total.sdg - new_paid_sdg;
    let paid_usd = if due_sdg.is_zero() {
        total.usd
    } else {
        to_usd(new_paid_sdg, invoice.exchange_rate.value())?.min(total.usd)
    };

    let mut updated = invoice.clone();
    updated.amount_paid = DualMoney::new(paid_usd, new_paid_sdg);
    updated.amount_due = DualMoney::new(total.usd - paid_usd, due_sdg);
    updated.payment_status = next;
    updated.payments.push(event.clone());
    Ok(updated)
}

/// A full settlement built from a sufficient tender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullPayment {
    /// The event to apply: card in full, cash only up to what is still due.
    pub event: PaymentEvent,
    /// Cash handed back to the customer.
    pub change: Money,
}

/// Turns a cash + card tender into the payment that settles `invoice`.
///
/// Card is taken first and must not exceed the amount due; change always
/// comes out of the cash.
pub fn full_payment_from_tender(
    invoice: &Invoice,
    cash_sdg: Money,
    card_sdg: Money,
    recorded_at: DateTime<Utc>,
) -> CoreResult<FullPayment> {
    let due = invoice.amount_due.sdg;
    let assessment = validate_tender(due, cash_sdg, card_sdg)?;

    if card_sdg > due {
        return Err(CoreError::Overpayment {
            payment: card_sdg,
            due,
        });
    }

    let cash_applied = due - card_sdg;
    let event = match (cash_applied.is_zero(), card_sdg.is_zero()) {
        (_, true) => PaymentEvent::cash(invoice.id.clone(), cash_applied, recorded_at),
        (true, false) => PaymentEvent::card(invoice.id.clone(), card_sdg, recorded_at),
        (false, false) => PaymentEvent::mixed(invoice.id.clone(), cash_applied, card_sdg, recorded_at),
    };

    Ok(FullPayment {
        event,
        change: assessment.change,
    })
}

// =============================================================================
// Status Changes Without Payment
// =============================================================================

impl Invoice {
    /// Moves an outstanding invoice to `Deferred` (pay later).
    pub fn defer(&self) -> CoreResult<Invoice> {
        self.transition(PaymentStatus::Deferred)
    }

    /// Cancels the invoice. Allowed from every state except `Paid`.
    pub fn cancel(&self) -> CoreResult<Invoice> {
        self.transition(PaymentStatus::Cancelled)
    }

    fn transition(&self, to: PaymentStatus) -> CoreResult<Invoice> {
        if !self.payment_status.can_transition_to(to) {
            return Err(CoreError::InvalidStatusTransition {
                invoice_number: self.number.clone(),
                from: self.payment_status,
                to,
            });
        }
        let mut updated = self.clone();
        updated.payment_status = to;
        Ok(updated)
    }

    /// Adopts the payment state the server recorded.
    ///
    /// The server is authoritative once it has accepted a payment, so no
    /// transition check is made. `amount_paid_sdg` is clamped to
    /// `[0, total]`, and a `Paid` status always means fully paid.
    pub fn reconcile_with_server(
        &self,
        status: PaymentStatus,
        amount_paid_sdg: Money,
    ) -> CoreResult<Invoice> {
        let total = self.totals.total;
        let paid_sdg = if status == PaymentStatus::Paid {
            total.sdg
        } else {
            amount_paid_sdg.non_negative().min(total.sdg)
        };
        let due_sdg = total.sdg - paid_sdg;
        let paid_usd = if due_sdg.is_zero() {
            total.usd
        } else {
            to_usd(paid_sdg, self.exchange_rate.value())?.min(total.usd)
        };

        let mut updated = self.clone();
        updated.amount_paid = DualMoney::new(paid_usd, paid_sdg);
        updated.amount_due = DualMoney::new(total.usd - paid_usd, due_sdg);
        updated.payment_status = status;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::{ExchangeRate, ExchangeRateContext};
    use crate::invoice::InvoiceDraft;
    use crate::types::{CatalogItem, DayCycle, DayCycleStatus, InvoiceType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn sdg(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    /// Invoice totalling 1000.00 SDG (rate 500, one line at 2.00 USD).
    fn invoice() -> Invoice {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let rate = ExchangeRate::new(dec!(500)).unwrap();
        let day = DayCycle {
            id: "dc-1".to_string(),
            branch_id: "branch-001".to_string(),
            date,
            status: DayCycleStatus::Open,
            rate,
        };
        let ctx = ExchangeRateContext::new("branch-001", date, rate);
        let mut draft = InvoiceDraft::new(InvoiceType::Sale);
        draft
            .add_line(&ctx, &CatalogItem::new("A", "Rice 1kg", Money::from_minor(200)), None, 1)
            .unwrap();
        draft.finalize(Some(&day), "INV-TEST", Utc::now()).unwrap()
    }

    #[test]
    fn test_tender_sufficient_exact() {
        let a = validate_tender(sdg(6_000_000), sdg(4_000_000), sdg(2_000_000)).unwrap();
        assert!(a.sufficient);
        assert!(a.change.is_zero());
    }

    #[test]
    fn test_tender_insufficient() {
        let a = assess_tender(sdg(6_000_000), sdg(3_000_000), sdg(2_000_000)).unwrap();
        assert!(!a.sufficient);
        assert!(a.change.is_zero());

        let err = validate_tender(sdg(6_000_000), sdg(3_000_000), sdg(2_000_000)).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientTender { .. }));
    }

    #[test]
    fn test_tender_change() {
        let a = validate_tender(sdg(45_000), sdg(50_000), Money::zero()).unwrap();
        assert_eq!(a.change, sdg(5_000));

        // nothing due, nothing tendered: no change
        let a = validate_tender(Money::zero(), Money::zero(), Money::zero()).unwrap();
        assert!(a.sufficient);
        assert!(a.change.is_zero());
    }

    #[test]
    fn test_tender_rejects_negative() {
        assert!(matches!(
            assess_tender(sdg(100), sdg(-1), sdg(200)),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_partial_then_full_payment() {
        let inv = invoice();
        assert_eq!(inv.totals().total.sdg, sdg(100_000));

        let first = apply_payment(&inv, &PaymentEvent::cash(inv.id(), sdg(40_000), Utc::now())).unwrap();
        assert_eq!(first.payment_status(), PaymentStatus::PartiallyPaid);
        assert_eq!(first.amount_due().sdg, sdg(60_000));
        assert_eq!(first.amount_paid().usd, Money::from_minor(80));
        assert_eq!(first.amount_due().usd, Money::from_minor(120));

        let second =
            apply_payment(&first, &PaymentEvent::card(inv.id(), sdg(60_000), Utc::now())).unwrap();
        assert_eq!(second.payment_status(), PaymentStatus::Paid);
        assert!(second.amount_due().is_zero());
        assert_eq!(second.amount_paid(), second.totals().total);
        assert_eq!(second.payments().len(), 2);

        // original is untouched
        assert_eq!(inv.payment_status(), PaymentStatus::Outstanding);
    }

    #[test]
    fn test_overpayment_rejected() {
        let inv = invoice();
        let err = apply_payment(&inv, &PaymentEvent::cash(inv.id(), sdg(100_001), Utc::now()))
            .unwrap_err();
        assert!(matches!(err, CoreError::Overpayment { .. }));
    }

    #[test]
    fn test_paid_and_cancelled_are_terminal() {
        let inv = invoice();
        let paid = apply_payment(&inv, &PaymentEvent::cash(inv.id(), sdg(100_000), Utc::now())).unwrap();
        assert!(matches!(
            apply_payment(&paid, &PaymentEvent::cash(inv.id(), sdg(1), Utc::now())),
            Err(CoreError::InvalidStatusTransition { .. })
        ));
        assert!(paid.cancel().is_err());

        let cancelled = inv.cancel().unwrap();
        assert_eq!(cancelled.payment_status(), PaymentStatus::Cancelled);
        assert!(matches!(
            apply_payment(&cancelled, &PaymentEvent::cash(inv.id(), sdg(1), Utc::now())),
            Err(CoreError::InvalidStatusTransition { .. })
        ));
    }

    #[test]
    fn test_deferred_invoice_accepts_payment() {
        let deferred = invoice().defer().unwrap();
        assert_eq!(deferred.payment_status(), PaymentStatus::Deferred);

        let partly = apply_payment(
            &deferred,
            &PaymentEvent::bank_transfer(deferred.id(), sdg(10_000), Utc::now()),
        )
        .unwrap();
        assert_eq!(partly.payment_status(), PaymentStatus::PartiallyPaid);
        assert!(partly.defer().is_err());
    }

    #[test]
    fn test_payment_event_validation() {
        let inv = invoice();
        let zero = PaymentEvent::cash(inv.id(), Money::zero(), Utc::now());
        assert!(matches!(
            apply_payment(&inv, &zero),
            Err(CoreError::InvalidPaymentAmount { .. })
        ));

        let mut wrong_column = PaymentEvent::cash(inv.id(), sdg(100), Utc::now());
        wrong_column.card_amount_sdg = sdg(100);
        assert!(wrong_column.validate().is_err());

        let overflowing = PaymentEvent::mixed(inv.id(), sdg(i64::MAX), sdg(1), Utc::now());
        assert!(matches!(
            overflowing.amount_sdg(),
            Err(CoreError::AmountOverflow { .. })
        ));
        assert!(matches!(
            apply_payment(&inv, &overflowing),
            Err(CoreError::AmountOverflow { .. })
        ));

        let other = PaymentEvent::cash("someone-else", sdg(100), Utc::now());
        assert!(matches!(
            apply_payment(&inv, &other),
            Err(CoreError::PaymentInvoiceMismatch { .. })
        ));
    }

    #[test]
    fn test_full_payment_from_tender() {
        let inv = invoice();

        let full = full_payment_from_tender(&inv, sdg(50_000), sdg(60_000), Utc::now()).unwrap();
        assert_eq!(full.event.method, PaymentMethod::Mixed);
        assert_eq!(full.event.cash_amount_sdg, sdg(40_000));
        assert_eq!(full.event.card_amount_sdg, sdg(60_000));
        assert_eq!(full.change, sdg(10_000));
        assert!(apply_payment(&inv, &full.event).unwrap().is_paid());

        let cash_only = full_payment_from_tender(&inv, sdg(120_000), Money::zero(), Utc::now()).unwrap();
        assert_eq!(cash_only.event.method, PaymentMethod::Cash);
        assert_eq!(cash_only.change, sdg(20_000));

        assert!(matches!(
            full_payment_from_tender(&inv, Money::zero(), sdg(150_000), Utc::now()),
            Err(CoreError::Overpayment { .. })
        ));
        assert!(matches!(
            full_payment_from_tender(&inv, sdg(10_000), sdg(10_000), Utc::now()),
            Err(CoreError::InsufficientTender { .. })
        ));
    }

    #[test]
    fn test_reconcile_with_server() {
        let inv = invoice();

        let partly = inv
            .reconcile_with_server(PaymentStatus::PartiallyPaid, sdg(25_000))
            .unwrap();
        assert_eq!(partly.payment_status(), PaymentStatus::PartiallyPaid);
        assert_eq!(partly.amount_due().sdg, sdg(75_000));
        assert_eq!(partly.amount_paid().usd, Money::from_minor(50));

        let paid = inv.reconcile_with_server(PaymentStatus::Paid, sdg(1)).unwrap();
        assert!(paid.is_paid());
        assert_eq!(paid.amount_paid(), paid.totals().total);

        let clamped = inv
            .reconcile_with_server(PaymentStatus::PartiallyPaid, sdg(500_000))
            .unwrap();
        assert!(clamped.amount_due().is_zero());
    }

    #[test]
    fn test_server_draft_status_accepts_payment() {
        let inv = invoice()
            .reconcile_with_server(PaymentStatus::Draft, Money::zero())
            .unwrap();
        assert_eq!(inv.payment_status(), PaymentStatus::Draft);

        let partly = apply_payment(&inv, &PaymentEvent::cash(inv.id(), sdg(30_000), Utc::now())).unwrap();
        assert_eq!(partly.payment_status(), PaymentStatus::PartiallyPaid);
        assert_eq!(partly.amount_due().sdg, sdg(70_000));
    }
}
