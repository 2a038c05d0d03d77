//! # Invoice Module
//!
//! Invoice drafts, the line/total calculator, and finalized invoices.
//!
//! ## Draft Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InvoiceDraft::new()          empty, no rate pinned                     │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  add_item / add_line          first line pins the ExchangeRateContext   │
//! │  update_quantity              re-prices the line, recomputes totals     │
//! │  remove_line                  last line removed → totals zero, unpinned │
//! │  set_discount / set_tax_rate                                            │
//! │        │                                                                │
//! │        ├──► discard()         nothing left behind                       │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  finalize(day_cycle, number)  DayClosed / EmptyInvoice gates            │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  Invoice                      lines frozen; payment fields change only  │
//! │                               through the settlement module             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! ```text
//! subtotal_usd = Σ line_total_usd
//! discount_usd = FIXED ? value : subtotal_usd × value / 100   (clamped to [0, subtotal])
//! tax_usd      = (subtotal_usd - discount_usd) × tax_rate
//! total_usd    = subtotal_usd - discount_usd + tax_usd
//!
//! subtotal_sdg, discount_sdg, tax_sdg: each converted once from the exact USD value
//! total_sdg    = subtotal_sdg - discount_sdg + tax_sdg   (never below zero)
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::allocator::{allocate, Allocation};
use crate::currency::{to_sdg, to_sdg_exact, ExchangeRate, ExchangeRateContext};
use crate::error::{CoreError, CoreResult};
use crate::money::{DualMoney, Money};
use crate::settlement::PaymentEvent;
use crate::types::{
    CatalogItem, DayCycle, Discount, InvoiceType, PaymentStatus, StockBatch, TaxRate,
};
use crate::validation::{
    validate_item_id, validate_line_count, validate_notes, validate_unit_price,
};
use crate::{MAX_INVOICE_LINES, MAX_ITEM_QUANTITY};

// =============================================================================
// Invoice Line
// =============================================================================

/// One priced line on a draft or invoice.
///
/// `line_total.usd = unit_price.usd × quantity`, and every SDG value is the
/// rounded conversion of its USD partner at the pinned rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceLine {
    pub id: String,
    pub item_id: String,
    pub item_name: String,
    pub batch_id: Option<String>,
    pub quantity: i64,
    pub unit_price: DualMoney,
    pub line_total: DualMoney,
}

impl InvoiceLine {
    fn reprice(&mut self, quantity: i64, rate: ExchangeRate) -> CoreResult<()> {
        let (unit_price, line_total) = price(self.unit_price.usd, quantity, rate)?;
        self.quantity = quantity;
        self.unit_price = unit_price;
        self.line_total = line_total;
        Ok(())
    }
}

/// Prices `quantity` units, returning `(unit_price, line_total)`.
fn price(
    unit_price_usd: Money,
    quantity: i64,
    rate: ExchangeRate,
) -> CoreResult<(DualMoney, DualMoney)> {
    let total_usd = unit_price_usd.checked_multiply_quantity(quantity)?;
    let unit = DualMoney::new(unit_price_usd, to_sdg(unit_price_usd, rate.value())?);
    let total = DualMoney::new(total_usd, to_sdg(total_usd, rate.value())?);
    Ok((unit, total))
}

fn check_quantity(quantity: i64) -> CoreResult<()> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity });
    }
    if quantity > MAX_ITEM_QUANTITY {
        return Err(CoreError::QuantityTooLarge {
            requested: quantity,
            max: MAX_ITEM_QUANTITY,
        });
    }
    Ok(())
}

// =============================================================================
// Totals
// =============================================================================

/// Invoice-level amounts in both currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceTotals {
    pub subtotal: DualMoney,
    pub discount: DualMoney,
    pub tax: DualMoney,
    pub total: DualMoney,
}

/// Recomputes invoice totals from scratch.
///
/// USD intermediates stay exact until each figure is rounded once, and each
/// SDG figure is converted from the exact USD value, never from a rounded one.
///
/// ## Example
/// ```rust
/// use dukan_core::invoice::calculate_totals;
/// use dukan_core::currency::ExchangeRate;
/// use dukan_core::types::{Discount, TaxRate};
/// use rust_decimal::Decimal;
///
/// let rate = ExchangeRate::new(Decimal::from(600)).unwrap();
/// let totals = calculate_totals(&[], &Discount::none(), TaxRate::zero(), rate).unwrap();
/// assert!(totals.total.is_zero());
/// ```
pub fn calculate_totals(
    lines: &[InvoiceLine],
    discount: &Discount,
    tax_rate: TaxRate,
    rate: ExchangeRate,
) -> CoreResult<InvoiceTotals> {
    if lines.is_empty() {
        return Ok(InvoiceTotals::default());
    }

    let subtotal_usd = lines
        .iter()
        .try_fold(Money::zero(), |acc, line| acc.checked_add(line.line_total.usd))?;

    let subtotal_exact = subtotal_usd.to_decimal();
    let discount_exact = discount.exact_amount(subtotal_exact);
    let taxable_exact = (subtotal_exact - discount_exact).max(Decimal::ZERO);
    let tax_exact = taxable_exact
        .checked_mul(tax_rate.fraction())
        .ok_or(CoreError::AmountOverflow { context: "tax" })?;

    let discount_usd = Money::from_decimal(discount_exact)?;
    let tax_usd = Money::from_decimal(tax_exact)?;
    let total_usd = subtotal_usd
        .checked_sub(discount_usd)?
        .checked_add(tax_usd)?
        .non_negative();

    let r = rate.value();
    let subtotal_sdg = to_sdg_exact(subtotal_exact, r)?;
    let discount_sdg = to_sdg_exact(discount_exact, r)?;
    let tax_sdg = to_sdg_exact(tax_exact, r)?;
    let total_sdg = subtotal_sdg
        .checked_sub(discount_sdg)?
        .checked_add(tax_sdg)?
        .non_negative();

    Ok(InvoiceTotals {
        subtotal: DualMoney::new(subtotal_usd, subtotal_sdg),
        discount: DualMoney::new(discount_usd, discount_sdg),
        tax: DualMoney::new(tax_usd, tax_sdg),
        total: DualMoney::new(total_usd, total_sdg),
    })
}

// =============================================================================
// Invoice Draft
// =============================================================================

/// Result of [`InvoiceDraft::add_item`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedLine {
    pub line_id: String,
    pub allocation: Allocation,
}

/// An in-progress invoice with a single mutator.
///
/// Every mutation recomputes totals, so [`InvoiceDraft::totals`] is always
/// current.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDraft {
    invoice_type: InvoiceType,
    exchange_context: Option<ExchangeRateContext>,
    lines: Vec<InvoiceLine>,
    discount: Discount,
    tax_rate: TaxRate,
    totals: InvoiceTotals,
    notes: Option<String>,
}

impl InvoiceDraft {
    pub fn new(invoice_type: InvoiceType) -> Self {
        InvoiceDraft {
            invoice_type,
            exchange_context: None,
            lines: Vec::new(),
            discount: Discount::none(),
            tax_rate: TaxRate::zero(),
            totals: InvoiceTotals::default(),
            notes: None,
        }
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn invoice_type(&self) -> InvoiceType {
        self.invoice_type
    }

    /// The rate context pinned by the first priced line, if any.
    pub fn exchange_context(&self) -> Option<&ExchangeRateContext> {
        self.exchange_context.as_ref()
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn line(&self, line_id: &str) -> Option<&InvoiceLine> {
        self.lines.iter().find(|l| l.id == line_id)
    }

    pub fn discount(&self) -> &Discount {
        &self.discount
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Units of `item_id` already held by this draft across all lines.
    pub fn committed_quantity(&self, item_id: &str) -> i64 {
        self.lines
            .iter()
            .filter(|l| l.item_id == item_id)
            .map(|l| l.quantity)
            .sum()
    }

    // -------------------------------------------------------------------------
    // Line Operations
    // -------------------------------------------------------------------------

    /// Pins `ctx` on the first line; afterwards any other context is rejected.
    fn check_context(&self, ctx: &ExchangeRateContext) -> CoreResult<()> {
        match &self.exchange_context {
            Some(pinned) if pinned != ctx => Err(CoreError::ExchangeRateMismatch {
                pinned: pinned.to_string(),
                supplied: ctx.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Adds `quantity` units of `item` priced at the context's rate.
    ///
    /// A line with the same item and batch absorbs the quantity instead of
    /// creating a second line. Returns the id of the affected line.
    pub fn add_line(
        &mut self,
        ctx: &ExchangeRateContext,
        item: &CatalogItem,
        batch_id: Option<String>,
        quantity: i64,
    ) -> CoreResult<String> {
        validate_item_id(&item.id)?;
        validate_unit_price(item.unit_price_usd)?;
        check_quantity(quantity)?;
        self.check_context(ctx)?;

        let rate = ctx.rate;
        let existing = self
            .lines
            .iter()
            .position(|l| l.item_id == item.id && l.batch_id == batch_id);

        let line_id = match existing {
            Some(idx) => {
                let line = &mut self.lines[idx];
                let merged = line.quantity.saturating_add(quantity);
                check_quantity(merged)?;
                line.reprice(merged, rate)?;
                line.id.clone()
            }
            None => {
                if self.lines.len() >= MAX_INVOICE_LINES {
                    return Err(CoreError::InvoiceTooLarge {
                        max: MAX_INVOICE_LINES,
                    });
                }
                let (unit_price, line_total) = price(item.unit_price_usd, quantity, rate)?;
                let line = InvoiceLine {
                    id: Uuid::new_v4().to_string(),
                    item_id: item.id.clone(),
                    item_name: item.name.clone(),
                    batch_id,
                    quantity,
                    unit_price,
                    line_total,
                };
                let id = line.id.clone();
                self.lines.push(line);
                id
            }
        };

        if self.exchange_context.is_none() {
            self.exchange_context = Some(ctx.clone());
        }
        self.recompute_totals()?;
        Ok(line_id)
    }

    /// Allocates a batch for `quantity` more units of `item` and adds the line.
    ///
    /// Units the draft already holds for the same item count against the
    /// stock in `batches`.
    pub fn add_item(
        &mut self,
        ctx: &ExchangeRateContext,
        item: &CatalogItem,
        batches: &[StockBatch],
        quantity: i64,
        today: NaiveDate,
    ) -> CoreResult<AddedLine> {
        self.check_context(ctx)?;
        let committed = self.committed_quantity(&item.id);
        let allocation = allocate(&item.id, batches, quantity, committed, today)?;
        let line_id = self.add_line(ctx, item, Some(allocation.batch_id.clone()), quantity)?;
        Ok(AddedLine {
            line_id,
            allocation,
        })
    }

    /// Sets a line's quantity. `0` removes the line.
    pub fn update_quantity(&mut self, line_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(line_id);
        }
        check_quantity(quantity)?;
        let rate = self
            .exchange_context
            .as_ref()
            .map(|ctx| ctx.rate)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;
        line.reprice(quantity, rate)?;

        self.recompute_totals()
    }

    /// Like [`update_quantity`](Self::update_quantity), but first checks the
    /// new quantity against `batches`, counting every other line of the same
    /// item as committed.
    pub fn update_quantity_with_stock(
        &mut self,
        line_id: &str,
        quantity: i64,
        batches: &[StockBatch],
        today: NaiveDate,
    ) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(line_id);
        }

        let line = self
            .line(line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;
        let others = self.committed_quantity(&line.item_id) - line.quantity;
        allocate(&line.item_id, batches, quantity, others, today)?;

        self.update_quantity(line_id, quantity)
    }

    pub fn remove_line(&mut self, line_id: &str) -> CoreResult<()> {
        let idx = self
            .lines
            .iter()
            .position(|l| l.id == line_id)
            .ok_or_else(|| CoreError::LineNotFound(line_id.to_string()))?;
        self.lines.remove(idx);
        self.recompute_totals()
    }

    /// Removes every line. Safe to call on an empty draft.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.exchange_context = None;
        self.totals = InvoiceTotals::default();
    }

    /// Drops the draft. Nothing was submitted, so nothing needs undoing.
    pub fn discard(self) {}

    // -------------------------------------------------------------------------
    // Adjustments
    // -------------------------------------------------------------------------

    pub fn set_discount(&mut self, discount: Discount) -> CoreResult<()> {
        self.discount = discount;
        self.recompute_totals()
    }

    pub fn set_tax_rate(&mut self, tax_rate: TaxRate) -> CoreResult<()> {
        self.tax_rate = tax_rate;
        self.recompute_totals()
    }

    pub fn set_notes(&mut self, notes: &str) -> CoreResult<()> {
        self.notes = validate_notes(notes)?;
        Ok(())
    }

    fn recompute_totals(&mut self) -> CoreResult<()> {
        validate_line_count(self.lines.len())?;
        let rate = match &self.exchange_context {
            Some(ctx) if !self.lines.is_empty() => Some(ctx.rate),
            _ => None,
        };
        match rate {
            Some(rate) => {
                self.totals = calculate_totals(&self.lines, &self.discount, self.tax_rate, rate)?;
            }
            None => self.clear(),
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Finalization
    // -------------------------------------------------------------------------

    /// Freezes the draft into an [`Invoice`].
    ///
    /// Requires an open day cycle whose rate context matches the one the
    /// lines were priced at. An invoice whose SDG total is zero starts out
    /// `Paid`; everything else starts `Outstanding`.
    pub fn finalize(
        &self,
        day_cycle: Option<&DayCycle>,
        number: impl Into<String>,
        now: DateTime<Utc>,
    ) -> CoreResult<Invoice> {
        let day = day_cycle.ok_or_else(|| CoreError::DayClosed {
            branch_id: self
                .exchange_context
                .as_ref()
                .map(|c| c.branch_id.clone())
                .unwrap_or_default(),
        })?;
        let ctx = day.exchange_context()?;

        if self.lines.is_empty() {
            return Err(CoreError::EmptyInvoice);
        }
        self.check_context(&ctx)?;

        let total = self.totals.total;
        let (payment_status, amount_paid, amount_due) = if total.sdg.is_zero() {
            (PaymentStatus::Paid, total, DualMoney::zero())
        } else {
            (PaymentStatus::Outstanding, DualMoney::zero(), total)
        };

        Ok(Invoice {
            id: Uuid::new_v4().to_string(),
            number: number.into(),
            invoice_type: self.invoice_type,
            branch_id: ctx.branch_id,
            business_date: ctx.date,
            exchange_rate: ctx.rate,
            lines: self.lines.clone(),
            discount: self.discount,
            tax_rate: self.tax_rate,
            totals: self.totals,
            payment_status,
            amount_paid,
            amount_due,
            payments: Vec::new(),
            notes: self.notes.clone(),
            created_at: now,
        })
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A finalized invoice.
///
/// Lines and totals are frozen. Payment fields only change through
/// [`crate::settlement`], which returns a new `Invoice` each time.
///
/// `amount_due = total - amount_paid`, never negative; `Paid` iff the SDG
/// amount due is zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub(crate) id: String,
    pub(crate) number: String,
    pub(crate) invoice_type: InvoiceType,
    pub(crate) branch_id: String,
    #[ts(as = "String")]
    pub(crate) business_date: NaiveDate,
    #[ts(as = "String")]
    pub(crate) exchange_rate: ExchangeRate,
    pub(crate) lines: Vec<InvoiceLine>,
    pub(crate) discount: Discount,
    pub(crate) tax_rate: TaxRate,
    pub(crate) totals: InvoiceTotals,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) amount_paid: DualMoney,
    pub(crate) amount_due: DualMoney,
    pub(crate) payments: Vec<PaymentEvent>,
    pub(crate) notes: Option<String>,
    #[ts(as = "String")]
    pub(crate) created_at: DateTime<Utc>,
}

impl Invoice {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn invoice_type(&self) -> InvoiceType {
        self.invoice_type
    }

    pub fn branch_id(&self) -> &str {
        &self.branch_id
    }

    pub fn business_date(&self) -> NaiveDate {
        self.business_date
    }

    pub fn exchange_rate(&self) -> ExchangeRate {
        self.exchange_rate
    }

    pub fn lines(&self) -> &[InvoiceLine] {
        &self.lines
    }

    pub fn discount(&self) -> &Discount {
        &self.discount
    }

    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    pub fn totals(&self) -> &InvoiceTotals {
        &self.totals
    }

    pub fn payment_status(&self) -> PaymentStatus {
        self.payment_status
    }

    pub fn amount_paid(&self) -> DualMoney {
        self.amount_paid
    }

    pub fn amount_due(&self) -> DualMoney {
        self.amount_due
    }

    /// Every payment applied so far, oldest first.
    pub fn payments(&self) -> &[PaymentEvent] {
        &self.payments
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[inline]
    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}
