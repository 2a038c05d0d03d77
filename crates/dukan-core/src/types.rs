//! # Domain Types
//!
//! Core domain types used throughout the Dukan POS engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  CatalogItem    │   │   StockBatch    │   │    DayCycle     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id, item_id    │   │  branch_id      │       │
//! │  │  name           │   │  qty_remaining  │   │  date, status   │       │
//! │  │  unit_price_usd │   │  expiry_date?   │   │  rate           │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    TaxRate      │   │    Discount     │   │  PaymentStatus  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  bps (u32)      │   │  Fixed (USD)    │   │  Draft          │       │
//! │  │  1700 = 17%     │   │  Percentage     │   │  Outstanding …  │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::currency::{ExchangeRate, ExchangeRateContext};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so 1700 bps = 17%.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage, rounding half away from zero to
    /// whole basis points. Negative input clamps to zero.
    pub fn from_percentage(pct: Decimal) -> Self {
        if pct.is_sign_negative() {
            return TaxRate(0);
        }
        let bps = pct
            .checked_mul(Decimal::ONE_HUNDRED)
            .map_or(Decimal::MAX, |b| {
                b.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            })
            .to_u32()
            .unwrap_or(u32::MAX);
        TaxRate(bps)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as an exact fraction (1700 bps → 0.17).
    pub fn fraction(&self) -> Decimal {
        Decimal::from(self.0) / Decimal::from(10_000)
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Discount
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiscountKind {
    /// Flat amount in USD major units.
    #[default]
    Fixed,
    /// Percent of the subtotal (10 = 10%).
    Percentage,
}

/// Invoice-level discount.
///
/// `value` is never negative, and a percentage never exceeds 100. Constructors
/// and deserialization both clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase", from = "DiscountWire")]
pub struct Discount {
    pub kind: DiscountKind,
    #[ts(as = "String")]
    value: Decimal,
}

impl Discount {
    pub fn new(kind: DiscountKind, value: Decimal) -> Self {
        let value = match kind {
            DiscountKind::Fixed => value.max(Decimal::ZERO),
            DiscountKind::Percentage => value.max(Decimal::ZERO).min(Decimal::ONE_HUNDRED),
        };
        Discount { kind, value }
    }

    pub fn fixed(usd: Decimal) -> Self {
        Discount::new(DiscountKind::Fixed, usd)
    }

    pub fn percentage(pct: Decimal) -> Self {
        Discount::new(DiscountKind::Percentage, pct)
    }

    pub fn none() -> Self {
        Discount::new(DiscountKind::Fixed, Decimal::ZERO)
    }

    #[inline]
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Exact (unrounded) discount in USD major units for a given subtotal,
    /// clamped to `[0, subtotal]`.
    pub fn exact_amount(&self, subtotal_usd: Decimal) -> Decimal {
        let ceiling = subtotal_usd.max(Decimal::ZERO);
        let raw = match self.kind {
            DiscountKind::Fixed => Some(self.value),
            DiscountKind::Percentage => subtotal_usd
                .checked_mul(self.value)
                .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED)),
        };
        // out of Decimal range can only mean "more than the subtotal"
        raw.map_or(ceiling, |d| d.max(Decimal::ZERO).min(ceiling))
    }
}

#[derive(Deserialize)]
struct DiscountWire {
    kind: DiscountKind,
    value: Decimal,
}

impl From<DiscountWire> for Discount {
    fn from(wire: DiscountWire) -> Self {
        Discount::new(wire.kind, wire.value)
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::none()
    }
}

// =============================================================================
// Invoice Type
// =============================================================================

/// The kind of document being issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceType {
    #[default]
    Sale,
    Wholesale,
    Purchase,
    SaleReturn,
    PurchaseReturn,
}

impl InvoiceType {
    /// Three-letter tag leading every invoice number.
    pub const fn tag(&self) -> &'static str {
        match self {
            InvoiceType::Sale => "INV",
            InvoiceType::Wholesale => "WHL",
            InvoiceType::Purchase => "PUR",
            InvoiceType::SaleReturn => "SRT",
            InvoiceType::PurchaseReturn => "PRT",
        }
    }
}

impl fmt::Display for InvoiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Payment state of an invoice.
///
/// ## State Machine
/// ```text
///  Draft ──► Outstanding ──► Deferred ──┐
///    │          │               │       │
///    │          ▼               ▼       │
///    └────► PartiallyPaid ◄─────┘       │
///               │                       │
///               ▼                       │
///             Paid ◄────────────────────┘
///
///  Draft, Outstanding and Deferred also go straight to Paid.
///
///  Cancelled: reachable from every state except Paid
///  Paid, Cancelled: terminal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Draft,
    #[serde(alias = "CONFIRMED")]
    Outstanding,
    #[serde(alias = "SCHEDULED")]
    Deferred,
    PartiallyPaid,
    Paid,
    #[serde(alias = "VOID")]
    Cancelled,
}

impl PaymentStatus {
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Cancelled)
    }

    /// Whether moving from `self` to `next` is allowed.
    pub const fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (*self, next) {
            (Paid, _) | (Cancelled, _) => false,
            (_, Cancelled) => true,
            (Draft, Outstanding) | (Draft, PartiallyPaid) | (Draft, Paid) => true,
            (Outstanding, Deferred) | (Outstanding, PartiallyPaid) | (Outstanding, Paid) => true,
            (Deferred, PartiallyPaid) | (Deferred, Paid) => true,
            (PartiallyPaid, PartiallyPaid) | (PartiallyPaid, Paid) => true,
            _ => false,
        }
    }

    /// Whether a payment may be applied in this state.
    #[inline]
    pub const fn accepts_payment(&self) -> bool {
        !self.is_terminal()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Physical SDG cash.
    Cash,
    /// Card on an external terminal.
    Card,
    /// Bank transfer, recorded in the non-cash column.
    BankTransfer,
    /// Cash and card together.
    Mixed,
}

// =============================================================================
// Catalog & Stock
// =============================================================================

/// The sellable item as the invoice screen sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub unit_price_usd: Money,
}

impl CatalogItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit_price_usd: Money) -> Self {
        CatalogItem {
            id: id.into(),
            name: name.into(),
            unit_price_usd,
        }
    }
}

/// Read-only snapshot of one stock batch, as returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockBatch {
    pub id: String,
    pub item_id: String,
    pub qty_remaining: i64,
    #[ts(as = "Option<String>")]
    pub expiry_date: Option<NaiveDate>,
    #[serde(default)]
    pub unit_cost_usd: Money,
}

// =============================================================================
// Day Cycle
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayCycleStatus {
    Open,
    Closed,
}

/// A branch's trading day, carrying the rate in force for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DayCycle {
    pub id: String,
    pub branch_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub status: DayCycleStatus,
    #[ts(as = "String")]
    #[serde(rename = "exchangeRate")]
    pub rate: ExchangeRate,
}

impl DayCycle {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == DayCycleStatus::Open
    }

    /// The pricing context for this day, or `DayClosed` when the day is shut.
    pub fn exchange_context(&self) -> CoreResult<ExchangeRateContext> {
        if !self.is_open() {
            return Err(CoreError::DayClosed {
                branch_id: self.branch_id.clone(),
            });
        }
        Ok(ExchangeRateContext::new(
            self.branch_id.clone(),
            self.date,
            self.rate,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(dec!(17)).bps(), 1700);
        assert_eq!(TaxRate::from_percentage(dec!(8.25)).bps(), 825);
        assert_eq!(TaxRate::from_percentage(dec!(-5)).bps(), 0);
        // midpoints round away from zero
        assert_eq!(TaxRate::from_percentage(dec!(8.125)).bps(), 813);
        assert_eq!(TaxRate::from_percentage(dec!(0.005)).bps(), 1);
        assert_eq!(TaxRate::from_percentage(Decimal::MAX).bps(), u32::MAX);
        assert_eq!(TaxRate::from_percentage(Decimal::MIN).bps(), 0);
        assert_eq!(TaxRate::from_bps(1700).fraction(), dec!(0.17));
    }

    #[test]
    fn test_discount_clamps_negative_value() {
        assert_eq!(Discount::fixed(dec!(-3)).value(), Decimal::ZERO);
        assert_eq!(Discount::percentage(dec!(-10)).value(), Decimal::ZERO);
    }

    #[test]
    fn test_discount_deserialize_clamps() {
        let d: Discount = serde_json::from_str(r#"{"kind":"FIXED","value":"-4"}"#).unwrap();
        assert_eq!(d.value(), Decimal::ZERO);
    }

    #[test]
    fn test_discount_exact_amount() {
        assert_eq!(Discount::fixed(dec!(5)).exact_amount(dec!(100)), dec!(5));
        assert_eq!(
            Discount::percentage(dec!(12.5)).exact_amount(dec!(10)),
            dec!(1.25)
        );
        // larger than the subtotal clamps to the subtotal
        assert_eq!(Discount::fixed(dec!(500)).exact_amount(dec!(100)), dec!(100));
        assert_eq!(
            Discount::percentage(dec!(150)).exact_amount(dec!(100)),
            dec!(100)
        );
    }

    #[test]
    fn test_discount_percentage_capped_at_hundred() {
        assert_eq!(Discount::percentage(dec!(250)).value(), dec!(100));
        assert_eq!(Discount::fixed(dec!(250)).value(), dec!(250));

        let huge: Discount = serde_json::from_str(
            r#"{"kind":"PERCENTAGE","value":"79228162514264337593543950335"}"#,
        )
        .unwrap();
        assert_eq!(huge.value(), dec!(100));
        assert_eq!(huge.exact_amount(dec!(92233720368547758.07)), dec!(92233720368547758.07));
    }

    #[test]
    fn test_discount_exact_amount_out_of_range_clamps() {
        // a percentage built without the constructor cap
        let raw = Discount {
            kind: DiscountKind::Percentage,
            value: Decimal::MAX,
        };
        assert_eq!(raw.exact_amount(dec!(1000)), dec!(1000));
        assert_eq!(raw.exact_amount(Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_invoice_type_tags() {
        assert_eq!(InvoiceType::Sale.tag(), "INV");
        assert_eq!(InvoiceType::Wholesale.tag(), "WHL");
        assert_eq!(InvoiceType::Purchase.tag(), "PUR");
        assert_eq!(InvoiceType::SaleReturn.tag(), "SRT");
        assert_eq!(InvoiceType::PurchaseReturn.tag(), "PRT");
    }

    #[test]
    fn test_status_transitions() {
        use PaymentStatus::*;
        assert!(Draft.can_transition_to(Outstanding));
        assert!(Outstanding.can_transition_to(Deferred));
        assert!(Deferred.can_transition_to(PartiallyPaid));
        assert!(PartiallyPaid.can_transition_to(Paid));
        assert!(PartiallyPaid.can_transition_to(Cancelled));
        assert!(!PartiallyPaid.can_transition_to(Deferred));
        assert!(!PartiallyPaid.can_transition_to(Outstanding));
        assert!(!Paid.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Outstanding));
        assert!(Paid.is_terminal() && Cancelled.is_terminal());
    }

    #[test]
    fn test_accepts_payment() {
        use PaymentStatus::*;
        for status in [Draft, Outstanding, Deferred, PartiallyPaid] {
            assert!(status.accepts_payment(), "{status:?}");
        }
        assert!(Draft.can_transition_to(PartiallyPaid));
        assert!(!Paid.accepts_payment());
        assert!(!Cancelled.accepts_payment());
    }

    #[test]
    fn test_status_serde_aliases() {
        let s: PaymentStatus = serde_json::from_str("\"CONFIRMED\"").unwrap();
        assert_eq!(s, PaymentStatus::Outstanding);
        let s: PaymentStatus = serde_json::from_str("\"SCHEDULED\"").unwrap();
        assert_eq!(s, PaymentStatus::Deferred);
        assert_eq!(
            serde_json::to_string(&PaymentStatus::PartiallyPaid).unwrap(),
            "\"PARTIALLY_PAID\""
        );
    }

    #[test]
    fn test_closed_day_cycle_has_no_context() {
        let mut day = DayCycle {
            id: "dc-1".to_string(),
            branch_id: "branch-001".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            status: DayCycleStatus::Open,
            rate: ExchangeRate::new(dec!(600)).unwrap(),
        };
        assert_eq!(day.exchange_context().unwrap().rate.value(), dec!(600));

        day.status = DayCycleStatus::Closed;
        assert!(matches!(
            day.exchange_context(),
            Err(CoreError::DayClosed { .. })
        ));
    }
}
