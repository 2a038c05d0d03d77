//! # Money Module
//!
//! Provides the `Money` type for USD and SDG amounts, and `DualMoney` for the
//! paired values every invoice carries.
//!
//! ## Why Integer Minor Units?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  With a daily rate of 600.5 SDG per USD:                                │
//! │    $3.33 × 600.5 = 1999.665 SDG → which cent?                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units + one rounding rule                  │
//! │    Both currencies store 2 fractional digits as i64                     │
//! │    Rates are exact decimals; the product is rounded ONCE,               │
//! │    half away from zero                                                  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use dukan_core::money::Money;
//!
//! let price = Money::from_minor(1099); // 10.99
//! let doubled = price * 2;             // 21.98
//! let total = price + Money::from_minor(500);
//! assert_eq!(total.minor(), 1599);
//! assert_eq!(doubled.to_string(), "21.98");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Fractional digits carried by both USD and SDG.
pub const MINOR_UNIT_SCALE: u32 = 2;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in minor units (cents for USD, piastres for SDG).
///
/// `Money` carries no currency tag. The field name (`usd` / `sdg`) or the
/// `DualMoney` slot it sits in says which currency it is.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  CatalogItem.unit_price_usd ──► InvoiceLine.unit_price (DualMoney)      │
/// │                                        │                                │
/// │                                        ▼                                │
/// │                              InvoiceLine.line_total ──► InvoiceTotals   │
/// │                                                              │          │
/// │  PaymentEvent.cash/card (SDG) ──► Invoice.amount_paid ◄──────┘          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use dukan_core::money::Money;
    ///
    /// let price = Money::from_minor(1099); // 10.99
    /// assert_eq!(price.minor(), 1099);
    /// ```
    #[inline]
    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    /// Creates a Money value from major and minor parts.
    ///
    /// For negative amounts only the major part carries the sign:
    /// `from_major_minor(-5, 50)` is -5.50.
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Rounds an exact decimal amount (in major units) to minor units,
    /// half away from zero.
    ///
    /// ## Example
    /// ```rust
    /// use dukan_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let m = Money::from_decimal(Decimal::new(1999665, 3)).unwrap(); // 1999.665
    /// assert_eq!(m.minor(), 199967);
    /// ```
    pub fn from_decimal(amount: Decimal) -> CoreResult<Self> {
        let rounded =
            amount.round_dp_with_strategy(MINOR_UNIT_SCALE, RoundingStrategy::MidpointAwayFromZero);
        let minor = rounded
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|m| m.to_i64())
            .ok_or(CoreError::AmountOverflow {
                context: "decimal to minor units",
            })?;
        Ok(Money(minor))
    }

    /// Returns the exact value in major units as a Decimal.
    #[inline]
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.0, MINOR_UNIT_SCALE)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Returns the major unit portion.
    #[inline]
    pub const fn major(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative values to zero.
    #[inline]
    pub fn non_negative(self) -> Self {
        Money(self.0.max(0))
    }

    /// Multiplies money by a quantity, failing instead of wrapping.
    ///
    /// ## User Workflow
    /// ```text
    /// Item: Paracetamol 500mg, 2.50 USD
    /// Quantity: 4
    ///      │
    ///      ▼
    /// checked_multiply_quantity(4) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line Total: 10.00 USD
    /// ```
    pub fn checked_multiply_quantity(&self, qty: i64) -> CoreResult<Self> {
        self.0
            .checked_mul(qty)
            .map(Money)
            .ok_or(CoreError::AmountOverflow {
                context: "line total",
            })
    }

    /// Checked addition, used when summing invoice lines.
    pub fn checked_add(&self, other: Money) -> CoreResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(CoreError::AmountOverflow { context: "sum" })
    }

    pub fn checked_sub(&self, other: Money) -> CoreResult<Self> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(CoreError::AmountOverflow {
                context: "difference",
            })
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal rendering without a currency symbol.
///
/// Use frontend formatting for actual display so the currency label and
/// locale are handled there.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major().abs(), self.minor_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// DualMoney
// =============================================================================

/// A USD amount and its SDG mirror.
///
/// Both halves are produced together by the currency converter and are never
/// mutated independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DualMoney {
    pub usd: Money,
    pub sdg: Money,
}

impl DualMoney {
    #[inline]
    pub const fn new(usd: Money, sdg: Money) -> Self {
        DualMoney { usd, sdg }
    }

    #[inline]
    pub const fn zero() -> Self {
        DualMoney {
            usd: Money::zero(),
            sdg: Money::zero(),
        }
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.usd.is_zero() && self.sdg.is_zero()
    }
}

impl Add for DualMoney {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        DualMoney {
            usd: self.usd + other.usd,
            sdg: self.sdg + other.sdg,
        }
    }
}

impl Sub for DualMoney {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        DualMoney {
            usd: self.usd - other.usd,
            sdg: self.sdg - other.sdg,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
