//! # Currency Converter
//!
//! USD ⇄ SDG conversion using a day-scoped exchange rate.
//!
//! ## Conversion Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   amount_sdg = round_half_away(amount_usd × rate)                       │
//! │   amount_usd = round_half_away(amount_sdg ÷ rate)                       │
//! │                                                                         │
//! │   rate: SDG per 1 USD, exact decimal, strictly positive                 │
//! │   both sides: 2 fractional digits, stored as integer minor units        │
//! │                                                                         │
//! │   One branch, one open day cycle, one rate. A draft pins the rate       │
//! │   of the first line it prices; a different rate later is an error,     │
//! │   never a silent recompute.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::{DualMoney, Money};

// =============================================================================
// Exchange Rate
// =============================================================================

/// SDG per one USD. Always strictly positive.
///
/// Serialized as a decimal string (`"600.5"`) so no precision is lost
/// crossing the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct ExchangeRate(Decimal);

impl ExchangeRate {
    /// Creates a rate, rejecting zero and negative values.
    pub fn new(rate: Decimal) -> CoreResult<Self> {
        if rate <= Decimal::ZERO {
            return Err(CoreError::InvalidRate {
                rate: rate.to_string(),
            });
        }
        Ok(ExchangeRate(rate.normalize()))
    }

    #[inline]
    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for ExchangeRate {
    type Error = CoreError;

    fn try_from(rate: Decimal) -> Result<Self, Self::Error> {
        ExchangeRate::new(rate)
    }
}

impl From<ExchangeRate> for Decimal {
    fn from(rate: ExchangeRate) -> Self {
        rate.0
    }
}

impl FromStr for ExchangeRate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rate = Decimal::from_str(s.trim()).map_err(|_| CoreError::InvalidRate {
            rate: s.to_string(),
        })?;
        ExchangeRate::new(rate)
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Exchange Rate Context
// =============================================================================

/// The rate in force for one branch on one open day cycle.
///
/// Passed explicitly into every pricing call; the engine never looks a rate
/// up on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRateContext {
    pub branch_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "String")]
    #[serde(rename = "rateUsdToSdg")]
    pub rate: ExchangeRate,
}

impl ExchangeRateContext {
    pub fn new(branch_id: impl Into<String>, date: NaiveDate, rate: ExchangeRate) -> Self {
        ExchangeRateContext {
            branch_id: branch_id.into(),
            date,
            rate,
        }
    }

    /// Converts a USD amount into the pair `(usd, sdg)` at this context's rate.
    pub fn dual(&self, usd: Money) -> CoreResult<DualMoney> {
        Ok(DualMoney::new(usd, to_sdg(usd, self.rate.value())?))
    }
}

impl fmt::Display for ExchangeRateContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}={}", self.branch_id, self.date, self.rate)
    }
}

// =============================================================================
// Conversions
// =============================================================================

fn check_rate(rate: Decimal) -> CoreResult<()> {
    if rate <= Decimal::ZERO {
        return Err(CoreError::InvalidRate {
            rate: rate.to_string(),
        });
    }
    Ok(())
}

/// Converts USD minor units to SDG minor units.
///
/// ## Example
/// ```rust
/// use dukan_core::currency::to_sdg;
/// use dukan_core::money::Money;
/// use rust_decimal::Decimal;
///
/// // 3.33 USD at 600.5 = 1999.665 SDG → 1999.67
/// let sdg = to_sdg(Money::from_minor(333), Decimal::new(6005, 1)).unwrap();
/// assert_eq!(sdg.minor(), 199967);
/// ```
pub fn to_sdg(amount_usd: Money, rate: Decimal) -> CoreResult<Money> {
    to_sdg_exact(amount_usd.to_decimal(), rate)
}

/// Converts an unrounded USD amount (major units) to SDG minor units.
///
/// Used by the totals calculator so discount and tax are converted from
/// their exact values and rounded once.
pub fn to_sdg_exact(amount_usd: Decimal, rate: Decimal) -> CoreResult<Money> {
    check_rate(rate)?;
    let sdg = amount_usd
        .checked_mul(rate)
        .ok_or(CoreError::AmountOverflow {
            context: "USD to SDG conversion",
        })?;
    Money::from_decimal(sdg)
}

/// Converts SDG minor units to USD minor units.
///
/// ## Example
/// ```rust
/// use dukan_core::currency::to_usd;
/// use dukan_core::money::Money;
/// use rust_decimal::Decimal;
///
/// // 1999.67 SDG at 600.5 = 3.330008... USD → 3.33
/// let usd = to_usd(Money::from_minor(199967), Decimal::new(6005, 1)).unwrap();
/// assert_eq!(usd.minor(), 333);
/// ```
pub fn to_usd(amount_sdg: Money, rate: Decimal) -> CoreResult<Money> {
    check_rate(rate)?;
    let usd = amount_sdg
        .to_decimal()
        .checked_div(rate)
        .ok_or(CoreError::AmountOverflow {
            context: "SDG to USD conversion",
        })?;
    Money::from_decimal(usd)
}
