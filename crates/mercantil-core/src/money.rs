//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A sale of 3 lines @ 0.10 must have a principal of exactly 0.30, and   │
//! │  the sum of line subtotals must equal the stored principal.            │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Prices arrive as decimal text ("10.50") and are parsed straight     │
//! │    into cents (1050). No float ever touches a monetary value.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use mercantil_core::money::Money;
//!
//! let price: Money = "10.50".parse().unwrap();
//! assert_eq!(price.cents(), 1050);
//!
//! let line = price.checked_mul_quantity(2).unwrap();
//! assert_eq!(line.to_decimal_string(), "21.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use std::str::FromStr;
use thiserror::Error;
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative deltas (stock restores, corrections)
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serialized as cents**: The JSON API and the database both speak cents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use mercantil_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents 10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Parses a decimal amount with at most two fractional digits.
    ///
    /// ## Accepted
    /// `"10"`, `"10.5"`, `"10.50"`, `"0.01"`, `"-3.25"`
    ///
    /// ## Rejected
    /// `""`, `"10.505"` (sub-cent precision), `"1e3"`, `"10,50"`, `"abc"`
    pub fn parse_decimal(text: &str) -> Result<Money, MoneyParseError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(MoneyParseError::Empty);
        }

        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (digits, ""),
        };

        if whole.is_empty() && fraction.is_empty() {
            return Err(MoneyParseError::Invalid(text.to_string()));
        }
        if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
        {
            return Err(MoneyParseError::Invalid(text.to_string()));
        }

        // Trailing zeros beyond the cent are harmless ("10.500").
        let fraction = fraction.trim_end_matches('0');
        if fraction.len() > 2 {
            return Err(MoneyParseError::TooPrecise(text.to_string()));
        }

        let whole_units: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| MoneyParseError::Overflow)?
        };
        let cents_part: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| MoneyParseError::Overflow)? * 10,
            _ => fraction.parse().map_err(|_| MoneyParseError::Overflow)?,
        };

        let cents = whole_units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents_part))
            .ok_or(MoneyParseError::Overflow)?;

        Ok(Money(if negative { -cents } else { cents }))
    }

    /// Formats the amount as plain decimal text (`"28.50"`, `"-3.05"`).
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!("{}{}.{:02}", sign, self.units().abs(), self.cents_part())
    }

    /// Calculates tax, rounding half up to the cent.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`
    /// The +5000 provides rounding (5000/10000 = 0.5)
    ///
    /// ## Example
    /// ```rust
    /// use mercantil_core::money::Money;
    /// use mercantil_core::types::TaxRate;
    ///
    /// let principal = Money::from_cents(2500);  // 25.00
    /// let rate = TaxRate::from_bps(1400);       // 14%
    /// assert_eq!(principal.calculate_tax(rate).cents(), 350);
    /// ```
    pub fn calculate_tax(&self, rate: TaxRate) -> Money {
        // i128 prevents overflow on large amounts
        let tax_cents = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money::from_cents(tax_cents as i64)
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// ## User Workflow
    /// ```text
    /// Line: PR0001 × 2 @ 10.00
    ///      │
    ///      ▼
    /// checked_mul_quantity(2) ← THIS FUNCTION
    ///      │
    ///      ▼
    /// Line subtotal: 20.00
    /// ```
    #[inline]
    pub fn checked_mul_quantity(&self, qty: i64) -> Option<Money> {
        self.0.checked_mul(qty).map(Money)
    }

    /// Checked addition.
    #[inline]
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Average unit price of `quantity` units costing `self` in total, raised
    /// by `markup_bps` and rounded half up to the cent.
    ///
    /// Returns `None` when `quantity` is not positive.
    ///
    /// ## Example
    /// ```rust
    /// use mercantil_core::money::Money;
    ///
    /// // 10 units bought for 75.00 in total → 7.50 each → +10% = 8.25
    /// let price = Money::from_cents(7500).average_with_markup(10, 1000);
    /// assert_eq!(price, Some(Money::from_cents(825)));
    /// ```
    pub fn average_with_markup(&self, quantity: i64, markup_bps: u32) -> Option<Money> {
        if quantity <= 0 {
            return None;
        }
        let numerator = self.0 as i128 * (10_000 + markup_bps as i128);
        let denominator = quantity as i128 * 10_000;
        let rounded = (2 * numerator + denominator) / (2 * denominator);
        i64::try_from(rounded).ok().map(Money)
    }
}

// =============================================================================
// Parse Errors
// =============================================================================

/// Reasons a decimal amount could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyParseError {
    #[error("amount is empty")]
    Empty,

    #[error("'{0}' is not a decimal amount")]
    Invalid(String),

    #[error("'{0}' has more than two decimal places")]
    TooPrecise(String),

    #[error("amount is too large")]
    Overflow,
}

impl FromStr for Money {
    type Err = MoneyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::parse_decimal(s)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows money with a currency sign for logs and messages.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}.{:02}", sign, self.units().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
