//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Accumulating floats across a night of line items drifts:               │
//! │    680 × 0.1 summed 300 times ≠ 20,400 × 0.1                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Yen                                              │
//! │    Yen has no minor unit, so every amount is an exact i64.              │
//! │    Tax extraction uses i128 intermediates - no precision loss, ever.    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kaikei_core::money::Money;
//!
//! let unit = Money::from_yen(680);      // からあげ
//! let line = unit * 3;                  // 2,040 yen
//! let total = line + Money::from_yen(550);
//!
//! // NEVER do this:
//! // let bad = Money::from_float(6.80); // NO SUCH METHOD EXISTS!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::TaxRate;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in yen.
///
/// ## Design Decisions
/// - **i64 (signed)**: Allows negative values for refunds and corrections
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## User Workflow Context
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                    Where Money is Used                                  │
/// │                                                                         │
/// │  MenuItem.price ──► line unit price ──► line total ──► order total     │
/// │                                              │                          │
/// │                                              ▼                          │
/// │  SalesCycle.total_amount ──► DailySales.total_amount / tax_amount      │
/// │                                                                         │
/// │  EVERY monetary value in the engine flows through this type            │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole yen.
    ///
    /// ## Example
    /// ```rust
    /// use kaikei_core::money::Money;
    ///
    /// let price = Money::from_yen(1500);
    /// assert_eq!(price.yen(), 1500);
    /// ```
    #[inline]
    pub const fn from_yen(yen: i64) -> Self {
        Money(yen)
    }

    /// Returns the value in yen.
    #[inline]
    pub const fn yen(&self) -> i64 {
        self.0
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

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Extracts the tax portion contained in a tax-included amount.
    ///
    /// ## Tax-Included Pricing
    /// ```text
    /// ┌─────────────────────────────────────────────────────────────────────┐
    /// │  Menu prices already contain consumption tax (内税).                │
    /// │                                                                     │
    /// │  displayed price = net + tax                                        │
    /// │  tax             = price × rate / (1 + rate)                        │
    /// │                                                                     │
    /// │  1,100 yen at 10%  →  tax 100, net 1,000                            │
    /// │  3,700 yen at 10%  →  tax 336, net 3,364                            │
    /// └─────────────────────────────────────────────────────────────────────┘
    /// ```
    ///
    /// ## Implementation
    /// Integer math with an i128 intermediate:
    /// `(amount × bps + (10000 + bps)/2) / (10000 + bps)`
    /// The added half-denominator rounds to nearest.
    ///
    /// ## Example
    /// ```rust
    /// use kaikei_core::money::Money;
    /// use kaikei_core::types::TaxRate;
    ///
    /// let total = Money::from_yen(1100);
    /// let tax = total.tax_included_in(TaxRate::from_bps(1000)); // 10%
    /// assert_eq!(tax.yen(), 100);
    /// ```
    pub fn tax_included_in(&self, rate: TaxRate) -> Money {
        if rate.is_zero() {
            return Money::zero();
        }
        // i128 prevents overflow on large daily totals
        let denom = 10000i128 + rate.bps() as i128;
        let tax = (self.0 as i128 * rate.bps() as i128 + denom / 2) / denom;
        Money(tax as i64)
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use kaikei_core::money::Money;
    ///
    /// let unit_price = Money::from_yen(1000);
    /// let line_total = unit_price.multiply_quantity(2);
    /// assert_eq!(line_total.yen(), 2000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and diagnostics. Use frontend formatting for actual UI
/// display to handle localization properly.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}¥{}", sign, group_thousands(self.0.unsigned_abs()))
    }
}

/// Groups digits in threes: 1234567 → "1,234,567".
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let bytes = digits.as_bytes();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*b as char);
    }
    out
}

/// Default money is zero.
impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

/// Addition assignment (+=).
impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

/// Subtraction of two Money values.
impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

/// Subtraction assignment (-=).
impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

/// Multiplication by i64.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

/// Summation over iterators of Money (line totals → visit total).
impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_yen() {
        let money = Money::from_yen(1500);
        assert_eq!(money.yen(), 1500);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_yen(680)), "¥680");
        assert_eq!(format!("{}", Money::from_yen(3700)), "¥3,700");
        assert_eq!(format!("{}", Money::from_yen(1234567)), "¥1,234,567");
        assert_eq!(format!("{}", Money::from_yen(-550)), "-¥550");
        assert_eq!(format!("{}", Money::from_yen(0)), "¥0");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_yen(1000);
        let b = Money::from_yen(500);

        assert_eq!((a + b).yen(), 1500);
        assert_eq!((a - b).yen(), 500);
        let result: Money = a * 3;
        assert_eq!(result.yen(), 3000);
    }

    #[test]
    fn test_sum() {
        let lines = [Money::from_yen(2000), Money::from_yen(1500), Money::from_yen(200)];
        let total: Money = lines.into_iter().sum();
        assert_eq!(total.yen(), 3700);
    }

    #[test]
    fn test_tax_extraction_exact() {
        // 1,100 yen tax-included at 10% → tax 100, net 1,000
        let total = Money::from_yen(1100);
        let tax = total.tax_included_in(TaxRate::from_bps(1000));
        assert_eq!(tax.yen(), 100);
    }

    #[test]
    fn test_tax_extraction_with_rounding() {
        // 3,700 yen at 10% → 3700 × 1000/11000 = 336.36… → 336
        let total = Money::from_yen(3700);
        let tax = total.tax_included_in(TaxRate::from_bps(1000));
        assert_eq!(tax.yen(), 336);

        // 398 yen at the 8% reduced rate → 398 × 800/10800 = 29.48… → 29
        let takeout = Money::from_yen(398);
        let tax = takeout.tax_included_in(TaxRate::from_bps(800));
        assert_eq!(tax.yen(), 29);
    }

    #[test]
    fn test_tax_extraction_zero_rate() {
        let total = Money::from_yen(5000);
        assert_eq!(total.tax_included_in(TaxRate::zero()), Money::zero());
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let positive = Money::from_yen(100);
        assert!(!positive.is_zero());
        assert!(positive.is_positive());
        assert!(!positive.is_negative());

        let negative = Money::from_yen(-100);
        assert!(!negative.is_zero());
        assert!(!negative.is_positive());
        assert!(negative.is_negative());
    }

    #[test]
    fn test_multiply_quantity() {
        let unit_price = Money::from_yen(1000);
        let line_total = unit_price.multiply_quantity(2);
        assert_eq!(line_total.yen(), 2000);
    }
}
