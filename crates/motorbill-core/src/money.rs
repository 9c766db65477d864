//! # Money Module
//!
//! Provides the `Money` type for every amount on a quotation.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌                                  │
//! │                                                                         │
//! │  A quotation must satisfy grand == spares + labour EXACTLY, so every    │
//! │  amount is held as whole paise (1 rupee = 100 paise) in an i64.         │
//! │                                                                         │
//! │  Text typed into a cell ──► parse_amount() ──► Money(paise)             │
//! │                                 │                                       │
//! │                                 └── garbage degrades to zero            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Display
//! Amounts print in the Indian grouping convention: the last three digits
//! form one group and every group above that has two digits.
//!
//! ```rust
//! use motorbill_core::money::Money;
//!
//! let amount = Money::from_rupees_paise(123_456, 50);
//! assert_eq!(amount.to_string(), "₹1,23,456.50");
//! assert_eq!(amount.grouped(), "1,23,456.50");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};
use ts_rs::TS;

/// Currency symbol used by [`Money`]'s `Display` implementation.
pub const CURRENCY_SYMBOL: &str = "₹";

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise.
///
/// ## Design Decisions
/// - **i64 (signed)**: subtraction stays total even though cells are
///   clamped to non-negative values on entry
/// - **Saturating arithmetic**: absurd cell values pin at the bounds
///   instead of panicking mid-keystroke
/// - **Single field tuple struct**: zero-cost abstraction over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees and paise.
    ///
    /// ```rust
    /// use motorbill_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees_paise(10, 99).paise(), 1099);
    /// ```
    #[inline]
    pub const fn from_rupees_paise(rupees: i64, paise: i64) -> Self {
        Money(rupees.saturating_mul(100).saturating_add(paise))
    }

    /// Creates a Money value from whole rupees.
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees.saturating_mul(100))
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
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

    /// Multiplies a unit cost by a quantity.
    ///
    /// ```rust
    /// use motorbill_core::money::Money;
    ///
    /// let unit = Money::from_rupees(500);
    /// assert_eq!(unit.multiply_quantity(2), Money::from_rupees(1000));
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: u32) -> Self {
        Money(self.0.saturating_mul(qty as i64))
    }

    /// Formats without the currency symbol: `1,23,456.00`.
    pub fn grouped(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        format!(
            "{}{}.{:02}",
            sign,
            group_indian(&self.rupees().unsigned_abs().to_string()),
            self.paise_part()
        )
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses text typed into an amount cell.
///
/// ## Rules
/// - Thousands separators (`,`) are stripped
/// - Plain decimals are parsed exactly, rounding to the nearest paisa
/// - Anything else that still parses as a number (`1e3`) goes through f64
/// - Unparseable, negative or non-finite input degrades to zero
///
/// ```rust
/// use motorbill_core::money::{parse_amount, Money};
///
/// assert_eq!(parse_amount("1,250.5"), Money::from_paise(125_050));
/// assert_eq!(parse_amount("abc"), Money::zero());
/// assert_eq!(parse_amount("-40"), Money::zero());
/// ```
pub fn parse_amount(raw: &str) -> Money {
    let cleaned: String = raw.trim().chars().filter(|c| *c != ',').collect();
    let unsigned = cleaned.strip_prefix('+').unwrap_or(&cleaned);

    if let Some(paise) = parse_decimal_paise(unsigned) {
        return Money::from_paise(paise);
    }

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => {
            Money::from_paise((value * 100.0).round() as i64)
        }
        _ => Money::zero(),
    }
}

/// Exact `digits[.digits]` parse; `None` for anything else.
fn parse_decimal_paise(s: &str) -> Option<i64> {
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let rupees: i64 = if whole.is_empty() { 0 } else { whole.parse().ok()? };
    let mut digits = frac.bytes().map(|b| i64::from(b - b'0'));
    let tens = digits.next().unwrap_or(0);
    let units = digits.next().unwrap_or(0);
    let round_up = i64::from(digits.next().map_or(false, |d| d >= 5));

    rupees.checked_mul(100)?.checked_add(tens * 10 + units + round_up)
}

// =============================================================================
// Indian Digit Grouping
// =============================================================================

/// Groups a run of ASCII digits the Indian way: `123456` → `1,23,456`.
///
/// Works on the string directly, so arbitrarily long inputs never overflow.
/// Callers are expected to pass digits only, without leading zeros.
pub fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    let mut out = groups.join(",");
    out.push(',');
    out.push_str(tail);
    out
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let grouped = self.grouped();
        match grouped.strip_prefix('-') {
            Some(rest) => write!(f, "-{}{}", CURRENCY_SYMBOL, rest),
            None => write!(f, "{}{}", CURRENCY_SYMBOL, grouped),
        }
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        self.multiply_quantity(qty)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_paise() {
        let money = Money::from_paise(1099);
        assert_eq!(money.paise(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.paise_part(), 99);
    }

    #[test]
    fn test_from_rupees_saturates() {
        assert_eq!(Money::from_rupees_paise(i64::MAX, 99), Money::from_paise(i64::MAX));
        assert_eq!(Money::from_rupees(i64::MIN / 10), Money::from_paise(i64::MIN));
        assert_eq!(Money::from_rupees_paise(-1, 0).paise(), -100);
    }

    #[test]
    fn test_display_uses_indian_grouping() {
        assert_eq!(Money::from_rupees(4000).to_string(), "₹4,000.00");
        assert_eq!(Money::from_rupees(123_456).to_string(), "₹1,23,456.00");
        assert_eq!(Money::from_rupees(12_345_678).to_string(), "₹1,23,45,678.00");
        assert_eq!(Money::from_paise(5).to_string(), "₹0.05");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
    }

    #[test]
    fn test_group_indian() {
        assert_eq!(group_indian(""), "");
        assert_eq!(group_indian("7"), "7");
        assert_eq!(group_indian("999"), "999");
        assert_eq!(group_indian("1000"), "1,000");
        assert_eq!(group_indian("123456"), "1,23,456");
        assert_eq!(group_indian("1234567"), "12,34,567");
    }

    #[test]
    fn test_parse_amount_exact_decimals() {
        assert_eq!(parse_amount("500"), Money::from_rupees(500));
        assert_eq!(parse_amount("0.1"), Money::from_paise(10));
        assert_eq!(parse_amount(".5"), Money::from_paise(50));
        assert_eq!(parse_amount("12."), Money::from_rupees(12));
        assert_eq!(parse_amount("1.005"), Money::from_paise(101));
        assert_eq!(parse_amount("1,23,456"), Money::from_rupees(123_456));
    }

    #[test]
    fn test_parse_amount_degrades_to_zero() {
        assert_eq!(parse_amount(""), Money::zero());
        assert_eq!(parse_amount("."), Money::zero());
        assert_eq!(parse_amount("12abc"), Money::zero());
        assert_eq!(parse_amount("-5"), Money::zero());
        assert_eq!(parse_amount("NaN"), Money::zero());
        assert_eq!(parse_amount("inf"), Money::zero());
    }

    #[test]
    fn test_parse_amount_scientific_notation() {
        assert_eq!(parse_amount("1e3"), Money::from_rupees(1000));
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_paise(1000);
        let b = Money::from_paise(500);
        assert_eq!((a + b).paise(), 1500);
        assert_eq!((a - b).paise(), 500);
        assert_eq!((a * 3).paise(), 3000);

        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total.paise(), 2000);
    }
}
