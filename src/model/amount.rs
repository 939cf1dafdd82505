//! Amount type for handling rupee values.
//!
//! This module provides the `Amount` type which wraps `Decimal`. It parses values that may carry a
//! currency prefix and thousands separators (as a spreadsheet may render them) and always displays
//! as `Rs` followed by two decimal places.

use anyhow::{bail, Context};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Currency prefixes that are stripped before parsing.
const PREFIXES: &[&str] = &["Rs.", "Rs", "₹", "$"];

/// Represents an amount of money.
///
/// # Examples
///
/// ```
/// # use expense_bot::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("Rs1,234.5").unwrap();
/// assert_eq!(amount.to_string(), "Rs1234.50");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    value: Decimal,
}

impl Amount {
    pub const ZERO: Amount = Amount::new(Decimal::ZERO);

    /// Creates a new Amount from a Decimal value.
    pub const fn new(value: Decimal) -> Self {
        Self { value }
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.value
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Returns true if the amount is greater than zero.
    pub fn is_positive(&self) -> bool {
        !self.is_zero() && self.value.is_sign_positive()
    }

    /// Adds `other`, or returns `None` if the sum does not fit in a `Decimal`.
    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.value.checked_add(other.value).map(Amount::new)
    }

    /// Parses a spreadsheet cell. Anything that is not a number, including an empty cell, is
    /// `None`.
    pub fn from_cell(cell: &str) -> Option<Self> {
        if cell.trim().is_empty() {
            return None;
        }
        Self::from_str(cell).ok()
    }

    /// The value to send to the spreadsheet. Amounts are written as numbers, not text, so that
    /// the sheet can do arithmetic on them.
    pub(crate) fn to_cell(self) -> serde_json::Value {
        let value = self.value.normalize();
        if value.scale() == 0 {
            if let Some(whole) = value.to_i64() {
                return serde_json::Value::from(whole);
            }
        }
        serde_json::Value::from(value.to_f64().unwrap_or_default())
    }

    /// The value rounded to two decimal places, half away from zero.
    fn rounded(&self) -> Decimal {
        let mut rounded = self
            .value
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(2);
        rounded
    }
}

impl FromStr for Amount {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (negative, unsigned) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, trimmed),
        };

        let without_prefix = PREFIXES
            .iter()
            .find_map(|prefix| unsigned.strip_prefix(prefix))
            .unwrap_or(unsigned)
            .trim_start();

        // Remove commas (thousand separators)
        let digits = without_prefix.replace(',', "");
        if digits.is_empty() {
            bail!("'{s}' is not an amount");
        }

        let value = Decimal::from_str(&digits)
            .or_else(|_| Decimal::from_scientific(&digits))
            .with_context(|| format!("'{s}' is not an amount"))?;
        Ok(Amount::new(if negative { -value } else { value }))
    }
}

impl TryFrom<f64> for Amount {
    type Error = anyhow::Error;

    /// Goes through the shortest decimal representation of `value` so that `0.1` becomes exactly
    /// `0.1` rather than the nearest binary fraction.
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            bail!("{value} is not an amount");
        }
        Amount::from_str(&value.to_string())
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut rounded = self.rounded();
        if rounded.is_zero() {
            rounded.set_sign_positive(true);
        }
        write!(f, "Rs{rounded}")
    }
}

impl Serialize for Amount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // Serialize as a string with the rupee prefix
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Amount::from_str(&s).map_err(serde::de::Error::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}
