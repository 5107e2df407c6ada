//! Money Module
//!
//! Fixed-point currency amounts with two decimal places.
//!
//! ## Design Principles
//! 1. Explicit Error Handling: no silent truncation on parse
//! 2. Type Safety: balances and transfer amounts are `Amount`, never `f64`
//!
//! ## Internal Representation
//! - Backed by `rust_decimal::Decimal`, always normalized to scale 2
//! - Serialized as a string (`"250.00"`) so no float ever crosses the wire
//!
//! ## Usage
//! ```rust
//! use payment_gateway::money::Amount;
//!
//! let amount: Amount = "250.5".parse().unwrap();
//! assert_eq!(amount.to_string(), "250.50");
//! ```

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;

use rust_decimal::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Number of fractional digits carried by every amount.
pub const CURRENCY_DECIMALS: u32 = 2;

// ============================================================================
// Error Types
// ============================================================================

/// Money parsing errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Precision overflow: provided {provided} decimals, max allowed {max}")]
    PrecisionOverflow { provided: u32, max: u32 },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

// ============================================================================
// Amount
// ============================================================================

/// Currency amount with two decimals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Build from an integer number of cents (`25000` -> `250.00`).
    pub fn from_cents(cents: i64) -> Self {
        Amount(Decimal::new(cents, CURRENCY_DECIMALS))
    }

    /// Build from a decimal, rounding half-even to two places.
    pub fn from_decimal(value: Decimal) -> Self {
        let mut rounded = value.round_dp(CURRENCY_DECIMALS);
        rounded.rescale(CURRENCY_DECIMALS);
        Amount(rounded)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    #[inline]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl FromStr for Amount {
    type Err = MoneyError;

    /// Strict parse: at most two fractional digits, optional leading `-`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(MoneyError::InvalidFormat("empty string".into()));
        }

        if let Some((_, frac)) = s.split_once('.') {
            if frac.is_empty() {
                return Err(MoneyError::InvalidFormat(
                    "missing fractional part (e.g., use 5.0 instead of 5.)".into(),
                ));
            }
            if frac.len() > CURRENCY_DECIMALS as usize {
                return Err(MoneyError::PrecisionOverflow {
                    provided: frac.len() as u32,
                    max: CURRENCY_DECIMALS,
                });
            }
        }

        let value = Decimal::from_str(s).map_err(|e| MoneyError::InvalidFormat(e.to_string()))?;
        Ok(Amount::from_decimal(value))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Amount {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Amount(self.0 + rhs.0)
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Amount {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Amount(self.0 - rhs.0)
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("1000".parse::<Amount>().unwrap().to_string(), "1000.00");
        assert_eq!("250.5".parse::<Amount>().unwrap().to_string(), "250.50");
        assert_eq!("0.01".parse::<Amount>().unwrap(), Amount::from_cents(1));
        assert_eq!("-3.20".parse::<Amount>().unwrap().to_string(), "-3.20");
    }

    #[test]
    fn test_parse_rejects_extra_precision() {
        assert_eq!(
            "1.234".parse::<Amount>(),
            Err(MoneyError::PrecisionOverflow {
                provided: 3,
                max: 2
            })
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            "".parse::<Amount>(),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            "12a".parse::<Amount>(),
            Err(MoneyError::InvalidFormat(_))
        ));
        assert!(matches!(
            "5.".parse::<Amount>(),
            Err(MoneyError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_arithmetic() {
        let mut balance = Amount::from_cents(100_000);
        balance -= Amount::from_cents(25_000);
        assert_eq!(balance, Amount::from_cents(75_000));
        balance += Amount::from_cents(1);
        assert_eq!(balance.to_string(), "750.01");
        assert!((Amount::ZERO - Amount::from_cents(1)).is_negative());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Amount::from_cents(25_000)).unwrap();
        assert_eq!(json, "\"250.00\"");
        let back: Amount = serde_json::from_str("\"250\"").unwrap();
        assert_eq!(back, Amount::from_cents(25_000));
    }
}
