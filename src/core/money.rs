//! Fixed-point money with two decimal places.

use crate::errors::{Error, Result};
use std::{fmt, iter::Sum, ops::Add};

/// Largest accepted unit price, 1,000,000.00.
pub const MAX_PRICE_CENTS: u64 = 100_000_000;

/// An amount in cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(u64);

impl Money {
    /// Nothing owed.
    pub const ZERO: Self = Self(0);

    /// An amount of `cents` hundredths.
    #[must_use]
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The amount in whole cents.
    #[must_use]
    pub const fn cents(self) -> u64 {
        self.0
    }

    /// `self * quantity`, saturating instead of wrapping.
    #[must_use]
    pub const fn times(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(quantity as u64))
    }

    /// Parses a unit price typed into a form, e.g. `2`, `2.5`, `2,50`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPrice`] for empty or non-numeric input, and for
    /// anything [`from_decimal`](Self::from_decimal) rejects.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = || Error::InvalidPrice {
            input: input.to_string(),
        };

        let normalized = input.trim().replace(',', ".");
        let value: f64 = normalized.parse().map_err(|_| invalid())?;
        Self::from_decimal(value).map_err(|_| invalid())
    }

    /// Converts a decimal amount such as `2.5` to whole cents, rounding.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPrice`] for negative or non-finite values and
    /// for anything above [`MAX_PRICE_CENTS`].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_decimal(value: f64) -> Result<Self> {
        let invalid = || Error::InvalidPrice {
            input: value.to_string(),
        };
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }

        let cents = (value * 100.0).round();
        if cents > MAX_PRICE_CENTS as f64 {
            return Err(invalid());
        }

        Ok(Self(cents as u64))
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_parse_accepts_common_forms() -> Result<()> {
        assert_eq!(Money::parse("2")?, Money::from_cents(200));
        assert_eq!(Money::parse("2.5")?, Money::from_cents(250));
        assert_eq!(Money::parse(" 2,50 ")?, Money::from_cents(250));
        assert_eq!(Money::parse("0")?, Money::ZERO);
        assert_eq!(Money::parse("1.006")?, Money::from_cents(101));
        Ok(())
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in ["", "abc", "-1", "NaN", "inf", "1e12"] {
            let result = Money::parse(input);
            assert!(
                matches!(result, Err(Error::InvalidPrice { .. })),
                "{input} should be rejected"
            );
        }
    }

    #[test]
    fn test_from_decimal_rounds_and_bounds() -> Result<()> {
        assert_eq!(Money::from_decimal(2.25)?, Money::from_cents(225));
        assert_eq!(Money::from_decimal(0.994)?, Money::from_cents(99));
        assert_eq!(Money::from_decimal(1_000_000.0)?.cents(), MAX_PRICE_CENTS);
        assert!(Money::from_decimal(1_000_000.01).is_err());
        assert!(Money::from_decimal(-0.5).is_err());
        assert!(Money::from_decimal(f64::NAN).is_err());
        Ok(())
    }

    #[test]
    fn test_display_two_decimals() {
        assert_eq!(Money::from_cents(750).to_string(), "7.50");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn test_times_and_sum() {
        let total: Money = [Money::from_cents(200).times(2), Money::from_cents(250)]
            .into_iter()
            .sum();
        assert_eq!(total, Money::from_cents(650));
        assert_eq!(Money::from_cents(u64::MAX).times(2).cents(), u64::MAX);
    }
}
