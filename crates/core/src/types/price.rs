//! Type-safe price representation using decimal arithmetic.
//!
//! The backend is loose about prices: `pro_price` arrives as a JSON number, a
//! numeric string, or `null` depending on the endpoint. [`Price`] decodes all
//! of them and keeps exact decimal arithmetic for cart totals.

use core::fmt;
use core::iter::Sum;
use core::ops::Add;
use core::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};

/// A unit or line price in the store currency.
///
/// Display always uses two decimal places, rounding half away from zero:
///
/// ```
/// use adroit_core::Price;
///
/// let price: Price = "10.005".parse().unwrap();
/// assert_eq!(price.times(2).format(), "20.01");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// A zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Multiply by a quantity, saturating at the largest representable price.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self(
            self.0
                .checked_mul(Decimal::from(quantity))
                .unwrap_or_else(|| saturated(self.0)),
        )
    }

    /// Format with exactly two decimals, rounding half away from zero.
    #[must_use]
    pub fn format(&self) -> String {
        let rounded = self
            .0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        format!("{rounded:.2}")
    }

    /// Decode a loosely typed JSON price.
    ///
    /// `null`, empty strings, and anything unparseable decode as zero.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => parse_lenient(&n.to_string()),
            serde_json::Value::String(s) => parse_lenient(s),
            _ => Self::ZERO,
        }
    }
}

fn saturated(sign_of: Decimal) -> Decimal {
    if sign_of.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    }
}

fn parse_lenient(s: &str) -> Price {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .map_or(Price::ZERO, Price)
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

impl FromStr for Price {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim()).map(Self)
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<u32> for Price {
    fn from(amount: u32) -> Self {
        Self(Decimal::from(amount))
    }
}

impl Add for Price {
    type Output = Self;

    /// Saturates instead of overflowing.
    fn add(self, rhs: Self) -> Self {
        Self(
            self.0
                .checked_add(rhs.0)
                .unwrap_or_else(|| saturated(self.0)),
        )
    }
}

impl Sum for Price {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&value))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn price(s: &str) -> Price {
        s.parse().unwrap()
    }

    #[test]
    fn test_format_two_decimals() {
        assert_eq!(price("5").format(), "5.00");
        assert_eq!(price("19.9").format(), "19.90");
        assert_eq!(Price::ZERO.format(), "0.00");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(price("0.125").format(), "0.13");
        assert_eq!(price("0.135").format(), "0.14");
        assert_eq!(price("2.004").format(), "2.00");
    }

    #[test]
    fn test_line_total_is_exact() {
        let total = price("10.005").times(2) + price("5").times(1);
        assert_eq!(total.amount(), price("25.010").amount());
        assert_eq!(total.format(), "25.01");
    }

    #[test]
    fn test_overflow_saturates() {
        let max = Price::new(Decimal::MAX);
        assert_eq!(max.times(3).amount(), Decimal::MAX);
        assert_eq!((max + price("1")).amount(), Decimal::MAX);
        assert_eq!(Price::new(Decimal::MIN).times(2).amount(), Decimal::MIN);

        let total: Price = [max, max, price("5")].into_iter().sum();
        assert_eq!(total.amount(), Decimal::MAX);
        assert!(total.format().starts_with("79228162514264337593543950335"));
    }

    #[test]
    fn test_sum() {
        let total: Price = [price("1.10"), price("2.20"), price("3.30")]
            .into_iter()
            .sum();
        assert_eq!(total.format(), "6.60");
    }

    #[test]
    fn test_deserialize_number_string_and_null() {
        let p: Price = serde_json::from_str("49.95").unwrap();
        assert_eq!(p.format(), "49.95");
        let p: Price = serde_json::from_str("\"129.00\"").unwrap();
        assert_eq!(p.format(), "129.00");
        let p: Price = serde_json::from_str("null").unwrap();
        assert_eq!(p, Price::ZERO);
        let p: Price = serde_json::from_str("\"n/a\"").unwrap();
        assert_eq!(p, Price::ZERO);
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&price("10.50")).unwrap();
        assert_eq!(json, "\"10.50\"");
    }
}
