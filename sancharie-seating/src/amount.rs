use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Mul, Sub};

/// Minor units (paise) per major unit (rupee).
pub const MINOR_PER_MAJOR: i64 = 100;

/// A non-negative INR amount held in minor units.
///
/// JSON carries major units (`2456.5`), matching what the inventory and
/// payment providers exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor.max(0))
    }

    pub fn from_major(major: i64) -> Self {
        Self::from_minor(major.saturating_mul(MINOR_PER_MAJOR))
    }

    /// Convert a provider decimal; `None` for negative or non-finite input.
    pub fn from_decimal(value: f64) -> Option<Self> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Self((value * MINOR_PER_MAJOR as f64).round() as i64))
    }

    pub fn minor(self) -> i64 {
        self.0
    }

    pub fn as_major_f64(self) -> f64 {
        self.0 as f64 / MINOR_PER_MAJOR as f64
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Divide by a count, rounding half up. Zero when `count` is zero.
    pub fn div_round(self, count: usize) -> Self {
        if count == 0 {
            return Self::ZERO;
        }
        Self(round_half_up(i128::from(self.0), count as i128))
    }
}

/// `numerator / denominator` rounded half up, for non-negative inputs.
/// Widened to `i128` so large amounts cannot overflow; saturates at `i64::MAX`.
pub(crate) fn round_half_up(numerator: i128, denominator: i128) -> i64 {
    let rounded = (2 * numerator + denominator) / (2 * denominator);
    i64::try_from(rounded).unwrap_or(i64::MAX)
}

impl Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount((self.0 - rhs.0).max(0))
    }
}

impl Mul<usize> for Amount {
    type Output = Amount;

    fn mul(self, rhs: usize) -> Amount {
        Amount(self.0.saturating_mul(rhs as i64))
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}.{:02}", self.0 / MINOR_PER_MAJOR, self.0 % MINOR_PER_MAJOR)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_major_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Amount::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom("amount must be a non-negative number"))
    }
}

/// A proportional rate stored in basis points so fare math stays integral.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rate(u32);

impl Rate {
    pub const ZERO: Rate = Rate(0);

    pub fn from_basis_points(bps: u32) -> Self {
        Self(bps)
    }

    /// `0.05` -> 500 bps. `None` for negative or non-finite input.
    pub fn from_fraction(fraction: f64) -> Option<Self> {
        if !fraction.is_finite() || fraction < 0.0 {
            return None;
        }
        Some(Self((fraction * 10_000.0).round() as u32))
    }

    pub fn basis_points(self) -> u32 {
        self.0
    }

    pub fn as_fraction(self) -> f64 {
        self.0 as f64 / 10_000.0
    }

    /// Apply to `amount`, rounding half up to a multiple of `unit` minor units.
    pub fn apply(self, amount: Amount, unit: i64) -> Amount {
        let scaled = i128::from(amount.minor()) * i128::from(self.0);
        let units = round_half_up(scaled, 10_000 * i128::from(unit));
        Amount::from_minor(units.saturating_mul(unit))
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_fraction())
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Rate::from_fraction(value)
            .ok_or_else(|| serde::de::Error::custom("rate must be a non-negative fraction"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_conversion() {
        assert_eq!(Amount::from_decimal(2456.0), Some(Amount::from_minor(245_600)));
        assert_eq!(Amount::from_decimal(12.34), Some(Amount::from_minor(1_234)));
        assert_eq!(Amount::from_decimal(-1.0), None);
        assert_eq!(Amount::from_decimal(f64::NAN), None);
    }

    #[test]
    fn test_rate_rounds_half_up_to_unit() {
        let gst = Rate::from_fraction(0.05).unwrap();
        // 2510 * 0.05 = 125.5 -> 126
        assert_eq!(gst.apply(Amount::from_major(2510), MINOR_PER_MAJOR), Amount::from_major(126));
        // 2509 * 0.05 = 125.45 -> 125
        assert_eq!(gst.apply(Amount::from_major(2509), MINOR_PER_MAJOR), Amount::from_major(125));
    }

    #[test]
    fn test_large_amounts_do_not_overflow() {
        let huge = Amount::from_minor(i64::MAX / 2);
        let gst = Rate::from_fraction(0.05).unwrap();
        let tax = gst.apply(huge, MINOR_PER_MAJOR);
        assert!(tax > Amount::ZERO);
        assert!(tax < huge);
        assert_eq!(Amount::from_minor(i64::MAX).div_round(1), Amount::from_minor(i64::MAX));
        assert_eq!(Amount::from_minor(i64::MAX).div_round(2).minor(), i64::MAX / 2 + 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_minor(245_605).to_string(), "₹2456.05");
    }

    #[test]
    fn test_json_uses_major_units() {
        let json = serde_json::to_string(&Amount::from_major(30)).unwrap();
        assert_eq!(json, "30.0");
        let parsed: Amount = serde_json::from_str("2456.5").unwrap();
        assert_eq!(parsed.minor(), 245_650);
    }
}
