//! Exact multiply and percentage on raw amounts.
//!
//! Factors are plain decimal numbers such as `"33.3333"` (no exponents), held
//! as `mantissa / 10^scale`. Products are computed in 512-bit integers, so an
//! amount up to `2^128 - 1` times a factor with up to [`MAX_DIGITS`]
//! significant digits is exact. The result is truncated toward zero.

use std::fmt;
use std::str::FromStr;

use nanomock_types::Amount;
use primitive_types::U512;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Digits accepted in a factor, integer and fractional parts together.
pub const MAX_DIGITS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid decimal factor {0:?}")]
    InvalidFactor(String),

    #[error("result exceeds the 128-bit raw range")]
    Overflow,
}

/// A non-negative decimal number.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecimalFactor {
    mantissa: U512,
    scale: u32,
    text: String,
}

impl DecimalFactor {
    pub fn integer(value: u128) -> Self {
        Self {
            mantissa: U512::from(value),
            scale: 0,
            text: value.to_string(),
        }
    }

    /// Whether the factor is strictly greater than `limit`.
    pub fn exceeds(&self, limit: u128) -> bool {
        let scaled = U512::from(limit) * U512::from(10u8).pow(U512::from(self.scale));
        self.mantissa > scaled
    }
}

impl From<u128> for DecimalFactor {
    fn from(value: u128) -> Self {
        Self::integer(value)
    }
}

impl FromStr for DecimalFactor {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || AmountError::InvalidFactor(s.to_string());
        let text = s.trim();
        let unsigned = text.strip_prefix('+').unwrap_or(text);
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (unsigned, ""),
        };
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
            || int_part.len() + frac_part.len() > MAX_DIGITS
        {
            return Err(invalid());
        }

        let digits = format!("{int_part}{frac_part}");
        let mantissa = U512::from_dec_str(&digits).map_err(|_| invalid())?;
        Ok(Self {
            mantissa,
            scale: frac_part.len() as u32,
            text: text.to_string(),
        })
    }
}

impl fmt::Display for DecimalFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for DecimalFactor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for DecimalFactor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FactorVisitor;

        impl<'de> Visitor<'de> for FactorVisitor {
            type Value = DecimalFactor;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a non-negative decimal number")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(DecimalFactor::integer(v as u128))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                v.to_string().parse().map_err(E::custom)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                v.to_string().parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(FactorVisitor)
    }
}

fn to_amount(value: U512) -> Result<Amount, AmountError> {
    if value > U512::from(u128::MAX) {
        return Err(AmountError::Overflow);
    }
    Ok(Amount::raw(value.low_u128()))
}

/// `amount * factor`, truncated.
pub fn multiply(amount: Amount, factor: &DecimalFactor) -> Result<Amount, AmountError> {
    let product = U512::from(amount.number())
        .checked_mul(factor.mantissa)
        .ok_or(AmountError::Overflow)?;
    to_amount(product / U512::exp10(factor.scale as usize))
}

/// `amount * percent / 100`, truncated.
pub fn percent(amount: Amount, percent: &DecimalFactor) -> Result<Amount, AmountError> {
    let product = U512::from(amount.number())
        .checked_mul(percent.mantissa)
        .ok_or(AmountError::Overflow)?;
    to_amount(product / (U512::exp10(percent.scale as usize) * U512::from(100u8)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factor(s: &str) -> DecimalFactor {
        s.parse().unwrap()
    }

    #[test]
    fn full_supply_percentages_are_exact() {
        let supply = Amount::MAX;
        assert_eq!(
            percent(supply, &factor("50")).unwrap(),
            Amount::raw(u128::MAX / 2)
        );
        assert_eq!(
            percent(supply, &factor("33.3333")).unwrap(),
            Amount::raw((U512::from(u128::MAX) * U512::from(333_333u32) / U512::from(1_000_000u32)).low_u128())
        );
        assert_eq!(percent(supply, &factor("100")).unwrap(), supply);
    }

    #[test]
    fn exceeds_compares_across_scales() {
        assert!(!factor("100").exceeds(100));
        assert!(!factor("100.000").exceeds(100));
        assert!(!factor("99.9999").exceeds(100));
        assert!(factor("100.0001").exceeds(100));
        assert!(factor("200").exceeds(100));
    }

    #[test]
    fn multiply_truncates_fractions() {
        assert_eq!(multiply(Amount::raw(10), &factor("0.15")).unwrap(), Amount::raw(1));
        assert_eq!(multiply(Amount::raw(7), &factor("1.5")).unwrap(), Amount::raw(10));
        assert_eq!(multiply(Amount::raw(3), &factor(".5")).unwrap(), Amount::raw(1));
    }

    #[test]
    fn tree_forwarding_amount_for_depth_one() {
        // S = 2, D = 3, d = 1: (2^3 - 2 + 1) * 10^30
        let min_balance = Amount::raw(10u128.pow(30));
        let forwarded = multiply(min_balance, &DecimalFactor::integer(2u128.pow(3) - 2 + 1)).unwrap();
        assert_eq!(forwarded, Amount::raw(7 * 10u128.pow(30)));
    }

    #[test]
    fn overflow_is_reported() {
        assert_eq!(
            multiply(Amount::MAX, &factor("2")),
            Err(AmountError::Overflow)
        );
        assert_eq!(
            percent(Amount::MAX, &factor("100.0000001")),
            Err(AmountError::Overflow)
        );
    }

    #[test]
    fn malformed_factors_rejected() {
        for bad in ["", ".", "-1", "1.2.3", "1e5", "abc", "NaN"] {
            assert!(bad.parse::<DecimalFactor>().is_err(), "{bad:?} should be rejected");
        }
        assert!("9".repeat(MAX_DIGITS + 1).parse::<DecimalFactor>().is_err());
    }

    #[test]
    fn factors_read_from_toml_numbers_and_strings() {
        #[derive(Deserialize)]
        struct Weights {
            a: DecimalFactor,
            b: DecimalFactor,
            c: DecimalFactor,
        }
        let weights: Weights = toml::from_str("a = 12.5\nb = \"33.3333\"\nc = 40").unwrap();
        assert_eq!(percent(Amount::raw(1000), &weights.a).unwrap(), Amount::raw(125));
        assert_eq!(weights.b.to_string(), "33.3333");
        assert_eq!(percent(Amount::raw(1000), &weights.c).unwrap(), Amount::raw(400));
    }
}
