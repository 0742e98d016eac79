//! Deterministic fixed-point quantity backed by rust_decimal.
//!
//! Every value is truncated toward zero to [`Fixed::SCALE`] decimal places when it is
//! constructed. Arithmetic runs on the integer mantissa at that scale, so sums and differences
//! are exact and products and quotients are truncated toward zero exactly once. A result that
//! cannot keep all [`Fixed::SCALE`] fractional digits in a 96-bit mantissa (roughly 7.9e16) is
//! reported as an overflow, never wrapped or rounded.

use num_bigint::BigUint;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a fixed-point result is not representable (overflow or division by zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("fixed-point arithmetic overflow")]
pub struct ArithmeticOverflow;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseFixedError {
    #[error("invalid decimal: {0}")]
    Invalid(#[from] rust_decimal::Error),
    #[error("value must not be negative")]
    Negative,
}

/// Non-negative fixed-point quantity used for collateral, debt and the distribution ratio.
///
/// Serializes to a canonical decimal string so no precision is lost in JSON.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Fixed(Decimal);

/// A monetary quantity (collateral or debt).
pub type Amount = Fixed;

/// A unitless distribution ratio.
pub type Ratio = Fixed;

/// `10^SCALE`, the mantissa of one.
const UNIT: u128 = 1_000_000_000_000;

impl Fixed {
    /// Number of decimal places kept after every operation.
    pub const SCALE: u32 = 12;

    pub const ZERO: Fixed = Fixed(Decimal::ZERO);
    pub const ONE: Fixed = Fixed(Decimal::ONE);

    /// Build a value from a decimal, truncating excess precision.
    ///
    /// # Errors
    /// Returns [`ParseFixedError::Negative`] for values below zero.
    pub fn from_decimal(value: Decimal) -> Result<Self, ParseFixedError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(ParseFixedError::Negative);
        }
        Ok(Fixed(value.round_dp_with_strategy(
            Self::SCALE,
            RoundingStrategy::ToZero,
        )))
    }

    /// Parse a value from a string (plain decimal notation).
    pub fn from_str_canonical(s: &str) -> Result<Self, ParseFixedError> {
        let value = Decimal::from_str(s.trim())?;
        Self::from_decimal(value)
    }

    /// Format without exponent notation and without trailing zeros.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    /// Get the underlying decimal.
    pub fn inner(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        !self.0.is_zero()
    }

    pub fn checked_add(self, rhs: Fixed) -> Result<Fixed, ArithmeticOverflow> {
        let sum = self
            .scaled()?
            .checked_add(rhs.scaled()?)
            .ok_or(ArithmeticOverflow)?;
        Self::from_scaled(sum)
    }

    /// Subtract, returning `None` when the result would be negative.
    pub fn checked_sub(self, rhs: Fixed) -> Option<Fixed> {
        if rhs > self {
            return None;
        }
        self.0.checked_sub(rhs.0).map(Fixed)
    }

    /// Subtract, flooring at zero.
    pub fn saturating_sub(self, rhs: Fixed) -> Fixed {
        self.checked_sub(rhs).unwrap_or(Fixed::ZERO)
    }

    pub fn checked_mul(self, rhs: Fixed) -> Result<Fixed, ArithmeticOverflow> {
        let product = mul_div_floor(self.scaled()?, rhs.scaled()?, UNIT)?;
        Self::from_scaled(product)
    }

    /// Divide, truncating toward zero. Division by zero is an overflow.
    pub fn checked_div(self, rhs: Fixed) -> Result<Fixed, ArithmeticOverflow> {
        let quotient = mul_div_floor(self.scaled()?, UNIT, rhs.scaled()?)?;
        Self::from_scaled(quotient)
    }

    /// Compute `self * numerator / denominator` with a single truncation at the end.
    pub fn mul_div(self, numerator: Fixed, denominator: Fixed) -> Result<Fixed, ArithmeticOverflow> {
        let result = mul_div_floor(self.scaled()?, numerator.scaled()?, denominator.scaled()?)?;
        Self::from_scaled(result)
    }

    /// Mantissa at [`Fixed::SCALE`].
    fn scaled(self) -> Result<u128, ArithmeticOverflow> {
        let mantissa = u128::try_from(self.0.mantissa()).map_err(|_| ArithmeticOverflow)?;
        let shift = Self::SCALE
            .checked_sub(self.0.scale())
            .ok_or(ArithmeticOverflow)?;
        mantissa
            .checked_mul(10u128.pow(shift))
            .ok_or(ArithmeticOverflow)
    }

    fn from_scaled(mantissa: u128) -> Result<Fixed, ArithmeticOverflow> {
        let mantissa = i128::try_from(mantissa).map_err(|_| ArithmeticOverflow)?;
        Decimal::try_from_i128_with_scale(mantissa, Self::SCALE)
            .map(Fixed)
            .map_err(|_| ArithmeticOverflow)
    }
}

/// `floor(a * b / c)`, widening to a big integer when the product does not fit in 128 bits.
fn mul_div_floor(a: u128, b: u128, c: u128) -> Result<u128, ArithmeticOverflow> {
    if c == 0 {
        return Err(ArithmeticOverflow);
    }
    match a.checked_mul(b) {
        Some(product) => Ok(product / c),
        None => {
            let quotient = BigUint::from(a) * BigUint::from(b) / BigUint::from(c);
            u128::try_from(&quotient).map_err(|_| ArithmeticOverflow)
        }
    }
}

impl fmt::Display for Fixed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Fixed {
    type Err = ParseFixedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<u64> for Fixed {
    fn from(value: u64) -> Self {
        Fixed(Decimal::from(value))
    }
}

impl TryFrom<String> for Fixed {
    type Error = ParseFixedError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str_canonical(&value)
    }
}

impl From<Fixed> for String {
    fn from(value: Fixed) -> Self {
        value.to_canonical_string()
    }
}
