// Fixed Point Decimal
//
// Arbitrary precision decimal carrying its declared precision and scale.
// Every arithmetic result is rounded half-up to the scale and checked against
// the precision, so identical inputs always produce identical outputs.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decimal {
    value: BigDecimal,
    precision: u16,
    scale: u16,
}

impl Decimal {
    /// Create a decimal with the given precision and scale.
    /// The value is rounded to the scale and must fit in the precision.
    pub fn new(value: BigDecimal, precision: u16, scale: u16) -> InterpreterResult<Self> {
        DataType::decimal(precision, scale)?;
        let value = value.with_scale_round(scale as i64, RoundingMode::HalfUp);
        let digits = digit_count(&value);
        if digits > precision as u64 {
            return Err(InterpreterError::DecimalError(format!(
                "value {} does not fit in decimal({},{})",
                value, precision, scale
            )));
        }
        Ok(Self {
            value,
            precision,
            scale,
        })
    }

    /// Parse a literal, inferring the smallest precision and scale that hold it
    pub fn parse(literal: &str) -> InterpreterResult<Self> {
        let value = BigDecimal::from_str(literal.trim()).map_err(|e| {
            InterpreterError::DecimalError(format!("invalid decimal literal '{}': {}", literal, e))
        })?;
        let (_, exponent) = value.as_bigint_and_exponent();
        let scale = exponent.max(0) as u64;
        let value = value.with_scale(scale as i64);
        let precision = digit_count(&value).max(scale).max(1);
        if precision > crate::common::types::MAX_DECIMAL_PRECISION as u64 {
            return Err(InterpreterError::DecimalError(format!(
                "literal '{}' exceeds the maximum precision",
                literal
            )));
        }
        Self::new(value, precision as u16, scale as u16)
    }

    /// Parse a literal into an explicit precision and scale
    pub fn parse_with(literal: &str, precision: u16, scale: u16) -> InterpreterResult<Self> {
        let value = BigDecimal::from_str(literal.trim()).map_err(|e| {
            InterpreterError::DecimalError(format!("invalid decimal literal '{}': {}", literal, e))
        })?;
        Self::new(value, precision, scale)
    }

    pub fn from_i64(value: i64, precision: u16, scale: u16) -> InterpreterResult<Self> {
        Self::new(BigDecimal::from(value), precision, scale)
    }

    pub fn precision(&self) -> u16 {
        self.precision
    }

    pub fn scale(&self) -> u16 {
        self.scale
    }

    pub fn value(&self) -> &BigDecimal {
        &self.value
    }

    pub fn data_type(&self) -> DataType {
        DataType::scalar(crate::common::types::ScalarType::Decimal {
            precision: self.precision,
            scale: self.scale,
        })
    }

    pub fn is_zero(&self) -> bool {
        self.value.is_zero()
    }

    /// Numeric ordering, independent of declared scale
    pub fn cmp_value(&self, other: &Decimal) -> Ordering {
        self.value.cmp(&other.value)
    }

    pub fn to_i64(&self) -> Option<i64> {
        self.value.to_i64()
    }

    pub fn add(&self, other: &Decimal) -> InterpreterResult<Decimal> {
        self.check_same_type(other)?;
        self.rescaled(&self.value + &other.value)
    }

    pub fn sub(&self, other: &Decimal) -> InterpreterResult<Decimal> {
        self.check_same_type(other)?;
        self.rescaled(&self.value - &other.value)
    }

    pub fn mul(&self, other: &Decimal) -> InterpreterResult<Decimal> {
        self.check_same_type(other)?;
        self.rescaled(&self.value * &other.value)
    }

    pub fn div(&self, other: &Decimal) -> InterpreterResult<Decimal> {
        self.check_same_type(other)?;
        if other.is_zero() {
            return Err(InterpreterError::DivisionByZero);
        }
        self.rescaled(&self.value / &other.value)
    }

    pub fn rem(&self, other: &Decimal) -> InterpreterResult<Decimal> {
        self.check_same_type(other)?;
        if other.is_zero() {
            return Err(InterpreterError::DivisionByZero);
        }
        self.rescaled(&self.value % &other.value)
    }

    pub fn neg(&self) -> InterpreterResult<Decimal> {
        self.rescaled(-self.value.clone())
    }

    pub fn abs(&self) -> InterpreterResult<Decimal> {
        self.rescaled(self.value.abs())
    }

    fn rescaled(&self, value: BigDecimal) -> InterpreterResult<Decimal> {
        Decimal::new(value, self.precision, self.scale)
    }

    fn check_same_type(&self, other: &Decimal) -> InterpreterResult<()> {
        if self.precision != other.precision || self.scale != other.scale {
            return Err(InterpreterError::TypeMismatch {
                left: self.data_type(),
                right: other.data_type(),
            });
        }
        Ok(())
    }
}

/// Number of significant integer digits in the unscaled representation
fn digit_count(value: &BigDecimal) -> u64 {
    let (digits, _) = value.as_bigint_and_exponent();
    let text = digits.to_string();
    text.trim_start_matches('-').len() as u64
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
