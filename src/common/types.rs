use std::fmt;

use serde::{Deserialize, Serialize};

use crate::query::executor::result::{InterpreterError, InterpreterResult};

/// Largest precision a decimal type may declare
pub const MAX_DECIMAL_PRECISION: u16 = 1000;

/// Scalar kinds a value may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Int,
    Text,
    Bool,
    Blob,
    Uuid,
    Decimal { precision: u16, scale: u16 },
    /// The type of an untyped NULL literal
    Null,
    /// Anonymous record produced by SQL loop terms
    Record,
}

impl ScalarType {
    fn name(&self) -> String {
        match self {
            ScalarType::Int => "int".to_string(),
            ScalarType::Text => "text".to_string(),
            ScalarType::Bool => "bool".to_string(),
            ScalarType::Blob => "blob".to_string(),
            ScalarType::Uuid => "uuid".to_string(),
            ScalarType::Decimal { precision, scale } => format!("decimal({},{})", precision, scale),
            ScalarType::Null => "null".to_string(),
            ScalarType::Record => "record".to_string(),
        }
    }
}

/// A scalar type, optionally lifted to a one dimensional array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataType {
    pub scalar: ScalarType,
    pub is_array: bool,
}

impl DataType {
    pub const INT: DataType = DataType::scalar(ScalarType::Int);
    pub const TEXT: DataType = DataType::scalar(ScalarType::Text);
    pub const BOOL: DataType = DataType::scalar(ScalarType::Bool);
    pub const BLOB: DataType = DataType::scalar(ScalarType::Blob);
    pub const UUID: DataType = DataType::scalar(ScalarType::Uuid);
    pub const NULL: DataType = DataType::scalar(ScalarType::Null);
    pub const RECORD: DataType = DataType::scalar(ScalarType::Record);

    pub const INT_ARRAY: DataType = DataType::array(ScalarType::Int);
    pub const TEXT_ARRAY: DataType = DataType::array(ScalarType::Text);
    pub const BOOL_ARRAY: DataType = DataType::array(ScalarType::Bool);
    pub const BLOB_ARRAY: DataType = DataType::array(ScalarType::Blob);
    pub const UUID_ARRAY: DataType = DataType::array(ScalarType::Uuid);

    pub const fn scalar(scalar: ScalarType) -> Self {
        Self { scalar, is_array: false }
    }

    pub const fn array(scalar: ScalarType) -> Self {
        Self { scalar, is_array: true }
    }

    /// Create a decimal type, rejecting precision outside 1..=1000 or a scale larger than the precision
    pub fn decimal(precision: u16, scale: u16) -> InterpreterResult<Self> {
        if precision == 0 || precision > MAX_DECIMAL_PRECISION {
            return Err(InterpreterError::DecimalError(format!(
                "precision must be between 1 and {}, got {}",
                MAX_DECIMAL_PRECISION, precision
            )));
        }
        if scale > precision {
            return Err(InterpreterError::DecimalError(format!(
                "scale {} cannot exceed precision {}",
                scale, precision
            )));
        }
        Ok(Self::scalar(ScalarType::Decimal { precision, scale }))
    }

    /// Strict equality: kind, array flag, and decimal parameters must all match
    pub fn equals_strict(&self, other: &DataType) -> bool {
        self == other
    }

    /// Whether an argument of this type may be passed where `expected` is declared.
    /// An untyped NULL is accepted anywhere.
    pub fn accepts(&self, expected: &DataType) -> bool {
        self.is_untyped_null() || self.equals_strict(expected)
    }

    pub fn is_untyped_null(&self) -> bool {
        self.scalar == ScalarType::Null && !self.is_array
    }

    pub fn is_numeric(&self) -> bool {
        !self.is_array && matches!(self.scalar, ScalarType::Int | ScalarType::Decimal { .. })
    }

    pub fn is_decimal(&self) -> bool {
        matches!(self.scalar, ScalarType::Decimal { .. })
    }

    /// The element type of an array type
    pub fn element_type(&self) -> Option<DataType> {
        if self.is_array {
            Some(DataType::scalar(self.scalar))
        } else {
            None
        }
    }

    /// Lift a scalar type to its array form
    pub fn as_array(&self) -> InterpreterResult<DataType> {
        if self.is_array {
            return Err(InterpreterError::TypeError(format!(
                "nested arrays are not supported: {}[]",
                self
            )));
        }
        if self.scalar == ScalarType::Record {
            return Err(InterpreterError::TypeError("arrays of records are not supported".to_string()));
        }
        Ok(DataType::array(self.scalar))
    }

    /// Decimal precision and scale, when this is a decimal type
    pub fn decimal_parts(&self) -> Option<(u16, u16)> {
        match self.scalar {
            ScalarType::Decimal { precision, scale } => Some((precision, scale)),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.scalar.name())?;
        if self.is_array {
            write!(f, "[]")?;
        }
        Ok(())
    }
}
