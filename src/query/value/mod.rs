// Value Model
//
// Runtime values manipulated by procedures. Every value knows its data type,
// including NULL, which carries the type it stands in for.

pub mod array;
pub mod cast;
pub mod decimal;
pub mod ops;
pub mod record;

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::types::{DataType, ScalarType};
use crate::query::executor::result::{InterpreterError, InterpreterResult};

pub use self::array::ArrayValue;
pub use self::decimal::Decimal;
pub use self::ops::{ArithmeticOp, ComparisonOp, UnaryOp};
pub use self::record::RecordValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Text(String),
    Bool(bool),
    Decimal(Decimal),
    Blob(Vec<u8>),
    Uuid(Uuid),
    Array(ArrayValue),
    Record(RecordValue),
    /// NULL of the given type
    Null(DataType),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Int(_) => DataType::INT,
            Value::Text(_) => DataType::TEXT,
            Value::Bool(_) => DataType::BOOL,
            Value::Decimal(d) => d.data_type(),
            Value::Blob(_) => DataType::BLOB,
            Value::Uuid(_) => DataType::UUID,
            Value::Array(a) => a.data_type(),
            Value::Record(_) => DataType::RECORD,
            Value::Null(t) => *t,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null(_))
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayValue> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordValue> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Size of the serialized value, used for per-byte cost surcharges
    pub fn serialized_size(&self) -> InterpreterResult<u64> {
        Ok(bincode::serialized_size(self)?)
    }

    /// Build an array from element values. The element type comes from the
    /// first non-null element, or from the first element if all are null.
    pub fn make_array(values: Vec<Value>) -> InterpreterResult<Value> {
        let element_type = values
            .iter()
            .find(|v| !v.is_null())
            .or_else(|| values.first())
            .map(|v| v.data_type())
            .ok_or_else(|| InterpreterError::TypeError("cannot create an empty array literal".to_string()))?;
        if matches!(
            element_type.scalar,
            ScalarType::Null | ScalarType::Record
        ) || element_type.is_array
        {
            return Err(InterpreterError::TypeError(format!(
                "cannot create an array of {}",
                element_type
            )));
        }
        Ok(Value::Array(ArrayValue::new(element_type, values)?))
    }

    /// Compare two values. NULL operands yield NULL except for IS and IS DISTINCT FROM.
    pub fn compare(&self, other: &Value, op: ComparisonOp) -> InterpreterResult<Value> {
        match (self, other) {
            (Value::Null(_), Value::Null(_)) => Ok(match op {
                ComparisonOp::Is => Value::Bool(true),
                ComparisonOp::IsDistinctFrom => Value::Bool(false),
                _ => Value::Null(DataType::BOOL),
            }),
            (Value::Null(_), _) | (_, Value::Null(_)) => Ok(match op {
                ComparisonOp::Is => Value::Bool(false),
                ComparisonOp::IsDistinctFrom => Value::Bool(true),
                _ => Value::Null(DataType::BOOL),
            }),
            (Value::Int(a), Value::Int(b)) => ordered(self, a.cmp(b), op),
            (Value::Text(a), Value::Text(b)) => ordered(self, a.cmp(b), op),
            (Value::Decimal(a), Value::Decimal(b)) => ordered(self, a.cmp_value(b), op),
            (Value::Bool(a), Value::Bool(b)) => match op {
                ComparisonOp::Equal | ComparisonOp::Is => Ok(Value::Bool(a == b)),
                ComparisonOp::IsDistinctFrom => Ok(Value::Bool(a != b)),
                _ => Err(unsupported_comparison(self, op)),
            },
            (Value::Blob(a), Value::Blob(b)) => equality_only(self, a == b, op),
            (Value::Uuid(a), Value::Uuid(b)) => equality_only(self, a == b, op),
            (Value::Array(a), Value::Array(b)) => a.compare(b, op),
            (Value::Record(a), Value::Record(b)) => {
                let equal = a.equals(b)?;
                equality_only(self, equal, op)
            }
            _ => Err(InterpreterError::TypeMismatch {
                left: self.data_type(),
                right: other.data_type(),
            }),
        }
    }

    /// Binary arithmetic. Operands must share a type; a NULL operand yields NULL.
    pub fn arithmetic(&self, other: &Value, op: ArithmeticOp) -> InterpreterResult<Value> {
        match (self, other) {
            (Value::Null(t), _) if !t.is_untyped_null() => Ok(Value::Null(*t)),
            (Value::Null(_), right) => Ok(Value::Null(right.data_type())),
            (left, Value::Null(_)) => Ok(Value::Null(left.data_type())),
            (Value::Int(a), Value::Int(b)) => int_arithmetic(*a, *b, op).map(Value::Int),
            (Value::Decimal(a), Value::Decimal(b)) => {
                let result = match op {
                    ArithmeticOp::Add => a.add(b)?,
                    ArithmeticOp::Sub => a.sub(b)?,
                    ArithmeticOp::Mul => a.mul(b)?,
                    ArithmeticOp::Div => a.div(b)?,
                    ArithmeticOp::Mod => a.rem(b)?,
                    ArithmeticOp::Concat => return Err(unsupported_arithmetic(self, op)),
                };
                Ok(Value::Decimal(result))
            }
            (Value::Text(a), Value::Text(b)) => match op {
                ArithmeticOp::Concat => Ok(Value::Text(format!("{}{}", a, b))),
                _ => Err(unsupported_arithmetic(self, op)),
            },
            _ if self.data_type() == other.data_type() => Err(unsupported_arithmetic(self, op)),
            _ => Err(InterpreterError::TypeMismatch {
                left: self.data_type(),
                right: other.data_type(),
            }),
        }
    }

    /// Unary operators. NULL stays NULL of the same type.
    pub fn unary(&self, op: UnaryOp) -> InterpreterResult<Value> {
        match (self, op) {
            (Value::Null(t), _) => Ok(Value::Null(*t)),
            (Value::Int(i), UnaryOp::Neg) => i.checked_neg().map(Value::Int).ok_or(InterpreterError::NumericOverflow),
            (Value::Int(i), UnaryOp::Pos) => Ok(Value::Int(*i)),
            (Value::Decimal(d), UnaryOp::Neg) => Ok(Value::Decimal(d.neg()?)),
            (Value::Decimal(d), UnaryOp::Pos) => Ok(Value::Decimal(d.clone())),
            (Value::Bool(b), UnaryOp::Not) => Ok(Value::Bool(!b)),
            _ => Err(InterpreterError::TypeError(format!(
                "cannot apply {} to {}",
                op,
                self.data_type()
            ))),
        }
    }
}

fn ordered(left: &Value, ordering: Ordering, op: ComparisonOp) -> InterpreterResult<Value> {
    match op {
        ComparisonOp::Equal => Ok(Value::Bool(ordering == Ordering::Equal)),
        ComparisonOp::LessThan => Ok(Value::Bool(ordering == Ordering::Less)),
        ComparisonOp::GreaterThan => Ok(Value::Bool(ordering == Ordering::Greater)),
        ComparisonOp::IsDistinctFrom => Ok(Value::Bool(ordering != Ordering::Equal)),
        ComparisonOp::Is => Err(unsupported_comparison(left, op)),
    }
}

fn equality_only(left: &Value, equal: bool, op: ComparisonOp) -> InterpreterResult<Value> {
    match op {
        ComparisonOp::Equal => Ok(Value::Bool(equal)),
        ComparisonOp::IsDistinctFrom => Ok(Value::Bool(!equal)),
        _ => Err(unsupported_comparison(left, op)),
    }
}

fn int_arithmetic(a: i64, b: i64, op: ArithmeticOp) -> InterpreterResult<i64> {
    match op {
        ArithmeticOp::Add => a.checked_add(b).ok_or(InterpreterError::NumericOverflow),
        ArithmeticOp::Sub => a.checked_sub(b).ok_or(InterpreterError::NumericOverflow),
        ArithmeticOp::Mul => a.checked_mul(b).ok_or(InterpreterError::NumericOverflow),
        ArithmeticOp::Div => {
            if b == 0 {
                return Err(InterpreterError::DivisionByZero);
            }
            a.checked_div(b).ok_or(InterpreterError::NumericOverflow)
        }
        ArithmeticOp::Mod => {
            if b == 0 {
                return Err(InterpreterError::DivisionByZero);
            }
            a.checked_rem(b).ok_or(InterpreterError::NumericOverflow)
        }
        ArithmeticOp::Concat => Err(InterpreterError::TypeError("cannot concatenate int".to_string())),
    }
}

fn unsupported_comparison(left: &Value, op: ComparisonOp) -> InterpreterError {
    InterpreterError::TypeError(format!("cannot use {} with {}", op, left.data_type()))
}

fn unsupported_arithmetic(left: &Value, op: ArithmeticOp) -> InterpreterError {
    InterpreterError::TypeError(format!("cannot apply {} to {}", op, left.data_type()))
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Text(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Blob(b) => write!(f, "\\x{}", hex::encode(b)),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::Array(a) => {
                write!(f, "[")?;
                for (i, element) in a.elements().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Record(r) => {
                write!(f, "{{")?;
                for (i, (name, value)) in r.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                write!(f, "}}")
            }
            Value::Null(_) => write!(f, "NULL"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Blob(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Value::Uuid(value)
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<ArrayValue> for Value {
    fn from(value: ArrayValue) -> Self {
        Value::Array(value)
    }
}

impl From<RecordValue> for Value {
    fn from(value: RecordValue) -> Self {
        Value::Record(value)
    }
}
