// Type Casts
//
// Explicit conversions applied by `expr::type` casts. A NULL casts to a NULL of
// the target type; arrays cast element by element to the target's element type.

use uuid::Uuid;

use crate::common::types::{DataType, ScalarType};
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::value::{ArrayValue, Decimal, Value};

impl Value {
    /// Convert this value to `target`
    pub fn cast(&self, target: &DataType) -> InterpreterResult<Value> {
        if target.is_untyped_null() || target.scalar == ScalarType::Record {
            return Err(cannot_cast(self, target));
        }
        match self {
            Value::Null(_) => Ok(Value::Null(*target)),
            Value::Array(array) => {
                let element_type = target.element_type().ok_or_else(|| cannot_cast(self, target))?;
                let elements = array
                    .elements()
                    .iter()
                    .map(|element| element.cast(&element_type))
                    .collect::<InterpreterResult<Vec<_>>>()?;
                Ok(Value::Array(ArrayValue::new(element_type, elements)?))
            }
            _ if target.is_array => Err(cannot_cast(self, target)),
            Value::Record(_) => Err(cannot_cast(self, target)),
            scalar => cast_scalar(scalar, target),
        }
    }
}

fn cast_scalar(value: &Value, target: &DataType) -> InterpreterResult<Value> {
    match (value, target.scalar) {
        (Value::Int(i), ScalarType::Decimal { precision, scale }) => {
            Ok(Value::Decimal(Decimal::from_i64(*i, precision, scale).map_err(cast_failed)?))
        }
        (Value::Int(i), ScalarType::Int) => Ok(Value::Int(*i)),
        (Value::Int(i), ScalarType::Text) => Ok(Value::Text(i.to_string())),
        (Value::Int(i), ScalarType::Bool) => Ok(Value::Bool(*i != 0)),

        (Value::Text(s), ScalarType::Decimal { precision, scale }) => {
            Ok(Value::Decimal(Decimal::parse_with(s, precision, scale).map_err(cast_failed)?))
        }
        (Value::Text(s), ScalarType::Int) => s
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| InterpreterError::CastError(format!("invalid int '{}': {}", s, e))),
        (Value::Text(s), ScalarType::Text) => Ok(Value::Text(s.clone())),
        (Value::Text(s), ScalarType::Bool) => parse_bool(s).map(Value::Bool),
        (Value::Text(s), ScalarType::Uuid) => Uuid::parse_str(s.trim())
            .map(Value::Uuid)
            .map_err(|e| InterpreterError::CastError(format!("invalid uuid '{}': {}", s, e))),
        (Value::Text(s), ScalarType::Blob) => Ok(Value::Blob(s.as_bytes().to_vec())),

        (Value::Bool(b), ScalarType::Int) => Ok(Value::Int(i64::from(*b))),
        (Value::Bool(b), ScalarType::Text) => Ok(Value::Text(b.to_string())),
        (Value::Bool(b), ScalarType::Bool) => Ok(Value::Bool(*b)),

        (Value::Blob(bytes), ScalarType::Int) => {
            let text = blob_text(bytes)?;
            text.trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|e| InterpreterError::CastError(format!("invalid int '{}': {}", text, e)))
        }
        (Value::Blob(bytes), ScalarType::Text) => Ok(Value::Text(blob_text(bytes)?.to_string())),
        (Value::Blob(bytes), ScalarType::Blob) => Ok(Value::Blob(bytes.clone())),

        (Value::Uuid(u), ScalarType::Text) => Ok(Value::Text(u.to_string())),
        (Value::Uuid(u), ScalarType::Blob) => Ok(Value::Blob(u.as_bytes().to_vec())),
        (Value::Uuid(u), ScalarType::Uuid) => Ok(Value::Uuid(*u)),

        (Value::Decimal(d), ScalarType::Decimal { precision, scale }) => Ok(Value::Decimal(
            Decimal::new(d.value().clone(), precision, scale).map_err(cast_failed)?,
        )),
        (Value::Decimal(d), ScalarType::Int) => {
            if d.value().with_scale(0) != *d.value() {
                return Err(InterpreterError::CastError(format!("{} is not a whole number", d)));
            }
            d.to_i64()
                .map(Value::Int)
                .ok_or_else(|| InterpreterError::CastError(format!("{} is out of range for int", d)))
        }
        (Value::Decimal(d), ScalarType::Text) => Ok(Value::Text(d.to_string())),

        _ => Err(cannot_cast(value, target)),
    }
}

/// Accepts the spellings `1`, `t`, `true` and `0`, `f`, `false` in any case
fn parse_bool(s: &str) -> InterpreterResult<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Ok(true),
        "0" | "f" | "false" => Ok(false),
        _ => Err(InterpreterError::CastError(format!("invalid bool '{}'", s))),
    }
}

fn blob_text(bytes: &[u8]) -> InterpreterResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| InterpreterError::CastError(format!("blob is not valid utf-8: {}", e)))
}

fn cast_failed(err: InterpreterError) -> InterpreterError {
    InterpreterError::CastError(err.to_string())
}

fn cannot_cast(value: &Value, target: &DataType) -> InterpreterError {
    InterpreterError::CastError(format!("cannot cast {} to {}", value.data_type(), target))
}
