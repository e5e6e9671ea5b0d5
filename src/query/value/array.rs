// Array Values
//
// One dimensional, 1-indexed arrays of a single scalar element type.
// NULL elements are stored as typed nulls of the element type.

use serde::{Deserialize, Serialize};

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::value::Value;
use crate::query::value::ops::ComparisonOp;

/// Longest array an element write may grow to
pub const MAX_ARRAY_LENGTH: usize = 1 << 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayValue {
    element_type: DataType,
    elements: Vec<Value>,
}

impl ArrayValue {
    /// Create an array, checking every element against the element type
    pub fn new(element_type: DataType, elements: Vec<Value>) -> InterpreterResult<Self> {
        let mut array = Self::empty(element_type)?;
        for element in elements {
            array.push(element)?;
        }
        Ok(array)
    }

    pub fn empty(element_type: DataType) -> InterpreterResult<Self> {
        element_type.as_array()?;
        Ok(Self {
            element_type,
            elements: Vec::new(),
        })
    }

    pub fn element_type(&self) -> DataType {
        self.element_type
    }

    /// The array type, e.g. `int[]`
    pub fn data_type(&self) -> DataType {
        DataType::array(self.element_type.scalar)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn into_elements(self) -> Vec<Value> {
        self.elements
    }

    /// Read the element at a 1-based index
    pub fn index(&self, index: i64) -> InterpreterResult<Value> {
        if index < 1 || index as u64 > self.elements.len() as u64 {
            return Err(InterpreterError::IndexOutOfBounds {
                index,
                length: self.elements.len(),
            });
        }
        Ok(self.elements[(index - 1) as usize].clone())
    }

    /// Elements from `start` to `end` inclusive (1-based). Bounds are clamped to
    /// the array; a missing bound means the array's own start or end.
    pub fn slice(&self, start: Option<i64>, end: Option<i64>) -> ArrayValue {
        let length = self.elements.len() as i64;
        let start = start.unwrap_or(1).max(1);
        let end = end.unwrap_or(length).min(length);
        let elements = if start > end {
            Vec::new()
        } else {
            self.elements[(start - 1) as usize..end as usize].to_vec()
        };
        ArrayValue {
            element_type: self.element_type,
            elements,
        }
    }

    /// Write the element at a 1-based index.
    /// Writing past the end grows the array, filling the gap with nulls.
    pub fn set(&mut self, index: i64, value: Value) -> InterpreterResult<()> {
        if index < 1 {
            return Err(InterpreterError::IndexOutOfBounds {
                index,
                length: self.elements.len(),
            });
        }
        check_growth(index)?;
        let value = self.coerce(value)?;
        let position = (index - 1) as usize;
        if position >= self.elements.len() {
            self.elements
                .try_reserve(position + 1 - self.elements.len())
                .map_err(|_| InterpreterError::ArrayTooLarge {
                    length: index,
                    max: MAX_ARRAY_LENGTH,
                })?;
            self.elements.resize(position + 1, Value::Null(self.element_type));
        }
        self.elements[position] = value;
        Ok(())
    }

    pub fn push(&mut self, value: Value) -> InterpreterResult<()> {
        check_growth(self.elements.len() as i64 + 1)?;
        let value = self.coerce(value)?;
        self.elements.push(value);
        Ok(())
    }

    pub fn prepend(&mut self, value: Value) -> InterpreterResult<()> {
        check_growth(self.elements.len() as i64 + 1)?;
        let value = self.coerce(value)?;
        self.elements.insert(0, value);
        Ok(())
    }

    pub fn extend(&mut self, other: &ArrayValue) -> InterpreterResult<()> {
        for element in &other.elements {
            self.push(element.clone())?;
        }
        Ok(())
    }

    /// Element-wise comparison. Arrays must share element type and length.
    pub fn compare(&self, other: &ArrayValue, op: ComparisonOp) -> InterpreterResult<Value> {
        if !self.element_type.equals_strict(&other.element_type) {
            return Err(InterpreterError::TypeMismatch {
                left: self.data_type(),
                right: other.data_type(),
            });
        }
        if op == ComparisonOp::Is {
            return Err(InterpreterError::TypeError("cannot use IS with arrays".to_string()));
        }
        if self.len() != other.len() {
            return match op {
                ComparisonOp::IsDistinctFrom => Ok(Value::Bool(true)),
                ComparisonOp::Equal => Ok(Value::Bool(false)),
                _ => Err(InterpreterError::TypeError(format!(
                    "cannot order arrays of different lengths ({} and {})",
                    self.len(),
                    other.len()
                ))),
            };
        }

        let mut saw_null = false;
        for (left, right) in self.elements.iter().zip(other.elements.iter()) {
            match left.compare(right, op)? {
                Value::Bool(true) if op == ComparisonOp::IsDistinctFrom => return Ok(Value::Bool(true)),
                Value::Bool(false) if op != ComparisonOp::IsDistinctFrom => return Ok(Value::Bool(false)),
                Value::Null(_) => saw_null = true,
                _ => {}
            }
        }

        if saw_null {
            Ok(Value::Null(DataType::BOOL))
        } else {
            Ok(Value::Bool(op != ComparisonOp::IsDistinctFrom))
        }
    }

    fn coerce(&self, value: Value) -> InterpreterResult<Value> {
        match value {
            Value::Null(_) => Ok(Value::Null(self.element_type)),
            other if other.data_type().equals_strict(&self.element_type) => Ok(other),
            other => Err(InterpreterError::TypeError(format!(
                "cannot store {} in {}",
                other.data_type(),
                self.data_type()
            ))),
        }
    }
}

/// Reject lengths past `MAX_ARRAY_LENGTH`
pub(crate) fn check_growth(length: i64) -> InterpreterResult<()> {
    if length > MAX_ARRAY_LENGTH as i64 {
        return Err(InterpreterError::ArrayTooLarge {
            length,
            max: MAX_ARRAY_LENGTH,
        });
    }
    Ok(())
}
