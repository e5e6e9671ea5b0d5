// Record Values
//
// Ordered field maps produced by SQL loop terms.

use linked_hash_map::LinkedHashMap;
use serde::{Deserialize, Serialize};

use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::value::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordValue {
    fields: LinkedHashMap<String, Value>,
}

impl RecordValue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from ordered (name, value) pairs
    pub fn from_fields<I, S>(fields: I) -> InterpreterResult<Self>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut record = Self::new();
        for (name, value) in fields {
            record.insert(name, value)?;
        }
        Ok(record)
    }

    /// Append a field; field names are unique
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> InterpreterResult<()> {
        let name = name.into();
        if self.fields.contains_key(&name) {
            return Err(InterpreterError::ExecutionError(format!(
                "record field {} already exists",
                name
            )));
        }
        self.fields.insert(name, value);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn field(&self, name: &str) -> InterpreterResult<Value> {
        self.get(name)
            .cloned()
            .ok_or_else(|| InterpreterError::FieldNotFound(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.keys().map(|k| k.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Field values in declaration order
    pub fn into_values(self) -> Vec<Value> {
        self.fields.into_iter().map(|(_, v)| v).collect()
    }

    /// Records are equal when they hold the same fields, in the same order, with equal values
    pub fn equals(&self, other: &RecordValue) -> InterpreterResult<bool> {
        if self.fields.len() != other.fields.len() {
            return Ok(false);
        }
        for ((left_name, left), (right_name, right)) in self.fields.iter().zip(other.fields.iter()) {
            if left_name != right_name {
                return Ok(false);
            }
            if left.data_type() != right.data_type() && !(left.is_null() && right.is_null()) {
                return Ok(false);
            }
            let same = match left.compare(right, super::ops::ComparisonOp::IsDistinctFrom)? {
                Value::Bool(distinct) => !distinct,
                _ => false,
            };
            if !same {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
