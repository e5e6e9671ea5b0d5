// Interpreter Result Implementation
//
// This module defines the error type shared by every interpreter layer and the
// named rows a procedure run hands back to its caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::types::DataType;
use crate::query::value::Value;

/// Represents an interpreter error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InterpreterError {
    /// Wrong number of arguments passed to a procedure
    #[error("Expected {expected} arguments, got {got}")]
    ArgumentCount { expected: usize, got: usize },
    /// Argument does not strictly match its declared parameter type
    #[error("Argument {position} ({name}): expected {expected}, got {got}")]
    ArgumentType {
        position: usize,
        name: String,
        expected: DataType,
        got: DataType,
    },
    #[error("Variable not found: {0}")]
    VariableNotFound(String),
    #[error("Variable already declared: {0}")]
    VariableAlreadyDeclared(String),
    #[error("Index {index} out of bounds for array of length {length}")]
    IndexOutOfBounds { index: i64, length: usize },
    /// Writing the element would grow the array past its length limit
    #[error("Array length {length} exceeds the maximum of {max}")]
    ArrayTooLarge { length: i64, max: usize },
    #[error("Field not found: {0}")]
    FieldNotFound(String),
    /// Operands of a binary operation disagree on type
    #[error("Type mismatch: {left} and {right}")]
    TypeMismatch { left: DataType, right: DataType },
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Numeric overflow")]
    NumericOverflow,
    #[error("Division by zero")]
    DivisionByZero,
    /// A value cannot be converted to the requested type
    #[error("Cast error: {0}")]
    CastError(String),
    #[error("Decimal error: {0}")]
    DecimalError(String),
    /// The cost meter ran out
    #[error("Cost limit exceeded")]
    CostExceeded,
    /// Procedure produced rows it did not declare
    #[error("Procedure returned a value it does not declare")]
    UnexpectedReturn,
    /// Procedure declared a return but produced no row
    #[error("Procedure did not return a value")]
    MissingReturn,
    /// Returned row does not match the declared return fields
    #[error("Return shape mismatch: {0}")]
    ReturnShape(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Aggregate function {0} cannot be called inside a procedure")]
    AggregateInProcedure(String),
    #[error("Function already registered: {0}")]
    DuplicateFunction(String),
    /// Built-in argument validation failed
    #[error("Invalid arguments to {name}: {reason}")]
    FunctionArguments { name: String, reason: String },
    #[error("Function error: {0}")]
    FunctionError(String),
    /// Raised by the error() built-in
    #[error("{0}")]
    Raised(String),
    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),
    #[error("Maximum call depth of {0} exceeded")]
    CallDepthExceeded(usize),
    #[error("SQL execution is not available")]
    SqlUnavailable,
    #[error("SQL error: {0}")]
    SqlError(String),
    #[error("Execution cancelled")]
    Cancelled,
    #[error("Planning error: {0}")]
    PlanningError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
}

impl From<bincode::Error> for InterpreterError {
    fn from(err: bincode::Error) -> Self {
        InterpreterError::ExecutionError(format!("Serialization error: {}", err))
    }
}

impl From<hex::FromHexError> for InterpreterError {
    fn from(err: hex::FromHexError) -> Self {
        InterpreterError::FunctionError(format!("Invalid hex input: {}", err))
    }
}

impl From<base64::DecodeError> for InterpreterError {
    fn from(err: base64::DecodeError) -> Self {
        InterpreterError::FunctionError(format!("Invalid base64 input: {}", err))
    }
}

impl From<chrono::ParseError> for InterpreterError {
    fn from(err: chrono::ParseError) -> Self {
        InterpreterError::FunctionError(format!("Invalid timestamp: {}", err))
    }
}

/// Result type for interpreter operations
pub type InterpreterResult<T> = Result<T, InterpreterError>;

/// A returned value paired with its declared field name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedValue {
    pub name: String,
    pub value: Value,
}

impl NamedValue {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Outcome of a complete procedure run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcedureRunResult {
    /// Total cost spent, never above the budget
    pub cost_spent: i64,
    /// Returned rows, each in declared field order
    pub rows: Vec<Vec<NamedValue>>,
    /// Messages raised through notice()
    pub notices: Vec<String>,
}

impl ProcedureRunResult {
    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Look up a named field in a row
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.rows
            .get(row)?
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }

    /// Format the rows as a string table
    pub fn to_string_table(&self) -> String {
        let columns: Vec<&str> = match self.rows.first() {
            Some(row) => row.iter().map(|field| field.name.as_str()).collect(),
            None => return "Empty result".to_string(),
        };

        let mut result = String::new();

        result.push_str("| ");
        for col in &columns {
            result.push_str(&format!("{} | ", col));
        }
        result.push('\n');

        result.push('|');
        for col in &columns {
            result.push_str(&format!("{}|", "-".repeat(col.len() + 2)));
        }
        result.push('\n');

        for row in &self.rows {
            result.push_str("| ");
            for field in row {
                result.push_str(&format!("{} | ", field.value));
            }
            result.push('\n');
        }

        result
    }
}
