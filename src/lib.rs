// Kuneiform Procedure Interpreter

pub mod catalog;
pub mod common;
pub mod query;

// Re-export key items for convenient access
pub use catalog::{NamedType, Procedure, ProcedureReturn, Schema};
pub use common::types::{DataType, ScalarType};
pub use query::executor::cost::CostTable;
pub use query::executor::cursor::{CancelToken, Cursor};
pub use query::executor::engine::{Interpreter, InterpreterConfig};
pub use query::executor::result::{InterpreterError, InterpreterResult, NamedValue, ProcedureRunResult};
pub use query::executor::sql::SqlEngine;
pub use query::functions::FunctionRegistry;
pub use query::parser::ast::{Expression, Statement};
pub use query::value::Value;
