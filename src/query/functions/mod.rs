// Function Registry
//
// Built-in scalar and aggregate functions, keyed by exact name. The registry
// is an explicit value handed to the interpreter, so embedders can extend it
// without touching global state.

pub mod aggregate;
pub mod builtins;

use std::collections::HashMap;

use log::debug;

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::value::Value;

/// Services a built-in may use while evaluating
pub trait FunctionContext {
    /// Charge additional cost on top of the call itself
    fn spend(&mut self, amount: i64) -> InterpreterResult<()>;

    /// Record a notice for the caller
    fn notice(&mut self, message: &str);
}

/// Check argument types and return the result type
pub type ValidateArgsFn = fn(&[DataType]) -> InterpreterResult<DataType>;

/// Render the function as Postgres SQL from already formatted inputs.
/// Receives the registered function name.
pub type FormatFn = fn(&str, &[String]) -> InterpreterResult<String>;

/// Render an aggregate as Postgres SQL
pub type AggregateFormatFn = fn(&[String], bool) -> InterpreterResult<String>;

/// Evaluate a scalar function
pub type EvaluateFn = fn(&mut dyn FunctionContext, &[Value]) -> InterpreterResult<Value>;

#[derive(Debug, Clone, Copy)]
pub struct ScalarFunction {
    pub validate_args: ValidateArgsFn,
    pub pg_format: FormatFn,
    pub evaluate: EvaluateFn,
    /// Return NULL without evaluating when any argument is NULL
    pub null_on_null_input: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct AggregateFunction {
    pub validate_args: ValidateArgsFn,
    pub pg_format: AggregateFormatFn,
}

#[derive(Debug, Clone, Copy)]
pub enum FunctionDefinition {
    Scalar(ScalarFunction),
    Aggregate(AggregateFunction),
}

impl FunctionDefinition {
    pub fn validate_args(&self, args: &[DataType]) -> InterpreterResult<DataType> {
        match self {
            FunctionDefinition::Scalar(f) => (f.validate_args)(args),
            FunctionDefinition::Aggregate(f) => (f.validate_args)(args),
        }
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, FunctionDefinition::Aggregate(_))
    }

    /// Render a call as Postgres SQL; DISTINCT applies only to aggregates
    pub fn pg_format(&self, name: &str, inputs: &[String], distinct: bool) -> InterpreterResult<String> {
        match self {
            FunctionDefinition::Scalar(f) => {
                if distinct {
                    return Err(InterpreterError::FunctionError(format!(
                        "DISTINCT is not allowed for scalar function {}",
                        name
                    )));
                }
                (f.pg_format)(name, inputs)
            }
            FunctionDefinition::Aggregate(f) => (f.pg_format)(inputs, distinct),
        }
    }
}

/// Catalog of callable functions
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDefinition>,
}

impl FunctionRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the full built-in catalog
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, definition) in builtins::definitions().into_iter().chain(aggregate::definitions()) {
            registry.functions.insert(name.to_string(), definition);
        }
        debug!("Function registry loaded with {} built-ins", registry.functions.len());
        registry
    }

    /// Add a function. Names are unique; there is no overloading.
    pub fn register(&mut self, name: &str, definition: FunctionDefinition) -> InterpreterResult<()> {
        if self.functions.contains_key(name) {
            return Err(InterpreterError::DuplicateFunction(name.to_string()));
        }
        self.functions.insert(name.to_string(), definition);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered names in sorted order
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Render `name(arg1, arg2, ...)`
pub fn default_format(name: &str, inputs: &[String]) -> InterpreterResult<String> {
    Ok(format!("{}({})", name, inputs.join(", ")))
}
