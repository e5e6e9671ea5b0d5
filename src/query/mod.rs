// Kuneiform Procedure Module
//
// This module contains the procedure syntax tree, the values it manipulates,
// built-in functions, the planner that compiles bodies and the executor that
// runs them.

pub mod executor;
pub mod functions;
pub mod parser;
pub mod planner;
pub mod value;

// Export key public interfaces
pub use executor::engine::Interpreter;
pub use executor::result::{InterpreterError, InterpreterResult, ProcedureRunResult};
pub use functions::FunctionRegistry;
pub use value::Value;
