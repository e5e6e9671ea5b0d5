// Common definitions shared across the interpreter

pub mod types;

pub use types::{DataType, ScalarType};
