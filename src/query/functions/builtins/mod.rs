// Built-in Scalar Functions
//
// Each submodule contributes definitions for one family of functions, along
// with their argument validation and Postgres renderings.

mod array;
mod control;
mod encoding;
mod math;
mod string;
mod time;

pub use self::control::parse_notice;
pub use self::encoding::generate_dbid_from;

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{FunctionDefinition, ScalarFunction, ValidateArgsFn, EvaluateFn, FormatFn, default_format};
use crate::query::value::{ArrayValue, Decimal, Value};

/// All scalar built-ins
pub(crate) fn definitions() -> Vec<(&'static str, FunctionDefinition)> {
    let mut all = Vec::new();
    all.extend(math::definitions());
    all.extend(control::definitions());
    all.extend(string::definitions());
    all.extend(array::definitions());
    all.extend(encoding::definitions());
    all.extend(time::definitions());
    all
}

/// A null-propagating scalar rendered as a plain call
fn scalar(validate_args: ValidateArgsFn, evaluate: EvaluateFn) -> FunctionDefinition {
    FunctionDefinition::Scalar(ScalarFunction {
        validate_args,
        pg_format: default_format,
        evaluate,
        null_on_null_input: true,
    })
}

fn scalar_with_format(validate_args: ValidateArgsFn, evaluate: EvaluateFn, pg_format: FormatFn) -> FunctionDefinition {
    FunctionDefinition::Scalar(ScalarFunction {
        validate_args,
        pg_format,
        evaluate,
        null_on_null_input: true,
    })
}

fn expect_count(args: &[DataType], expected: usize) -> InterpreterResult<()> {
    if args.len() != expected {
        return Err(InterpreterError::TypeError(format!(
            "expected {} arguments, got {}",
            expected,
            args.len()
        )));
    }
    Ok(())
}

fn expect_count_between(args: &[DataType], min: usize, max: usize) -> InterpreterResult<()> {
    if args.len() < min || args.len() > max {
        return Err(InterpreterError::TypeError(format!(
            "expected {} to {} arguments, got {}",
            min,
            max,
            args.len()
        )));
    }
    Ok(())
}

fn expect_type(args: &[DataType], position: usize, expected: DataType) -> InterpreterResult<()> {
    let actual = &args[position];
    if !actual.accepts(&expected) {
        return Err(InterpreterError::TypeError(format!(
            "argument {} must be {}, got {}",
            position + 1,
            expected,
            actual
        )));
    }
    Ok(())
}

fn expect_array(args: &[DataType], position: usize) -> InterpreterResult<()> {
    let actual = &args[position];
    if !actual.is_array && !actual.is_untyped_null() {
        return Err(InterpreterError::TypeError(format!(
            "argument {} must be an array, got {}",
            position + 1,
            actual
        )));
    }
    Ok(())
}

fn wrong_value(position: usize, expected: &str, got: &Value) -> InterpreterError {
    InterpreterError::TypeError(format!(
        "argument {} must be {}, got {}",
        position + 1,
        expected,
        got.data_type()
    ))
}

fn text_arg(args: &[Value], position: usize) -> InterpreterResult<&str> {
    match args.get(position) {
        Some(Value::Text(s)) => Ok(s),
        Some(other) => Err(wrong_value(position, "text", other)),
        None => Err(missing(position)),
    }
}

fn int_arg(args: &[Value], position: usize) -> InterpreterResult<i64> {
    match args.get(position) {
        Some(Value::Int(i)) => Ok(*i),
        Some(other) => Err(wrong_value(position, "int", other)),
        None => Err(missing(position)),
    }
}

fn blob_arg(args: &[Value], position: usize) -> InterpreterResult<&[u8]> {
    match args.get(position) {
        Some(Value::Blob(b)) => Ok(b),
        Some(other) => Err(wrong_value(position, "blob", other)),
        None => Err(missing(position)),
    }
}

fn decimal_arg(args: &[Value], position: usize) -> InterpreterResult<&Decimal> {
    match args.get(position) {
        Some(Value::Decimal(d)) => Ok(d),
        Some(other) => Err(wrong_value(position, "decimal", other)),
        None => Err(missing(position)),
    }
}

fn array_arg(args: &[Value], position: usize) -> InterpreterResult<&ArrayValue> {
    match args.get(position) {
        Some(Value::Array(a)) => Ok(a),
        Some(other) => Err(wrong_value(position, "an array", other)),
        None => Err(missing(position)),
    }
}

fn missing(position: usize) -> InterpreterError {
    InterpreterError::TypeError(format!("missing argument {}", position + 1))
}
