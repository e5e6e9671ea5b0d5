// Aggregate Functions
//
// Aggregates are evaluated by the SQL engine, never by the interpreter. They
// live in the registry so callers can validate arguments and render SQL.

use crate::common::types::{DataType, MAX_DECIMAL_PRECISION};
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{AggregateFunction, AggregateFormatFn, FunctionDefinition, ValidateArgsFn};

pub(crate) fn definitions() -> Vec<(&'static str, FunctionDefinition)> {
    vec![
        ("count", aggregate(validate_count, format_count)),
        ("sum", aggregate(validate_sum, format_sum)),
        ("min", aggregate(validate_min_max, format_min)),
        ("max", aggregate(validate_min_max, format_max)),
    ]
}

fn aggregate(validate_args: ValidateArgsFn, pg_format: AggregateFormatFn) -> FunctionDefinition {
    FunctionDefinition::Aggregate(AggregateFunction {
        validate_args,
        pg_format,
    })
}

fn validate_count(args: &[DataType]) -> InterpreterResult<DataType> {
    if args.len() > 1 {
        return Err(InterpreterError::TypeError(format!(
            "expected at most 1 argument, got {}",
            args.len()
        )));
    }
    Ok(DataType::INT)
}

/// sum widens to the maximum decimal precision
fn validate_sum(args: &[DataType]) -> InterpreterResult<DataType> {
    let arg = single(args)?;
    if arg.is_untyped_null() {
        return Ok(DataType::NULL);
    }
    match arg.decimal_parts() {
        _ if *arg == DataType::INT => DataType::decimal(MAX_DECIMAL_PRECISION, 0),
        Some((_, scale)) if !arg.is_array => DataType::decimal(MAX_DECIMAL_PRECISION, scale),
        _ => Err(InterpreterError::TypeError(format!("expected a numeric argument, got {}", arg))),
    }
}

fn validate_min_max(args: &[DataType]) -> InterpreterResult<DataType> {
    let arg = single(args)?;
    if !arg.is_numeric() && !arg.accepts(&DataType::TEXT) {
        return Err(InterpreterError::TypeError(format!(
            "expected a numeric or text argument, got {}",
            arg
        )));
    }
    Ok(*arg)
}

fn single(args: &[DataType]) -> InterpreterResult<&DataType> {
    match args {
        [arg] => Ok(arg),
        _ => Err(InterpreterError::TypeError(format!("expected 1 argument, got {}", args.len()))),
    }
}

fn format_count(inputs: &[String], distinct: bool) -> InterpreterResult<String> {
    match (inputs, distinct) {
        ([], false) => Ok("count(*)".to_string()),
        ([], true) => Err(InterpreterError::FunctionError("count(DISTINCT *) is not supported".to_string())),
        ([input], true) => Ok(format!("count(DISTINCT {})", input)),
        ([input], false) => Ok(format!("count({})", input)),
        _ => Err(InterpreterError::FunctionError(format!(
            "count expects at most 1 argument, got {}",
            inputs.len()
        ))),
    }
}

fn format_single(name: &str, inputs: &[String], distinct: bool) -> InterpreterResult<String> {
    match inputs {
        [input] if distinct => Ok(format!("{}(DISTINCT {})", name, input)),
        [input] => Ok(format!("{}({})", name, input)),
        _ => Err(InterpreterError::FunctionError(format!(
            "{} expects 1 argument, got {}",
            name,
            inputs.len()
        ))),
    }
}

fn format_sum(inputs: &[String], distinct: bool) -> InterpreterResult<String> {
    format_single("sum", inputs, distinct)
}

fn format_min(inputs: &[String], distinct: bool) -> InterpreterResult<String> {
    format_single("min", inputs, distinct)
}

fn format_max(inputs: &[String], distinct: bool) -> InterpreterResult<String> {
    format_single("max", inputs, distinct)
}
