use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{FunctionContext, FunctionDefinition};
use crate::query::value::Value;

use super::{expect_count, scalar};

pub(super) fn definitions() -> Vec<(&'static str, FunctionDefinition)> {
    vec![("abs", scalar(validate_abs, abs))]
}

fn validate_abs(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 1)?;
    if !args[0].is_numeric() && !args[0].is_untyped_null() {
        return Err(InterpreterError::TypeError(format!(
            "argument 1 must be int or decimal, got {}",
            args[0]
        )));
    }
    Ok(args[0])
}

fn abs(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    match &args[0] {
        Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(InterpreterError::NumericOverflow),
        Value::Decimal(d) => Ok(Value::Decimal(d.abs()?)),
        other => Err(super::wrong_value(0, "int or decimal", other)),
    }
}
