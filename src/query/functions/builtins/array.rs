use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{EvaluateFn, FunctionContext, FunctionDefinition, ScalarFunction, ValidateArgsFn, default_format};
use crate::query::value::{ArrayValue, Value};

use super::{array_arg, expect_array, expect_count, scalar_with_format};

pub(super) fn definitions() -> Vec<(&'static str, FunctionDefinition)> {
    vec![
        ("array_append", element_function(validate_append, array_append)),
        ("array_prepend", element_function(validate_prepend, array_prepend)),
        ("array_cat", scalar_with_format(validate_cat, array_cat, default_format)),
        ("array_length", scalar_with_format(validate_length, array_length, format_length)),
    ]
}

/// Appending or prepending a NULL element is allowed
fn element_function(validate_args: ValidateArgsFn, evaluate: EvaluateFn) -> FunctionDefinition {
    FunctionDefinition::Scalar(ScalarFunction {
        validate_args,
        pg_format: default_format,
        evaluate,
        null_on_null_input: false,
    })
}

fn check_element(array: &DataType, element: &DataType) -> InterpreterResult<DataType> {
    if array.is_untyped_null() {
        return element.as_array();
    }
    let element_type = array.element_type().ok_or_else(|| {
        InterpreterError::TypeError(format!("expected an array, got {}", array))
    })?;
    if !element.accepts(&element_type) {
        return Err(InterpreterError::TypeError(format!(
            "cannot add {} to {}",
            element, array
        )));
    }
    Ok(*array)
}

fn validate_append(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_array(args, 0)?;
    check_element(&args[0], &args[1])
}

fn validate_prepend(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_array(args, 1)?;
    check_element(&args[1], &args[0])
}

fn validate_cat(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_array(args, 0)?;
    expect_array(args, 1)?;
    if args[0].is_untyped_null() {
        return Ok(args[1]);
    }
    if !args[1].accepts(&args[0]) {
        return Err(InterpreterError::TypeError(format!(
            "cannot concatenate {} and {}",
            args[0], args[1]
        )));
    }
    Ok(args[0])
}

fn validate_length(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 1)?;
    expect_array(args, 0)?;
    Ok(DataType::INT)
}

/// Start from the given array, or from an empty one when it is NULL
fn base_array(array: &Value, element: &Value) -> InterpreterResult<ArrayValue> {
    match array {
        Value::Array(a) => Ok(a.clone()),
        Value::Null(t) => {
            let element_type = t.element_type().unwrap_or_else(|| element.data_type());
            ArrayValue::empty(element_type)
        }
        other => Err(super::wrong_value(0, "an array", other)),
    }
}

fn array_append(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let mut array = base_array(&args[0], &args[1])?;
    array.push(args[1].clone())?;
    Ok(Value::Array(array))
}

fn array_prepend(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let mut array = base_array(&args[1], &args[0])?;
    array.prepend(args[0].clone())?;
    Ok(Value::Array(array))
}

fn array_cat(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let mut left = array_arg(args, 0)?.clone();
    left.extend(array_arg(args, 1)?)?;
    Ok(Value::Array(left))
}

fn array_length(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    Ok(Value::Int(array_arg(args, 0)?.len() as i64))
}

fn format_length(_: &str, inputs: &[String]) -> InterpreterResult<String> {
    match inputs {
        [array] => Ok(format!("array_length({}, 1)", array)),
        _ => Err(InterpreterError::FunctionError(format!(
            "array_length expects 1 argument, got {}",
            inputs.len()
        ))),
    }
}
