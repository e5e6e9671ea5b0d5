// error() aborts the run with a message; notice() hands one back to the caller.

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{FunctionContext, FunctionDefinition, ScalarFunction};
use crate::query::value::Value;

use super::{expect_count, expect_type};

pub(super) fn definitions() -> Vec<(&'static str, FunctionDefinition)> {
    vec![
        (
            "error",
            FunctionDefinition::Scalar(ScalarFunction {
                validate_args: validate_message,
                pg_format: format_error,
                evaluate: raise_error,
                null_on_null_input: false,
            }),
        ),
        (
            "notice",
            FunctionDefinition::Scalar(ScalarFunction {
                validate_args: validate_message,
                pg_format: format_notice,
                evaluate: raise_notice,
                null_on_null_input: false,
            }),
        ),
    ]
}

fn validate_message(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 1)?;
    expect_type(args, 0, DataType::TEXT)?;
    Ok(DataType::NULL)
}

fn message(args: &[Value]) -> String {
    match &args[0] {
        Value::Text(s) => s.clone(),
        other => other.to_string(),
    }
}

fn raise_error(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    Err(InterpreterError::Raised(message(args)))
}

fn raise_notice(ctx: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    ctx.notice(&message(args));
    Ok(Value::Null(DataType::NULL))
}

fn format_error(_: &str, inputs: &[String]) -> InterpreterResult<String> {
    Ok(format!("error({})", inputs.join(", ")))
}

fn format_notice(_: &str, inputs: &[String]) -> InterpreterResult<String> {
    match inputs {
        [message] => Ok(format!(
            "notice('txid:' || current_setting('ctx.txid') || ' ' || {})",
            message
        )),
        _ => Err(InterpreterError::FunctionError(format!(
            "notice expects 1 argument, got {}",
            inputs.len()
        ))),
    }
}

/// Split a log line raised by the SQL rendering of notice() into its
/// transaction id and message
pub fn parse_notice(log: &str) -> InterpreterResult<(String, String)> {
    let (_, after) = log.split_once("txid:").ok_or_else(|| {
        InterpreterError::FunctionError(format!("notice log does not contain txid prefix: {}", log))
    })?;
    let (txid, message) = after.split_once(' ').ok_or_else(|| {
        InterpreterError::FunctionError(format!("notice log does not separate txid and message: {}", log))
    })?;
    Ok((txid.to_string(), message.to_string()))
}
