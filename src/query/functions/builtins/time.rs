// Unix timestamp conversion. Timestamps are decimal(16,6) seconds, which keeps
// microsecond precision. Format strings use Postgres template patterns.

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{FunctionContext, FunctionDefinition};
use crate::query::value::{Decimal, Value};

use super::{decimal_arg, expect_count, expect_type, scalar, text_arg};

const TIMESTAMP_PRECISION: u16 = 16;
const TIMESTAMP_SCALE: u16 = 6;

/// Postgres template patterns and their chrono equivalents, longest first
const PATTERNS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("HH24", "%H"),
    ("HH12", "%I"),
    ("HH", "%I"),
    ("MI", "%M"),
    ("MS", "%3f"),
    ("US", "%6f"),
    ("SS", "%S"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("AM", "%p"),
    ("PM", "%p"),
    ("Mon", "%b"),
    ("Dy", "%a"),
    ("YY", "%y"),
];

pub(super) fn definitions() -> Vec<(&'static str, FunctionDefinition)> {
    vec![
        ("parse_unix_timestamp", scalar(validate_parse, parse_unix_timestamp)),
        ("format_unix_timestamp", scalar(validate_format, format_unix_timestamp)),
    ]
}

fn timestamp_type() -> InterpreterResult<DataType> {
    DataType::decimal(TIMESTAMP_PRECISION, TIMESTAMP_SCALE)
}

fn validate_parse(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_type(args, 0, DataType::TEXT)?;
    expect_type(args, 1, DataType::TEXT)?;
    timestamp_type()
}

fn validate_format(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_type(args, 0, timestamp_type()?)?;
    expect_type(args, 1, DataType::TEXT)?;
    Ok(DataType::TEXT)
}

/// Translate a Postgres template into a chrono format string
fn translate(template: &str) -> String {
    let mut output = String::new();
    let mut rest = template;
    'outer: while let Some(c) = rest.chars().next() {
        for (pattern, replacement) in PATTERNS {
            if let Some(remaining) = rest.strip_prefix(pattern) {
                output.push_str(replacement);
                rest = remaining;
                continue 'outer;
            }
        }
        if c == '%' {
            output.push_str("%%");
        } else {
            output.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }
    output
}

fn parse_micros(timestamp: &str, template: &str) -> InterpreterResult<i64> {
    let format = translate(template);
    let parsed = match NaiveDateTime::parse_from_str(timestamp, &format) {
        Ok(dt) => dt,
        Err(datetime_err) => match NaiveDate::parse_from_str(timestamp, &format) {
            Ok(date) => date.and_hms_opt(0, 0, 0).ok_or_else(|| {
                InterpreterError::FunctionError(format!("invalid date: {}", timestamp))
            })?,
            Err(_) => return Err(datetime_err.into()),
        },
    };
    Ok(parsed.and_utc().timestamp_micros())
}

fn format_micros(micros: i64, template: &str) -> InterpreterResult<String> {
    let datetime = DateTime::from_timestamp_micros(micros).ok_or_else(|| {
        InterpreterError::FunctionError(format!("timestamp out of range: {}", micros))
    })?;
    Ok(datetime.format(&translate(template)).to_string())
}

fn parse_unix_timestamp(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let micros = parse_micros(text_arg(args, 0)?, text_arg(args, 1)?)?;
    let seconds = BigDecimal::new(micros.into(), TIMESTAMP_SCALE as i64);
    Ok(Value::Decimal(Decimal::new(seconds, TIMESTAMP_PRECISION, TIMESTAMP_SCALE)?))
}

fn format_unix_timestamp(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let seconds = decimal_arg(args, 0)?;
    let micros = (seconds.value() * BigDecimal::from(1_000_000i64))
        .to_i64()
        .ok_or(InterpreterError::NumericOverflow)?;
    Ok(Value::Text(format_micros(micros, text_arg(args, 1)?)?))
}
