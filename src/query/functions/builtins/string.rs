// String functions. Lengths and positions count characters, not bytes,
// except for octet_length and bit_length.

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{FunctionContext, FunctionDefinition, ScalarFunction, default_format};
use crate::query::value::Value;

use super::{expect_count, expect_count_between, expect_type, int_arg, scalar, scalar_with_format, text_arg};

pub(super) fn definitions() -> Vec<(&'static str, FunctionDefinition)> {
    vec![
        ("bit_length", scalar(validate_text_to_int, bit_length)),
        ("char_length", scalar(validate_text_to_int, char_length)),
        ("character_length", scalar(validate_text_to_int, char_length)),
        ("length", scalar(validate_text_to_int, char_length)),
        ("octet_length", scalar(validate_text_to_int, octet_length)),
        ("lower", scalar(validate_text_to_text, lower)),
        ("upper", scalar(validate_text_to_text, upper)),
        ("lpad", scalar(validate_pad, lpad)),
        ("rpad", scalar(validate_pad, rpad)),
        ("ltrim", scalar(validate_trim, ltrim)),
        ("rtrim", scalar(validate_trim, rtrim)),
        ("trim", scalar(validate_trim, trim)),
        ("overlay", scalar_with_format(validate_overlay, overlay, format_overlay)),
        ("position", scalar_with_format(validate_position, position, format_position)),
        ("substring", scalar_with_format(validate_substring, substring, format_substring)),
        (
            "format",
            FunctionDefinition::Scalar(ScalarFunction {
                validate_args: validate_format,
                pg_format: default_format,
                evaluate: format,
                null_on_null_input: false,
            }),
        ),
    ]
}

fn validate_text_to_int(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 1)?;
    expect_type(args, 0, DataType::TEXT)?;
    Ok(DataType::INT)
}

fn validate_text_to_text(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 1)?;
    expect_type(args, 0, DataType::TEXT)?;
    Ok(DataType::TEXT)
}

fn validate_pad(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count_between(args, 2, 3)?;
    expect_type(args, 0, DataType::TEXT)?;
    expect_type(args, 1, DataType::INT)?;
    if args.len() == 3 {
        expect_type(args, 2, DataType::TEXT)?;
    }
    Ok(DataType::TEXT)
}

fn validate_trim(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count_between(args, 1, 2)?;
    for position in 0..args.len() {
        expect_type(args, position, DataType::TEXT)?;
    }
    Ok(DataType::TEXT)
}

fn validate_overlay(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count_between(args, 3, 4)?;
    expect_type(args, 0, DataType::TEXT)?;
    expect_type(args, 1, DataType::TEXT)?;
    expect_type(args, 2, DataType::INT)?;
    if args.len() == 4 {
        expect_type(args, 3, DataType::INT)?;
    }
    Ok(DataType::TEXT)
}

fn validate_position(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_type(args, 0, DataType::TEXT)?;
    expect_type(args, 1, DataType::TEXT)?;
    Ok(DataType::INT)
}

fn validate_substring(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count_between(args, 2, 3)?;
    expect_type(args, 0, DataType::TEXT)?;
    expect_type(args, 1, DataType::INT)?;
    if args.len() == 3 {
        expect_type(args, 2, DataType::INT)?;
    }
    Ok(DataType::TEXT)
}

fn validate_format(args: &[DataType]) -> InterpreterResult<DataType> {
    if args.is_empty() {
        return Err(InterpreterError::TypeError("expected at least 1 argument, got 0".to_string()));
    }
    expect_type(args, 0, DataType::TEXT)?;
    Ok(DataType::TEXT)
}

fn bit_length(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    Ok(Value::Int(text_arg(args, 0)?.len() as i64 * 8))
}

fn char_length(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    Ok(Value::Int(text_arg(args, 0)?.chars().count() as i64))
}

fn octet_length(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    Ok(Value::Int(text_arg(args, 0)?.len() as i64))
}

fn lower(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    Ok(Value::Text(text_arg(args, 0)?.to_lowercase()))
}

fn upper(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    Ok(Value::Text(text_arg(args, 0)?.to_uppercase()))
}

fn lpad(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    pad_with(args, true)
}

fn rpad(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    pad_with(args, false)
}

fn pad_with(args: &[Value], left: bool) -> InterpreterResult<Value> {
    let input = text_arg(args, 0)?;
    let length = int_arg(args, 1)?;
    let fill = if args.len() == 3 { text_arg(args, 2)? } else { " " };
    Ok(Value::Text(pad(input, length.max(0) as usize, fill, left)))
}

/// Pad to `length` characters, truncating inputs that are already longer
fn pad(input: &str, length: usize, fill: &str, left: bool) -> String {
    let input_length = input.chars().count();
    if input_length >= length {
        return input.chars().take(length).collect();
    }
    if fill.is_empty() {
        return input.to_string();
    }
    let padding: String = fill.chars().cycle().take(length - input_length).collect();
    if left {
        padding + input
    } else {
        format!("{}{}", input, padding)
    }
}

fn trim_chars(args: &[Value]) -> InterpreterResult<Vec<char>> {
    let chars = if args.len() == 2 { text_arg(args, 1)? } else { " " };
    Ok(chars.chars().collect())
}

fn ltrim(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let chars = trim_chars(args)?;
    Ok(Value::Text(text_arg(args, 0)?.trim_start_matches(chars.as_slice()).to_string()))
}

fn rtrim(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let chars = trim_chars(args)?;
    Ok(Value::Text(text_arg(args, 0)?.trim_end_matches(chars.as_slice()).to_string()))
}

fn trim(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let chars = trim_chars(args)?;
    Ok(Value::Text(text_arg(args, 0)?.trim_matches(chars.as_slice()).to_string()))
}

fn overlay(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let input: Vec<char> = text_arg(args, 0)?.chars().collect();
    let replacement = text_arg(args, 1)?;
    let start = int_arg(args, 2)?;
    if start < 0 {
        return Err(InterpreterError::FunctionError("negative substring length not allowed".to_string()));
    }
    let count = if args.len() == 4 {
        int_arg(args, 3)?
    } else {
        replacement.chars().count() as i64
    };

    let start_index = (start.max(1) - 1).min(input.len() as i64) as usize;
    let end_index = (start.max(1) - 1).saturating_add(count).clamp(start_index as i64, input.len() as i64) as usize;

    let mut result: String = input[..start_index].iter().collect();
    result.push_str(replacement);
    result.extend(input[end_index..].iter());
    Ok(Value::Text(result))
}

fn position(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let needle = text_arg(args, 0)?;
    let haystack = text_arg(args, 1)?;
    let result = match haystack.find(needle) {
        Some(byte_index) => haystack[..byte_index].chars().count() as i64 + 1,
        None => 0,
    };
    Ok(Value::Int(result))
}

fn substring(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let text: Vec<char> = text_arg(args, 0)?.chars().collect();
    let mut start = int_arg(args, 1)?;
    let mut length = if args.len() == 3 {
        int_arg(args, 2)?
    } else {
        text.len() as i64
    };
    if length < 0 {
        return Err(InterpreterError::FunctionError("negative substring length not allowed".to_string()));
    }
    if start > text.len() as i64 {
        return Ok(Value::Text(String::new()));
    }
    if start < 1 {
        length = length.saturating_sub(1i64.saturating_sub(start));
        start = 1;
    }
    let length = length.max(0);
    let begin = (start - 1) as usize;
    let end = (start - 1).saturating_add(length).min(text.len() as i64) as usize;
    Ok(Value::Text(text[begin..end].iter().collect()))
}

/// Postgres style format(): `%s` consumes the next argument, `%N$s` selects
/// argument N, and `%%` is a literal percent sign. NULL renders as empty.
fn format(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let template = text_arg(args, 0)?;
    let values = &args[1..];
    let mut output = String::new();
    let mut next = 0usize;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            output.push(c);
            continue;
        }
        let mut digits = String::new();
        while let Some(d) = chars.peek().filter(|d| d.is_ascii_digit()) {
            digits.push(*d);
            chars.next();
        }
        let index = if digits.is_empty() {
            match chars.next() {
                Some('%') => {
                    output.push('%');
                    continue;
                }
                Some('s') => {
                    next += 1;
                    next - 1
                }
                other => return Err(unsupported_specifier(other)),
            }
        } else {
            if chars.next() != Some('$') || chars.next() != Some('s') {
                return Err(InterpreterError::FunctionError(format!(
                    "invalid positional specifier %{}",
                    digits
                )));
            }
            let position: usize = digits
                .parse()
                .map_err(|_| InterpreterError::FunctionError(format!("invalid argument position {}", digits)))?;
            if position == 0 {
                return Err(InterpreterError::FunctionError("argument positions start at 1".to_string()));
            }
            next = position;
            position - 1
        };
        let value = values
            .get(index)
            .ok_or_else(|| InterpreterError::FunctionError("too few arguments for format()".to_string()))?;
        if !value.is_null() {
            output.push_str(&value.to_string());
        }
    }

    Ok(Value::Text(output))
}

fn unsupported_specifier(specifier: Option<char>) -> InterpreterError {
    match specifier {
        Some(c) => InterpreterError::FunctionError(format!("unsupported format specifier %{}", c)),
        None => InterpreterError::FunctionError("unterminated format specifier".to_string()),
    }
}

fn format_overlay(_: &str, inputs: &[String]) -> InterpreterResult<String> {
    match inputs {
        [input, replacement, start] => Ok(format!("overlay({} placing {} from {})", input, replacement, start)),
        [input, replacement, start, count] => Ok(format!(
            "overlay({} placing {} from {} for {})",
            input, replacement, start, count
        )),
        _ => Err(InterpreterError::FunctionError(format!(
            "overlay expects 3 or 4 arguments, got {}",
            inputs.len()
        ))),
    }
}

fn format_position(_: &str, inputs: &[String]) -> InterpreterResult<String> {
    match inputs {
        [needle, haystack] => Ok(format!("position({} in {})", needle, haystack)),
        _ => Err(InterpreterError::FunctionError(format!(
            "position expects 2 arguments, got {}",
            inputs.len()
        ))),
    }
}

fn format_substring(_: &str, inputs: &[String]) -> InterpreterResult<String> {
    match inputs {
        [text, start] => Ok(format!("substring({} from {})", text, start)),
        [text, start, length] => Ok(format!("substring({} from {} for {})", text, start, length)),
        _ => Err(InterpreterError::FunctionError(format!(
            "substring expects 2 or 3 arguments, got {}",
            inputs.len()
        ))),
    }
}
