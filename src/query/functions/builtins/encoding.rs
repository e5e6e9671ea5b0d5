// Encoding, hashing and identifier functions

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use uuid::Uuid;

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{FunctionContext, FunctionDefinition};
use crate::query::value::Value;

use super::{blob_arg, expect_count, expect_type, scalar, scalar_with_format, text_arg};

pub(super) fn definitions() -> Vec<(&'static str, FunctionDefinition)> {
    vec![
        ("encode", scalar(validate_encode, encode)),
        ("decode", scalar(validate_decode, decode)),
        ("digest", scalar(validate_digest, digest)),
        ("uuid_generate_v5", scalar(validate_uuid_v5, uuid_generate_v5)),
        ("generate_dbid", scalar_with_format(validate_generate_dbid, generate_dbid, format_generate_dbid)),
    ]
}

fn validate_encode(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_type(args, 0, DataType::BLOB)?;
    expect_type(args, 1, DataType::TEXT)?;
    Ok(DataType::TEXT)
}

fn validate_decode(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_type(args, 0, DataType::TEXT)?;
    expect_type(args, 1, DataType::TEXT)?;
    Ok(DataType::BLOB)
}

fn validate_digest(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    if !args[0].accepts(&DataType::TEXT) && !args[0].accepts(&DataType::BLOB) {
        return Err(InterpreterError::TypeError(format!(
            "argument 1 must be text or blob, got {}",
            args[0]
        )));
    }
    expect_type(args, 1, DataType::TEXT)?;
    Ok(DataType::BLOB)
}

fn validate_uuid_v5(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_type(args, 0, DataType::UUID)?;
    expect_type(args, 1, DataType::TEXT)?;
    Ok(DataType::UUID)
}

fn validate_generate_dbid(args: &[DataType]) -> InterpreterResult<DataType> {
    expect_count(args, 2)?;
    expect_type(args, 0, DataType::TEXT)?;
    expect_type(args, 1, DataType::BLOB)?;
    Ok(DataType::TEXT)
}

fn encode(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let data = blob_arg(args, 0)?;
    match text_arg(args, 1)? {
        "hex" => Ok(Value::Text(hex::encode(data))),
        "base64" => Ok(Value::Text(STANDARD.encode(data))),
        "escape" => Err(InterpreterError::FunctionError("escape encoding is not supported".to_string())),
        other => Err(InterpreterError::FunctionError(format!("unknown encoding: {}", other))),
    }
}

fn decode(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let data = text_arg(args, 0)?;
    match text_arg(args, 1)? {
        "hex" => Ok(Value::Blob(hex::decode(data)?)),
        "base64" => Ok(Value::Blob(STANDARD.decode(data)?)),
        "escape" => Err(InterpreterError::FunctionError("escape encoding is not supported".to_string())),
        other => Err(InterpreterError::FunctionError(format!("unknown encoding: {}", other))),
    }
}

fn digest(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let data: &[u8] = match &args[0] {
        Value::Text(s) => s.as_bytes(),
        Value::Blob(b) => b,
        other => return Err(super::wrong_value(0, "text or blob", other)),
    };
    let hash = match text_arg(args, 1)? {
        "sha224" => Sha224::digest(data).to_vec(),
        "sha256" => Sha256::digest(data).to_vec(),
        "sha384" => Sha384::digest(data).to_vec(),
        "sha512" => Sha512::digest(data).to_vec(),
        other => return Err(InterpreterError::FunctionError(format!("unknown digest: {}", other))),
    };
    Ok(Value::Blob(hash))
}

fn uuid_generate_v5(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let namespace = match &args[0] {
        Value::Uuid(u) => *u,
        other => return Err(super::wrong_value(0, "uuid", other)),
    };
    let name = text_arg(args, 1)?;
    Ok(Value::Uuid(Uuid::new_v5(&namespace, name.as_bytes())))
}

/// Deterministic dataset identifier: `x` followed by the hex sha224 of the
/// lowercased name and the owner address
pub fn generate_dbid_from(name: &str, owner: &[u8]) -> String {
    let mut hasher = Sha224::new();
    hasher.update(name.to_lowercase().as_bytes());
    hasher.update(owner);
    format!("x{}", hex::encode(hasher.finalize()))
}

fn generate_dbid(_: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    let name = text_arg(args, 0)?;
    let owner = blob_arg(args, 1)?;
    Ok(Value::Text(generate_dbid_from(name, owner)))
}

fn format_generate_dbid(_: &str, inputs: &[String]) -> InterpreterResult<String> {
    match inputs {
        [name, owner] => Ok(format!(
            "(select 'x' || encode(sha224(lower({})::bytea || {}), 'hex'))",
            name, owner
        )),
        _ => Err(InterpreterError::FunctionError(format!(
            "generate_dbid expects 2 arguments, got {}",
            inputs.len()
        ))),
    }
}
