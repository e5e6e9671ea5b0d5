use std::sync::Arc;

use anyhow::Result;
use kuneiform::query::functions::{default_format, FunctionContext, FunctionDefinition, ScalarFunction};
use kuneiform::{
    CancelToken, CostTable, DataType, Expression, FunctionRegistry, Interpreter, InterpreterError,
    InterpreterResult, Procedure, Schema, Statement, Value,
};

#[path = "../common/mod.rs"]
mod common;
use common::{run, BUDGET};

/// A procedure returning the single value of `call`
fn evaluate(return_type: DataType, call: Expression) -> Procedure {
    Procedure::new("evaluate")
        .returns(vec![("value", return_type)])
        .body(vec![Statement::ret(vec![call])])
}

fn text(s: &str) -> Expression {
    Expression::literal(s)
}

#[test]
fn test_string_builtins() -> Result<()> {
    let cases = vec![
        (
            Expression::call("format", vec![text("%s has %s"), text("alice"), Expression::literal(3)]),
            "alice has 3",
        ),
        (
            Expression::call("lpad", vec![text("7"), Expression::literal(3), text("0")]),
            "007",
        ),
        (Expression::call("upper", vec![text("quiet")]), "QUIET"),
    ];

    for (call, expected) in cases {
        let result = run(&evaluate(DataType::TEXT, call), vec![])?;
        assert_eq!(result.get(0, "value"), Some(&Value::from(expected)));
    }
    Ok(())
}

#[test]
fn test_null_input_short_circuits() -> Result<()> {
    let procedure = Procedure::new("shout")
        .param("s", DataType::TEXT)
        .returns(vec![("value", DataType::TEXT)])
        .body(vec![Statement::ret(vec![Expression::call(
            "upper",
            vec![Expression::variable("s")],
        )])]);

    let result = run(&procedure, vec![Value::Null(DataType::TEXT)])?;
    assert_eq!(result.get(0, "value"), Some(&Value::Null(DataType::TEXT)));
    Ok(())
}

#[test]
fn test_substring_with_extreme_start() -> Result<()> {
    let call = Expression::call(
        "substring",
        vec![text("abc"), Expression::literal(i64::MIN), Expression::literal(2)],
    );
    let result = run(&evaluate(DataType::TEXT, call), vec![])?;
    assert_eq!(result.get(0, "value"), Some(&Value::from("")));

    let call = Expression::call(
        "overlay",
        vec![text("abc"), text("X"), Expression::literal(2), Expression::literal(i64::MAX)],
    );
    let result = run(&evaluate(DataType::TEXT, call), vec![])?;
    assert_eq!(result.get(0, "value"), Some(&Value::from("aX")));
    Ok(())
}

#[test]
fn test_encoding_builtins() -> Result<()> {
    let procedure = Procedure::new("encodings")
        .param("data", DataType::BLOB)
        .returns(vec![("hex", DataType::TEXT), ("base64", DataType::TEXT)])
        .body(vec![Statement::ret(vec![
            Expression::call("encode", vec![Expression::variable("data"), text("hex")]),
            Expression::call("encode", vec![Expression::variable("data"), text("base64")]),
        ])]);

    let result = run(&procedure, vec![Value::Blob(vec![0xde, 0xad, 0xbe, 0xef])])?;
    assert_eq!(result.get(0, "hex"), Some(&Value::from("deadbeef")));
    assert_eq!(result.get(0, "base64"), Some(&Value::from("3q2+7w==")));
    Ok(())
}

#[test]
fn test_array_builtins() -> Result<()> {
    let procedure = Procedure::new("build")
        .returns(vec![("values", DataType::INT_ARRAY), ("length", DataType::INT)])
        .body(vec![
            Statement::assign("xs", Expression::MakeArray(vec![Expression::literal(2)])),
            Statement::assign(
                "xs",
                Expression::call("array_append", vec![Expression::variable("xs"), Expression::literal(3)]),
            ),
            Statement::assign(
                "xs",
                Expression::call("array_prepend", vec![Expression::literal(1), Expression::variable("xs")]),
            ),
            Statement::ret(vec![
                Expression::variable("xs"),
                Expression::call("array_length", vec![Expression::variable("xs")]),
            ]),
        ]);

    let result = run(&procedure, vec![])?;
    let values = result.get(0, "values").and_then(Value::as_array).map(|a| a.elements().to_vec());
    assert_eq!(values, Some(common::ints(&[1, 2, 3])));
    assert_eq!(result.get(0, "length"), Some(&Value::Int(3)));
    Ok(())
}

#[test]
fn test_invalid_arguments_name_the_function() -> Result<()> {
    let result = run(&evaluate(DataType::INT, Expression::call("abs", vec![text("x")])), vec![]);
    assert!(matches!(
        result,
        Err(InterpreterError::FunctionArguments { ref name, .. }) if name == "abs"
    ));

    let result = run(&evaluate(DataType::INT, Expression::call("abs", vec![Expression::literal(-4)])), vec![])?;
    assert_eq!(result.get(0, "value"), Some(&Value::Int(4)));
    Ok(())
}

fn validate_triple(args: &[DataType]) -> InterpreterResult<DataType> {
    match args {
        [t] if t.equals_strict(&DataType::INT) => Ok(DataType::INT),
        _ => Err(InterpreterError::TypeError("triple takes one int".to_string())),
    }
}

fn triple(ctx: &mut dyn FunctionContext, args: &[Value]) -> InterpreterResult<Value> {
    ctx.spend(5)?;
    match &args[0] {
        Value::Int(i) => i.checked_mul(3).map(Value::Int).ok_or(InterpreterError::NumericOverflow),
        other => Err(InterpreterError::TypeError(format!("expected int, got {}", other.data_type()))),
    }
}

fn triple_definition() -> FunctionDefinition {
    FunctionDefinition::Scalar(ScalarFunction {
        validate_args: validate_triple,
        pg_format: default_format,
        evaluate: triple,
        null_on_null_input: true,
    })
}

#[test]
fn test_custom_function() -> Result<()> {
    let mut registry = FunctionRegistry::with_builtins();
    registry.register("triple", triple_definition())?;
    assert_eq!(
        registry.register("triple", triple_definition()),
        Err(InterpreterError::DuplicateFunction("triple".to_string()))
    );

    let interpreter = Interpreter::new(Arc::new(registry));
    let costs = CostTable {
        call_builtin_function_cost: 1,
        ..CostTable::uniform(0)
    };
    let result = interpreter.run(
        &CancelToken::new(),
        &evaluate(DataType::INT, Expression::call("triple", vec![Expression::literal(14)])),
        &Schema::new("main"),
        vec![],
        BUDGET,
        &costs,
    )?;
    assert_eq!(result.get(0, "value"), Some(&Value::Int(42)));
    // Call charge plus what the function spent itself
    assert_eq!(result.cost_spent, 6);

    // Other interpreters never see the registration
    let plain = run(&evaluate(DataType::INT, Expression::call("triple", vec![Expression::literal(1)])), vec![]);
    assert_eq!(plain, Err(InterpreterError::UnknownFunction("triple".to_string())));
    Ok(())
}

#[test]
fn test_postgres_rendering() -> Result<()> {
    let registry = FunctionRegistry::with_builtins();
    let render = |name: &str, inputs: &[&str], distinct: bool| -> InterpreterResult<String> {
        let inputs: Vec<String> = inputs.iter().map(|s| s.to_string()).collect();
        registry
            .get(name)
            .ok_or_else(|| InterpreterError::UnknownFunction(name.to_string()))?
            .pg_format(name, &inputs, distinct)
    };

    assert_eq!(render("count", &[], false)?, "count(*)");
    assert_eq!(render("count", &["id"], true)?, "count(DISTINCT id)");
    assert_eq!(render("abs", &["$1"], false)?, "abs($1)");
    assert_eq!(render("array_length", &["$1"], false)?, "array_length($1, 1)");
    assert!(render("abs", &["$1"], true).is_err());
    Ok(())
}
