use std::sync::Arc;

use anyhow::Result;
use kuneiform::query::parser::ast::{ArithmeticOperator, SqlStatement};
use kuneiform::{
    CancelToken, CostTable, DataType, Expression, InterpreterError, Procedure, Schema, Statement, Value,
};

#[path = "../common/mod.rs"]
mod common;
use common::{MockSqlEngine, run, BUDGET};

fn add() -> Procedure {
    Procedure::new("add")
        .param("a", DataType::INT)
        .param("b", DataType::INT)
        .returns(vec![("sum", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::arithmetic(
            Expression::variable("a"),
            ArithmeticOperator::Add,
            Expression::variable("b"),
        )])])
}

#[test]
fn test_single_row_return() -> Result<()> {
    let result = run(&add(), vec![Value::Int(2), Value::Int(40)])?;

    assert_eq!(result.row_count(), 1);
    assert_eq!(result.get(0, "sum"), Some(&Value::Int(42)));
    assert!(result.cost_spent > 0);
    assert!(result.cost_spent <= BUDGET);
    Ok(())
}

#[test]
fn test_arguments_checked_before_any_statement_runs() -> Result<()> {
    let procedure = Procedure::new("audit")
        .param("id", DataType::INT)
        .body(vec![Statement::Sql(SqlStatement::new(
            "INSERT INTO audit VALUES ($id)",
            vec!["id"],
        ))]);
    let engine = Arc::new(MockSqlEngine::new());
    let interpreter = common::interpreter().with_sql_engine(engine.clone());

    let too_many = interpreter.run(
        &CancelToken::new(),
        &procedure,
        &Schema::new("main"),
        vec![Value::Int(1), Value::Int(2)],
        BUDGET,
        &CostTable::default(),
    );
    assert_eq!(too_many, Err(InterpreterError::ArgumentCount { expected: 1, got: 2 }));

    let wrong_type = interpreter.run(
        &CancelToken::new(),
        &procedure,
        &Schema::new("main"),
        vec![Value::from("1")],
        BUDGET,
        &CostTable::default(),
    );
    assert!(matches!(
        wrong_type,
        Err(InterpreterError::ArgumentType { position: 1, .. })
    ));

    assert!(engine.statements().is_empty());
    Ok(())
}

#[test]
fn test_untyped_null_argument_rejected() -> Result<()> {
    let result = run(&add(), vec![Value::Null(DataType::NULL), Value::Int(1)]);
    assert!(matches!(result, Err(InterpreterError::ArgumentType { position: 1, .. })));

    // A NULL of the declared type binds; arithmetic then yields NULL
    let result = run(&add(), vec![Value::Null(DataType::INT), Value::Int(1)])?;
    assert_eq!(result.get(0, "sum"), Some(&Value::Null(DataType::INT)));
    Ok(())
}

#[test]
fn test_missing_return() -> Result<()> {
    let procedure = Procedure::new("nothing")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::assign("x", Expression::literal(1))]);

    assert_eq!(run(&procedure, vec![]), Err(InterpreterError::MissingReturn));
    Ok(())
}

#[test]
fn test_unexpected_return() -> Result<()> {
    let procedure = Procedure::new("silent").body(vec![Statement::ret(vec![Expression::literal(1)])]);
    assert_eq!(run(&procedure, vec![]), Err(InterpreterError::UnexpectedReturn));

    // A bare return ends the procedure without producing a row
    let procedure = Procedure::new("silent").body(vec![
        Statement::ret(vec![]),
        Statement::call(vec![], "error", vec![Expression::literal("unreachable")]),
    ]);
    let result = run(&procedure, vec![])?;
    assert_eq!(result.row_count(), 0);
    Ok(())
}

#[test]
fn test_single_row_procedure_rejects_second_row() -> Result<()> {
    let procedure = Procedure::new("twice")
        .returns(vec![("value", DataType::INT)])
        .body(vec![
            Statement::ret_next(vec![Expression::literal(1)]),
            Statement::ret_next(vec![Expression::literal(2)]),
        ]);

    assert_eq!(run(&procedure, vec![]), Err(InterpreterError::UnexpectedReturn));
    Ok(())
}

#[test]
fn test_return_shape_is_checked() -> Result<()> {
    let too_wide = Procedure::new("wide")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::literal(1), Expression::literal(2)])]);
    assert!(matches!(run(&too_wide, vec![]), Err(InterpreterError::ReturnShape(_))));

    let wrong_type = Procedure::new("typed")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::literal("one")])]);
    assert!(matches!(run(&wrong_type, vec![]), Err(InterpreterError::ReturnShape(_))));

    let null = Procedure::new("nullable")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::null()])]);
    let result = run(&null, vec![])?;
    assert_eq!(result.get(0, "value"), Some(&Value::Null(DataType::NULL)));
    Ok(())
}

#[test]
fn test_unknown_and_aggregate_functions_fail_to_compile() -> Result<()> {
    let unknown = Procedure::new("p").body(vec![Statement::call(vec![], "no_such_function", vec![])]);
    assert_eq!(
        run(&unknown, vec![]),
        Err(InterpreterError::UnknownFunction("no_such_function".to_string()))
    );

    let aggregate = Procedure::new("p").body(vec![Statement::call(
        vec![],
        "count",
        vec![Expression::literal(1)],
    )]);
    assert_eq!(
        run(&aggregate, vec![]),
        Err(InterpreterError::AggregateInProcedure("count".to_string()))
    );
    Ok(())
}

#[test]
fn test_declared_variable_starts_as_typed_null() -> Result<()> {
    let procedure = Procedure::new("declared")
        .returns(vec![("name", DataType::TEXT)])
        .body(vec![
            Statement::declare("name", DataType::TEXT),
            Statement::ret(vec![Expression::variable("name")]),
        ]);

    let result = run(&procedure, vec![])?;
    assert_eq!(result.get(0, "name"), Some(&Value::Null(DataType::TEXT)));
    Ok(())
}

#[test]
fn test_variables_keep_their_type() -> Result<()> {
    let procedure = Procedure::new("retype").body(vec![
        Statement::assign("x", Expression::literal(1)),
        Statement::assign("x", Expression::literal("one")),
    ]);
    assert!(matches!(run(&procedure, vec![]), Err(InterpreterError::TypeError(_))));

    let procedure = Procedure::new("declared")
        .returns(vec![("x", DataType::INT)])
        .body(vec![
            Statement::declare("x", DataType::INT),
            Statement::assign("x", Expression::literal(7)),
            Statement::ret(vec![Expression::variable("x")]),
        ]);
    let result = run(&procedure, vec![])?;
    assert_eq!(result.get(0, "x"), Some(&Value::Int(7)));
    Ok(())
}

#[test]
fn test_raised_error_ends_the_run() -> Result<()> {
    let procedure = Procedure::new("fails").body(vec![Statement::call(
        vec![],
        "error",
        vec![Expression::literal("out of stock")],
    )]);

    let result = run(&procedure, vec![]);
    assert_eq!(result, Err(InterpreterError::Raised("out of stock".to_string())));
    Ok(())
}

#[test]
fn test_notices_are_returned_in_order() -> Result<()> {
    let procedure = Procedure::new("chatty").body(vec![
        Statement::call(vec![], "notice", vec![Expression::literal("first")]),
        Statement::call(vec![], "notice", vec![Expression::literal("second")]),
    ]);

    let result = run(&procedure, vec![])?;
    assert_eq!(result.notices, vec!["first".to_string(), "second".to_string()]);
    Ok(())
}

#[test]
fn test_type_casts() -> Result<()> {
    let price = DataType::decimal(6, 2)?;
    let procedure = Procedure::new("casts")
        .param("raw", DataType::TEXT)
        .returns(vec![
            ("next", DataType::INT),
            ("price", price),
            ("label", DataType::TEXT),
            ("missing", DataType::TEXT),
        ])
        .body(vec![Statement::ret(vec![
            Expression::arithmetic(
                Expression::cast(Expression::variable("raw"), DataType::INT),
                ArithmeticOperator::Add,
                Expression::literal(1),
            ),
            Expression::cast(Expression::literal(5), price),
            Expression::cast(Expression::literal(true), DataType::TEXT),
            Expression::cast(Expression::null(), DataType::TEXT),
        ])]);

    let result = run(&procedure, vec![Value::from("41")])?;
    assert_eq!(result.get(0, "next"), Some(&Value::Int(42)));
    assert_eq!(result.get(0, "price").map(Value::data_type), Some(price));
    assert_eq!(result.get(0, "price").map(|v| v.to_string()), Some("5.00".to_string()));
    assert_eq!(result.get(0, "label"), Some(&Value::from("true")));
    assert_eq!(result.get(0, "missing"), Some(&Value::Null(DataType::TEXT)));

    assert!(matches!(
        run(&procedure, vec![Value::from("forty")]),
        Err(InterpreterError::CastError(_))
    ));
    Ok(())
}

#[test]
fn test_cast_array_elements() -> Result<()> {
    let procedure = Procedure::new("labels")
        .returns(vec![("labels", DataType::TEXT_ARRAY)])
        .body(vec![Statement::ret(vec![Expression::cast(
            Expression::MakeArray(vec![Expression::literal(1), Expression::literal(2)]),
            DataType::TEXT_ARRAY,
        )])]);

    let result = run(&procedure, vec![])?;
    let labels = result.get(0, "labels").and_then(Value::as_array).map(|a| a.elements().to_vec());
    assert_eq!(labels, Some(vec![Value::from("1"), Value::from("2")]));

    let scalar = Procedure::new("scalar")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::cast(
            Expression::MakeArray(vec![Expression::literal(1)]),
            DataType::INT,
        )])]);
    assert!(matches!(run(&scalar, vec![]), Err(InterpreterError::CastError(_))));
    Ok(())
}
