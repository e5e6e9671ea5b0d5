use std::thread;
use std::time::Duration;

use anyhow::Result;
use kuneiform::query::parser::ast::{ComparisonOperator, LogicalOperator};
use kuneiform::{
    CancelToken, CostTable, DataType, Expression, InterpreterConfig, InterpreterError, Procedure, Schema,
    Statement, Value,
};

#[path = "../common/mod.rs"]
mod common;
use common::BUDGET;

fn numbers(limit: i64) -> Procedure {
    Procedure::new("numbers")
        .returns_table(vec![("n", DataType::INT)])
        .body(vec![Statement::for_range(
            "n",
            Expression::literal(1),
            Expression::literal(limit),
            vec![Statement::ret_next(vec![Expression::variable("n")])],
        )])
}

#[test]
fn test_cursor_streams_rows_in_order() -> Result<()> {
    let interpreter = common::interpreter();
    let program = interpreter.compile(&numbers(3), &Schema::new("main"))?;
    let mut cursor = interpreter.open_cursor(&CancelToken::new(), program, vec![], BUDGET, &CostTable::default())?;

    assert!(cursor.summary().is_none());
    assert_eq!(cursor.next()?, Some(vec![Value::Int(1)]));
    assert_eq!(cursor.next()?, Some(vec![Value::Int(2)]));
    assert_eq!(cursor.next()?, Some(vec![Value::Int(3)]));
    assert_eq!(cursor.next()?, None);
    assert_eq!(cursor.next()?, None);

    let summary = cursor.summary().expect("finished run has a summary");
    assert!(summary.cost_spent > 0);
    Ok(())
}

#[test]
fn test_failure_arrives_after_earlier_rows() -> Result<()> {
    let procedure = Procedure::new("partial")
        .returns_table(vec![("n", DataType::INT)])
        .body(vec![
            Statement::ret_next(vec![Expression::literal(1)]),
            Statement::call(vec![], "error", vec![Expression::literal("boom")]),
        ]);
    let interpreter = common::interpreter();
    let program = interpreter.compile(&procedure, &Schema::new("main"))?;
    let mut cursor = interpreter.open_cursor(&CancelToken::new(), program, vec![], BUDGET, &CostTable::default())?;

    assert_eq!(cursor.next()?, Some(vec![Value::Int(1)]));
    assert_eq!(cursor.next(), Err(InterpreterError::Raised("boom".to_string())));
    assert_eq!(cursor.next()?, None);
    Ok(())
}

#[test]
fn test_cancel_stops_cursor() -> Result<()> {
    let interpreter = common::interpreter();
    let program = interpreter.compile(&numbers(i64::MAX), &Schema::new("main"))?;
    let cancel = CancelToken::new();
    let mut cursor = interpreter.open_cursor(&cancel, program, vec![], i64::MAX, &CostTable::default())?;

    assert_eq!(cursor.next()?, Some(vec![Value::Int(1)]));
    assert_eq!(cursor.next()?, Some(vec![Value::Int(2)]));
    cancel.cancel();
    assert!(cancel.is_cancelled());
    assert_eq!(cursor.next(), Err(InterpreterError::Cancelled));
    Ok(())
}

#[test]
fn test_cancel_from_another_thread() -> Result<()> {
    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        canceller.cancel();
    });

    let result = common::interpreter().run(
        &cancel,
        &numbers(i64::MAX),
        &Schema::new("main"),
        vec![],
        i64::MAX,
        &CostTable::default(),
    );
    handle.join().expect("canceller thread");
    assert_eq!(result, Err(InterpreterError::Cancelled));
    Ok(())
}

#[test]
fn test_cancel_while_producer_never_emits() -> Result<()> {
    // Spins without producing rows; only the consumer sees the cancellation
    let procedure = Procedure::new("spin")
        .returns_table(vec![("n", DataType::INT)])
        .body(vec![Statement::for_range(
            "i",
            Expression::literal(1),
            Expression::literal(i64::MAX),
            vec![Statement::if_then(
                Expression::logical(
                    Expression::compare(Expression::variable("i"), ComparisonOperator::LessThan, Expression::literal(0)),
                    LogicalOperator::And,
                    Expression::literal(true),
                ),
                vec![Statement::ret_next(vec![Expression::variable("i")])],
            )],
        )]);

    let cancel = CancelToken::new();
    let canceller = cancel.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        canceller.cancel();
    });

    let result = common::interpreter().run(
        &cancel,
        &procedure,
        &Schema::new("main"),
        vec![],
        5_000_000,
        &CostTable::default(),
    );
    handle.join().expect("canceller thread");
    // The budget may run out before the cancellation lands
    assert!(matches!(
        result,
        Err(InterpreterError::Cancelled) | Err(InterpreterError::CostExceeded)
    ));
    Ok(())
}

#[test]
fn test_dropping_cursor_releases_producer() -> Result<()> {
    let interpreter = common::interpreter();
    let program = interpreter.compile(&numbers(i64::MAX), &Schema::new("main"))?;
    let mut cursor = interpreter.open_cursor(&CancelToken::new(), program.clone(), vec![], i64::MAX, &CostTable::default())?;
    assert_eq!(cursor.next()?, Some(vec![Value::Int(1)]));
    drop(cursor);

    // The compiled program is still usable once the abandoned run winds down
    let mut cursor = interpreter.open_cursor(&CancelToken::new(), program, vec![], BUDGET, &CostTable::default())?;
    assert_eq!(cursor.next()?, Some(vec![Value::Int(1)]));
    Ok(())
}

#[test]
fn test_producer_thread_settings() -> Result<()> {
    let config = InterpreterConfig {
        producer_stack_size: None,
        thread_name: "custom-producer".to_string(),
        ..InterpreterConfig::default()
    };
    let interpreter = common::interpreter().with_config(config);
    assert_eq!(interpreter.config().thread_name, "custom-producer");

    let result = interpreter.run(
        &CancelToken::new(),
        &numbers(2),
        &Schema::new("main"),
        vec![],
        BUDGET,
        &CostTable::default(),
    )?;
    assert_eq!(result.row_count(), 2);
    Ok(())
}
