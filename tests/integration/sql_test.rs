use std::sync::Arc;

use anyhow::Result;
use kuneiform::query::executor::sql::SqlParameters;
use kuneiform::query::parser::ast::{ArithmeticOperator, SqlStatement};
use kuneiform::query::value::RecordValue;
use kuneiform::{
    CancelToken, CostTable, DataType, Expression, InterpreterError, InterpreterResult, Procedure,
    ProcedureRunResult, Schema, SqlEngine, Statement, Value,
};

#[path = "../common/mod.rs"]
mod common;
use common::{column, record, MockSqlEngine, BUDGET};

const USERS: &str = "SELECT id, name FROM users ORDER BY id";

fn users_engine() -> MockSqlEngine {
    MockSqlEngine::new().with_rows(
        USERS,
        vec![
            record(vec![("id", Value::Int(1)), ("name", Value::from("alice"))]),
            record(vec![("id", Value::Int(2)), ("name", Value::from("bob"))]),
        ],
    )
}

fn run_with_engine(
    engine: Arc<dyn SqlEngine>,
    procedure: &Procedure,
    args: Vec<Value>,
) -> InterpreterResult<ProcedureRunResult> {
    common::interpreter().with_sql_engine(engine).run(
        &CancelToken::new(),
        procedure,
        &Schema::new("main"),
        args,
        BUDGET,
        &CostTable::default(),
    )
}

struct FailingEngine;

impl SqlEngine for FailingEngine {
    fn query(&self, statement: &SqlStatement, _: &SqlParameters) -> InterpreterResult<Vec<RecordValue>> {
        Err(InterpreterError::SqlError(format!("relation missing: {}", statement.sql)))
    }
}

#[test]
fn test_statement_receives_parameters_in_order() -> Result<()> {
    let procedure = Procedure::new("create_user")
        .param("id", DataType::INT)
        .param("name", DataType::TEXT)
        .body(vec![Statement::Sql(SqlStatement::new(
            "INSERT INTO users (id, name) VALUES ($id, $name)",
            vec!["id", "name"],
        ))]);
    let engine = Arc::new(MockSqlEngine::new());

    run_with_engine(engine.clone(), &procedure, vec![Value::Int(7), Value::from("carol")])?;

    let statements = engine.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].0, "INSERT INTO users (id, name) VALUES ($id, $name)");
    assert_eq!(
        statements[0].1,
        vec![
            ("id".to_string(), Value::Int(7)),
            ("name".to_string(), Value::from("carol")),
        ]
    );
    Ok(())
}

#[test]
fn test_sql_without_engine() -> Result<()> {
    let procedure = Procedure::new("orphan").body(vec![Statement::Sql(SqlStatement::new(
        "DELETE FROM users",
        vec![],
    ))]);

    assert_eq!(common::run(&procedure, vec![]), Err(InterpreterError::SqlUnavailable));
    Ok(())
}

#[test]
fn test_loop_over_query_rows() -> Result<()> {
    let procedure = Procedure::new("names")
        .returns_table(vec![("label", DataType::TEXT)])
        .body(vec![Statement::for_query(
            "user",
            SqlStatement::new(USERS, vec![]),
            vec![Statement::ret_next(vec![Expression::arithmetic(
                Expression::literal("user:"),
                ArithmeticOperator::Concat,
                Expression::field(Expression::variable("user"), "name"),
            )])],
        )]);

    let result = run_with_engine(Arc::new(users_engine()), &procedure, vec![])?;
    assert_eq!(
        column(&result, "label"),
        vec![Value::from("user:alice"), Value::from("user:bob")]
    );
    Ok(())
}

#[test]
fn test_return_query_streams_rows() -> Result<()> {
    let procedure = Procedure::new("all_users")
        .returns_table(vec![("id", DataType::INT), ("name", DataType::TEXT)])
        .body(vec![
            Statement::ReturnQuery(SqlStatement::new(USERS, vec![])),
            Statement::call(vec![], "error", vec![Expression::literal("unreachable")]),
        ]);

    let result = run_with_engine(Arc::new(users_engine()), &procedure, vec![])?;
    assert_eq!(result.row_count(), 2);
    assert_eq!(result.get(1, "id"), Some(&Value::Int(2)));
    assert_eq!(result.get(1, "name"), Some(&Value::from("bob")));
    Ok(())
}

#[test]
fn test_return_query_shape_is_checked() -> Result<()> {
    let procedure = Procedure::new("ids")
        .returns_table(vec![("id", DataType::INT)])
        .body(vec![Statement::ReturnQuery(SqlStatement::new(USERS, vec![]))]);

    let result = run_with_engine(Arc::new(users_engine()), &procedure, vec![]);
    assert!(matches!(result, Err(InterpreterError::ReturnShape(_))));
    Ok(())
}

#[test]
fn test_missing_record_field() -> Result<()> {
    let procedure = Procedure::new("emails")
        .returns_table(vec![("email", DataType::TEXT)])
        .body(vec![Statement::for_query(
            "user",
            SqlStatement::new(USERS, vec![]),
            vec![Statement::ret_next(vec![Expression::field(
                Expression::variable("user"),
                "email",
            )])],
        )]);

    let result = run_with_engine(Arc::new(users_engine()), &procedure, vec![]);
    assert_eq!(result, Err(InterpreterError::FieldNotFound("email".to_string())));
    Ok(())
}

#[test]
fn test_engine_errors_propagate() -> Result<()> {
    let procedure = Procedure::new("broken").body(vec![Statement::Sql(SqlStatement::new(
        "UPDATE nowhere SET x = 1",
        vec![],
    ))]);

    let result = run_with_engine(Arc::new(FailingEngine), &procedure, vec![]);
    assert!(matches!(result, Err(InterpreterError::SqlError(_))));
    Ok(())
}

#[test]
fn test_sql_is_charged() -> Result<()> {
    let procedure = Procedure::new("touch").body(vec![Statement::Sql(SqlStatement::new("SELECT 1", vec![]))]);
    let costs = CostTable {
        sql_statement_cost: 25,
        ..CostTable::uniform(0)
    };

    let result = common::interpreter()
        .with_sql_engine(Arc::new(MockSqlEngine::new()))
        .run(&CancelToken::new(), &procedure, &Schema::new("main"), vec![], BUDGET, &costs)?;
    assert_eq!(result.cost_spent, 25);
    Ok(())
}
