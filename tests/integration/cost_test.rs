use anyhow::Result;
use rand::Rng;

use kuneiform::{
    CancelToken, CostTable, DataType, Expression, InterpreterError, InterpreterResult, Procedure,
    ProcedureRunResult, Schema, Statement, Value,
};
use kuneiform::query::parser::ast::ArithmeticOperator;

#[path = "../common/mod.rs"]
mod common;

fn run_with(procedure: &Procedure, args: Vec<Value>, max_cost: i64, costs: &CostTable) -> InterpreterResult<ProcedureRunResult> {
    common::interpreter().run(
        &CancelToken::new(),
        procedure,
        &Schema::new("main"),
        args,
        max_cost,
        costs,
    )
}

fn assign_and_return() -> Procedure {
    Procedure::new("echo")
        .returns(vec![("x", DataType::INT)])
        .body(vec![
            Statement::assign("x", Expression::literal(1)),
            Statement::ret(vec![Expression::variable("x")]),
        ])
}

fn counter() -> Procedure {
    Procedure::new("counter")
        .param("n", DataType::INT)
        .returns_table(vec![("i", DataType::INT), ("square", DataType::INT)])
        .body(vec![Statement::for_range(
            "i",
            Expression::literal(1),
            Expression::variable("n"),
            vec![Statement::ret_next(vec![
                Expression::variable("i"),
                Expression::arithmetic(
                    Expression::variable("i"),
                    ArithmeticOperator::Multiply,
                    Expression::variable("i"),
                ),
            ])],
        )])
}

#[test]
fn test_exact_uniform_cost() -> Result<()> {
    // set x, then return with one variable read
    let result = run_with(&assign_and_return(), vec![], 100, &CostTable::uniform(1))?;
    assert_eq!(result.cost_spent, 3);
    Ok(())
}

#[test]
fn test_budget_boundary() -> Result<()> {
    let exact = run_with(&assign_and_return(), vec![], 3, &CostTable::uniform(1))?;
    assert_eq!(exact.cost_spent, 3);

    let short = run_with(&assign_and_return(), vec![], 2, &CostTable::uniform(1));
    assert_eq!(short, Err(InterpreterError::CostExceeded));
    Ok(())
}

#[test]
fn test_unbounded_loop_runs_out_of_budget() -> Result<()> {
    let procedure = Procedure::new("spin").body(vec![Statement::for_range(
        "i",
        Expression::literal(1),
        Expression::literal(i64::MAX),
        vec![],
    )]);

    let result = run_with(&procedure, vec![], 10_000, &CostTable::default());
    assert_eq!(result, Err(InterpreterError::CostExceeded));
    Ok(())
}

#[test]
fn test_individual_weights() -> Result<()> {
    let builtin_only = CostTable {
        call_builtin_function_cost: 10,
        ..CostTable::uniform(0)
    };
    let procedure = Procedure::new("call").body(vec![Statement::call(
        vec![],
        "abs",
        vec![Expression::literal(-1)],
    )]);
    assert_eq!(run_with(&procedure, vec![], 100, &builtin_only)?.cost_spent, 10);

    let loop_only = CostTable {
        loop_cost: 1,
        ..CostTable::uniform(0)
    };
    let procedure = Procedure::new("iterate").body(vec![Statement::for_range(
        "i",
        Expression::literal(1),
        Expression::literal(4),
        vec![],
    )]);
    assert_eq!(run_with(&procedure, vec![], 100, &loop_only)?.cost_spent, 4);
    Ok(())
}

#[test]
fn test_size_surcharge_scales_with_value() -> Result<()> {
    let store = |text: &str| {
        Procedure::new("store").body(vec![Statement::assign("s", Expression::literal(text))])
    };
    let costs = CostTable {
        size_cost_per_byte: 1,
        ..CostTable::uniform(0)
    };

    let short = run_with(&store("a"), vec![], 10_000, &costs)?.cost_spent;
    let long = run_with(&store(&"a".repeat(200)), vec![], 10_000, &costs)?.cost_spent;
    assert!(short > 0);
    assert!(long >= short + 199);
    Ok(())
}

#[test]
fn test_element_write_pays_size_surcharge() -> Result<()> {
    let store = |text: &str| {
        Procedure::new("store_element").body(vec![
            Statement::declare("xs", DataType::TEXT_ARRAY),
            Statement::assign_index("xs", Expression::literal(1), Expression::literal(text)),
        ])
    };
    let costs = CostTable {
        size_cost_per_byte: 1,
        ..CostTable::uniform(0)
    };

    let short = run_with(&store("a"), vec![], 10_000, &costs)?.cost_spent;
    let long = run_with(&store(&"a".repeat(200)), vec![], 10_000, &costs)?.cost_spent;
    assert!(long >= short + 199);
    Ok(())
}

#[test]
fn test_oversized_element_write_fails_with_free_steps() -> Result<()> {
    let procedure = Procedure::new("sparse").body(vec![
        Statement::declare("xs", DataType::INT_ARRAY),
        Statement::assign_index("xs", Expression::literal(i64::MAX), Expression::literal(1)),
    ]);

    let result = run_with(&procedure, vec![], i64::MAX, &CostTable::uniform(0));
    assert!(matches!(
        result,
        Err(InterpreterError::ArrayTooLarge { length: i64::MAX, .. })
    ));

    // A large budget alone does not make room for the write either
    let result = run_with(&procedure, vec![], i64::MAX, &CostTable::default());
    assert!(matches!(result, Err(InterpreterError::ArrayTooLarge { .. })));
    Ok(())
}

#[test]
fn test_runs_are_deterministic() -> Result<()> {
    let mut rng = rand::thread_rng();
    for _ in 0..10 {
        let n = rng.gen_range(0..50);
        let first = run_with(&counter(), vec![Value::Int(n)], 1_000_000, &CostTable::default())?;
        let second = run_with(&counter(), vec![Value::Int(n)], 1_000_000, &CostTable::default())?;
        assert_eq!(first, second);
        assert_eq!(first.row_count(), n as usize);
    }
    Ok(())
}

#[test]
fn test_cost_grows_with_work() -> Result<()> {
    let small = run_with(&counter(), vec![Value::Int(5)], 1_000_000, &CostTable::default())?;
    let large = run_with(&counter(), vec![Value::Int(50)], 1_000_000, &CostTable::default())?;
    assert!(large.cost_spent > small.cost_spent);
    Ok(())
}

#[test]
fn test_cost_table_from_json() -> Result<()> {
    let costs: CostTable = serde_json::from_str(r#"{ "loop_cost": 7, "return_cost": 0 }"#)?;
    assert_eq!(costs.loop_cost, 7);
    assert_eq!(costs.return_cost, 0);
    assert_eq!(costs.get_variable_cost, CostTable::default().get_variable_cost);

    let negative: CostTable = serde_json::from_str(r#"{ "arithmetic_cost": -2 }"#)?;
    let result = run_with(&assign_and_return(), vec![], 100, &negative);
    assert!(matches!(result, Err(InterpreterError::ConfigError(_))));
    Ok(())
}

#[test]
fn test_zero_budget() -> Result<()> {
    let result = run_with(&assign_and_return(), vec![], 0, &CostTable::uniform(1));
    assert_eq!(result, Err(InterpreterError::CostExceeded));

    // Free steps still fit in a zero budget
    let result = run_with(&assign_and_return(), vec![], 0, &CostTable::uniform(0))?;
    assert_eq!(result.cost_spent, 0);
    Ok(())
}
