use anyhow::Result;
use kuneiform::query::parser::ast::{ArithmeticOperator, ComparisonOperator};
use kuneiform::{
    CancelToken, CostTable, DataType, Expression, InterpreterConfig, InterpreterError, Procedure, Schema,
    Statement, Value,
};

#[path = "../common/mod.rs"]
mod common;
use common::{column, run_in, BUDGET};

fn var(name: &str) -> Expression {
    Expression::variable(name)
}

fn lit(value: i64) -> Expression {
    Expression::literal(value)
}

fn factorial() -> Procedure {
    Procedure::new("factorial")
        .param("n", DataType::INT)
        .returns(vec![("result", DataType::INT)])
        .body(vec![
            Statement::if_then(
                Expression::compare(var("n"), ComparisonOperator::LessThanOrEqual, lit(1)),
                vec![Statement::ret(vec![lit(1)])],
            ),
            Statement::ret(vec![Expression::arithmetic(
                var("n"),
                ArithmeticOperator::Multiply,
                Expression::call(
                    "factorial",
                    vec![Expression::arithmetic(var("n"), ArithmeticOperator::Subtract, lit(1))],
                ),
            )]),
        ])
}

fn pair() -> Procedure {
    Procedure::new("pair")
        .returns(vec![("number", DataType::INT), ("word", DataType::TEXT)])
        .body(vec![Statement::ret(vec![lit(1), Expression::literal("one")])])
}

#[test]
fn test_recursive_procedure() -> Result<()> {
    let result = run_in(&Schema::new("main"), &factorial(), vec![Value::Int(5)])?;
    assert_eq!(result.get(0, "result"), Some(&Value::Int(120)));
    Ok(())
}

#[test]
fn test_call_depth_is_limited() -> Result<()> {
    let interpreter = common::interpreter().with_config(InterpreterConfig {
        max_call_depth: 8,
        ..InterpreterConfig::default()
    });
    let run = |n: i64| {
        interpreter.run(
            &CancelToken::new(),
            &factorial(),
            &Schema::new("main"),
            vec![Value::Int(n)],
            BUDGET,
            &CostTable::default(),
        )
    };

    assert_eq!(run(9)?.get(0, "result"), Some(&Value::Int(362_880)));
    assert_eq!(run(10), Err(InterpreterError::CallDepthExceeded(8)));
    Ok(())
}

#[test]
fn test_schema_procedures_resolve_case_insensitively() -> Result<()> {
    let double = Procedure::new("Double")
        .param("x", DataType::INT)
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::arithmetic(
            var("x"),
            ArithmeticOperator::Multiply,
            lit(2),
        )])]);
    let schema = Schema::with_procedures("main", vec![double])?;
    let entry = Procedure::new("entry")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::call("DOUBLE", vec![lit(21)])])]);

    let result = run_in(&schema, &entry, vec![])?;
    assert_eq!(result.get(0, "value"), Some(&Value::Int(42)));
    Ok(())
}

#[test]
fn test_callee_runs_in_its_own_scope() -> Result<()> {
    let clobber = Procedure::new("clobber").body(vec![Statement::assign("x", lit(99))]);
    let peek = Procedure::new("peek")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![var("x")])]);
    let schema = Schema::with_procedures("main", vec![clobber, peek])?;

    let caller = Procedure::new("caller")
        .returns(vec![("x", DataType::INT)])
        .body(vec![
            Statement::assign("x", lit(1)),
            Statement::call(vec![], "clobber", vec![]),
            Statement::ret(vec![var("x")]),
        ]);
    let result = run_in(&schema, &caller, vec![])?;
    assert_eq!(result.get(0, "x"), Some(&Value::Int(1)));

    let snooper = Procedure::new("snooper")
        .returns(vec![("x", DataType::INT)])
        .body(vec![
            Statement::assign("x", lit(1)),
            Statement::ret(vec![Expression::call("peek", vec![])]),
        ]);
    assert_eq!(
        run_in(&schema, &snooper, vec![]),
        Err(InterpreterError::VariableNotFound("x".to_string()))
    );
    Ok(())
}

#[test]
fn test_call_receivers() -> Result<()> {
    let schema = Schema::with_procedures("main", vec![pair()])?;
    let caller = Procedure::new("caller")
        .returns(vec![("number", DataType::INT), ("word", DataType::TEXT)])
        .body(vec![
            Statement::call(vec![Some("n"), None], "pair", vec![]),
            Statement::call(vec![None, Some("w")], "pair", vec![]),
            Statement::ret(vec![var("n"), var("w")]),
        ]);

    let result = run_in(&schema, &caller, vec![])?;
    assert_eq!(result.get(0, "number"), Some(&Value::Int(1)));
    assert_eq!(result.get(0, "word"), Some(&Value::from("one")));

    let too_many = Procedure::new("greedy").body(vec![Statement::call(
        vec![Some("a"), Some("b"), Some("c")],
        "pair",
        vec![],
    )]);
    assert!(matches!(
        run_in(&schema, &too_many, vec![]),
        Err(InterpreterError::PlanningError(_))
    ));

    let builtin = Procedure::new("greedy").body(vec![Statement::call(
        vec![Some("a"), Some("b")],
        "abs",
        vec![lit(-1)],
    )]);
    assert!(matches!(
        run_in(&schema, &builtin, vec![]),
        Err(InterpreterError::PlanningError(_))
    ));
    Ok(())
}

#[test]
fn test_builtin_result_bound_to_receiver() -> Result<()> {
    let procedure = Procedure::new("shout")
        .returns(vec![("loud", DataType::TEXT)])
        .body(vec![
            Statement::call(vec![Some("loud")], "upper", vec![Expression::literal("hey")]),
            Statement::ret(vec![var("loud")]),
        ]);

    let result = run_in(&Schema::new("main"), &procedure, vec![])?;
    assert_eq!(result.get(0, "loud"), Some(&Value::from("HEY")));
    Ok(())
}

#[test]
fn test_expression_call_needs_single_value() -> Result<()> {
    let schema = Schema::with_procedures("main", vec![pair()])?;
    let caller = Procedure::new("caller")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::call("pair", vec![])])]);

    assert!(matches!(
        run_in(&schema, &caller, vec![]),
        Err(InterpreterError::PlanningError(_))
    ));
    Ok(())
}

#[test]
fn test_loop_over_procedure_rows() -> Result<()> {
    let squares = Procedure::new("squares")
        .param("n", DataType::INT)
        .returns_table(vec![("base", DataType::INT), ("square", DataType::INT)])
        .body(vec![Statement::for_range(
            "i",
            lit(1),
            var("n"),
            vec![Statement::ret_next(vec![
                var("i"),
                Expression::arithmetic(var("i"), ArithmeticOperator::Multiply, var("i")),
            ])],
        )]);
    let schema = Schema::with_procedures("main", vec![squares])?;

    let caller = Procedure::new("caller")
        .returns_table(vec![("square", DataType::INT)])
        .body(vec![Statement::for_call(
            "row",
            "squares",
            vec![lit(4)],
            vec![Statement::ret_next(vec![Expression::field(var("row"), "square")])],
        )]);

    let result = run_in(&schema, &caller, vec![])?;
    assert_eq!(column(&result, "square"), common::ints(&[1, 4, 9, 16]));
    Ok(())
}

#[test]
fn test_schema_procedure_shadows_builtin() -> Result<()> {
    let upper = Procedure::new("upper")
        .param("s", DataType::TEXT)
        .returns(vec![("value", DataType::TEXT)])
        .body(vec![Statement::ret(vec![Expression::literal("shadowed")])]);
    let schema = Schema::with_procedures("main", vec![upper])?;
    let caller = Procedure::new("caller")
        .returns(vec![("value", DataType::TEXT)])
        .body(vec![Statement::ret(vec![Expression::call(
            "upper",
            vec![Expression::literal("x")],
        )])]);

    let result = run_in(&schema, &caller, vec![])?;
    assert_eq!(result.get(0, "value"), Some(&Value::from("shadowed")));
    Ok(())
}

#[test]
fn test_callee_argument_types_are_checked() -> Result<()> {
    let schema = Schema::with_procedures("main", vec![factorial()])?;
    let caller = Procedure::new("caller")
        .returns(vec![("value", DataType::INT)])
        .body(vec![Statement::ret(vec![Expression::call(
            "factorial",
            vec![Expression::literal("five")],
        )])]);

    assert!(matches!(
        run_in(&schema, &caller, vec![]),
        Err(InterpreterError::ArgumentType { position: 1, .. })
    ));
    Ok(())
}

#[test]
fn test_callee_errors_propagate() -> Result<()> {
    let missing = Procedure::new("missing").returns(vec![("value", DataType::INT)]);
    let schema = Schema::with_procedures("main", vec![missing])?;
    let caller = Procedure::new("caller").body(vec![Statement::call(vec![], "missing", vec![])]);

    assert_eq!(run_in(&schema, &caller, vec![]), Err(InterpreterError::MissingReturn));
    Ok(())
}
