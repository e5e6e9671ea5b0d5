use std::sync::Arc;

use anyhow::Result;

use kuneiform::query::parser::ast::{ArithmeticOperator, ComparisonOperator};
use kuneiform::{
    CancelToken, CostTable, DataType, Expression, FunctionRegistry, Interpreter, Procedure, Schema, Statement,
    Value,
};

fn main() -> Result<()> {
    // Emits the first $n Fibonacci numbers, one row each
    let fibonacci = Procedure::new("fibonacci")
        .param("n", DataType::INT)
        .returns_table(vec![("position", DataType::INT), ("value", DataType::INT)])
        .body(vec![
            Statement::assign("prev", Expression::literal(0)),
            Statement::assign("curr", Expression::literal(1)),
            Statement::for_range(
                "i",
                Expression::literal(1),
                Expression::variable("n"),
                vec![
                    Statement::ret_next(vec![Expression::variable("i"), Expression::variable("curr")]),
                    Statement::assign(
                        "next",
                        Expression::arithmetic(
                            Expression::variable("prev"),
                            ArithmeticOperator::Add,
                            Expression::variable("curr"),
                        ),
                    ),
                    Statement::assign("prev", Expression::variable("curr")),
                    Statement::assign("curr", Expression::variable("next")),
                    Statement::if_then(
                        Expression::compare(
                            Expression::variable("curr"),
                            ComparisonOperator::GreaterThan,
                            Expression::literal(1_000),
                        ),
                        vec![
                            Statement::call(
                                vec![],
                                "notice",
                                vec![Expression::literal("stopping above 1000")],
                            ),
                            Statement::Break,
                        ],
                    ),
                ],
            ),
        ]);

    let schema = Schema::with_procedures("main", vec![fibonacci.clone()])?;
    let interpreter = Interpreter::new(Arc::new(FunctionRegistry::with_builtins()));
    let cancel = CancelToken::new();

    let result = interpreter.run(
        &cancel,
        &fibonacci,
        &schema,
        vec![Value::Int(20)],
        100_000,
        &CostTable::default(),
    )?;

    println!("{}", result.to_string_table());
    for notice in &result.notices {
        println!("NOTICE: {}", notice);
    }
    println!("Cost spent: {}", result.cost_spent);

    Ok(())
}
