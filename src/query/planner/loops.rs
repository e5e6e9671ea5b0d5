// Loop Terms
//
// A `for` loop pulls values from a source opened when the loop starts. Ranges
// are generated lazily; arrays and query results are materialized first.

use std::vec::IntoIter;

use crate::query::executor::context::ExecutionContext;
use crate::query::executor::cursor::RowSink;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::parser::ast::{LoopTerm, Statement};
use crate::query::planner::statement::sql_parameters;
use crate::query::planner::{execute_block, loop_fn, stmt_fn, LoopTermFn, Planner, StatementOutcome, StmtFn};
use crate::query::value::Value;

/// Values a loop iterates over
pub trait LoopSource {
    fn next(&mut self) -> InterpreterResult<Option<Value>>;

    /// Release the source. Called on every exit path of the loop.
    fn close(&mut self) -> InterpreterResult<()> {
        Ok(())
    }
}

/// Inclusive ascending integer range
pub struct RangeSource {
    next: Option<i64>,
    end: i64,
}

impl RangeSource {
    pub fn new(start: i64, end: i64) -> Self {
        Self { next: Some(start), end }
    }
}

impl LoopSource for RangeSource {
    fn next(&mut self) -> InterpreterResult<Option<Value>> {
        match self.next {
            Some(current) if current <= self.end => {
                self.next = current.checked_add(1);
                Ok(Some(Value::Int(current)))
            }
            _ => Ok(None),
        }
    }
}

/// Values already held in memory
pub struct ValuesSource {
    values: IntoIter<Value>,
}

impl ValuesSource {
    pub fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
        }
    }
}

impl LoopSource for ValuesSource {
    fn next(&mut self) -> InterpreterResult<Option<Value>> {
        Ok(self.values.next())
    }
}

fn range_bound(value: Value, which: &str) -> InterpreterResult<i64> {
    match value {
        Value::Int(i) => Ok(i),
        other => Err(InterpreterError::TypeError(format!(
            "loop range {} must be int, got {}",
            which,
            other.data_type()
        ))),
    }
}

impl<'a> Planner<'a> {
    pub(crate) fn compile_loop_term(&mut self, term: &LoopTerm) -> InterpreterResult<LoopTermFn> {
        match term {
            LoopTerm::Range { start, end } => {
                let start_fn = self.compile_expression(start)?;
                let end_fn = self.compile_expression(end)?;
                Ok(loop_fn(move |ctx| {
                    let start = range_bound(start_fn(ctx)?, "start")?;
                    let end = range_bound(end_fn(ctx)?, "end")?;
                    Ok(Box::new(RangeSource::new(start, end)))
                }))
            }
            LoopTerm::Variable(name) => {
                let name = name.clone();
                Ok(loop_fn(move |ctx| {
                    let elements = match ctx.get_variable(&name)? {
                        Value::Array(array) => array.into_elements(),
                        Value::Null(_) => Vec::new(),
                        other => {
                            return Err(InterpreterError::TypeError(format!(
                                "cannot loop over {} of type {}",
                                name,
                                other.data_type()
                            )))
                        }
                    };
                    Ok(Box::new(ValuesSource::new(elements)))
                }))
            }
            LoopTerm::Sql(statement) => {
                let statement = statement.clone();
                Ok(loop_fn(move |ctx| {
                    ctx.spend(ctx.costs().sql_statement_cost)?;
                    let engine = ctx.sql_engine()?;
                    let parameters = sql_parameters(ctx, &statement)?;
                    let records = engine.query(&statement, &parameters)?;
                    let values = records.into_iter().map(Value::Record).collect();
                    Ok(Box::new(ValuesSource::new(values)))
                }))
            }
            LoopTerm::Call(call) => self.compile_loop_call(call),
        }
    }

    pub(crate) fn compile_for_loop(
        &mut self,
        receiver: &str,
        term: &LoopTerm,
        body: &[Statement],
    ) -> InterpreterResult<StmtFn> {
        let source_fn = self.compile_loop_term(term)?;
        self.loop_depth += 1;
        let body = self.compile_block(body);
        self.loop_depth -= 1;
        let body = body?;
        let receiver = receiver.to_string();

        Ok(stmt_fn(move |ctx, sink| {
            let mut source = source_fn(ctx)?;
            let outcome = run_loop(&receiver, &body, source.as_mut(), ctx, sink);
            let closed = source.close();
            let outcome = outcome?;
            closed?;
            Ok(outcome)
        }))
    }
}

fn run_loop(
    receiver: &str,
    body: &[StmtFn],
    source: &mut dyn LoopSource,
    ctx: &mut ExecutionContext,
    sink: &mut dyn RowSink,
) -> InterpreterResult<StatementOutcome> {
    while let Some(value) = source.next()? {
        ctx.spend(ctx.costs().loop_cost)?;
        let outcome = ctx.with_sub_scope(|ctx| {
            ctx.allocate_variable(receiver, value)?;
            execute_block(body, ctx, sink)
        })?;
        match outcome {
            StatementOutcome::Continue | StatementOutcome::Continued => {}
            StatementOutcome::Broken => return Ok(StatementOutcome::Continue),
            StatementOutcome::Returned => return Ok(StatementOutcome::Returned),
        }
    }
    Ok(StatementOutcome::Continue)
}
