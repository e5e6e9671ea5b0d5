// Statement Compilation
//
// Statements report how they finished through `StatementOutcome`; `break`,
// `continue` and `return` unwind as values, never as errors. Branch bodies run in their own
// frame.

use crate::common::types::DataType;
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::executor::sql::SqlParameters;
use crate::query::parser::ast::{AssignTarget, Expression, SqlStatement, Statement};
use crate::query::planner::expression::evaluate_all;
use crate::query::planner::{execute_block, stmt_fn, ExprFn, Planner, StatementOutcome, StmtFn};
use crate::query::value::array::check_growth;
use crate::query::value::{ArrayValue, Value};

impl<'a> Planner<'a> {
    pub(crate) fn compile_statement(&mut self, stmt: &Statement) -> InterpreterResult<StmtFn> {
        match stmt {
            Statement::Declaration { variable, data_type } => {
                let variable = variable.clone();
                let data_type = *data_type;
                Ok(stmt_fn(move |ctx, _| {
                    ctx.allocate_variable(&variable, Value::Null(data_type))?;
                    Ok(StatementOutcome::Continue)
                }))
            }
            Statement::Assignment {
                target: AssignTarget::Variable(variable),
                value,
            } => {
                let value_fn = self.compile_expression(value)?;
                let variable = variable.clone();
                Ok(stmt_fn(move |ctx, _| {
                    let value = value_fn(ctx)?;
                    ctx.set_variable(&variable, value)?;
                    Ok(StatementOutcome::Continue)
                }))
            }
            Statement::Assignment {
                target: AssignTarget::ArrayElement { variable, index },
                value,
            } => self.compile_element_assignment(variable, index, value),
            Statement::Call { receivers, call } => self.compile_call_statement(receivers, call),
            Statement::ForLoop { receiver, term, body } => self.compile_for_loop(receiver, term, body),
            Statement::If { branches, else_body } => {
                let mut compiled = Vec::with_capacity(branches.len());
                for branch in branches {
                    let condition = self.compile_expression(&branch.condition)?;
                    let body = self.compile_block(&branch.body)?;
                    compiled.push((condition, body));
                }
                let else_body = else_body.as_deref().map(|body| self.compile_block(body)).transpose()?;

                Ok(stmt_fn(move |ctx, sink| {
                    for (condition, body) in &compiled {
                        if branch_taken(condition(ctx)?)? {
                            return ctx.with_sub_scope(|ctx| execute_block(body, ctx, sink));
                        }
                    }
                    match &else_body {
                        Some(body) => ctx.with_sub_scope(|ctx| execute_block(body, ctx, sink)),
                        None => Ok(StatementOutcome::Continue),
                    }
                }))
            }
            Statement::Sql(statement) => {
                let statement = statement.clone();
                Ok(stmt_fn(move |ctx, _| {
                    ctx.spend(ctx.costs().sql_statement_cost)?;
                    let engine = ctx.sql_engine()?;
                    let parameters = sql_parameters(ctx, &statement)?;
                    engine.execute(&statement, &parameters)?;
                    Ok(StatementOutcome::Continue)
                }))
            }
            Statement::Break => {
                if self.loop_depth == 0 {
                    return Err(InterpreterError::PlanningError("break outside of a loop".to_string()));
                }
                Ok(stmt_fn(|ctx, _| {
                    ctx.spend(ctx.costs().break_cost)?;
                    Ok(StatementOutcome::Broken)
                }))
            }
            Statement::Continue => {
                if self.loop_depth == 0 {
                    return Err(InterpreterError::PlanningError("continue outside of a loop".to_string()));
                }
                Ok(stmt_fn(|ctx, _| {
                    ctx.spend(ctx.costs().break_cost)?;
                    Ok(StatementOutcome::Continued)
                }))
            }
            Statement::Return { values } => {
                let value_fns = self.compile_values(values)?;
                Ok(stmt_fn(move |ctx, sink| {
                    ctx.spend(ctx.costs().return_cost)?;
                    let row = evaluate_all(&value_fns, ctx)?;
                    if !row.is_empty() {
                        sink.emit(row)?;
                    }
                    Ok(StatementOutcome::Returned)
                }))
            }
            Statement::ReturnNext { values } => {
                let value_fns = self.compile_values(values)?;
                Ok(stmt_fn(move |ctx, sink| {
                    ctx.spend(ctx.costs().return_cost)?;
                    let row = evaluate_all(&value_fns, ctx)?;
                    sink.emit(row)?;
                    Ok(StatementOutcome::Continue)
                }))
            }
            Statement::ReturnQuery(statement) => {
                let statement = statement.clone();
                Ok(stmt_fn(move |ctx, sink| {
                    ctx.spend(ctx.costs().return_cost)?;
                    ctx.spend(ctx.costs().sql_statement_cost)?;
                    let engine = ctx.sql_engine()?;
                    let parameters = sql_parameters(ctx, &statement)?;
                    for record in engine.query(&statement, &parameters)? {
                        sink.emit(record.into_values())?;
                    }
                    Ok(StatementOutcome::Returned)
                }))
            }
        }
    }

    fn compile_values(&mut self, values: &[Expression]) -> InterpreterResult<Vec<ExprFn>> {
        values.iter().map(|v| self.compile_expression(v)).collect()
    }

    /// `$arr[i] := value`, writing into the stored array in place
    fn compile_element_assignment(
        &mut self,
        variable: &str,
        index: &Expression,
        value: &Expression,
    ) -> InterpreterResult<StmtFn> {
        let index_fn = self.compile_expression(index)?;
        let value_fn = self.compile_expression(value)?;
        let variable = variable.to_string();

        Ok(stmt_fn(move |ctx, _| {
            let index = match index_fn(ctx)? {
                Value::Int(i) => i,
                other => {
                    return Err(InterpreterError::TypeError(format!(
                        "array index must be int, got {}",
                        other.data_type()
                    )))
                }
            };
            let value = value_fn(ctx)?;
            check_growth(index)?;
            let cost = ctx
                .costs()
                .array_access_cost
                .saturating_add(ctx.costs().set_variable_cost)
                .saturating_add(ctx.size_cost(&value)?);
            ctx.spend(cost)?;

            let length = stored_array_length(ctx, &variable)?;
            if index > length {
                // Growing the array writes NULL into every skipped position
                let grown = index - length;
                ctx.spend(ctx.costs().array_access_cost.saturating_mul(grown))?;
            }

            let slot = ctx.variable_mut(&variable)?;
            if let Value::Null(t) = slot {
                let element = t.element_type().unwrap_or(DataType::NULL);
                *slot = Value::Array(ArrayValue::empty(element)?);
            }
            match slot {
                Value::Array(array) => array.set(index, value)?,
                other => {
                    return Err(InterpreterError::TypeError(format!(
                        "{} is not an array",
                        other.data_type()
                    )))
                }
            }
            Ok(StatementOutcome::Continue)
        }))
    }
}

/// Length of the array stored in `variable`; a NULL array counts as empty
fn stored_array_length(ctx: &mut ExecutionContext, variable: &str) -> InterpreterResult<i64> {
    match ctx.variable_mut(variable)? {
        Value::Array(array) => Ok(array.len() as i64),
        Value::Null(t) if t.is_array => Ok(0),
        other => Err(InterpreterError::TypeError(format!(
            "cannot assign an element of {} ({})",
            variable,
            other.data_type()
        ))),
    }
}

/// Only a non-null TRUE takes a branch
fn branch_taken(condition: Value) -> InterpreterResult<bool> {
    match condition {
        Value::Bool(b) => Ok(b),
        Value::Null(t) if t.equals_strict(&DataType::BOOL) || t.is_untyped_null() => Ok(false),
        other => Err(InterpreterError::TypeError(format!(
            "condition must be bool, got {}",
            other.data_type()
        ))),
    }
}

/// Read the variables a SQL statement references, in order
pub(crate) fn sql_parameters(ctx: &mut ExecutionContext, statement: &SqlStatement) -> InterpreterResult<SqlParameters> {
    statement
        .parameters
        .iter()
        .map(|name| Ok((name.clone(), ctx.get_variable(name)?)))
        .collect()
}
