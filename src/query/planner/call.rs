// Function and Procedure Calls
//
// Names resolve at compile time: schema procedures first, then the function
// registry. Built-ins are captured by value. Procedures are reached through
// their late-bound slot and run in a fresh root scope with their rows
// collected in memory.

use std::sync::{Arc, Weak};

use once_cell::sync::OnceCell;

use crate::catalog::ProcedureReturn;
use crate::common::types::DataType;
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::functions::{FunctionDefinition, ScalarFunction};
use crate::query::parser::ast::FunctionCall;
use crate::query::planner::expression::evaluate_all;
use crate::query::planner::loops::ValuesSource;
use crate::query::planner::{
    expr_fn, loop_fn, stmt_fn, CompiledProcedure, ExprFn, LoopTermFn, Planner, StatementOutcome, StmtFn,
};
use crate::query::value::{RecordValue, Value};

enum Callee {
    Procedure {
        name: String,
        slot: Weak<OnceCell<CompiledProcedure>>,
        returns: Option<ProcedureReturn>,
    },
    Builtin {
        name: String,
        function: ScalarFunction,
    },
}

impl<'a> Planner<'a> {
    fn resolve_callee(&mut self, name: &str) -> InterpreterResult<Callee> {
        if let Some((slot, returns)) = self.find_procedure(name) {
            return Ok(Callee::Procedure {
                name: name.to_string(),
                slot: Arc::downgrade(&slot),
                returns,
            });
        }
        match self.registry.get(name) {
            Some(FunctionDefinition::Scalar(function)) => Ok(Callee::Builtin {
                name: name.to_string(),
                function: *function,
            }),
            Some(FunctionDefinition::Aggregate(_)) => Err(InterpreterError::AggregateInProcedure(name.to_string())),
            None => Err(InterpreterError::UnknownFunction(name.to_string())),
        }
    }

    fn compile_arguments(&mut self, call: &FunctionCall) -> InterpreterResult<Vec<ExprFn>> {
        call.args.iter().map(|arg| self.compile_expression(arg)).collect()
    }

    /// A call used as a value. Procedures must return exactly one field.
    pub(crate) fn compile_call_expression(&mut self, call: &FunctionCall) -> InterpreterResult<ExprFn> {
        let callee = self.resolve_callee(&call.name)?;
        let args = self.compile_arguments(call)?;
        match callee {
            Callee::Builtin { name, function } => Ok(expr_fn(move |ctx| {
                ctx.spend(ctx.costs().call_builtin_function_cost)?;
                let values = evaluate_all(&args, ctx)?;
                invoke_builtin(ctx, &name, &function, values)
            })),
            Callee::Procedure { name, slot, returns } => {
                match &returns {
                    Some(returns) if !returns.is_table && returns.fields.len() == 1 => {}
                    _ => {
                        return Err(InterpreterError::PlanningError(format!(
                            "procedure {} must return a single value to be used in an expression",
                            name
                        )))
                    }
                }
                Ok(expr_fn(move |ctx| {
                    ctx.spend(ctx.costs().call_procedure_cost)?;
                    let values = evaluate_all(&args, ctx)?;
                    let rows = invoke_procedure(ctx, &name, &slot, values)?;
                    rows.into_iter()
                        .next()
                        .and_then(|row| row.into_iter().next())
                        .ok_or(InterpreterError::MissingReturn)
                }))
            }
        }
    }

    /// A call statement, optionally assigning the returned row to receivers
    pub(crate) fn compile_call_statement(
        &mut self,
        receivers: &[Option<String>],
        call: &FunctionCall,
    ) -> InterpreterResult<StmtFn> {
        let callee = self.resolve_callee(&call.name)?;
        let args = self.compile_arguments(call)?;
        let receivers = receivers.to_vec();

        match callee {
            Callee::Builtin { name, function } => {
                if receivers.len() > 1 {
                    return Err(InterpreterError::PlanningError(format!(
                        "function {} returns one value, {} receivers given",
                        name,
                        receivers.len()
                    )));
                }
                Ok(stmt_fn(move |ctx, _| {
                    ctx.spend(ctx.costs().call_builtin_function_cost)?;
                    let values = evaluate_all(&args, ctx)?;
                    let result = invoke_builtin(ctx, &name, &function, values)?;
                    if let Some(Some(receiver)) = receivers.first() {
                        ctx.set_variable(receiver, result)?;
                    }
                    Ok(StatementOutcome::Continue)
                }))
            }
            Callee::Procedure { name, slot, returns } => {
                if !receivers.is_empty() {
                    check_receivers(&name, returns.as_ref(), receivers.len())?;
                }
                Ok(stmt_fn(move |ctx, _| {
                    ctx.spend(ctx.costs().call_procedure_cost)?;
                    let values = evaluate_all(&args, ctx)?;
                    let rows = invoke_procedure(ctx, &name, &slot, values)?;
                    if receivers.is_empty() {
                        return Ok(StatementOutcome::Continue);
                    }
                    let row = rows.into_iter().next().ok_or(InterpreterError::MissingReturn)?;
                    for (receiver, value) in receivers.iter().zip(row) {
                        if let Some(receiver) = receiver {
                            ctx.set_variable(receiver, value)?;
                        }
                    }
                    Ok(StatementOutcome::Continue)
                }))
            }
        }
    }

    /// Iterate over the rows of a procedure, each bound as a record
    pub(crate) fn compile_loop_call(&mut self, call: &FunctionCall) -> InterpreterResult<LoopTermFn> {
        let callee = self.resolve_callee(&call.name)?;
        let args = self.compile_arguments(call)?;
        let (name, slot, returns) = match callee {
            Callee::Procedure { name, slot, returns } => (name, slot, returns),
            Callee::Builtin { name, .. } => {
                return Err(InterpreterError::PlanningError(format!(
                    "cannot loop over function {}; only procedures return rows",
                    name
                )))
            }
        };
        let fields: Vec<String> = match returns {
            Some(returns) => returns.fields.into_iter().map(|f| f.name).collect(),
            None => {
                return Err(InterpreterError::PlanningError(format!(
                    "procedure {} returns nothing to loop over",
                    name
                )))
            }
        };

        Ok(loop_fn(move |ctx| {
            ctx.spend(ctx.costs().call_procedure_cost)?;
            let values = evaluate_all(&args, ctx)?;
            let rows = invoke_procedure(ctx, &name, &slot, values)?;
            let records = rows
                .into_iter()
                .map(|row| RecordValue::from_fields(fields.iter().cloned().zip(row)).map(Value::Record))
                .collect::<InterpreterResult<Vec<_>>>()?;
            Ok(Box::new(ValuesSource::new(records)))
        }))
    }
}

fn check_receivers(name: &str, returns: Option<&ProcedureReturn>, receivers: usize) -> InterpreterResult<()> {
    match returns {
        None => Err(InterpreterError::PlanningError(format!(
            "procedure {} returns nothing to assign",
            name
        ))),
        Some(returns) if returns.is_table => Err(InterpreterError::PlanningError(format!(
            "procedure {} returns a table and cannot be assigned",
            name
        ))),
        Some(returns) if receivers > returns.fields.len() => Err(InterpreterError::PlanningError(format!(
            "procedure {} returns {} values, {} receivers given",
            name,
            returns.fields.len(),
            receivers
        ))),
        Some(_) => Ok(()),
    }
}

/// Validate, then evaluate a built-in. NULL-propagating built-ins skip evaluation.
fn invoke_builtin(
    ctx: &mut ExecutionContext,
    name: &str,
    function: &ScalarFunction,
    args: Vec<Value>,
) -> InterpreterResult<Value> {
    let types: Vec<DataType> = args.iter().map(Value::data_type).collect();
    let return_type = (function.validate_args)(&types).map_err(|e| InterpreterError::FunctionArguments {
        name: name.to_string(),
        reason: e.to_string(),
    })?;
    if function.null_on_null_input && args.iter().any(Value::is_null) {
        return Ok(Value::Null(return_type));
    }
    (function.evaluate)(ctx, &args)
}

/// Run a procedure in its own root scope and return the rows it produced
fn invoke_procedure(
    ctx: &mut ExecutionContext,
    name: &str,
    slot: &Weak<OnceCell<CompiledProcedure>>,
    args: Vec<Value>,
) -> InterpreterResult<Vec<Vec<Value>>> {
    let slot = slot
        .upgrade()
        .ok_or_else(|| InterpreterError::ExecutionError(format!("procedure {} is no longer loaded", name)))?;
    let callee = slot
        .get()
        .ok_or_else(|| InterpreterError::PlanningError(format!("procedure {} was not compiled", name)))?;

    ctx.with_call_frame(|ctx| {
        callee.bind_arguments(ctx, args)?;
        let mut rows: Vec<Vec<Value>> = Vec::new();
        callee.execute(ctx, &mut rows)?;
        for (count, row) in rows.iter().enumerate() {
            callee.admit_row(count + 1)?;
            callee.check_row(row)?;
        }
        callee.check_row_total(rows.len())?;
        Ok(rows)
    })
}
