// Procedure Planner
//
// Compiles procedure bodies into trees of closures, once per procedure. Each
// closure is built from its already compiled children, so executing a body
// never inspects the syntax tree again.
//
// Calls between procedures are linked late: every procedure a body refers to
// gets a slot that is filled once its own body has been compiled. Closures
// reach their callee through a weak handle; the compiled program owns the
// slots, which lets procedures call themselves without leaking.

pub mod call;
pub mod expression;
pub mod loops;
pub mod statement;

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;
use once_cell::sync::OnceCell;

use crate::catalog::{NamedType, Procedure, ProcedureReturn, Schema};
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::cursor::RowSink;
use crate::query::executor::result::{InterpreterError, InterpreterResult, NamedValue};
use crate::query::functions::FunctionRegistry;
use crate::query::parser::ast::Statement;
use crate::query::value::Value;

pub use self::loops::LoopSource;

/// A compiled expression
pub type ExprFn = Box<dyn Fn(&mut ExecutionContext) -> InterpreterResult<Value> + Send + Sync>;

/// A compiled statement. Rows produced by `return` go to the sink.
pub type StmtFn =
    Box<dyn Fn(&mut ExecutionContext, &mut dyn RowSink) -> InterpreterResult<StatementOutcome> + Send + Sync>;

/// A compiled loop term, opened once per loop execution
pub type LoopTermFn = Box<dyn Fn(&mut ExecutionContext) -> InterpreterResult<Box<dyn LoopSource>> + Send + Sync>;

pub(crate) fn expr_fn<F>(f: F) -> ExprFn
where
    F: Fn(&mut ExecutionContext) -> InterpreterResult<Value> + Send + Sync + 'static,
{
    Box::new(f)
}

pub(crate) fn stmt_fn<F>(f: F) -> StmtFn
where
    F: Fn(&mut ExecutionContext, &mut dyn RowSink) -> InterpreterResult<StatementOutcome> + Send + Sync + 'static,
{
    Box::new(f)
}

pub(crate) fn loop_fn<F>(f: F) -> LoopTermFn
where
    F: Fn(&mut ExecutionContext) -> InterpreterResult<Box<dyn LoopSource>> + Send + Sync + 'static,
{
    Box::new(f)
}

/// How a statement finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementOutcome {
    /// Carry on with the next statement
    Continue,
    /// A `break` is unwinding to the nearest loop
    Broken,
    /// A `continue` is unwinding to the nearest loop, which starts its next iteration
    Continued,
    /// A `return` is unwinding out of the procedure
    Returned,
}

type ProcedureSlot = Arc<OnceCell<CompiledProcedure>>;

/// A procedure ready to run
pub struct CompiledProcedure {
    name: String,
    parameters: Vec<NamedType>,
    returns: Option<ProcedureReturn>,
    body: Vec<StmtFn>,
}

impl CompiledProcedure {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[NamedType] {
        &self.parameters
    }

    pub fn returns(&self) -> Option<&ProcedureReturn> {
        self.returns.as_ref()
    }

    /// Check arguments against the declared parameters and bind them in the
    /// current frame. Nothing is bound unless every argument matches.
    pub fn bind_arguments(&self, ctx: &mut ExecutionContext, args: Vec<Value>) -> InterpreterResult<()> {
        if args.len() != self.parameters.len() {
            return Err(InterpreterError::ArgumentCount {
                expected: self.parameters.len(),
                got: args.len(),
            });
        }
        for (position, (param, arg)) in self.parameters.iter().zip(&args).enumerate() {
            let got = arg.data_type();
            if !got.equals_strict(&param.data_type) {
                return Err(InterpreterError::ArgumentType {
                    position: position + 1,
                    name: param.name.clone(),
                    expected: param.data_type,
                    got,
                });
            }
        }
        for (param, arg) in self.parameters.iter().zip(args) {
            ctx.allocate_variable(&param.name, arg)?;
        }
        Ok(())
    }

    /// Run the body against arguments already bound in `ctx`
    pub fn execute(&self, ctx: &mut ExecutionContext, sink: &mut dyn RowSink) -> InterpreterResult<()> {
        execute_block(&self.body, ctx, sink).map(|_| ())
    }

    /// Whether the procedure may produce its `count`-th row (1-based)
    pub fn admit_row(&self, count: usize) -> InterpreterResult<()> {
        match &self.returns {
            None => Err(InterpreterError::UnexpectedReturn),
            Some(returns) if !returns.is_table && count > 1 => Err(InterpreterError::UnexpectedReturn),
            Some(_) => Ok(()),
        }
    }

    /// Whether `count` rows in total satisfy the declared return
    pub fn check_row_total(&self, count: usize) -> InterpreterResult<()> {
        match &self.returns {
            Some(returns) if !returns.is_table && count == 0 => Err(InterpreterError::MissingReturn),
            _ => Ok(()),
        }
    }

    /// Check a row against the declared return fields. NULL fits any field.
    pub fn check_row(&self, row: &[Value]) -> InterpreterResult<()> {
        let returns = self.returns.as_ref().ok_or(InterpreterError::UnexpectedReturn)?;
        if row.len() != returns.fields.len() {
            return Err(InterpreterError::ReturnShape(format!(
                "procedure {} returns {} fields, got {}",
                self.name,
                returns.fields.len(),
                row.len()
            )));
        }
        for (field, value) in returns.fields.iter().zip(row) {
            if !value.is_null() && !value.data_type().equals_strict(&field.data_type) {
                return Err(InterpreterError::ReturnShape(format!(
                    "field {} of procedure {} is {}, got {}",
                    field.name,
                    self.name,
                    field.data_type,
                    value.data_type()
                )));
            }
        }
        Ok(())
    }

    /// Pair a row with the declared return field names
    pub fn name_row(&self, row: Vec<Value>) -> InterpreterResult<Vec<NamedValue>> {
        self.check_row(&row)?;
        let fields = self.returns.as_ref().map(|r| r.fields.as_slice()).unwrap_or_default();
        Ok(fields
            .iter()
            .zip(row)
            .map(|(field, value)| NamedValue::new(field.name.clone(), value))
            .collect())
    }
}

/// An entry procedure together with every procedure it can reach
pub struct CompiledProgram {
    entry: ProcedureSlot,
    linked: Vec<ProcedureSlot>,
}

impl CompiledProgram {
    pub fn entry(&self) -> InterpreterResult<&CompiledProcedure> {
        self.entry
            .get()
            .ok_or_else(|| InterpreterError::PlanningError("entry procedure was not compiled".to_string()))
    }

    /// Number of procedures compiled, including the entry
    pub fn procedure_count(&self) -> usize {
        self.linked.len()
    }
}

struct LinkedProcedure {
    slot: ProcedureSlot,
    returns: Option<ProcedureReturn>,
}

/// Builds closures for one entry procedure and its callees
pub struct Planner<'a> {
    registry: &'a FunctionRegistry,
    schema: &'a Schema,
    linked: HashMap<String, LinkedProcedure>,
    pending: Vec<String>,
    loop_depth: usize,
}

impl<'a> Planner<'a> {
    pub fn new(registry: &'a FunctionRegistry, schema: &'a Schema) -> Self {
        Self {
            registry,
            schema,
            linked: HashMap::new(),
            pending: Vec::new(),
            loop_depth: 0,
        }
    }

    /// Compile `procedure` and every schema procedure it calls, directly or not
    pub fn compile(mut self, procedure: &Procedure) -> InterpreterResult<CompiledProgram> {
        let entry = self.link(procedure);
        let compiled = self.compile_procedure(procedure)?;
        fill_slot(&entry, compiled)?;

        let schema = self.schema;
        while let Some(key) = self.pending.pop() {
            let callee = schema
                .find_procedure(&key)
                .ok_or_else(|| InterpreterError::ProcedureNotFound(key.clone()))?;
            let slot = self.slot(&key)?;
            let compiled = self.compile_procedure(callee)?;
            fill_slot(&slot, compiled)?;
        }

        let linked = self.linked.into_values().map(|l| l.slot).collect();
        Ok(CompiledProgram { entry, linked })
    }

    fn compile_procedure(&mut self, procedure: &Procedure) -> InterpreterResult<CompiledProcedure> {
        procedure.validate()?;
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        let body = self.compile_block(&procedure.body);
        self.loop_depth = outer_loops;
        let body = body?;

        debug!(
            "Compiled procedure {} ({} parameters, {} statements)",
            procedure.name,
            procedure.parameters.len(),
            body.len()
        );
        Ok(CompiledProcedure {
            name: procedure.name.clone(),
            parameters: procedure.parameters.clone(),
            returns: procedure.returns.clone(),
            body,
        })
    }

    /// Give `procedure` a slot, keyed case-insensitively like schema lookups
    fn link(&mut self, procedure: &Procedure) -> ProcedureSlot {
        let key = procedure.name.to_lowercase();
        let slot = Arc::new(OnceCell::new());
        self.linked.insert(
            key,
            LinkedProcedure {
                slot: Arc::clone(&slot),
                returns: procedure.returns.clone(),
            },
        );
        slot
    }

    fn slot(&self, key: &str) -> InterpreterResult<ProcedureSlot> {
        self.linked
            .get(key)
            .map(|l| Arc::clone(&l.slot))
            .ok_or_else(|| InterpreterError::ProcedureNotFound(key.to_string()))
    }

    /// Find a procedure by name, linking schema procedures on first use
    fn find_procedure(&mut self, name: &str) -> Option<(ProcedureSlot, Option<ProcedureReturn>)> {
        let key = name.to_lowercase();
        if let Some(linked) = self.linked.get(&key) {
            return Some((Arc::clone(&linked.slot), linked.returns.clone()));
        }
        let schema = self.schema;
        let procedure = schema.find_procedure(&key)?;
        let slot = self.link(procedure);
        self.pending.push(key);
        Some((slot, procedure.returns.clone()))
    }

    pub(crate) fn compile_block(&mut self, statements: &[Statement]) -> InterpreterResult<Vec<StmtFn>> {
        statements.iter().map(|stmt| self.compile_statement(stmt)).collect()
    }
}

fn fill_slot(slot: &ProcedureSlot, compiled: CompiledProcedure) -> InterpreterResult<()> {
    let name = compiled.name.clone();
    slot.set(compiled)
        .map_err(|_| InterpreterError::PlanningError(format!("procedure {} compiled twice", name)))
}

/// Run statements in order until one does not continue
pub(crate) fn execute_block(
    body: &[StmtFn],
    ctx: &mut ExecutionContext,
    sink: &mut dyn RowSink,
) -> InterpreterResult<StatementOutcome> {
    for stmt in body {
        match stmt(ctx, sink)? {
            StatementOutcome::Continue => {}
            outcome => return Ok(outcome),
        }
    }
    Ok(StatementOutcome::Continue)
}
