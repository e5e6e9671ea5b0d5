// Procedure Execution Engine
//
// Entry point for running procedures. A run compiles the procedure (and any
// procedure it calls), binds arguments on the caller's thread, then executes
// the body on a producer thread and drains its rows through a cursor.

use std::sync::Arc;

use log::{debug, warn};

use crate::catalog::{Procedure, Schema};
use crate::query::executor::context::ExecutionContext;
use crate::query::executor::cost::CostTable;
use crate::query::executor::cursor::{CancelToken, Completion, Cursor, ProducerOptions, RunSummary};
use crate::query::executor::result::{InterpreterError, InterpreterResult, ProcedureRunResult};
use crate::query::executor::sql::SqlEngine;
use crate::query::functions::FunctionRegistry;
use crate::query::planner::{CompiledProcedure, CompiledProgram, Planner};
use crate::query::value::Value;

/// Configuration for the interpreter
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    /// Deepest chain of nested procedure calls allowed
    pub max_call_depth: usize,

    /// Stack size of producer threads; None uses the platform default
    pub producer_stack_size: Option<usize>,

    /// Name given to producer threads
    pub thread_name: String,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            max_call_depth: 64,
            producer_stack_size: Some(8 * 1024 * 1024), // 8 MB
            thread_name: "kuneiform-procedure".to_string(),
        }
    }
}

/// Runs procedures against a function registry and an optional SQL engine
pub struct Interpreter {
    registry: Arc<FunctionRegistry>,
    sql_engine: Option<Arc<dyn SqlEngine>>,
    config: InterpreterConfig,
}

impl Interpreter {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self {
            registry,
            sql_engine: None,
            config: InterpreterConfig::default(),
        }
    }

    pub fn with_config(mut self, config: InterpreterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_sql_engine(mut self, engine: Arc<dyn SqlEngine>) -> Self {
        self.sql_engine = Some(engine);
        self
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// Compile a procedure and every schema procedure it reaches
    pub fn compile(&self, procedure: &Procedure, schema: &Schema) -> InterpreterResult<Arc<CompiledProgram>> {
        let program = Planner::new(&self.registry, schema).compile(procedure)?;
        debug!(
            "Compiled {} into {} procedure(s) against schema {}",
            procedure.name,
            program.procedure_count(),
            schema.name()
        );
        Ok(Arc::new(program))
    }

    /// Compile and run a procedure, collecting every row it returns
    pub fn run(
        &self,
        cancel: &CancelToken,
        procedure: &Procedure,
        schema: &Schema,
        args: Vec<Value>,
        max_cost: i64,
        cost_table: &CostTable,
    ) -> InterpreterResult<ProcedureRunResult> {
        let program = self.compile(procedure, schema)?;
        self.run_compiled(cancel, program, args, max_cost, cost_table)
    }

    /// Run an already compiled program, collecting every row it returns
    pub fn run_compiled(
        &self,
        cancel: &CancelToken,
        program: Arc<CompiledProgram>,
        args: Vec<Value>,
        max_cost: i64,
        cost_table: &CostTable,
    ) -> InterpreterResult<ProcedureRunResult> {
        let name = program.entry()?.name().to_string();
        debug!("Running procedure {} with a budget of {}", name, max_cost);

        let result = self
            .open_cursor(cancel, Arc::clone(&program), args, max_cost, cost_table)
            .and_then(|mut cursor| collect_rows(program.entry()?, &mut cursor));

        match &result {
            Ok(run) => debug!(
                "Procedure {} finished: {} row(s), cost {}",
                name,
                run.row_count(),
                run.cost_spent
            ),
            Err(err @ (InterpreterError::CostExceeded | InterpreterError::Cancelled)) => {
                warn!("Procedure {} stopped: {}", name, err)
            }
            Err(err) => debug!("Procedure {} failed: {}", name, err),
        }
        result
    }

    /// Start a run and hand back a cursor over its rows.
    ///
    /// Arguments are checked and bound before the producer thread starts, so
    /// a binding error never runs any statement.
    pub fn open_cursor(
        &self,
        cancel: &CancelToken,
        program: Arc<CompiledProgram>,
        args: Vec<Value>,
        max_cost: i64,
        cost_table: &CostTable,
    ) -> InterpreterResult<Cursor> {
        cost_table.validate()?;
        if cancel.is_cancelled() {
            return Err(InterpreterError::Cancelled);
        }

        let mut ctx = ExecutionContext::new(max_cost, cost_table.clone(), self.config.max_call_depth)
            .with_sql_engine(self.sql_engine.clone());
        program.entry()?.bind_arguments(&mut ctx, args)?;

        let options = ProducerOptions {
            thread_name: self.config.thread_name.clone(),
            stack_size: self.config.producer_stack_size,
        };
        Cursor::spawn(&options, cancel, move |sink| {
            let executed = program.entry().and_then(|entry| entry.execute(&mut ctx, sink));
            match executed {
                Ok(()) => Completion::Finished(RunSummary {
                    cost_spent: ctx.spent(),
                    notices: ctx.take_notices(),
                }),
                Err(err) => Completion::Failed(err),
            }
        })
    }
}

/// Drain a cursor, holding the rows to the entry procedure's declared return
fn collect_rows(entry: &CompiledProcedure, cursor: &mut Cursor) -> InterpreterResult<ProcedureRunResult> {
    let mut rows = Vec::new();
    while let Some(row) = cursor.next()? {
        entry.admit_row(rows.len() + 1)?;
        rows.push(entry.name_row(row)?);
    }
    entry.check_row_total(rows.len())?;

    let summary = cursor.summary().cloned().unwrap_or_default();
    Ok(ProcedureRunResult {
        cost_spent: summary.cost_spent,
        rows,
        notices: summary.notices,
    })
}
