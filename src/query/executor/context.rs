// Execution Context
//
// Per-run state owned by the producer thread: the cost meter, the scope chain,
// notices raised so far and the handles compiled closures need at runtime.

use std::mem;
use std::sync::Arc;

use log::info;

use crate::query::executor::cost::{CostMeter, CostTable};
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::executor::scope::ScopeChain;
use crate::query::executor::sql::SqlEngine;
use crate::query::functions::FunctionContext;
use crate::query::value::Value;

pub struct ExecutionContext {
    meter: CostMeter,
    costs: CostTable,
    scope: ScopeChain,
    sql_engine: Option<Arc<dyn SqlEngine>>,
    notices: Vec<String>,
    call_depth: usize,
    max_call_depth: usize,
}

impl ExecutionContext {
    pub fn new(max_cost: i64, costs: CostTable, max_call_depth: usize) -> Self {
        Self {
            meter: CostMeter::new(max_cost),
            costs,
            scope: ScopeChain::new(),
            sql_engine: None,
            notices: Vec::new(),
            call_depth: 0,
            max_call_depth,
        }
    }

    pub fn with_sql_engine(mut self, engine: Option<Arc<dyn SqlEngine>>) -> Self {
        self.sql_engine = engine;
        self
    }

    /// Charge cost against the run's budget
    pub fn spend(&mut self, amount: i64) -> InterpreterResult<()> {
        self.meter.spend(amount)
    }

    pub fn costs(&self) -> &CostTable {
        &self.costs
    }

    pub fn spent(&self) -> i64 {
        self.meter.spent()
    }

    pub fn is_exhausted(&self) -> bool {
        self.meter.is_exhausted()
    }

    pub fn sql_engine(&self) -> InterpreterResult<Arc<dyn SqlEngine>> {
        self.sql_engine.clone().ok_or(InterpreterError::SqlUnavailable)
    }

    /// Declare a variable in the innermost frame
    pub fn allocate_variable(&mut self, name: &str, value: Value) -> InterpreterResult<()> {
        let cost = self.costs.allocate_variable_cost.saturating_add(self.size_cost(&value)?);
        self.spend(cost)?;
        self.scope.allocate(name, value)
    }

    pub fn get_variable(&mut self, name: &str) -> InterpreterResult<Value> {
        self.spend(self.costs.get_variable_cost)?;
        self.scope.get(name).cloned()
    }

    pub fn set_variable(&mut self, name: &str, value: Value) -> InterpreterResult<()> {
        let cost = self.costs.set_variable_cost.saturating_add(self.size_cost(&value)?);
        self.spend(cost)?;
        self.scope.set(name, value)
    }

    /// Mutable access to a binding, for in-place element writes. Charges nothing.
    pub fn variable_mut(&mut self, name: &str) -> InterpreterResult<&mut Value> {
        self.scope.get_mut(name)
    }

    /// Per-byte surcharge for storing `value`
    pub fn size_cost(&self, value: &Value) -> InterpreterResult<i64> {
        if self.costs.size_cost_per_byte == 0 {
            return Ok(0);
        }
        let size = i64::try_from(value.serialized_size()?).unwrap_or(i64::MAX);
        Ok(size.saturating_mul(self.costs.size_cost_per_byte))
    }

    /// Run `f` inside a nested frame that is dropped afterwards, whatever `f` returns
    pub fn with_sub_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> InterpreterResult<R>) -> InterpreterResult<R> {
        self.scope.push_frame();
        let result = f(self);
        self.scope.pop_frame();
        result
    }

    /// Run `f` against an empty root scope, restoring the caller's scope afterwards.
    /// Used for procedure calls; fails when the call depth limit is reached.
    pub fn with_call_frame<R>(&mut self, f: impl FnOnce(&mut Self) -> InterpreterResult<R>) -> InterpreterResult<R> {
        if self.call_depth >= self.max_call_depth {
            return Err(InterpreterError::CallDepthExceeded(self.max_call_depth));
        }
        let caller_scope = mem::replace(&mut self.scope, ScopeChain::new());
        self.call_depth += 1;
        let result = f(self);
        self.call_depth -= 1;
        self.scope = caller_scope;
        result
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub fn push_notice(&mut self, message: &str) {
        info!("notice: {}", message);
        self.notices.push(message.to_string());
    }

    pub fn take_notices(&mut self) -> Vec<String> {
        mem::take(&mut self.notices)
    }
}

impl FunctionContext for ExecutionContext {
    fn spend(&mut self, amount: i64) -> InterpreterResult<()> {
        ExecutionContext::spend(self, amount)
    }

    fn notice(&mut self, message: &str) {
        self.push_notice(message);
    }
}
