// Cost Accounting
//
// Every interpreter step is charged against a fixed budget. The weights live in
// a CostTable that callers may load from any serde format; the CostMeter tracks
// what a single run has spent.

use serde::{Deserialize, Serialize};

use crate::query::executor::result::{InterpreterError, InterpreterResult};

/// Weights charged for each kind of interpreter step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostTable {
    /// Declaring a variable or binding an argument
    pub allocate_variable_cost: i64,
    pub get_variable_cost: i64,
    pub set_variable_cost: i64,
    /// Surcharge per serialized byte on allocate, set and element writes
    pub size_cost_per_byte: i64,
    pub array_access_cost: i64,
    pub make_array_cost: i64,
    pub comparison_cost: i64,
    pub is_cost: i64,
    pub unary_cost: i64,
    pub logical_cost: i64,
    pub arithmetic_cost: i64,
    /// Charged once per loop iteration
    pub loop_cost: i64,
    /// Charged by both `break` and `continue`
    pub break_cost: i64,
    pub return_cost: i64,
    pub call_builtin_function_cost: i64,
    pub call_procedure_cost: i64,
    pub sql_statement_cost: i64,
}

impl Default for CostTable {
    fn default() -> Self {
        Self {
            allocate_variable_cost: 10,
            get_variable_cost: 2,
            set_variable_cost: 5,
            size_cost_per_byte: 1,
            array_access_cost: 3,
            make_array_cost: 5,
            comparison_cost: 2,
            is_cost: 2,
            unary_cost: 1,
            logical_cost: 2,
            arithmetic_cost: 2,
            loop_cost: 5,
            break_cost: 1,
            return_cost: 5,
            call_builtin_function_cost: 10,
            call_procedure_cost: 50,
            sql_statement_cost: 100,
        }
    }
}

impl CostTable {
    /// A table in which every step costs the same
    pub fn uniform(weight: i64) -> Self {
        Self {
            allocate_variable_cost: weight,
            get_variable_cost: weight,
            set_variable_cost: weight,
            size_cost_per_byte: 0,
            array_access_cost: weight,
            make_array_cost: weight,
            comparison_cost: weight,
            is_cost: weight,
            unary_cost: weight,
            logical_cost: weight,
            arithmetic_cost: weight,
            loop_cost: weight,
            break_cost: weight,
            return_cost: weight,
            call_builtin_function_cost: weight,
            call_procedure_cost: weight,
            sql_statement_cost: weight,
        }
    }

    /// Reject negative weights
    pub fn validate(&self) -> InterpreterResult<()> {
        let weights = [
            ("allocate_variable_cost", self.allocate_variable_cost),
            ("get_variable_cost", self.get_variable_cost),
            ("set_variable_cost", self.set_variable_cost),
            ("size_cost_per_byte", self.size_cost_per_byte),
            ("array_access_cost", self.array_access_cost),
            ("make_array_cost", self.make_array_cost),
            ("comparison_cost", self.comparison_cost),
            ("is_cost", self.is_cost),
            ("unary_cost", self.unary_cost),
            ("logical_cost", self.logical_cost),
            ("arithmetic_cost", self.arithmetic_cost),
            ("loop_cost", self.loop_cost),
            ("break_cost", self.break_cost),
            ("return_cost", self.return_cost),
            ("call_builtin_function_cost", self.call_builtin_function_cost),
            ("call_procedure_cost", self.call_procedure_cost),
            ("sql_statement_cost", self.sql_statement_cost),
        ];
        for (name, weight) in weights {
            if weight < 0 {
                return Err(InterpreterError::ConfigError(format!(
                    "{} must not be negative, got {}",
                    name, weight
                )));
            }
        }
        Ok(())
    }
}

/// Tracks cost spent by one run against its budget
#[derive(Debug, Clone)]
pub struct CostMeter {
    spent: i64,
    max_cost: i64,
    exhausted: bool,
}

impl CostMeter {
    pub fn new(max_cost: i64) -> Self {
        Self {
            spent: 0,
            max_cost,
            exhausted: false,
        }
    }

    /// Charge `amount`. Once the budget is crossed, spent is pinned to the
    /// budget and every later call fails, including zero-cost ones.
    pub fn spend(&mut self, amount: i64) -> InterpreterResult<()> {
        if self.exhausted {
            return Err(InterpreterError::CostExceeded);
        }
        match self.spent.checked_add(amount) {
            Some(total) if total <= self.max_cost => {
                self.spent = total;
                Ok(())
            }
            _ => {
                self.spent = self.max_cost.max(self.spent);
                self.exhausted = true;
                Err(InterpreterError::CostExceeded)
            }
        }
    }

    pub fn spent(&self) -> i64 {
        self.spent
    }

    pub fn max_cost(&self) -> i64 {
        self.max_cost
    }

    pub fn remaining(&self) -> i64 {
        self.max_cost - self.spent
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
