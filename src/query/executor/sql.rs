// SQL Engine Seam
//
// Procedures may embed SQL statements and iterate over query results. The
// interpreter does not execute SQL itself; a host plugs an engine in here.

use crate::query::executor::result::InterpreterResult;
use crate::query::parser::ast::SqlStatement;
use crate::query::value::{RecordValue, Value};

/// Parameter bindings for one statement, in the order the statement lists them
pub type SqlParameters = Vec<(String, Value)>;

/// Executes SQL on behalf of running procedures
pub trait SqlEngine: Send + Sync {
    /// Run a query and return its rows in order
    fn query(&self, statement: &SqlStatement, parameters: &SqlParameters) -> InterpreterResult<Vec<RecordValue>>;

    /// Run a statement for its side effects
    fn execute(&self, statement: &SqlStatement, parameters: &SqlParameters) -> InterpreterResult<()> {
        self.query(statement, parameters).map(|_| ())
    }
}
