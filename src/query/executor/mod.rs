// Procedure Executor Module
//
// Runs compiled procedures: per-run state, cost metering, scopes, the row
// cursor and the seam to an external SQL engine.

pub mod context;
pub mod cost;
pub mod cursor;
pub mod engine;
pub mod result;
pub mod scope;
pub mod sql;

// Export key types
pub use self::cost::{CostMeter, CostTable};
pub use self::cursor::{CancelToken, Cursor, RowSink};
pub use self::engine::{Interpreter, InterpreterConfig};
pub use self::result::{InterpreterError, InterpreterResult, NamedValue, ProcedureRunResult};
pub use self::sql::{SqlEngine, SqlParameters};
