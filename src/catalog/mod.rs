//! Catalog Module
//!
//! Procedure definitions and the schemas that group them.

pub mod procedure;
pub mod schema;

// Re-export key types
pub use self::procedure::{NamedType, Procedure, ProcedureReturn};
pub use self::schema::Schema;
