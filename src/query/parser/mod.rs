// Procedure Syntax Module
//
// Source text is parsed by the host. This module owns the tree the parser
// produces and the interpreter consumes.

pub mod ast;

pub use self::ast::{Expression, Statement};
