// Procedure Definitions
//
// Declared signature and body of a stored procedure.

use std::collections::HashSet;

use crate::common::types::DataType;
use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::parser::ast::Statement;

/// A named, typed parameter or return field
#[derive(Debug, Clone, PartialEq)]
pub struct NamedType {
    pub name: String,
    pub data_type: DataType,
}

impl NamedType {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// What a procedure hands back to its caller
#[derive(Debug, Clone, PartialEq)]
pub struct ProcedureReturn {
    /// A table return may produce any number of rows
    pub is_table: bool,
    pub fields: Vec<NamedType>,
}

/// Represents a stored procedure
#[derive(Debug, Clone, PartialEq)]
pub struct Procedure {
    pub name: String,
    pub parameters: Vec<NamedType>,
    /// None when the procedure returns nothing
    pub returns: Option<ProcedureReturn>,
    pub body: Vec<Statement>,
}

impl Procedure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            returns: None,
            body: Vec::new(),
        }
    }

    pub fn param(mut self, name: &str, data_type: DataType) -> Self {
        self.parameters.push(NamedType::new(name, data_type));
        self
    }

    /// Declare a single-row return
    pub fn returns(mut self, fields: Vec<(&str, DataType)>) -> Self {
        self.returns = Some(ProcedureReturn {
            is_table: false,
            fields: fields.into_iter().map(|(n, t)| NamedType::new(n, t)).collect(),
        });
        self
    }

    /// Declare a table return
    pub fn returns_table(mut self, fields: Vec<(&str, DataType)>) -> Self {
        self.returns = Some(ProcedureReturn {
            is_table: true,
            fields: fields.into_iter().map(|(n, t)| NamedType::new(n, t)).collect(),
        });
        self
    }

    pub fn body(mut self, body: Vec<Statement>) -> Self {
        self.body = body;
        self
    }

    /// Parameter names and return field names must each be unique
    pub fn validate(&self) -> InterpreterResult<()> {
        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(InterpreterError::PlanningError(format!(
                    "procedure {} declares parameter {} twice",
                    self.name, param.name
                )));
            }
        }
        if let Some(returns) = &self.returns {
            if returns.fields.is_empty() {
                return Err(InterpreterError::PlanningError(format!(
                    "procedure {} declares a return with no fields",
                    self.name
                )));
            }
            let mut seen = HashSet::new();
            for field in &returns.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(InterpreterError::PlanningError(format!(
                        "procedure {} declares return field {} twice",
                        self.name, field.name
                    )));
                }
            }
        }
        Ok(())
    }
}
