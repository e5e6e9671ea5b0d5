// Schema Module
//
// A schema is the set of procedures one procedure body may call by name.

use std::collections::HashMap;

use crate::catalog::procedure::Procedure;
use crate::query::executor::result::{InterpreterError, InterpreterResult};

/// Represents a deployed schema, which is a collection of procedures
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Schema name
    name: String,
    /// Procedures keyed by lowercase name
    procedures: HashMap<String, Procedure>,
}

impl Schema {
    /// Create a new, empty schema
    pub fn new(name: impl Into<String>) -> Self {
        Schema {
            name: name.into(),
            procedures: HashMap::new(),
        }
    }

    /// Build a schema from a list of procedures
    pub fn with_procedures(name: impl Into<String>, procedures: Vec<Procedure>) -> InterpreterResult<Self> {
        let mut schema = Schema::new(name);
        for procedure in procedures {
            schema.add_procedure(procedure)?;
        }
        Ok(schema)
    }

    /// Get the schema name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a procedure to the schema
    pub fn add_procedure(&mut self, procedure: Procedure) -> InterpreterResult<()> {
        procedure.validate()?;
        let key = procedure.name.to_lowercase();

        if self.procedures.contains_key(&key) {
            return Err(InterpreterError::PlanningError(format!(
                "Procedure {} already exists in schema {}",
                procedure.name, self.name
            )));
        }

        self.procedures.insert(key, procedure);
        Ok(())
    }

    /// Get a procedure by name, ignoring case
    pub fn find_procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.get(&name.to_lowercase())
    }

    /// Check if a procedure exists in this schema
    pub fn has_procedure(&self, name: &str) -> bool {
        self.find_procedure(name).is_some()
    }

    /// Get all procedures in this schema
    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.procedures.values()
    }
}
