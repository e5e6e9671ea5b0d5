// Variable Scopes
//
// A procedure runs in a root frame holding its arguments. Each branch body and
// each loop iteration pushes a nested frame that is dropped when it ends, so
// declarations never leak out of the block that made them. Writes update the
// nearest frame that already binds the name, or declare it in the innermost
// frame when no frame does.

use std::collections::HashMap;

use crate::query::executor::result::{InterpreterError, InterpreterResult};
use crate::query::value::Value;

#[derive(Debug, Default)]
struct Frame {
    variables: HashMap<String, Value>,
}

#[derive(Debug, Default)]
pub struct ScopeChain {
    root: Frame,
    nested: Vec<Frame>,
}

impl ScopeChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames, including the root
    pub fn depth(&self) -> usize {
        self.nested.len() + 1
    }

    pub fn push_frame(&mut self) {
        self.nested.push(Frame::default());
    }

    /// Drop the innermost frame; the root frame is never dropped
    pub fn pop_frame(&mut self) {
        self.nested.pop();
    }

    /// Bind a new name in the innermost frame
    pub fn allocate(&mut self, name: &str, value: Value) -> InterpreterResult<()> {
        let frame = match self.nested.last_mut() {
            Some(frame) => frame,
            None => &mut self.root,
        };
        if frame.variables.contains_key(name) {
            return Err(InterpreterError::VariableAlreadyDeclared(name.to_string()));
        }
        frame.variables.insert(name.to_string(), value);
        Ok(())
    }

    /// Look a name up from the innermost frame outward
    pub fn get(&self, name: &str) -> InterpreterResult<&Value> {
        self.frames()
            .find_map(|frame| frame.variables.get(name))
            .ok_or_else(|| InterpreterError::VariableNotFound(name.to_string()))
    }

    pub fn get_mut(&mut self, name: &str) -> InterpreterResult<&mut Value> {
        let root = std::iter::once(&mut self.root);
        self.nested
            .iter_mut()
            .rev()
            .chain(root)
            .find_map(|frame| frame.variables.get_mut(name))
            .ok_or_else(|| InterpreterError::VariableNotFound(name.to_string()))
    }

    /// Overwrite the nearest existing binding, or bind in the innermost frame.
    /// A binding keeps its type: NULL is retyped to it and other types are rejected.
    pub fn set(&mut self, name: &str, value: Value) -> InterpreterResult<()> {
        if !self.contains(name) {
            return self.allocate(name, value);
        }
        let slot = self.get_mut(name)?;
        let current = slot.data_type();
        if value.is_null() {
            *slot = Value::Null(current);
            return Ok(());
        }
        let incoming = value.data_type();
        if !current.is_untyped_null() && !current.equals_strict(&incoming) {
            return Err(InterpreterError::TypeError(format!(
                "cannot assign {} to variable {} of type {}",
                incoming, name, current
            )));
        }
        *slot = value;
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.frames().any(|frame| frame.variables.contains_key(name))
    }

    fn frames(&self) -> impl Iterator<Item = &Frame> {
        self.nested.iter().rev().chain(std::iter::once(&self.root))
    }
}
