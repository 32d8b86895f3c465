//! Parameter registry.
//!
//! Every distinct variable of the compiled query is registered in
//! first-appearance (render) order: the root entity variable, the aggregate
//! output variable, hoisted clause variables, then condition variables
//! branch by branch. Entries are append-only during compilation; the
//! registry is handed to the caller with the compiled query for later value
//! binding.

use ontoql_metamodel::ValueType;
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterEntry {
    /// Parameter name, unique within one query.
    pub name: String,
    /// The SPARQL variable the parameter binds to, with the `?` sigil.
    pub variable: String,
    /// Declared (inferred) value type; `Untyped` when nothing is knowable.
    pub declared_type: ValueType,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterRegistry {
    entries: Vec<ParameterEntry>,
}

impl ParameterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name`, keeping first-appearance order. A repeated
    /// registration may refine `Untyped` to a concrete type; two conflicting
    /// concrete types are a [`CompileError::TypeMismatch`].
    pub(crate) fn register(
        &mut self,
        name: &str,
        declared_type: ValueType,
    ) -> Result<(), CompileError> {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            if entry.declared_type == ValueType::Untyped {
                entry.declared_type = declared_type;
            } else if !entry.declared_type.accepts(declared_type) {
                return Err(CompileError::TypeMismatch(format!(
                    "parameter `{name}` is used both as {:?} and as {:?}",
                    entry.declared_type, declared_type
                )));
            }
            return Ok(());
        }
        self.entries.push(ParameterEntry {
            name: name.to_string(),
            variable: format!("?{name}"),
            declared_type,
        });
        Ok(())
    }

    pub fn parameters(&self) -> &[ParameterEntry] {
        &self.entries
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
