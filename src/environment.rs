//! Variable environment for BeamScript
//!
//! Handles scoped variable storage with constant protection. Scopes form a
//! parent chain; lookups and assignments walk it upward, declarations only
//! touch the current scope.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{BeamError, ErrorKind, Result};
use crate::value::{EnvRef, Value};

/// A binding in the environment
#[derive(Debug, Clone)]
struct Binding {
    value: Value,
    constant: bool,
}

/// Variable environment with lexical scoping
#[derive(Debug, Default)]
pub struct Environment {
    values: HashMap<String, Binding>,
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a new root environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a child environment with parent scope
    pub fn with_parent(parent: EnvRef) -> Self {
        Self {
            values: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Wrap in a shared handle
    pub fn into_ref(self) -> EnvRef {
        Rc::new(RefCell::new(self))
    }

    /// Bind a new name in this scope. Fails if the name is already bound
    /// here, even when it is only shadowing an outer binding.
    pub fn declare(&mut self, name: &str, value: Value, constant: bool) -> Result<Value> {
        if self.values.contains_key(name) {
            return Err(BeamError::new(
                ErrorKind::DuplicateDeclaration(name.to_string()),
                None,
            ));
        }
        tracing::trace!(name, constant, "declare");
        self.values.insert(
            name.to_string(),
            Binding { value: value.clone(), constant },
        );
        Ok(value)
    }

    /// Get a variable's value
    pub fn lookup(&self, name: &str) -> Result<Value> {
        if let Some(binding) = self.values.get(name) {
            Ok(binding.value.clone())
        } else if let Some(parent) = &self.parent {
            parent.borrow().lookup(name)
        } else {
            Err(BeamError::new(
                ErrorKind::UndeclaredVariable(name.to_string()),
                None,
            ))
        }
    }

    /// Replace the value of the nearest binding of `name`
    pub fn assign(&mut self, name: &str, value: Value) -> Result<Value> {
        if let Some(binding) = self.values.get_mut(name) {
            if binding.constant {
                Err(BeamError::new(
                    ErrorKind::ConstAssignment(name.to_string()),
                    None,
                ))
            } else {
                binding.value = value.clone();
                Ok(value)
            }
        } else if let Some(parent) = &self.parent {
            parent.borrow_mut().assign(name, value)
        } else {
            Err(BeamError::new(
                ErrorKind::UndeclaredVariable(name.to_string()),
                None,
            ))
        }
    }

    /// Whether `name` is bound in this scope (parents are not consulted)
    pub fn contains_local(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn parent(&self) -> Option<&EnvRef> {
        self.parent.as_ref()
    }

    /// Values bound directly in this scope
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.values().map(|binding| &binding.value)
    }

    /// Remove every binding from this scope and return the values, so the
    /// caller can drop them outside any borrow
    pub fn clear(&mut self) -> Vec<Value> {
        self.values.drain().map(|(_, binding)| binding.value).collect()
    }
}
