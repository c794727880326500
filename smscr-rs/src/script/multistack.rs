//! Named value stacks.
//!
//! Each FOR loop pushes its variable's binding on the stack of that name, so
//! an inner loop over the same name shadows the outer one until it pops.

use std::collections::HashMap;

use super::error::RuntimeError;
use super::value::ValueWrapper;

/// Map from variable name to a stack of bindings (innermost last).
#[derive(Debug, Default)]
pub struct MultiStack {
    stacks: HashMap<String, Vec<ValueWrapper>>,
}

impl MultiStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new binding for `name`.
    pub fn push(&mut self, name: &str, value: ValueWrapper) {
        self.stacks.entry(name.to_owned()).or_default().push(value);
    }

    /// Remove and return the innermost binding of `name`.
    pub fn pop(&mut self, name: &str) -> Result<ValueWrapper, RuntimeError> {
        self.stacks
            .get_mut(name)
            .and_then(Vec::pop)
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_owned()))
    }

    /// The innermost binding of `name`, without removing it.
    pub fn peek(&self, name: &str) -> Result<&ValueWrapper, RuntimeError> {
        self.stacks
            .get(name)
            .and_then(|s| s.last())
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_owned()))
    }

    /// Mutable access to the innermost binding of `name`.
    pub fn peek_mut(&mut self, name: &str) -> Result<&mut ValueWrapper, RuntimeError> {
        self.stacks
            .get_mut(name)
            .and_then(|s| s.last_mut())
            .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_owned()))
    }

    /// Returns `true` if `name` has no binding.
    pub fn is_empty(&self, name: &str) -> bool {
        self.stacks.get(name).map_or(true, Vec::is_empty)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
