//! Lexical scope stack mapping source names to IR storage locations.
//!
//! The IR generator pushes a scope per function and per declaration-bearing
//! block, binds each declared name to the [`Value`] addressing its storage
//! (a stack slot temporary or a global), and resolves identifier reads
//! innermost-first. Function scopes also track whether an explicit `return`
//! was lowered, so the epilogue can decide if a fallthrough jump is needed.

use std::fmt;

use hashbrown::HashMap;
use log::debug;
use thiserror::Error;

use crate::ast::{NodeRef, Symbol};
use crate::ir::Value;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScopeError {
    #[error("unbound name `{name}`")]
    UnboundName { name: Symbol },

    #[error("scope stack underflow")]
    ScopeUnderflow,
}

#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<Symbol, Value>,
    /// Set on function scopes; block scopes leave it `None` so
    /// [`ScopeStack::nearest_enclosing_function`] can skip over them.
    function: Option<NodeRef>,
    returned: bool,
}

/// Stack of lexical scopes, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack::default()
    }

    /// Push a scope. `function` is the `FuncDef` node for function scopes,
    /// `None` for the global scope.
    pub fn push_function_scope(&mut self, function: Option<NodeRef>) {
        debug!("push scope (depth {} -> {})", self.scopes.len(), self.scopes.len() + 1);
        self.scopes.push(Scope {
            symbols: HashMap::new(),
            function,
            returned: false,
        });
    }

    /// Push a scope for a declaration-bearing block.
    pub fn push_block_scope(&mut self) {
        self.push_function_scope(None);
    }

    pub fn pop_scope(&mut self) -> Result<(), ScopeError> {
        debug!("pop scope (depth {} -> {})", self.scopes.len(), self.scopes.len().saturating_sub(1));
        match self.scopes.pop() {
            Some(_) => Ok(()),
            None => Err(ScopeError::ScopeUnderflow),
        }
    }

    /// Bind `name` in the innermost scope, shadowing any outer binding.
    pub fn bind(&mut self, name: Symbol, location: Value) -> Result<(), ScopeError> {
        let scope = self.scopes.last_mut().ok_or(ScopeError::ScopeUnderflow)?;
        scope.symbols.insert(name, location);
        Ok(())
    }

    /// Resolve `name` innermost-first.
    pub fn resolve(&self, name: Symbol) -> Result<Value, ScopeError> {
        for scope in self.scopes.iter().rev() {
            if let Some(&location) = scope.symbols.get(&name) {
                return Ok(location);
            }
        }
        Err(ScopeError::UnboundName { name })
    }

    /// The `FuncDef` node of the innermost function scope, if any.
    pub fn nearest_enclosing_function(&self) -> Option<NodeRef> {
        self.scopes.iter().rev().find_map(|scope| scope.function)
    }

    /// Record that the innermost function scope lowered an explicit return.
    pub fn mark_returned(&mut self) {
        for scope in self.scopes.iter_mut().rev() {
            if scope.function.is_some() {
                scope.returned = true;
                return;
            }
        }
    }

    /// Whether the innermost function scope has lowered an explicit return.
    pub fn has_returned(&self) -> bool {
        self.scopes
            .iter()
            .rev()
            .find(|scope| scope.function.is_some())
            .is_some_and(|scope| scope.returned)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl fmt::Display for ScopeStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (depth, scope) in self.scopes.iter().enumerate() {
            let mut entries: Vec<_> = scope
                .symbols
                .iter()
                .map(|(name, location)| format!("{}: {}", name, location))
                .collect();
            entries.sort();
            writeln!(f, "scope {}: {{{}}}", depth, entries.join(", "))?;
        }
        Ok(())
    }
}
