use crate::bail_scope;
use crate::error::Result;
use crate::ir::VarId;
use crate::types::Type;
use std::collections::HashMap;

/// A single block-level frame: variables and types declared in it
#[derive(Debug, Clone, Default)]
pub struct Scope {
    variables: HashMap<String, VarId>,
    types: HashMap<String, Type>,
}

impl Scope {
    pub fn new() -> Self {
        Scope::default()
    }

    pub fn variable(&self, name: &str) -> Option<VarId> {
        self.variables.get(name).copied()
    }

    pub fn ty(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn contains_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }
}

/// A stack-based scope manager that tracks nested scopes
#[derive(Debug, Clone)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeStack {
    /// Create a new scope stack with a global scope
    pub fn new() -> Self {
        ScopeStack {
            scopes: vec![Scope::new()],
        }
    }

    /// Push a new scope onto the stack
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::new());
    }

    /// Pop the current scope, dropping everything declared in it.
    /// Popping the global scope means pushes and pops got out of step.
    pub fn pop_scope(&mut self) -> Result<Scope> {
        if self.scopes.len() <= 1 {
            bail_scope!("attempted to pop the global scope");
        }
        match self.scopes.pop() {
            Some(scope) => Ok(scope),
            None => bail_scope!("scope stack is empty"),
        }
    }

    /// Insert a variable in the innermost scope.
    /// Returns false, leaving the scope untouched, when the name is already
    /// taken in that scope.
    pub fn declare_variable(&mut self, name: &str, var: VarId) -> bool {
        let Some(current_scope) = self.scopes.last_mut() else {
            return false;
        };
        if current_scope.contains_variable(name) {
            return false;
        }
        current_scope.variables.insert(name.to_string(), var);
        true
    }

    /// Insert a type in the innermost scope; false if the name is taken there.
    pub fn declare_type(&mut self, name: &str, ty: Type) -> bool {
        let Some(current_scope) = self.scopes.last_mut() else {
            return false;
        };
        if current_scope.contains_type(name) {
            return false;
        }
        current_scope.types.insert(name.to_string(), ty);
        true
    }

    /// Look up a variable, searching from innermost to outermost scope.
    pub fn lookup_variable(&self, name: &str) -> Option<VarId> {
        self.scopes.iter().rev().find_map(|scope| scope.variable(name))
    }

    /// Look up a type, searching from innermost to outermost scope.
    pub fn lookup_type(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.ty(name))
    }

    /// Variable declared in the current scope only (not outer scopes)
    pub fn lookup_variable_in_current_scope(&self, name: &str) -> Option<VarId> {
        self.scopes.last().and_then(|scope| scope.variable(name))
    }

    /// Get the current scope depth (0 = global scope)
    pub fn depth(&self) -> usize {
        self.scopes.len().saturating_sub(1)
    }

    pub fn is_global(&self) -> bool {
        self.depth() == 0
    }

    pub fn global_scope(&self) -> &Scope {
        &self.scopes[0]
    }

    pub fn into_global_scope(mut self) -> Scope {
        self.scopes.swap_remove(0)
    }
}

// Manual scope management - use push_scope() and pop_scope() explicitly
