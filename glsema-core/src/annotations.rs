//! Per-node results of the pass, keyed by `NodeId`.

use crate::ast::NodeId;
use crate::ir::VarId;
use crate::reflection::ReflectionId;
use crate::side_effects::SideEffects;
use crate::types::Type;
use std::collections::HashMap;

/// What a `base.field` expression turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionKind {
    Struct,
    Method,
    Swizzle,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeAnnotation {
    pub side_effects: SideEffects,
    /// Expression type, or resolved parameter type
    pub ty: Option<Type>,
    pub selection: Option<SelectionKind>,
    /// Call resolved to a constructor or builtin function
    pub builtin: Option<bool>,
    /// Variable an identifier resolved to
    pub variable: Option<VarId>,
    /// Reflection variable linked to this node; set once
    pub reflection: Option<ReflectionId>,
    /// Type given to an aggregate initializer by its declaration
    pub aggregate_type: Option<Type>,
}

#[derive(Debug, Clone, Default)]
pub struct Annotations {
    nodes: HashMap<NodeId, NodeAnnotation>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeAnnotation> {
        self.nodes.get(&id)
    }

    pub fn entry(&mut self, id: NodeId) -> &mut NodeAnnotation {
        self.nodes.entry(id).or_default()
    }

    pub fn side_effects(&self, id: NodeId) -> SideEffects {
        self.get(id).map(|a| a.side_effects).unwrap_or_default()
    }

    pub fn ty(&self, id: NodeId) -> Option<&Type> {
        self.get(id).and_then(|a| a.ty.as_ref())
    }

    pub fn selection(&self, id: NodeId) -> Option<SelectionKind> {
        self.get(id).and_then(|a| a.selection)
    }

    pub fn is_builtin_call(&self, id: NodeId) -> Option<bool> {
        self.get(id).and_then(|a| a.builtin)
    }

    pub fn variable(&self, id: NodeId) -> Option<VarId> {
        self.get(id).and_then(|a| a.variable)
    }

    pub fn reflection(&self, id: NodeId) -> Option<ReflectionId> {
        self.get(id).and_then(|a| a.reflection)
    }

    pub fn aggregate_type(&self, id: NodeId) -> Option<&Type> {
        self.get(id).and_then(|a| a.aggregate_type.as_ref())
    }
}
