//! Bottom-up side-effect masks.
//!
//! Each node's mask is the union of its direct children's masks plus whatever
//! the node itself does. Children are always finished first (post-visit), so a
//! single lookup per child is enough.

use crate::annotations::Annotations;
use crate::ast::*;
use crate::builtins::EMIT_VERTEX;
use crate::visitor::NodeRef;
use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SideEffects: u8 {
        /// Writes state: assignment, increment/decrement, function bodies
        const GENERAL = 1 << 0;
        const EMIT_VERTEX = 1 << 1;
        const DISCARD = 1 << 2;
    }
}

/// Effect the node has on its own, ignoring children.
pub fn intrinsic_effects(node: NodeRef<'_>) -> SideEffects {
    match node {
        NodeRef::Expression(e) => match &e.kind {
            ExprKind::Assign(..) => SideEffects::GENERAL,
            ExprKind::Unary(op, _) if op.is_mutating() => SideEffects::GENERAL,
            ExprKind::Call(FunctionCall {
                callee: Callee::Function(name),
                ..
            }) if name == EMIT_VERTEX => SideEffects::EMIT_VERTEX,
            _ => SideEffects::empty(),
        },
        NodeRef::Statement(s) => match &s.kind {
            StmtKind::Jump(JumpKind::Discard) => SideEffects::DISCARD,
            _ => SideEffects::empty(),
        },
        NodeRef::Function(_) => SideEffects::GENERAL,
        _ => SideEffects::empty(),
    }
}

/// Ids of the nodes whose masks flow into `node`.
pub fn children(node: NodeRef<'_>) -> Vec<NodeId> {
    let mut ids = Vec::new();
    match node {
        NodeRef::Expression(e) => expression_children(e, &mut ids),
        NodeRef::Statement(s) => statement_children(s, &mut ids),
        NodeRef::Declaration(d) => ids.extend(d.kind.initializer.as_ref().map(Node::id)),
        NodeRef::Function(f) => ids.push(f.kind.body.id()),
        NodeRef::SwitchBody(b) => ids.extend(b.kind.cases.iter().map(Node::id)),
        NodeRef::Case(c) => {
            for label in &c.kind.labels {
                if let CaseLabel::Case(e) = label {
                    ids.push(e.id());
                }
            }
            ids.extend(c.kind.statements.iter().map(Node::id));
        }
        NodeRef::StructSpecifier(_)
        | NodeRef::Parameter(_)
        | NodeRef::Prototype(_)
        | NodeRef::GsInputLayout(_) => {}
    }
    ids
}

fn expression_children(e: &Expression, ids: &mut Vec<NodeId>) {
    match &e.kind {
        ExprKind::Identifier(_)
        | ExprKind::IntConstant(_)
        | ExprKind::UintConstant(_)
        | ExprKind::FloatConstant(_)
        | ExprKind::BoolConstant(_) => {}
        ExprKind::Unary(_, operand) => ids.push(operand.id()),
        ExprKind::Binary(_, left, right)
        | ExprKind::Assign(_, left, right)
        | ExprKind::ArrayIndex(left, right) => {
            ids.push(left.id());
            ids.push(right.id());
        }
        ExprKind::Conditional(cond, then_expr, else_expr) => {
            ids.extend([cond.id(), then_expr.id(), else_expr.id()]);
        }
        ExprKind::FieldSelection(sel) => {
            ids.push(sel.base.id());
            ids.extend(sel.method_args.iter().flatten().map(Node::id));
        }
        ExprKind::Call(call) => ids.extend(call.args.iter().map(Node::id)),
        ExprKind::Sequence(elements) | ExprKind::Aggregate(elements) => {
            ids.extend(elements.iter().map(Node::id));
        }
    }
}

fn statement_children(s: &Statement, ids: &mut Vec<NodeId>) {
    match &s.kind {
        StmtKind::Compound(c) => ids.extend(c.statements.iter().map(Node::id)),
        StmtKind::Declaration(list) => ids.extend(list.declarations.iter().map(Node::id)),
        StmtKind::InterfaceBlock(_) => {}
        StmtKind::Expression(e) => ids.extend(e.as_ref().map(Node::id)),
        StmtKind::Selection(sel) => {
            ids.push(sel.condition.id());
            ids.push(sel.then_statement.id());
            ids.extend(sel.else_statement.as_ref().map(|s| s.id()));
        }
        StmtKind::Switch(sw) => {
            ids.push(sw.test.id());
            ids.push(sw.body.id());
        }
        StmtKind::Iteration(it) => {
            ids.extend(it.init.as_ref().map(|s| s.id()));
            ids.extend(it.condition.as_ref().map(|e| e.id()));
            ids.push(it.body.id());
            ids.extend(it.rest.as_ref().map(|e| e.id()));
        }
        StmtKind::Jump(JumpKind::Return(Some(value))) => ids.push(value.id()),
        StmtKind::Jump(_) => {}
    }
}

/// Compute and store the mask of `node`. Children must already be done.
pub fn propagate(annotations: &mut Annotations, node: NodeRef<'_>) -> SideEffects {
    let mask = children(node)
        .into_iter()
        .fold(intrinsic_effects(node), |acc, child| acc | annotations.side_effects(child));
    annotations.entry(node.id()).side_effects = mask;
    mask
}
