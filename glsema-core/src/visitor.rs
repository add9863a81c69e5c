//! AST visitor pattern for traversing the GLSL syntax tree
//!
//! This module provides the canonical traversal. A pass implements `Visitor`
//! and overrides only the hooks it needs, while the walk_* functions handle
//! recursion into children.
//!
//! Every walk_* function brackets its children with the pre-visit and
//! post-visit hooks, each enabled through `Visitor::flags`. A pre-visit hook
//! returning `false` skips the node's children and its post-visit.

use crate::ast::*;
use bitflags::bitflags;
use std::ops::ControlFlow;

bitflags! {
    /// Which traversal hooks run
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TraversalFlags: u8 {
        const PREVISIT = 1 << 0;
        const POSTVISIT = 1 << 1;
    }
}

/// Borrowed view of any node that carries a `NodeId`
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Expression(&'a Expression),
    Statement(&'a Statement),
    Declaration(&'a Node<Declaration>),
    StructSpecifier(&'a Node<StructSpecifier>),
    Parameter(&'a Node<ParameterDeclarator>),
    Prototype(&'a Node<FunctionPrototype>),
    Function(&'a Node<FunctionDefinition>),
    SwitchBody(&'a Node<SwitchBody>),
    Case(&'a Node<CaseStatement>),
    GsInputLayout(&'a Node<GsInputLayout>),
}

impl NodeRef<'_> {
    pub fn id(&self) -> NodeId {
        match self {
            NodeRef::Expression(n) => n.id(),
            NodeRef::Statement(n) => n.id(),
            NodeRef::Declaration(n) => n.id(),
            NodeRef::StructSpecifier(n) => n.id(),
            NodeRef::Parameter(n) => n.id(),
            NodeRef::Prototype(n) => n.id(),
            NodeRef::Function(n) => n.id(),
            NodeRef::SwitchBody(n) => n.id(),
            NodeRef::Case(n) => n.id(),
            NodeRef::GsInputLayout(n) => n.id(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            NodeRef::Expression(n) => n.span(),
            NodeRef::Statement(n) => n.span(),
            NodeRef::Declaration(n) => n.span(),
            NodeRef::StructSpecifier(n) => n.span(),
            NodeRef::Parameter(n) => n.span(),
            NodeRef::Prototype(n) => n.span(),
            NodeRef::Function(n) => n.span(),
            NodeRef::SwitchBody(n) => n.span(),
            NodeRef::Case(n) => n.span(),
            NodeRef::GsInputLayout(n) => n.span(),
        }
    }
}

/// Visitor trait for traversing the AST
///
/// All visit methods have default implementations that delegate to walk_*
/// functions. The Break associated type lets visitors short-circuit the whole
/// traversal with an error.
pub trait Visitor: Sized {
    type Break;

    fn flags(&self) -> TraversalFlags {
        TraversalFlags::empty()
    }

    /// Runs before a node's children when `PREVISIT` is set.
    fn previsit(&mut self, _node: NodeRef<'_>) -> ControlFlow<Self::Break, bool> {
        ControlFlow::Continue(true)
    }

    /// Runs after a node's children when `POSTVISIT` is set.
    fn postvisit(&mut self, _node: NodeRef<'_>) -> ControlFlow<Self::Break> {
        ControlFlow::Continue(())
    }

    // --- Top level ---
    fn visit_translation_unit(&mut self, unit: &TranslationUnit) -> ControlFlow<Self::Break> {
        walk_translation_unit(self, unit)
    }

    fn visit_external_declaration(&mut self, d: &ExternalDeclaration) -> ControlFlow<Self::Break> {
        walk_external_declaration(self, d)
    }

    fn visit_function_prototype(&mut self, p: &Node<FunctionPrototype>) -> ControlFlow<Self::Break> {
        walk_function_prototype(self, p)
    }

    fn visit_function_definition(&mut self, f: &Node<FunctionDefinition>) -> ControlFlow<Self::Break> {
        walk_function_definition(self, f)
    }

    fn visit_gs_input_layout(&mut self, l: &Node<GsInputLayout>) -> ControlFlow<Self::Break> {
        walk_gs_input_layout(self, l)
    }

    // --- Declarations ---
    fn visit_type_specifier(&mut self, t: &TypeSpecifier) -> ControlFlow<Self::Break> {
        walk_type_specifier(self, t)
    }

    fn visit_struct_specifier(&mut self, s: &Node<StructSpecifier>) -> ControlFlow<Self::Break> {
        walk_struct_specifier(self, s)
    }

    fn visit_declaration(&mut self, d: &Node<Declaration>) -> ControlFlow<Self::Break> {
        walk_declaration(self, d)
    }

    fn visit_parameter(&mut self, p: &Node<ParameterDeclarator>) -> ControlFlow<Self::Break> {
        walk_parameter(self, p)
    }

    // --- Statements ---
    fn visit_statement(&mut self, s: &Statement) -> ControlFlow<Self::Break> {
        walk_statement(self, s)
    }

    fn visit_compound(&mut self, s: &Statement, c: &CompoundStatement) -> ControlFlow<Self::Break> {
        walk_compound(self, s, c)
    }

    fn visit_declarator_list(&mut self, s: &Statement, list: &DeclaratorList) -> ControlFlow<Self::Break> {
        walk_declarator_list(self, s, list)
    }

    fn visit_interface_block(&mut self, s: &Statement, block: &InterfaceBlock) -> ControlFlow<Self::Break> {
        walk_interface_block(self, s, block)
    }

    fn visit_expression_statement(
        &mut self,
        s: &Statement,
        e: Option<&Expression>,
    ) -> ControlFlow<Self::Break> {
        walk_expression_statement(self, s, e)
    }

    fn visit_selection(&mut self, s: &Statement, sel: &SelectionStatement) -> ControlFlow<Self::Break> {
        walk_selection(self, s, sel)
    }

    fn visit_switch(&mut self, s: &Statement, sw: &SwitchStatement) -> ControlFlow<Self::Break> {
        walk_switch(self, s, sw)
    }

    fn visit_switch_body(&mut self, b: &Node<SwitchBody>) -> ControlFlow<Self::Break> {
        walk_switch_body(self, b)
    }

    fn visit_case_statement(&mut self, c: &Node<CaseStatement>) -> ControlFlow<Self::Break> {
        walk_case_statement(self, c)
    }

    fn visit_iteration(&mut self, s: &Statement, it: &IterationStatement) -> ControlFlow<Self::Break> {
        walk_iteration(self, s, it)
    }

    fn visit_jump(&mut self, s: &Statement, j: &JumpKind) -> ControlFlow<Self::Break> {
        walk_jump(self, s, j)
    }

    // --- Expressions ---
    fn visit_expression(&mut self, e: &Expression) -> ControlFlow<Self::Break> {
        walk_expression(self, e)
    }
}

// --- Hook helpers ---

/// Run the pre-visit hook if enabled. `Continue(false)` means skip the node.
pub fn enter<V: Visitor>(v: &mut V, node: NodeRef<'_>) -> ControlFlow<V::Break, bool> {
    if v.flags().contains(TraversalFlags::PREVISIT) {
        v.previsit(node)
    } else {
        ControlFlow::Continue(true)
    }
}

/// Run the post-visit hook if enabled.
pub fn leave<V: Visitor>(v: &mut V, node: NodeRef<'_>) -> ControlFlow<V::Break> {
    if v.flags().contains(TraversalFlags::POSTVISIT) {
        v.postvisit(node)
    } else {
        ControlFlow::Continue(())
    }
}

// --- Walk functions: canonical traversal ---

pub fn walk_translation_unit<V: Visitor>(v: &mut V, unit: &TranslationUnit) -> ControlFlow<V::Break> {
    for decl in &unit.external_declarations {
        v.visit_external_declaration(decl)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_external_declaration<V: Visitor>(v: &mut V, d: &ExternalDeclaration) -> ControlFlow<V::Break> {
    match d {
        ExternalDeclaration::Declaration(stmt) => v.visit_statement(stmt),
        ExternalDeclaration::Prototype(proto) => v.visit_function_prototype(proto),
        ExternalDeclaration::Function(func) => v.visit_function_definition(func),
        ExternalDeclaration::GsInputLayout(layout) => v.visit_gs_input_layout(layout),
    }
}

pub fn walk_function_prototype<V: Visitor>(v: &mut V, p: &Node<FunctionPrototype>) -> ControlFlow<V::Break> {
    let node = NodeRef::Prototype(p);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    v.visit_type_specifier(&p.kind.return_type.specifier)?;
    for param in &p.kind.parameters {
        v.visit_parameter(param)?;
    }
    leave(v, node)
}

pub fn walk_function_definition<V: Visitor>(v: &mut V, f: &Node<FunctionDefinition>) -> ControlFlow<V::Break> {
    let node = NodeRef::Function(f);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    v.visit_function_prototype(&f.kind.prototype)?;
    v.visit_statement(&f.kind.body)?;
    leave(v, node)
}

pub fn walk_gs_input_layout<V: Visitor>(v: &mut V, l: &Node<GsInputLayout>) -> ControlFlow<V::Break> {
    let node = NodeRef::GsInputLayout(l);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    leave(v, node)
}

pub fn walk_type_specifier<V: Visitor>(v: &mut V, t: &TypeSpecifier) -> ControlFlow<V::Break> {
    match &t.kind {
        TypeSpecifierKind::Struct(s) => v.visit_struct_specifier(s),
        TypeSpecifierKind::Named(_) => ControlFlow::Continue(()),
    }
}

pub fn walk_struct_specifier<V: Visitor>(v: &mut V, s: &Node<StructSpecifier>) -> ControlFlow<V::Break> {
    let node = NodeRef::StructSpecifier(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    for list in &s.kind.declarations {
        v.visit_type_specifier(&list.ty.specifier)?;
    }
    leave(v, node)
}

pub fn walk_declaration<V: Visitor>(v: &mut V, d: &Node<Declaration>) -> ControlFlow<V::Break> {
    let node = NodeRef::Declaration(d);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    if let Some(init) = &d.kind.initializer {
        v.visit_expression(init)?;
    }
    leave(v, node)
}

pub fn walk_parameter<V: Visitor>(v: &mut V, p: &Node<ParameterDeclarator>) -> ControlFlow<V::Break> {
    let node = NodeRef::Parameter(p);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    v.visit_type_specifier(&p.kind.ty.specifier)?;
    leave(v, node)
}

pub fn walk_statement<V: Visitor>(v: &mut V, s: &Statement) -> ControlFlow<V::Break> {
    match &s.kind {
        StmtKind::Compound(c) => v.visit_compound(s, c),
        StmtKind::Declaration(list) => v.visit_declarator_list(s, list),
        StmtKind::InterfaceBlock(block) => v.visit_interface_block(s, block),
        StmtKind::Expression(e) => v.visit_expression_statement(s, e.as_ref()),
        StmtKind::Selection(sel) => v.visit_selection(s, sel),
        StmtKind::Switch(sw) => v.visit_switch(s, sw),
        StmtKind::Iteration(it) => v.visit_iteration(s, it),
        StmtKind::Jump(j) => v.visit_jump(s, j),
    }
}

pub fn walk_compound<V: Visitor>(v: &mut V, s: &Statement, c: &CompoundStatement) -> ControlFlow<V::Break> {
    let node = NodeRef::Statement(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    for stmt in &c.statements {
        v.visit_statement(stmt)?;
    }
    leave(v, node)
}

pub fn walk_declarator_list<V: Visitor>(v: &mut V, s: &Statement, list: &DeclaratorList) -> ControlFlow<V::Break> {
    let node = NodeRef::Statement(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    v.visit_type_specifier(&list.ty.specifier)?;
    for decl in &list.declarations {
        v.visit_declaration(decl)?;
    }
    leave(v, node)
}

pub fn walk_interface_block<V: Visitor>(v: &mut V, s: &Statement, block: &InterfaceBlock) -> ControlFlow<V::Break> {
    let node = NodeRef::Statement(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    for list in &block.declarations {
        v.visit_type_specifier(&list.ty.specifier)?;
    }
    leave(v, node)
}

pub fn walk_expression_statement<V: Visitor>(
    v: &mut V,
    s: &Statement,
    e: Option<&Expression>,
) -> ControlFlow<V::Break> {
    let node = NodeRef::Statement(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    if let Some(e) = e {
        v.visit_expression(e)?;
    }
    leave(v, node)
}

pub fn walk_selection<V: Visitor>(v: &mut V, s: &Statement, sel: &SelectionStatement) -> ControlFlow<V::Break> {
    let node = NodeRef::Statement(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    v.visit_expression(&sel.condition)?;
    v.visit_statement(&sel.then_statement)?;
    if let Some(else_statement) = &sel.else_statement {
        v.visit_statement(else_statement)?;
    }
    leave(v, node)
}

pub fn walk_switch<V: Visitor>(v: &mut V, s: &Statement, sw: &SwitchStatement) -> ControlFlow<V::Break> {
    let node = NodeRef::Statement(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    v.visit_expression(&sw.test)?;
    v.visit_switch_body(&sw.body)?;
    leave(v, node)
}

pub fn walk_switch_body<V: Visitor>(v: &mut V, b: &Node<SwitchBody>) -> ControlFlow<V::Break> {
    let node = NodeRef::SwitchBody(b);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    for case in &b.kind.cases {
        v.visit_case_statement(case)?;
    }
    leave(v, node)
}

pub fn walk_case_statement<V: Visitor>(v: &mut V, c: &Node<CaseStatement>) -> ControlFlow<V::Break> {
    let node = NodeRef::Case(c);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    for label in &c.kind.labels {
        if let CaseLabel::Case(e) = label {
            v.visit_expression(e)?;
        }
    }
    for stmt in &c.kind.statements {
        v.visit_statement(stmt)?;
    }
    leave(v, node)
}

pub fn walk_iteration<V: Visitor>(v: &mut V, s: &Statement, it: &IterationStatement) -> ControlFlow<V::Break> {
    let node = NodeRef::Statement(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    walk_iteration_children(v, it)?;
    leave(v, node)
}

/// Init, condition, body, then increment: the order a loop's parts are
/// analysed in.
pub fn walk_iteration_children<V: Visitor>(v: &mut V, it: &IterationStatement) -> ControlFlow<V::Break> {
    if let Some(init) = &it.init {
        v.visit_statement(init)?;
    }
    if let Some(condition) = &it.condition {
        v.visit_expression(condition)?;
    }
    v.visit_statement(&it.body)?;
    if let Some(rest) = &it.rest {
        v.visit_expression(rest)?;
    }
    ControlFlow::Continue(())
}

pub fn walk_jump<V: Visitor>(v: &mut V, s: &Statement, j: &JumpKind) -> ControlFlow<V::Break> {
    let node = NodeRef::Statement(s);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    if let JumpKind::Return(Some(value)) = j {
        v.visit_expression(value)?;
    }
    leave(v, node)
}

pub fn walk_expression<V: Visitor>(v: &mut V, e: &Expression) -> ControlFlow<V::Break> {
    let node = NodeRef::Expression(e);
    if !enter(v, node)? {
        return ControlFlow::Continue(());
    }
    match &e.kind {
        ExprKind::Identifier(_)
        | ExprKind::IntConstant(_)
        | ExprKind::UintConstant(_)
        | ExprKind::FloatConstant(_)
        | ExprKind::BoolConstant(_) => {}
        ExprKind::Unary(_, operand) => v.visit_expression(operand)?,
        ExprKind::Binary(_, left, right)
        | ExprKind::Assign(_, left, right)
        | ExprKind::ArrayIndex(left, right) => {
            v.visit_expression(left)?;
            v.visit_expression(right)?;
        }
        ExprKind::Conditional(cond, then_expr, else_expr) => {
            v.visit_expression(cond)?;
            v.visit_expression(then_expr)?;
            v.visit_expression(else_expr)?;
        }
        ExprKind::FieldSelection(sel) => {
            v.visit_expression(&sel.base)?;
            for arg in sel.method_args.iter().flatten() {
                v.visit_expression(arg)?;
            }
        }
        ExprKind::Call(call) => {
            for arg in &call.args {
                v.visit_expression(arg)?;
            }
        }
        ExprKind::Sequence(elements) | ExprKind::Aggregate(elements) => {
            for elem in elements {
                v.visit_expression(elem)?;
            }
        }
    }
    leave(v, node)
}
