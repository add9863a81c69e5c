//! The semantic pass: one depth-first walk that owns scoping and dispatches
//! each node to binding, typing and side-effect propagation.

use crate::ast::*;
use crate::builtins::BuiltinOracle;
use crate::context::CompilationContext;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::error::{CompilerError, Result};
use crate::ir::{FunctionRegistry, IrVariable, IrVariables, VarId};
use crate::options::ShaderOptions;
use crate::reflection::ReflectionInterface;
use crate::scope::Scope;
use crate::side_effects::{self, SideEffects};
use crate::type_resolver::classify_selection;
use crate::types::{RecordType, Type};
use crate::visitor::{self, NodeRef, TraversalFlags, Visitor};
use crate::{bail_ast_at, bail_undef_at};
use spirv::ExecutionMode;
use std::ops::ControlFlow;
use std::sync::Arc;

pub use crate::annotations::{Annotations, NodeAnnotation, SelectionKind};

/// Convert a fallible step into a traversal break.
fn flow<T>(result: Result<T>) -> ControlFlow<CompilerError, T> {
    match result {
        Ok(value) => ControlFlow::Continue(value),
        Err(err) => ControlFlow::Break(err),
    }
}

/// Everything the pass produces for one translation unit
#[derive(Debug)]
pub struct Analysis {
    /// Variables and types left in the global scope
    pub globals: Scope,
    pub variables: IrVariables,
    /// Shader inputs in declaration order
    pub input_variables: Vec<VarId>,
    pub user_structures: Vec<Arc<RecordType>>,
    pub interface_blocks: Vec<Arc<RecordType>>,
    pub functions: FunctionRegistry,
    pub reflection: ReflectionInterface,
    pub annotations: Annotations,
    pub gs_input_primitive: Option<ExecutionMode>,
}

impl Analysis {
    /// Global variable by name
    pub fn global(&self, name: &str) -> Option<&IrVariable> {
        self.globals.variable(name).map(|id| self.variables.get(id))
    }

    pub fn global_type(&self, name: &str) -> Option<&Type> {
        self.globals.ty(name)
    }

    pub fn inputs(&self) -> impl Iterator<Item = &IrVariable> {
        self.input_variables.iter().map(|id| self.variables.get(*id))
    }

    /// Variable bound by a declaration, or referenced by an identifier
    pub fn variable_of(&self, node: NodeId) -> Option<&IrVariable> {
        self.annotations.variable(node).map(|id| self.variables.get(id))
    }

    pub fn side_effects(&self, node: NodeId) -> SideEffects {
        self.annotations.side_effects(node)
    }
}

/// Run the pass over a whole translation unit.
///
/// Source-level problems go to `sink` and the pass continues; the returned
/// error is reserved for malformed input the pass cannot make sense of.
pub fn analyze(
    unit: &TranslationUnit,
    options: &ShaderOptions,
    builtins: &dyn BuiltinOracle,
    sink: &mut dyn DiagnosticSink,
) -> Result<Analysis> {
    let mut analyzer = SemanticAnalyzer::new(CompilationContext::new(options, builtins, sink));
    if let ControlFlow::Break(err) = analyzer.visit_translation_unit(unit) {
        return Err(err);
    }
    Ok(analyzer.finish())
}

pub struct SemanticAnalyzer<'a> {
    pub ctx: CompilationContext<'a>,
}

impl<'a> SemanticAnalyzer<'a> {
    pub fn new(ctx: CompilationContext<'a>) -> Self {
        SemanticAnalyzer { ctx }
    }

    pub fn finish(self) -> Analysis {
        let ctx = self.ctx;
        Analysis {
            globals: ctx.scopes.into_global_scope(),
            variables: ctx.variables,
            input_variables: ctx.input_variables,
            user_structures: ctx.user_structures,
            interface_blocks: ctx.interface_blocks,
            functions: ctx.functions,
            reflection: ctx.reflection,
            annotations: ctx.annotations,
            gs_input_primitive: ctx.gs_input_primitive,
        }
    }

    fn pop_scope(&mut self) -> ControlFlow<CompilerError> {
        flow(self.ctx.scopes.pop_scope())?;
        ControlFlow::Continue(())
    }

    /// Bind a prototype's parameters in the current scope and register it.
    fn bind_prototype(&mut self, p: &Node<FunctionPrototype>) -> ControlFlow<CompilerError> {
        self.visit_type_specifier(&p.kind.return_type.specifier)?;
        for param in &p.kind.parameters {
            self.visit_parameter(param)?;
        }
        self.ctx.save_function(p);
        ControlFlow::Continue(())
    }

    /// First sight of an identifier: resolve it in the current scope and
    /// describe it for reflection.
    fn resolve_identifier(&mut self, e: &Expression, name: &str) -> Result<()> {
        if self.ctx.annotations.variable(e.id()).is_some() {
            return Ok(());
        }
        let Some(id) = self.ctx.scopes.lookup_variable(name) else {
            bail_undef_at!(e.span(), "{}", name);
        };
        let reflection = self.ctx.reflection.describe(self.ctx.variables.get(id), self.ctx.options.stage);
        let ann = self.ctx.annotations.entry(e.id());
        ann.variable = Some(id);
        ann.reflection.get_or_insert(reflection);
        Ok(())
    }

    /// Record constant indices against the indexed variable and check them
    /// against sized arrays.
    fn record_array_access(&mut self, e: &Expression, base: &Expression, index: &Expression) {
        let Some(k) = index.kind.int_constant() else {
            return;
        };
        if k < 0 {
            self.ctx.error(
                index.span(),
                DiagnosticKind::IndexOutOfBounds,
                format!("array index must be >= 0, got {}", k),
            );
            return;
        }
        let k = k as u32;

        let base_ty = self.ctx.annotations.ty(base.id()).cloned().unwrap_or(Type::Error);
        let bound = match &base_ty {
            Type::Array(_, length) => *length,
            Type::Vector(_, n) => Some(u32::from(*n)),
            Type::Matrix { columns, .. } => Some(u32::from(*columns)),
            _ => None,
        };
        if let Some(bound) = bound {
            if k >= bound {
                self.ctx.error(
                    e.span(),
                    DiagnosticKind::IndexOutOfBounds,
                    format!("index {} out of bounds for `{}'", k, base_ty),
                );
            }
        }

        if let ExprKind::Identifier(_) = &base.kind {
            if let Some(var) = self.ctx.annotations.variable(base.id()) {
                let var = self.ctx.variables.get_mut(var);
                var.max_array_access = var.max_array_access.max(k);
            }
        }
    }

    fn classify_field_selection(&mut self, e: &Expression, sel: &FieldSelection) -> Result<()> {
        let base_ty = self.ctx.annotations.ty(sel.base.id()).cloned().unwrap_or(Type::Error);
        if base_ty.is_error() {
            return Ok(());
        }
        match classify_selection(&base_ty, sel, self.ctx.options.relaxed_scalar_swizzle()) {
            Some(kind) => {
                self.ctx.annotations.entry(e.id()).selection = Some(kind);
                Ok(())
            }
            None => bail_ast_at!(
                e.span(),
                "`.{}' on `{}' is not a struct member, method or swizzle",
                sel.field,
                base_ty
            ),
        }
    }

    fn annotate_call(&mut self, e: &Expression, call: &FunctionCall) {
        let builtin = match &call.callee {
            Callee::Constructor(_) => true,
            Callee::Function(name) => {
                let args: Vec<Type> = call
                    .args
                    .iter()
                    .map(|a| self.ctx.annotations.ty(a.id()).cloned().unwrap_or(Type::Error))
                    .collect();
                self.ctx.functions.find(name, &args).is_none() && self.ctx.builtins.is_builtin(name, &args)
            }
        };
        self.ctx.annotations.entry(e.id()).builtin = Some(builtin);
    }

    fn postvisit_expression(&mut self, e: &Expression) -> Result<()> {
        match &e.kind {
            ExprKind::Identifier(name) => self.resolve_identifier(e, name)?,
            ExprKind::FieldSelection(sel) => self.classify_field_selection(e, sel)?,
            ExprKind::Call(call) => self.annotate_call(e, call),
            _ => {}
        }

        let ty = self.ctx.type_expression(e);
        self.ctx.annotations.entry(e.id()).ty = Some(ty);

        if let ExprKind::ArrayIndex(base, index) = &e.kind {
            self.record_array_access(e, base, index);
        }
        Ok(())
    }
}

impl Visitor for SemanticAnalyzer<'_> {
    type Break = CompilerError;

    fn flags(&self) -> TraversalFlags {
        TraversalFlags::PREVISIT | TraversalFlags::POSTVISIT
    }

    fn previsit(&mut self, node: NodeRef<'_>) -> ControlFlow<CompilerError, bool> {
        log::trace!("visit node {} at {}", node.id().0, node.span());
        ControlFlow::Continue(true)
    }

    fn postvisit(&mut self, node: NodeRef<'_>) -> ControlFlow<CompilerError> {
        match node {
            NodeRef::Expression(e) => flow(self.postvisit_expression(e))?,
            NodeRef::GsInputLayout(layout) => flow(self.ctx.apply_gs_input_layout(layout))?,
            _ => {}
        }
        side_effects::propagate(&mut self.ctx.annotations, node);
        ControlFlow::Continue(())
    }

    fn visit_function_prototype(&mut self, p: &Node<FunctionPrototype>) -> ControlFlow<CompilerError> {
        let node = NodeRef::Prototype(p);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        // Parameter names of a bare prototype go out of scope with it
        self.ctx.scopes.push_scope();
        self.bind_prototype(p)?;
        self.pop_scope()?;
        visitor::leave(self, node)
    }

    fn visit_function_definition(&mut self, f: &Node<FunctionDefinition>) -> ControlFlow<CompilerError> {
        let node = NodeRef::Function(f);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        self.ctx.scopes.push_scope();
        self.bind_prototype(&f.kind.prototype)?;
        self.visit_statement(&f.kind.body)?;
        self.pop_scope()?;
        visitor::leave(self, node)
    }

    fn visit_struct_specifier(&mut self, s: &Node<StructSpecifier>) -> ControlFlow<CompilerError> {
        let node = NodeRef::StructSpecifier(s);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        self.ctx.enter_struct_specifier(s.span());
        for list in &s.kind.declarations {
            self.visit_type_specifier(&list.ty.specifier)?;
        }
        self.ctx.leave_struct_specifier();
        flow(self.ctx.bind_struct_specifier(s))?;
        visitor::leave(self, node)
    }

    fn visit_parameter(&mut self, p: &Node<ParameterDeclarator>) -> ControlFlow<CompilerError> {
        let node = NodeRef::Parameter(p);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        self.visit_type_specifier(&p.kind.ty.specifier)?;
        self.ctx.bind_parameter(p);
        visitor::leave(self, node)
    }

    fn visit_compound(&mut self, s: &Statement, c: &CompoundStatement) -> ControlFlow<CompilerError> {
        let node = NodeRef::Statement(s);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        if c.new_scope {
            self.ctx.scopes.push_scope();
        }
        for stmt in &c.statements {
            self.visit_statement(stmt)?;
        }
        if c.new_scope {
            self.pop_scope()?;
        }
        visitor::leave(self, node)
    }

    fn visit_declarator_list(&mut self, s: &Statement, list: &DeclaratorList) -> ControlFlow<CompilerError> {
        let node = NodeRef::Statement(s);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        self.visit_type_specifier(&list.ty.specifier)?;
        let base = self.ctx.resolve_type_specifier(&list.ty.specifier, s.span());

        for decl in &list.declarations {
            let decl_node = NodeRef::Declaration(decl);
            if !visitor::enter(self, decl_node)? {
                continue;
            }
            let var_type = self.ctx.process_array_type(base.clone(), decl.kind.array_specifier.as_ref(), decl.span());
            if let Some(init) = &decl.kind.initializer {
                self.ctx.annotate_aggregate(init, &var_type);
                self.visit_expression(init)?;
            }
            // The name is visible only after its own initializer
            self.ctx.bind_declaration(list, decl, var_type);
            visitor::leave(self, decl_node)?;
        }
        visitor::leave(self, node)
    }

    fn visit_interface_block(&mut self, s: &Statement, block: &InterfaceBlock) -> ControlFlow<CompilerError> {
        let node = NodeRef::Statement(s);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        for list in &block.declarations {
            self.visit_type_specifier(&list.ty.specifier)?;
        }
        flow(self.ctx.bind_interface_block(s, block))?;
        visitor::leave(self, node)
    }

    fn visit_selection(&mut self, s: &Statement, sel: &SelectionStatement) -> ControlFlow<CompilerError> {
        let node = NodeRef::Statement(s);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        self.visit_expression(&sel.condition)?;

        self.ctx.scopes.push_scope();
        self.visit_statement(&sel.then_statement)?;
        self.pop_scope()?;

        if let Some(else_statement) = &sel.else_statement {
            self.ctx.scopes.push_scope();
            self.visit_statement(else_statement)?;
            self.pop_scope()?;
        }
        visitor::leave(self, node)
    }

    fn visit_switch(&mut self, s: &Statement, sw: &SwitchStatement) -> ControlFlow<CompilerError> {
        let node = NodeRef::Statement(s);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        self.visit_expression(&sw.test)?;
        self.ctx.scopes.push_scope();
        self.visit_switch_body(&sw.body)?;
        self.pop_scope()?;
        visitor::leave(self, node)
    }

    fn visit_iteration(&mut self, s: &Statement, it: &IterationStatement) -> ControlFlow<CompilerError> {
        let node = NodeRef::Statement(s);
        if !visitor::enter(self, node)? {
            return ControlFlow::Continue(());
        }
        let scoped = it.mode != IterationMode::DoWhile;
        if scoped {
            self.ctx.scopes.push_scope();
        }
        visitor::walk_iteration_children(self, it)?;
        if scoped {
            self.pop_scope()?;
        }
        visitor::leave(self, node)
    }
}
