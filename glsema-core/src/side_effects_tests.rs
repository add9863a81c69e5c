use crate::analyzer::{analyze, Analysis};
use crate::annotations::Annotations;
use crate::ast::*;
use crate::builder::{unit, AstBuilder};
use crate::builtins::{BuiltinRegistry, EMIT_VERTEX};
use crate::diagnostics::Diagnostics;
use crate::options::ShaderOptions;
use crate::side_effects::{children, intrinsic_effects, propagate, SideEffects};
use crate::visitor::{NodeRef, TraversalFlags, Visitor};
use spirv::{ExecutionMode, ExecutionModel};
use std::ops::ControlFlow;

fn analyze_items(options: ShaderOptions, items: Vec<ExternalDeclaration>) -> Analysis {
    let builtins = BuiltinRegistry::new();
    let mut diagnostics = Diagnostics::new();
    let analysis = analyze(&unit(items), &options, &builtins, &mut diagnostics).expect("analysis should not fail");
    assert!(!diagnostics.has_errors(), "{:?}", diagnostics);
    analysis
}

fn expr_of(stmt: &Statement) -> NodeId {
    match &stmt.kind {
        StmtKind::Expression(Some(e)) => e.id(),
        _ => panic!("expected an expression statement"),
    }
}

/// Checks every node's stored mask against its own effect and its children
struct UnionLaw<'a> {
    analysis: &'a Analysis,
    checked: usize,
}

impl Visitor for UnionLaw<'_> {
    type Break = ();

    fn flags(&self) -> TraversalFlags {
        TraversalFlags::POSTVISIT
    }

    fn postvisit(&mut self, node: NodeRef<'_>) -> ControlFlow<()> {
        let expected = children(node)
            .into_iter()
            .fold(intrinsic_effects(node), |acc, child| acc | self.analysis.side_effects(child));
        assert_eq!(self.analysis.side_effects(node.id()), expected, "node {:?}", node.id());
        self.checked += 1;
        ControlFlow::Continue(())
    }
}

#[test]
fn test_assignment_and_increment() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let decl = b.declare(float, &["x"]);
    let x = b.ident("x");
    let x_id = x.id();
    let one = b.float(1.0);
    let assign = b.assign(x, one);
    let assign_stmt = b.expr_stmt(assign);
    let x = b.ident("x");
    let inc = b.unary(UnaryOp::PostInc, x);
    let inc_stmt = b.expr_stmt(inc);
    let x = b.ident("x");
    let two = b.float(2.0);
    let sum = b.binary(BinaryOp::Add, x, two);
    let pure_stmt = b.expr_stmt(sum);
    let (assign_id, inc_id, pure_id) = (expr_of(&assign_stmt), expr_of(&inc_stmt), expr_of(&pure_stmt));
    let pure_stmt_id = pure_stmt.id();
    let main = b.main(vec![decl, assign_stmt, inc_stmt, pure_stmt]);
    let body_id = main.kind.body.id();

    let analysis = analyze_items(ShaderOptions::default(), vec![ExternalDeclaration::Function(main)]);

    assert_eq!(analysis.side_effects(assign_id), SideEffects::GENERAL);
    assert_eq!(analysis.side_effects(inc_id), SideEffects::GENERAL);
    assert!(analysis.side_effects(x_id).is_empty());
    assert!(analysis.side_effects(pure_id).is_empty());
    assert!(analysis.side_effects(pure_stmt_id).is_empty());
    assert_eq!(analysis.side_effects(body_id), SideEffects::GENERAL);
}

#[test]
fn test_function_definitions_are_general() {
    let mut b = AstBuilder::new();
    let main = b.main(Vec::new());
    let main_id = main.id();
    let analysis = analyze_items(ShaderOptions::default(), vec![ExternalDeclaration::Function(main)]);
    assert_eq!(analysis.side_effects(main_id), SideEffects::GENERAL);
}

#[test]
fn test_emit_vertex_reaches_enclosing_loop() {
    let mut b = AstBuilder::new();
    let layout = b.gs_input_layout(ExecutionMode::Triangles);

    let emit = b.call(EMIT_VERTEX, Vec::new());
    let emit_id = emit.id();
    let emit_stmt = b.expr_stmt(emit);
    let body = b.compound(vec![emit_stmt]);
    let int = b.ty("int");
    let zero = b.int(0);
    let init = b.declare_init(int, "i", zero);
    let i = b.ident("i");
    let three = b.int(3);
    let cond = b.binary(BinaryOp::Less, i, three);
    let cond_id = cond.id();
    let i = b.ident("i");
    let step = b.unary(UnaryOp::PreInc, i);
    let loop_stmt = b.for_loop(Some(init), Some(cond), Some(step), body);
    let loop_id = loop_stmt.id();
    let main = b.main(vec![loop_stmt]);
    let main_id = main.id();

    let options = ShaderOptions::new(ExecutionModel::Geometry).with_version(150, false);
    let analysis = analyze_items(
        options,
        vec![ExternalDeclaration::GsInputLayout(layout), ExternalDeclaration::Function(main)],
    );

    assert_eq!(analysis.side_effects(emit_id), SideEffects::EMIT_VERTEX);
    assert!(analysis.side_effects(cond_id).is_empty());
    // The increment in the loop's step is a general effect too
    assert_eq!(analysis.side_effects(loop_id), SideEffects::EMIT_VERTEX | SideEffects::GENERAL);
    assert_eq!(analysis.side_effects(main_id), SideEffects::EMIT_VERTEX | SideEffects::GENERAL);
    assert_eq!(analysis.annotations.is_builtin_call(emit_id), Some(true));
}

#[test]
fn test_discard_inside_selection() {
    let mut b = AstBuilder::new();
    let ty = b.qualified(QualifierFlags::UNIFORM, "bool");
    let uniform = b.declare(ty, &["cutout"]);
    let cond = b.ident("cutout");
    let cond_id = cond.id();
    let discard = b.discard();
    let discard_id = discard.id();
    let selection = b.if_else(cond, discard, None);
    let selection_id = selection.id();
    let main = b.main(vec![selection]);

    let analysis = analyze_items(
        ShaderOptions::default(),
        vec![ExternalDeclaration::Declaration(uniform), ExternalDeclaration::Function(main)],
    );

    assert_eq!(analysis.side_effects(discard_id), SideEffects::DISCARD);
    assert!(analysis.side_effects(cond_id).is_empty());
    assert_eq!(analysis.side_effects(selection_id), SideEffects::DISCARD);
}

#[test]
fn test_initializer_effects_reach_declaration() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let decl_a = b.declare(float.clone(), &["a"]);
    let a = b.ident("a");
    let one = b.float(1.0);
    let assign = b.assign(a, one);
    let decl_b = b.declare_init(float, "b", assign);
    let decl_b_id = decl_b.id();
    let main = b.main(vec![decl_a, decl_b]);

    let analysis = analyze_items(ShaderOptions::default(), vec![ExternalDeclaration::Function(main)]);
    assert_eq!(analysis.side_effects(decl_b_id), SideEffects::GENERAL);
}

#[test]
fn test_every_mask_is_union_of_children() {
    let mut b = AstBuilder::new();
    let ty = b.qualified(QualifierFlags::UNIFORM, "int");
    let uniform = b.declare(ty, &["mode"]);

    let float = b.ty("float");
    let decl = b.declare(float, &["x"]);
    let x = b.ident("x");
    let one = b.float(1.0);
    let assign = b.assign(x, one);
    let assign_stmt = b.expr_stmt(assign);
    let discard = b.discard();
    let zero = b.int(0);
    let first = b.case(vec![CaseLabel::Case(zero)], vec![assign_stmt]);
    let second = b.case(vec![CaseLabel::Default], vec![discard]);
    let test = b.ident("mode");
    let switch = b.switch(test, vec![first, second]);

    let x = b.ident("x");
    let two = b.float(2.0);
    let less = b.binary(BinaryOp::Less, x, two);
    let x = b.ident("x");
    let inc = b.unary(UnaryOp::PreInc, x);
    let inc_stmt = b.expr_stmt(inc);
    let body = b.compound(vec![inc_stmt]);
    let do_while = b.do_while(body, less);
    let main = b.main(vec![decl, switch, do_while]);

    let items = vec![ExternalDeclaration::Declaration(uniform), ExternalDeclaration::Function(main)];
    let tu = unit(items.clone());
    let analysis = analyze_items(ShaderOptions::default(), items);

    let mut law = UnionLaw {
        analysis: &analysis,
        checked: 0,
    };
    assert!(law.visit_translation_unit(&tu).is_continue());
    assert!(law.checked > 20);
}

#[test]
fn test_propagate_stores_mask() {
    let mut b = AstBuilder::new();
    let x = b.ident("x");
    let x_id = x.id();
    let one = b.int(1);
    let assign = b.assign(x, one);
    let emit = b.call(EMIT_VERTEX, Vec::new());
    let seq = b.sequence(vec![assign, emit]);
    let seq_id = seq.id();

    let mut annotations = Annotations::new();
    let ExprKind::Sequence(elements) = &seq.kind else {
        unreachable!()
    };
    for element in elements {
        if let ExprKind::Assign(_, lhs, rhs) = &element.kind {
            propagate(&mut annotations, NodeRef::Expression(lhs));
            propagate(&mut annotations, NodeRef::Expression(rhs));
        }
        propagate(&mut annotations, NodeRef::Expression(element));
    }
    let mask = propagate(&mut annotations, NodeRef::Expression(&seq));

    assert_eq!(mask, SideEffects::GENERAL | SideEffects::EMIT_VERTEX);
    assert_eq!(annotations.side_effects(seq_id), mask);
    assert!(annotations.side_effects(x_id).is_empty());
}
