use crate::analyzer::{analyze, Analysis};
use crate::ast::*;
use crate::builder::{unit, AstBuilder};
use crate::builtins::BuiltinRegistry;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::ir::VariableMode;
use crate::options::ShaderOptions;
use crate::reflection::Qualifier;
use crate::types::{Interpolation, Type};
use spirv::{ExecutionMode, ExecutionModel};

/// Helper to analyze a unit, expecting no fatal error
fn analyze_unit(options: ShaderOptions, items: Vec<ExternalDeclaration>) -> (Analysis, Diagnostics) {
    let builtins = BuiltinRegistry::new();
    let mut diagnostics = Diagnostics::new();
    let analysis = analyze(&unit(items), &options, &builtins, &mut diagnostics).expect("analysis should not fail");
    (analysis, diagnostics)
}

fn global(stmt: Statement) -> ExternalDeclaration {
    ExternalDeclaration::Declaration(stmt)
}

fn geometry() -> ShaderOptions {
    ShaderOptions::new(ExecutionModel::Geometry).with_version(150, false)
}

#[test]
fn test_every_declared_name_is_bound_or_skipped() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let two = b.array(&[Some(2)]);
    let decls = vec![
        b.declaration("a", None, None),
        b.declaration("b", Some(two), None),
        b.declaration("c", None, None),
    ];
    let list = b.declarator_list(float, decls);
    let void = b.ty("void");
    let skipped = b.declare(void, &["v"]);
    let unknown = b.ty("Missing");
    let unresolved = b.declare(unknown, &["w"]);

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(list), global(skipped), global(unresolved)]);

    assert_eq!(analysis.global("a").unwrap().ty, Type::float());
    assert_eq!(analysis.global("b").unwrap().ty, Type::array_of(Type::float(), Some(2)));
    assert!(analysis.global("c").is_some());
    assert!(analysis.global("v").is_none());
    assert!(analysis.global("w").is_none());
    assert_eq!(diagnostics.of_kind(DiagnosticKind::VoidVariable).count(), 1);
    assert_eq!(diagnostics.of_kind(DiagnosticKind::UnknownType).count(), 1);

    // Reflection keeps a slot for every name, bound or not
    let names: Vec<&str> = analysis.reflection.declared().map(|(_, v)| v.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b", "c", "v", "w"]);
}

#[test]
fn test_collision_in_same_scope() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let first = b.declare(float, &["x"]);
    let int = b.ty("int");
    b.at(2, 5);
    let second = b.declare(int, &["x"]);

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(first), global(second)]);

    let collision = diagnostics.of_kind(DiagnosticKind::NameCollision).next().unwrap();
    assert_eq!(collision.message, "name `x' already taken in the current scope");
    assert_eq!(collision.span, Span::new(2, 5));
    // First binding is kept
    assert_eq!(analysis.global("x").unwrap().ty, Type::float());
}

#[test]
fn test_shadowing_in_nested_scope() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let outer = b.declare(float, &["x"]);
    let int = b.ty("int");
    let inner = b.declare(int, &["x"]);
    let x = b.ident("x");
    let use_x = b.expr_stmt(x);
    let x_id = match &use_x.kind {
        StmtKind::Expression(Some(e)) => e.id(),
        _ => unreachable!(),
    };
    let main = b.main(vec![inner, use_x]);

    let (analysis, diagnostics) =
        analyze_unit(ShaderOptions::default(), vec![global(outer), ExternalDeclaration::Function(main)]);

    assert!(diagnostics.is_empty());
    assert_eq!(analysis.variable_of(x_id).unwrap().ty, Type::int());
    assert_eq!(analysis.global("x").unwrap().ty, Type::float());
}

#[test]
fn test_struct_redefinition() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let member = b.member(float, &["x"]);
    let first = b.struct_definition("S", vec![member.clone()]);
    let second = b.struct_definition("S", vec![member]);

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(first), global(second)]);

    let redefinition = diagnostics.of_kind(DiagnosticKind::TypeRedefinition).next().unwrap();
    assert_eq!(redefinition.message, "struct `S' previously defined");
    assert_eq!(analysis.user_structures.len(), 1);
}

#[test]
fn test_struct_names_are_validated() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let member = b.member(float, &["gl_x", "y__z"]);
    let stmt = b.struct_definition("gl_S", vec![member]);

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(stmt)]);

    let invalid: Vec<_> = diagnostics.of_kind(DiagnosticKind::InvalidIdentifier).collect();
    assert_eq!(invalid.len(), 3);
    assert_eq!(invalid.iter().filter(|d| d.is_error()).count(), 2);
    assert!(invalid.iter().any(|d| d.message.contains("`gl_S'")));
    assert!(invalid.iter().any(|d| d.message.contains("`gl_x'")));
    assert_eq!(analysis.user_structures.len(), 1);
}

#[test]
fn test_plain_struct_matrix_layout_is_unchecked() {
    let mut b = AstBuilder::new();
    let row = b.qualified(QualifierFlags::ROW_MAJOR, "mat4");
    let both = b.qualified(QualifierFlags::ROW_MAJOR | QualifierFlags::COLUMN_MAJOR, "vec4");
    let members = vec![b.member(row, &["m"]), b.member(both, &["v"])];
    let stmt = b.struct_definition("S", members);

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(stmt)]);

    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let fields = &analysis.user_structures[0].fields;
    assert!(fields[0].row_major);
    assert!(!fields[1].row_major);
}

fn nested_struct(b: &mut AstBuilder) -> Statement {
    let float = b.ty("float");
    let inner_member = b.member(float, &["x"]);
    let inner = b.struct_specifier("Inner", vec![inner_member]);
    let inner_ty = b.struct_type(QualifierFlags::empty(), inner);
    let outer_member = b.member(inner_ty, &["i"]);
    b.struct_definition("Outer", vec![outer_member])
}

#[test]
fn test_embedded_struct_depends_on_version() {
    let mut b = AstBuilder::new();
    let stmt = nested_struct(&mut b);
    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(stmt)]);
    assert!(diagnostics.is_empty());
    let outer = analysis.global_type("Outer").unwrap().as_record().unwrap().clone();
    assert_eq!(outer.fields[0].ty.as_record().unwrap().name, "Inner");

    let mut b = AstBuilder::new();
    let stmt = nested_struct(&mut b);
    let options = ShaderOptions::default().with_version(330, false);
    let (_, diagnostics) = analyze_unit(options, vec![global(stmt)]);
    let embedded = diagnostics.of_kind(DiagnosticKind::EmbeddedStruct).next().unwrap();
    assert_eq!(embedded.message, "embedded structure declarations are not allowed");
}

#[test]
fn test_parameters() {
    let mut b = AstBuilder::new();
    let mut unsized_ty = b.ty("float");
    unsized_ty.specifier.array_specifier = Some(b.array(&[None]));
    let bad = b.parameter(unsized_ty, Some("values"));
    let float = b.ty("float");
    let placeholder = b.parameter(float, None);
    let vec3 = b.qualified(QualifierFlags::INOUT, "vec3");
    let inout = b.parameter(vec3, Some("v"));
    let inout_id = inout.id();
    let void = b.ty("void");
    let proto = b.prototype(void, "f", vec![bad, placeholder, inout]);
    let f = b.function(proto, Vec::new());

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![ExternalDeclaration::Function(f)]);

    let unsized_param = diagnostics.of_kind(DiagnosticKind::UnsizedArrayParameter).next().unwrap();
    assert_eq!(unsized_param.message, "arrays passed as parameters must have a declared size");
    assert_eq!(diagnostics.errors().count(), 1);

    let v = analysis.variable_of(inout_id).unwrap();
    assert_eq!(v.mode, VariableMode::FunctionInOut);
    let reflected = analysis.reflection.find_declared("v").unwrap();
    assert_eq!(reflected.qualifier, Qualifier::ParamInOut);

    // Parameters are scoped to the function
    assert!(analysis.global("v").is_none());
    let signature = &analysis.functions.overloads("f")[0];
    assert_eq!(signature.parameter_types, vec![Type::Error, Type::float(), Type::vec(3)]);
}

#[test]
fn test_void_parameter_list() {
    let mut b = AstBuilder::new();
    let void_param_ty = b.ty("void");
    let void_param = b.parameter(void_param_ty, None);
    let ret = b.ty("float");
    let proto = b.prototype(ret, "g", vec![void_param]);

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![ExternalDeclaration::Prototype(proto)]);
    assert!(diagnostics.is_empty());
    assert!(analysis.functions.find("g", &[]).is_some());
}

/// `in vec4 color[];` followed by `main` indexing it at `index`
fn gs_input_then_access(b: &mut AstBuilder, index: i32) -> Vec<ExternalDeclaration> {
    let ty = b.qualified(QualifierFlags::IN, "vec4");
    let dims = b.array(&[None]);
    let decl = b.declaration("color", Some(dims), None);
    let input = b.declarator_list(ty, vec![decl]);

    let base = b.ident("color");
    let i = b.int(index);
    let access = b.index(base, i);
    let stmt = b.expr_stmt(access);
    let main = b.main(vec![stmt]);
    vec![global(input), ExternalDeclaration::Function(main)]
}

#[test]
fn test_gs_layout_sizes_earlier_inputs() {
    let mut b = AstBuilder::new();
    let mut items = gs_input_then_access(&mut b, 2);
    items.push(ExternalDeclaration::GsInputLayout(b.gs_input_layout(ExecutionMode::Triangles)));

    let (analysis, diagnostics) = analyze_unit(geometry(), items);
    assert!(!diagnostics.has_errors(), "{:?}", diagnostics);
    let color = analysis.global("color").unwrap();
    assert_eq!(color.ty, Type::array_of(Type::vec(4), Some(3)));
    assert_eq!(color.max_array_access, 2);
    assert!(color.read_only);
    assert_eq!(analysis.inputs().count(), 1);
    assert_eq!(analysis.gs_input_primitive, Some(ExecutionMode::Triangles));
}

#[test]
fn test_gs_layout_conflicts_with_earlier_access() {
    let mut b = AstBuilder::new();
    let mut items = gs_input_then_access(&mut b, 3);
    items.push(ExternalDeclaration::GsInputLayout(b.gs_input_layout(ExecutionMode::Triangles)));

    let (analysis, diagnostics) = analyze_unit(geometry(), items);
    let conflict = diagnostics.of_kind(DiagnosticKind::GeometryInputSize).next().unwrap();
    assert_eq!(
        conflict.message,
        "this geometry shader input layout implies 3 vertices, but an access to element 3 of input `color' already exists"
    );
    assert!(analysis.global("color").unwrap().ty.is_unsized_array());
}

#[test]
fn test_gs_inputs_after_layout() {
    let mut b = AstBuilder::new();
    let layout = ExternalDeclaration::GsInputLayout(b.gs_input_layout(ExecutionMode::InputLinesAdjacency));

    let ty = b.qualified(QualifierFlags::IN, "vec3");
    let dims = b.array(&[None]);
    let decl = b.declaration("normal", Some(dims), None);
    let unsized_list = b.declarator_list(ty, vec![decl]);

    let ty = b.qualified(QualifierFlags::IN, "float");
    let dims = b.array(&[Some(2)]);
    let decl = b.declaration("wrong", Some(dims), None);
    let mismatched = b.declarator_list(ty, vec![decl]);

    let ty = b.qualified(QualifierFlags::IN, "float");
    let scalar = b.declare(ty, &["single"]);

    let (analysis, diagnostics) =
        analyze_unit(geometry(), vec![layout, global(unsized_list), global(mismatched), global(scalar)]);

    assert_eq!(analysis.global("normal").unwrap().ty, Type::array_of(Type::vec(3), Some(4)));
    let messages: Vec<&str> = diagnostics
        .of_kind(DiagnosticKind::GeometryInputSize)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].contains("size is 2, but layout requires a size of 4"));
    assert!(messages[1].contains("must be an array"));
}

#[test]
fn test_conflicting_gs_layouts() {
    let mut b = AstBuilder::new();
    let first = ExternalDeclaration::GsInputLayout(b.gs_input_layout(ExecutionMode::Triangles));
    let second = ExternalDeclaration::GsInputLayout(b.gs_input_layout(ExecutionMode::InputPoints));
    let (analysis, diagnostics) = analyze_unit(geometry(), vec![first, second]);
    assert_eq!(diagnostics.of_kind(DiagnosticKind::GeometryInputSize).count(), 1);
    assert_eq!(analysis.gs_input_primitive, Some(ExecutionMode::Triangles));
}

#[test]
fn test_unsized_array_redeclared_with_size() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let dims = b.array(&[None]);
    let decl = b.declaration("a", Some(dims), None);
    let first = b.declarator_list(float.clone(), vec![decl]);
    let dims = b.array(&[Some(4)]);
    let decl = b.declaration("a", Some(dims), None);
    let second = b.declarator_list(float, vec![decl]);

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(first), global(second)]);
    assert!(diagnostics.is_empty());
    assert_eq!(analysis.global("a").unwrap().ty, Type::array_of(Type::float(), Some(4)));
}

#[test]
fn test_builtin_redeclaration() {
    let mut b = AstBuilder::new();
    let ty = b.qualified(QualifierFlags::VARYING, "vec4");
    let dims = b.array(&[Some(4)]);
    let decl = b.declaration("gl_TexCoord", Some(dims), None);
    let tex_coord = b.declarator_list(ty, vec![decl]);
    let ty = b.qualified(QualifierFlags::IN | QualifierFlags::NOPERSPECTIVE, "vec4");
    let frag_coord = b.declare(ty, &["gl_FragCoord"]);

    let (analysis, diagnostics) =
        analyze_unit(ShaderOptions::new(ExecutionModel::Fragment), vec![global(tex_coord), global(frag_coord)]);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    let tex_coord = analysis.global("gl_TexCoord").unwrap();
    assert!(tex_coord.builtin);
    assert_eq!(tex_coord.ty, Type::array_of(Type::vec(4), Some(4)));
    assert_eq!(analysis.global("gl_FragCoord").unwrap().interpolation, Interpolation::NoPerspective);
}

#[test]
fn test_reserved_identifiers() {
    let mut b = AstBuilder::new();
    let float = b.ty("float");
    let reserved = b.declare(float.clone(), &["gl_Mine"]);
    let doubled = b.declare(float, &["my__value"]);

    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(reserved), global(doubled)]);
    let invalid: Vec<_> = diagnostics.of_kind(DiagnosticKind::InvalidIdentifier).collect();
    assert_eq!(invalid.len(), 2);
    assert!(invalid[0].is_error());
    assert!(!invalid[1].is_error());
    assert!(analysis.global("my__value").is_some());
}

#[test]
fn test_storage_qualifiers_follow_stage() {
    let mut b = AstBuilder::new();
    let ty = b.qualified(QualifierFlags::VARYING, "vec2");
    let varying = b.declare(ty, &["uv"]);
    let ty = b.qualified(QualifierFlags::ATTRIBUTE, "vec3");
    let attribute = b.declare(ty, &["position"]);
    let ty = b.qualified(QualifierFlags::CONSTANT, "float");
    let one = b.float(1.0);
    let constant = b.declare_init(ty, "k", one);

    let (analysis, diagnostics) = analyze_unit(
        ShaderOptions::new(ExecutionModel::Vertex),
        vec![global(varying), global(attribute), global(constant)],
    );
    assert!(diagnostics.is_empty());
    assert_eq!(analysis.global("uv").unwrap().mode, VariableMode::ShaderOut);
    let position = analysis.global("position").unwrap();
    assert_eq!(position.mode, VariableMode::ShaderIn);
    assert!(position.read_only);
    let k = analysis.global("k").unwrap();
    assert!(k.constant && k.read_only);

    let mut b = AstBuilder::new();
    let ty = b.qualified(QualifierFlags::ATTRIBUTE, "vec3");
    let attribute = b.declare(ty, &["position"]);
    let (_, diagnostics) = analyze_unit(ShaderOptions::new(ExecutionModel::Fragment), vec![global(attribute)]);
    assert_eq!(diagnostics.of_kind(DiagnosticKind::InvalidStorageQualifier).count(), 1);
}

#[test]
fn test_matrix_layout_on_plain_uniform() {
    let mut b = AstBuilder::new();
    let ty = b.qualified(QualifierFlags::UNIFORM | QualifierFlags::ROW_MAJOR, "mat4");
    let stmt = b.declare(ty, &["m"]);
    let (_, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(stmt)]);
    assert_eq!(diagnostics.of_kind(DiagnosticKind::InvalidMatrixLayout).count(), 1);
}

fn block_members(b: &mut AstBuilder) -> Vec<DeclaratorList> {
    let mat4 = b.ty("mat4");
    let matrix = b.member(mat4, &["model"]);
    let column = b.qualified(QualifierFlags::COLUMN_MAJOR, "mat3");
    let normal = b.member(column, &["normal"]);
    let vec4 = b.ty("vec4");
    let tint = b.member(vec4, &["tint"]);
    vec![matrix, normal, tint]
}

#[test]
fn test_uniform_block_with_instance() {
    let mut b = AstBuilder::new();
    let members = block_members(&mut b);
    let block = b.interface_block(
        QualifierFlags::UNIFORM | QualifierFlags::ROW_MAJOR,
        "Transforms",
        Some("xf"),
        members,
    );

    let (analysis, diagnostics) =
        analyze_unit(ShaderOptions::default().with_version(330, false), vec![global(block)]);
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);

    let xf = analysis.global("xf").unwrap();
    assert_eq!(xf.mode, VariableMode::Uniform);
    let record = xf.ty.as_record().unwrap();
    let row_major: Vec<bool> = record.fields.iter().map(|f| f.row_major).collect();
    assert_eq!(row_major, vec![true, false, true]);
    assert!(analysis.global("model").is_none());
    assert_eq!(analysis.interface_blocks.len(), 1);
}

#[test]
fn test_block_without_instance_binds_members() {
    let mut b = AstBuilder::new();
    let members = block_members(&mut b);
    let block = b.interface_block(QualifierFlags::UNIFORM, "Transforms", None, members);

    let (analysis, _) = analyze_unit(ShaderOptions::default().with_version(330, false), vec![global(block)]);
    assert_eq!(analysis.global("model").unwrap().ty, Type::mat(4, 4));
    assert_eq!(analysis.global("tint").unwrap().mode, VariableMode::Uniform);
    let names: Vec<&str> = analysis.reflection.declared().map(|(_, v)| v.name.as_str()).collect();
    assert_eq!(names, vec!["model", "normal", "tint"]);
}

#[test]
fn test_block_storage_must_be_interface() {
    let mut b = AstBuilder::new();
    let members = block_members(&mut b);
    let block = b.interface_block(QualifierFlags::CONSTANT, "Bad", Some("bad"), members);
    let (analysis, diagnostics) = analyze_unit(ShaderOptions::default(), vec![global(block)]);
    assert_eq!(diagnostics.of_kind(DiagnosticKind::InvalidInterfaceBlock).count(), 1);
    assert!(analysis.global("bad").is_none());
}
