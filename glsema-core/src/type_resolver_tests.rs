use crate::annotations::SelectionKind;
use crate::ast::*;
use crate::builder::AstBuilder;
use crate::builtins::BuiltinRegistry;
use crate::context::CompilationContext;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::ir::VariableMode;
use crate::options::ShaderOptions;
use crate::type_resolver::{classify_selection, field_row_major};
use crate::types::{Interpolation, Type};
use spirv::ExecutionModel;

/// Run `f` against a fresh context, returning its result and the diagnostics
fn with_ctx<R>(options: ShaderOptions, f: impl FnOnce(&mut CompilationContext<'_>) -> R) -> (R, Diagnostics) {
    let builtins = BuiltinRegistry::new();
    let mut diagnostics = Diagnostics::new();
    let result = {
        let mut ctx = CompilationContext::new(&options, &builtins, &mut diagnostics);
        f(&mut ctx)
    };
    (result, diagnostics)
}

fn named(name: &str) -> TypeSpecifier {
    TypeSpecifier {
        kind: TypeSpecifierKind::Named(name.to_string()),
        array_specifier: None,
    }
}

fn resolve_array(options: ShaderOptions, base: Type, sizes: &[Option<i32>]) -> (Type, Diagnostics) {
    let mut b = AstBuilder::new();
    let array = b.array(sizes);
    with_ctx(options, |ctx| ctx.process_array_type(base, Some(&array), Span::default()))
}

#[test]
fn test_arrays_of_arrays_are_outermost_first() {
    let options = ShaderOptions::default().with_version(430, false);
    let (ty, diagnostics) = resolve_array(options, Type::float(), &[Some(2), Some(3)]);
    assert!(diagnostics.is_empty());
    assert_eq!(ty, Type::array_of(Type::array_of(Type::float(), Some(3)), Some(2)));
    assert_eq!(ty.to_string(), "float[2][3]");
}

#[test]
fn test_arrays_of_arrays_need_version() {
    let (ty, diagnostics) = resolve_array(ShaderOptions::default(), Type::float(), &[Some(2), Some(3)]);
    assert!(ty.is_error());
    assert_eq!(diagnostics.of_kind(DiagnosticKind::InvalidArraySize).count(), 1);
}

#[test]
fn test_only_outermost_dimension_may_be_unsized() {
    let options = ShaderOptions::default().with_version(430, false);
    let (ty, _) = resolve_array(options.clone(), Type::float(), &[None, Some(4)]);
    assert_eq!(ty, Type::array_of(Type::array_of(Type::float(), Some(4)), None));

    let (ty, diagnostics) = resolve_array(options.clone(), Type::float(), &[Some(4), None]);
    assert!(ty.is_error());
    assert!(diagnostics.has_errors());

    // Element type is already an unsized array
    let (ty, diagnostics) = resolve_array(options, Type::array_of(Type::float(), None), &[Some(2)]);
    assert!(ty.is_error());
    assert!(diagnostics.has_errors());
}

#[test]
fn test_array_size_must_be_positive_constant() {
    let (ty, diagnostics) = resolve_array(ShaderOptions::default(), Type::vec(4), &[Some(0)]);
    assert!(ty.is_error());
    assert_eq!(diagnostics.of_kind(DiagnosticKind::InvalidArraySize).count(), 1);

    let mut b = AstBuilder::new();
    let n = b.ident("n");
    let array = ArraySpecifier {
        dimensions: vec![ArraySize::Sized(Box::new(n))],
    };
    let (ty, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.process_array_type(Type::float(), Some(&array), Span::default())
    });
    assert!(ty.is_error());
    assert!(diagnostics.has_errors());
}

#[test]
fn test_error_type_passes_through_silently() {
    let (ty, diagnostics) = resolve_array(ShaderOptions::default(), Type::Error, &[Some(3)]);
    assert!(ty.is_error());
    assert!(diagnostics.is_empty());
}

#[test]
fn test_unknown_type_name() {
    let (ty, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.resolve_type_specifier(&named("Light"), Span::new(3, 7))
    });
    assert!(ty.is_error());
    let diagnostic = diagnostics.of_kind(DiagnosticKind::UnknownType).next().unwrap();
    assert_eq!(diagnostic.span, Span::new(3, 7));
    assert!(diagnostic.message.contains("Light"));
}

#[test]
fn test_user_type_found_through_scopes() {
    let (ty, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.scopes.declare_type("Alias", Type::vec(3));
        ctx.scopes.push_scope();
        ctx.resolve_type_specifier(&named("Alias"), Span::default())
    });
    assert_eq!(ty, Type::vec(3));
    assert!(diagnostics.is_empty());
}

#[test]
fn test_row_major_inheritance() {
    let none = TypeQualifier::default();
    let row = TypeQualifier::new(QualifierFlags::ROW_MAJOR);
    let column = TypeQualifier::new(QualifierFlags::COLUMN_MAJOR);
    let mat = Type::mat(4, 4);
    let mat_array = Type::array_of(Type::mat(3, 3), Some(2));

    // Inherited
    assert!(field_row_major(&mat, &none, true));
    assert!(!field_row_major(&mat, &none, false));

    // Overridden on matrices and arrays of matrices
    assert!(field_row_major(&mat, &row, false));
    assert!(!field_row_major(&mat_array, &column, true));

    // Ignored on everything else
    assert!(!field_row_major(&Type::vec(4), &row, false));
    assert!(field_row_major(&Type::float(), &column, true));
}

#[test]
fn test_record_fields_one_per_name() {
    let mut b = AstBuilder::new();
    let ty = b.qualified(QualifierFlags::FLAT | QualifierFlags::CENTROID, "float");
    let a = b.array(&[Some(2)]);
    let decls = vec![b.declaration("a", Some(a), None), b.declaration("b", None, None)];
    let list = DeclaratorList {
        ty,
        invariant: false,
        declarations: decls,
    };

    let (fields, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.process_record_fields(std::slice::from_ref(&list), false, None)
    });
    assert!(diagnostics.is_empty());
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[0].name, "a");
    assert_eq!(fields[0].ty, Type::array_of(Type::float(), Some(2)));
    assert_eq!(fields[1].name, "b");
    assert_eq!(fields[1].ty, Type::float());
    for field in &fields {
        assert_eq!(field.interpolation, Interpolation::Flat);
        assert!(field.centroid);
        assert!(!field.sample);
        assert_eq!(field.location, -1);
    }
}

#[test]
fn test_interpolation_only_on_shader_interface() {
    let flat = TypeQualifier::new(QualifierFlags::FLAT);
    let (interp, diagnostics) = with_ctx(ShaderOptions::new(ExecutionModel::Fragment), |ctx| {
        ctx.interpret_interpolation_qualifier(&flat, VariableMode::ShaderIn, Span::default())
    });
    assert_eq!(interp, Interpolation::Flat);
    assert!(diagnostics.is_empty());

    let (_, diagnostics) = with_ctx(ShaderOptions::new(ExecutionModel::Fragment), |ctx| {
        ctx.interpret_interpolation_qualifier(&flat, VariableMode::Uniform, Span::default())
    });
    assert_eq!(diagnostics.of_kind(DiagnosticKind::InvalidInterpolation).count(), 1);

    let (_, diagnostics) = with_ctx(ShaderOptions::new(ExecutionModel::Vertex), |ctx| {
        ctx.interpret_interpolation_qualifier(&flat, VariableMode::ShaderIn, Span::default())
    });
    assert_eq!(diagnostics.of_kind(DiagnosticKind::InvalidInterpolation).count(), 1);

    let (_, diagnostics) = with_ctx(ShaderOptions::new(ExecutionModel::Fragment), |ctx| {
        ctx.interpret_interpolation_qualifier(&flat, VariableMode::ShaderOut, Span::default())
    });
    assert_eq!(diagnostics.of_kind(DiagnosticKind::InvalidInterpolation).count(), 1);
}

#[test]
fn test_member_matrix_layout_rules() {
    let row = TypeQualifier::new(QualifierFlags::ROW_MAJOR);
    let both = TypeQualifier::new(QualifierFlags::ROW_MAJOR | QualifierFlags::COLUMN_MAJOR);

    // Outside a uniform block nothing is checked
    let (_, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.validate_member_matrix_layout(&both, &Type::mat(4, 4), false, Span::default())
    });
    assert!(diagnostics.is_empty());

    let uniform_row = TypeQualifier::new(QualifierFlags::UNIFORM | QualifierFlags::ROW_MAJOR);
    let (_, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.validate_member_matrix_layout(&uniform_row, &Type::vec(2), false, Span::default())
    });
    assert_eq!(diagnostics.warnings().count(), 1);

    let (_, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.validate_member_matrix_layout(&both, &Type::mat(4, 4), true, Span::default())
    });
    assert_eq!(diagnostics.errors().count(), 1);

    // Non-matrix member is only a warning
    let (_, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.validate_member_matrix_layout(&row, &Type::vec(4), true, Span::default())
    });
    assert!(!diagnostics.has_errors());
    assert_eq!(diagnostics.warnings().count(), 1);

    let (_, diagnostics) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.validate_member_matrix_layout(&row, &Type::mat(2, 2), true, Span::default())
    });
    assert!(diagnostics.is_empty());
}

#[test]
fn test_selection_classification() {
    let mut b = AstBuilder::new();
    let base = b.ident("v");
    let swizzle = FieldSelection {
        base: Box::new(base.clone()),
        field: "xy".to_string(),
        method_args: None,
    };
    let method = FieldSelection {
        method_args: Some(Vec::new()),
        field: "length".to_string(),
        ..swizzle.clone()
    };

    assert_eq!(classify_selection(&Type::vec(3), &swizzle, false), Some(SelectionKind::Swizzle));
    assert_eq!(classify_selection(&Type::float(), &swizzle, false), None);
    assert_eq!(classify_selection(&Type::float(), &swizzle, true), Some(SelectionKind::Swizzle));
    let array = Type::array_of(Type::float(), Some(4));
    assert_eq!(classify_selection(&array, &method, false), Some(SelectionKind::Method));
    assert_eq!(classify_selection(&Type::mat(2, 2), &swizzle, true), None);
}

#[test]
fn test_aggregate_initializer_typing() {
    let mut b = AstBuilder::new();
    let rows: Vec<Expression> = (0..2)
        .map(|_| {
            let x = b.float(1.0);
            let y = b.float(2.0);
            b.aggregate(vec![x, y])
        })
        .collect();
    let row_ids: Vec<NodeId> = rows.iter().map(Node::id).collect();
    let init = b.aggregate(rows);
    let init_id = init.id();

    let ((outer, inner), _) = with_ctx(ShaderOptions::default(), |ctx| {
        ctx.annotate_aggregate(&init, &Type::array_of(Type::vec(2), None));
        (
            ctx.annotations.aggregate_type(init_id).cloned(),
            ctx.annotations.aggregate_type(row_ids[1]).cloned(),
        )
    });
    assert_eq!(outer, Some(Type::array_of(Type::vec(2), Some(2))));
    assert_eq!(inner, Some(Type::vec(2)));
}
