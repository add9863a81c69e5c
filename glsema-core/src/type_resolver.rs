//! Type resolution: specifiers, array dimensions, record layout and
//! expression typing.
//!
//! Resolution never fails. Anything that cannot be resolved is reported to
//! the diagnostic sink and comes back as `Type::Error`, which every later
//! step passes through silently.

use crate::annotations::SelectionKind;
use crate::ast::*;
use crate::context::CompilationContext;
use crate::diagnostics::DiagnosticKind;
use crate::ir::VariableMode;
use crate::types::{Interpolation, ScalarKind, StructField, Type};
use spirv::ExecutionModel;

const SWIZZLE_SETS: [&str; 3] = ["xyzw", "rgba", "stpq"];

impl CompilationContext<'_> {
    /// Type named by a specifier, including any array suffix on the specifier
    /// itself (`float[3]`).
    pub fn resolve_type_specifier(&mut self, spec: &TypeSpecifier, span: Span) -> Type {
        let base = match &spec.kind {
            TypeSpecifierKind::Named(name) => {
                if let Some(ty) = Type::from_builtin_name(name) {
                    ty
                } else if let Some(ty) = self.scopes.lookup_type(name) {
                    ty.clone()
                } else {
                    self.error(span, DiagnosticKind::UnknownType, format!("unknown type `{}'", name));
                    Type::Error
                }
            }
            // Bound when the specifier itself was visited
            TypeSpecifierKind::Struct(s) => self.annotations.ty(s.id()).cloned().unwrap_or(Type::Error),
        };
        self.process_array_type(base, spec.array_specifier.as_ref(), span)
    }

    /// Wrap `base` in the dimensions of `array`, outermost first.
    pub fn process_array_type(&mut self, base: Type, array: Option<&ArraySpecifier>, span: Span) -> Type {
        let Some(array) = array else {
            return base;
        };
        if base.is_error() || array.dimensions.is_empty() {
            return base;
        }

        if base.is_unsized_array() {
            self.error(
                span,
                DiagnosticKind::InvalidArraySize,
                "only the outermost array dimension can be unsized",
            );
            return Type::Error;
        }
        if (base.is_array() || array.dimensions.len() > 1) && !self.options.allows_arrays_of_arrays() {
            self.error(
                span,
                DiagnosticKind::InvalidArraySize,
                format!(
                    "arrays of arrays are not allowed in GLSL {}{}",
                    self.options.language_version,
                    if self.options.es { " ES" } else { "" }
                ),
            );
            return Type::Error;
        }

        let mut ty = base;
        for (i, dim) in array.dimensions.iter().enumerate().rev() {
            let length = match dim {
                ArraySize::Unsized if i == 0 => None,
                ArraySize::Unsized => {
                    self.error(
                        span,
                        DiagnosticKind::InvalidArraySize,
                        "only the outermost array dimension can be unsized",
                    );
                    return Type::Error;
                }
                ArraySize::Sized(expr) => match self.array_size(expr) {
                    Some(n) => Some(n),
                    None => return Type::Error,
                },
            };
            ty = Type::array_of(ty, length);
        }
        ty
    }

    fn array_size(&mut self, expr: &Expression) -> Option<u32> {
        match expr.kind.int_constant() {
            Some(n) if n > 0 => u32::try_from(n).ok(),
            Some(_) => {
                self.error(expr.span(), DiagnosticKind::InvalidArraySize, "array size must be > 0");
                None
            }
            None => {
                self.error(
                    expr.span(),
                    DiagnosticKind::InvalidArraySize,
                    "array size must be a constant valued expression",
                );
                None
            }
        }
    }

    /// Interpolation for a variable of the given mode. Only shader inputs and
    /// outputs interpolate, and never vertex inputs or fragment outputs.
    pub fn interpret_interpolation_qualifier(
        &mut self,
        qual: &TypeQualifier,
        mode: VariableMode,
        span: Span,
    ) -> Interpolation {
        let interpolation = interpolation_from_flags(qual.flags);
        if interpolation == Interpolation::Auto {
            return interpolation;
        }

        let name = interpolation_name(interpolation);
        if !matches!(mode, VariableMode::ShaderIn | VariableMode::ShaderOut) {
            self.error(
                span,
                DiagnosticKind::InvalidInterpolation,
                format!("interpolation qualifier `{}' can only be applied to shader inputs or outputs", name),
            );
        } else if self.options.stage == ExecutionModel::Vertex && mode == VariableMode::ShaderIn {
            self.error(
                span,
                DiagnosticKind::InvalidInterpolation,
                format!("interpolation qualifier `{}' cannot be applied to vertex shader inputs", name),
            );
        } else if self.options.stage == ExecutionModel::Fragment && mode == VariableMode::ShaderOut {
            self.error(
                span,
                DiagnosticKind::InvalidInterpolation,
                format!("interpolation qualifier `{}' cannot be applied to fragment shader outputs", name),
            );
        }
        interpolation
    }

    /// Layout checks for a struct or block member. Only members of a uniform
    /// block, or members qualified `uniform` themselves, are checked.
    pub fn validate_member_matrix_layout(
        &mut self,
        qual: &TypeQualifier,
        ty: &Type,
        in_uniform: bool,
        span: Span,
    ) {
        if !qual.has_matrix_layout() || !(in_uniform || qual.has(QualifierFlags::UNIFORM)) {
            return;
        }
        if qual.has(QualifierFlags::ROW_MAJOR | QualifierFlags::COLUMN_MAJOR) {
            self.error(
                span,
                DiagnosticKind::InvalidMatrixLayout,
                "row_major and column_major cannot both be specified",
            );
        } else if !ty.is_matrix_or_matrix_array() && !ty.without_array().is_record() && !ty.is_error() {
            self.warning(
                span,
                DiagnosticKind::InvalidMatrixLayout,
                "uniform block layout qualifiers row_major and column_major applied to non-matrix types may be rejected by older compilers",
            );
        }
    }

    /// Layout of one record's members, in source order: one field per
    /// declared name.
    ///
    /// `block_mode` is the storage of the enclosing interface block, `None` for
    /// a plain struct, whose interpolation qualifiers are kept as written.
    pub fn process_record_fields(
        &mut self,
        declarations: &[DeclaratorList],
        block_row_major: bool,
        block_mode: Option<VariableMode>,
    ) -> Vec<StructField> {
        let in_uniform = block_mode == Some(VariableMode::Uniform);
        let mut fields = Vec::new();

        for list in declarations {
            let qual = &list.ty.qualifier;
            let span = list.declarations.first().map(Node::span).unwrap_or_default();
            let base = self.resolve_type_specifier(&list.ty.specifier, span);

            for decl in &list.declarations {
                self.validate_identifier(&decl.kind.identifier, decl.span());
                let mut ty = self.process_array_type(base.clone(), decl.kind.array_specifier.as_ref(), decl.span());
                if ty.is_void() {
                    self.error(
                        decl.span(),
                        DiagnosticKind::VoidVariable,
                        format!("member `{}' declared as type `void'", decl.kind.identifier),
                    );
                    ty = Type::Error;
                }

                self.validate_member_matrix_layout(qual, &ty, in_uniform, decl.span());
                let interpolation = match block_mode {
                    Some(mode) => self.interpret_interpolation_qualifier(qual, mode, decl.span()),
                    None => interpolation_from_flags(qual.flags),
                };
                let row_major = field_row_major(&ty, qual, block_row_major);

                fields.push(StructField {
                    name: decl.kind.identifier.clone(),
                    ty,
                    location: qual.location.unwrap_or(-1),
                    interpolation,
                    centroid: qual.has(QualifierFlags::CENTROID),
                    sample: qual.has(QualifierFlags::SAMPLE),
                    row_major,
                });
            }
        }
        fields
    }

    /// Type of an expression whose children have already been typed.
    pub fn type_expression(&mut self, e: &Expression) -> Type {
        let ann = &self.annotations;
        let child = |expr: &Expression| ann.ty(expr.id()).cloned().unwrap_or(Type::Error);

        match &e.kind {
            ExprKind::Identifier(_) => match self.annotations.variable(e.id()) {
                Some(var) => self.variables.get(var).ty.clone(),
                None => Type::Error,
            },
            ExprKind::IntConstant(_) => Type::int(),
            ExprKind::UintConstant(_) => Type::uint(),
            ExprKind::FloatConstant(_) => Type::float(),
            ExprKind::BoolConstant(_) => Type::bool(),
            ExprKind::Unary(UnaryOp::LogicalNot, _) => Type::bool(),
            ExprKind::Unary(_, operand) => child(operand),
            ExprKind::Binary(op, left, right) => {
                let (l, r) = (child(left), child(right));
                if l.is_error() || r.is_error() {
                    Type::Error
                } else if op.is_comparison() || op.is_logical() {
                    Type::bool()
                } else {
                    arithmetic_result(*op, &l, &r)
                }
            }
            ExprKind::Assign(_, lhs, _) => child(lhs),
            ExprKind::Conditional(_, then_expr, _) => child(then_expr),
            ExprKind::ArrayIndex(base, _) => match child(base) {
                Type::Array(element, _) => *element,
                Type::Vector(kind, _) => Type::Scalar(kind),
                ty @ Type::Matrix { .. } => ty.column_type().unwrap_or(Type::Error),
                _ => Type::Error,
            },
            ExprKind::FieldSelection(sel) => {
                let base = child(&sel.base);
                self.type_field_selection(e, sel, &base)
            }
            ExprKind::Call(call) => self.type_call(e, call),
            ExprKind::Sequence(elements) => elements.last().map(child).unwrap_or(Type::Error),
            ExprKind::Aggregate(_) => self.annotations.aggregate_type(e.id()).cloned().unwrap_or(Type::Error),
        }
    }

    fn type_field_selection(&mut self, e: &Expression, sel: &FieldSelection, base: &Type) -> Type {
        match self.annotations.selection(e.id()) {
            Some(SelectionKind::Struct) => {
                let field = base.as_record().and_then(|r| r.field(&sel.field)).map(|f| f.ty.clone());
                field.unwrap_or_else(|| {
                    self.error(
                        e.span(),
                        DiagnosticKind::NoSuchField,
                        format!("`{}' has no field named `{}'", base, sel.field),
                    );
                    Type::Error
                })
            }
            Some(SelectionKind::Method) => {
                if sel.field == "length" && (base.is_array() || base.is_vector() || base.is_matrix()) {
                    Type::int()
                } else {
                    self.error(
                        e.span(),
                        DiagnosticKind::NoSuchField,
                        format!("unknown method `{}' on `{}'", sel.field, base),
                    );
                    Type::Error
                }
            }
            Some(SelectionKind::Swizzle) => {
                let size = base.vector_elements();
                let kind = base.base_kind();
                match (kind, swizzle_indices(&sel.field)) {
                    (Some(kind), Some(indices)) if indices.iter().all(|i| *i < size) => {
                        Type::vector_or_scalar(kind, indices.len() as u8)
                    }
                    _ => {
                        self.error(
                            e.span(),
                            DiagnosticKind::InvalidSwizzle,
                            format!("invalid swizzle `.{}' on `{}'", sel.field, base),
                        );
                        Type::Error
                    }
                }
            }
            None => Type::Error,
        }
    }

    fn type_call(&mut self, e: &Expression, call: &FunctionCall) -> Type {
        match &call.callee {
            Callee::Constructor(spec) => {
                let ty = self.resolve_type_specifier(spec, e.span());
                match ty {
                    Type::Array(element, None) => Type::array_of(*element, Some(call.args.len() as u32)),
                    ty => ty,
                }
            }
            Callee::Function(name) => {
                let args: Vec<Type> = call
                    .args
                    .iter()
                    .map(|a| self.annotations.ty(a.id()).cloned().unwrap_or(Type::Error))
                    .collect();
                if args.iter().any(Type::is_error) {
                    return Type::Error;
                }
                if let Some(signature) = self.functions.find(name, &args) {
                    return signature.return_type.clone();
                }
                if let Some(ty) = self.builtins.find_builtin(name, &args) {
                    return ty;
                }
                let rendered: Vec<String> = args.iter().map(Type::to_string).collect();
                self.error(
                    e.span(),
                    DiagnosticKind::UnknownFunction,
                    format!("no matching function for call to `{}({})'", name, rendered.join(", ")),
                );
                Type::Error
            }
        }
    }

    /// Annotate an `{...}` initializer, and nested ones, with the type it
    /// initializes.
    pub fn annotate_aggregate(&mut self, init: &Expression, ty: &Type) {
        let ExprKind::Aggregate(elements) = &init.kind else {
            return;
        };
        let ty = match ty {
            Type::Array(element, None) => Type::array_of((**element).clone(), Some(elements.len() as u32)),
            ty => ty.clone(),
        };
        for (i, elem) in elements.iter().enumerate() {
            let elem_ty = match &ty {
                Type::Array(element, _) => Some((**element).clone()),
                Type::Record(record) => record.fields.get(i).map(|f| f.ty.clone()),
                Type::Matrix { .. } => ty.column_type(),
                Type::Vector(kind, _) => Some(Type::Scalar(*kind)),
                _ => None,
            };
            if let Some(elem_ty) = elem_ty {
                self.annotate_aggregate(elem, &elem_ty);
            }
        }
        self.annotations.entry(init.id()).aggregate_type = Some(ty);
    }
}

/// How `base.field` reads, given the base's type. `None` for an error-typed
/// base, and for shapes that are none of the three kinds.
pub fn classify_selection(base: &Type, sel: &FieldSelection, relaxed_scalar_swizzle: bool) -> Option<SelectionKind> {
    if base.is_record() {
        Some(SelectionKind::Struct)
    } else if sel.method_args.is_some() {
        Some(SelectionKind::Method)
    } else if base.is_vector() || (relaxed_scalar_swizzle && base.is_scalar()) {
        Some(SelectionKind::Swizzle)
    } else {
        None
    }
}

/// Row-major flag of a member: the block default, unless the member's own
/// qualifier overrides it and the member is a matrix (array).
pub fn field_row_major(ty: &Type, qual: &TypeQualifier, block_row_major: bool) -> bool {
    if !ty.is_matrix_or_matrix_array() {
        return block_row_major;
    }
    if qual.has(QualifierFlags::ROW_MAJOR) && !qual.has(QualifierFlags::COLUMN_MAJOR) {
        true
    } else if qual.has(QualifierFlags::COLUMN_MAJOR) && !qual.has(QualifierFlags::ROW_MAJOR) {
        false
    } else {
        block_row_major
    }
}

pub fn interpolation_from_flags(flags: QualifierFlags) -> Interpolation {
    if flags.contains(QualifierFlags::FLAT) {
        Interpolation::Flat
    } else if flags.contains(QualifierFlags::NOPERSPECTIVE) {
        Interpolation::NoPerspective
    } else if flags.contains(QualifierFlags::SMOOTH) {
        Interpolation::Smooth
    } else {
        Interpolation::Auto
    }
}

fn interpolation_name(interpolation: Interpolation) -> &'static str {
    match interpolation {
        Interpolation::Auto => "",
        Interpolation::Smooth => "smooth",
        Interpolation::Flat => "flat",
        Interpolation::NoPerspective => "noperspective",
    }
}

/// Component indices of a swizzle; all letters must come from one set.
fn swizzle_indices(field: &str) -> Option<Vec<u8>> {
    if field.is_empty() || field.len() > 4 {
        return None;
    }
    SWIZZLE_SETS.iter().find_map(|set| {
        field
            .chars()
            .map(|c| set.find(c).map(|i| i as u8))
            .collect::<Option<Vec<u8>>>()
    })
}

fn arithmetic_result(op: BinaryOp, l: &Type, r: &Type) -> Type {
    match (l, r) {
        (
            Type::Matrix { element, rows, columns },
            Type::Vector(_, n),
        ) if op == BinaryOp::Mul && columns == n => Type::Vector(*element, *rows),
        (
            Type::Vector(_, n),
            Type::Matrix { element, columns, rows },
        ) if op == BinaryOp::Mul && rows == n => Type::Vector(*element, *columns),
        (
            Type::Matrix { element, rows, .. },
            Type::Matrix { columns, .. },
        ) if op == BinaryOp::Mul => Type::Matrix {
            element: *element,
            columns: *columns,
            rows: *rows,
        },
        (Type::Scalar(_), other) if !other.is_scalar() => promote(l, other),
        (other, Type::Scalar(_)) if !other.is_scalar() => promote(r, other),
        _ if l.can_implicitly_convert_to(r) => r.clone(),
        _ => l.clone(),
    }
}

/// Shape of `shaped` with the wider of the two component kinds.
fn promote(scalar: &Type, shaped: &Type) -> Type {
    match (scalar.base_kind(), shaped.base_kind()) {
        (Some(ScalarKind::Double), Some(_)) => shaped.with_base_kind(ScalarKind::Double),
        (Some(ScalarKind::Float), Some(ScalarKind::Int | ScalarKind::Uint)) => {
            shaped.with_base_kind(ScalarKind::Float)
        }
        _ => shaped.clone(),
    }
}
