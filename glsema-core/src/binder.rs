//! Declaration binding: IR variables, struct and block types, parameters and
//! geometry-shader input sizing.
//!
//! Every declared name gets a reflection variable first. The IR side is then
//! built unless the type is void or failed to resolve, so reflection ordering
//! never loses a slot to a recoverable error.

use crate::ast::*;
use crate::bail_ast_at;
use crate::builtins::REDECLARABLE_BUILTINS;
use crate::context::{primitive_name, vertices_for_primitive, CompilationContext};
use crate::diagnostics::DiagnosticKind;
use crate::error::Result;
use crate::ir::{FunctionSignature, IrVariable, VarId, VariableMode};
use crate::reflection::{modifier_from_ast, qualifier_from_ast, ReflectionId};
use crate::types::{RecordKind, RecordType, Type};
use spirv::ExecutionModel;
use std::sync::Arc;

impl CompilationContext<'_> {
    /// Bind one name of a declarator list. `var_type` already carries the
    /// name's own array dimensions.
    pub fn bind_declaration(
        &mut self,
        list: &DeclaratorList,
        decl: &Node<Declaration>,
        var_type: Type,
    ) -> Option<VarId> {
        let name = decl.kind.identifier.as_str();
        let span = decl.span();
        let qual = &list.ty.qualifier;
        let var_type = self.size_from_initializer(decl, var_type);

        let reflection = self.reflection.declare(
            name,
            qualifier_from_ast(qual, false, self.options.stage),
            modifier_from_ast(qual, list.invariant),
            &var_type,
        );
        self.annotations.entry(decl.id()).reflection = Some(reflection);

        if var_type.is_void() {
            self.error(
                span,
                DiagnosticKind::VoidVariable,
                format!("`{}' cannot be declared with type `void'", name),
            );
            return None;
        }
        if var_type.is_error() {
            return None;
        }

        let mut var = IrVariable::new(name, var_type, VariableMode::Auto, span);
        self.apply_type_qualifier(qual, list.invariant, &mut var, false);
        if qual.has_matrix_layout() {
            self.error(
                span,
                DiagnosticKind::InvalidMatrixLayout,
                "row_major and column_major can only be applied to interface block members",
            );
        }
        if var.mode == VariableMode::ShaderIn {
            var.read_only = true;
            if self.options.is_geometry() {
                self.handle_geometry_shader_input_decl(&mut var);
            }
        }

        if let Some(existing) = self.variable_being_redeclared(&var) {
            self.annotations.entry(decl.id()).variable = Some(existing);
            return Some(existing);
        }

        self.validate_identifier(name, span);
        Some(self.declare(var, decl.id()))
    }

    /// Allocate `var`, bind it in the innermost scope and link it to `node`.
    fn declare(&mut self, var: IrVariable, node: NodeId) -> VarId {
        let name = var.name.clone();
        let span = var.span;
        let is_input = var.mode == VariableMode::ShaderIn;
        log::debug!("binding {} `{}' : {} ({:?})", node.0, name, var.ty, var.mode);

        let id = self.variables.alloc(var);
        if is_input {
            self.input_variables.push(id);
        }
        if !self.scopes.declare_variable(&name, id) {
            self.error(
                span,
                DiagnosticKind::NameCollision,
                format!("name `{}' already taken in the current scope", name),
            );
        }
        self.annotations.entry(node).variable = Some(id);
        id
    }

    /// `float a[] = float[](...)` and `float a[] = {...}` take their length
    /// from the initializer.
    fn size_from_initializer(&self, decl: &Node<Declaration>, var_type: Type) -> Type {
        let Type::Array(element, None) = &var_type else {
            return var_type;
        };
        let Some(init) = &decl.kind.initializer else {
            return var_type;
        };
        let init_ty = self
            .annotations
            .aggregate_type(init.id())
            .or_else(|| self.annotations.ty(init.id()));
        match init_ty {
            Some(Type::Array(init_element, Some(n))) if init_element == element => {
                Type::array_of((**element).clone(), Some(*n))
            }
            _ => var_type,
        }
    }

    /// Storage, interpolation and auxiliary qualifiers onto `var`.
    pub fn apply_type_qualifier(
        &mut self,
        qual: &TypeQualifier,
        invariant: bool,
        var: &mut IrVariable,
        is_parameter: bool,
    ) {
        let flags = qual.flags;
        let span = var.span;
        let stage = self.options.stage;

        var.invariant = invariant || flags.contains(QualifierFlags::INVARIANT);
        if flags.contains(QualifierFlags::CONSTANT) {
            var.constant = true;
            var.read_only = true;
        }

        var.mode = if is_parameter {
            if flags.contains(QualifierFlags::INOUT) {
                VariableMode::FunctionInOut
            } else if flags.contains(QualifierFlags::OUT) {
                VariableMode::FunctionOut
            } else if flags.contains(QualifierFlags::CONSTANT) {
                VariableMode::ConstIn
            } else {
                VariableMode::FunctionIn
            }
        } else if flags.contains(QualifierFlags::ATTRIBUTE) {
            if stage != ExecutionModel::Vertex {
                self.error(
                    span,
                    DiagnosticKind::InvalidStorageQualifier,
                    format!("`attribute' variables may not be declared in the {} shader", self.options.stage_name()),
                );
            }
            VariableMode::ShaderIn
        } else if flags.contains(QualifierFlags::VARYING) {
            match stage {
                ExecutionModel::Vertex => VariableMode::ShaderOut,
                ExecutionModel::Fragment => VariableMode::ShaderIn,
                _ => {
                    self.error(
                        span,
                        DiagnosticKind::InvalidStorageQualifier,
                        format!("`varying' variables may not be declared in the {} shader", self.options.stage_name()),
                    );
                    VariableMode::Auto
                }
            }
        } else if flags.contains(QualifierFlags::UNIFORM) {
            VariableMode::Uniform
        } else if flags.contains(QualifierFlags::INOUT) {
            self.error(
                span,
                DiagnosticKind::InvalidStorageQualifier,
                "`inout' may only be applied to function parameters",
            );
            VariableMode::Auto
        } else if flags.contains(QualifierFlags::IN) {
            VariableMode::ShaderIn
        } else if flags.contains(QualifierFlags::OUT) {
            VariableMode::ShaderOut
        } else {
            VariableMode::Auto
        };

        var.interpolation = self.interpret_interpolation_qualifier(qual, var.mode, span);
        var.centroid = flags.contains(QualifierFlags::CENTROID);
        var.sample = flags.contains(QualifierFlags::SAMPLE);
        var.location = qual.location;
    }

    /// Earlier variable in the current scope that `var` may legally redeclare.
    ///
    /// An unsized array may be redeclared with a size, and a handful of
    /// builtins may be redeclared at global scope to change their qualifiers.
    pub fn variable_being_redeclared(&mut self, var: &IrVariable) -> Option<VarId> {
        let existing = self.scopes.lookup_variable_in_current_scope(&var.name)?;
        let earlier = self.variables.get(existing);

        if let (Type::Array(earlier_element, None), Type::Array(element, Some(n))) = (&earlier.ty, &var.ty) {
            if earlier_element != element {
                return None;
            }
            let n = *n;
            if n <= earlier.max_array_access {
                let message = format!(
                    "declared size {} of `{}' must be greater than maximum accessed index {}",
                    n, var.name, earlier.max_array_access
                );
                self.error(var.span, DiagnosticKind::InvalidArraySize, message);
            } else {
                log::debug!("resizing `{}' to {}", var.name, var.ty);
                self.variables.get_mut(existing).ty = var.ty.clone();
            }
            return Some(existing);
        }

        if earlier.builtin && self.scopes.is_global() && REDECLARABLE_BUILTINS.contains(&var.name.as_str()) {
            let earlier = self.variables.get_mut(existing);
            if var.interpolation != Default::default() {
                earlier.interpolation = var.interpolation;
            }
            earlier.invariant |= var.invariant;
            earlier.centroid |= var.centroid;
            earlier.sample |= var.sample;
            return Some(existing);
        }

        None
    }

    /// Reserved-name checks. Returns false when the name is rejected.
    pub fn validate_identifier(&mut self, name: &str, span: Span) -> bool {
        if name.starts_with("gl_") {
            self.error(
                span,
                DiagnosticKind::InvalidIdentifier,
                format!("identifier `{}' uses reserved `gl_' prefix", name),
            );
            return false;
        }
        if name.contains("__") {
            self.warning(
                span,
                DiagnosticKind::InvalidIdentifier,
                format!("identifier `{}' uses reserved `__' string", name),
            );
        }
        true
    }

    /// Geometry inputs are per-vertex arrays. Once the input layout is known
    /// their length must match it.
    pub fn handle_geometry_shader_input_decl(&mut self, var: &mut IrVariable) {
        if !var.ty.is_array() {
            self.error(
                var.span,
                DiagnosticKind::GeometryInputSize,
                format!("geometry shader input `{}' must be an array", var.name),
            );
            return;
        }
        let Some(vertices) = self.gs_input_vertices() else {
            return;
        };
        match var.ty.array_length() {
            None => {
                if let Type::Array(element, None) = &var.ty {
                    var.ty = Type::array_of((**element).clone(), Some(vertices));
                }
            }
            Some(n) if n != vertices => {
                let message = format!(
                    "geometry shader input size contradicts previously declared layout (size is {}, but layout requires a size of {})",
                    n, vertices
                );
                self.error(var.span, DiagnosticKind::GeometryInputSize, message);
            }
            Some(_) => {}
        }
    }

    /// `layout(<primitive>) in;` fixes the vertex count and sizes every
    /// unsized input declared so far.
    pub fn apply_gs_input_layout(&mut self, layout: &Node<GsInputLayout>) -> Result<()> {
        let primitive = layout.kind.primitive;
        let Some(vertices) = vertices_for_primitive(primitive) else {
            bail_ast_at!(layout.span(), "{:?} is not a geometry input primitive", primitive);
        };

        if let Some(previous) = self.gs_input_primitive {
            if previous != primitive {
                self.error(
                    layout.span(),
                    DiagnosticKind::GeometryInputSize,
                    format!(
                        "input layout `{}' conflicts with earlier input layout `{}'",
                        primitive_name(primitive),
                        primitive_name(previous)
                    ),
                );
            }
            return Ok(());
        }
        self.gs_input_primitive = Some(primitive);
        log::debug!("geometry input layout {}: {} vertices", primitive_name(primitive), vertices);

        for id in self.input_variables.clone() {
            let var = self.variables.get(id);
            match &var.ty {
                Type::Array(element, None) => {
                    if var.max_array_access >= vertices {
                        let message = format!(
                            "this geometry shader input layout implies {} vertices, but an access to element {} of input `{}' already exists",
                            vertices, var.max_array_access, var.name
                        );
                        self.error(layout.span(), DiagnosticKind::GeometryInputSize, message);
                    } else {
                        let sized = Type::array_of((**element).clone(), Some(vertices));
                        log::debug!("sizing geometry input `{}' to {}", var.name, sized);
                        self.variables.get_mut(id).ty = sized;
                    }
                }
                Type::Array(_, Some(n)) if *n != vertices && !var.builtin => {
                    let message = format!(
                        "size of geometry shader input `{}' ({}) does not match the input layout ({})",
                        var.name, n, vertices
                    );
                    self.error(layout.span(), DiagnosticKind::GeometryInputSize, message);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Report a struct definition nested inside another where the language
    /// version forbids it.
    pub fn enter_struct_specifier(&mut self, span: Span) {
        if self.struct_specifier_depth != 0 && !self.options.allows_embedded_structs() {
            self.error(span, DiagnosticKind::EmbeddedStruct, "embedded structure declarations are not allowed");
        }
        self.struct_specifier_depth += 1;
    }

    pub fn leave_struct_specifier(&mut self) {
        self.struct_specifier_depth = self.struct_specifier_depth.saturating_sub(1);
    }

    /// Build the record type of a struct definition and register it by name.
    ///
    /// Field types of nested struct specifiers must already be bound.
    pub fn bind_struct_specifier(&mut self, s: &Node<StructSpecifier>) -> Result<Type> {
        let spec = &s.kind;
        if !spec.name.is_empty() {
            self.validate_identifier(&spec.name, s.span());
        }
        let fields = self.process_record_fields(&spec.declarations, false, None);
        let record = RecordType {
            name: spec.name.clone(),
            kind: RecordKind::Struct,
            fields,
        };

        let reflection = self.reflection.declare_struct(&record);
        let children = self.reflection.get(reflection).fields.clone();
        let decls: Vec<&Node<Declaration>> = spec.declarations.iter().flat_map(|l| &l.declarations).collect();
        if decls.len() != children.len() || decls.len() != record.fields.len() {
            bail_ast_at!(
                s.span(),
                "struct `{}' has {} declared members but {} fields",
                spec.name,
                decls.len(),
                record.fields.len()
            );
        }
        self.link_members(&decls, &children);

        let record = Arc::new(record);
        let ty = Type::Record(record.clone());
        let ann = self.annotations.entry(s.id());
        ann.ty = Some(ty.clone());
        ann.reflection = Some(reflection);

        if !spec.name.is_empty() {
            if self.scopes.declare_type(&spec.name, ty.clone()) {
                log::debug!("struct `{}' with {} fields", spec.name, record.fields.len());
                self.user_structures.push(record);
            } else {
                self.error(
                    s.span(),
                    DiagnosticKind::TypeRedefinition,
                    format!("struct `{}' previously defined", spec.name),
                );
            }
        }
        Ok(ty)
    }

    fn link_members(&mut self, decls: &[&Node<Declaration>], children: &[ReflectionId]) {
        for (decl, child) in decls.iter().zip(children) {
            self.annotations.entry(decl.id()).reflection = Some(*child);
        }
    }

    /// Bind an interface block: one variable for the instance, or one per
    /// member when the block has no instance name.
    pub fn bind_interface_block(&mut self, stmt: &Statement, block: &InterfaceBlock) -> Result<()> {
        let qual = &block.qualifier;
        let span = stmt.span();
        let mode = if qual.has(QualifierFlags::UNIFORM) {
            VariableMode::Uniform
        } else if qual.has(QualifierFlags::INOUT) {
            VariableMode::Auto
        } else if qual.has(QualifierFlags::IN) {
            VariableMode::ShaderIn
        } else if qual.has(QualifierFlags::OUT) {
            VariableMode::ShaderOut
        } else {
            VariableMode::Auto
        };
        if mode == VariableMode::Auto {
            self.error(
                span,
                DiagnosticKind::InvalidInterfaceBlock,
                format!("interface block `{}' must be uniform, in or out", block.block_name),
            );
            return Ok(());
        }
        if qual.has(QualifierFlags::ROW_MAJOR | QualifierFlags::COLUMN_MAJOR) {
            self.error(
                span,
                DiagnosticKind::InvalidMatrixLayout,
                "row_major and column_major cannot both be specified",
            );
        }

        let block_row_major = qual.has(QualifierFlags::ROW_MAJOR);
        let fields = self.process_record_fields(&block.declarations, block_row_major, Some(mode));
        let record = Arc::new(RecordType {
            name: block.block_name.clone(),
            kind: RecordKind::Interface,
            fields,
        });
        self.interface_blocks.push(record.clone());

        let reflection_qualifier = qualifier_from_ast(qual, false, self.options.stage);
        let modifier = modifier_from_ast(qual, false);

        match &block.instance_name {
            Some(instance) => {
                let ty = self.process_array_type(Type::Record(record), block.array_specifier.as_ref(), span);
                let reflection = self.reflection.declare(instance, reflection_qualifier, modifier, &ty);
                self.annotations.entry(stmt.id()).reflection = Some(reflection);
                if ty.is_error() {
                    return Ok(());
                }

                let mut var = IrVariable::new(instance.as_str(), ty, mode, span);
                var.read_only = mode != VariableMode::ShaderOut;
                if mode == VariableMode::ShaderIn && self.options.is_geometry() {
                    self.handle_geometry_shader_input_decl(&mut var);
                }
                self.validate_identifier(instance, span);
                self.declare(var, stmt.id());
            }
            None => {
                let decls: Vec<&Node<Declaration>> =
                    block.declarations.iter().flat_map(|l| &l.declarations).collect();
                if decls.len() != record.fields.len() {
                    bail_ast_at!(span, "interface block `{}' member count mismatch", block.block_name);
                }
                for (decl, field) in decls.into_iter().zip(record.fields.iter()) {
                    let reflection = self.reflection.declare(&field.name, reflection_qualifier, modifier, &field.ty);
                    self.annotations.entry(decl.id()).reflection = Some(reflection);
                    if field.ty.is_error() {
                        continue;
                    }

                    let mut var = IrVariable::new(field.name.as_str(), field.ty.clone(), mode, decl.span());
                    var.read_only = mode != VariableMode::ShaderOut;
                    var.interpolation = field.interpolation;
                    var.centroid = field.centroid;
                    var.sample = field.sample;
                    if field.location >= 0 {
                        var.location = Some(field.location);
                    }
                    self.validate_identifier(&field.name, decl.span());
                    self.declare(var, decl.id());
                }
            }
        }
        Ok(())
    }

    /// Bind a function parameter in the function's scope.
    ///
    /// The parameter's type is annotated even when no variable is bound, so
    /// the prototype can still be registered.
    pub fn bind_parameter(&mut self, p: &Node<ParameterDeclarator>) -> Option<VarId> {
        let param = &p.kind;
        let span = p.span();
        let base = self.resolve_type_specifier(&param.ty.specifier, span);
        let mut ty = self.process_array_type(base, param.array_specifier.as_ref(), span);

        if ty.is_void() {
            // `f(void)`
            self.annotations.entry(p.id()).ty = Some(ty);
            return None;
        }
        if ty.is_unsized_array() {
            self.error(
                span,
                DiagnosticKind::UnsizedArrayParameter,
                "arrays passed as parameters must have a declared size",
            );
            ty = Type::Error;
        }
        self.annotations.entry(p.id()).ty = Some(ty.clone());

        let Some(name) = &param.identifier else {
            if !param.formal_parameter {
                self.error(span, DiagnosticKind::InvalidParameter, "function parameter must have a name");
            }
            return None;
        };

        let qual = &param.ty.qualifier;
        let reflection = self.reflection.declare(
            name,
            qualifier_from_ast(qual, true, self.options.stage),
            modifier_from_ast(qual, false),
            &ty,
        );
        self.annotations.entry(p.id()).reflection = Some(reflection);

        let mut var = IrVariable::new(name.as_str(), ty, VariableMode::FunctionIn, span);
        self.apply_type_qualifier(qual, false, &mut var, true);
        if qual.flags.intersects(QualifierFlags::UNIFORM | QualifierFlags::ATTRIBUTE | QualifierFlags::VARYING) {
            self.error(
                span,
                DiagnosticKind::InvalidStorageQualifier,
                format!("parameter `{}' may only be qualified const, in, out or inout", name),
            );
        }
        self.validate_identifier(name, span);
        Some(self.declare(var, p.id()))
    }

    /// Record a prototype so calls to it can be typed. Parameters must be
    /// bound first.
    pub fn save_function(&mut self, proto: &Node<FunctionPrototype>) {
        let return_type = self.resolve_type_specifier(&proto.kind.return_type.specifier, proto.span());
        let parameter_types: Vec<Type> = proto
            .kind
            .parameters
            .iter()
            .filter_map(|p| self.annotations.ty(p.id()).cloned())
            .filter(|ty| !ty.is_void())
            .collect();

        log::debug!("function `{}' with {} parameters", proto.kind.name, parameter_types.len());
        self.annotations.entry(proto.id()).ty = Some(return_type.clone());
        self.functions.insert(FunctionSignature {
            name: proto.kind.name.clone(),
            return_type,
            parameter_types,
        });
    }
}
