//! State owned by one compilation unit.
//!
//! Everything the pass mutates lives here and is threaded through the
//! traversal by reference. Two contexts never share anything, so separate
//! translation units can be analysed on separate threads.

use crate::annotations::Annotations;
use crate::ast::Span;
use crate::builtins::{builtin_variables, BuiltinOracle};
use crate::diagnostics::{Diagnostic, DiagnosticKind, DiagnosticSink};
use crate::ir::{FunctionRegistry, IrVariables, VarId};
use crate::options::ShaderOptions;
use crate::reflection::ReflectionInterface;
use crate::scope::ScopeStack;
use crate::types::RecordType;
use spirv::ExecutionMode;
use std::sync::Arc;

pub struct CompilationContext<'a> {
    pub options: &'a ShaderOptions,
    pub builtins: &'a dyn BuiltinOracle,
    sink: &'a mut dyn DiagnosticSink,

    pub scopes: ScopeStack,
    pub variables: IrVariables,
    /// Every shader input ever declared, kept past its scope for deferred
    /// array sizing
    pub input_variables: Vec<VarId>,
    pub user_structures: Vec<Arc<RecordType>>,
    pub interface_blocks: Vec<Arc<RecordType>>,
    pub functions: FunctionRegistry,
    /// Struct specifiers currently open around the node being processed
    pub struct_specifier_depth: u32,
    /// Geometry input primitive, once its layout declaration has been seen
    pub gs_input_primitive: Option<ExecutionMode>,
    pub reflection: ReflectionInterface,
    pub annotations: Annotations,
    error_count: usize,
}

impl<'a> CompilationContext<'a> {
    /// Fresh context with the stage's builtin variables in the global scope.
    pub fn new(
        options: &'a ShaderOptions,
        builtins: &'a dyn BuiltinOracle,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        let mut ctx = CompilationContext {
            options,
            builtins,
            sink,
            scopes: ScopeStack::new(),
            variables: IrVariables::new(),
            input_variables: Vec::new(),
            user_structures: Vec::new(),
            interface_blocks: Vec::new(),
            functions: FunctionRegistry::new(),
            struct_specifier_depth: 0,
            gs_input_primitive: None,
            reflection: ReflectionInterface::new(),
            annotations: Annotations::new(),
            error_count: 0,
        };

        for var in builtin_variables(options.stage) {
            let name = var.name.clone();
            let id = ctx.variables.alloc(var);
            ctx.scopes.declare_variable(&name, id);
        }
        ctx
    }

    pub fn error(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.report(Diagnostic::error(span, kind, message));
    }

    pub fn warning(&mut self, span: Span, kind: DiagnosticKind, message: impl Into<String>) {
        self.report(Diagnostic::warning(span, kind, message));
    }

    fn report(&mut self, diagnostic: Diagnostic) {
        log::debug!("{}", diagnostic);
        if diagnostic.is_error() {
            self.error_count += 1;
        }
        self.sink.report(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Vertex count fixed by the geometry input layout, if seen yet.
    pub fn gs_input_vertices(&self) -> Option<u32> {
        self.gs_input_primitive.and_then(vertices_for_primitive)
    }
}

/// Vertices per input primitive of a geometry shader
pub fn vertices_for_primitive(mode: ExecutionMode) -> Option<u32> {
    match mode {
        ExecutionMode::InputPoints => Some(1),
        ExecutionMode::InputLines => Some(2),
        ExecutionMode::InputLinesAdjacency => Some(4),
        ExecutionMode::Triangles => Some(3),
        ExecutionMode::InputTrianglesAdjacency => Some(6),
        _ => None,
    }
}

/// GLSL spelling of an input primitive layout
pub fn primitive_name(mode: ExecutionMode) -> &'static str {
    match mode {
        ExecutionMode::InputPoints => "points",
        ExecutionMode::InputLines => "lines",
        ExecutionMode::InputLinesAdjacency => "lines_adjacency",
        ExecutionMode::Triangles => "triangles",
        ExecutionMode::InputTrianglesAdjacency => "triangles_adjacency",
        _ => "unknown",
    }
}
