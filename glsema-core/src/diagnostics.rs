//! Recoverable, source-level problems.
//!
//! The pass reports these through a `DiagnosticSink` and keeps going,
//! substituting the error type or skipping the binding. Formatting and routing
//! are up to the sink.

use crate::ast::Span;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    InvalidIdentifier,
    NameCollision,
    TypeRedefinition,
    UnknownType,
    VoidVariable,
    UnsizedArrayParameter,
    InvalidArraySize,
    InvalidMatrixLayout,
    InvalidInterpolation,
    InvalidStorageQualifier,
    EmbeddedStruct,
    GeometryInputSize,
    IndexOutOfBounds,
    NoSuchField,
    InvalidSwizzle,
    UnknownFunction,
    InvalidParameter,
    InvalidInterfaceBlock,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub span: Span,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn error(span: Span, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            span,
            severity: Severity::Error,
            kind,
            message: message.into(),
        }
    }

    pub fn warning(span: Span, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Diagnostic {
            span,
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}: {}", self.span, label, self.message)
    }
}

/// Receives diagnostics as they are found. Reporting never fails and never
/// stops the pass.
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Sink that keeps everything, in report order
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl DiagnosticSink for Diagnostics {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }
}
