use crate::ast::Span;
use thiserror::Error;

/// Fatal conditions. These abort the pass; source-level problems go to the
/// diagnostic sink instead (see `diagnostics`).
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("Malformed AST: {0}")]
    MalformedAst(String, Option<Span>),

    #[error("Undefined variable '{0}'")]
    UndefinedVariable(String, Option<Span>),

    #[error("Scope error: {0}")]
    ScopeError(String, Option<Span>),
}

impl CompilerError {
    pub fn span(&self) -> Option<Span> {
        match self {
            Self::MalformedAst(_, span) => *span,
            Self::UndefinedVariable(_, span) => *span,
            Self::ScopeError(_, span) => *span,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompilerError>;

// Bail macros without span

#[macro_export]
macro_rules! bail_ast {
    ($($arg:tt)*) => {
        return Err($crate::error::CompilerError::MalformedAst(format!($($arg)*), None))
    };
}

#[macro_export]
macro_rules! bail_scope {
    ($($arg:tt)*) => {
        return Err($crate::error::CompilerError::ScopeError(format!($($arg)*), None))
    };
}

// Bail macros with span

#[macro_export]
macro_rules! bail_ast_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::error::CompilerError::MalformedAst(format!($($arg)*), Some($span)))
    };
}

#[macro_export]
macro_rules! bail_undef_at {
    ($span:expr, $($arg:tt)*) => {
        return Err($crate::error::CompilerError::UndefinedVariable(format!($($arg)*), Some($span)))
    };
}
