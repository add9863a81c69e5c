pub mod analyzer;
pub mod annotations;
pub mod ast;
pub mod binder;
pub mod builder;
pub mod builtins;
pub mod context;
pub mod diagnostics;
pub mod diags;
pub mod error;
pub mod ir;
pub mod options;
pub mod reflection;
pub mod scope;
pub mod side_effects;
pub mod type_resolver;
pub mod types;
pub mod visitor;


#[cfg(test)]
mod binder_tests;

#[cfg(test)]
mod side_effects_tests;

#[cfg(test)]
mod type_resolver_tests;

use analyzer::Analysis;
use ast::TranslationUnit;
use builtins::BuiltinRegistry;
use diagnostics::Diagnostics;
use error::Result;
use options::ShaderOptions;

pub struct Analyzer {
    options: ShaderOptions,
    builtins: BuiltinRegistry,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(ShaderOptions::default())
    }
}

impl Analyzer {
    pub fn new(options: ShaderOptions) -> Self {
        Analyzer {
            options,
            builtins: BuiltinRegistry::new(),
        }
    }

    pub fn options(&self) -> &ShaderOptions {
        &self.options
    }

    /// Analyze a translation unit, collecting diagnostics
    pub fn analyze(&self, unit: &TranslationUnit) -> Result<(Analysis, Diagnostics)> {
        let mut diagnostics = Diagnostics::new();
        let analysis = analyzer::analyze(unit, &self.options, &self.builtins, &mut diagnostics)?;

        for warning in diagnostics.warnings() {
            log::warn!("{}", warning);
        }

        Ok((analysis, diagnostics))
    }

    /// Analyze and fail only on fatal errors; returns whether the unit is
    /// free of source errors.
    pub fn check_only(&self, unit: &TranslationUnit) -> Result<bool> {
        let (_, diagnostics) = self.analyze(unit)?;
        Ok(!diagnostics.has_errors())
    }
}
