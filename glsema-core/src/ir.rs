//! IR variables produced by the binder.
//!
//! Variables live in an arena owned by the compilation context and are
//! referred to by `VarId`. Scopes map names to ids; popping a scope only drops
//! the name, so shader inputs stay reachable through the input list for
//! deferred array sizing.

use crate::ast::Span;
use crate::types::{Interpolation, Type};
use std::collections::HashMap;

/// Handle of a variable in `IrVariables`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VarId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableMode {
    /// Ordinary global or local variable
    Auto,
    Uniform,
    ShaderIn,
    ShaderOut,
    FunctionIn,
    FunctionOut,
    FunctionInOut,
    /// `const in` parameter
    ConstIn,
    Temporary,
}

impl VariableMode {
    pub fn is_function_parameter(self) -> bool {
        matches!(
            self,
            VariableMode::FunctionIn
                | VariableMode::FunctionOut
                | VariableMode::FunctionInOut
                | VariableMode::ConstIn
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IrVariable {
    pub name: String,
    pub ty: Type,
    pub mode: VariableMode,
    pub interpolation: Interpolation,
    pub read_only: bool,
    pub constant: bool,
    pub invariant: bool,
    pub centroid: bool,
    pub sample: bool,
    pub location: Option<i32>,
    /// Highest constant index seen on this variable; sizes unsized inputs
    pub max_array_access: u32,
    /// Declared by the implementation rather than the shader
    pub builtin: bool,
    pub span: Span,
}

impl IrVariable {
    pub fn new(name: impl Into<String>, ty: Type, mode: VariableMode, span: Span) -> Self {
        IrVariable {
            name: name.into(),
            ty,
            mode,
            interpolation: Interpolation::Auto,
            read_only: false,
            constant: false,
            invariant: false,
            centroid: false,
            sample: false,
            location: None,
            max_array_access: 0,
            builtin: false,
            span,
        }
    }
}

/// Arena owning every variable created during one compilation
#[derive(Debug, Clone, Default)]
pub struct IrVariables {
    vars: Vec<IrVariable>,
}

impl IrVariables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, var: IrVariable) -> VarId {
        let id = VarId(self.vars.len() as u32);
        self.vars.push(var);
        id
    }

    pub fn get(&self, id: VarId) -> &IrVariable {
        &self.vars[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: VarId) -> &mut IrVariable {
        &mut self.vars[id.0 as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, &IrVariable)> {
        self.vars.iter().enumerate().map(|(i, v)| (VarId(i as u32), v))
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

/// A user function prototype as seen by call typing
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionSignature {
    pub name: String,
    pub return_type: Type,
    pub parameter_types: Vec<Type>,
}

/// Every function prototype or definition seen so far, by name
#[derive(Debug, Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, Vec<FunctionSignature>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signature; a prototype followed by its definition is kept once.
    pub fn insert(&mut self, signature: FunctionSignature) {
        let overloads = self.functions.entry(signature.name.clone()).or_default();
        if !overloads.iter().any(|s| s.parameter_types == signature.parameter_types) {
            overloads.push(signature);
        }
    }

    pub fn overloads(&self, name: &str) -> &[FunctionSignature] {
        self.functions.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Exact match first, then a match through implicit conversions.
    pub fn find(&self, name: &str, args: &[Type]) -> Option<&FunctionSignature> {
        let overloads = self.overloads(name);
        overloads
            .iter()
            .find(|s| s.parameter_types == args)
            .or_else(|| {
                overloads.iter().find(|s| {
                    s.parameter_types.len() == args.len()
                        && args
                            .iter()
                            .zip(&s.parameter_types)
                            .all(|(arg, param)| arg.can_implicitly_convert_to(param))
                })
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }
}
