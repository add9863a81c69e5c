//! Host-facing description of the shader's variables.
//!
//! The reflection tree is built next to the IR but never shares storage with
//! it: a reflection variable is a snapshot of name, qualifier, varying
//! modifier and type, with one child per record field. Entries are immutable
//! once allocated and outlive the scopes that produced them.

use crate::ast::{QualifierFlags, TypeQualifier};
use crate::ir::{IrVariable, VariableMode};
use crate::types::{Interpolation, RecordType, StructField, Type};
use bitflags::bitflags;
use spirv::ExecutionModel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Qualifier {
    Temporary,
    Const,
    Attribute,
    VaryingIn,
    VaryingOut,
    Uniform,
    ParamIn,
    ParamOut,
    ParamInOut,
    ParamConst,
}

bitflags! {
    /// How a varying is interpolated across a primitive
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct VaryingModifier: u8 {
        const INVARIANT = 1 << 0;
        const FLAT = 1 << 1;
        const SMOOTH = 1 << 2;
        const NOPERSPECTIVE = 1 << 3;
        const CENTROID = 1 << 4;
        const SAMPLE = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReflectionId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct ReflectionVariable {
    pub name: String,
    pub qualifier: Qualifier,
    pub modifier: VaryingModifier,
    pub ty: Type,
    /// One per field of `ty` (through arrays), in field order
    pub fields: Vec<ReflectionId>,
}

#[derive(Debug, Clone, Default)]
pub struct ReflectionInterface {
    vars: Vec<ReflectionVariable>,
    /// Top-level declarations in source order
    declared: Vec<ReflectionId>,
    /// User struct types in definition order
    struct_types: Vec<ReflectionId>,
}

impl ReflectionInterface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflection variable for a declared name.
    pub fn declare(
        &mut self,
        name: &str,
        qualifier: Qualifier,
        modifier: VaryingModifier,
        ty: &Type,
    ) -> ReflectionId {
        let id = self.alloc_tree(name, qualifier, modifier, ty);
        self.declared.push(id);
        log::debug!("reflection: declared {} {:?} {}", name, qualifier, ty);
        id
    }

    /// Reflection variable for a use of an existing variable. Not listed
    /// among the declarations.
    pub fn describe(&mut self, var: &IrVariable, stage: ExecutionModel) -> ReflectionId {
        self.alloc_tree(&var.name, qualifier_from_ir(var, stage), modifier_from_ir(var), &var.ty)
    }

    /// Reflection entry for a struct definition: children mirror the record's
    /// fields one-to-one.
    pub fn declare_struct(&mut self, record: &RecordType) -> ReflectionId {
        let ty = Type::Record(std::sync::Arc::new(record.clone()));
        let id = self.alloc_tree(&record.name, Qualifier::Temporary, VaryingModifier::empty(), &ty);
        self.struct_types.push(id);
        log::debug!("reflection: struct {} with {} fields", record.name, record.fields.len());
        id
    }

    fn alloc_tree(
        &mut self,
        name: &str,
        qualifier: Qualifier,
        modifier: VaryingModifier,
        ty: &Type,
    ) -> ReflectionId {
        let fields = match ty.without_array().as_record() {
            Some(record) => record
                .fields
                .iter()
                .map(|field| {
                    let inherited = modifier & VaryingModifier::INVARIANT;
                    self.alloc_tree(&field.name, qualifier, inherited | field_modifier(field), &field.ty)
                })
                .collect(),
            None => Vec::new(),
        };
        let id = ReflectionId(self.vars.len() as u32);
        self.vars.push(ReflectionVariable {
            name: name.to_string(),
            qualifier,
            modifier,
            ty: ty.clone(),
            fields,
        });
        id
    }

    pub fn get(&self, id: ReflectionId) -> &ReflectionVariable {
        &self.vars[id.0 as usize]
    }

    pub fn fields(&self, id: ReflectionId) -> impl Iterator<Item = &ReflectionVariable> {
        self.get(id).fields.iter().map(move |child| self.get(*child))
    }

    pub fn declared(&self) -> impl Iterator<Item = (ReflectionId, &ReflectionVariable)> {
        self.declared.iter().map(move |id| (*id, self.get(*id)))
    }

    pub fn struct_types(&self) -> impl Iterator<Item = (ReflectionId, &ReflectionVariable)> {
        self.struct_types.iter().map(move |id| (*id, self.get(*id)))
    }

    /// Last declaration with this name
    pub fn find_declared(&self, name: &str) -> Option<&ReflectionVariable> {
        self.declared.iter().rev().map(|id| self.get(*id)).find(|v| v.name == name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

pub fn qualifier_from_ast(qual: &TypeQualifier, is_parameter: bool, stage: ExecutionModel) -> Qualifier {
    let flags = qual.flags;
    if is_parameter {
        return if flags.contains(QualifierFlags::CONSTANT) {
            Qualifier::ParamConst
        } else if flags.contains(QualifierFlags::INOUT) {
            Qualifier::ParamInOut
        } else if flags.contains(QualifierFlags::OUT) {
            Qualifier::ParamOut
        } else {
            Qualifier::ParamIn
        };
    }

    if flags.contains(QualifierFlags::CONSTANT) {
        Qualifier::Const
    } else if flags.contains(QualifierFlags::ATTRIBUTE) {
        Qualifier::Attribute
    } else if flags.contains(QualifierFlags::VARYING) {
        if stage == ExecutionModel::Vertex {
            Qualifier::VaryingOut
        } else {
            Qualifier::VaryingIn
        }
    } else if flags.contains(QualifierFlags::UNIFORM) {
        Qualifier::Uniform
    } else if flags.contains(QualifierFlags::OUT) {
        Qualifier::VaryingOut
    } else if flags.contains(QualifierFlags::IN) {
        Qualifier::VaryingIn
    } else {
        Qualifier::Temporary
    }
}

pub fn modifier_from_ast(qual: &TypeQualifier, invariant: bool) -> VaryingModifier {
    let flags = qual.flags;
    let mut modifier = VaryingModifier::empty();
    modifier.set(
        VaryingModifier::INVARIANT,
        invariant || flags.contains(QualifierFlags::INVARIANT),
    );
    modifier.set(VaryingModifier::FLAT, flags.contains(QualifierFlags::FLAT));
    modifier.set(VaryingModifier::SMOOTH, flags.contains(QualifierFlags::SMOOTH));
    modifier.set(VaryingModifier::NOPERSPECTIVE, flags.contains(QualifierFlags::NOPERSPECTIVE));
    modifier.set(VaryingModifier::CENTROID, flags.contains(QualifierFlags::CENTROID));
    modifier.set(VaryingModifier::SAMPLE, flags.contains(QualifierFlags::SAMPLE));
    modifier
}

pub fn qualifier_from_ir(var: &IrVariable, stage: ExecutionModel) -> Qualifier {
    match var.mode {
        VariableMode::Uniform => Qualifier::Uniform,
        VariableMode::ShaderIn if stage == ExecutionModel::Vertex => Qualifier::Attribute,
        VariableMode::ShaderIn => Qualifier::VaryingIn,
        VariableMode::ShaderOut => Qualifier::VaryingOut,
        VariableMode::FunctionIn => Qualifier::ParamIn,
        VariableMode::FunctionOut => Qualifier::ParamOut,
        VariableMode::FunctionInOut => Qualifier::ParamInOut,
        VariableMode::ConstIn => Qualifier::ParamConst,
        VariableMode::Auto | VariableMode::Temporary if var.constant => Qualifier::Const,
        VariableMode::Auto | VariableMode::Temporary => Qualifier::Temporary,
    }
}

pub fn modifier_from_ir(var: &IrVariable) -> VaryingModifier {
    let mut modifier = interpolation_modifier(var.interpolation);
    modifier.set(VaryingModifier::INVARIANT, var.invariant);
    modifier.set(VaryingModifier::CENTROID, var.centroid);
    modifier.set(VaryingModifier::SAMPLE, var.sample);
    modifier
}

fn field_modifier(field: &StructField) -> VaryingModifier {
    let mut modifier = interpolation_modifier(field.interpolation);
    modifier.set(VaryingModifier::CENTROID, field.centroid);
    modifier.set(VaryingModifier::SAMPLE, field.sample);
    modifier
}

fn interpolation_modifier(interpolation: Interpolation) -> VaryingModifier {
    match interpolation {
        Interpolation::Auto => VaryingModifier::empty(),
        Interpolation::Smooth => VaryingModifier::SMOOTH,
        Interpolation::Flat => VaryingModifier::FLAT,
        Interpolation::NoPerspective => VaryingModifier::NOPERSPECTIVE,
    }
}
