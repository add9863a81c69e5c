//! Diagnostic utilities for reflection and record type formatting and display.
//!
//! Provides compact formatters that output something close to GLSL syntax.

use crate::ir::{IrVariable, VariableMode};
use crate::reflection::{Qualifier, ReflectionId, ReflectionInterface, VaryingModifier};
use crate::types::{Interpolation, RecordKind, RecordType};
use std::fmt::{self, Display, Formatter, Write};

/// Render a struct or block definition, one member per line.
///
/// `struct S { float x; row_major mat3 m; }` becomes
/// ```text
/// struct S {
///   float x;
///   row_major mat3 m;
/// }
/// ```
pub fn format_record(record: &RecordType) -> String {
    let mut out = String::new();
    let keyword = match record.kind {
        RecordKind::Struct => "struct",
        RecordKind::Interface => "block",
    };
    let _ = writeln!(out, "{} {} {{", keyword, record.name);
    for field in &record.fields {
        let mut prefix = String::new();
        if field.location >= 0 {
            let _ = write!(prefix, "layout(location = {}) ", field.location);
        }
        match field.interpolation {
            Interpolation::Auto => {}
            Interpolation::Smooth => prefix.push_str("smooth "),
            Interpolation::Flat => prefix.push_str("flat "),
            Interpolation::NoPerspective => prefix.push_str("noperspective "),
        }
        if field.centroid {
            prefix.push_str("centroid ");
        }
        if field.sample {
            prefix.push_str("sample ");
        }
        if field.row_major && field.ty.is_matrix_or_matrix_array() {
            prefix.push_str("row_major ");
        }
        let _ = writeln!(out, "  {}{} {};", prefix, field.ty, field.name);
    }
    out.push('}');
    out
}

/// Formatter for the reflection tree that produces one indented line per
/// variable.
pub struct ReflectionFormatter<'a> {
    interface: &'a ReflectionInterface,
    output: String,
    indent: usize,
    show_ids: bool,
}

impl<'a> ReflectionFormatter<'a> {
    pub fn new(interface: &'a ReflectionInterface) -> Self {
        ReflectionFormatter {
            interface,
            output: String::new(),
            indent: 0,
            show_ids: false,
        }
    }

    pub fn with_ids(interface: &'a ReflectionInterface) -> Self {
        ReflectionFormatter {
            show_ids: true,
            ..Self::new(interface)
        }
    }

    /// Format every top-level declaration and return the formatted string.
    pub fn format_declared(interface: &ReflectionInterface) -> String {
        let mut formatter = ReflectionFormatter::new(interface);
        for (id, _) in interface.declared() {
            formatter.write_variable(id);
        }
        formatter.output
    }

    /// Format one variable and its fields.
    pub fn format_variable(mut self, id: ReflectionId) -> String {
        self.write_variable(id);
        self.output
    }

    fn write_variable(&mut self, id: ReflectionId) {
        let var = self.interface.get(id);
        let indent = "  ".repeat(self.indent);
        let ids = if self.show_ids { format!("#{} ", id.0) } else { String::new() };
        let modifier = if var.modifier.is_empty() {
            String::new()
        } else {
            format!("{} ", ModifierDisplay(var.modifier))
        };
        let _ = writeln!(
            self.output,
            "{}{}{} {}{} {}",
            indent, ids, var.qualifier, modifier, var.ty, var.name
        );

        self.indent += 1;
        for child in &var.fields {
            self.write_variable(*child);
        }
        self.indent -= 1;
    }
}

struct ModifierDisplay(VaryingModifier);

impl Display for ModifierDisplay {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let names = [
            (VaryingModifier::INVARIANT, "invariant"),
            (VaryingModifier::FLAT, "flat"),
            (VaryingModifier::SMOOTH, "smooth"),
            (VaryingModifier::NOPERSPECTIVE, "noperspective"),
            (VaryingModifier::CENTROID, "centroid"),
            (VaryingModifier::SAMPLE, "sample"),
        ];
        let words: Vec<&str> = names.iter().filter(|(flag, _)| self.0.contains(*flag)).map(|(_, n)| *n).collect();
        write!(f, "{}", words.join(" "))
    }
}

impl Display for Qualifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Qualifier::Temporary => "temp",
            Qualifier::Const => "const",
            Qualifier::Attribute => "attribute",
            Qualifier::VaryingIn => "varying in",
            Qualifier::VaryingOut => "varying out",
            Qualifier::Uniform => "uniform",
            Qualifier::ParamIn => "in",
            Qualifier::ParamOut => "out",
            Qualifier::ParamInOut => "inout",
            Qualifier::ParamConst => "const in",
        };
        write!(f, "{}", s)
    }
}

impl Display for VariableMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            VariableMode::Auto => "auto",
            VariableMode::Uniform => "uniform",
            VariableMode::ShaderIn => "shader_in",
            VariableMode::ShaderOut => "shader_out",
            VariableMode::FunctionIn => "in",
            VariableMode::FunctionOut => "out",
            VariableMode::FunctionInOut => "inout",
            VariableMode::ConstIn => "const_in",
            VariableMode::Temporary => "temporary",
        };
        write!(f, "{}", s)
    }
}

impl Display for IrVariable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.mode)?;
        if self.read_only {
            write!(f, " read_only")?;
        }
        if self.builtin {
            write!(f, " builtin")?;
        }
        write!(f, " {} {})", self.ty, self.name)
    }
}
