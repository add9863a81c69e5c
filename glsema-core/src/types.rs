//! Resolved GLSL type descriptors.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Bool,
    Int,
    Uint,
    Float,
    Double,
}

impl ScalarKind {
    fn scalar_name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int => "int",
            ScalarKind::Uint => "uint",
            ScalarKind::Float => "float",
            ScalarKind::Double => "double",
        }
    }

    fn vector_prefix(self) -> &'static str {
        match self {
            ScalarKind::Bool => "b",
            ScalarKind::Int => "i",
            ScalarKind::Uint => "u",
            ScalarKind::Float => "",
            ScalarKind::Double => "d",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Interpolation {
    #[default]
    Auto,
    Smooth,
    Flat,
    NoPerspective,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Struct,
    Interface,
}

/// One member of a struct or interface block, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
    /// `layout(location = N)` slot, -1 when unassigned
    pub location: i32,
    pub interpolation: Interpolation,
    pub centroid: bool,
    pub sample: bool,
    /// Only meaningful for matrix and array-of-matrix members
    pub row_major: bool,
}

/// A struct or interface block type. Immutable once built; shared by name.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordType {
    pub name: String,
    pub kind: RecordKind,
    pub fields: Vec<StructField>,
}

impl RecordType {
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Opaque sampler types recognised by name.
const SAMPLER_TYPES: &[&str] = &[
    "sampler1D",
    "sampler2D",
    "sampler3D",
    "samplerCube",
    "sampler1DShadow",
    "sampler2DShadow",
    "samplerCubeShadow",
    "sampler1DArray",
    "sampler2DArray",
    "sampler2DArrayShadow",
    "sampler2DRect",
    "sampler2DRectShadow",
    "samplerBuffer",
    "sampler2DMS",
    "isampler2D",
    "isampler3D",
    "isamplerCube",
    "usampler2D",
    "usampler3D",
    "usamplerCube",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    /// Stands in for anything that failed to resolve
    Error,
    Scalar(ScalarKind),
    Vector(ScalarKind, u8),
    /// `columns` vectors of `rows` components
    Matrix {
        element: ScalarKind,
        columns: u8,
        rows: u8,
    },
    Sampler(&'static str),
    /// Element type and length; `None` is an unsized array
    Array(Box<Type>, Option<u32>),
    Record(Arc<RecordType>),
}

impl Type {
    pub fn float() -> Type {
        Type::Scalar(ScalarKind::Float)
    }

    pub fn int() -> Type {
        Type::Scalar(ScalarKind::Int)
    }

    pub fn uint() -> Type {
        Type::Scalar(ScalarKind::Uint)
    }

    pub fn bool() -> Type {
        Type::Scalar(ScalarKind::Bool)
    }

    pub fn vec(size: u8) -> Type {
        Type::Vector(ScalarKind::Float, size)
    }

    pub fn mat(columns: u8, rows: u8) -> Type {
        Type::Matrix {
            element: ScalarKind::Float,
            columns,
            rows,
        }
    }

    pub fn array_of(element: Type, length: Option<u32>) -> Type {
        Type::Array(Box::new(element), length)
    }

    /// Vector of `size` components, collapsing to a scalar when `size == 1`.
    pub fn vector_or_scalar(kind: ScalarKind, size: u8) -> Type {
        if size == 1 { Type::Scalar(kind) } else { Type::Vector(kind, size) }
    }

    /// Look up a builtin type by its GLSL spelling.
    pub fn from_builtin_name(name: &str) -> Option<Type> {
        match name {
            "void" => return Some(Type::Void),
            "bool" => return Some(Type::bool()),
            "int" => return Some(Type::int()),
            "uint" => return Some(Type::uint()),
            "float" => return Some(Type::float()),
            "double" => return Some(Type::Scalar(ScalarKind::Double)),
            _ => {}
        }

        if let Some(sampler) = SAMPLER_TYPES.iter().find(|s| **s == name) {
            return Some(Type::Sampler(*sampler));
        }

        let (kind, rest) = match name.as_bytes().first() {
            Some(b'b') => (ScalarKind::Bool, &name[1..]),
            Some(b'i') => (ScalarKind::Int, &name[1..]),
            Some(b'u') => (ScalarKind::Uint, &name[1..]),
            Some(b'd') => (ScalarKind::Double, &name[1..]),
            _ => (ScalarKind::Float, name),
        };

        if let Some(size) = rest.strip_prefix("vec") {
            return parse_dimension(size).map(|n| Type::Vector(kind, n));
        }

        if let Some(dims) = rest.strip_prefix("mat") {
            if !matches!(kind, ScalarKind::Float | ScalarKind::Double) {
                return None;
            }
            let (columns, rows) = match dims.split_once('x') {
                Some((c, r)) => (parse_dimension(c)?, parse_dimension(r)?),
                None => {
                    let n = parse_dimension(dims)?;
                    (n, n)
                }
            };
            return Some(Type::Matrix {
                element: kind,
                columns,
                rows,
            });
        }

        None
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Type::Error)
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Scalar(_))
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Type::Vector(..))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Type::Matrix { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    pub fn is_unsized_array(&self) -> bool {
        matches!(self, Type::Array(_, None))
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Type::Record(_))
    }

    pub fn is_numeric(&self) -> bool {
        match self.base_kind() {
            Some(kind) => kind != ScalarKind::Bool,
            None => false,
        }
    }

    /// Matrix, or array (of arrays) of matrices.
    pub fn is_matrix_or_matrix_array(&self) -> bool {
        self.without_array().is_matrix()
    }

    pub fn as_record(&self) -> Option<&Arc<RecordType>> {
        match self {
            Type::Record(record) => Some(record),
            _ => None,
        }
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(element, _) => Some(element),
            _ => None,
        }
    }

    pub fn array_length(&self) -> Option<u32> {
        match self {
            Type::Array(_, length) => *length,
            _ => None,
        }
    }

    /// Innermost non-array type.
    pub fn without_array(&self) -> &Type {
        let mut ty = self;
        while let Type::Array(element, _) = ty {
            ty = element;
        }
        ty
    }

    /// Component kind of a scalar, vector or matrix.
    pub fn base_kind(&self) -> Option<ScalarKind> {
        match self {
            Type::Scalar(kind) | Type::Vector(kind, _) => Some(*kind),
            Type::Matrix { element, .. } => Some(*element),
            _ => None,
        }
    }

    pub fn vector_elements(&self) -> u8 {
        match self {
            Type::Scalar(_) => 1,
            Type::Vector(_, n) => *n,
            Type::Matrix { rows, .. } => *rows,
            _ => 0,
        }
    }

    /// Type of `m[i]` for a matrix.
    pub fn column_type(&self) -> Option<Type> {
        match self {
            Type::Matrix { element, rows, .. } => Some(Type::Vector(*element, *rows)),
            _ => None,
        }
    }

    /// Same shape with a different component kind (`vec3` -> `ivec3`).
    pub fn with_base_kind(&self, kind: ScalarKind) -> Type {
        match self {
            Type::Scalar(_) => Type::Scalar(kind),
            Type::Vector(_, n) => Type::Vector(kind, *n),
            other => other.clone(),
        }
    }

    /// GLSL implicit conversions: int/uint to float/double, float to double,
    /// componentwise for vectors.
    pub fn can_implicitly_convert_to(&self, target: &Type) -> bool {
        if self == target {
            return true;
        }
        let (Some(from), Some(to)) = (self.base_kind(), target.base_kind()) else {
            return false;
        };
        if self.with_base_kind(to) != *target {
            return false;
        }
        matches!(
            (from, to),
            (ScalarKind::Int | ScalarKind::Uint, ScalarKind::Float | ScalarKind::Double)
                | (ScalarKind::Float, ScalarKind::Double)
        )
    }
}

fn parse_dimension(s: &str) -> Option<u8> {
    match s {
        "2" => Some(2),
        "3" => Some(3),
        "4" => Some(4),
        _ => None,
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Type::Void => write!(f, "void"),
            Type::Error => write!(f, "<error>"),
            Type::Scalar(kind) => write!(f, "{}", kind.scalar_name()),
            Type::Vector(kind, n) => write!(f, "{}vec{}", kind.vector_prefix(), n),
            Type::Matrix {
                element,
                columns,
                rows,
            } => {
                let prefix = if *element == ScalarKind::Double { "d" } else { "" };
                if columns == rows {
                    write!(f, "{}mat{}", prefix, columns)
                } else {
                    write!(f, "{}mat{}x{}", prefix, columns, rows)
                }
            }
            Type::Sampler(name) => write!(f, "{}", name),
            Type::Record(record) => write!(f, "{}", record.name),
            Type::Array(..) => {
                // float[2][3] is an array of 2 arrays of 3 floats
                write!(f, "{}", self.without_array())?;
                let mut ty = self;
                while let Type::Array(element, length) = ty {
                    match length {
                        Some(n) => write!(f, "[{}]", n)?,
                        None => write!(f, "[]")?,
                    }
                    ty = element;
                }
                Ok(())
            }
        }
    }
}
