// Builtin function and variable catalog
// Provides signatures for call classification and the variables each stage predeclares

use crate::ir::{IrVariable, VariableMode};
use crate::types::{ScalarKind, Type};
use spirv::ExecutionModel;
use std::collections::HashMap;

/// Name of the geometry-shader vertex emission builtin
pub const EMIT_VERTEX: &str = "EmitVertex";

/// Builtins the shader may redeclare at global scope
pub const REDECLARABLE_BUILTINS: &[&str] = &[
    "gl_FragCoord",
    "gl_FragDepth",
    "gl_TexCoord",
    "gl_FrontColor",
    "gl_BackColor",
    "gl_FrontSecondaryColor",
    "gl_BackSecondaryColor",
    "gl_Color",
    "gl_SecondaryColor",
];

/// Answers whether a call matches a builtin signature
pub trait BuiltinOracle {
    /// Return type of the matching builtin overload, if any.
    fn find_builtin(&self, name: &str, args: &[Type]) -> Option<Type>;

    fn is_builtin(&self, name: &str, args: &[Type]) -> bool {
        self.find_builtin(name, args).is_some()
    }
}

/// Builtin function descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinDescriptor {
    pub name: String,

    /// Parameter types
    pub param_types: Vec<Type>,

    /// Return type
    pub return_type: Type,
}

/// Central registry for builtin functions, keyed by name with one entry per
/// overload
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    builtins: HashMap<String, Vec<BuiltinDescriptor>>,
}

impl BuiltinRegistry {
    pub fn new() -> Self {
        let mut registry = BuiltinRegistry {
            builtins: HashMap::new(),
        };

        registry.register_angle_and_trig_functions();
        registry.register_common_functions();
        registry.register_geometric_functions();
        registry.register_matrix_functions();
        registry.register_texture_functions();
        registry.register_geometry_functions();

        registry
    }

    /// Check if a name is a registered builtin
    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// All overloads of a builtin
    pub fn overloads(&self, name: &str) -> &[BuiltinDescriptor] {
        self.builtins.get(name).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Register a builtin function overload
    pub fn register(&mut self, name: &str, param_types: Vec<Type>, return_type: Type) {
        self.builtins.entry(name.to_string()).or_default().push(BuiltinDescriptor {
            name: name.to_string(),
            param_types,
            return_type,
        });
    }

    /// float, vec2, vec3, vec4
    fn gen_types() -> impl Iterator<Item = Type> {
        (1..=4).map(|n| Type::vector_or_scalar(ScalarKind::Float, n))
    }

    /// Register `name(genType) -> genType` for every genType
    fn register_unary_gen(&mut self, name: &str) {
        for t in Self::gen_types() {
            self.register(name, vec![t.clone()], t);
        }
    }

    /// Register `name(genType, genType) -> genType` for every genType
    fn register_binary_gen(&mut self, name: &str) {
        for t in Self::gen_types() {
            self.register(name, vec![t.clone(), t.clone()], t);
        }
    }

    fn register_angle_and_trig_functions(&mut self) {
        for name in [
            "radians", "degrees", "sin", "cos", "tan", "asin", "acos", "sinh", "cosh", "tanh",
        ] {
            self.register_unary_gen(name);
        }
        self.register_unary_gen("atan");
        self.register_binary_gen("atan");
    }

    fn register_common_functions(&mut self) {
        for name in [
            "exp", "log", "exp2", "log2", "sqrt", "inversesqrt", "abs", "sign", "floor", "ceil",
            "fract",
        ] {
            self.register_unary_gen(name);
        }
        for name in ["pow", "mod", "min", "max", "step"] {
            self.register_binary_gen(name);
        }

        let float_t = Type::float();
        for t in Self::gen_types().skip(1) {
            self.register("mod", vec![t.clone(), float_t.clone()], t.clone());
            self.register("min", vec![t.clone(), float_t.clone()], t.clone());
            self.register("max", vec![t.clone(), float_t.clone()], t.clone());
            self.register(
                "clamp",
                vec![t.clone(), float_t.clone(), float_t.clone()],
                t.clone(),
            );
            self.register("mix", vec![t.clone(), t.clone(), float_t.clone()], t.clone());
            self.register("step", vec![float_t.clone(), t.clone()], t.clone());
            self.register(
                "smoothstep",
                vec![float_t.clone(), float_t.clone(), t.clone()],
                t,
            );
        }
        for t in Self::gen_types() {
            let three = vec![t.clone(), t.clone(), t.clone()];
            self.register("clamp", three.clone(), t.clone());
            self.register("mix", three.clone(), t.clone());
            self.register("smoothstep", three, t);
        }
    }

    fn register_geometric_functions(&mut self) {
        let float_t = Type::float();
        for t in Self::gen_types() {
            self.register("length", vec![t.clone()], float_t.clone());
            self.register("distance", vec![t.clone(), t.clone()], float_t.clone());
            self.register("dot", vec![t.clone(), t.clone()], float_t.clone());
            self.register("normalize", vec![t.clone()], t.clone());
            self.register("faceforward", vec![t.clone(), t.clone(), t.clone()], t.clone());
            self.register("reflect", vec![t.clone(), t.clone()], t.clone());
            self.register("refract", vec![t.clone(), t.clone(), float_t.clone()], t);
        }
        self.register("cross", vec![Type::vec(3), Type::vec(3)], Type::vec(3));
    }

    fn register_matrix_functions(&mut self) {
        for n in 2..=4 {
            let m = Type::mat(n, n);
            self.register("matrixCompMult", vec![m.clone(), m.clone()], m.clone());
            self.register("transpose", vec![m.clone()], m.clone());
            self.register("inverse", vec![m.clone()], m.clone());
            self.register("determinant", vec![m], Type::float());
        }
    }

    fn register_texture_functions(&mut self) {
        let vec4 = Type::vec(4);
        let lookups: [(&'static str, Type, &str); 4] = [
            ("sampler1D", Type::float(), "texture1D"),
            ("sampler2D", Type::vec(2), "texture2D"),
            ("sampler3D", Type::vec(3), "texture3D"),
            ("samplerCube", Type::vec(3), "textureCube"),
        ];
        for (sampler, coord, legacy) in lookups {
            let params = vec![Type::Sampler(sampler), coord];
            self.register("texture", params.clone(), vec4.clone());
            self.register(legacy, params, vec4.clone());
        }
    }

    fn register_geometry_functions(&mut self) {
        self.register(EMIT_VERTEX, vec![], Type::Void);
        self.register("EndPrimitive", vec![], Type::Void);
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinOracle for BuiltinRegistry {
    /// Exact match first, then a match through implicit conversions.
    fn find_builtin(&self, name: &str, args: &[Type]) -> Option<Type> {
        let overloads = self.overloads(name);
        overloads
            .iter()
            .find(|d| d.param_types == args)
            .or_else(|| {
                overloads.iter().find(|d| {
                    d.param_types.len() == args.len()
                        && args
                            .iter()
                            .zip(&d.param_types)
                            .all(|(arg, param)| arg.can_implicitly_convert_to(param))
                })
            })
            .map(|d| d.return_type.clone())
    }
}

/// Variables a stage predeclares before any shader code is seen.
pub fn builtin_variables(stage: ExecutionModel) -> Vec<IrVariable> {
    use VariableMode::{ShaderIn, ShaderOut};

    let vec4 = Type::vec(4);
    let tex_coords = Type::array_of(vec4.clone(), None);
    let specs: Vec<(&str, Type, VariableMode)> = match stage {
        ExecutionModel::Vertex => vec![
            ("gl_Position", vec4.clone(), ShaderOut),
            ("gl_PointSize", Type::float(), ShaderOut),
            ("gl_VertexID", Type::int(), ShaderIn),
            ("gl_InstanceID", Type::int(), ShaderIn),
            ("gl_FrontColor", vec4.clone(), ShaderOut),
            ("gl_BackColor", vec4.clone(), ShaderOut),
            ("gl_FrontSecondaryColor", vec4.clone(), ShaderOut),
            ("gl_BackSecondaryColor", vec4.clone(), ShaderOut),
            ("gl_TexCoord", tex_coords, ShaderOut),
        ],
        ExecutionModel::Fragment => vec![
            ("gl_FragCoord", vec4.clone(), ShaderIn),
            ("gl_FrontFacing", Type::bool(), ShaderIn),
            ("gl_PointCoord", Type::vec(2), ShaderIn),
            ("gl_Color", vec4.clone(), ShaderIn),
            ("gl_SecondaryColor", vec4.clone(), ShaderIn),
            ("gl_TexCoord", tex_coords, ShaderIn),
            ("gl_FragColor", vec4.clone(), ShaderOut),
            ("gl_FragDepth", Type::float(), ShaderOut),
        ],
        ExecutionModel::Geometry => vec![
            ("gl_Position", vec4.clone(), ShaderOut),
            ("gl_PointSize", Type::float(), ShaderOut),
            ("gl_PrimitiveIDIn", Type::int(), ShaderIn),
            ("gl_PrimitiveID", Type::int(), ShaderOut),
            ("gl_Layer", Type::int(), ShaderOut),
        ],
        _ => Vec::new(),
    };

    specs
        .into_iter()
        .map(|(name, ty, mode)| {
            let mut var = IrVariable::new(name, ty, mode, Default::default());
            var.builtin = true;
            var.read_only = mode == ShaderIn;
            var
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_and_converted_matches() {
        let registry = BuiltinRegistry::new();
        assert_eq!(registry.find_builtin("dot", &[Type::vec(3), Type::vec(3)]), Some(Type::float()));
        assert_eq!(registry.find_builtin("sin", &[Type::int()]), Some(Type::float()));
        assert_eq!(registry.find_builtin("cross", &[Type::vec(2), Type::vec(2)]), None);
        assert!(!registry.is_builtin("myFunction", &[]));
    }

    #[test]
    fn test_emit_vertex_registered() {
        let registry = BuiltinRegistry::new();
        assert_eq!(registry.find_builtin(EMIT_VERTEX, &[]), Some(Type::Void));
    }

    #[test]
    fn test_stage_variables() {
        let frag = builtin_variables(ExecutionModel::Fragment);
        let coord = frag.iter().find(|v| v.name == "gl_FragCoord").unwrap();
        assert!(coord.builtin && coord.read_only);
        assert!(builtin_variables(ExecutionModel::GLCompute).is_empty());
    }
}
