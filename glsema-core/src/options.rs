//! Language version and stage settings that gate version-specific rules.

use spirv::ExecutionModel;

#[derive(Debug, Clone, PartialEq)]
pub struct ShaderOptions {
    pub stage: ExecutionModel,
    /// `#version` number, e.g. 110, 150, 330, 300 (with `es`)
    pub language_version: u32,
    pub es: bool,
    /// `GL_ARB_shading_language_420pack` enabled
    pub arb_shading_language_420pack: bool,
}

impl Default for ShaderOptions {
    fn default() -> Self {
        ShaderOptions {
            stage: ExecutionModel::Fragment,
            language_version: 110,
            es: false,
            arb_shading_language_420pack: false,
        }
    }
}

impl ShaderOptions {
    pub fn new(stage: ExecutionModel) -> Self {
        ShaderOptions {
            stage,
            ..Default::default()
        }
    }

    pub fn with_stage(mut self, stage: ExecutionModel) -> Self {
        self.stage = stage;
        self
    }

    pub fn with_version(mut self, language_version: u32, es: bool) -> Self {
        self.language_version = language_version;
        self.es = es;
        self
    }

    pub fn with_420pack(mut self, enabled: bool) -> Self {
        self.arb_shading_language_420pack = enabled;
        self
    }

    /// Struct definitions nested inside struct definitions (GLSL 1.10 only)
    pub fn allows_embedded_structs(&self) -> bool {
        !self.es && self.language_version == 110
    }

    /// `.x`-style swizzles on scalars
    pub fn relaxed_scalar_swizzle(&self) -> bool {
        self.arb_shading_language_420pack || (!self.es && self.language_version >= 420)
    }

    pub fn allows_arrays_of_arrays(&self) -> bool {
        if self.es { self.language_version >= 310 } else { self.language_version >= 430 }
    }

    pub fn is_geometry(&self) -> bool {
        self.stage == ExecutionModel::Geometry
    }

    pub fn stage_name(&self) -> &'static str {
        match self.stage {
            ExecutionModel::Vertex => "vertex",
            ExecutionModel::TessellationControl => "tessellation control",
            ExecutionModel::TessellationEvaluation => "tessellation evaluation",
            ExecutionModel::Geometry => "geometry",
            ExecutionModel::Fragment => "fragment",
            ExecutionModel::GLCompute => "compute",
            _ => "unknown",
        }
    }
}
