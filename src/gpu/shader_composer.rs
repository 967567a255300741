use std::borrow::Cow;
use std::collections::HashMap;

use naga_oil::compose::{
    ComposableModuleDescriptor, Composer, ComposerError, NagaModuleDescriptor,
    ShaderDefValue, ShaderLanguage, ShaderType,
};

use crate::error::PipelineError;

/// Every root shader the pipeline builds a module from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shader {
    /// Direct-lit forward geometry (all lights, no shadows).
    Forward,
    /// Geometry pass writing the six G-Buffer attachments.
    GBuffer,
    /// Depth-only shadow map rendering.
    ShadowDepth,
    /// Forward geometry lit by one shadowed light, accumulated additively.
    Shadowed,
    /// Full-screen deferred lighting.
    DeferredLighting,
    /// Deferred lighting with the blurred AO texture bound.
    DeferredLightingSsao,
    /// Raw hemisphere SSAO.
    Ssao,
    /// 4x4 box blur of the raw AO.
    SsaoBlur,
    /// History-blended temporal resolve.
    TemporalResolve,
    /// Single-frame FXAA resolve.
    Fxaa,
}

impl Shader {
    /// All shaders, in pipeline order.
    pub const ALL: [Self; 10] = [
        Self::Forward,
        Self::GBuffer,
        Self::ShadowDepth,
        Self::Shadowed,
        Self::DeferredLighting,
        Self::DeferredLightingSsao,
        Self::Ssao,
        Self::SsaoBlur,
        Self::TemporalResolve,
        Self::Fxaa,
    ];

    /// WGSL source text.
    pub fn source(self) -> &'static str {
        match self {
            Self::Forward => {
                include_str!("../../assets/shaders/raster/forward.wgsl")
            }
            Self::GBuffer => {
                include_str!("../../assets/shaders/raster/gbuffer.wgsl")
            }
            Self::ShadowDepth => {
                include_str!("../../assets/shaders/raster/shadow_depth.wgsl")
            }
            Self::Shadowed => {
                include_str!("../../assets/shaders/raster/shadowed.wgsl")
            }
            Self::DeferredLighting | Self::DeferredLightingSsao => include_str!(
                "../../assets/shaders/screen/deferred_lighting.wgsl"
            ),
            Self::Ssao => include_str!("../../assets/shaders/screen/ssao.wgsl"),
            Self::SsaoBlur => {
                include_str!("../../assets/shaders/screen/ssao_blur.wgsl")
            }
            Self::TemporalResolve => {
                include_str!("../../assets/shaders/screen/taa_resolve.wgsl")
            }
            Self::Fxaa => include_str!("../../assets/shaders/screen/fxaa.wgsl"),
        }
    }

    /// Path reported in composition errors.
    pub fn file_path(self) -> &'static str {
        match self {
            Self::Forward => "raster/forward.wgsl",
            Self::GBuffer => "raster/gbuffer.wgsl",
            Self::ShadowDepth => "raster/shadow_depth.wgsl",
            Self::Shadowed => "raster/shadowed.wgsl",
            Self::DeferredLighting | Self::DeferredLightingSsao => {
                "screen/deferred_lighting.wgsl"
            }
            Self::Ssao => "screen/ssao.wgsl",
            Self::SsaoBlur => "screen/ssao_blur.wgsl",
            Self::TemporalResolve => "screen/taa_resolve.wgsl",
            Self::Fxaa => "screen/fxaa.wgsl",
        }
    }

    /// Debug label for the wgpu shader module.
    pub fn label(self) -> &'static str {
        match self {
            Self::Forward => "Forward Shader",
            Self::GBuffer => "G-Buffer Shader",
            Self::ShadowDepth => "Shadow Depth Shader",
            Self::Shadowed => "Shadowed Lighting Shader",
            Self::DeferredLighting => "Deferred Lighting Shader",
            Self::DeferredLightingSsao => "Deferred Lighting (SSAO) Shader",
            Self::Ssao => "SSAO Shader",
            Self::SsaoBlur => "SSAO Blur Shader",
            Self::TemporalResolve => "Temporal Resolve Shader",
            Self::Fxaa => "FXAA Shader",
        }
    }

    fn shader_defs(self) -> HashMap<String, ShaderDefValue> {
        let mut defs = HashMap::new();
        if self == Self::DeferredLightingSsao {
            let _ = defs.insert("SSAO".to_owned(), ShaderDefValue::Bool(true));
        }
        defs
    }
}

/// Wraps `naga_oil::compose::Composer` to provide shader composition with
/// `#import` support.
///
/// Shared modules are registered once at construction. Root shaders use
/// `#import penumbra::module_name` to pull them in; the composer produces
/// `naga::Module` IR directly, skipping a WGSL re-parse inside wgpu.
pub struct ShaderComposer {
    composer: Composer,
}

/// Shared module definition: (source, file_path)
struct ModuleDef {
    source: &'static str,
    file_path: &'static str,
}

/// Shared modules in dependency order.
const MODULES: &[ModuleDef] = &[
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/fullscreen.wgsl"),
        file_path: "modules/fullscreen.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/camera.wgsl"),
        file_path: "modules/camera.wgsl",
    },
    ModuleDef {
        source: include_str!("../../assets/shaders/modules/lighting.wgsl"),
        file_path: "modules/lighting.wgsl",
    },
];

fn compose_error(file_path: &str, e: &ComposerError) -> PipelineError {
    PipelineError::ShaderCompose(format!("{file_path}: {e}"))
}

impl ShaderComposer {
    /// Register every shared module.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShaderCompose`] if a shared module fails to
    /// parse.
    pub fn new() -> Result<Self, PipelineError> {
        let mut composer = Composer::default();
        for m in MODULES {
            let _ = composer
                .add_composable_module(ComposableModuleDescriptor {
                    source: m.source,
                    file_path: m.file_path,
                    language: ShaderLanguage::Wgsl,
                    ..Default::default()
                })
                .map_err(|e| compose_error(m.file_path, &e))?;
        }
        Ok(Self { composer })
    }

    /// Compose `shader` into a `wgpu::ShaderModule` ready for pipeline
    /// creation.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShaderCompose`] if imports or validation fail.
    pub fn compose(
        &mut self,
        device: &wgpu::Device,
        shader: Shader,
    ) -> Result<wgpu::ShaderModule, PipelineError> {
        let naga_module = self.compose_naga(shader)?;
        Ok(device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(shader.label()),
            source: wgpu::ShaderSource::Naga(Cow::Owned(naga_module)),
        }))
    }

    /// Compose into a `naga::Module` without touching a device. Used by the
    /// binding-contract tests.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShaderCompose`] if imports or validation fail.
    pub fn compose_naga(
        &mut self,
        shader: Shader,
    ) -> Result<naga::Module, PipelineError> {
        self.composer
            .make_naga_module(NagaModuleDescriptor {
                source: shader.source(),
                file_path: shader.file_path(),
                shader_type: ShaderType::Wgsl,
                shader_defs: shader.shader_defs(),
                ..Default::default()
            })
            .map_err(|e| compose_error(shader.file_path(), &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_shaders_compose() {
        let mut composer = ShaderComposer::new().unwrap();
        for shader in Shader::ALL {
            if let Err(e) = composer.compose_naga(shader) {
                panic!("{shader:?} failed to compose: {e}");
            }
        }
    }

    #[test]
    fn test_all_shaders_validate() {
        let mut composer = ShaderComposer::new().unwrap();
        for shader in Shader::ALL {
            let module = composer.compose_naga(shader).unwrap();
            let mut validator = naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::empty(),
            );
            if let Err(e) = validator.validate(&module) {
                panic!("{shader:?} failed validation: {e:?}");
            }
        }
    }

    /// naga_oil refuses composable modules whose identifiers end in a digit
    /// because the naga writer would rename them.
    #[test]
    fn test_module_identifiers_need_no_renaming() {
        const BUILTIN_TYPES: [&str; 9] = [
            "vec2", "vec3", "vec4", "mat3x3", "mat4x4", "f32", "u32", "i32",
            "texture_2d",
        ];
        for m in MODULES {
            for line in m.source.lines() {
                let code = line.split("//").next().unwrap_or_default();
                let idents = code
                    .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .filter(|t| t.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_'));
                for ident in idents {
                    if BUILTIN_TYPES.contains(&ident) || ident.starts_with("texture_depth_2d") {
                        continue;
                    }
                    assert!(
                        !ident.ends_with(|c: char| c.is_ascii_digit()),
                        "{}: `{ident}` ends in a digit",
                        m.file_path
                    );
                }
            }
        }
    }

    #[test]
    fn test_ssao_variant_differs() {
        let mut composer = ShaderComposer::new().unwrap();
        let plain = composer.compose_naga(Shader::DeferredLighting).unwrap();
        let ssao = composer
            .compose_naga(Shader::DeferredLightingSsao)
            .unwrap();
        assert_eq!(
            ssao.global_variables.len(),
            plain.global_variables.len() + 1
        );
    }
}
