use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lighting and shadow parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Lighting", inline)]
#[serde(default)]
pub struct LightingOptions {
    /// Weight of the ambient-occlusion term in the deferred lighting pass.
    #[schemars(title = "AO Strength", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub ao_strength: f32,
    /// World-space x of the first light.
    #[schemars(title = "Light X", range(min = -5.0, max = 5.0), extend("step" = 0.1))]
    pub light_x: f32,
    /// World-space z of the first light.
    #[schemars(title = "Light Z", range(min = -5.0, max = 5.0), extend("step" = 0.1))]
    pub light_z: f32,
    /// Near plane of every light-space projection.
    #[schemars(skip)]
    pub shadow_near: f32,
    /// Far plane of every light-space projection.
    #[schemars(skip)]
    pub shadow_far: f32,
    /// Edge length of each shadow map face in texels.
    #[schemars(skip)]
    pub shadow_resolution: u32,
}

impl LightingOptions {
    /// Copy with every tunable clamped to its supported range.
    #[must_use]
    pub fn clamped(&self) -> Self {
        Self {
            ao_strength: self.ao_strength.clamp(0.0, 1.0),
            light_x: self.light_x.clamp(-5.0, 5.0),
            light_z: self.light_z.clamp(-5.0, 5.0),
            shadow_near: self.shadow_near.max(0.001),
            shadow_far: self.shadow_far.max(self.shadow_near.max(0.001) + 0.001),
            shadow_resolution: self.shadow_resolution.clamp(16, 8192),
        }
    }
}

impl Default for LightingOptions {
    fn default() -> Self {
        Self {
            ao_strength: 0.5,
            light_x: -5.0,
            light_z: 0.0,
            shadow_near: 1.0,
            shadow_far: 25.0,
            shadow_resolution: 1024,
        }
    }
}
