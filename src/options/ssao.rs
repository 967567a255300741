use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Screen-space ambient occlusion sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "SSAO", inline)]
#[serde(default)]
pub struct SsaoOptions {
    /// Hemisphere radius in view space.
    #[schemars(title = "Radius", range(min = 0.05, max = 2.0), extend("step" = 0.05))]
    pub radius: f32,
    /// Depth bias against self-occlusion.
    #[schemars(skip)]
    pub bias: f32,
}

impl Default for SsaoOptions {
    fn default() -> Self {
        Self {
            radius: 0.5,
            bias: 0.025,
        }
    }
}
