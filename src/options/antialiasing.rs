use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How the forward pass is resolved to the default target.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    Default,
    JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum AntialiasingMode {
    /// Geometry goes straight to the default target.
    None,
    /// Hardware multisampling. Not modeled separately; behaves like `None`.
    Msaa,
    /// History-blended temporal resolve.
    #[default]
    Temporal,
    /// Single-frame FXAA resolve.
    Fxaa,
}

impl AntialiasingMode {
    /// Next mode in the viewer's cycle order.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::None => Self::Msaa,
            Self::Msaa => Self::Temporal,
            Self::Temporal => Self::Fxaa,
            Self::Fxaa => Self::None,
        }
    }

    /// Whether the forward pass renders through the resolve surface.
    pub fn uses_resolve(self) -> bool {
        matches!(self, Self::Temporal | Self::Fxaa)
    }
}

/// Antialiasing resolve parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[schemars(title = "Antialiasing", inline)]
#[serde(default)]
pub struct AntialiasingOptions {
    /// Resolve technique.
    #[schemars(title = "Mode")]
    pub mode: AntialiasingMode,
    /// Weight of the current frame when history is accepted; 1.0 shows
    /// only the current frame.
    #[schemars(title = "Current Frame Weight", range(min = 0.0, max = 1.0), extend("step" = 0.01))]
    pub base_blend_factor: f32,
    /// Linear depth difference above which history is rejected.
    #[schemars(title = "Depth Threshold", range(min = 0.0, max = 0.2), extend("step" = 0.005))]
    pub depth_threshold: f32,
}

impl Default for AntialiasingOptions {
    fn default() -> Self {
        Self {
            mode: AntialiasingMode::default(),
            base_blend_factor: 0.2,
            depth_threshold: 0.02,
        }
    }
}
