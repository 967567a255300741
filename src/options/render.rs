use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which pass sequence the pipeline runs each frame.
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
pub enum RenderMode {
    /// Direct-lit geometry, optionally antialiased.
    Forward,
    /// G-Buffer geometry followed by a full-screen lighting pass.
    Deferred,
    /// Deferred lighting with screen-space ambient occlusion.
    #[default]
    DeferredWithSsao,
    /// Per-light shadow maps with additive shadowed lighting.
    Shadowed,
}

impl RenderMode {
    /// All modes, in the order the viewer's number keys select them.
    pub const ALL: [Self; 4] = [
        Self::Forward,
        Self::Deferred,
        Self::DeferredWithSsao,
        Self::Shadowed,
    ];

    /// Whether this mode renders through the G-Buffer.
    pub fn is_deferred(self) -> bool {
        matches!(self, Self::Deferred | Self::DeferredWithSsao)
    }
}

/// Render mode selection.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[schemars(title = "Render", inline)]
#[serde(default)]
pub struct RenderOptions {
    /// Active render mode.
    #[schemars(title = "Mode")]
    pub mode: RenderMode,
}
