//! Runtime-tunable pipeline options with TOML preset support.
//!
//! Every section uses `#[serde(default)]` so partial TOML files (e.g. only
//! overriding `[ssao]`) work. The JSON Schema drives a debug UI; fields
//! marked `#[schemars(skip)]` are file-only.

mod antialiasing;
mod lighting;
mod render;
mod ssao;

use std::path::Path;

pub use antialiasing::{AntialiasingMode, AntialiasingOptions};
pub use lighting::LightingOptions;
pub use render::{RenderMode, RenderOptions};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
pub use ssao::SsaoOptions;

use crate::error::PipelineError;

/// Top-level options container.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// Render mode selection.
    pub render: RenderOptions,
    /// Lighting and shadow parameters.
    pub lighting: LightingOptions,
    /// SSAO sampling parameters.
    pub ssao: SsaoOptions,
    /// Antialiasing resolve parameters.
    pub antialiasing: AntialiasingOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Io`] if the file cannot be read or
    /// [`PipelineError::OptionsParse`] if it is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OptionsParse`] on malformed input.
    pub fn from_toml(content: &str) -> Result<Self, PipelineError> {
        toml::from_str(content)
            .map_err(|e| PipelineError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::OptionsParse`] if serialization fails or
    /// [`PipelineError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), PipelineError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PipelineError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let opts = Options::default();
        let toml_str = toml::to_string_pretty(&opts).unwrap();
        let parsed = Options::from_toml(&toml_str).unwrap();
        assert_eq!(opts, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r#"
[render]
mode = "shadowed"

[ssao]
radius = 0.8
"#;
        let opts = Options::from_toml(toml_str).unwrap();
        assert_eq!(opts.render.mode, RenderMode::Shadowed);
        assert_eq!(opts.ssao.radius, 0.8);
        assert_eq!(opts.ssao.bias, 0.025);
        assert_eq!(opts.lighting.shadow_near, 1.0);
        assert_eq!(opts.lighting.shadow_far, 25.0);
        assert_eq!(opts.lighting.shadow_resolution, 1024);
        assert_eq!(opts.antialiasing.base_blend_factor, 0.2);
        assert_eq!(opts.antialiasing.depth_threshold, 0.02);
    }

    #[test]
    fn malformed_toml_is_an_options_error() {
        let err = Options::from_toml("[render]\nmode = 3").unwrap_err();
        assert!(matches!(err, PipelineError::OptionsParse(_)));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = std::env::temp_dir()
            .join(format!("penumbra-options-{}", std::process::id()));
        let path = dir.join("preset.toml");
        let mut opts = Options::default();
        opts.lighting.ao_strength = 0.0;
        opts.antialiasing.mode = AntialiasingMode::Fxaa;
        opts.save(&path).unwrap();
        let loaded = Options::load(&path).unwrap();
        assert_eq!(loaded, opts);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn lighting_clamps_to_supported_ranges() {
        let opts = LightingOptions {
            ao_strength: 3.0,
            light_x: -9.0,
            light_z: 9.0,
            shadow_near: 0.0,
            shadow_far: 0.0,
            shadow_resolution: 0,
        }
        .clamped();
        assert_eq!(opts.ao_strength, 1.0);
        assert_eq!(opts.light_x, -5.0);
        assert_eq!(opts.light_z, 5.0);
        assert!(opts.shadow_far > opts.shadow_near);
        assert_eq!(opts.shadow_resolution, 16);
    }

    #[test]
    fn antialiasing_cycle_visits_every_mode() {
        let mut mode = AntialiasingMode::None;
        let mut seen = Vec::new();
        for _ in 0..4 {
            seen.push(mode);
            mode = mode.next();
        }
        assert_eq!(mode, AntialiasingMode::None);
        assert!(seen.contains(&AntialiasingMode::Temporal));
        assert!(seen.contains(&AntialiasingMode::Fxaa));
        assert!(seen.contains(&AntialiasingMode::Msaa));
    }

    #[test]
    fn schema_has_expected_properties() {
        let schema_value =
            serde_json::to_value(Options::json_schema()).unwrap();
        let props = schema_value["properties"].as_object().unwrap();
        for section in ["render", "lighting", "ssao", "antialiasing"] {
            assert!(props.contains_key(section), "missing {section}");
        }
        let lighting = &props["lighting"]["properties"];
        assert!(lighting.get("ao_strength").is_some());
        assert!(lighting.get("light_x").is_some());
        assert!(lighting.get("shadow_far").is_none());
    }
}
