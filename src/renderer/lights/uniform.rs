use bytemuck::Zeroable;
use glam::Mat4;

use super::Light;

/// Maximum number of lights the lighting shaders iterate over.
pub const MAX_LIGHTS: usize = 16;

/// GPU layout of one light. Mirrors `Light` in the lighting WGSL module.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// World to light clip space (first face for point lights).
    pub light_space_matrix: [[f32; 4]; 4],
    /// Linear RGB color, alpha unused.
    pub color: [f32; 4],
    /// World position (point, directional, spot).
    pub position: [f32; 3],
    /// Radiant intensity multiplier.
    pub intensity: f32,
    /// Normalized direction (directional, spot).
    pub direction: [f32; 3],
    /// Cosine of the inner spot cone.
    pub cut_off: f32,
    /// Light type tag (`LIGHT_*` constants in WGSL).
    pub light_type: i32,
    /// Cosine of the outer spot cone.
    pub outer_cut_off: f32,
    /// Nonzero when the light's shadow map is valid.
    pub has_shadow: u32,
    /// Shadow projection far plane.
    pub far_plane: f32,
    /// Shadow projection near plane.
    pub near_plane: f32,
    /// Depth bias subtracted before the shadow comparison.
    pub bias: f32,
    pub(crate) _pad: [f32; 2],
}

/// Shadow parameters written alongside a light's own fields.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowParams {
    /// World to light clip space.
    pub light_space: Mat4,
    /// Whether a shadow map exists for the light.
    pub has_shadow: bool,
    /// Projection near plane.
    pub near: f32,
    /// Projection far plane.
    pub far: f32,
    /// Comparison bias.
    pub bias: f32,
}

impl LightUniform {
    /// Pack `light`. Position, direction and cutoffs are only written for
    /// variants that carry them; the rest stay zero.
    pub fn new(light: &Light, shadow: &ShadowParams) -> Self {
        let mut uniform = Self {
            light_space_matrix: shadow.light_space.to_cols_array_2d(),
            color: light.color().extend(1.0).to_array(),
            intensity: light.intensity(),
            light_type: light.type_tag(),
            has_shadow: u32::from(shadow.has_shadow),
            far_plane: shadow.far,
            near_plane: shadow.near,
            bias: shadow.bias,
            ..Self::zeroed()
        };
        if let Some(position) = light.position() {
            uniform.position = position.to_array();
        }
        if let Some(direction) = light.direction() {
            uniform.direction = direction.to_array();
        }
        if let Light::Spot {
            cut_off,
            outer_cut_off,
            ..
        } = *light
        {
            uniform.cut_off = cut_off;
            uniform.outer_cut_off = outer_cut_off;
        }
        uniform
    }
}

/// GPU layout of the whole light list. Mirrors `Lights` in WGSL.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightsUniform {
    /// Light slots; only the first `light_count` are read.
    pub lights: [LightUniform; MAX_LIGHTS],
    /// Number of valid entries.
    pub light_count: u32,
    pub(crate) _pad: [u32; 3],
}

impl LightsUniform {
    /// Pack up to [`MAX_LIGHTS`] lights.
    pub fn new(lights: &[LightUniform]) -> Self {
        let mut uniform = Self::zeroed();
        let count = lights.len().min(MAX_LIGHTS);
        uniform.lights[..count].copy_from_slice(&lights[..count]);
        uniform.light_count = count as u32;
        uniform
    }
}

#[cfg(test)]
mod tests {
    use std::mem::{offset_of, size_of};

    use glam::Vec3;

    use super::*;

    fn shadow() -> ShadowParams {
        ShadowParams {
            light_space: Mat4::IDENTITY,
            has_shadow: true,
            near: 1.0,
            far: 25.0,
            bias: 0.005,
        }
    }

    #[test]
    fn layout_matches_wgsl() {
        assert_eq!(size_of::<LightUniform>(), 144);
        assert_eq!(offset_of!(LightUniform, color), 64);
        assert_eq!(offset_of!(LightUniform, position), 80);
        assert_eq!(offset_of!(LightUniform, intensity), 92);
        assert_eq!(offset_of!(LightUniform, direction), 96);
        assert_eq!(offset_of!(LightUniform, light_type), 112);
        assert_eq!(offset_of!(LightUniform, has_shadow), 120);
        assert_eq!(offset_of!(LightUniform, bias), 132);
        assert_eq!(size_of::<LightsUniform>(), 144 * MAX_LIGHTS + 16);
    }

    #[test]
    fn ambient_writes_no_position_or_direction() {
        let light = Light::Ambient {
            color: Vec3::ONE,
            intensity: 0.2,
        };
        let u = LightUniform::new(&light, &shadow());
        assert_eq!(u.position, [0.0; 3]);
        assert_eq!(u.direction, [0.0; 3]);
        assert_eq!(u.light_type, 0);
        assert_eq!(u.intensity, 0.2);
    }

    #[test]
    fn spot_writes_cutoffs() {
        let light = Light::Spot {
            position: Vec3::new(5.0, 5.0, 5.0),
            direction: Vec3::NEG_Y,
            color: Vec3::ONE,
            intensity: 40.0,
            cut_off: 0.97,
            outer_cut_off: 0.86,
        };
        let u = LightUniform::new(&light, &shadow());
        assert_eq!(u.cut_off, 0.97);
        assert_eq!(u.outer_cut_off, 0.86);
        assert_eq!(u.position, [5.0, 5.0, 5.0]);
        assert_eq!(u.direction, [0.0, -1.0, 0.0]);
        assert_eq!(u.has_shadow, 1);
    }

    #[test]
    fn list_truncates_to_max_lights() {
        let one = LightUniform::new(
            &Light::Point {
                position: Vec3::ONE,
                color: Vec3::ONE,
                intensity: 1.0,
            },
            &shadow(),
        );
        let uniform = LightsUniform::new(&[one; MAX_LIGHTS + 3]);
        assert_eq!(uniform.light_count, MAX_LIGHTS as u32);
        assert_eq!(LightsUniform::new(&[one; 2]).light_count, 2);
    }
}
