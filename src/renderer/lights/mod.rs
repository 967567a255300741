//! Scene lights, their light-space transforms and their shadow maps.
//!
//! [`Lights`] owns one [`LightRecord`] per registered light. Shadow-casting
//! lights allocate their shadow surface when they are added; a light whose
//! surface cannot be created is kept and lit without shadows.

/// Light-space projection math.
pub mod light_space;
/// Depth-only shadow surfaces.
pub mod shadow;
/// GPU light layouts.
pub mod uniform;

use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

pub use shadow::{ShadowKind, ShadowMap};
pub use uniform::{LightUniform, LightsUniform, ShadowParams, MAX_LIGHTS};

use crate::error::PipelineError;
use crate::gpu::pipeline_helpers::{
    comparison_sampler, depth_texture_2d, depth_texture_cube, shadow_sampler,
    uniform_buffer_all,
};
use crate::gpu::surface_set::SurfaceSet;
use crate::options::LightingOptions;
use crate::renderer::frame::{FrameContext, PassKind};
use crate::renderer::scene_pass::{SceneBindings, ScenePipelines};
use crate::scene::Drawable;

/// A light source. Each variant carries only the fields it uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Light {
    /// Uniform light scaled by each surface's ambient color.
    Ambient {
        /// Linear RGB color.
        color: Vec3,
        /// Intensity multiplier.
        intensity: f32,
    },
    /// Omnidirectional light with inverse-square falloff.
    Point {
        /// World position.
        position: Vec3,
        /// Linear RGB color.
        color: Vec3,
        /// Intensity multiplier.
        intensity: f32,
    },
    /// Parallel light. The position only places the shadow camera.
    Directional {
        /// Shadow camera position.
        position: Vec3,
        /// Normalized travel direction.
        direction: Vec3,
        /// Linear RGB color.
        color: Vec3,
        /// Intensity multiplier.
        intensity: f32,
    },
    /// Cone light with a smooth edge between the two cutoffs.
    Spot {
        /// World position.
        position: Vec3,
        /// Normalized cone axis.
        direction: Vec3,
        /// Linear RGB color.
        color: Vec3,
        /// Intensity multiplier.
        intensity: f32,
        /// Cosine of the inner cone half-angle.
        cut_off: f32,
        /// Cosine of the outer cone half-angle.
        outer_cut_off: f32,
    },
}

impl Light {
    /// Tag matching the `LIGHT_*` constants in WGSL.
    pub fn type_tag(&self) -> i32 {
        match self {
            Self::Ambient { .. } => 0,
            Self::Point { .. } => 1,
            Self::Directional { .. } => 2,
            Self::Spot { .. } => 3,
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ambient { .. } => "ambient",
            Self::Point { .. } => "point",
            Self::Directional { .. } => "directional",
            Self::Spot { .. } => "spot",
        }
    }

    /// Linear RGB color.
    pub fn color(&self) -> Vec3 {
        match *self {
            Self::Ambient { color, .. }
            | Self::Point { color, .. }
            | Self::Directional { color, .. }
            | Self::Spot { color, .. } => color,
        }
    }

    /// Intensity multiplier.
    pub fn intensity(&self) -> f32 {
        match *self {
            Self::Ambient { intensity, .. }
            | Self::Point { intensity, .. }
            | Self::Directional { intensity, .. }
            | Self::Spot { intensity, .. } => intensity,
        }
    }

    /// World position, for variants that have one.
    pub fn position(&self) -> Option<Vec3> {
        match *self {
            Self::Ambient { .. } => None,
            Self::Point { position, .. }
            | Self::Directional { position, .. }
            | Self::Spot { position, .. } => Some(position),
        }
    }

    /// Direction, for variants that have one.
    pub fn direction(&self) -> Option<Vec3> {
        match *self {
            Self::Ambient { .. } | Self::Point { .. } => None,
            Self::Directional { direction, .. }
            | Self::Spot { direction, .. } => Some(direction),
        }
    }

    /// Shape of the shadow map this light renders, if any.
    pub fn shadow_kind(&self) -> Option<ShadowKind> {
        match self {
            Self::Ambient { .. } => None,
            Self::Point { .. } => Some(ShadowKind::Cube),
            Self::Directional { .. } | Self::Spot { .. } => {
                Some(ShadowKind::Projected)
            }
        }
    }

    /// Depth bias for shadow comparisons. Orthographic depth is linear and
    /// needs a larger bias than perspective depth.
    pub fn shadow_bias(&self) -> f32 {
        match self {
            Self::Directional { .. } => 0.005,
            _ => 0.001,
        }
    }
}

/// Light-space transform(s) of one light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightSpace {
    /// Ambient lights are not rendered from.
    None,
    /// One matrix (directional and spot).
    Projected(Mat4),
    /// One matrix per cube face (point).
    Cube([Mat4; 6]),
}

impl LightSpace {
    /// The matrix stored in the light's uniform (first face for cubes).
    pub fn primary(&self) -> Mat4 {
        match self {
            Self::None => Mat4::IDENTITY,
            Self::Projected(m) => *m,
            Self::Cube(faces) => faces[0],
        }
    }

    /// Matrices in face order.
    pub fn faces(&self) -> &[Mat4] {
        match self {
            Self::None => &[],
            Self::Projected(m) => std::slice::from_ref(m),
            Self::Cube(faces) => faces,
        }
    }
}

/// Light-space transform of `light` for shadow planes `near`/`far`.
pub fn compute_light_space(light: &Light, near: f32, far: f32) -> LightSpace {
    match *light {
        Light::Ambient { .. } => LightSpace::None,
        Light::Directional {
            position,
            direction,
            ..
        } => LightSpace::Projected(light_space::directional(
            position, direction, near, far,
        )),
        Light::Spot {
            position,
            direction,
            outer_cut_off,
            ..
        } => LightSpace::Projected(light_space::spot(
            position,
            direction,
            outer_cut_off,
            near,
            far,
        )),
        Light::Point { position, .. } => {
            LightSpace::Cube(light_space::point_faces(position, near, far))
        }
    }
}

/// One registered light and the GPU resources it owns.
pub struct LightRecord {
    /// The light.
    pub light: Light,
    light_space: LightSpace,
    shadow: Option<ShadowMap>,
    uniform: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl LightRecord {
    /// Light-space transform computed by the last [`Lights::update`].
    pub fn light_space(&self) -> &LightSpace {
        &self.light_space
    }

    /// The light's shadow map, if it has one.
    pub fn shadow(&self) -> Option<&ShadowMap> {
        self.shadow.as_ref()
    }
}

/// 1×1 depth surfaces bound in place of a missing shadow map.
struct FallbackShadows {
    projected: SurfaceSet,
    cube: SurfaceSet,
}

impl FallbackShadows {
    fn new(device: &wgpu::Device) -> Result<Self, PipelineError> {
        Ok(Self {
            projected: SurfaceSet::create(
                device,
                shadow::shadow_layout("Fallback Shadow", ShadowKind::Projected, 1),
            )?,
            cube: SurfaceSet::create(
                device,
                shadow::shadow_layout("Fallback Shadow Cube", ShadowKind::Cube, 1),
            )?,
        })
    }
}

fn depth_view(surface: &SurfaceSet) -> Result<&wgpu::TextureView, PipelineError> {
    surface
        .depth()
        .map(|d| &d.view)
        .ok_or_else(|| PipelineError::IncompleteSurface {
            label: surface.layout().label.clone(),
            reason: "missing depth attachment".to_owned(),
        })
}

/// The light collection.
pub struct Lights {
    records: Vec<LightRecord>,
    lights_buffer: wgpu::Buffer,
    face_layout: wgpu::BindGroupLayout,
    light_layout: wgpu::BindGroupLayout,
    sampler: wgpu::Sampler,
    fallback: FallbackShadows,
    near: f32,
    far: f32,
    resolution: u32,
}

impl Lights {
    /// Empty collection with shadow planes and resolution from `options`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the fallback shadow
    /// surfaces cannot be created.
    pub fn new(
        device: &wgpu::Device,
        options: &LightingOptions,
    ) -> Result<Self, PipelineError> {
        let options = options.clamped();
        let lights_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Lights Uniform Buffer"),
                contents: bytemuck::bytes_of(&LightsUniform::new(&[])),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let face_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Shadow Face Layout"),
                entries: &[uniform_buffer_all(0)],
            });
        let light_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Shadowed Light Layout"),
                entries: &[
                    uniform_buffer_all(0),
                    depth_texture_2d(1),
                    depth_texture_cube(2),
                    comparison_sampler(3),
                ],
            });
        Ok(Self {
            records: Vec::new(),
            lights_buffer,
            face_layout,
            light_layout,
            sampler: shadow_sampler(device, "Shadow Sampler"),
            fallback: FallbackShadows::new(device)?,
            near: options.shadow_near,
            far: options.shadow_far,
            resolution: options.shadow_resolution,
        })
    }

    /// Add an ambient light. Ambient lights own no shadow map.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightLimit`] when the collection is full.
    pub fn add_ambient_light(
        &mut self,
        device: &wgpu::Device,
        color: Vec3,
        intensity: f32,
    ) -> Result<usize, PipelineError> {
        self.add(device, Light::Ambient { color, intensity })
    }

    /// Add a point light with a cube shadow map.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightLimit`] when the collection is full.
    pub fn add_point_light(
        &mut self,
        device: &wgpu::Device,
        position: Vec3,
        color: Vec3,
        intensity: f32,
    ) -> Result<usize, PipelineError> {
        self.add(
            device,
            Light::Point {
                position,
                color,
                intensity,
            },
        )
    }

    /// Add a directional light placed at `position` and aimed at `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightLimit`] when the collection is full.
    pub fn add_directional_light(
        &mut self,
        device: &wgpu::Device,
        position: Vec3,
        target: Vec3,
        color: Vec3,
        intensity: f32,
    ) -> Result<usize, PipelineError> {
        self.add(
            device,
            Light::Directional {
                position,
                direction: (target - position).normalize_or(Vec3::NEG_Y),
                color,
                intensity,
            },
        )
    }

    /// Add a spotlight. `cut_off` and `outer_cut_off` are cosines of the
    /// inner and outer cone half-angles.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightLimit`] when the collection is full.
    pub fn add_spotlight(
        &mut self,
        device: &wgpu::Device,
        position: Vec3,
        direction: Vec3,
        color: Vec3,
        intensity: f32,
        cut_off: f32,
        outer_cut_off: f32,
    ) -> Result<usize, PipelineError> {
        self.add(
            device,
            Light::Spot {
                position,
                direction: direction.normalize_or(Vec3::NEG_Y),
                color,
                intensity,
                cut_off,
                outer_cut_off,
            },
        )
    }

    fn add(
        &mut self,
        device: &wgpu::Device,
        light: Light,
    ) -> Result<usize, PipelineError> {
        if self.records.len() >= MAX_LIGHTS {
            return Err(PipelineError::LightLimit(MAX_LIGHTS));
        }
        let index = self.records.len();
        let shadow = self.create_shadow(device, &light, index);
        let light_space = compute_light_space(&light, self.near, self.far);
        let shadow_params = self.shadow_params(&light, &light_space, shadow.is_some());
        let uniform =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("Light {index} Uniform")),
                contents: bytemuck::bytes_of(&LightUniform::new(
                    &light,
                    &shadow_params,
                )),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let bind_group =
            self.light_bind_group(device, index, &uniform, shadow.as_ref())?;
        log::info!(
            "Added {} light {index}{}",
            light.name(),
            if shadow.is_some() { " with shadow map" } else { "" }
        );
        self.records.push(LightRecord {
            light,
            light_space,
            shadow,
            uniform,
            bind_group,
        });
        Ok(index)
    }

    /// Shadow map for `light`, or `None` for ambient lights and for
    /// surfaces the device rejects (the light is then lit unshadowed).
    fn create_shadow(
        &self,
        device: &wgpu::Device,
        light: &Light,
        index: usize,
    ) -> Option<ShadowMap> {
        let kind = light.shadow_kind()?;
        match ShadowMap::new(
            device,
            &self.face_layout,
            &format!("Light {index} Shadow"),
            kind,
            self.resolution,
        ) {
            Ok(map) => Some(map),
            Err(e) => {
                log::warn!(
                    "Light {index} falls back to unshadowed lighting: {e}"
                );
                None
            }
        }
    }

    fn light_bind_group(
        &self,
        device: &wgpu::Device,
        index: usize,
        uniform: &wgpu::Buffer,
        shadow: Option<&ShadowMap>,
    ) -> Result<wgpu::BindGroup, PipelineError> {
        let fallback_2d = depth_view(&self.fallback.projected)?;
        let fallback_cube = depth_view(&self.fallback.cube)?;
        let own = shadow.and_then(|s| s.view().map(|v| (s.kind(), v)));
        let (projected, cube) = match own {
            Some((ShadowKind::Projected, view)) => (view, fallback_cube),
            Some((ShadowKind::Cube, view)) => (fallback_2d, view),
            None => (fallback_2d, fallback_cube),
        };
        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Light {index} Bind Group")),
            layout: &self.light_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(projected),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(cube),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }))
    }

    fn shadow_params(
        &self,
        light: &Light,
        light_space: &LightSpace,
        has_shadow: bool,
    ) -> ShadowParams {
        ShadowParams {
            light_space: light_space.primary(),
            has_shadow,
            near: self.near,
            far: self.far,
            bias: light.shadow_bias(),
        }
    }

    fn record_mut(&mut self, index: usize) -> Result<&mut LightRecord, PipelineError> {
        self.records
            .get_mut(index)
            .ok_or(PipelineError::LightIndex(index))
    }

    /// The light at `index`.
    pub fn get(&self, index: usize) -> Option<&Light> {
        self.records.get(index).map(|r| &r.light)
    }

    /// The record at `index`.
    pub fn record(&self, index: usize) -> Option<&LightRecord> {
        self.records.get(index)
    }

    /// Number of lights.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no light has been added.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Move a light. Ambient lights have no position and are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightIndex`] if `index` is out of range.
    pub fn set_position(
        &mut self,
        index: usize,
        new_position: Vec3,
    ) -> Result<(), PipelineError> {
        match &mut self.record_mut(index)?.light {
            Light::Ambient { .. } => {}
            Light::Point { position, .. }
            | Light::Directional { position, .. }
            | Light::Spot { position, .. } => *position = new_position,
        }
        Ok(())
    }

    /// Change a light's intensity.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightIndex`] if `index` is out of range.
    pub fn set_intensity(
        &mut self,
        index: usize,
        value: f32,
    ) -> Result<(), PipelineError> {
        match &mut self.record_mut(index)?.light {
            Light::Ambient { intensity, .. }
            | Light::Point { intensity, .. }
            | Light::Directional { intensity, .. }
            | Light::Spot { intensity, .. } => *intensity = value,
        }
        Ok(())
    }

    /// Change a light's color.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightIndex`] if `index` is out of range.
    pub fn set_color(
        &mut self,
        index: usize,
        value: Vec3,
    ) -> Result<(), PipelineError> {
        match &mut self.record_mut(index)?.light {
            Light::Ambient { color, .. }
            | Light::Point { color, .. }
            | Light::Directional { color, .. }
            | Light::Spot { color, .. } => *color = value,
        }
        Ok(())
    }

    /// Re-aim a directional light or spotlight. Other variants are
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightIndex`] if `index` is out of range.
    pub fn set_direction(
        &mut self,
        index: usize,
        value: Vec3,
    ) -> Result<(), PipelineError> {
        match &mut self.record_mut(index)?.light {
            Light::Directional { direction, .. }
            | Light::Spot { direction, .. } => {
                *direction = value.normalize_or(*direction);
            }
            Light::Ambient { .. } | Light::Point { .. } => {}
        }
        Ok(())
    }

    /// Change a spotlight's cone cosines. Other variants are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightIndex`] if `index` is out of range.
    pub fn set_cutoffs(
        &mut self,
        index: usize,
        inner: f32,
        outer: f32,
    ) -> Result<(), PipelineError> {
        if let Light::Spot {
            cut_off,
            outer_cut_off,
            ..
        } = &mut self.record_mut(index)?.light
        {
            *cut_off = inner;
            *outer_cut_off = outer;
        }
        Ok(())
    }

    /// Set the shadow projection planes used from the next update on.
    pub fn set_shadow_planes(&mut self, near: f32, far: f32) {
        self.near = near.max(0.001);
        self.far = far.max(self.near + 0.001);
    }

    /// Reallocate every shadow map at `resolution`. Lights whose new map
    /// cannot be created fall back to unshadowed lighting.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if a fallback shadow
    /// view is missing while rebuilding bind groups.
    pub fn set_shadow_resolution(
        &mut self,
        device: &wgpu::Device,
        resolution: u32,
    ) -> Result<(), PipelineError> {
        if resolution == self.resolution {
            return Ok(());
        }
        log::info!(
            "Shadow resolution {} -> {resolution}",
            self.resolution
        );
        self.resolution = resolution;
        for index in 0..self.records.len() {
            let light = self.records[index].light;
            let shadow = self.create_shadow(device, &light, index);
            let bind_group = self.light_bind_group(
                device,
                index,
                &self.records[index].uniform,
                shadow.as_ref(),
            )?;
            let record = &mut self.records[index];
            record.shadow = shadow;
            record.bind_group = bind_group;
        }
        Ok(())
    }

    /// Indices of lights that render a shadow map.
    pub fn shadow_casters(&self) -> Vec<usize> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.shadow.is_some())
            .map(|(i, _)| i)
            .collect()
    }

    /// Recompute every light-space transform and upload the light list and
    /// shadow face matrices. Runs once per frame before any pass.
    pub fn update(&mut self, queue: &wgpu::Queue) {
        let (near, far) = (self.near, self.far);
        let mut uniforms = Vec::with_capacity(self.records.len());
        for record in &mut self.records {
            record.light_space = compute_light_space(&record.light, near, far);
            if let Some(shadow) = &record.shadow {
                shadow.write_faces(queue, record.light_space.faces());
            }
        }
        for record in &self.records {
            uniforms.push(LightUniform::new(
                &record.light,
                &self.shadow_params(
                    &record.light,
                    &record.light_space,
                    record.shadow.is_some(),
                ),
            ));
        }
        queue.write_buffer(
            &self.lights_buffer,
            0,
            bytemuck::bytes_of(&LightsUniform::new(&uniforms)),
        );
    }

    /// Render the shadow map of light `index` from every shadow caster.
    /// Lights without a shadow map record nothing.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightIndex`] if `index` is out of range.
    pub fn render_shadow_map(
        &self,
        frame: &mut FrameContext<'_>,
        index: usize,
        pipelines: &ScenePipelines,
        bindings: &SceneBindings,
        drawables: &[&dyn Drawable],
    ) -> Result<(), PipelineError> {
        let record = self
            .records
            .get(index)
            .ok_or(PipelineError::LightIndex(index))?;
        if let Some(shadow) = &record.shadow {
            let pipeline = match shadow.kind() {
                ShadowKind::Projected => &pipelines.shadow_projected,
                ShadowKind::Cube => &pipelines.shadow_cube,
            };
            shadow.render(frame, pipeline, bindings, drawables);
            frame.record(PassKind::ShadowDepth { light: index });
        }
        Ok(())
    }

    /// Render every shadow map.
    ///
    /// # Errors
    ///
    /// Propagates [`Lights::render_shadow_map`] failures.
    pub fn render_shadow_pass(
        &self,
        frame: &mut FrameContext<'_>,
        pipelines: &ScenePipelines,
        bindings: &SceneBindings,
        drawables: &[&dyn Drawable],
    ) -> Result<(), PipelineError> {
        for index in self.shadow_casters() {
            self.render_shadow_map(frame, index, pipelines, bindings, drawables)?;
        }
        Ok(())
    }

    /// Upload light `index`'s full parameter set and light-space matrix
    /// into its own uniform and return the bind group for the shadowed
    /// lighting shader (group 2).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::LightIndex`] if `index` is out of range.
    pub fn bind_for_lighting(
        &self,
        queue: &wgpu::Queue,
        index: usize,
    ) -> Result<&wgpu::BindGroup, PipelineError> {
        let record = self
            .records
            .get(index)
            .ok_or(PipelineError::LightIndex(index))?;
        let params = self.shadow_params(
            &record.light,
            &record.light_space,
            record.shadow.is_some(),
        );
        queue.write_buffer(
            &record.uniform,
            0,
            bytemuck::bytes_of(&LightUniform::new(&record.light, &params)),
        );
        Ok(&record.bind_group)
    }

    /// Buffer holding [`LightsUniform`], bound by the forward and deferred
    /// lighting shaders.
    pub fn uniform_buffer(&self) -> &wgpu::Buffer {
        &self.lights_buffer
    }

    /// Layout of one shadow face's matrix uniform.
    pub fn face_layout(&self) -> &wgpu::BindGroupLayout {
        &self.face_layout
    }

    /// Layout of a light's shadowed-lighting bind group.
    pub fn light_layout(&self) -> &wgpu::BindGroupLayout {
        &self.light_layout
    }

    /// Log one line per light.
    pub fn log_summary(&self) {
        log::debug!(
            "{} lights, shadow planes {}..{}, resolution {}",
            self.records.len(),
            self.near,
            self.far,
            self.resolution
        );
        for (i, record) in self.records.iter().enumerate() {
            let light = &record.light;
            log::debug!(
                "  [{i}] {} color={} intensity={} position={:?} direction={:?} shadow={}",
                light.name(),
                light.color(),
                light.intensity(),
                light.position(),
                light.direction(),
                record.shadow.is_some()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spot() -> Light {
        Light::Spot {
            position: Vec3::new(5.0, 5.0, 5.0),
            direction: Vec3::new(-1.0, -1.0, -1.0).normalize(),
            color: Vec3::ONE,
            intensity: 40.0,
            cut_off: 12.5f32.to_radians().cos(),
            outer_cut_off: 30f32.to_radians().cos(),
        }
    }

    #[test]
    fn type_tags_match_wgsl_constants() {
        let point = Light::Point {
            position: Vec3::ZERO,
            color: Vec3::ONE,
            intensity: 1.0,
        };
        let ambient = Light::Ambient {
            color: Vec3::ONE,
            intensity: 1.0,
        };
        assert_eq!(ambient.type_tag(), 0);
        assert_eq!(point.type_tag(), 1);
        assert_eq!(spot().type_tag(), 3);
    }

    #[test]
    fn only_ambient_lights_skip_shadows() {
        let ambient = Light::Ambient {
            color: Vec3::ONE,
            intensity: 0.1,
        };
        assert_eq!(ambient.shadow_kind(), None);
        assert_eq!(spot().shadow_kind(), Some(ShadowKind::Projected));
        assert_eq!(
            Light::Point {
                position: Vec3::ZERO,
                color: Vec3::ONE,
                intensity: 1.0,
            }
            .shadow_kind(),
            Some(ShadowKind::Cube)
        );
    }

    #[test]
    fn light_space_shapes() {
        let ambient = Light::Ambient {
            color: Vec3::ONE,
            intensity: 0.1,
        };
        assert_eq!(compute_light_space(&ambient, 1.0, 25.0).faces().len(), 0);
        assert_eq!(compute_light_space(&spot(), 1.0, 25.0).faces().len(), 1);
        let point = Light::Point {
            position: Vec3::new(-5.0, 5.0, 0.0),
            color: Vec3::ONE,
            intensity: 10.0,
        };
        let space = compute_light_space(&point, 1.0, 25.0);
        assert_eq!(space.faces().len(), 6);
        assert_eq!(space.primary(), space.faces()[0]);
    }

    #[test]
    fn spot_light_space_centers_its_axis() {
        let light = spot();
        let space = compute_light_space(&light, 1.0, 25.0).primary();
        let on_axis = light.position().unwrap_or_default()
            + light.direction().unwrap_or_default() * 5.0;
        let ndc = space.project_point3(on_axis);
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
    }
}
