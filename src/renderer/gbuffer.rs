//! The G-Buffer and the full-screen deferred lighting pass.
//!
//! Attachment order is fixed: it is the `@location` order of the geometry
//! shader and the binding order of the lighting shader.

use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::gpu::pipeline_helpers::{
    create_scene_pipeline, create_screen_space_pipeline, depth_texture_2d,
    texture_2d, texture_2d_unfilterable, uniform_buffer, ScenePipelineDesc,
    ScreenSpacePipelineDef,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::gpu::surface_set::{AttachmentDesc, SurfaceLayout, SurfaceSet};
use crate::renderer::frame::{FrameContext, PassKind};
use crate::renderer::lights::Lights;
use crate::renderer::scene_pass::{SceneBindings, DEPTH_FORMAT};
use crate::renderer::screen_pass::ScreenPass;
use crate::renderer::ssao::Ssao;
use crate::scene::Vertex;

/// Color formats in location order: position, normal, albedo+metallic,
/// specular+roughness, fresnel+occlusion, ambient+brightness.
pub const GBUFFER_FORMATS: [wgpu::TextureFormat; 6] = [
    wgpu::TextureFormat::Rgba32Float,
    wgpu::TextureFormat::Rgba32Float,
    wgpu::TextureFormat::Rgba8Unorm,
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgba16Float,
    wgpu::TextureFormat::Rgba16Float,
];

/// Attachment labels in location order.
pub const GBUFFER_LABELS: [&str; 6] = [
    "position",
    "normal",
    "albedo_metallic",
    "specular_roughness",
    "fresnel_occlusion",
    "ambient_brightness",
];

/// Six color attachments plus depth at `width`×`height`.
pub fn gbuffer_layout(width: u32, height: u32) -> SurfaceLayout {
    let mut attachments: Vec<AttachmentDesc> = GBUFFER_LABELS
        .iter()
        .zip(GBUFFER_FORMATS)
        .enumerate()
        .map(|(location, (label, format))| {
            AttachmentDesc::color(label, location as u32, format)
        })
        .collect();
    attachments.push(AttachmentDesc::depth("depth", DEPTH_FORMAT));
    SurfaceLayout::new("G-Buffer", width, height, attachments)
}

/// `DeferredParams` in the lighting shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DeferredParams {
    /// Camera world position.
    pub view_pos: [f32; 3],
    /// Strength of SSAO on ambient light, `[0, 1]`.
    pub ao_slider: f32,
}

/// Owner of the G-Buffer surface, the geometry pipeline that fills it and
/// the deferred lighting pipelines that read it.
pub struct GBuffer {
    surface: SurfaceSet,
    geometry_pipeline: wgpu::RenderPipeline,
    texture_layout: wgpu::BindGroupLayout,
    ssao_texture_layout: wgpu::BindGroupLayout,
    uniform_layout: wgpu::BindGroupLayout,
    lighting_pipeline: wgpu::RenderPipeline,
    lighting_ssao_pipeline: wgpu::RenderPipeline,
    params_buffer: wgpu::Buffer,
    texture_bind_group: wgpu::BindGroup,
    /// Texture group with the blurred AO at binding 7, and the AO view it
    /// was built from. Dropped whenever the G-Buffer is reallocated.
    occlusion: Option<(wgpu::TextureView, wgpu::BindGroup)>,
}

fn texture_entries(with_ssao: bool) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = vec![
        texture_2d_unfilterable(0),
        texture_2d_unfilterable(1),
        texture_2d(2),
        texture_2d_unfilterable(3),
        texture_2d_unfilterable(4),
        texture_2d_unfilterable(5),
        depth_texture_2d(6),
    ];
    if with_ssao {
        entries.push(texture_2d(7));
    }
    entries
}

impl GBuffer {
    /// Allocate the G-Buffer and build the geometry pipeline and both
    /// lighting pipelines. `output_format` is the default target's color
    /// format.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the device cannot
    /// hold the attachments (typically the bytes-per-sample limit), or
    /// [`PipelineError::ShaderCompose`] if a shader fails.
    pub fn create(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        bindings: &SceneBindings,
        output_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, PipelineError> {
        let surface = SurfaceSet::create(device, gbuffer_layout(width, height))?;

        let geometry_shader = composer.compose(device, Shader::GBuffer)?;
        let geometry_pipeline = create_scene_pipeline(
            device,
            &ScenePipelineDesc {
                label: "G-Buffer Geometry",
                shader: &geometry_shader,
                bind_group_layouts: &[
                    bindings.frame_layout(),
                    bindings.object_layout(),
                ],
                vertex_buffers: &[Vertex::layout()],
                color_formats: &GBUFFER_FORMATS,
                blend: None,
                depth: Some((DEPTH_FORMAT, wgpu::CompareFunction::Less)),
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
            },
        );

        let texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("G-Buffer Texture Layout"),
                entries: &texture_entries(false),
            });
        let ssao_texture_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("G-Buffer Texture Layout (SSAO)"),
                entries: &texture_entries(true),
            });
        let uniform_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Deferred Lighting Uniform Layout"),
                entries: &[uniform_buffer(0), uniform_buffer(1)],
            });

        let plain_shader = composer.compose(device, Shader::DeferredLighting)?;
        let lighting_pipeline = create_screen_space_pipeline(
            device,
            &ScreenSpacePipelineDef {
                label: "Deferred Lighting",
                shader: &plain_shader,
                formats: &[output_format],
                blend: None,
                bind_group_layouts: &[&texture_layout, &uniform_layout],
            },
        );
        let ssao_shader =
            composer.compose(device, Shader::DeferredLightingSsao)?;
        let lighting_ssao_pipeline = create_screen_space_pipeline(
            device,
            &ScreenSpacePipelineDef {
                label: "Deferred Lighting (SSAO)",
                shader: &ssao_shader,
                formats: &[output_format],
                blend: None,
                bind_group_layouts: &[&ssao_texture_layout, &uniform_layout],
            },
        );

        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Deferred Params Buffer"),
                contents: bytemuck::bytes_of(&DeferredParams {
                    view_pos: [0.0; 3],
                    ao_slider: 0.0,
                }),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });

        let texture_bind_group = Self::create_texture_bind_group(
            device,
            &texture_layout,
            &surface,
            None,
        )?;
        log::info!("G-Buffer created ({width}x{height})");

        Ok(Self {
            surface,
            geometry_pipeline,
            texture_layout,
            ssao_texture_layout,
            uniform_layout,
            lighting_pipeline,
            lighting_ssao_pipeline,
            params_buffer,
            texture_bind_group,
            occlusion: None,
        })
    }

    /// Bind group over the seven G-Buffer textures, plus the blurred AO at
    /// binding 7 when `ssao` is given.
    fn create_texture_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        surface: &SurfaceSet,
        ssao: Option<&wgpu::TextureView>,
    ) -> Result<wgpu::BindGroup, PipelineError> {
        let missing = |what: &str| PipelineError::IncompleteSurface {
            label: surface.layout().label.clone(),
            reason: format!("missing {what} attachment"),
        };
        let mut views = Vec::with_capacity(8);
        for location in 0..GBUFFER_FORMATS.len() as u32 {
            let attachment = surface
                .color(location)
                .ok_or_else(|| missing(GBUFFER_LABELS[location as usize]))?;
            views.push(&attachment.view);
        }
        views.push(&surface.depth().ok_or_else(|| missing("depth"))?.view);
        if let Some(ssao) = ssao {
            views.push(ssao);
        }
        let entries: Vec<wgpu::BindGroupEntry<'_>> = views
            .into_iter()
            .enumerate()
            .map(|(binding, view)| wgpu::BindGroupEntry {
                binding: binding as u32,
                resource: wgpu::BindingResource::TextureView(view),
            })
            .collect();
        Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("G-Buffer Texture Bind Group"),
            layout,
            entries: &entries,
        }))
    }

    /// Begin the geometry pass on the G-Buffer with the geometry pipeline
    /// set, clearing every color attachment and depth. The pass ends (and
    /// the default target is the next pass's business again) when it is
    /// dropped.
    pub fn bind_for_writing<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
    ) -> wgpu::RenderPass<'e> {
        let colors = self
            .surface
            .color_attachments(wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT));
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("G-Buffer Geometry Pass"),
            color_attachments: &colors,
            depth_stencil_attachment: self.surface.depth_attachment(0, Some(1.0)),
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.geometry_pipeline);
        pass
    }

    /// Build the texture group that adds the blurred AO of `ssao` at
    /// binding 7. Call again after either the G-Buffer or `ssao` is
    /// resized.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if an attachment of
    /// either surface is missing.
    pub fn connect_occlusion(
        &mut self,
        device: &wgpu::Device,
        ssao: &Ssao,
    ) -> Result<(), PipelineError> {
        let view = ssao.blurred_view()?.clone();
        let group = Self::create_texture_bind_group(
            device,
            &self.ssao_texture_layout,
            &self.surface,
            Some(&view),
        )?;
        self.occlusion = Some((view, group));
        Ok(())
    }

    /// Whether a bind group for the current AO view of `ssao` is cached.
    pub fn is_connected_to(&self, ssao: &Ssao) -> bool {
        match (&self.occlusion, ssao.blurred_view()) {
            (Some((view, _)), Ok(current)) => view == current,
            _ => false,
        }
    }

    fn uniform_bind_group(
        &self,
        device: &wgpu::Device,
        lights: &Lights,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Deferred Lighting Uniform Bind Group"),
            layout: &self.uniform_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: lights.uniform_buffer().as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        })
    }

    fn write_params(&self, queue: &wgpu::Queue, camera: &Camera, ao_strength: f32) {
        queue.write_buffer(
            &self.params_buffer,
            0,
            bytemuck::bytes_of(&DeferredParams {
                view_pos: camera.eye.to_array(),
                ao_slider: ao_strength.clamp(0.0, 1.0),
            }),
        );
    }

    /// Light the default target from the G-Buffer without occlusion.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the default depth
    /// surface is unusable.
    pub fn resolve_lighting(
        &self,
        frame: &mut FrameContext<'_>,
        lights: &Lights,
        camera: &Camera,
        ao_strength: f32,
    ) -> Result<(), PipelineError> {
        self.write_params(frame.queue, camera, ao_strength);
        let uniforms = self.uniform_bind_group(frame.device, lights);
        self.draw_lighting(
            frame,
            &self.lighting_pipeline,
            &self.texture_bind_group,
            &uniforms,
        )?;
        frame.record(PassKind::DeferredLighting { ssao: false });
        Ok(())
    }

    /// Light the default target from the G-Buffer with the blurred AO of
    /// `ssao` bound at binding 7. `ssao` must have been connected with
    /// [`GBuffer::connect_occlusion`] since either surface was last
    /// allocated.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the cached group
    /// does not match the current AO view of `ssao`.
    pub fn resolve_lighting_with_ssao(
        &self,
        frame: &mut FrameContext<'_>,
        lights: &Lights,
        camera: &Camera,
        ao_strength: f32,
        ssao: &Ssao,
    ) -> Result<(), PipelineError> {
        let textures = match &self.occlusion {
            Some((_, group)) if self.is_connected_to(ssao) => group,
            _ => {
                return Err(PipelineError::IncompleteSurface {
                    label: self.surface.layout().label.clone(),
                    reason: "occlusion input is not connected".to_owned(),
                })
            }
        };
        self.write_params(frame.queue, camera, ao_strength);
        let uniforms = self.uniform_bind_group(frame.device, lights);
        self.draw_lighting(
            frame,
            &self.lighting_ssao_pipeline,
            textures,
            &uniforms,
        )?;
        frame.record(PassKind::DeferredLighting { ssao: true });
        Ok(())
    }

    /// Clear the default target and draw the full-screen lighting triangle.
    /// Depth is not attached; the depth blit fills it afterwards.
    fn draw_lighting(
        &self,
        frame: &mut FrameContext<'_>,
        pipeline: &wgpu::RenderPipeline,
        textures: &wgpu::BindGroup,
        uniforms: &wgpu::BindGroup,
    ) -> Result<(), PipelineError> {
        let mut pass = frame.default_pass("Deferred Lighting Pass", true, false)?;
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, textures, &[]);
        pass.set_bind_group(1, uniforms, &[]);
        pass.draw(0..3, 0..1);
        Ok(())
    }

    /// Copy G-Buffer depth into the default depth surface.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if either depth
    /// attachment is missing or the extents differ.
    pub fn blit_depth(&self, frame: &mut FrameContext<'_>) -> Result<(), PipelineError> {
        let src = self.surface.depth().ok_or_else(|| {
            PipelineError::IncompleteSurface {
                label: self.surface.layout().label.clone(),
                reason: "missing depth attachment".to_owned(),
            }
        })?;
        let dst = frame.target.depth_attachment()?;
        let (width, height) = self.surface.size();
        if frame.target.depth.size() != (width, height) {
            return Err(PipelineError::IncompleteSurface {
                label: frame.target.depth.layout().label.clone(),
                reason: "extent differs from the G-Buffer".to_owned(),
            });
        }
        frame.encoder.copy_texture_to_texture(
            src.texture.as_image_copy(),
            dst.texture.as_image_copy(),
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        frame.record(PassKind::DepthBlit);
        Ok(())
    }

    /// The G-Buffer surface.
    pub fn surface(&self) -> &SurfaceSet {
        &self.surface
    }

    /// View of attachment `location`.
    pub fn color_view(&self, location: u32) -> Option<&wgpu::TextureView> {
        self.surface.color(location).map(|a| &a.view)
    }
}

impl ScreenPass for GBuffer {
    fn label(&self) -> &'static str {
        "G-Buffer"
    }

    fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        self.surface.resize(device, width, height)?;
        self.occlusion = None;
        self.texture_bind_group = Self::create_texture_bind_group(
            device,
            &self.texture_layout,
            &self.surface,
            None,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_has_six_colors_and_depth() {
        let layout = gbuffer_layout(800, 600);
        assert_eq!(layout.color_count(), 6);
        assert_eq!(layout.attachments.len(), 7);
        assert_eq!(layout.attachments[6].format, DEPTH_FORMAT);
        assert_eq!(layout.attachments[2].format, wgpu::TextureFormat::Rgba8Unorm);
    }

    #[test]
    fn layout_needs_raised_sample_limit() {
        let layout = gbuffer_layout(800, 600);
        assert_eq!(layout.color_bytes_per_sample(), 64);
        assert!(layout
            .validate(&wgpu::Limits::default(), |f| {
                f.guaranteed_format_features(wgpu::Features::empty())
            })
            .is_err());
        let limits = wgpu::Limits {
            max_color_attachment_bytes_per_sample: 64,
            ..wgpu::Limits::default()
        };
        assert!(layout
            .validate(&limits, |f| {
                f.guaranteed_format_features(wgpu::Features::empty())
            })
            .is_ok());
    }

    #[test]
    fn deferred_params_are_16_bytes() {
        assert_eq!(std::mem::size_of::<DeferredParams>(), 16);
    }
}
