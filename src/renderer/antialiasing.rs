//! Antialiasing resolve for the forward path.
//!
//! Forward geometry is redirected into the resolver's current-color and
//! depth attachments. The resolve pass then writes the default target and,
//! through a second color output, the resolved attachment that becomes the
//! next frame's history.

use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, depth_texture_2d, filtering_sampler,
    linear_sampler, texture_2d, uniform_buffer, ScreenSpacePipelineDef,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::gpu::surface_set::{AttachmentDesc, SurfaceLayout, SurfaceSet};
use crate::options::{AntialiasingMode, AntialiasingOptions};
use crate::renderer::frame::{FrameContext, PassKind, CLEAR_COLOR};
use crate::renderer::scene_pass::DEPTH_FORMAT;
use crate::renderer::screen_pass::ScreenPass;

const CURRENT: u32 = 0;
const HISTORY: u32 = 1;
const RESOLVED: u32 = 2;

/// `ResolveParams` in the resolve shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ResolveParams {
    /// `1 / (width, height)`.
    pub inverse_screen_size: [f32; 2],
    /// Weight of the current frame when history is accepted.
    pub base_blend_factor: f32,
    /// Linear depth difference (relative to far) that rejects history.
    pub depth_threshold: f32,
    /// Non-zero once the history attachment holds a resolved frame.
    pub history_valid: u32,
    /// Camera near plane.
    pub near: f32,
    /// Camera far plane.
    pub far: f32,
    pub(crate) _pad: f32,
}

/// Frame-to-frame bookkeeping of the history attachment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HistoryState {
    resolved_frames: u64,
    history_valid: bool,
}

impl HistoryState {
    /// Whether a resolved frame exists to copy into history.
    pub fn has_resolved(&self) -> bool {
        self.resolved_frames > 0
    }

    /// Whether the history attachment may be blended this frame.
    pub fn is_valid(&self) -> bool {
        self.history_valid
    }

    /// Resolved color has been copied into history.
    pub fn history_copied(&mut self) {
        self.history_valid = true;
    }

    /// A resolve pass wrote the resolved attachment.
    pub fn frame_resolved(&mut self) {
        self.resolved_frames = self.resolved_frames.saturating_add(1);
    }

    /// Forget everything (creation, resize, mode change).
    pub fn invalidate(&mut self) {
        *self = Self::default();
    }
}

/// Current, history and resolved color plus depth, all at the output
/// extent.
pub fn antialiasing_layout(
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
) -> SurfaceLayout {
    SurfaceLayout::new(
        "Antialiasing",
        width,
        height,
        vec![
            AttachmentDesc::color("current", CURRENT, format),
            AttachmentDesc::color("history", HISTORY, format),
            AttachmentDesc::color("resolved", RESOLVED, format),
            AttachmentDesc::depth("depth", DEPTH_FORMAT),
        ],
    )
}

/// The antialiasing surface and its temporal and FXAA resolve pipelines.
pub struct AntialiasResolver {
    surface: SurfaceSet,
    options: AntialiasingOptions,
    history: HistoryState,
    layout: wgpu::BindGroupLayout,
    temporal_pipeline: wgpu::RenderPipeline,
    fxaa_pipeline: wgpu::RenderPipeline,
    params_buffer: wgpu::Buffer,
    sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
}

impl AntialiasResolver {
    /// Allocate the surface and build both resolve pipelines. `format` is
    /// the default target's color format.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the surface cannot be
    /// created, or [`PipelineError::ShaderCompose`] if a shader fails.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        options: &AntialiasingOptions,
    ) -> Result<Self, PipelineError> {
        let surface =
            SurfaceSet::create(device, antialiasing_layout(format, width, height))?;

        let layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Antialiasing Bind Group Layout"),
                entries: &[
                    texture_2d(0),
                    texture_2d(1),
                    depth_texture_2d(2),
                    uniform_buffer(3),
                    filtering_sampler(4),
                ],
            });

        // Location 0 is the default target, location 1 the resolved copy.
        let formats = [format, format];
        let temporal_shader = composer.compose(device, Shader::TemporalResolve)?;
        let temporal_pipeline = create_screen_space_pipeline(
            device,
            &ScreenSpacePipelineDef {
                label: "Temporal Resolve",
                shader: &temporal_shader,
                formats: &formats,
                blend: None,
                bind_group_layouts: &[&layout],
            },
        );
        let fxaa_shader = composer.compose(device, Shader::Fxaa)?;
        let fxaa_pipeline = create_screen_space_pipeline(
            device,
            &ScreenSpacePipelineDef {
                label: "FXAA Resolve",
                shader: &fxaa_shader,
                formats: &formats,
                blend: None,
                bind_group_layouts: &[&layout],
            },
        );

        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Resolve Params Buffer"),
                contents: bytemuck::bytes_of(&resolve_params(
                    options, width, height, false, 0.1, 100.0,
                )),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let sampler = linear_sampler(device, "Resolve Sampler");
        let bind_group =
            create_bind_group(device, &layout, &surface, &params_buffer, &sampler)?;

        log::info!(
            "Antialiasing resolver created ({width}x{height}, {:?})",
            options.mode
        );
        Ok(Self {
            surface,
            options: options.clone(),
            history: HistoryState::default(),
            layout,
            temporal_pipeline,
            fxaa_pipeline,
            params_buffer,
            sampler,
            bind_group,
        })
    }

    /// Begin the forward geometry pass on the current-color and depth
    /// attachments, clearing both. History and resolved are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if an attachment is
    /// missing.
    pub fn bind_for_writing<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
    ) -> Result<wgpu::RenderPass<'e>, PipelineError> {
        let current = self.attachment_view(CURRENT)?;
        let depth = self.surface.depth_attachment(0, Some(1.0));
        if depth.is_none() {
            return Err(self.missing("depth"));
        }
        Ok(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Antialiased Forward Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: current,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: depth,
            timestamp_writes: None,
            occlusion_query_set: None,
        }))
    }

    /// Copy the previous resolved color into history. Runs after the color
    /// pass and before [`resolve`](Self::resolve). Before the first resolve
    /// there is nothing to copy and history stays invalid.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if an attachment is
    /// missing.
    pub fn update_history(
        &mut self,
        frame: &mut FrameContext<'_>,
    ) -> Result<(), PipelineError> {
        if self.history.has_resolved() {
            let resolved = self
                .surface
                .color(RESOLVED)
                .ok_or_else(|| self.missing("resolved"))?;
            let history = self
                .surface
                .color(HISTORY)
                .ok_or_else(|| self.missing("history"))?;
            let (width, height) = self.surface.size();
            frame.encoder.copy_texture_to_texture(
                resolved.texture.as_image_copy(),
                history.texture.as_image_copy(),
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
            self.history.history_copied();
        }
        frame.record(PassKind::HistoryUpdate);
        Ok(())
    }

    /// Resolve into the default target (no depth attachment) and into the
    /// resolved attachment.
    pub fn resolve(&mut self, frame: &mut FrameContext<'_>, camera: &Camera) {
        let (width, height) = self.surface.size();
        let params = resolve_params(
            &self.options,
            width,
            height,
            self.history.is_valid(),
            camera.znear,
            camera.zfar,
        );
        frame
            .queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));

        let pipeline = match self.options.mode {
            AntialiasingMode::Fxaa => &self.fxaa_pipeline,
            _ => &self.temporal_pipeline,
        };
        let resolved = self.surface.color(RESOLVED).map(|a| &a.view);
        {
            let mut pass =
                frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Antialiasing Resolve Pass"),
                    color_attachments: &[
                        Some(store_attachment(frame.target.color)),
                        resolved.map(store_attachment),
                    ],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.history.frame_resolved();
        frame.record(PassKind::AntialiasResolve);
    }

    /// Current tunables.
    pub fn options(&self) -> &AntialiasingOptions {
        &self.options
    }

    /// Replace the tunables. A mode change invalidates history.
    pub fn set_options(&mut self, options: &AntialiasingOptions) {
        if options.mode != self.options.mode {
            self.history.invalidate();
        }
        self.options = options.clone();
    }

    /// Drop history; the next resolve shows only the current frame.
    pub fn invalidate_history(&mut self) {
        self.history.invalidate();
    }

    /// History bookkeeping.
    pub fn history(&self) -> HistoryState {
        self.history
    }

    /// The antialiasing surface.
    pub fn surface(&self) -> &SurfaceSet {
        &self.surface
    }

    fn attachment_view(&self, location: u32) -> Result<&wgpu::TextureView, PipelineError> {
        self.surface
            .color(location)
            .map(|a| &a.view)
            .ok_or_else(|| self.missing("color"))
    }

    fn missing(&self, what: &str) -> PipelineError {
        PipelineError::IncompleteSurface {
            label: self.surface.layout().label.clone(),
            reason: format!("missing {what} attachment"),
        }
    }
}

impl ScreenPass for AntialiasResolver {
    fn label(&self) -> &'static str {
        "Antialiasing"
    }

    fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        self.surface.resize(device, width, height)?;
        self.bind_group = create_bind_group(
            device,
            &self.layout,
            &self.surface,
            &self.params_buffer,
            &self.sampler,
        )?;
        self.history.invalidate();
        Ok(())
    }
}

fn store_attachment(view: &wgpu::TextureView) -> wgpu::RenderPassColorAttachment<'_> {
    wgpu::RenderPassColorAttachment {
        view,
        depth_slice: None,
        resolve_target: None,
        ops: wgpu::Operations {
            load: wgpu::LoadOp::Load,
            store: wgpu::StoreOp::Store,
        },
    }
}

fn resolve_params(
    options: &AntialiasingOptions,
    width: u32,
    height: u32,
    history_valid: bool,
    near: f32,
    far: f32,
) -> ResolveParams {
    ResolveParams {
        inverse_screen_size: [1.0 / width.max(1) as f32, 1.0 / height.max(1) as f32],
        base_blend_factor: options.base_blend_factor.clamp(0.0, 1.0),
        depth_threshold: options.depth_threshold.max(0.0),
        history_valid: u32::from(history_valid),
        near,
        far,
        _pad: 0.0,
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    surface: &SurfaceSet,
    params_buffer: &wgpu::Buffer,
    sampler: &wgpu::Sampler,
) -> Result<wgpu::BindGroup, PipelineError> {
    let missing = |what: &str| PipelineError::IncompleteSurface {
        label: surface.layout().label.clone(),
        reason: format!("missing {what} attachment"),
    };
    let current = surface.color(CURRENT).ok_or_else(|| missing("current"))?;
    let history = surface.color(HISTORY).ok_or_else(|| missing("history"))?;
    let depth = surface.depth().ok_or_else(|| missing("depth"))?;
    Ok(device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Antialiasing Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&current.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&history.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&depth.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: params_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_match_wgsl_size() {
        assert_eq!(std::mem::size_of::<ResolveParams>(), 32);
    }

    #[test]
    fn history_needs_a_resolve_then_a_copy() {
        let mut state = HistoryState::default();
        assert!(!state.has_resolved());
        assert!(!state.is_valid());

        state.frame_resolved();
        assert!(state.has_resolved());
        assert!(!state.is_valid());

        state.history_copied();
        assert!(state.is_valid());

        state.invalidate();
        assert_eq!(state, HistoryState::default());
    }

    #[test]
    fn layout_holds_three_colors_and_depth() {
        let layout =
            antialiasing_layout(wgpu::TextureFormat::Rgba8UnormSrgb, 640, 480);
        assert_eq!(layout.color_count(), 3);
        assert_eq!(layout.attachments.len(), 4);
        assert_eq!(layout.attachments[3].format, DEPTH_FORMAT);
    }

    #[test]
    fn params_clamp_tunables() {
        let options = AntialiasingOptions {
            base_blend_factor: 1.5,
            depth_threshold: -1.0,
            ..AntialiasingOptions::default()
        };
        let params = resolve_params(&options, 200, 100, true, 0.1, 50.0);
        assert_eq!(params.base_blend_factor, 1.0);
        assert_eq!(params.depth_threshold, 0.0);
        assert_eq!(params.history_valid, 1);
        assert_eq!(params.inverse_screen_size, [0.005, 0.01]);
    }
}
