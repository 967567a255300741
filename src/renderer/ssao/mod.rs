//! Screen-space ambient occlusion over the G-Buffer.
//!
//! Two single-channel surfaces: the raw hemisphere estimate and its 4×4
//! box blur. The sample kernel and the rotation-noise tile are generated
//! once at construction.

/// Sample kernel and rotation noise generation.
pub mod kernel;

use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::gpu::pipeline_helpers::{
    create_screen_space_pipeline, non_filtering_sampler, repeat_sampler,
    texture_2d, texture_2d_unfilterable, uniform_buffer, ScreenSpacePipelineDef,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::gpu::surface_set::{AttachmentDesc, SurfaceLayout, SurfaceSet};
use crate::options::SsaoOptions;
use crate::renderer::frame::{FrameContext, PassKind};
use crate::renderer::screen_pass::ScreenPass;

use self::kernel::{KERNEL_SIZE, NOISE_SIZE};

/// Format of the raw and blurred occlusion surfaces.
pub const SSAO_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// SSAO parameters uniform - must match WGSL struct
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SsaoParams {
    /// Hemisphere kernel, `w` unused.
    pub samples: [[f32; 4]; KERNEL_SIZE],
    /// Camera projection matrix.
    pub projection: [[f32; 4]; 4],
    /// Camera view matrix (G-Buffer positions are world space).
    pub view: [[f32; 4]; 4],
    /// Screen dimensions in pixels `[width, height]`.
    pub screen_size: [f32; 2],
    /// Sampling radius in view space.
    pub radius: f32,
    /// Depth bias against self-occlusion.
    pub bias: f32,
}

fn occlusion_layout(label: &str, width: u32, height: u32) -> SurfaceLayout {
    SurfaceLayout::new(
        label,
        width,
        height,
        vec![AttachmentDesc::color("occlusion", 0, SSAO_FORMAT)],
    )
}

/// SSAO (Screen Space Ambient Occlusion) renderer
pub struct Ssao {
    raw: SurfaceSet,
    blurred: SurfaceSet,
    kernel: [[f32; 4]; KERNEL_SIZE],
    options: SsaoOptions,

    // Must stay alive to back `noise_view`.
    _noise_texture: wgpu::Texture,
    noise_view: wgpu::TextureView,
    noise_sampler: wgpu::Sampler,
    params_buffer: wgpu::Buffer,

    position_view: wgpu::TextureView,
    normal_view: wgpu::TextureView,

    ssao_layout: wgpu::BindGroupLayout,
    blur_layout: wgpu::BindGroupLayout,
    ssao_pipeline: wgpu::RenderPipeline,
    blur_pipeline: wgpu::RenderPipeline,
    ssao_bind_group: wgpu::BindGroup,
    blur_bind_group: wgpu::BindGroup,
}

/// G-Buffer views SSAO reads from.
pub struct GeometryViews<'a> {
    /// World-space position attachment.
    pub position: &'a wgpu::TextureView,
    /// World-space normal attachment.
    pub normal: &'a wgpu::TextureView,
}

impl Ssao {
    /// Allocate both occlusion surfaces, generate the kernel and noise
    /// tile, and build the two pipelines.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if a surface cannot be
    /// created, or [`PipelineError::ShaderCompose`] if a shader fails.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        composer: &mut ShaderComposer,
        geometry: &GeometryViews<'_>,
        size: (u32, u32),
        options: SsaoOptions,
    ) -> Result<Self, PipelineError> {
        let (width, height) = size;
        let raw = SurfaceSet::create(device, occlusion_layout("SSAO Raw", width, height))?;
        let blurred = SurfaceSet::create(
            device,
            occlusion_layout("SSAO Blurred", width, height),
        )?;

        let mut rng = rand::rng();
        let kernel = kernel::generate_kernel(&mut rng);
        let (noise_texture, noise_view) =
            Self::create_noise_texture(device, queue, &mut rng);
        let noise_sampler = repeat_sampler(device, "SSAO Noise Sampler");

        let params_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("SSAO Params Buffer"),
                contents: bytemuck::bytes_of(&SsaoParams {
                    samples: kernel,
                    projection: glam::Mat4::IDENTITY.to_cols_array_2d(),
                    view: glam::Mat4::IDENTITY.to_cols_array_2d(),
                    screen_size: [width as f32, height as f32],
                    radius: options.radius,
                    bias: options.bias,
                }),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });

        let ssao_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SSAO Bind Group Layout"),
                entries: &[
                    texture_2d_unfilterable(0),
                    texture_2d_unfilterable(1),
                    texture_2d_unfilterable(2),
                    non_filtering_sampler(3),
                    uniform_buffer(4),
                ],
            });
        let blur_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("SSAO Blur Bind Group Layout"),
                entries: &[texture_2d(0)],
            });

        let ssao_shader = composer.compose(device, Shader::Ssao)?;
        let ssao_pipeline = create_screen_space_pipeline(
            device,
            &ScreenSpacePipelineDef {
                label: "SSAO",
                shader: &ssao_shader,
                formats: &[SSAO_FORMAT],
                blend: None,
                bind_group_layouts: &[&ssao_layout],
            },
        );
        let blur_shader = composer.compose(device, Shader::SsaoBlur)?;
        let blur_pipeline = create_screen_space_pipeline(
            device,
            &ScreenSpacePipelineDef {
                label: "SSAO Blur",
                shader: &blur_shader,
                formats: &[SSAO_FORMAT],
                blend: None,
                bind_group_layouts: &[&blur_layout],
            },
        );

        let ssao_bind_group = create_ssao_bind_group(
            device,
            &ssao_layout,
            &SsaoInputs {
                position: geometry.position,
                normal: geometry.normal,
                noise: &noise_view,
                noise_sampler: &noise_sampler,
                params_buffer: &params_buffer,
            },
        );
        let blur_bind_group =
            create_blur_bind_group(device, &blur_layout, occlusion_view(&raw)?);

        log::info!("SSAO created ({width}x{height}, {KERNEL_SIZE} samples)");
        Ok(Self {
            raw,
            blurred,
            kernel,
            options,
            _noise_texture: noise_texture,
            noise_view,
            noise_sampler,
            params_buffer,
            position_view: geometry.position.clone(),
            normal_view: geometry.normal.clone(),
            ssao_layout,
            blur_layout,
            ssao_pipeline,
            blur_pipeline,
            ssao_bind_group,
            blur_bind_group,
        })
    }

    fn create_noise_texture<R: rand::Rng>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rng: &mut R,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let noise = kernel::generate_noise(rng);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("SSAO Noise Texture"),
            size: wgpu::Extent3d {
                width: NOISE_SIZE,
                height: NOISE_SIZE,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba32Float,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytemuck::cast_slice(&noise),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(NOISE_SIZE * 16),
                rows_per_image: Some(NOISE_SIZE),
            },
            wgpu::Extent3d {
                width: NOISE_SIZE,
                height: NOISE_SIZE,
                depth_or_array_layers: 1,
            },
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Upload kernel, camera matrices and tunables, then estimate raw
    /// occlusion for every pixel.
    pub fn render_raw(&self, frame: &mut FrameContext<'_>, camera: &Camera) {
        let (width, height) = self.raw.size();
        let params = SsaoParams {
            samples: self.kernel,
            projection: camera.build_projection().to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            screen_size: [width as f32, height as f32],
            radius: self.options.radius,
            bias: self.options.bias,
        };
        frame
            .queue
            .write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
        Self::draw(
            frame,
            "SSAO Pass",
            &self.raw,
            &self.ssao_pipeline,
            &self.ssao_bind_group,
        );
        frame.record(PassKind::SsaoRaw);
    }

    /// Box-blur the raw occlusion into the blurred surface.
    pub fn render_blur(&self, frame: &mut FrameContext<'_>) {
        Self::draw(
            frame,
            "SSAO Blur Pass",
            &self.blurred,
            &self.blur_pipeline,
            &self.blur_bind_group,
        );
        frame.record(PassKind::SsaoBlur);
    }

    fn draw(
        frame: &mut FrameContext<'_>,
        label: &str,
        target: &SurfaceSet,
        pipeline: &wgpu::RenderPipeline,
        bind_group: &wgpu::BindGroup,
    ) {
        let colors = target.color_attachments(wgpu::LoadOp::Clear(wgpu::Color::WHITE));
        let mut pass = frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &colors,
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }

    /// The blurred occlusion consumed by deferred lighting.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the surface has no
    /// color attachment.
    pub fn blurred_view(&self) -> Result<&wgpu::TextureView, PipelineError> {
        occlusion_view(&self.blurred)
    }

    /// The raw (unblurred) occlusion surface.
    pub fn raw_surface(&self) -> &SurfaceSet {
        &self.raw
    }

    /// The blurred occlusion surface.
    pub fn blurred_surface(&self) -> &SurfaceSet {
        &self.blurred
    }

    /// Current tunables.
    pub fn options(&self) -> &SsaoOptions {
        &self.options
    }

    /// Replace radius and bias; takes effect on the next raw pass.
    pub fn set_options(&mut self, options: SsaoOptions) {
        self.options = options;
    }

    /// Point SSAO at new G-Buffer views (after the G-Buffer was resized).
    pub fn set_geometry_views(
        &mut self,
        device: &wgpu::Device,
        geometry: &GeometryViews<'_>,
    ) {
        self.position_view = geometry.position.clone();
        self.normal_view = geometry.normal.clone();
        self.rebuild_ssao_bind_group(device);
    }

    fn rebuild_ssao_bind_group(&mut self, device: &wgpu::Device) {
        self.ssao_bind_group = create_ssao_bind_group(
            device,
            &self.ssao_layout,
            &SsaoInputs {
                position: &self.position_view,
                normal: &self.normal_view,
                noise: &self.noise_view,
                noise_sampler: &self.noise_sampler,
                params_buffer: &self.params_buffer,
            },
        );
    }
}

impl ScreenPass for Ssao {
    fn label(&self) -> &'static str {
        "SSAO"
    }

    fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        self.raw.resize(device, width, height)?;
        self.blurred.resize(device, width, height)?;
        self.rebuild_ssao_bind_group(device);
        self.blur_bind_group =
            create_blur_bind_group(device, &self.blur_layout, occlusion_view(&self.raw)?);
        Ok(())
    }
}

fn occlusion_view(surface: &SurfaceSet) -> Result<&wgpu::TextureView, PipelineError> {
    surface
        .color(0)
        .map(|a| &a.view)
        .ok_or_else(|| PipelineError::IncompleteSurface {
            label: surface.layout().label.clone(),
            reason: "missing occlusion attachment".to_owned(),
        })
}

/// Inputs for creating the SSAO bind group.
struct SsaoInputs<'a> {
    position: &'a wgpu::TextureView,
    normal: &'a wgpu::TextureView,
    noise: &'a wgpu::TextureView,
    noise_sampler: &'a wgpu::Sampler,
    params_buffer: &'a wgpu::Buffer,
}

fn create_ssao_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    inputs: &SsaoInputs<'_>,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("SSAO Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(inputs.position),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(inputs.normal),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(inputs.noise),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(inputs.noise_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: inputs.params_buffer.as_entire_binding(),
            },
        ],
    })
}

fn create_blur_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    ssao_view: &wgpu::TextureView,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("SSAO Blur Bind Group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::TextureView(ssao_view),
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// CPU mirror of the blur shader: 4×4 box over offsets -2..=1 with
    /// clamped coordinates.
    fn box_blur(input: &[f32], width: usize, height: usize) -> Vec<f32> {
        let mut out = vec![0.0; input.len()];
        for y in 0..height {
            for x in 0..width {
                let mut total = 0.0;
                for dy in -2i32..2 {
                    for dx in -2i32..2 {
                        let sx = (x as i32 + dx).clamp(0, width as i32 - 1) as usize;
                        let sy = (y as i32 + dy).clamp(0, height as i32 - 1) as usize;
                        total += input[sy * width + sx];
                    }
                }
                out[y * width + x] = (total / 16.0f32).clamp(0.0, 1.0);
            }
        }
        out
    }

    #[test]
    fn params_match_wgsl_size() {
        assert_eq!(std::mem::size_of::<SsaoParams>(), 1168);
    }

    #[test]
    fn blur_keeps_constant_inputs() {
        for value in [0.0f32, 1.0] {
            let out = box_blur(&[value; 64], 8, 8);
            assert!(out.iter().all(|&v| (v - value).abs() < 1e-6));
            assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
        }
    }

    #[test]
    fn blur_smooths_an_edge() {
        let mut input = vec![0.0f32; 64];
        for row in input.chunks_mut(8) {
            row[4..].fill(1.0);
        }
        let out = box_blur(&input, 8, 8);
        assert!(out[3] > 0.0 && out[3] < 1.0);
        assert!(out.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
