//! Shared state of every pass that rasterizes scene geometry.
//!
//! Group 0 carries the camera and the light list, group 1 the per-object
//! uniform addressed with a dynamic offset. All objects of a frame are
//! packed into one buffer before the encoder records anything.

use std::num::NonZeroU64;

use wgpu::util::DeviceExt;

use crate::camera::{Camera, CameraUniform};
use crate::error::PipelineError;
use crate::gpu::dynamic_buffer::{aligned_stride, pack_aligned, DynamicBuffer};
use crate::gpu::pipeline_helpers::{
    create_scene_pipeline, dynamic_uniform_buffer, uniform_buffer,
    uniform_buffer_all, ScenePipelineDesc, ADDITIVE_BLEND,
};
use crate::gpu::shader_composer::{Shader, ShaderComposer};
use crate::renderer::lights::shadow::SHADOW_FORMAT;
use crate::renderer::lights::Lights;
use crate::scene::{Drawable, ObjectUniform, Vertex};

/// Depth format of the default target and the G-Buffer.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

const OBJECT_SIZE: u64 = std::mem::size_of::<ObjectUniform>() as u64;

/// Camera, light list and per-object uniforms for scene passes.
pub struct SceneBindings {
    frame_layout: wgpu::BindGroupLayout,
    object_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    objects: DynamicBuffer,
    object_bind_group: wgpu::BindGroup,
    stride: usize,
    offsets: Vec<u32>,
}

impl SceneBindings {
    /// Create the layouts and buffers. `lights_buffer` holds the
    /// [`LightsUniform`](crate::renderer::lights::LightsUniform).
    pub fn new(device: &wgpu::Device, lights_buffer: &wgpu::Buffer) -> Self {
        let frame_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Frame Layout"),
                entries: &[uniform_buffer_all(0), uniform_buffer(1)],
            });
        let object_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Scene Object Layout"),
                entries: &[dynamic_uniform_buffer(0)],
            });
        let camera_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Camera Uniform Buffer"),
                contents: bytemuck::bytes_of(&CameraUniform::new()),
                usage: wgpu::BufferUsages::UNIFORM
                    | wgpu::BufferUsages::COPY_DST,
            });
        let frame_bind_group =
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Scene Frame Bind Group"),
                layout: &frame_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: camera_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: lights_buffer.as_entire_binding(),
                    },
                ],
            });
        let stride = aligned_stride(
            OBJECT_SIZE as usize,
            device.limits().min_uniform_buffer_offset_alignment as usize,
        );
        let objects = DynamicBuffer::new(
            device,
            "Scene Object Buffer",
            stride * 16,
            wgpu::BufferUsages::UNIFORM,
        );
        let object_bind_group =
            Self::object_bind_group(device, &object_layout, &objects);
        Self {
            frame_layout,
            object_layout,
            camera_buffer,
            frame_bind_group,
            objects,
            object_bind_group,
            stride,
            offsets: Vec::new(),
        }
    }

    fn object_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        objects: &DynamicBuffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Object Bind Group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: objects.buffer(),
                    offset: 0,
                    size: NonZeroU64::new(OBJECT_SIZE),
                }),
            }],
        })
    }

    /// Upload the camera and every drawable's uniform for this frame.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        camera: &Camera,
        drawables: &[&dyn Drawable],
    ) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&CameraUniform::from_camera(camera)),
        );
        let uniforms: Vec<ObjectUniform> = drawables
            .iter()
            .map(|d| ObjectUniform::from_drawable(*d))
            .collect();
        let (bytes, offsets) = pack_aligned(&uniforms, self.stride);
        if self.objects.write_bytes(device, queue, &bytes) {
            self.object_bind_group =
                Self::object_bind_group(device, &self.object_layout, &self.objects);
        }
        self.offsets = offsets;
    }

    /// Group 0 layout (camera, lights).
    pub fn frame_layout(&self) -> &wgpu::BindGroupLayout {
        &self.frame_layout
    }

    /// Group 1 layout (object, dynamic offset).
    pub fn object_layout(&self) -> &wgpu::BindGroupLayout {
        &self.object_layout
    }

    /// Buffer holding [`CameraUniform`].
    pub fn camera_buffer(&self) -> &wgpu::Buffer {
        &self.camera_buffer
    }

    /// Bind group 0 and draw every drawable.
    pub fn draw_all(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        drawables: &[&dyn Drawable],
    ) {
        pass.set_bind_group(0, &self.frame_bind_group, &[]);
        self.draw_objects(pass, drawables, |_| true);
    }

    /// Draw every shadow-casting drawable. Group 0 is left to the caller
    /// (the face matrix).
    pub fn draw_shadow_casters(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        drawables: &[&dyn Drawable],
    ) {
        self.draw_objects(pass, drawables, |d| d.casts_shadow());
    }

    fn draw_objects(
        &self,
        pass: &mut wgpu::RenderPass<'_>,
        drawables: &[&dyn Drawable],
        include: impl Fn(&dyn Drawable) -> bool,
    ) {
        for (drawable, &offset) in drawables.iter().zip(&self.offsets) {
            if !include(*drawable) {
                continue;
            }
            pass.set_bind_group(1, &self.object_bind_group, &[offset]);
            drawable.mesh().draw(pass);
        }
    }
}

/// Every pipeline that rasterizes scene meshes.
pub struct ScenePipelines {
    /// All lights in one pass into a single color target.
    pub forward: wgpu::RenderPipeline,
    /// One light with shadows, additive, `LessEqual` depth.
    pub shadowed: wgpu::RenderPipeline,
    /// Depth-only pass into a 2D shadow map.
    pub shadow_projected: wgpu::RenderPipeline,
    /// Depth-only pass into one cube face.
    pub shadow_cube: wgpu::RenderPipeline,
}

impl ScenePipelines {
    /// Compose the raster shaders and build the pipelines. `color_format`
    /// is the default target's format.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShaderCompose`] if a shader fails to
    /// compose.
    pub fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        bindings: &SceneBindings,
        lights: &Lights,
        color_format: wgpu::TextureFormat,
    ) -> Result<Self, PipelineError> {
        let vertex_buffers = [Vertex::layout()];
        let scene_layouts = [bindings.frame_layout(), bindings.object_layout()];

        let forward_shader = composer.compose(device, Shader::Forward)?;
        let forward = create_scene_pipeline(
            device,
            &ScenePipelineDesc {
                label: "Forward",
                shader: &forward_shader,
                bind_group_layouts: &scene_layouts,
                vertex_buffers: &vertex_buffers,
                color_formats: &[color_format],
                blend: None,
                depth: Some((DEPTH_FORMAT, wgpu::CompareFunction::Less)),
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
            },
        );

        let shadowed_shader = composer.compose(device, Shader::Shadowed)?;
        let shadowed = create_scene_pipeline(
            device,
            &ScenePipelineDesc {
                label: "Shadowed Lighting",
                shader: &shadowed_shader,
                bind_group_layouts: &[
                    bindings.frame_layout(),
                    bindings.object_layout(),
                    lights.light_layout(),
                ],
                vertex_buffers: &vertex_buffers,
                color_formats: &[color_format],
                blend: Some(ADDITIVE_BLEND),
                depth: Some((DEPTH_FORMAT, wgpu::CompareFunction::LessEqual)),
                cull_mode: Some(wgpu::Face::Back),
                front_face: wgpu::FrontFace::Ccw,
            },
        );

        let depth_shader = composer.compose(device, Shader::ShadowDepth)?;
        let shadow_layouts = [lights.face_layout(), bindings.object_layout()];
        let shadow_projected = create_scene_pipeline(
            device,
            &shadow_desc(
                "Shadow Depth",
                &depth_shader,
                &shadow_layouts,
                &vertex_buffers,
                wgpu::FrontFace::Ccw,
            ),
        );
        // Cube face projections are flipped vertically, which reverses
        // winding.
        let shadow_cube = create_scene_pipeline(
            device,
            &shadow_desc(
                "Shadow Depth Cube",
                &depth_shader,
                &shadow_layouts,
                &vertex_buffers,
                wgpu::FrontFace::Cw,
            ),
        );

        log::info!("Scene pipelines created (target {color_format:?})");
        Ok(Self {
            forward,
            shadowed,
            shadow_projected,
            shadow_cube,
        })
    }
}

/// Depth-only, front-face-culled pipeline description for shadow maps.
fn shadow_desc<'a>(
    label: &'a str,
    shader: &'a wgpu::ShaderModule,
    bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    front_face: wgpu::FrontFace,
) -> ScenePipelineDesc<'a> {
    ScenePipelineDesc {
        label,
        shader,
        bind_group_layouts,
        vertex_buffers,
        color_formats: &[],
        blend: None,
        depth: Some((SHADOW_FORMAT, wgpu::CompareFunction::Less)),
        cull_mode: Some(wgpu::Face::Front),
        front_face,
    }
}
