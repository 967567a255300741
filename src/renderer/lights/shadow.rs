//! Depth-only shadow surfaces owned by individual lights.

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::error::PipelineError;
use crate::gpu::surface_set::{AttachmentDesc, SurfaceLayout, SurfaceSet};
use crate::renderer::frame::FrameContext;
use crate::renderer::scene_pass::SceneBindings;
use crate::scene::Drawable;

/// Depth format of every shadow map.
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Shape of a shadow map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShadowKind {
    /// One 2D depth layer (directional and spot lights).
    Projected,
    /// Six-layer cube (point lights).
    Cube,
}

impl ShadowKind {
    /// Number of depth layers rendered per frame.
    pub fn faces(self) -> u32 {
        match self {
            Self::Projected => 1,
            Self::Cube => 6,
        }
    }
}

/// Surface layout of a `resolution`² shadow map.
pub fn shadow_layout(label: &str, kind: ShadowKind, resolution: u32) -> SurfaceLayout {
    SurfaceLayout::new(
        label,
        resolution,
        resolution,
        vec![AttachmentDesc::depth("depth", SHADOW_FORMAT).with_layers(kind.faces())],
    )
}

/// `lightSpaceMatrix` uniform of one face in the shadow depth shader.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShadowFaceUniform {
    /// World to light clip space for this face.
    pub light_space_matrix: [[f32; 4]; 4],
}

/// A light's shadow surface plus one matrix uniform per face.
///
/// Each face has its own buffer: all uploads of a frame land before the
/// encoder is submitted, so faces sharing a buffer would all see the last
/// matrix written.
pub struct ShadowMap {
    kind: ShadowKind,
    surface: SurfaceSet,
    face_buffers: Vec<wgpu::Buffer>,
    face_bind_groups: Vec<wgpu::BindGroup>,
}

impl ShadowMap {
    /// Allocate the depth surface and per-face uniforms.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the shadow surface
    /// cannot be created at `resolution`.
    pub fn new(
        device: &wgpu::Device,
        face_layout: &wgpu::BindGroupLayout,
        label: &str,
        kind: ShadowKind,
        resolution: u32,
    ) -> Result<Self, PipelineError> {
        let surface =
            SurfaceSet::create(device, shadow_layout(label, kind, resolution))?;
        let (face_buffers, face_bind_groups) = (0..kind.faces())
            .map(|face| {
                let buffer =
                    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("{label} Face {face} Uniform")),
                        contents: bytemuck::bytes_of(&ShadowFaceUniform {
                            light_space_matrix: Mat4::IDENTITY
                                .to_cols_array_2d(),
                        }),
                        usage: wgpu::BufferUsages::UNIFORM
                            | wgpu::BufferUsages::COPY_DST,
                    });
                let bind_group =
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(&format!("{label} Face {face} Bind Group")),
                        layout: face_layout,
                        entries: &[wgpu::BindGroupEntry {
                            binding: 0,
                            resource: buffer.as_entire_binding(),
                        }],
                    });
                (buffer, bind_group)
            })
            .unzip();
        Ok(Self {
            kind,
            surface,
            face_buffers,
            face_bind_groups,
        })
    }

    /// Cube or projected.
    pub fn kind(&self) -> ShadowKind {
        self.kind
    }

    /// The depth surface.
    pub fn surface(&self) -> &SurfaceSet {
        &self.surface
    }

    /// Full view of the depth attachment (2D or cube).
    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.surface.depth().map(|d| &d.view)
    }

    /// Upload one matrix per face. Extra matrices are ignored.
    pub fn write_faces(&self, queue: &wgpu::Queue, faces: &[Mat4]) {
        for (buffer, matrix) in self.face_buffers.iter().zip(faces) {
            queue.write_buffer(
                buffer,
                0,
                bytemuck::bytes_of(&ShadowFaceUniform {
                    light_space_matrix: matrix.to_cols_array_2d(),
                }),
            );
        }
    }

    /// Render every shadow caster into every face: clear depth, cull front
    /// faces (baked into `pipeline`), draw positions only.
    pub fn render(
        &self,
        frame: &mut FrameContext<'_>,
        pipeline: &wgpu::RenderPipeline,
        bindings: &SceneBindings,
        drawables: &[&dyn Drawable],
    ) {
        for (face, bind_group) in self.face_bind_groups.iter().enumerate() {
            let mut pass =
                frame.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Shadow Depth Pass"),
                    color_attachments: &[],
                    depth_stencil_attachment: self
                        .surface
                        .depth_attachment(face as u32, Some(1.0)),
                    timestamp_writes: None,
                    occlusion_query_set: None,
                });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, bind_group, &[]);
            bindings.draw_shadow_casters(&mut pass, drawables);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_shadow_layout_is_a_cube() {
        let layout = shadow_layout("Point", ShadowKind::Cube, 1024);
        assert_eq!(layout.attachments.len(), 1);
        assert_eq!(layout.attachments[0].layers, 6);
        assert_eq!(layout.color_count(), 0);
        assert!(layout
            .validate(&wgpu::Limits::default(), |f| {
                f.guaranteed_format_features(wgpu::Features::empty())
            })
            .is_ok());
    }

    #[test]
    fn projected_shadow_layout_is_single_layer() {
        let layout = shadow_layout("Spot", ShadowKind::Projected, 512);
        assert_eq!(layout.attachments[0].layers, 1);
        assert_eq!((layout.width, layout.height), (512, 512));
    }
}
