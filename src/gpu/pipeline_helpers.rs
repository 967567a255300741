//! Shared wgpu boilerplate for the pipeline's full-screen and scene passes.

/// Run `create` inside a validation error scope. A wgpu validation failure
/// raised while it runs comes back as `Err` instead of reaching the
/// device's uncaptured-error handler, which panics by default.
///
/// # Errors
///
/// Returns the first validation error captured in the scope.
pub fn validation_scope<T>(
    device: &wgpu::Device,
    create: impl FnOnce() -> T,
) -> Result<T, wgpu::Error> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let value = create();
    match pollster::block_on(device.pop_error_scope()) {
        Some(error) => Err(error),
        None => Ok(value),
    }
}

/// Fragment-visible, filterable float 2D texture binding.
pub fn texture_2d(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::TextureSampleType::Float { filterable: true },
        wgpu::TextureViewDimension::D2,
    )
}

/// Fragment-visible, **non-filterable** float 2D texture binding.
///
/// Rgba32Float attachments are not filterable without an optional feature,
/// so the G-Buffer position/normal textures always bind through this.
pub fn texture_2d_unfilterable(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::TextureSampleType::Float { filterable: false },
        wgpu::TextureViewDimension::D2,
    )
}

/// Fragment-visible depth 2D texture binding.
pub fn depth_texture_2d(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::TextureSampleType::Depth,
        wgpu::TextureViewDimension::D2,
    )
}

/// Fragment-visible depth cube texture binding (point-light shadows).
pub fn depth_texture_cube(binding: u32) -> wgpu::BindGroupLayoutEntry {
    texture_entry(
        binding,
        wgpu::TextureSampleType::Depth,
        wgpu::TextureViewDimension::Cube,
    )
}

fn texture_entry(
    binding: u32,
    sample_type: wgpu::TextureSampleType,
    view_dimension: wgpu::TextureViewDimension,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type,
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

/// Fragment-visible filtering sampler binding.
pub fn filtering_sampler(binding: u32) -> wgpu::BindGroupLayoutEntry {
    sampler_entry(binding, wgpu::SamplerBindingType::Filtering)
}

/// Fragment-visible non-filtering sampler binding.
pub fn non_filtering_sampler(binding: u32) -> wgpu::BindGroupLayoutEntry {
    sampler_entry(binding, wgpu::SamplerBindingType::NonFiltering)
}

/// Fragment-visible comparison sampler binding (shadow lookups).
pub fn comparison_sampler(binding: u32) -> wgpu::BindGroupLayoutEntry {
    sampler_entry(binding, wgpu::SamplerBindingType::Comparison)
}

fn sampler_entry(
    binding: u32,
    ty: wgpu::SamplerBindingType,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

/// Fragment-visible uniform buffer binding.
pub fn uniform_buffer(binding: u32) -> wgpu::BindGroupLayoutEntry {
    uniform_entry(binding, wgpu::ShaderStages::FRAGMENT, false)
}

/// Uniform buffer binding visible to both vertex and fragment stages.
pub fn uniform_buffer_all(binding: u32) -> wgpu::BindGroupLayoutEntry {
    uniform_entry(binding, wgpu::ShaderStages::VERTEX_FRAGMENT, false)
}

/// Vertex+fragment uniform binding addressed with a dynamic offset
/// (per-object data packed into one buffer).
pub fn dynamic_uniform_buffer(binding: u32) -> wgpu::BindGroupLayoutEntry {
    uniform_entry(binding, wgpu::ShaderStages::VERTEX_FRAGMENT, true)
}

fn uniform_entry(
    binding: u32,
    visibility: wgpu::ShaderStages,
    has_dynamic_offset: bool,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Parameters for a full-screen pipeline.
pub struct ScreenSpacePipelineDef<'a> {
    /// Debug label prefix.
    pub label: &'a str,
    /// Composed shader module with `vs_main` / `fs_main`.
    pub shader: &'a wgpu::ShaderModule,
    /// One color target per format, in location order.
    pub formats: &'a [wgpu::TextureFormat],
    /// Blend state applied to every color target.
    pub blend: Option<wgpu::BlendState>,
    /// Bind group layouts, in group order.
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
}

/// Create a full-screen render pipeline with `vs_main` / `fs_main` entry
/// points, no vertex buffers and no depth attachment.
pub fn create_screen_space_pipeline(
    device: &wgpu::Device,
    def: &ScreenSpacePipelineDef<'_>,
) -> wgpu::RenderPipeline {
    let label = def.label;
    let pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts: def.bind_group_layouts,
            push_constant_ranges: &[],
        });
    let targets = color_targets(def.formats, def.blend);
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{label} Pipeline")),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: def.shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: def.shader,
            entry_point: Some("fs_main"),
            targets: &targets,
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn color_targets(
    formats: &[wgpu::TextureFormat],
    blend: Option<wgpu::BlendState>,
) -> Vec<Option<wgpu::ColorTargetState>> {
    formats
        .iter()
        .map(|&format| {
            Some(wgpu::ColorTargetState {
                format,
                blend,
                write_mask: wgpu::ColorWrites::ALL,
            })
        })
        .collect()
}

/// Parameters for a scene-geometry pipeline (meshes with vertex buffers).
pub struct ScenePipelineDesc<'a> {
    /// Debug label prefix.
    pub label: &'a str,
    /// Composed shader module with `vs_main` / `fs_main`.
    pub shader: &'a wgpu::ShaderModule,
    /// Bind group layouts, in group order.
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
    /// Vertex buffer layouts.
    pub vertex_buffers: &'a [wgpu::VertexBufferLayout<'a>],
    /// Color target formats. Empty for depth-only passes.
    pub color_formats: &'a [wgpu::TextureFormat],
    /// Blend state applied to every color target.
    pub blend: Option<wgpu::BlendState>,
    /// Depth format and comparison.
    pub depth: Option<(wgpu::TextureFormat, wgpu::CompareFunction)>,
    /// Face culling.
    pub cull_mode: Option<wgpu::Face>,
    /// Winding considered front-facing.
    pub front_face: wgpu::FrontFace,
}

/// Create a mesh pipeline from a [`ScenePipelineDesc`]. Depth-only passes
/// (no color formats) get no fragment stage.
pub fn create_scene_pipeline(
    device: &wgpu::Device,
    desc: &ScenePipelineDesc<'_>,
) -> wgpu::RenderPipeline {
    let label = desc.label;
    let pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} Pipeline Layout")),
            bind_group_layouts: desc.bind_group_layouts,
            push_constant_ranges: &[],
        });
    let targets = color_targets(desc.color_formats, desc.blend);
    let fragment = (!targets.is_empty()).then(|| wgpu::FragmentState {
        module: desc.shader,
        entry_point: Some("fs_main"),
        targets: &targets,
        compilation_options: Default::default(),
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{label} Pipeline")),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: desc.shader,
            entry_point: Some("vs_main"),
            buffers: desc.vertex_buffers,
            compilation_options: Default::default(),
        },
        fragment,
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            front_face: desc.front_face,
            cull_mode: desc.cull_mode,
            ..Default::default()
        },
        depth_stencil: desc.depth.map(|(format, depth_compare)| {
            wgpu::DepthStencilState {
                format,
                depth_write_enabled: true,
                depth_compare,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }
        }),
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

/// Additive blending used when accumulating one light at a time.
pub const ADDITIVE_BLEND: wgpu::BlendState = wgpu::BlendState {
    color: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
    alpha: wgpu::BlendComponent {
        src_factor: wgpu::BlendFactor::One,
        dst_factor: wgpu::BlendFactor::One,
        operation: wgpu::BlendOperation::Add,
    },
};

/// ClampToEdge + Linear sampler (the most common post-process sampler).
pub fn linear_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        ..Default::default()
    })
}

/// Repeat-addressed nearest sampler for tiled lookup textures.
pub fn repeat_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Nearest,
        min_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

/// Depth-comparison sampler (`LessEqual`) with clamp addressing.
pub fn shadow_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        compare: Some(wgpu::CompareFunction::LessEqual),
        ..Default::default()
    })
}
