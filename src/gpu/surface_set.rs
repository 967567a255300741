//! Owned render targets with a fixed list of attachments.
//!
//! A [`SurfaceSet`] is created from a [`SurfaceLayout`] and owns every
//! texture and view of the layout. The layout is validated against the
//! device limits before anything is allocated, and allocation runs inside a
//! validation error scope, so an unusable layout is reported instead of
//! surfacing later as a wgpu validation panic. Resizing builds a complete
//! replacement and swaps it in; a failed resize leaves the previous
//! textures untouched.

use crate::error::PipelineError;
use crate::gpu::pipeline_helpers::validation_scope;

/// Where an attachment binds in a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentSlot {
    /// Color output at the given `@location`.
    Color(u32),
    /// The depth attachment.
    Depth,
}

/// Description of one attachment of a surface set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttachmentDesc {
    /// Debug label (also used to look the attachment up).
    pub label: &'static str,
    /// Render pass slot.
    pub slot: AttachmentSlot,
    /// Texel format.
    pub format: wgpu::TextureFormat,
    /// Array layers. Six layers make the full view a cube.
    pub layers: u32,
}

impl AttachmentDesc {
    /// Single-layer color attachment.
    pub const fn color(
        label: &'static str,
        location: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        Self {
            label,
            slot: AttachmentSlot::Color(location),
            format,
            layers: 1,
        }
    }

    /// Single-layer depth attachment.
    pub const fn depth(label: &'static str, format: wgpu::TextureFormat) -> Self {
        Self {
            label,
            slot: AttachmentSlot::Depth,
            format,
            layers: 1,
        }
    }

    /// Same attachment with `layers` array layers.
    #[must_use]
    pub const fn with_layers(mut self, layers: u32) -> Self {
        self.layers = layers;
        self
    }

    fn is_depth(&self) -> bool {
        self.slot == AttachmentSlot::Depth
    }

    fn view_dimension(&self) -> wgpu::TextureViewDimension {
        match self.layers {
            1 => wgpu::TextureViewDimension::D2,
            6 => wgpu::TextureViewDimension::Cube,
            _ => wgpu::TextureViewDimension::D2Array,
        }
    }
}

/// The pure shape of a surface set: label, extent and attachments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceLayout {
    /// Debug label of the render target.
    pub label: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Attachments, in creation order.
    pub attachments: Vec<AttachmentDesc>,
}

impl SurfaceLayout {
    /// Create a layout.
    pub fn new(
        label: impl Into<String>,
        width: u32,
        height: u32,
        attachments: Vec<AttachmentDesc>,
    ) -> Self {
        Self {
            label: label.into(),
            width,
            height,
            attachments,
        }
    }

    /// Same attachments at a new extent.
    #[must_use]
    pub fn resized(&self, width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..self.clone()
        }
    }

    /// Number of color attachments.
    pub fn color_count(&self) -> usize {
        self.attachments.iter().filter(|a| !a.is_depth()).count()
    }

    /// Render-target bytes per sample, accumulated with per-format component
    /// alignment the way WebGPU validates color attachments.
    pub fn color_bytes_per_sample(&self) -> u32 {
        self.color_descs().fold(0, |total, a| {
            let align = a.format.target_component_alignment().unwrap_or(1);
            let cost = a.format.target_pixel_byte_cost().unwrap_or(0);
            total.next_multiple_of(align) + cost
        })
    }

    fn color_descs(&self) -> impl Iterator<Item = &AttachmentDesc> {
        let mut colors: Vec<&AttachmentDesc> =
            self.attachments.iter().filter(|a| !a.is_depth()).collect();
        colors.sort_by_key(|a| match a.slot {
            AttachmentSlot::Color(location) => location,
            AttachmentSlot::Depth => u32::MAX,
        });
        colors.into_iter()
    }

    /// Check that this layout can be allocated on a device with the given
    /// limits, where `format_features` reports what each texel format
    /// supports. Returns a human-readable reason on failure.
    ///
    /// # Errors
    ///
    /// Returns the first reason the layout is incomplete.
    pub fn validate(
        &self,
        limits: &wgpu::Limits,
        format_features: impl Fn(wgpu::TextureFormat) -> wgpu::TextureFormatFeatures,
    ) -> Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "zero extent {}x{}",
                self.width, self.height
            ));
        }
        let max_dim = limits.max_texture_dimension_2d;
        if self.width > max_dim || self.height > max_dim {
            return Err(format!(
                "extent {}x{} exceeds max texture dimension {max_dim}",
                self.width, self.height
            ));
        }
        if self.attachments.is_empty() {
            return Err("no attachments".to_owned());
        }

        let depth_count =
            self.attachments.iter().filter(|a| a.is_depth()).count();
        if depth_count > 1 {
            return Err(format!("{depth_count} depth attachments"));
        }

        let color_count = self.color_count();
        if color_count > limits.max_color_attachments as usize {
            return Err(format!(
                "{color_count} color attachments exceed device limit {}",
                limits.max_color_attachments
            ));
        }
        let mut locations: Vec<u32> = self
            .attachments
            .iter()
            .filter_map(|a| match a.slot {
                AttachmentSlot::Color(location) => Some(location),
                AttachmentSlot::Depth => None,
            })
            .collect();
        locations.sort_unstable();
        if locations.windows(2).any(|w| w[0] == w[1]) {
            return Err("duplicate color location".to_owned());
        }
        if locations
            .last()
            .is_some_and(|&l| l >= limits.max_color_attachments)
        {
            return Err("color location out of range".to_owned());
        }

        let bytes = self.color_bytes_per_sample();
        if bytes > limits.max_color_attachment_bytes_per_sample {
            return Err(format!(
                "{bytes} color bytes per sample exceed device limit {}",
                limits.max_color_attachment_bytes_per_sample
            ));
        }

        for a in &self.attachments {
            if a.layers == 0 || a.layers > limits.max_texture_array_layers {
                return Err(format!(
                    "'{}' has unsupported layer count {}",
                    a.label, a.layers
                ));
            }
            if a.is_depth() != a.format.is_depth_stencil_format() {
                return Err(format!(
                    "'{}' format {:?} does not match its slot",
                    a.label, a.format
                ));
            }
            let usages = format_features(a.format).allowed_usages;
            if !usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
                return Err(format!(
                    "'{}' format {:?} is not renderable",
                    a.label, a.format
                ));
            }
        }
        Ok(())
    }
}

/// One allocated attachment.
pub struct Attachment {
    /// What was allocated.
    pub desc: AttachmentDesc,
    /// The texture.
    pub texture: wgpu::Texture,
    /// View over every layer (2D, cube, or 2D array).
    pub view: wgpu::TextureView,
    /// One 2D view per layer, used as render pass targets for layered
    /// attachments. Empty for single-layer attachments.
    pub layer_views: Vec<wgpu::TextureView>,
}

impl Attachment {
    fn new(
        device: &wgpu::Device,
        layout: &SurfaceLayout,
        desc: AttachmentDesc,
    ) -> Self {
        let label = format!("{} {}", layout.label, desc.label);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(&label),
            size: wgpu::Extent3d {
                width: layout.width,
                height: layout.height,
                depth_or_array_layers: desc.layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: desc.format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some(&label),
            dimension: Some(desc.view_dimension()),
            ..Default::default()
        });
        let layer_views = if desc.layers > 1 {
            (0..desc.layers)
                .map(|layer| {
                    texture.create_view(&wgpu::TextureViewDescriptor {
                        label: Some(&format!("{label} Layer {layer}")),
                        dimension: Some(wgpu::TextureViewDimension::D2),
                        base_array_layer: layer,
                        array_layer_count: Some(1),
                        ..Default::default()
                    })
                })
                .collect()
        } else {
            Vec::new()
        };
        Self {
            desc,
            texture,
            view,
            layer_views,
        }
    }

    /// Render-target view for `layer` (the full view for single-layer
    /// attachments).
    pub fn target_view(&self, layer: u32) -> &wgpu::TextureView {
        self.layer_views.get(layer as usize).unwrap_or(&self.view)
    }
}

/// A render target owning all of its attachments.
pub struct SurfaceSet {
    layout: SurfaceLayout,
    attachments: Vec<Attachment>,
}

fn incomplete(label: &str, reason: String) -> PipelineError {
    log::error!("Surface set '{label}' is incomplete: {reason}");
    PipelineError::IncompleteSurface {
        label: label.to_owned(),
        reason,
    }
}

impl SurfaceSet {
    /// Validate `layout` against the device and allocate every attachment.
    /// Formats are checked against the WebGPU guarantees here; use
    /// [`RenderContext::supports_layout`](crate::gpu::render_context::RenderContext::supports_layout)
    /// to check the adapter's actual support first. Anything the device
    /// still rejects during allocation is captured and reported the same
    /// way.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] (after logging it) if the
    /// layout cannot be realised on this device.
    pub fn create(
        device: &wgpu::Device,
        layout: SurfaceLayout,
    ) -> Result<Self, PipelineError> {
        let features = device.features();
        layout
            .validate(&device.limits(), |format| {
                format.guaranteed_format_features(features)
            })
            .map_err(|reason| incomplete(&layout.label, reason))?;
        let attachments: Vec<Attachment> = validation_scope(device, || {
            layout
                .attachments
                .iter()
                .map(|&desc| Attachment::new(device, &layout, desc))
                .collect()
        })
        .map_err(|e| incomplete(&layout.label, e.to_string()))?;
        log::debug!(
            "Created surface set '{}' ({}x{}, {} attachments)",
            layout.label,
            layout.width,
            layout.height,
            layout.attachments.len()
        );
        Ok(Self {
            layout,
            attachments,
        })
    }

    /// Replace every attachment with one of the new extent. On failure the
    /// current attachments are kept.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the new extent is
    /// invalid for this device.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        let replacement =
            Self::create(device, self.layout.resized(width, height))?;
        *self = replacement;
        Ok(())
    }

    /// The layout this set was created from.
    pub fn layout(&self) -> &SurfaceLayout {
        &self.layout
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.layout.width, self.layout.height)
    }

    /// Attachment bound at color location `location`.
    pub fn color(&self, location: u32) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.desc.slot == AttachmentSlot::Color(location))
    }

    /// The depth attachment, if any.
    pub fn depth(&self) -> Option<&Attachment> {
        self.attachments
            .iter()
            .find(|a| a.desc.slot == AttachmentSlot::Depth)
    }

    /// Color attachments in location order, each loading with `load`.
    pub fn color_attachments(
        &self,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> Vec<Option<wgpu::RenderPassColorAttachment<'_>>> {
        let mut colors: Vec<&Attachment> = self
            .attachments
            .iter()
            .filter(|a| !a.desc.is_depth())
            .collect();
        colors.sort_by_key(|a| match a.desc.slot {
            AttachmentSlot::Color(location) => location,
            AttachmentSlot::Depth => u32::MAX,
        });
        colors
            .into_iter()
            .map(|a| {
                Some(wgpu::RenderPassColorAttachment {
                    view: &a.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })
            })
            .collect()
    }

    /// Depth attachment of `layer`, cleared to `clear` or loaded when
    /// `None`.
    pub fn depth_attachment(
        &self,
        layer: u32,
        clear: Option<f32>,
    ) -> Option<wgpu::RenderPassDepthStencilAttachment<'_>> {
        self.depth().map(|depth| wgpu::RenderPassDepthStencilAttachment {
            view: depth.target_view(layer),
            depth_ops: Some(wgpu::Operations {
                load: clear.map_or(wgpu::LoadOp::Load, wgpu::LoadOp::Clear),
                store: wgpu::StoreOp::Store,
            }),
            stencil_ops: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gbuffer_like(width: u32, height: u32) -> SurfaceLayout {
        use wgpu::TextureFormat as F;
        SurfaceLayout::new(
            "Test",
            width,
            height,
            vec![
                AttachmentDesc::color("position", 0, F::Rgba32Float),
                AttachmentDesc::color("normal", 1, F::Rgba32Float),
                AttachmentDesc::color("albedo", 2, F::Rgba8Unorm),
                AttachmentDesc::color("specular", 3, F::Rgba16Float),
                AttachmentDesc::color("fresnel", 4, F::Rgba16Float),
                AttachmentDesc::color("ambient", 5, F::Rgba16Float),
                AttachmentDesc::depth("depth", F::Depth32Float),
            ],
        )
    }

    fn guaranteed(format: wgpu::TextureFormat) -> wgpu::TextureFormatFeatures {
        format.guaranteed_format_features(wgpu::Features::empty())
    }

    fn roomy_limits() -> wgpu::Limits {
        wgpu::Limits {
            max_color_attachment_bytes_per_sample: 64,
            ..wgpu::Limits::default()
        }
    }

    #[test]
    fn resize_preserves_formats_and_sets_extent() {
        let layout = gbuffer_like(640, 480);
        let resized = layout.resized(1920, 1080);
        assert_eq!((resized.width, resized.height), (1920, 1080));
        assert_eq!(resized.attachments, layout.attachments);
        assert_eq!(resized.label, layout.label);
        assert_eq!(resized.resized(640, 480), layout);
    }

    #[test]
    fn gbuffer_layout_costs_64_bytes() {
        assert_eq!(gbuffer_like(8, 8).color_bytes_per_sample(), 64);
        assert_eq!(gbuffer_like(8, 8).color_count(), 6);
    }

    #[test]
    fn gbuffer_layout_fits_raised_limit() {
        let layout = gbuffer_like(800, 600);
        assert!(layout
            .validate(&roomy_limits(), guaranteed)
            .is_ok());
    }

    #[test]
    fn gbuffer_layout_rejected_at_default_limit() {
        let err = gbuffer_like(800, 600)
            .validate(&wgpu::Limits::default(), guaranteed)
            .unwrap_err();
        assert!(err.contains("bytes per sample"), "{err}");
    }

    #[test]
    fn adapter_without_float_targets_rejects_gbuffer() {
        let no_float_targets = |format: wgpu::TextureFormat| {
            let mut features = guaranteed(format);
            if format == wgpu::TextureFormat::Rgba32Float {
                features
                    .allowed_usages
                    .remove(wgpu::TextureUsages::RENDER_ATTACHMENT);
            }
            features
        };
        let err = gbuffer_like(800, 600)
            .validate(&roomy_limits(), no_float_targets)
            .unwrap_err();
        assert!(err.contains("'position'"), "{err}");
        assert!(err.contains("not renderable"), "{err}");
    }

    #[test]
    fn zero_and_oversized_extents_rejected() {
        let limits = roomy_limits();
        assert!(gbuffer_like(0, 600).validate(&limits, guaranteed).is_err());
        let too_big = limits.max_texture_dimension_2d + 1;
        assert!(gbuffer_like(too_big, 4).validate(&limits, guaranteed).is_err());
    }

    #[test]
    fn two_depth_attachments_rejected() {
        let layout = SurfaceLayout::new(
            "Depths",
            4,
            4,
            vec![
                AttachmentDesc::depth("a", wgpu::TextureFormat::Depth32Float),
                AttachmentDesc::depth("b", wgpu::TextureFormat::Depth32Float),
            ],
        );
        assert!(layout
            .validate(&wgpu::Limits::default(), guaranteed)
            .is_err());
    }

    #[test]
    fn too_many_color_attachments_rejected() {
        let attachments = (0..9)
            .map(|i| {
                AttachmentDesc::color("c", i, wgpu::TextureFormat::R8Unorm)
            })
            .collect();
        let layout = SurfaceLayout::new("Many", 4, 4, attachments);
        let err = layout
            .validate(&wgpu::Limits::default(), guaranteed)
            .unwrap_err();
        assert!(err.contains("color attachments"), "{err}");
    }

    #[test]
    fn depth_format_in_color_slot_rejected() {
        let layout = SurfaceLayout::new(
            "Mismatch",
            4,
            4,
            vec![AttachmentDesc::color(
                "c",
                0,
                wgpu::TextureFormat::Depth32Float,
            )],
        );
        assert!(layout
            .validate(&wgpu::Limits::default(), guaranteed)
            .is_err());
    }

    #[test]
    fn cube_depth_layout_is_valid() {
        let layout = SurfaceLayout::new(
            "Cube",
            1024,
            1024,
            vec![AttachmentDesc::depth(
                "depth",
                wgpu::TextureFormat::Depth32Float,
            )
            .with_layers(6)],
        );
        assert!(layout
            .validate(&wgpu::Limits::default(), guaranteed)
            .is_ok());
        assert_eq!(
            layout.attachments[0].view_dimension(),
            wgpu::TextureViewDimension::Cube
        );
    }
}
