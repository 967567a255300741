//! Per-frame state threaded explicitly through every pass.
//!
//! Nothing is bound globally: each pass opens its own render pass on the
//! encoder held here, sets its own bind groups, and drops the pass before
//! returning. The next pass therefore always starts from a clean slate.

use crate::error::PipelineError;
use crate::gpu::surface_set::{Attachment, SurfaceSet};

/// Background color of the default target.
pub const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.1,
    g: 0.1,
    b: 0.1,
    a: 1.0,
};

/// One step of a frame, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassKind {
    /// Direct-lit geometry, into the resolve surface when `antialiased`,
    /// otherwise straight into the default target.
    ForwardGeometry {
        /// Whether the geometry is redirected into the resolve surface.
        antialiased: bool,
    },
    /// Copy of the previous resolved color into the history attachment.
    HistoryUpdate,
    /// Full-screen resolve into the default target.
    AntialiasResolve,
    /// Scene geometry into the G-Buffer.
    GBufferGeometry,
    /// Raw hemisphere occlusion.
    SsaoRaw,
    /// Box blur of the raw occlusion.
    SsaoBlur,
    /// Full-screen deferred lighting.
    DeferredLighting {
        /// Whether the blurred occlusion texture is bound.
        ssao: bool,
    },
    /// G-Buffer depth copied into the default depth surface.
    DepthBlit,
    /// Depth of every shadow caster from light `light`.
    ShadowDepth {
        /// Light index.
        light: usize,
    },
    /// Clear of the default color and depth targets.
    ClearDefault,
    /// Additive contribution of light `light` with its shadow map.
    ShadowedLighting {
        /// Light index.
        light: usize,
    },
}

/// The caller's color target plus the pipeline-owned depth surface that
/// goes with it.
pub struct DefaultTarget<'a> {
    /// Color view of the presented image.
    pub color: &'a wgpu::TextureView,
    /// Depth surface matching the color target's extent.
    pub depth: &'a SurfaceSet,
}

impl<'a> DefaultTarget<'a> {
    /// The depth attachment of the default target.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the depth surface
    /// was built without a depth attachment.
    pub fn depth_attachment(&self) -> Result<&'a Attachment, PipelineError> {
        self.depth
            .depth()
            .ok_or_else(|| PipelineError::IncompleteSurface {
                label: self.depth.layout().label.clone(),
                reason: "missing depth attachment".to_owned(),
            })
    }
}

/// Everything a pass needs to record its commands.
pub struct FrameContext<'a> {
    /// Device for pass-scoped bind groups.
    pub device: &'a wgpu::Device,
    /// Queue for uniform uploads.
    pub queue: &'a wgpu::Queue,
    /// The single encoder every pass of the frame records into.
    pub encoder: &'a mut wgpu::CommandEncoder,
    /// Where the frame ends up.
    pub target: DefaultTarget<'a>,
    /// Passes recorded so far.
    pub trace: Vec<PassKind>,
}

impl<'a> FrameContext<'a> {
    /// Start a frame.
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        encoder: &'a mut wgpu::CommandEncoder,
        target: DefaultTarget<'a>,
    ) -> Self {
        Self {
            device,
            queue,
            encoder,
            target,
            trace: Vec::new(),
        }
    }

    /// Note that `pass` has been recorded.
    pub fn record(&mut self, pass: PassKind) {
        self.trace.push(pass);
    }

    /// Open a render pass on the default target.
    ///
    /// `clear` clears color to [`CLEAR_COLOR`] and depth to 1.0; otherwise
    /// both are loaded. With `use_depth` false the pass has no depth
    /// attachment.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if depth is requested
    /// and the default depth surface has none.
    pub fn default_pass(
        &mut self,
        label: &str,
        clear: bool,
        use_depth: bool,
    ) -> Result<wgpu::RenderPass<'_>, PipelineError> {
        let depth_stencil_attachment = if use_depth {
            let depth = self.target.depth_attachment()?;
            Some(wgpu::RenderPassDepthStencilAttachment {
                view: &depth.view,
                depth_ops: Some(wgpu::Operations {
                    load: if clear {
                        wgpu::LoadOp::Clear(1.0)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            })
        } else {
            None
        };
        let color_load = if clear {
            wgpu::LoadOp::Clear(CLEAR_COLOR)
        } else {
            wgpu::LoadOp::Load
        };
        Ok(self.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: self.target.color,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment,
            timestamp_writes: None,
            occlusion_query_set: None,
        }))
    }
}
