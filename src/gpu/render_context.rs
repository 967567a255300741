use std::fmt;

use crate::error::PipelineError;
use crate::gpu::surface_set::SurfaceLayout;

/// Device setup failures.
#[derive(Debug)]
pub enum RenderContextError {
    /// The window handle could not back a wgpu surface.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No adapter matched the request.
    AdapterRequest(wgpu::RequestAdapterError),
    /// The adapter refused the requested limits or features.
    DeviceRequest(wgpu::RequestDeviceError),
    /// The adapter has no configuration for the window surface.
    UnsupportedSurface,
}

impl fmt::Display for RenderContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SurfaceCreation(e) => {
                write!(f, "surface creation failed: {e}")
            }
            Self::AdapterRequest(e) => {
                write!(f, "no compatible GPU adapter found: {e}")
            }
            Self::DeviceRequest(e) => write!(f, "device request failed: {e}"),
            Self::UnsupportedSurface => {
                write!(f, "surface configuration not supported by adapter")
            }
        }
    }
}

impl std::error::Error for RenderContextError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::SurfaceCreation(e) => Some(e),
            Self::AdapterRequest(e) => Some(e),
            Self::DeviceRequest(e) => Some(e),
            Self::UnsupportedSurface => None,
        }
    }
}

/// Adapter, device and queue, plus the window surface when there is one.
pub struct RenderContext {
    /// The adapter the device was opened on; queried for per-format
    /// support before optional surfaces are allocated.
    pub adapter: wgpu::Adapter,
    /// Logical device.
    pub device: wgpu::Device,
    /// Command queue.
    pub queue: wgpu::Queue,
    /// Presentation surface. `None` for headless contexts.
    pub surface: Option<wgpu::Surface<'static>>,
    /// Format and extent of the default target.
    pub config: wgpu::SurfaceConfiguration,
}

/// The G-Buffer writes six color attachments per sample, which is more
/// than the WebGPU default of 32 bytes, so ask for the adapter's maximum.
fn required_limits(adapter: &wgpu::Adapter) -> wgpu::Limits {
    let supported = adapter.limits();
    wgpu::Limits {
        max_color_attachment_bytes_per_sample: supported
            .max_color_attachment_bytes_per_sample,
        max_color_attachments: supported.max_color_attachments.min(8),
        ..wgpu::Limits::default()
    }
    .using_resolution(supported)
}

async fn open_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
) -> Result<(wgpu::Adapter, wgpu::Device, wgpu::Queue), RenderContextError> {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            compatible_surface: surface,
            power_preference: wgpu::PowerPreference::HighPerformance,
            ..Default::default()
        })
        .await
        .map_err(RenderContextError::AdapterRequest)?;
    let info = adapter.get_info();
    log::info!("Using adapter '{}' ({:?})", info.name, info.backend);
    let (device, queue) = adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("Penumbra Device"),
            required_features: wgpu::Features::empty(),
            required_limits: required_limits(&adapter),
            ..Default::default()
        })
        .await
        .map_err(RenderContextError::DeviceRequest)?;
    Ok((adapter, device, queue))
}

impl RenderContext {
    /// Open a device presenting to `window` at `initial_size`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderContextError`] if any setup step fails.
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        initial_size: (u32, u32),
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window)
            .map_err(RenderContextError::SurfaceCreation)?;
        let (adapter, device, queue) =
            open_adapter(&instance, Some(&surface)).await?;

        let mut config = surface
            .get_default_config(&adapter, initial_size.0, initial_size.1)
            .ok_or(RenderContextError::UnsupportedSurface)?;
        config.width = initial_size.0.max(1);
        config.height = initial_size.1.max(1);
        config.present_mode = wgpu::PresentMode::Fifo;
        surface.configure(&device, &config);

        Ok(Self {
            adapter,
            device,
            queue,
            surface: Some(surface),
            config,
        })
    }

    /// Open a device with no surface. Frames go to caller-owned textures of
    /// `format` and `width`×`height`.
    ///
    /// # Errors
    ///
    /// Returns [`RenderContextError`] if no adapter or device is available.
    pub async fn new_headless(
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    ) -> Result<Self, RenderContextError> {
        let instance = wgpu::Instance::default();
        let (adapter, device, queue) = open_adapter(&instance, None).await?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            desired_maximum_frame_latency: 2,
            alpha_mode: wgpu::CompositeAlphaMode::Auto,
            view_formats: vec![],
        };
        Ok(Self {
            adapter,
            device,
            queue,
            surface: None,
            config,
        })
    }

    /// Check `layout` against the device limits and the adapter's real
    /// per-format features, which may be narrower than the WebGPU
    /// guarantees (downlevel and GL backends).
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] with the first reason
    /// the layout cannot be allocated here.
    pub fn supports_layout(
        &self,
        layout: &SurfaceLayout,
    ) -> Result<(), PipelineError> {
        layout
            .validate(&self.device.limits(), |format| {
                self.adapter.get_texture_format_features(format)
            })
            .map_err(|reason| PipelineError::IncompleteSurface {
                label: layout.label.clone(),
                reason,
            })
    }

    /// Color format of the default target.
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// `(width, height)` of the default target.
    pub fn size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }

    /// Track a new window size. Zero extents are ignored.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }

    /// Next swapchain texture.
    ///
    /// # Errors
    ///
    /// Returns [`wgpu::SurfaceError`] from the surface, or `Lost` for a
    /// headless context.
    pub fn get_next_frame(
        &self,
    ) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface
            .as_ref()
            .map_or(Err(wgpu::SurfaceError::Lost), |surface| {
                surface.get_current_texture()
            })
    }

    /// Encoder for one frame.
    pub fn create_encoder(&self) -> wgpu::CommandEncoder {
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            })
    }

    /// Finish and submit `encoder`.
    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        let _ = self.queue.submit(std::iter::once(encoder.finish()));
    }
}
