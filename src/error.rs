//! Crate-level error types.

use std::fmt;

use crate::gpu::render_context::RenderContextError;

/// Errors produced by the penumbra crate.
#[derive(Debug)]
pub enum PipelineError {
    /// GPU context initialization failure.
    Gpu(RenderContextError),
    /// A surface set could not be created with the requested layout on this
    /// device (the wgpu analogue of an incomplete framebuffer).
    IncompleteSurface {
        /// Label of the surface set that failed.
        label: String,
        /// Human-readable reason reported by layout validation.
        reason: String,
    },
    /// WGSL composition or validation failure.
    ShaderCompose(String),
    /// The device rejected resource or pipeline creation for a component.
    Validation {
        /// Component whose creation failed.
        label: String,
        /// Message of the captured wgpu error.
        reason: String,
    },
    /// A light index was out of range for the light collection.
    LightIndex(usize),
    /// The light collection already holds the maximum number of lights.
    LightLimit(usize),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// GPU readback failure (buffer mapping or device poll).
    Readback(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::IncompleteSurface { label, reason } => {
                write!(f, "surface set '{label}' is incomplete: {reason}")
            }
            Self::ShaderCompose(msg) => {
                write!(f, "shader composition error: {msg}")
            }
            Self::Validation { label, reason } => {
                write!(f, "{label} rejected by the device: {reason}")
            }
            Self::LightIndex(index) => {
                write!(f, "no light at index {index}")
            }
            Self::LightLimit(max) => {
                write!(f, "light collection is full ({max} lights)")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Readback(msg) => write!(f, "readback error: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RenderContextError> for PipelineError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
