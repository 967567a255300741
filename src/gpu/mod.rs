//! GPU resource management utilities.
//!
//! Provides wgpu device/surface initialization, owned render targets,
//! dynamic buffers, pipeline boilerplate and shader composition.

/// Growable GPU buffers with automatic reallocation.
pub mod dynamic_buffer;
/// Shared wgpu boilerplate for screen-space and scene pipelines.
pub mod pipeline_helpers;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
/// WGSL shader composition with `#import` support via naga-oil.
pub mod shader_composer;
/// Render targets owning a fixed list of attachments.
pub mod surface_set;
/// Offscreen render targets and texture readback.
pub mod texture;
