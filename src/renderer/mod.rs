//! The deferred-shading pipeline.
//!
//! [`pipeline::Renderer`] owns every pass and surface and records one frame
//! per call. The passes themselves live in their own modules and only meet
//! through the explicit [`frame::FrameContext`].

/// Antialiasing resolve of the forward path.
pub mod antialiasing;
/// Per-frame context and pass identities.
pub mod frame;
/// G-Buffer and deferred lighting.
pub mod gbuffer;
/// Lights and shadow maps.
pub mod lights;
/// Mode state machine, frame plans and the renderer.
pub mod pipeline;
/// Camera, light list and object bindings shared by scene passes.
pub mod scene_pass;
/// Resizable screen-space passes.
pub mod screen_pass;
/// Screen-space ambient occlusion.
pub mod ssao;

#[cfg(test)]
mod frame_tests;
