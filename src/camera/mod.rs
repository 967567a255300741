//! Perspective camera consumed by the render pipeline.
//!
//! The pipeline reads view/projection matrices, the eye position and the
//! clip planes; camera control lives with the caller.

/// Camera struct and its GPU uniform.
pub mod core;

pub use self::core::{Camera, CameraUniform};
