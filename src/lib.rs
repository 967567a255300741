// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![warn(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Deferred-shading render pipeline on wgpu.
//!
//! Penumbra turns a list of opaque drawables and a set of dynamic lights
//! into a shaded color image every frame. Four render modes are supported:
//! forward (optionally antialiased), deferred, deferred with screen-space
//! ambient occlusion, and shadow-mapped lighting with one additive pass per
//! light.
//!
//! # Key entry points
//!
//! - [`renderer::pipeline::Renderer`] - owns every pass and renders frames
//! - [`renderer::lights::Lights`] - the light collection and shadow maps
//! - [`options::Options`] - runtime configuration with TOML presets
//! - [`gpu::render_context::RenderContext`] - device, queue and surface
//!
//! # Frame structure
//!
//! Each frame is planned up front ([`renderer::pipeline::FramePlan`]) and
//! recorded into a single command encoder. Passes receive an explicit
//! [`renderer::frame::FrameContext`]; bind groups never outlive the render
//! pass that set them. Intermediate targets are owned
//! [`gpu::surface_set::SurfaceSet`]s that are validated against the device
//! before allocation and replaced wholesale on resize.

pub mod camera;
pub mod error;
pub mod gpu;
pub mod options;
pub mod renderer;
pub mod scene;

pub use camera::Camera;
pub use error::PipelineError;
pub use gpu::render_context::RenderContext;
pub use options::{AntialiasingMode, Options, RenderMode};
pub use renderer::frame::PassKind;
pub use renderer::lights::{Light, Lights};
pub use renderer::pipeline::Renderer;
pub use scene::{Drawable, Material, Primitive};
