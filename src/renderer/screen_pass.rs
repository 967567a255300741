use crate::error::PipelineError;

/// Uniform interface for full-screen passes that own resolution-dependent
/// surfaces.
pub trait ScreenPass {
    /// Name used in logs.
    fn label(&self) -> &'static str;
    /// Recreate every resolution-dependent surface and the bind groups that
    /// reference them. External texture views must be updated via
    /// pass-specific setters BEFORE calling this.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if a surface cannot be
    /// recreated at the new extent; the previous surfaces are kept.
    fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError>;
}
