//! Render mode state machine and the per-frame pass sequence.
//!
//! A frame is planned first ([`FramePlan`]), purely from the active mode,
//! the antialiasing mode and the light list, and then executed step by
//! step into one command encoder. Mode requests land at the start of the
//! next frame.

use glam::Vec3;

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::gpu::pipeline_helpers::validation_scope;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::gpu::surface_set::{AttachmentDesc, SurfaceLayout, SurfaceSet};
use crate::options::{AntialiasingMode, Options, RenderMode};
use crate::renderer::antialiasing::{antialiasing_layout, AntialiasResolver};
use crate::renderer::frame::{DefaultTarget, FrameContext, PassKind};
use crate::renderer::gbuffer::{gbuffer_layout, GBuffer};
use crate::renderer::lights::Lights;
use crate::renderer::scene_pass::{SceneBindings, ScenePipelines, DEPTH_FORMAT};
use crate::renderer::screen_pass::ScreenPass;
use crate::renderer::ssao::{GeometryViews, Ssao};
use crate::scene::Drawable;

/// Pending and active render mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    active: RenderMode,
    pending: Option<RenderMode>,
}

impl ModeState {
    /// Start in `mode`.
    pub fn new(mode: RenderMode) -> Self {
        Self {
            active: mode,
            pending: None,
        }
    }

    /// Ask for `mode` from the next frame on.
    pub fn request(&mut self, mode: RenderMode) {
        self.pending = Some(mode);
    }

    /// Apply a pending request. Returns whether the active mode changed.
    pub fn begin_frame(&mut self) -> bool {
        match self.pending.take() {
            Some(mode) if mode != self.active => {
                self.active = mode;
                true
            }
            _ => false,
        }
    }

    /// The mode of the current frame.
    pub fn active(&self) -> RenderMode {
        self.active
    }

    /// A request waiting for the next frame.
    pub fn pending(&self) -> Option<RenderMode> {
        self.pending
    }
}

/// Mode actually rendered when optional components are missing: deferred
/// modes fall back to forward without a G-Buffer, SSAO falls back to plain
/// deferred without its surfaces.
pub fn resolve_mode(
    mode: RenderMode,
    has_gbuffer: bool,
    has_ssao: bool,
) -> RenderMode {
    match mode {
        mode if mode.is_deferred() && !has_gbuffer => RenderMode::Forward,
        RenderMode::DeferredWithSsao if !has_ssao => RenderMode::Deferred,
        other => other,
    }
}

/// The ordered steps of one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FramePlan {
    mode: RenderMode,
    steps: Vec<PassKind>,
}

impl FramePlan {
    /// Plan a frame. `antialiasing` only affects the forward mode;
    /// `shadow_casters` are the indices of lights owning a shadow map.
    pub fn build(
        mode: RenderMode,
        antialiasing: AntialiasingMode,
        light_count: usize,
        shadow_casters: &[usize],
    ) -> Self {
        let steps = match mode {
            RenderMode::Forward if antialiasing.uses_resolve() => vec![
                PassKind::ForwardGeometry { antialiased: true },
                PassKind::HistoryUpdate,
                PassKind::AntialiasResolve,
            ],
            RenderMode::Forward => {
                vec![PassKind::ForwardGeometry { antialiased: false }]
            }
            RenderMode::Deferred => vec![
                PassKind::GBufferGeometry,
                PassKind::DeferredLighting { ssao: false },
                PassKind::DepthBlit,
            ],
            RenderMode::DeferredWithSsao => vec![
                PassKind::GBufferGeometry,
                PassKind::SsaoRaw,
                PassKind::SsaoBlur,
                PassKind::DeferredLighting { ssao: true },
                PassKind::DepthBlit,
            ],
            RenderMode::Shadowed => shadow_casters
                .iter()
                .map(|&light| PassKind::ShadowDepth { light })
                .chain(std::iter::once(PassKind::ClearDefault))
                .chain(
                    (0..light_count)
                        .map(|light| PassKind::ShadowedLighting { light }),
                )
                .collect(),
        };
        Self { mode, steps }
    }

    /// The planned mode.
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Steps in execution order.
    pub fn steps(&self) -> &[PassKind] {
        &self.steps
    }
}

fn default_depth_layout(width: u32, height: u32) -> SurfaceLayout {
    SurfaceLayout::new(
        "Default Depth",
        width,
        height,
        vec![AttachmentDesc::depth("depth", DEPTH_FORMAT)],
    )
}

/// Keep an optional component, or log why it is unavailable.
fn optional<T>(what: &str, result: Result<T, PipelineError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{what} unavailable: {e}");
            None
        }
    }
}

/// Run `create` inside a validation error scope, so a texture or pipeline
/// the device rejects comes back as [`PipelineError::Validation`].
fn guarded<T>(
    device: &wgpu::Device,
    what: &str,
    create: impl FnOnce() -> Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    validation_scope(device, create)
        .map_err(|e| PipelineError::Validation {
            label: what.to_owned(),
            reason: e.to_string(),
        })
        .and_then(|result| result)
}

fn unavailable(what: &str) -> PipelineError {
    PipelineError::IncompleteSurface {
        label: what.to_owned(),
        reason: "component unavailable on this device".to_owned(),
    }
}

/// Build SSAO over a G-Buffer's position and normal attachments.
fn create_ssao(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    composer: &mut ShaderComposer,
    gbuffer: &GBuffer,
    options: &Options,
) -> Result<Ssao, PipelineError> {
    let (position, normal) = gbuffer
        .color_view(0)
        .zip(gbuffer.color_view(1))
        .ok_or_else(|| unavailable("G-Buffer"))?;
    Ssao::new(
        device,
        queue,
        composer,
        &GeometryViews { position, normal },
        gbuffer.surface().size(),
        options.ssao.clone(),
    )
}

/// Point `ssao` at the G-Buffer's current views and cache the lighting
/// group over its blurred output.
fn reconnect_ssao(
    device: &wgpu::Device,
    gbuffer: &mut GBuffer,
    ssao: &mut Ssao,
) -> Result<(), PipelineError> {
    let (position, normal) = gbuffer
        .color_view(0)
        .zip(gbuffer.color_view(1))
        .ok_or_else(|| unavailable("G-Buffer"))?;
    ssao.set_geometry_views(device, &GeometryViews { position, normal });
    gbuffer.connect_occlusion(device, ssao)
}

/// Owner of every pass and surface; renders one frame per call.
pub struct Renderer {
    options: Options,
    mode: ModeState,
    lights: Lights,
    bindings: SceneBindings,
    pipelines: ScenePipelines,
    depth: SurfaceSet,
    gbuffer: Option<GBuffer>,
    ssao: Option<Ssao>,
    resolver: Option<AntialiasResolver>,
    degraded_from: Option<RenderMode>,
    msaa_logged: bool,
}

impl Renderer {
    /// Build the pipeline for `context`'s format and size. The G-Buffer,
    /// SSAO and the antialiasing resolver are optional: if one cannot be
    /// created a warning is logged and the modes using it degrade.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::ShaderCompose`] if a required shader fails,
    /// or [`PipelineError::IncompleteSurface`] if the default depth surface
    /// or the fallback shadow surfaces cannot be created.
    pub fn new(
        context: &RenderContext,
        options: Options,
    ) -> Result<Self, PipelineError> {
        let device = &context.device;
        let (width, height) = context.size();
        let format = context.format();

        let mut composer = ShaderComposer::new()?;
        let lights = Lights::new(device, &options.lighting)?;
        let bindings = SceneBindings::new(device, lights.uniform_buffer());
        let pipelines = ScenePipelines::new(
            device,
            &mut composer,
            &bindings,
            &lights,
            format,
        )?;
        let depth = SurfaceSet::create(device, default_depth_layout(width, height))?;

        let mut gbuffer = optional(
            "G-Buffer",
            context
                .supports_layout(&gbuffer_layout(width, height))
                .and_then(|()| {
                    guarded(device, "G-Buffer", || {
                        GBuffer::create(
                            device,
                            &mut composer,
                            &bindings,
                            format,
                            width,
                            height,
                        )
                    })
                }),
        );
        let ssao = gbuffer.as_mut().and_then(|gbuffer| {
            let ssao = guarded(device, "SSAO", || {
                create_ssao(device, &context.queue, &mut composer, gbuffer, &options)
            })
            .and_then(|ssao| {
                gbuffer.connect_occlusion(device, &ssao)?;
                Ok(ssao)
            });
            optional("SSAO", ssao)
        });
        let resolver = optional(
            "Antialiasing resolver",
            context
                .supports_layout(&antialiasing_layout(format, width, height))
                .and_then(|()| {
                    guarded(device, "Antialiasing resolver", || {
                        AntialiasResolver::new(
                            device,
                            &mut composer,
                            format,
                            width,
                            height,
                            &options.antialiasing,
                        )
                    })
                }),
        );

        log::info!(
            "Renderer created ({width}x{height}, {format:?}, mode {:?})",
            options.render.mode
        );
        Ok(Self {
            mode: ModeState::new(options.render.mode),
            options,
            lights,
            bindings,
            pipelines,
            depth,
            gbuffer,
            ssao,
            resolver,
            degraded_from: None,
            msaa_logged: false,
        })
    }

    /// Switch render mode at the start of the next frame.
    pub fn request_mode(&mut self, mode: RenderMode) {
        self.options.render.mode = mode;
        self.mode.request(mode);
    }

    /// The mode of the last (or upcoming, if none pending) frame.
    pub fn mode(&self) -> RenderMode {
        self.mode.active()
    }

    /// Change the antialiasing mode.
    pub fn set_antialiasing(&mut self, mode: AntialiasingMode) {
        self.options.antialiasing.mode = mode;
        if let Some(resolver) = &mut self.resolver {
            resolver.set_options(&self.options.antialiasing);
        }
    }

    /// Push a full option set to every pass. Light 0 (when it has a
    /// position) is moved to the options' x/z.
    ///
    /// # Errors
    ///
    /// Propagates shadow-map reallocation failures.
    pub fn apply_options(
        &mut self,
        device: &wgpu::Device,
        options: &Options,
    ) -> Result<(), PipelineError> {
        let lighting = options.lighting.clamped();
        if options.render.mode != self.mode.active() {
            self.mode.request(options.render.mode);
        }
        self.lights
            .set_shadow_planes(lighting.shadow_near, lighting.shadow_far);
        self.lights
            .set_shadow_resolution(device, lighting.shadow_resolution)?;
        if let Some(position) = self.lights.get(0).and_then(|l| l.position()) {
            self.lights.set_position(
                0,
                Vec3::new(lighting.light_x, position.y, lighting.light_z),
            )?;
        }
        if let Some(ssao) = &mut self.ssao {
            ssao.set_options(options.ssao.clone());
        }
        if let Some(resolver) = &mut self.resolver {
            resolver.set_options(&options.antialiasing);
        }
        self.options = Options {
            lighting,
            ..options.clone()
        };
        Ok(())
    }

    /// Current options.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The light collection.
    pub fn lights(&self) -> &Lights {
        &self.lights
    }

    /// The light collection, for adding and editing lights.
    pub fn lights_mut(&mut self) -> &mut Lights {
        &mut self.lights
    }

    /// The G-Buffer, if this device supports it.
    pub fn gbuffer(&self) -> Option<&GBuffer> {
        self.gbuffer.as_ref()
    }

    /// The SSAO passes, if available.
    pub fn ssao(&self) -> Option<&Ssao> {
        self.ssao.as_ref()
    }

    /// The antialiasing resolver, if available.
    pub fn resolver(&self) -> Option<&AntialiasResolver> {
        self.resolver.as_ref()
    }

    /// Depth surface of the default target.
    pub fn depth_surface(&self) -> &SurfaceSet {
        &self.depth
    }

    /// Recreate every surface at the new extent. Zero extents are ignored.
    /// An optional component that fails to resize is dropped with a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::IncompleteSurface`] if the default depth
    /// surface cannot be recreated.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<(), PipelineError> {
        if width == 0 || height == 0 {
            return Ok(());
        }
        self.depth.resize(device, width, height)?;
        if let Some(Err(e)) = self.gbuffer.as_mut().map(|g| {
            guarded(device, "G-Buffer", || g.resize(device, width, height))
        }) {
            log::warn!("G-Buffer disabled after resize: {e}");
            self.gbuffer = None;
        }
        if let Some(mut ssao) = self.ssao.take() {
            let resized =
                guarded(device, "SSAO", || ssao.resize(device, width, height));
            match (self.gbuffer.as_mut(), resized) {
                (Some(gbuffer), Ok(())) => {
                    match reconnect_ssao(device, gbuffer, &mut ssao) {
                        Ok(()) => self.ssao = Some(ssao),
                        Err(e) => log::warn!("SSAO disabled after resize: {e}"),
                    }
                }
                (_, Err(e)) => log::warn!("SSAO disabled after resize: {e}"),
                (None, Ok(())) => {
                    log::warn!("SSAO disabled: no G-Buffer to read from");
                }
            }
        }
        if let Some(Err(e)) = self.resolver.as_mut().map(|r| {
            guarded(device, "Antialiasing resolver", || {
                r.resize(device, width, height)
            })
        }) {
            log::warn!("Antialiasing disabled after resize: {e}");
            self.resolver = None;
        }
        log::info!("Renderer resized to {width}x{height}");
        Ok(())
    }

    fn effective_mode(&mut self) -> RenderMode {
        let requested = self.mode.active();
        let mode =
            resolve_mode(requested, self.gbuffer.is_some(), self.ssao.is_some());
        if mode == requested {
            self.degraded_from = None;
        } else if self.degraded_from != Some(requested) {
            log::warn!("{requested:?} unavailable, rendering {mode:?}");
            self.degraded_from = Some(requested);
        }
        mode
    }

    fn effective_antialiasing(&mut self) -> AntialiasingMode {
        match self.options.antialiasing.mode {
            AntialiasingMode::Msaa => {
                if !self.msaa_logged {
                    log::info!("MSAA is not modeled separately, resolving nothing");
                    self.msaa_logged = true;
                }
                AntialiasingMode::None
            }
            mode if mode.uses_resolve() && self.resolver.is_none() => {
                AntialiasingMode::None
            }
            mode => mode,
        }
    }

    /// Plan the next frame without recording anything.
    pub fn plan(&mut self) -> FramePlan {
        let mode = self.effective_mode();
        let antialiasing = self.effective_antialiasing();
        FramePlan::build(
            mode,
            antialiasing,
            self.lights.len(),
            &self.lights.shadow_casters(),
        )
    }

    /// Render one frame of `drawables` seen by `camera` into `target`,
    /// submit it, and return the passes that were recorded.
    ///
    /// # Errors
    ///
    /// Returns the first pass failure; nothing is submitted in that case.
    pub fn render(
        &mut self,
        context: &RenderContext,
        target: &wgpu::TextureView,
        camera: &Camera,
        drawables: &[&dyn Drawable],
    ) -> Result<Vec<PassKind>, PipelineError> {
        if self.mode.begin_frame() {
            log::info!("Render mode -> {:?}", self.mode.active());
            if let Some(resolver) = &mut self.resolver {
                resolver.invalidate_history();
            }
        }
        let plan = self.plan();

        let device = &context.device;
        let queue = &context.queue;
        self.lights.update(queue);
        self.bindings.prepare(device, queue, camera, drawables);

        let mut encoder = context.create_encoder();
        let trace = {
            let mut passes = FramePasses {
                lights: &self.lights,
                bindings: &self.bindings,
                pipelines: &self.pipelines,
                gbuffer: self.gbuffer.as_ref(),
                ssao: self.ssao.as_ref(),
                resolver: self.resolver.as_mut(),
                ao_strength: self.options.lighting.ao_strength,
                camera,
                drawables,
            };
            let mut frame = FrameContext::new(
                device,
                queue,
                &mut encoder,
                DefaultTarget {
                    color: target,
                    depth: &self.depth,
                },
            );
            for &step in plan.steps() {
                passes.execute(&mut frame, step)?;
            }
            frame.trace
        };
        context.submit(encoder);
        Ok(trace)
    }
}

/// Split borrows of the renderer for one frame.
struct FramePasses<'r> {
    lights: &'r Lights,
    bindings: &'r SceneBindings,
    pipelines: &'r ScenePipelines,
    gbuffer: Option<&'r GBuffer>,
    ssao: Option<&'r Ssao>,
    resolver: Option<&'r mut AntialiasResolver>,
    ao_strength: f32,
    camera: &'r Camera,
    drawables: &'r [&'r dyn Drawable],
}

impl FramePasses<'_> {
    fn gbuffer(&self) -> Result<&GBuffer, PipelineError> {
        self.gbuffer.ok_or_else(|| unavailable("G-Buffer"))
    }

    fn ssao(&self) -> Result<&Ssao, PipelineError> {
        self.ssao.ok_or_else(|| unavailable("SSAO"))
    }

    fn resolver(&mut self) -> Result<&mut AntialiasResolver, PipelineError> {
        self.resolver
            .as_deref_mut()
            .ok_or_else(|| unavailable("Antialiasing"))
    }

    fn execute(
        &mut self,
        frame: &mut FrameContext<'_>,
        step: PassKind,
    ) -> Result<(), PipelineError> {
        let (lights, pipelines, bindings) =
            (self.lights, self.pipelines, self.bindings);
        let (camera, drawables) = (self.camera, self.drawables);
        match step {
            PassKind::ForwardGeometry { antialiased: true } => {
                let resolver = self.resolver()?;
                {
                    let mut pass = resolver.bind_for_writing(frame.encoder)?;
                    pass.set_pipeline(&pipelines.forward);
                    bindings.draw_all(&mut pass, drawables);
                }
                frame.record(step);
            }
            PassKind::ForwardGeometry { antialiased: false } => {
                {
                    let mut pass = frame.default_pass("Forward Pass", true, true)?;
                    pass.set_pipeline(&pipelines.forward);
                    bindings.draw_all(&mut pass, drawables);
                }
                frame.record(step);
            }
            PassKind::HistoryUpdate => self.resolver()?.update_history(frame)?,
            PassKind::AntialiasResolve => {
                self.resolver()?.resolve(frame, camera);
            }
            PassKind::GBufferGeometry => {
                {
                    let mut pass = self.gbuffer()?.bind_for_writing(frame.encoder);
                    bindings.draw_all(&mut pass, drawables);
                }
                frame.record(step);
            }
            PassKind::SsaoRaw => self.ssao()?.render_raw(frame, camera),
            PassKind::SsaoBlur => self.ssao()?.render_blur(frame),
            PassKind::DeferredLighting { ssao: false } => {
                self.gbuffer()?.resolve_lighting(
                    frame,
                    lights,
                    camera,
                    self.ao_strength,
                )?;
            }
            PassKind::DeferredLighting { ssao: true } => {
                self.gbuffer()?.resolve_lighting_with_ssao(
                    frame,
                    lights,
                    camera,
                    self.ao_strength,
                    self.ssao()?,
                )?;
            }
            PassKind::DepthBlit => self.gbuffer()?.blit_depth(frame)?,
            PassKind::ShadowDepth { light } => lights.render_shadow_map(
                frame,
                light,
                pipelines,
                bindings,
                drawables,
            )?,
            PassKind::ClearDefault => {
                drop(frame.default_pass("Clear Default Target", true, true)?);
                frame.record(step);
            }
            PassKind::ShadowedLighting { light } => {
                let bind_group = lights.bind_for_lighting(frame.queue, light)?;
                {
                    let mut pass =
                        frame.default_pass("Shadowed Lighting Pass", false, true)?;
                    pass.set_pipeline(&pipelines.shadowed);
                    pass.set_bind_group(2, bind_group, &[]);
                    bindings.draw_all(&mut pass, drawables);
                }
                frame.record(step);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_plan_follows_antialiasing() {
        let plan = FramePlan::build(
            RenderMode::Forward,
            AntialiasingMode::Temporal,
            3,
            &[0, 1],
        );
        assert_eq!(
            plan.steps(),
            [
                PassKind::ForwardGeometry { antialiased: true },
                PassKind::HistoryUpdate,
                PassKind::AntialiasResolve,
            ]
        );
        let fxaa =
            FramePlan::build(RenderMode::Forward, AntialiasingMode::Fxaa, 0, &[]);
        assert_eq!(fxaa.steps().len(), 3);

        for mode in [AntialiasingMode::None, AntialiasingMode::Msaa] {
            let plan = FramePlan::build(RenderMode::Forward, mode, 3, &[0]);
            assert_eq!(
                plan.steps(),
                [PassKind::ForwardGeometry { antialiased: false }]
            );
        }
    }

    #[test]
    fn deferred_plans_end_with_depth_blit() {
        let plain = FramePlan::build(
            RenderMode::Deferred,
            AntialiasingMode::Temporal,
            2,
            &[0],
        );
        assert_eq!(
            plain.steps(),
            [
                PassKind::GBufferGeometry,
                PassKind::DeferredLighting { ssao: false },
                PassKind::DepthBlit,
            ]
        );
        let ssao = FramePlan::build(
            RenderMode::DeferredWithSsao,
            AntialiasingMode::None,
            2,
            &[0],
        );
        assert_eq!(
            ssao.steps(),
            [
                PassKind::GBufferGeometry,
                PassKind::SsaoRaw,
                PassKind::SsaoBlur,
                PassKind::DeferredLighting { ssao: true },
                PassKind::DepthBlit,
            ]
        );
    }

    #[test]
    fn shadowed_plan_renders_maps_before_lighting() {
        let plan = FramePlan::build(
            RenderMode::Shadowed,
            AntialiasingMode::Temporal,
            4,
            &[0, 2],
        );
        assert_eq!(
            plan.steps(),
            [
                PassKind::ShadowDepth { light: 0 },
                PassKind::ShadowDepth { light: 2 },
                PassKind::ClearDefault,
                PassKind::ShadowedLighting { light: 0 },
                PassKind::ShadowedLighting { light: 1 },
                PassKind::ShadowedLighting { light: 2 },
                PassKind::ShadowedLighting { light: 3 },
            ]
        );
        assert!(!plan.steps().contains(&PassKind::AntialiasResolve));
    }

    #[test]
    fn shadowed_plan_without_lights_only_clears() {
        let plan =
            FramePlan::build(RenderMode::Shadowed, AntialiasingMode::None, 0, &[]);
        assert_eq!(plan.steps(), [PassKind::ClearDefault]);
    }

    #[test]
    fn only_forward_resolves_antialiasing() {
        for mode in RenderMode::ALL {
            let plan = FramePlan::build(mode, AntialiasingMode::Temporal, 1, &[0]);
            let resolves = plan.steps().contains(&PassKind::AntialiasResolve);
            assert_eq!(resolves, mode == RenderMode::Forward, "{mode:?}");
        }
    }

    #[test]
    fn missing_components_degrade_modes() {
        use RenderMode::{Deferred, DeferredWithSsao, Forward, Shadowed};
        assert_eq!(resolve_mode(Deferred, false, false), Forward);
        assert_eq!(resolve_mode(DeferredWithSsao, false, true), Forward);
        assert_eq!(resolve_mode(DeferredWithSsao, true, false), Deferred);
        assert_eq!(resolve_mode(DeferredWithSsao, true, true), DeferredWithSsao);
        assert_eq!(resolve_mode(Shadowed, false, false), Shadowed);
        assert_eq!(resolve_mode(Forward, true, true), Forward);
    }

    #[test]
    fn deferred_without_gbuffer_plans_a_forward_frame() {
        let forward =
            FramePlan::build(RenderMode::Forward, AntialiasingMode::Temporal, 2, &[0]);
        for requested in [RenderMode::Deferred, RenderMode::DeferredWithSsao] {
            for has_ssao in [false, true] {
                let mode = resolve_mode(requested, false, has_ssao);
                let plan =
                    FramePlan::build(mode, AntialiasingMode::Temporal, 2, &[0]);
                assert_eq!(plan, forward, "{requested:?}");
                assert!(!plan.steps().contains(&PassKind::GBufferGeometry));
            }
        }
        let without_ssao = FramePlan::build(
            resolve_mode(RenderMode::DeferredWithSsao, true, false),
            AntialiasingMode::None,
            1,
            &[],
        );
        assert!(!without_ssao.steps().contains(&PassKind::SsaoRaw));
        assert_eq!(without_ssao.mode(), RenderMode::Deferred);
    }

    #[test]
    fn mode_requests_apply_at_next_frame() {
        let mut state = ModeState::new(RenderMode::Forward);
        state.request(RenderMode::Shadowed);
        assert_eq!(state.active(), RenderMode::Forward);
        assert_eq!(state.pending(), Some(RenderMode::Shadowed));

        assert!(state.begin_frame());
        assert_eq!(state.active(), RenderMode::Shadowed);
        assert!(!state.begin_frame());

        state.request(RenderMode::Shadowed);
        assert!(!state.begin_frame());
    }

    #[test]
    fn last_request_before_a_frame_wins() {
        let mut state = ModeState::new(RenderMode::Forward);
        state.request(RenderMode::Deferred);
        state.request(RenderMode::DeferredWithSsao);
        assert!(state.begin_frame());
        assert_eq!(state.active(), RenderMode::DeferredWithSsao);
    }

    #[test]
    fn default_depth_layout_is_depth_only() {
        let layout = default_depth_layout(320, 240);
        assert_eq!(layout.color_count(), 0);
        assert_eq!(layout.attachments[0].format, DEPTH_FORMAT);
    }
}
