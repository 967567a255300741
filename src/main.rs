//! Interactive viewer: a small lit scene with keyboard control over
//! render mode, antialiasing, light position and AO strength.

use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use penumbra::{
    Camera, Drawable, Material, Options, PipelineError, Primitive,
    RenderContext, RenderMode, Renderer,
};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

const LIGHT_STEP: f32 = 0.5;
const AO_STEP: f32 = 0.05;

/// Everything that only exists once a window is up.
struct Viewer {
    window: Arc<Window>,
    context: RenderContext,
    renderer: Renderer,
    camera: Camera,
    primitives: Vec<Primitive>,
}

impl Viewer {
    fn new(window: Arc<Window>, options: Options) -> Result<Self, PipelineError> {
        let size = window.inner_size();
        let (width, height) = (size.width.max(1), size.height.max(1));
        let context =
            pollster::block_on(RenderContext::new(window.clone(), (width, height)))?;
        let mut renderer = Renderer::new(&context, options)?;
        let device = &context.device;

        let lighting = renderer.options().lighting.clone();
        let lights = renderer.lights_mut();
        let _ = lights.add_point_light(
            device,
            Vec3::new(lighting.light_x, 5.0, lighting.light_z),
            Vec3::ONE,
            10.0,
        )?;
        let _ = lights.add_spotlight(
            device,
            Vec3::new(5.0, 5.0, 5.0),
            Vec3::new(-1.0, -1.0, -1.0).normalize(),
            Vec3::new(1.0, 0.9, 0.8),
            40.0,
            12.5_f32.to_radians().cos(),
            30.0_f32.to_radians().cos(),
        )?;
        let _ = lights.add_directional_light(
            device,
            Vec3::new(-6.0, 8.0, -6.0),
            Vec3::ZERO,
            Vec3::new(0.6, 0.6, 0.7),
            1.0,
        )?;
        let _ = lights.add_ambient_light(device, Vec3::ONE, 0.1)?;
        lights.log_summary();

        let primitives = vec![
            Primitive::plane(device, 20.0)
                .at(Vec3::new(0.0, -0.5, 0.0))
                .with_material(Material::with_albedo(Vec3::splat(0.8))),
            Primitive::cube(device)
                .with_material(Material::with_albedo(Vec3::new(0.8, 0.3, 0.2))),
            Primitive::sphere(device, 0.6)
                .at(Vec3::new(2.0, 0.1, 1.0))
                .with_material(Material::with_albedo(Vec3::new(0.2, 0.4, 0.8))),
        ];

        let mut camera = Camera::default();
        camera.set_viewport(width, height);

        Ok(Self {
            window,
            context,
            renderer,
            camera,
            primitives,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.context.resize(width, height);
        self.camera.set_viewport(width, height);
        if let Err(e) = self.renderer.resize(&self.context.device, width, height) {
            log::error!("resize failed: {e}");
        }
    }

    fn redraw(&mut self) {
        let frame = match self.context.get_next_frame() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost) => {
                let inner = self.window.inner_size();
                self.resize(inner.width, inner.height);
                return;
            }
            Err(e) => {
                log::error!("surface error: {e:?}");
                return;
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let drawables: Vec<&dyn Drawable> = self
            .primitives
            .iter()
            .map(|p| {
                let drawable: &dyn Drawable = p;
                drawable
            })
            .collect();
        if let Err(e) =
            self.renderer
                .render(&self.context, &view, &self.camera, &drawables)
        {
            log::error!("render error: {e}");
        }
        self.window.pre_present_notify();
        frame.present();
    }

    fn update_options(&mut self, edit: impl FnOnce(&mut Options)) {
        let mut options = self.renderer.options().clone();
        edit(&mut options);
        if let Err(e) =
            self.renderer.apply_options(&self.context.device, &options)
        {
            log::error!("failed to apply options: {e}");
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        let mode_index = match code {
            KeyCode::Digit1 => Some(0),
            KeyCode::Digit2 => Some(1),
            KeyCode::Digit3 => Some(2),
            KeyCode::Digit4 => Some(3),
            _ => None,
        };
        if let Some(mode) = mode_index.and_then(|i| RenderMode::ALL.get(i)) {
            self.renderer.request_mode(*mode);
            return;
        }
        match code {
            KeyCode::KeyT => {
                let next = self.renderer.options().antialiasing.mode.next();
                log::info!("Antialiasing -> {next:?}");
                self.renderer.set_antialiasing(next);
            }
            KeyCode::ArrowLeft => {
                self.update_options(|o| o.lighting.light_x -= LIGHT_STEP);
            }
            KeyCode::ArrowRight => {
                self.update_options(|o| o.lighting.light_x += LIGHT_STEP);
            }
            KeyCode::ArrowUp => {
                self.update_options(|o| o.lighting.light_z -= LIGHT_STEP);
            }
            KeyCode::ArrowDown => {
                self.update_options(|o| o.lighting.light_z += LIGHT_STEP);
            }
            KeyCode::BracketLeft => {
                self.update_options(|o| o.lighting.ao_strength -= AO_STEP);
            }
            KeyCode::BracketRight => {
                self.update_options(|o| o.lighting.ao_strength += AO_STEP);
            }
            _ => {}
        }
    }
}

struct RenderApp {
    options: Option<Options>,
    viewer: Option<Viewer>,
}

impl RenderApp {
    fn new(options: Options) -> Self {
        Self {
            options: Some(options),
            viewer: None,
        }
    }
}

impl ApplicationHandler for RenderApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        let Some(options) = self.options.take() else {
            return;
        };
        let attrs = Window::default_attributes()
            .with_title("Penumbra")
            .with_inner_size(winit::dpi::LogicalSize::new(1280, 720));
        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };
        match Viewer::new(window.clone(), options) {
            Ok(viewer) => {
                window.request_redraw();
                self.viewer = Some(viewer);
            }
            Err(e) => {
                log::error!("failed to start renderer: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _id: WindowId,
        event: WindowEvent,
    ) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                viewer.resize(size.width, size.height);
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let inner = viewer.window.inner_size();
                viewer.resize(inner.width, inner.height);
            }

            WindowEvent::RedrawRequested => {
                viewer.redraw();
                viewer.window.request_redraw();
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed && !event.repeat {
                    if let PhysicalKey::Code(code) = event.physical_key {
                        viewer.handle_key(code);
                    }
                }
            }

            _ => (),
        }
    }
}

fn load_options() -> Options {
    let Some(path) = std::env::args().nth(1) else {
        return Options::default();
    };
    match Options::load(Path::new(&path)) {
        Ok(options) => {
            log::info!("Loaded options from {path}");
            options
        }
        Err(e) => {
            log::warn!("{e}; using default options");
            Options::default()
        }
    }
}

fn main() {
    env_logger::init();

    let options = load_options();

    let event_loop = match EventLoop::new() {
        Ok(event_loop) => event_loop,
        Err(e) => {
            log::error!("failed to create event loop: {e}");
            std::process::exit(1);
        }
    };
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = RenderApp::new(options);
    if let Err(e) = event_loop.run_app(&mut app) {
        log::error!("event loop error: {e}");
        std::process::exit(1);
    }
}
