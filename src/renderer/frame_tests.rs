//! End-to-end frames on a headless device.
//!
//! These need a GPU adapter and are ignored by default; run them with
//! `cargo test -- --ignored`.

use glam::Vec3;

use crate::camera::Camera;
use crate::error::PipelineError;
use crate::gpu::pipeline_helpers::validation_scope;
use crate::gpu::render_context::RenderContext;
use crate::gpu::shader_composer::ShaderComposer;
use crate::gpu::surface_set::{AttachmentDesc, SurfaceLayout, SurfaceSet};
use crate::gpu::texture::{read_texture, RenderTarget};
use crate::options::{AntialiasingMode, LightingOptions, Options, RenderMode};
use crate::renderer::frame::{DefaultTarget, FrameContext, PassKind};
use crate::renderer::lights::{Light, Lights};
use crate::renderer::pipeline::Renderer;
use crate::renderer::scene_pass::{SceneBindings, ScenePipelines, DEPTH_FORMAT};
use crate::scene::{Drawable, Primitive};

const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
const SIZE: u32 = 64;

fn headless() -> RenderContext {
    pollster::block_on(RenderContext::new_headless(FORMAT, SIZE, SIZE)).unwrap()
}

fn camera() -> Camera {
    Camera {
        eye: Vec3::new(0.0, 4.0, 8.0),
        aspect: 1.0,
        ..Camera::default()
    }
}

fn scene(device: &wgpu::Device) -> Vec<Primitive> {
    vec![
        Primitive::plane(device, 10.0).at(Vec3::new(0.0, -0.5, 0.0)),
        Primitive::cube(device),
    ]
}

fn drawables(primitives: &[Primitive]) -> Vec<&dyn Drawable> {
    primitives
        .iter()
        .map(|p| {
            let drawable: &dyn Drawable = p;
            drawable
        })
        .collect()
}

/// Pixel `(column, row)` of `point` as seen by [`camera`].
fn pixel_of(point: Vec3) -> (usize, usize) {
    let camera = camera();
    let ndc = (camera.build_projection() * camera.view_matrix()).project_point3(point);
    let u = ((ndc.x * 0.5 + 0.5) * SIZE as f32) as usize;
    let v = ((0.5 - ndc.y * 0.5) * SIZE as f32) as usize;
    (u, v)
}

fn luminance(rgba: &[u8], (u, v): (usize, usize)) -> u32 {
    let i = (v * SIZE as usize + u) * 4;
    rgba[i..i + 3].iter().map(|&c| u32::from(c)).sum()
}

fn depth_surface(device: &wgpu::Device) -> SurfaceSet {
    SurfaceSet::create(
        device,
        SurfaceLayout::new(
            "Test Depth",
            SIZE,
            SIZE,
            vec![AttachmentDesc::depth("depth", DEPTH_FORMAT)],
        ),
    )
    .unwrap()
}

fn render(
    context: &RenderContext,
    renderer: &mut Renderer,
    target: &RenderTarget,
    primitives: &[Primitive],
) -> Vec<PassKind> {
    renderer
        .render(context, &target.view, &camera(), &drawables(primitives))
        .unwrap()
}

#[test]
#[ignore = "requires a GPU adapter"]
fn directional_shadow_map_covers_the_cube() {
    let context = headless();
    let mut options = Options::default();
    options.render.mode = RenderMode::Shadowed;
    options.lighting.shadow_resolution = SIZE;
    let mut renderer = Renderer::new(&context, options).unwrap();
    let light = renderer
        .lights_mut()
        .add_directional_light(
            &context.device,
            Vec3::new(-6.0, 8.0, -6.0),
            Vec3::ZERO,
            Vec3::ONE,
            1.0,
        )
        .unwrap();
    let primitives = vec![Primitive::cube(&context.device)];
    let target = RenderTarget::new(&context.device, SIZE, SIZE, FORMAT);

    let trace = render(&context, &mut renderer, &target, &primitives);
    assert_eq!(trace[0], PassKind::ShadowDepth { light });

    let record = renderer.lights().record(light).unwrap();
    let clip = record.light_space().primary().project_point3(Vec3::ZERO);
    assert!(clip.x.abs() < 1.0 && clip.y.abs() < 1.0);
    assert!((0.0..1.0).contains(&clip.z));

    let texture = &record.shadow().unwrap().surface().depth().unwrap().texture;
    let bytes = read_texture(&context.device, &context.queue, texture, 0).unwrap();
    let depths: Vec<f32> = bytemuck::pod_collect_to_vec(&bytes);
    let u = ((clip.x * 0.5 + 0.5) * SIZE as f32) as usize;
    let v = ((0.5 - clip.y * 0.5) * SIZE as f32) as usize;
    let center = depths[v * SIZE as usize + u];
    assert!(center < 0.999, "cube footprint depth {center}");
    assert_eq!(depths[0], 1.0, "corner should stay at the far plane");
}

#[test]
#[ignore = "requires a GPU adapter"]
fn zero_ao_strength_makes_ssao_invisible() {
    let context = headless();
    let mut options = Options::default();
    options.render.mode = RenderMode::Deferred;
    options.lighting.ao_strength = 0.0;
    let mut renderer = Renderer::new(&context, options).unwrap();
    if renderer.ssao().is_none() {
        return;
    }
    let _ = renderer
        .lights_mut()
        .add_ambient_light(&context.device, Vec3::ONE, 0.5)
        .unwrap();
    let primitives = scene(&context.device);
    let target = RenderTarget::new(&context.device, SIZE, SIZE, FORMAT);

    let trace = render(&context, &mut renderer, &target, &primitives);
    assert!(trace.contains(&PassKind::DeferredLighting { ssao: false }));
    let without = read_texture(&context.device, &context.queue, &target.texture, 0)
        .unwrap();

    renderer.request_mode(RenderMode::DeferredWithSsao);
    let trace = render(&context, &mut renderer, &target, &primitives);
    assert!(trace.contains(&PassKind::SsaoBlur));
    let with = read_texture(&context.device, &context.queue, &target.texture, 0)
        .unwrap();

    assert_eq!(without, with);
}

#[test]
#[ignore = "requires a GPU adapter"]
fn full_current_weight_shows_the_current_frame() {
    let context = headless();
    let mut options = Options::default();
    options.render.mode = RenderMode::Forward;
    options.antialiasing.mode = AntialiasingMode::Temporal;
    options.antialiasing.base_blend_factor = 1.0;
    let mut renderer = Renderer::new(&context, options).unwrap();
    let Some(resolver) = renderer.resolver() else {
        return;
    };
    assert!(!resolver.history().is_valid());
    let _ = renderer
        .lights_mut()
        .add_point_light(&context.device, Vec3::new(-5.0, 5.0, 0.0), Vec3::ONE, 10.0)
        .unwrap();
    let primitives = scene(&context.device);
    let target = RenderTarget::new(&context.device, SIZE, SIZE, FORMAT);

    for frame in 0..2 {
        let trace = render(&context, &mut renderer, &target, &primitives);
        assert_eq!(trace.last(), Some(&PassKind::AntialiasResolve));
        let resolver = renderer.resolver().unwrap();
        let current = &resolver.surface().color(0).unwrap().texture;
        let current =
            read_texture(&context.device, &context.queue, current, 0).unwrap();
        let output =
            read_texture(&context.device, &context.queue, &target.texture, 0)
                .unwrap();
        assert_eq!(current, output, "frame {frame}");
    }
    assert!(renderer.resolver().unwrap().history().is_valid());
}

#[test]
#[ignore = "requires a GPU adapter"]
fn background_occlusion_blurs_to_one() {
    let context = headless();
    let mut options = Options::default();
    options.render.mode = RenderMode::DeferredWithSsao;
    let mut renderer = Renderer::new(&context, options).unwrap();
    if renderer.ssao().is_none() {
        return;
    }
    let target = RenderTarget::new(&context.device, SIZE, SIZE, FORMAT);
    let trace = render(&context, &mut renderer, &target, &[]);
    assert!(trace.contains(&PassKind::SsaoRaw));

    let ssao = renderer.ssao().unwrap();
    let blurred = &ssao.blurred_surface().color(0).unwrap().texture;
    let bytes = read_texture(&context.device, &context.queue, blurred, 0).unwrap();
    assert!(bytes.iter().all(|&b| b == 255));
}

#[test]
#[ignore = "requires a GPU adapter"]
fn occlusion_group_is_built_once_per_surface() {
    let context = headless();
    let mut options = Options::default();
    options.render.mode = RenderMode::DeferredWithSsao;
    let mut renderer = Renderer::new(&context, options).unwrap();
    let (Some(gbuffer), Some(ssao)) = (renderer.gbuffer(), renderer.ssao()) else {
        return;
    };
    assert!(gbuffer.is_connected_to(ssao));
    let target = RenderTarget::new(&context.device, SIZE, SIZE, FORMAT);
    for _ in 0..2 {
        let trace = render(&context, &mut renderer, &target, &[]);
        assert!(trace.contains(&PassKind::DeferredLighting { ssao: true }));
    }
}

#[test]
#[ignore = "requires a GPU adapter"]
fn resize_recreates_every_surface() {
    let context = headless();
    let mut renderer = Renderer::new(&context, Options::default()).unwrap();
    renderer.resize(&context.device, 32, 16).unwrap();
    assert_eq!(renderer.depth_surface().size(), (32, 16));
    if let Some(gbuffer) = renderer.gbuffer() {
        assert_eq!(gbuffer.surface().size(), (32, 16));
    }
    if let (Some(gbuffer), Some(ssao)) = (renderer.gbuffer(), renderer.ssao()) {
        assert!(gbuffer.is_connected_to(ssao));
    }
    if let Some(resolver) = renderer.resolver() {
        assert_eq!(resolver.surface().size(), (32, 16));
        assert!(!resolver.history().is_valid());
    }
}

#[test]
#[ignore = "requires a GPU adapter"]
fn cube_shadows_the_ground_plane() {
    let context = headless();
    let mut options = Options::default();
    options.render.mode = RenderMode::Shadowed;
    let mut renderer = Renderer::new(&context, options).unwrap();
    let lights = renderer.lights_mut();
    let _ = lights
        .add_ambient_light(&context.device, Vec3::ONE, 0.1)
        .unwrap();
    let _ = lights
        .add_directional_light(
            &context.device,
            Vec3::new(-6.0, 8.0, -6.0),
            Vec3::ZERO,
            Vec3::ONE,
            1.0,
        )
        .unwrap();
    let primitives = scene(&context.device);
    let target = RenderTarget::new(&context.device, SIZE, SIZE, FORMAT);

    let trace = render(&context, &mut renderer, &target, &primitives);
    assert_eq!(trace[0], PassKind::ShadowDepth { light: 1 });
    let rgba = read_texture(&context.device, &context.queue, &target.texture, 0)
        .unwrap();

    // Behind the cube as seen from the light, and well away from it.
    let shadowed = luminance(&rgba, pixel_of(Vec3::new(0.7, -0.5, 0.7)));
    let lit = luminance(&rgba, pixel_of(Vec3::new(-2.0, -0.5, 2.0)));
    assert!(shadowed < lit, "shadowed {shadowed}, lit {lit}");
}

#[test]
#[ignore = "requires a GPU adapter"]
fn blur_output_stays_in_unit_range() {
    let context = headless();
    let renderer = Renderer::new(&context, Options::default()).unwrap();
    let Some(ssao) = renderer.ssao() else {
        return;
    };
    let raw = &ssao.raw_surface().color(0).unwrap().texture;
    let blurred = &ssao.blurred_surface().color(0).unwrap().texture;
    let target = RenderTarget::new(&context.device, SIZE, SIZE, FORMAT);

    let blur = |occlusion: &[u8]| {
        context.queue.write_texture(
            raw.as_image_copy(),
            occlusion,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(SIZE),
                rows_per_image: Some(SIZE),
            },
            raw.size(),
        );
        let mut encoder = context.create_encoder();
        {
            let mut frame = FrameContext::new(
                &context.device,
                &context.queue,
                &mut encoder,
                DefaultTarget {
                    color: &target.view,
                    depth: renderer.depth_surface(),
                },
            );
            ssao.render_blur(&mut frame);
        }
        context.submit(encoder);
        read_texture(&context.device, &context.queue, blurred, 0).unwrap()
    };

    let texels = (SIZE * SIZE) as usize;
    assert!(blur(&vec![0; texels]).iter().all(|&b| b == 0));

    let stripes: Vec<u8> = (0..texels)
        .map(|i| if i % 2 == 0 { 0 } else { 255 })
        .collect();
    let out = blur(&stripes);
    assert!(out.iter().all(|&b| b > 0 && b < 255), "{out:?}");
}

#[test]
#[ignore = "requires a GPU adapter"]
fn rejected_texture_is_reported_not_raised() {
    let context = headless();
    let result = validation_scope(&context.device, || {
        context.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Empty"),
            size: wgpu::Extent3d {
                width: 0,
                height: 0,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
    });
    assert!(result.is_err());

    let accepted = validation_scope(&context.device, || depth_surface(&context.device));
    assert!(accepted.is_ok());
}

#[test]
#[ignore = "requires a GPU adapter"]
fn light_edits_apply_in_place() {
    let context = headless();
    let device = &context.device;
    let mut lights = Lights::new(device, &LightingOptions::default()).unwrap();
    let spot = lights
        .add_spotlight(
            device,
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::NEG_Y,
            Vec3::ONE,
            10.0,
            0.9,
            0.8,
        )
        .unwrap();

    lights.set_intensity(spot, 3.0).unwrap();
    lights.set_color(spot, Vec3::X).unwrap();
    lights.set_direction(spot, Vec3::new(2.0, 0.0, 0.0)).unwrap();
    lights.set_cutoffs(spot, 0.95, 0.85).unwrap();
    let Some(&Light::Spot {
        direction,
        color,
        intensity,
        cut_off,
        outer_cut_off,
        ..
    }) = lights.get(spot)
    else {
        panic!("light {spot} is not a spotlight");
    };
    assert_eq!(intensity, 3.0);
    assert_eq!(color, Vec3::X);
    assert_eq!(direction, Vec3::X);
    assert_eq!((cut_off, outer_cut_off), (0.95, 0.85));

    // A zero direction leaves the old one.
    lights.set_direction(spot, Vec3::ZERO).unwrap();
    assert!(matches!(lights.get(spot), Some(Light::Spot { direction, .. }) if *direction == Vec3::X));

    assert!(matches!(
        lights.set_intensity(7, 1.0),
        Err(PipelineError::LightIndex(7))
    ));
}

#[test]
#[ignore = "requires a GPU adapter"]
fn shadow_pass_renders_every_caster() {
    let context = headless();
    let device = &context.device;
    let mut composer = ShaderComposer::new().unwrap();
    let mut lights = Lights::new(device, &LightingOptions::default()).unwrap();
    let _ = lights.add_ambient_light(device, Vec3::ONE, 0.2).unwrap();
    let directional = lights
        .add_directional_light(
            device,
            Vec3::new(-6.0, 8.0, -6.0),
            Vec3::ZERO,
            Vec3::ONE,
            1.0,
        )
        .unwrap();
    let point = lights
        .add_point_light(device, Vec3::new(0.0, 3.0, 0.0), Vec3::ONE, 5.0)
        .unwrap();
    lights.update(&context.queue);

    let mut bindings = SceneBindings::new(device, lights.uniform_buffer());
    let pipelines =
        ScenePipelines::new(device, &mut composer, &bindings, &lights, FORMAT)
            .unwrap();
    let primitives = scene(device);
    let drawables = drawables(&primitives);
    bindings.prepare(device, &context.queue, &camera(), &drawables);

    let depth = depth_surface(device);
    let target = RenderTarget::new(device, SIZE, SIZE, FORMAT);
    let mut encoder = context.create_encoder();
    let trace = {
        let mut frame = FrameContext::new(
            device,
            &context.queue,
            &mut encoder,
            DefaultTarget {
                color: &target.view,
                depth: &depth,
            },
        );
        lights
            .render_shadow_pass(&mut frame, &pipelines, &bindings, &drawables)
            .unwrap();
        frame.trace
    };
    context.submit(encoder);
    assert_eq!(
        trace,
        [
            PassKind::ShadowDepth { light: directional },
            PassKind::ShadowDepth { light: point },
        ]
    );
}
