//! Offscreen render
//!
//! Loads an engine configuration, builds a gold cube, a silver sphere and the
//! configured model, and renders them with an orbiting camera into the
//! device's offscreen target.
//!
//! ```text
//! cargo run -p offscreen_render -- [config.json] [frames]
//! ```

use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::Context;
use glam::{Mat4, Vec3};

use lantern::resources::SphereShape;
use lantern::{
    Camera, DrawItem, EngineConfig, FrameClock, FrameRenderer, FrameUniforms, GpuDevice, MaterialLibrary, Model, Renderable,
    RenderContext, ShaderProgram, WgpuDevice,
};

const DEFAULT_CONFIG: &str = "assets/config.json";
const DEFAULT_FRAMES: u32 = 120;
const ORBIT_RADIUS: f32 = 4.0;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let frames: u32 = match args.next() {
        Some(n) => n.parse().context("frame count must be a positive integer")?,
        None => DEFAULT_FRAMES,
    };

    let config = EngineConfig::load(&config_path).with_context(|| format!("loading {config_path}"))?;
    let materials = MaterialLibrary::load(&config.materials)?;

    // === 1. GPU device and context ===
    let device = Rc::new(WgpuDevice::new_offscreen(&config.render)?);
    let gpu: Rc<dyn GpuDevice> = device.clone();
    let ctx = RenderContext::new(gpu);

    // === 2. Programs ===
    let program = match (&config.shaders.vertex, &config.shaders.fragment) {
        (Some(vertex), Some(fragment)) => ShaderProgram::from_files(&ctx, vertex, fragment)?,
        _ => ShaderProgram::phong(&ctx),
    };
    if !program.is_ready() {
        log::warn!("Program '{}' failed to build, falling back to phong", program.label());
    }
    let program = if program.is_ready() { program } else { ShaderProgram::phong(&ctx) };

    // === 3. Scene content ===
    let mut cube = Model::from_renderable(Renderable::cube(&ctx, 1.0));
    cube.set_shader_program(&program);

    let mut sphere = Model::from_renderable(Renderable::sphere(&ctx, SphereShape::new(0.6, 24, 48)));
    sphere.set_shader_program(&program);

    let imported = match &config.model {
        Some(path) => {
            let mut model = Model::load(&ctx, path, &config.import)?;
            model.set_shader_program(&program);
            Some(model)
        }
        None => None,
    };

    let gold = materials.resolve("gold");
    let silver = materials.resolve("silver");
    log::info!("{gold}");
    log::info!("{silver}");

    let mut items = vec![
        DrawItem::new(&cube, gold).with_transform(Mat4::from_translation(Vec3::new(-1.0, 0.0, 0.0))),
        DrawItem::new(&sphere, silver).with_transform(Mat4::from_translation(Vec3::new(1.2, 0.0, 0.0))),
    ];
    if let Some(model) = &imported {
        items.push(DrawItem::new(model, materials.resolve("not-a-material")));
    }

    // === 4. Frame loop ===
    let mut camera = Camera::from_settings(&config.camera);
    let mut renderer = FrameRenderer::presenting(Rc::clone(&device));
    let mut clock = FrameClock::new();
    let aspect = config.render.aspect_ratio();
    let step = Duration::from_secs_f32(1.0 / 60.0);
    let started = Instant::now();

    for _ in 0..frames {
        clock.advance(step);
        let angle = clock.elapsed.as_secs_f32() * 0.5;
        camera.position = Vec3::new(angle.sin() * ORBIT_RADIUS, 1.0, angle.cos() * ORBIT_RADIUS);
        camera.look_at(Vec3::ZERO);

        let uniforms = FrameUniforms::from_camera(&camera, aspect);
        renderer.draw(&uniforms, &items);
        renderer.finish();
    }

    let wall = started.elapsed();
    log::info!("Simulated {:.2?} of scene time over {} frames", clock.elapsed, clock.frame_count);
    log::info!(
        "Rendered {frames} frames in {:.2?} ({:.2} ms/frame)",
        wall,
        wall.as_secs_f64() * 1000.0 / f64::from(frames.max(1))
    );
    Ok(())
}
