//! wgpu Backend Tests
//!
//! These need a GPU adapter and are ignored by default:
//!
//! ```text
//! cargo test --test wgpu_tests -- --ignored
//! ```

use std::rc::Rc;

use lantern::gpu::{GpuDevice, PixelFormat, TextureSampler, TextureUpload, WgpuDevice};
use lantern::resources::{Renderable, ShaderProgram, ShaderProgramBuilder};
use lantern::{Camera, DrawItem, FrameRenderer, FrameUniforms, MaterialLibrary, Model, RenderContext, RenderSettings, ShaderStage};

fn device() -> Rc<WgpuDevice> {
    let settings = RenderSettings {
        width: 64,
        height: 64,
        ..RenderSettings::default()
    };
    Rc::new(WgpuDevice::new_offscreen(&settings).expect("GPU adapter"))
}

#[test]
#[ignore = "requires a GPU adapter"]
fn phong_program_compiles_with_prelude() {
    let device = device();
    let gpu: Rc<dyn GpuDevice> = device.clone();
    let ctx = RenderContext::new(gpu);

    let program = ShaderProgram::phong(&ctx);
    assert!(program.is_ready());
}

#[test]
#[ignore = "requires a GPU adapter"]
fn invalid_wgsl_reports_compile_error() {
    let device = device();
    let gpu: Rc<dyn GpuDevice> = device.clone();
    let ctx = RenderContext::new(gpu);

    let builder = ShaderProgramBuilder::new(&ctx);
    let stage = builder.compile_source(
        "broken",
        "@fragment fn fs_main() -> @location(0) vec4<f32> { return undefined_symbol; }",
        ShaderStage::Fragment,
    );
    assert!(!stage.is_valid());
}

#[test]
#[ignore = "requires a GPU adapter"]
fn frame_submits_recorded_draws() {
    let device = device();
    let gpu: Rc<dyn GpuDevice> = device.clone();
    let ctx = RenderContext::new(gpu);

    let program = ShaderProgram::phong(&ctx);
    let mut cube = Model::from_renderable(Renderable::cube(&ctx, 1.0));
    cube.set_shader_program(&program);
    let library = MaterialLibrary::parse("newmtl gold\nKd 0.75 0.6 0.2\n");

    let mut renderer = FrameRenderer::presenting(Rc::clone(&device));
    let uniforms = FrameUniforms::from_camera(&Camera::default(), 1.0);
    renderer.draw(&uniforms, &[DrawItem::new(&cube, library.resolve("gold"))]);

    assert_eq!(device.pending_draws(), 1);
    assert_eq!(renderer.finish(), 1);
    assert_eq!(device.pending_draws(), 0);
}

fn r8_upload<'a>(label: &'a str, width: u32, pixels: &'a [u8]) -> TextureUpload<'a> {
    TextureUpload {
        label,
        width,
        height: 1,
        format: PixelFormat::R8,
        pixels,
        sampler: TextureSampler::default(),
        generate_mipmaps: false,
    }
}

#[test]
#[ignore = "requires a GPU adapter"]
fn rejected_texture_registers_no_handle() {
    let device = device();
    let width = device.device().limits().max_texture_dimension_2d + 1;
    let pixels = vec![0u8; width as usize];

    assert_eq!(device.create_texture(&r8_upload("oversized", width, &pixels)), None);

    // The failure does not leak into the next upload.
    let small = [255u8; 4];
    assert!(device.create_texture(&r8_upload("small", 4, &small)).is_some());
}
