//! Renderable Tests
//!
//! Tests for:
//! - GPU buffer setup, layout declaration and exactly-once release
//! - Allocation failure leaving an inert renderable without leaks
//! - The draw-time texture binding protocol
//! - Texture loading, reuse and decode-failure handling
//! - Cube re-scaling and vertex/index round trips

use std::path::{Path, PathBuf};
use std::rc::Rc;

use lantern::gpu::{BufferTarget, PixelFormat, UniformValue};
use lantern::resources::{
    CubeShape, GeometrySource, Renderable, ShaderProgram, SphereShape, TextureRole, Vertex,
};
use lantern::{LanternError, RenderContext};

fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    image::RgbaImage::from_pixel(width, height, image::Rgba([200, 100, 50, 255]))
        .save(&path)
        .unwrap();
    path
}

// ============================================================================
// Setup / release
// ============================================================================

#[test]
fn setup_uploads_vertices_and_indices() {
    let (ctx, device) = RenderContext::headless();
    let cube = Renderable::cube(&ctx, 1.0);

    let buffers = cube.buffers().expect("cube is set up");
    let live = device.live_objects();
    assert_eq!((live.vertex_arrays, live.buffers), (1, 2));

    let vertex_bytes = device.buffer_contents(buffers.vertex_buffer).unwrap();
    let index_bytes = device.buffer_contents(buffers.index_buffer).unwrap();
    assert_eq!(vertex_bytes.len(), 24 * std::mem::size_of::<Vertex>());
    assert_eq!(index_bytes.len(), 36 * 4);
    assert_eq!(device.buffer_target(buffers.index_buffer), Some(BufferTarget::Index));

    let info = device.vertex_array_info(buffers.vertex_array).unwrap();
    assert_eq!(info.vertex_buffer, Some(buffers.vertex_buffer));
    assert_eq!(info.index_buffer, Some(buffers.index_buffer));
    assert_eq!(info.layout, Some(Vertex::layout()));
}

#[test]
fn sphere_with_zero_stacks_still_sets_up() {
    let (ctx, _device) = RenderContext::headless();
    let shape = SphereShape {
        radius: 1.0,
        stack_count: 0,
        sector_count: 8,
    };
    let sphere = Renderable::sphere(&ctx, shape);

    assert!(sphere.is_ready());
    assert_eq!(sphere.vertices().len(), 3 * 9);
    assert_eq!(sphere.indices().len() / 3, 2 * 8);
}

#[test]
fn release_is_exactly_once() {
    let (ctx, device) = RenderContext::headless();
    let mut sphere = Renderable::sphere(&ctx, SphereShape::default());

    sphere.release();
    sphere.release();
    assert!(!sphere.is_ready());
    drop(sphere);

    assert_eq!(device.live_objects().total(), 0);
    assert_eq!(device.double_deletes(), 0);
}

#[test]
fn drop_releases_gpu_objects() {
    let (ctx, device) = RenderContext::headless();
    {
        let _cube = Renderable::cube(&ctx, 1.0);
        assert_eq!(device.live_objects().total(), 3);
    }
    assert_eq!(device.live_objects().total(), 0);
    assert_eq!(device.double_deletes(), 0);
}

#[test]
fn allocation_failure_leaves_renderable_inert() {
    let (ctx, device) = RenderContext::headless();
    let program = ShaderProgram::phong(&ctx);

    // Vertex array and vertex buffer succeed, the index buffer does not.
    device.set_allocation_budget(Some(2));
    let mut cube = Renderable::cube(&ctx, 1.0);
    cube.set_shader_program(program);

    assert!(!cube.is_ready());
    assert_eq!(device.live_objects().buffers, 0);
    assert_eq!(device.live_objects().vertex_arrays, 0);

    cube.draw();
    assert!(device.draws().is_empty());

    // Recovers once allocation succeeds again.
    device.set_allocation_budget(None);
    cube.setup();
    assert!(cube.is_ready());
}

#[test]
fn setup_twice_does_not_leak() {
    let (ctx, device) = RenderContext::headless();
    let mut cube = Renderable::cube(&ctx, 1.0);
    cube.setup();
    cube.setup();
    assert_eq!(device.live_objects().total(), 3);
}

// ============================================================================
// Drawing
// ============================================================================

#[test]
fn draw_binds_program_and_full_index_range() {
    let (ctx, device) = RenderContext::headless();
    let program = ShaderProgram::phong(&ctx);
    let mut cube = Renderable::cube(&ctx, 1.0);
    cube.set_shader_program(Rc::clone(&program));

    cube.draw();

    let draws = device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].index_count, 36);
    assert_eq!(Some(draws[0].program), program.id());
    assert_eq!(draws[0].vertex_array, cube.buffers().unwrap().vertex_array);

    // The vertex array and texture unit 0 are unbound afterwards.
    assert_eq!(device.bound_vertex_array(), None);
    assert_eq!(device.bound_texture(0), None);
}

#[test]
fn draw_without_program_is_skipped() {
    let (ctx, device) = RenderContext::headless();
    let cube = Renderable::cube(&ctx, 1.0);
    cube.draw();
    assert!(device.draws().is_empty());
}

#[test]
fn textures_bound_to_sequential_units_with_per_role_counters() {
    let (ctx, device) = RenderContext::headless();
    let dir = tempfile::tempdir().unwrap();
    let a = write_png(dir.path(), "a.png", 4, 4);
    let b = write_png(dir.path(), "b.png", 2, 2);
    let c = write_png(dir.path(), "c.png", 8, 8);

    let program = ShaderProgram::phong(&ctx);
    let mut cube = Renderable::cube(&ctx, 1.0);
    cube.set_shader_program(Rc::clone(&program));
    assert!(cube.set_texture(&a, TextureRole::Diffuse));
    assert!(cube.set_texture(&b, TextureRole::Specular));
    assert!(cube.set_texture(&c, TextureRole::Diffuse));

    cube.draw();

    let handles: Vec<_> = cube.textures().iter().map(|t| t.handle()).collect();
    let draws = device.draws();
    assert_eq!(draws[0].textures, vec![(0, handles[0]), (1, handles[1]), (2, handles[2])]);

    let id = program.id().unwrap();
    let samplers: Vec<(String, UniformValue)> = device
        .uniform_writes()
        .into_iter()
        .filter(|w| w.program == id)
        .map(|w| (w.name, w.value))
        .collect();
    // The phong source samples diffuse1 and specular1 only; diffuse2 is not
    // referenced, so its upload is a no-op.
    assert_eq!(
        samplers,
        vec![
            ("material.texture_diffuse1".to_string(), UniformValue::Int(0)),
            ("material.texture_specular1".to_string(), UniformValue::Int(1)),
        ]
    );
}

// ============================================================================
// Textures
// ============================================================================

#[test]
fn texture_upload_uses_decoded_format_and_mipmaps() {
    let (ctx, device) = RenderContext::headless();
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "wood.png", 16, 4);

    let mut cube = Renderable::cube(&ctx, 1.0);
    cube.try_set_texture(&path, TextureRole::Diffuse).unwrap();

    let texture = &cube.textures()[0];
    assert_eq!(texture.role(), TextureRole::Diffuse);
    assert_eq!(texture.path(), path.display().to_string());

    let info = device.texture_info(texture.handle()).unwrap();
    assert_eq!((info.width, info.height), (16, 4));
    assert_eq!(info.format, PixelFormat::Rgba8);
    assert_eq!(info.mip_level_count, 5);
    assert_eq!(info.sampler.address_mode_u, wgpu::AddressMode::Repeat);
}

#[test]
fn decode_failure_leaves_texture_list_unchanged() {
    let (ctx, device) = RenderContext::headless();
    let dir = tempfile::tempdir().unwrap();
    let good = write_png(dir.path(), "good.png", 2, 2);
    let garbage = dir.path().join("garbage.png");
    std::fs::write(&garbage, b"definitely not a png").unwrap();

    let mut cube = Renderable::cube(&ctx, 1.0);
    assert!(cube.set_texture(&good, TextureRole::Diffuse));

    assert!(!cube.set_texture(&garbage, TextureRole::Specular));
    assert!(!cube.set_texture(dir.path().join("missing.png"), TextureRole::Specular));

    assert_eq!(cube.textures().len(), 1);
    assert_eq!(device.live_objects().textures, 1);

    let err = cube.try_set_texture(&garbage, TextureRole::Diffuse).unwrap_err();
    assert!(matches!(err, LanternError::Decode { .. }));
}

#[test]
fn same_path_reuses_gpu_image() {
    let (ctx, device) = RenderContext::headless();
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "shared.png", 2, 2);

    let mut cube = Renderable::cube(&ctx, 1.0);
    cube.set_texture(&path, TextureRole::Diffuse);
    cube.set_texture(&path, TextureRole::Specular);

    assert_eq!(cube.textures().len(), 2);
    assert_eq!(cube.textures()[0].handle(), cube.textures()[1].handle());
    assert_eq!(device.live_objects().textures, 1);

    drop(cube);
    assert_eq!(device.live_objects().textures, 0);
}

#[test]
fn texture_role_string_conversion() {
    assert_eq!(TextureRole::Diffuse.to_string(), "texture_diffuse");
    assert_eq!("texture_specular".parse::<TextureRole>().unwrap(), TextureRole::Specular);
    assert_eq!("Diffuse".parse::<TextureRole>().unwrap(), TextureRole::Diffuse);
    assert!(matches!(
        "normal".parse::<TextureRole>(),
        Err(LanternError::InvalidTextureRole(_))
    ));
}

// ============================================================================
// Geometry changes
// ============================================================================

#[test]
fn set_cube_scale_regenerates_and_reuploads() {
    let (ctx, device) = RenderContext::headless();
    let mut cube = Renderable::cube(&ctx, 1.0);
    let before = cube.vertices()[0].position;

    assert!(cube.set_cube_scale(2.0));
    assert_eq!(cube.vertices()[0].position, before * 2.0);
    assert_eq!(device.live_objects().total(), 3);

    let uploaded = device.buffer_contents(cube.buffers().unwrap().vertex_buffer).unwrap();
    assert_eq!(uploaded, bytemuck::cast_slice::<Vertex, u8>(cube.vertices()));

    let mut sphere = Renderable::sphere(&ctx, SphereShape::default());
    assert!(!sphere.set_cube_scale(2.0));
}

#[test]
fn cube_round_trip_through_mesh_source() {
    let (ctx, device) = RenderContext::headless();
    let program = ShaderProgram::phong(&ctx);

    let mut cube = Renderable::cube(&ctx, 1.5);
    let mut copy = Renderable::from_mesh(&ctx, cube.vertices().to_vec(), cube.indices().to_vec());
    cube.set_shader_program(Rc::clone(&program));
    copy.set_shader_program(Rc::clone(&program));

    assert_eq!(copy.geometry().kind(), "mesh");
    assert_eq!(copy.vertices(), cube.vertices());
    assert_eq!(copy.indices(), cube.indices());

    let original = cube.buffers().unwrap();
    let imported = copy.buffers().unwrap();
    assert_eq!(
        device.buffer_contents(original.vertex_buffer),
        device.buffer_contents(imported.vertex_buffer)
    );
    assert_eq!(
        device.buffer_contents(original.index_buffer),
        device.buffer_contents(imported.index_buffer)
    );
    assert_eq!(
        device.vertex_array_info(original.vertex_array).unwrap().layout,
        device.vertex_array_info(imported.vertex_array).unwrap().layout
    );

    cube.draw();
    copy.draw();
    let draws = device.draws();
    assert_eq!(draws[0].index_count, draws[1].index_count);
}

#[test]
fn reshape_switches_geometry_kind() {
    let (ctx, _device) = RenderContext::headless();
    let mut renderable = Renderable::cube(&ctx, 1.0);
    renderable.reshape(GeometrySource::from(SphereShape::new(1.0, 4, 8)));
    assert_eq!(renderable.geometry().kind(), "sphere");
    assert_eq!(renderable.vertices().len(), 5 * 9);

    renderable.reshape(CubeShape::new(1.0).into());
    assert_eq!(renderable.indices().len(), 36);
}
