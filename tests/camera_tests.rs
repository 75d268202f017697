//! Camera and Frame Loop Tests
//!
//! Tests for:
//! - Camera defaults, movement and pitch clamping
//! - View/projection matrices
//! - FrameRenderer uniform upload and draw order

use glam::{Mat4, Vec3};

use lantern::gpu::UniformValue;
use lantern::resources::{MaterialLibrary, Renderable, ShaderProgram};
use lantern::{Camera, CameraAction, DrawItem, FrameRenderer, FrameUniforms, Model, RenderContext};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

// ============================================================================
// Camera
// ============================================================================

#[test]
fn default_camera_looks_down_negative_z() {
    let camera = Camera::default();
    assert_eq!(camera.position, Vec3::new(0.0, 1.0, 3.0));
    assert!(approx_vec3(camera.front(), Vec3::NEG_Z));
    assert!(approx_vec3(camera.up(), Vec3::Y));
    assert!(approx_vec3(camera.right(), Vec3::X));
}

#[test]
fn movement_scales_with_speed_and_delta() {
    let mut camera = Camera::default();
    camera.process_movement(CameraAction::Forward, 0.5);
    assert!(approx_vec3(camera.position, Vec3::new(0.0, 1.0, 3.0 - 1.25)));

    camera.process_movement(CameraAction::Right, 1.0);
    camera.process_movement(CameraAction::Up, 1.0);
    assert!(approx_vec3(camera.position, Vec3::new(2.5, 3.5, 1.75)));
}

#[test]
fn pitch_is_clamped() {
    let mut camera = Camera::default();
    camera.process_mouse(0.0, 10_000.0);
    assert_eq!(camera.pitch, Camera::PITCH_LIMIT);
    camera.process_mouse(0.0, -100_000.0);
    assert_eq!(camera.pitch, -Camera::PITCH_LIMIT);
    assert!(camera.front().y < 0.0);
}

#[test]
fn view_matrix_moves_camera_to_origin() {
    let camera = Camera::default();
    let view = camera.view_matrix();
    assert!(approx_vec3(view.transform_point3(camera.position), Vec3::ZERO));
    // A point straight ahead ends up on the negative view-space Z axis.
    let ahead = view.transform_point3(camera.position + camera.front() * 2.0);
    assert!(approx_vec3(ahead, Vec3::new(0.0, 0.0, -2.0)));
}

#[test]
fn look_at_targets_point() {
    let mut camera = Camera::default();
    camera.position = Vec3::new(4.0, 0.0, 0.0);
    camera.look_at(Vec3::ZERO);
    assert!(approx_vec3(camera.front(), Vec3::NEG_X));
}

// ============================================================================
// Frame loop
// ============================================================================

#[test]
fn frame_renderer_uploads_uniforms_and_draws_in_order() {
    let (ctx, device) = RenderContext::headless();
    let program = ShaderProgram::phong(&ctx);
    let library = MaterialLibrary::parse("newmtl gold\nKd 0.75 0.6 0.2\nNs 0.4\n");

    let mut cube = Model::from_renderable(Renderable::cube(&ctx, 1.0));
    cube.set_shader_program(&program);
    let mut sphere = Model::from_renderable(Renderable::sphere(&ctx, Default::default()));
    sphere.set_shader_program(&program);

    let camera = Camera::default();
    let uniforms = FrameUniforms::from_camera(&camera, 4.0 / 3.0);
    let placement = Mat4::from_translation(Vec3::X);
    let items = [
        DrawItem::new(&cube, library.resolve("gold")).with_transform(placement),
        DrawItem::new(&sphere, library.resolve("unknown")),
    ];

    let mut renderer = FrameRenderer::new();
    assert_eq!(renderer.draw(&uniforms, &items), 2);
    assert_eq!(renderer.finish(), 0);
    assert_eq!(renderer.frame_count(), 1);

    let draws = device.draws();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].index_count, 36);
    assert_eq!(draws[1].index_count as usize, sphere.meshes()[0].indices().len());

    let id = program.id().unwrap();
    assert_eq!(device.last_uniform(id, "view"), Some(UniformValue::Mat4(camera.view_matrix())));
    assert_eq!(device.last_uniform(id, "projection"), Some(UniformValue::Mat4(uniforms.projection)));
    // The sphere was drawn last, with the identity transform and the sentinel material.
    assert_eq!(device.last_uniform(id, "model"), Some(UniformValue::Mat4(Mat4::IDENTITY)));
    assert_eq!(device.last_uniform(id, "material.diffuse"), Some(UniformValue::Vec3(Vec3::ZERO)));

    let model_writes: Vec<UniformValue> = device
        .uniform_writes()
        .into_iter()
        .filter(|w| w.name == "model")
        .map(|w| w.value)
        .collect();
    assert_eq!(model_writes[0], UniformValue::Mat4(placement));
}

#[test]
fn frame_renderer_skips_meshes_without_program() {
    let (ctx, device) = RenderContext::headless();
    let library = MaterialLibrary::default();
    let cube = Model::from_renderable(Renderable::cube(&ctx, 1.0));
    let uniforms = FrameUniforms::from_camera(&Camera::default(), 1.0);

    let mut renderer = FrameRenderer::new();
    assert_eq!(renderer.draw(&uniforms, &[DrawItem::new(&cube, library.resolve("x"))]), 0);
    assert!(device.draws().is_empty());
}
