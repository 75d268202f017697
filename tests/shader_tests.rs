//! Shader Program Tests
//!
//! Tests for:
//! - Stage compilation from disk and from source
//! - Invalid stages skipped on attach, link failure leaving a program not ready
//! - Stage handles released after linking, builder reuse
//! - Per-call uniform lookup and the silent no-op for unknown names
//! - The built-in phong program

use std::io::Write;

use glam::{Mat4, Vec3};

use lantern::gpu::UniformValue;
use lantern::resources::{ShaderProgram, ShaderProgramBuilder};
use lantern::{LanternError, RenderContext, ShaderStage};

const VERTEX: &str = r"
@vertex
fn vs_main(@location(0) position: vec3<f32>) -> @builtin(position) vec4<f32> {
    return projection * view * model * vec4<f32>(position, 1.0);
}
";

const FRAGMENT: &str = r"
@fragment
fn fs_main(@location(0) uv: vec2<f32>) -> @location(0) vec4<f32> {
    let albedo = textureSample(material_texture_diffuse1, material_texture_diffuse1_sampler, uv).rgb;
    return vec4<f32>((material.ambient + material.diffuse) * albedo * material.shininess, 1.0);
}
";

/// Missing the `fs_main` entry point.
const BROKEN_FRAGMENT: &str = r"
@fragment
fn main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }
";

fn build(ctx: &RenderContext, fragment: &str) -> ShaderProgram {
    let mut builder = ShaderProgramBuilder::new(ctx);
    let vs = builder.compile_source("test.vert", VERTEX, ShaderStage::Vertex);
    let fs = builder.compile_source("test.frag", fragment, ShaderStage::Fragment);
    builder.attach(vs).attach(fs);
    builder.link("test")
}

// ============================================================================
// Build / link lifecycle
// ============================================================================

#[test]
fn valid_program_is_ready() {
    let (ctx, device) = RenderContext::headless();
    let program = build(&ctx, FRAGMENT);

    assert!(program.is_ready());
    let id = program.id().expect("program handle");
    assert!(device.is_program_linked(id));
}

#[test]
fn failed_fragment_never_ready_and_bind_is_safe() {
    let (ctx, device) = RenderContext::headless();
    let program = build(&ctx, BROKEN_FRAGMENT);

    assert!(!program.is_ready());
    // The handle is still produced; only the link failed.
    assert!(program.id().is_some());

    program.bind();
    assert_eq!(device.current_program(), None);

    program.set_mat4("model", Mat4::IDENTITY);
    assert!(device.uniform_writes().is_empty());
}

#[test]
fn invalid_stage_is_skipped_on_attach() {
    let (ctx, _device) = RenderContext::headless();
    let mut builder = ShaderProgramBuilder::new(&ctx);

    let broken = builder.compile_source("broken", BROKEN_FRAGMENT, ShaderStage::Fragment);
    assert!(!broken.is_valid());
    builder.attach(broken);
    assert_eq!(builder.attached(), 0);

    let vs = builder.compile_source("vs", VERTEX, ShaderStage::Vertex);
    builder.attach(vs);
    assert_eq!(builder.attached(), 1);
}

#[test]
fn stage_handles_released_after_link() {
    let (ctx, device) = RenderContext::headless();

    let ok = build(&ctx, FRAGMENT);
    assert_eq!(device.live_objects().shaders, 0);

    let failed = build(&ctx, BROKEN_FRAGMENT);
    assert_eq!(device.live_objects().shaders, 0);

    assert_eq!(device.live_objects().programs, 2);
    drop((ok, failed));
    assert_eq!(device.live_objects().programs, 0);
    assert_eq!(device.double_deletes(), 0);
}

#[test]
fn builder_is_reusable_after_link() {
    let (ctx, _device) = RenderContext::headless();
    let mut builder = ShaderProgramBuilder::new(&ctx);

    for _ in 0..2 {
        let vs = builder.compile_source("vs", VERTEX, ShaderStage::Vertex);
        let fs = builder.compile_source("fs", FRAGMENT, ShaderStage::Fragment);
        builder.attach(vs).attach(fs);
        assert_eq!(builder.attached(), 2);

        let program = builder.link("reused");
        assert!(program.is_ready());
        assert_eq!(builder.attached(), 0);
    }
}

#[test]
fn link_fails_without_fragment_stage() {
    let (ctx, _device) = RenderContext::headless();
    let mut builder = ShaderProgramBuilder::new(&ctx);
    let vs = builder.compile_source("vs", VERTEX, ShaderStage::Vertex);
    builder.attach(vs);
    assert!(!builder.link("vertex only").is_ready());
}

#[test]
fn allocation_failure_yields_unready_program() {
    let (ctx, device) = RenderContext::headless();
    device.set_allocation_budget(Some(0));
    let program = build(&ctx, FRAGMENT);
    assert!(!program.is_ready());
    assert!(program.id().is_none());
    assert_eq!(device.live_objects().total(), 0);
}

// ============================================================================
// Loading from disk
// ============================================================================

#[test]
fn from_files_compiles_both_stages() {
    let (ctx, _device) = RenderContext::headless();
    let dir = tempfile::tempdir().unwrap();
    let vertex = dir.path().join("shader.vert.wgsl");
    let fragment = dir.path().join("shader.frag.wgsl");
    std::fs::File::create(&vertex).unwrap().write_all(VERTEX.as_bytes()).unwrap();
    std::fs::File::create(&fragment).unwrap().write_all(FRAGMENT.as_bytes()).unwrap();

    let program = ShaderProgram::from_files(&ctx, &vertex, &fragment).unwrap();
    assert!(program.is_ready());
    assert!(program.label().contains("shader.vert.wgsl"));
}

#[test]
fn missing_stage_file_is_io_error() {
    let (ctx, _device) = RenderContext::headless();
    let builder = ShaderProgramBuilder::new(&ctx);
    let result = builder.compile_stage("/definitely/not/here.wgsl", ShaderStage::Vertex);
    assert!(matches!(result, Err(LanternError::Io { .. })));
}

// ============================================================================
// Uniforms
// ============================================================================

#[test]
fn uniform_setters_upload_by_name() {
    let (ctx, device) = RenderContext::headless();
    let program = build(&ctx, FRAGMENT);
    let id = program.id().unwrap();
    let view = Mat4::from_translation(Vec3::new(0.0, 0.0, -3.0));

    program.bind();
    program.set_mat4("view", view);
    program.set_vec3("material.ambient", Vec3::splat(0.25));
    program.set_float("material.shininess", 0.4);
    program.set_int("material.texture_diffuse1", 0);

    assert_eq!(device.current_program(), Some(id));
    assert_eq!(device.last_uniform(id, "view"), Some(UniformValue::Mat4(view)));
    assert_eq!(
        device.last_uniform(id, "material.ambient"),
        Some(UniformValue::Vec3(Vec3::splat(0.25)))
    );
    assert_eq!(device.last_uniform(id, "material.shininess"), Some(UniformValue::Float(0.4)));
    assert_eq!(device.last_uniform(id, "material.texture_diffuse1"), Some(UniformValue::Int(0)));
}

#[test]
fn unknown_or_unreferenced_uniform_is_silent_no_op() {
    let (ctx, device) = RenderContext::headless();
    let program = build(&ctx, FRAGMENT);

    program.set_float("no_such_uniform", 1.0);
    // Part of the protocol, but the source never samples a specular map.
    program.set_int("material.texture_specular1", 1);
    program.set_vec3("material.specular", Vec3::ONE);

    assert!(device.uniform_writes().is_empty());
}

#[test]
fn every_set_call_is_uploaded() {
    let (ctx, device) = RenderContext::headless();
    let program = build(&ctx, FRAGMENT);
    for i in 0..3 {
        program.set_float("material.shininess", i as f32);
    }
    assert_eq!(device.uniform_writes().len(), 3);
}

#[test]
fn builtin_phong_program_links() {
    let (ctx, device) = RenderContext::headless();
    let program = ShaderProgram::phong(&ctx);
    assert!(program.is_ready());

    program.set_int("material.texture_specular1", 1);
    let id = program.id().unwrap();
    assert_eq!(device.last_uniform(id, "material.texture_specular1"), Some(UniformValue::Int(1)));
}
