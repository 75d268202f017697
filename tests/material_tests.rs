//! Material Library Tests
//!
//! Tests for:
//! - Parsing of the `newmtl` / `Ka` / `Kd` / `Ks` / `Ns` / `d` directives
//! - Case-insensitive lookup and the "not-a-material" sentinel
//! - Tolerance of malformed, orphaned and unknown lines
//! - Loading from disk, Display formatting and uniform upload

use glam::Vec3;

use lantern::gpu::UniformValue;
use lantern::resources::{Material, MaterialLibrary, NOT_A_MATERIAL, ShaderProgramBuilder};
use lantern::{LanternError, RenderContext, ShaderStage};

const LIBRARY: &str = "\
# Metals
newmtl Gold
Ka 0.24725 0.1995 0.0745
Kd 0.75164 0.60648 0.22648
Ks 0.628281 0.555802 0.366065
Ns 0.4
d 1.0

newmtl Silver
Ka 0.19225 0.19225 0.19225
Kd 0.50754 0.50754 0.50754
Ks 0.508273 0.508273 0.508273
Ns 0.4
";

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn gold_resolves_to_parsed_values() {
    let library = MaterialLibrary::parse(LIBRARY);
    let gold = library.resolve("gold");

    assert_eq!(gold.name, "Gold");
    assert_eq!(gold.ambient, Vec3::new(0.24725, 0.1995, 0.0745));
    assert_eq!(gold.diffuse, Vec3::new(0.75164, 0.60648, 0.22648));
    assert_eq!(gold.specular, Vec3::new(0.628281, 0.555802, 0.366065));
    assert_eq!(gold.shininess, 0.4);
    assert!(gold.vertex_shader.is_none());
}

#[test]
fn lookup_is_case_insensitive() {
    let library = MaterialLibrary::parse(LIBRARY);
    assert_eq!(library.len(), 2);
    assert_eq!(library.resolve("SILVER").name, "Silver");
    assert!(library.contains("gOlD"));
}

#[test]
fn unknown_tag_yields_zero_sentinel() {
    let library = MaterialLibrary::parse(LIBRARY);
    let missing = library.resolve("bronze");

    assert_eq!(missing.name, NOT_A_MATERIAL);
    assert!(missing.is_sentinel());
    assert_eq!(missing.ambient, Vec3::ZERO);
    assert_eq!(missing.diffuse, Vec3::ZERO);
    assert_eq!(missing.specular, Vec3::ZERO);
    assert_eq!(missing.shininess, 0.0);
}

#[test]
fn malformed_lines_are_skipped() {
    let text = "\
Kd 1 1 1
newmtl Plastic
Ka 0.1 0.1
Kd 0.5 0.5 0.5
Ks red green blue
Ns shiny
d nope
illum 2
newmtl
";
    let library = MaterialLibrary::parse(text);
    assert_eq!(library.len(), 1);

    let plastic = library.resolve("plastic");
    assert_eq!(plastic.ambient, Vec3::ZERO);
    assert_eq!(plastic.diffuse, Vec3::splat(0.5));
    assert_eq!(plastic.specular, Vec3::ZERO);
    assert_eq!(plastic.shininess, 0.0);
}

#[test]
fn later_definition_replaces_earlier() {
    let library = MaterialLibrary::parse("newmtl a\nNs 1\nnewmtl A\nNs 2\n");
    assert_eq!(library.len(), 1);
    assert_eq!(library.resolve("a").shininess, 2.0);
}

#[test]
fn empty_input_is_empty_library() {
    let library = MaterialLibrary::parse("# nothing here\n\n");
    assert!(library.is_empty());
    assert!(library.resolve("gold").is_sentinel());
}

// ============================================================================
// Loading and display
// ============================================================================

#[test]
fn load_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("materials.mtl");
    std::fs::write(&path, LIBRARY).unwrap();

    let library = MaterialLibrary::load(&path).unwrap();
    assert_eq!(library.iter().count(), 2);
}

#[test]
fn missing_file_is_io_error() {
    let result = MaterialLibrary::load("/no/such/materials.mtl");
    assert!(matches!(result, Err(LanternError::Io { .. })));
}

#[test]
fn display_lists_every_coefficient() {
    let mut material = Material::new("gold");
    material.ambient = Vec3::new(1.0, 2.0, 3.0);
    material.shininess = 0.5;
    assert_eq!(
        material.to_string(),
        "Material(type: gold, ambient: [1, 2, 3], diffuse: [0, 0, 0], specular: [0, 0, 0], shininess: 0.5)"
    );
}

#[test]
fn with_shaders_records_stage_paths() {
    let material = Material::new("custom").with_shaders("a.vert.wgsl", "a.frag.wgsl");
    assert_eq!(material.vertex_shader.as_deref(), Some("a.vert.wgsl".as_ref()));
    assert_eq!(material.fragment_shader.as_deref(), Some("a.frag.wgsl".as_ref()));
}

#[test]
fn apply_uploads_material_uniforms() {
    let (ctx, device) = RenderContext::headless();
    let mut builder = ShaderProgramBuilder::new(&ctx);
    let vs = builder.compile_source(
        "vs",
        "@vertex fn vs_main() -> @builtin(position) vec4<f32> { return vec4<f32>(0.0); }",
        ShaderStage::Vertex,
    );
    let fs = builder.compile_source(
        "fs",
        "@fragment fn fs_main() -> @location(0) vec4<f32> { \
         return vec4<f32>(material.ambient + material.diffuse + material.specular * material.shininess, 1.0); }",
        ShaderStage::Fragment,
    );
    builder.attach(vs).attach(fs);
    let program = builder.link("material");
    let id = program.id().unwrap();

    let library = MaterialLibrary::parse(LIBRARY);
    let gold = library.resolve("gold");
    gold.apply(&program);

    assert_eq!(device.last_uniform(id, "material.diffuse"), Some(UniformValue::Vec3(gold.diffuse)));
    assert_eq!(device.last_uniform(id, "material.shininess"), Some(UniformValue::Float(0.4)));
    assert_eq!(device.uniform_writes().len(), 4);
}
