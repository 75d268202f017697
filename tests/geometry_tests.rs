//! Procedural Geometry Tests
//!
//! Tests for:
//! - Cube vertex/index counts, face order and the per-face index pattern
//! - Cube scaling
//! - Sphere index bounds, triangle count and pole handling
//! - Determinism of both generators
//! - Vertex attribute layout

use std::mem::{offset_of, size_of};

use glam::Vec3;

use lantern::resources::{CubeShape, GeometrySource, SphereShape, Vertex};

const EPSILON: f32 = 1e-5;

fn approx_vec3(a: Vec3, b: Vec3) -> bool {
    (a - b).abs().max_element() < EPSILON
}

// ============================================================================
// Cube
// ============================================================================

#[test]
fn cube_unit_counts() {
    let cube = CubeShape::new(1.0);
    assert_eq!(cube.compute_vertices().len(), 24);
    assert_eq!(cube.compute_indices().len(), 36);
}

#[test]
fn cube_face_index_pattern() {
    let indices = CubeShape::default().compute_indices();
    for (face, chunk) in indices.chunks(6).enumerate() {
        let base = face as u32 * 4;
        assert_eq!(chunk, [base + 2, base, base + 3, base, base + 1, base + 3]);
    }
}

#[test]
fn cube_faces_ordered_z_x_y() {
    let vertices = CubeShape::default().compute_vertices();
    let expected = [Vec3::Z, Vec3::NEG_Z, Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y];
    for (face, normal) in expected.iter().enumerate() {
        for v in &vertices[face * 4..face * 4 + 4] {
            assert_eq!(v.normal, *normal, "face {face}");
            // Every corner of a face lies on the face plane.
            assert!((v.position.dot(*normal) - 0.5).abs() < EPSILON);
        }
    }
}

#[test]
fn cube_scale_two_doubles_every_component() {
    let unit = CubeShape::new(1.0).compute_vertices();
    let doubled = CubeShape::new(2.0).compute_vertices();
    for (a, b) in unit.iter().zip(&doubled) {
        assert_eq!(b.position, a.position * 2.0);
        assert_eq!(b.normal, a.normal);
        assert_eq!(b.tex_coords, a.tex_coords);
    }
    assert_eq!(CubeShape::new(1.0).compute_indices(), CubeShape::new(2.0).compute_indices());
}

#[test]
fn cube_triangles_face_outward() {
    let cube = CubeShape::default();
    let vertices = cube.compute_vertices();
    for tri in cube.compute_indices().chunks(3) {
        let [a, b, c] = [0, 1, 2].map(|k| vertices[tri[k] as usize].position);
        let face_normal = (b - a).cross(c - a).normalize();
        assert!(approx_vec3(face_normal, vertices[tri[0] as usize].normal));
    }
}

#[test]
fn cube_is_deterministic() {
    let cube = CubeShape::new(0.75);
    assert_eq!(cube.compute_vertices(), cube.compute_vertices());
    assert_eq!(cube.compute_indices(), cube.compute_indices());
}

// ============================================================================
// Sphere
// ============================================================================

#[test]
fn sphere_indices_in_range() {
    for (stacks, sectors) in [(2, 3), (8, 16), (16, 32), (5, 7)] {
        let sphere = SphereShape::new(1.0, stacks, sectors);
        let limit = (stacks + 1) * (sectors + 1);
        assert_eq!(sphere.compute_vertices().len(), limit as usize);
        assert!(sphere.compute_indices().iter().all(|&i| i < limit));
    }
}

#[test]
fn sphere_triangle_count() {
    for (stacks, sectors) in [(2, 3), (8, 16), (16, 32), (5, 7)] {
        let sphere = SphereShape::new(1.0, stacks, sectors);
        let triangles = sphere.compute_indices().len() / 3;
        assert_eq!(triangles as u32, 2 * sectors * (stacks - 1));
    }
}

#[test]
fn sphere_vertices_lie_on_radius() {
    let sphere = SphereShape::new(2.5, 12, 24);
    for v in sphere.compute_vertices() {
        assert!((v.position.length() - 2.5).abs() < 1e-4);
        assert!((v.normal.length() - 1.0).abs() < 1e-4);
        assert!(approx_vec3(v.normal * 2.5, v.position));
    }
}

#[test]
fn sphere_poles_and_formula() {
    let sphere = SphereShape::new(1.0, 4, 8);
    let vertices = sphere.compute_vertices();

    // i = 0 is the north pole, i = stack the south pole.
    assert!(approx_vec3(vertices[0].position, Vec3::Y));
    assert!(approx_vec3(vertices.last().unwrap().position, Vec3::NEG_Y));

    // i = 2 (equator), j = 2: sector angle = 2π·2/8 = π/2.
    let v = vertices[2 * 9 + 2].position;
    assert!(approx_vec3(v, Vec3::new(0.0, 0.0, 1.0)), "{v}");
}

#[test]
fn sphere_pole_stacks_emit_one_triangle_per_sector() {
    let sphere = SphereShape::new(1.0, 4, 8);
    let indices = sphere.compute_indices();
    let ring = 9;

    let touching_north = indices.chunks(3).filter(|t| t.iter().any(|&i| i < ring)).count();
    let touching_south = indices
        .chunks(3)
        .filter(|t| t.iter().any(|&i| i >= 4 * ring))
        .count();
    assert_eq!(touching_north, 8);
    assert_eq!(touching_south, 8);
}

#[test]
fn sphere_parameters_are_clamped() {
    let sphere = SphereShape::new(1.0, 0, 1);
    assert_eq!(sphere.stack_count, 2);
    assert_eq!(sphere.sector_count, 3);
    assert!(!sphere.compute_indices().is_empty());
}

#[test]
fn sphere_literal_with_degenerate_counts_is_clamped_at_generation() {
    let sphere = SphereShape {
        radius: 1.0,
        stack_count: 0,
        sector_count: 0,
    };
    assert_eq!(sphere.tessellation(), (2, 3));

    let vertices = sphere.compute_vertices();
    let indices = sphere.compute_indices();
    assert_eq!(vertices.len(), 3 * 4);
    assert_eq!(vertices.len(), sphere.vertex_count());
    assert_eq!(indices.len() / 3, 2 * 3);
    assert!(indices.iter().all(|&i| (i as usize) < vertices.len()));

    let one_stack = SphereShape {
        radius: 1.0,
        stack_count: 1,
        sector_count: 8,
    };
    assert_eq!(one_stack.compute_indices(), SphereShape::new(1.0, 2, 8).compute_indices());
}

#[test]
fn sphere_is_deterministic() {
    let source = GeometrySource::from(SphereShape::default());
    assert_eq!(source.compute_vertices(), source.compute_vertices());
    assert_eq!(source.compute_indices(), source.compute_indices());
}

// ============================================================================
// Vertex layout
// ============================================================================

#[test]
fn vertex_layout_matches_struct() {
    let layout = Vertex::layout();
    assert_eq!(layout.stride, size_of::<Vertex>() as u64);

    let locations: Vec<(u32, u64)> = layout.attributes.iter().map(|a| (a.location, a.offset)).collect();
    assert_eq!(
        locations,
        vec![
            (0, offset_of!(Vertex, position) as u64),
            (1, offset_of!(Vertex, normal) as u64),
            (2, offset_of!(Vertex, tex_coords) as u64),
        ]
    );
}

#[test]
fn mesh_source_returns_data_verbatim() {
    let cube = CubeShape::new(3.0);
    let source = GeometrySource::Mesh {
        vertices: cube.compute_vertices(),
        indices: cube.compute_indices(),
    };
    assert_eq!(source.kind(), "mesh");
    assert_eq!(source.compute_vertices(), cube.compute_vertices());
    assert_eq!(source.compute_indices(), cube.compute_indices());
}
