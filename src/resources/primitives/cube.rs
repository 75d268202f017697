use glam::{Vec2, Vec3};

use crate::resources::vertex::Vertex;

/// One cube face: outward normal plus the in-plane axes mapped to U and V.
struct Face {
    normal: Vec3,
    u: Vec3,
    v: Vec3,
}

// Ordered +Z, -Z, +X, -X, +Y, -Y. (u, v, normal) is right-handed for every
// face, so the shared index pattern winds counter-clockwise seen from outside.
const FACES: [Face; 6] = [
    Face { normal: Vec3::Z, u: Vec3::X, v: Vec3::Y },
    Face { normal: Vec3::NEG_Z, u: Vec3::NEG_X, v: Vec3::Y },
    Face { normal: Vec3::X, u: Vec3::NEG_Z, v: Vec3::Y },
    Face { normal: Vec3::NEG_X, u: Vec3::Z, v: Vec3::Y },
    Face { normal: Vec3::Y, u: Vec3::X, v: Vec3::NEG_Z },
    Face { normal: Vec3::NEG_Y, u: Vec3::X, v: Vec3::Z },
];

// Corner order inside a face: (-u,-v), (+u,-v), (-u,+v), (+u,+v).
const CORNERS: [(f32, f32); 4] = [(-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0)];

const FACE_INDICES: [u32; 6] = [2, 0, 3, 0, 1, 3];

/// Axis-aligned cube centred on the origin with edge length `scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubeShape {
    pub scale: f32,
}

impl Default for CubeShape {
    fn default() -> Self {
        Self { scale: 1.0 }
    }
}

impl CubeShape {
    #[must_use]
    pub fn new(scale: f32) -> Self {
        Self { scale }
    }

    /// 24 vertices, 4 per face, each face with its own flat normal.
    #[must_use]
    pub fn compute_vertices(&self) -> Vec<Vertex> {
        let half = 0.5 * self.scale;
        let mut vertices = Vec::with_capacity(FACES.len() * CORNERS.len());

        for face in &FACES {
            for &(su, sv) in &CORNERS {
                let position = (face.normal + su * face.u + sv * face.v) * half;
                let uv = Vec2::new((su + 1.0) * 0.5, (sv + 1.0) * 0.5);
                vertices.push(Vertex {
                    tangent: face.u,
                    bitangent: face.v,
                    ..Vertex::new(position, face.normal, uv)
                });
            }
        }

        vertices
    }

    /// 36 indices: two triangles per face, pattern `2,0,3, 0,1,3` from each face base.
    #[must_use]
    pub fn compute_indices(&self) -> Vec<u32> {
        (0..FACES.len() as u32)
            .flat_map(|face| {
                let base = face * CORNERS.len() as u32;
                FACE_INDICES.iter().map(move |i| base + i)
            })
            .collect()
    }
}
