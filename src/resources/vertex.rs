use std::mem::offset_of;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};
use smallvec::smallvec;
use wgpu::VertexFormat;

use crate::gpu::{VertexAttribute, VertexLayout};

/// Number of bone influence slots carried per vertex.
pub const MAX_BONE_INFLUENCE: usize = 4;

/// Interleaved vertex as uploaded to the GPU.
///
/// Tangent, bitangent and the bone slots are carried for layout compatibility
/// with skinned assets; nothing in the engine populates or reads them.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
    pub tangent: Vec3,
    pub bitangent: Vec3,
    pub bone_ids: [i32; MAX_BONE_INFLUENCE],
    pub bone_weights: [f32; MAX_BONE_INFLUENCE],
}

impl Default for Vertex {
    fn default() -> Self {
        Self::zeroed()
    }
}

impl Vertex {
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3, tex_coords: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coords,
            ..Self::zeroed()
        }
    }

    /// The attribute layout `Renderable::setup` declares: position at
    /// location 0, normal at 1, texture coordinates at 2.
    #[must_use]
    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: smallvec![
                VertexAttribute {
                    location: 0,
                    format: VertexFormat::Float32x3,
                    offset: offset_of!(Self, position) as u64,
                },
                VertexAttribute {
                    location: 1,
                    format: VertexFormat::Float32x3,
                    offset: offset_of!(Self, normal) as u64,
                },
                VertexAttribute {
                    location: 2,
                    format: VertexFormat::Float32x2,
                    offset: offset_of!(Self, tex_coords) as u64,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_is_packed() {
        assert_eq!(std::mem::size_of::<Vertex>(), 88);
        let layout = Vertex::layout();
        assert_eq!(layout.stride, 88);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 24]);
    }
}
