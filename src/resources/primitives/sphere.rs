use std::f32::consts::{FRAC_PI_2, PI, TAU};

use glam::{Vec2, Vec3};

use crate::resources::vertex::Vertex;

/// UV sphere centred on the origin.
///
/// Stacks run from the north pole (`i = 0`) to the south pole
/// (`i = stack_count`); sectors run around the Y axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphereShape {
    pub radius: f32,
    pub stack_count: u32,
    pub sector_count: u32,
}

impl Default for SphereShape {
    fn default() -> Self {
        Self {
            radius: 1.0,
            stack_count: 16,
            sector_count: 32,
        }
    }
}

impl SphereShape {
    /// Clamps the tessellation to at least 2 stacks and 3 sectors.
    #[must_use]
    pub fn new(radius: f32, stack_count: u32, sector_count: u32) -> Self {
        Self {
            radius,
            stack_count: stack_count.max(2),
            sector_count: sector_count.max(3),
        }
    }

    /// Stack and sector counts actually generated. The fields are public, so
    /// the minimum from [`new`](Self::new) is applied again here.
    #[must_use]
    pub fn tessellation(&self) -> (u32, u32) {
        (self.stack_count.max(2), self.sector_count.max(3))
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        let (stacks, sectors) = self.tessellation();
        (stacks as usize + 1) * (sectors as usize + 1)
    }

    #[must_use]
    pub fn compute_vertices(&self) -> Vec<Vertex> {
        let (stacks, sectors) = self.tessellation();
        let mut vertices = Vec::with_capacity(self.vertex_count());

        for i in 0..=stacks {
            let stack_angle = FRAC_PI_2 - PI * i as f32 / stacks as f32;
            let (ring_y, ring_xz) = stack_angle.sin_cos();

            // The seam column (j == sectors) duplicates j == 0 with u = 1.
            for j in 0..=sectors {
                let sector_angle = TAU * j as f32 / sectors as f32;
                let (sin_s, cos_s) = sector_angle.sin_cos();

                let direction = Vec3::new(ring_xz * cos_s, ring_y, ring_xz * sin_s);
                let uv = Vec2::new(j as f32 / sectors as f32, i as f32 / stacks as f32);
                vertices.push(Vertex::new(direction * self.radius, direction, uv));
            }
        }

        vertices
    }

    /// Two triangles per cell, except the single-triangle pole rows.
    #[must_use]
    pub fn compute_indices(&self) -> Vec<u32> {
        let (stacks, sectors) = self.tessellation();
        let mut indices = Vec::with_capacity(6 * sectors as usize * (stacks as usize - 1));

        for i in 0..stacks {
            let mut k1 = i * (sectors + 1);
            let mut k2 = k1 + sectors + 1;

            for _ in 0..sectors {
                if i != 0 {
                    indices.extend_from_slice(&[k1, k2, k1 + 1]);
                }
                if i != stacks - 1 {
                    indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
                }
                k1 += 1;
                k2 += 1;
            }
        }

        indices
    }
}
