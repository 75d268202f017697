//! Procedural and Imported Geometry Sources
//!
//! A [`GeometrySource`] is everything a [`Renderable`](super::Renderable)
//! needs to (re)build its vertex and index lists. The variants are closed:
//! procedural shapes regenerate from their parameters, imported meshes carry
//! their data verbatim.

pub mod cube;
pub mod sphere;

pub use cube::CubeShape;
pub use sphere::SphereShape;

use crate::resources::vertex::Vertex;

#[derive(Debug, Clone, PartialEq)]
pub enum GeometrySource {
    Cube(CubeShape),
    Sphere(SphereShape),
    Mesh { vertices: Vec<Vertex>, indices: Vec<u32> },
}

impl GeometrySource {
    /// Deterministic for a given set of parameters.
    #[must_use]
    pub fn compute_vertices(&self) -> Vec<Vertex> {
        match self {
            Self::Cube(cube) => cube.compute_vertices(),
            Self::Sphere(sphere) => sphere.compute_vertices(),
            Self::Mesh { vertices, .. } => vertices.clone(),
        }
    }

    #[must_use]
    pub fn compute_indices(&self) -> Vec<u32> {
        match self {
            Self::Cube(cube) => cube.compute_indices(),
            Self::Sphere(sphere) => sphere.compute_indices(),
            Self::Mesh { indices, .. } => indices.clone(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Cube(_) => "cube",
            Self::Sphere(_) => "sphere",
            Self::Mesh { .. } => "mesh",
        }
    }
}

impl From<CubeShape> for GeometrySource {
    fn from(shape: CubeShape) -> Self {
        Self::Cube(shape)
    }
}

impl From<SphereShape> for GeometrySource {
    fn from(shape: SphereShape) -> Self {
        Self::Sphere(shape)
    }
}
