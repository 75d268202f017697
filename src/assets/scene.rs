//! Imported scene graph.
//!
//! The loader-neutral shape a scene file is converted into before any GPU
//! work happens: a node tree whose nodes index into flat mesh and material
//! arrays. [`Model::from_scene`](super::Model::from_scene) flattens it into
//! renderables.

use glam::{Mat4, Vec2, Vec3};

use crate::resources::image::ImageSource;
use crate::resources::texture::TextureRole;

#[derive(Debug, Clone, PartialEq)]
pub struct SceneNode {
    pub name: Option<String>,
    /// Local transform relative to the parent.
    pub transform: Mat4,
    /// Indices into [`ImportedScene::meshes`].
    pub meshes: Vec<usize>,
    pub children: Vec<SceneNode>,
}

impl Default for SceneNode {
    fn default() -> Self {
        Self {
            name: None,
            transform: Mat4::IDENTITY,
            meshes: Vec::new(),
            children: Vec::new(),
        }
    }
}

impl SceneNode {
    /// Depth-first count of nodes in this subtree, including `self`.
    #[must_use]
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(SceneNode::node_count).sum::<usize>()
    }
}

/// One triangle mesh with a single material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedMesh {
    pub name: Option<String>,
    pub positions: Vec<Vec3>,
    /// Same length as `positions`, or empty when the file has none.
    pub normals: Vec<Vec3>,
    /// First UV channel, if present.
    pub tex_coords: Option<Vec<Vec2>>,
    pub faces: Vec<[u32; 3]>,
    /// Index into [`ImportedScene::materials`].
    pub material: Option<usize>,
}

/// A texture reference of a material.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterialTexture {
    pub role: TextureRole,
    /// Relative file paths are resolved against the model directory.
    pub source: ImageSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportedMaterial {
    pub name: Option<String>,
    pub textures: Vec<MaterialTexture>,
}

impl ImportedMaterial {
    /// Textures of one role, in declaration order.
    pub fn textures_of(&self, role: TextureRole) -> impl Iterator<Item = &MaterialTexture> {
        self.textures.iter().filter(move |t| t.role == role)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedScene {
    pub root: SceneNode,
    pub meshes: Vec<ImportedMesh>,
    pub materials: Vec<ImportedMaterial>,
}
