//! Model
//!
//! A [`Model`] is the flattened form of an imported scene: one
//! [`Renderable`] per mesh reference, in depth-first node order (a node's own
//! meshes before its children's).
//!
//! Construction is all-or-nothing. A malformed scene (dangling mesh index,
//! face index past the vertex list, mismatched attribute lengths) aborts with
//! [`LanternError::Import`] and no model is returned. Missing or undecodable
//! textures are not fatal: they are logged and the mesh is drawn without them.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use glam::{Mat3, Mat4, Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::assets::loaders::GltfLoader;
use crate::assets::scene::{ImportedMaterial, ImportedMesh, ImportedScene, SceneNode};
use crate::context::RenderContext;
use crate::errors::{LanternError, Result};
use crate::resources::image::ImageSource;
use crate::resources::renderable::Renderable;
use crate::resources::shader::ShaderProgram;
use crate::resources::texture::{Texture, TextureCache, TextureRole};
use crate::resources::vertex::Vertex;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Bake each node's accumulated transform into its vertices. Off by
    /// default: meshes keep the coordinates stored in the file.
    pub apply_node_transforms: bool,
}

pub struct Model {
    meshes: Vec<Renderable>,
    directory: PathBuf,
    textures: TextureCache,
}

impl Model {
    /// Imports a scene file and uploads every mesh.
    pub fn load(ctx: &RenderContext, path: impl AsRef<Path>, options: &ImportOptions) -> Result<Self> {
        let path = path.as_ref();
        let scene = GltfLoader::load(path)?;
        let directory = path.parent().map_or_else(PathBuf::new, Path::to_path_buf);

        let model = Self::from_scene(ctx, &scene, directory, options)?;
        log::info!(
            "Loaded model '{}': {} mesh(es), {} texture(s)",
            path.display(),
            model.meshes.len(),
            model.textures.len()
        );
        Ok(model)
    }

    /// Flattens an already imported scene. Relative texture paths are
    /// resolved against `directory`.
    pub fn from_scene(
        ctx: &RenderContext,
        scene: &ImportedScene,
        directory: impl Into<PathBuf>,
        options: &ImportOptions,
    ) -> Result<Self> {
        let mut builder = ModelBuilder {
            ctx,
            scene,
            options,
            directory: directory.into(),
            textures: TextureCache::new(),
            meshes: Vec::new(),
        };
        builder.visit(&scene.root, Mat4::IDENTITY)?;

        Ok(Self {
            meshes: builder.meshes,
            directory: builder.directory,
            textures: builder.textures,
        })
    }

    /// A single-mesh model around an existing renderable, e.g. a primitive.
    #[must_use]
    pub fn from_renderable(renderable: Renderable) -> Self {
        Self {
            meshes: vec![renderable],
            directory: PathBuf::new(),
            textures: TextureCache::new(),
        }
    }

    /// Assigns `program` to every mesh.
    pub fn set_shader_program(&mut self, program: &Rc<ShaderProgram>) {
        for mesh in &mut self.meshes {
            mesh.set_shader_program(Rc::clone(program));
        }
    }

    /// Draws every mesh in import order.
    pub fn draw(&self) {
        for mesh in &self.meshes {
            mesh.draw();
        }
    }

    #[must_use]
    pub fn meshes(&self) -> &[Renderable] {
        &self.meshes
    }

    pub fn meshes_mut(&mut self) -> &mut [Renderable] {
        &mut self.meshes
    }

    #[must_use]
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Number of distinct images uploaded for this model.
    #[must_use]
    pub fn loaded_texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Number of distinct image sources that failed to load.
    #[must_use]
    pub fn failed_texture_count(&self) -> usize {
        self.textures.failure_count()
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("meshes", &self.meshes.len())
            .field("directory", &self.directory)
            .field("textures", &self.textures.len())
            .finish()
    }
}

// ============================================================================
// Scene flattening
// ============================================================================

struct ModelBuilder<'a> {
    ctx: &'a RenderContext,
    scene: &'a ImportedScene,
    options: &'a ImportOptions,
    directory: PathBuf,
    textures: TextureCache,
    meshes: Vec<Renderable>,
}

impl ModelBuilder<'_> {
    fn visit(&mut self, node: &SceneNode, parent: Mat4) -> Result<()> {
        let world = parent * node.transform;

        for &mesh_index in &node.meshes {
            let mesh = self.scene.meshes.get(mesh_index).ok_or_else(|| {
                LanternError::Import(format!(
                    "node {:?} references mesh {mesh_index}, but the scene has {}",
                    node.name,
                    self.scene.meshes.len()
                ))
            })?;
            let transform = self.options.apply_node_transforms.then_some(world);
            let renderable = self.build_mesh(mesh, transform)?;
            self.meshes.push(renderable);
        }

        for child in &node.children {
            self.visit(child, world)?;
        }
        Ok(())
    }

    fn build_mesh(&mut self, mesh: &ImportedMesh, transform: Option<Mat4>) -> Result<Renderable> {
        let (vertices, indices) = convert_mesh(mesh, transform)?;
        let mut renderable = Renderable::from_mesh(self.ctx, vertices, indices);

        let material = match mesh.material {
            Some(index) => Some(self.scene.materials.get(index).ok_or_else(|| {
                LanternError::Import(format!(
                    "mesh {:?} references material {index}, but the scene has {}",
                    mesh.name,
                    self.scene.materials.len()
                ))
            })?),
            None => None,
        };
        if let Some(material) = material {
            for texture in self.load_textures(material) {
                renderable.push_texture(texture);
            }
        }
        Ok(renderable)
    }

    /// Diffuse maps first, then specular maps, each in declaration order.
    fn load_textures(&mut self, material: &ImportedMaterial) -> Vec<Texture> {
        let mut textures = Vec::new();
        for role in TextureRole::ALL {
            for entry in material.textures_of(role) {
                let source = self.resolve_source(&entry.source);
                if self.textures.has_failed(&source) {
                    log::trace!("Skipping texture '{}' (failed earlier in this model)", source.key());
                    continue;
                }
                match self.textures.get_or_upload(self.ctx, &source) {
                    Ok(image) => textures.push(Texture::new(image, role)),
                    Err(err) => log::warn!(
                        "Material {:?}: skipping {role} texture '{}': {err}",
                        material.name,
                        source.key()
                    ),
                }
            }
        }
        textures
    }

    fn resolve_source(&self, source: &ImageSource) -> ImageSource {
        match source {
            ImageSource::File(path) if path.is_relative() => ImageSource::File(self.directory.join(path)),
            other => other.clone(),
        }
    }
}

/// Copies one imported mesh into the engine's vertex layout.
fn convert_mesh(mesh: &ImportedMesh, transform: Option<Mat4>) -> Result<(Vec<Vertex>, Vec<u32>)> {
    let count = mesh.positions.len();
    let fail = |what: String| LanternError::Import(format!("mesh {:?}: {what}", mesh.name));

    if !mesh.normals.is_empty() && mesh.normals.len() != count {
        return Err(fail(format!("{} normals for {count} positions", mesh.normals.len())));
    }
    if let Some(uvs) = &mesh.tex_coords {
        if uvs.len() != count {
            return Err(fail(format!("{} texture coordinates for {count} positions", uvs.len())));
        }
    }

    let normal_matrix = transform.map(|m| Mat3::from_mat4(m).inverse().transpose());

    let vertices = (0..count)
        .map(|i| {
            let mut position = mesh.positions[i];
            let mut normal = mesh.normals.get(i).copied().unwrap_or(Vec3::ZERO);
            let uv = mesh
                .tex_coords
                .as_ref()
                .map_or(Vec2::ZERO, |uvs| uvs[i]);

            if let (Some(m), Some(n)) = (transform, normal_matrix) {
                position = m.transform_point3(position);
                normal = (n * normal).normalize_or_zero();
            }
            Vertex::new(position, normal, uv)
        })
        .collect();

    let mut indices = Vec::with_capacity(mesh.faces.len() * 3);
    for face in &mesh.faces {
        if let Some(&bad) = face.iter().find(|&&i| i as usize >= count) {
            return Err(fail(format!("face index {bad} out of range for {count} vertices")));
        }
        indices.extend_from_slice(face);
    }

    Ok((vertices, indices))
}
