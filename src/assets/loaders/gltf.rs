use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::Engine as _;
use glam::{Mat4, Vec2, Vec3};

use crate::assets::scene::{ImportedMaterial, ImportedMesh, ImportedScene, MaterialTexture, SceneNode};
use crate::errors::{LanternError, Result};
use crate::resources::image::ImageSource;
use crate::resources::texture::TextureRole;

// ============================================================================
// 1. Entry point
// ============================================================================

/// Converts `.gltf` / `.glb` files into an [`ImportedScene`].
///
/// Every triangle primitive becomes one [`ImportedMesh`]. Texture images are
/// referenced, not decoded: external files become relative
/// [`ImageSource::File`] paths, images in buffer views or `data:` URIs become
/// [`ImageSource::Embedded`] keyed `<file>#image<N>`.
pub struct GltfLoader {
    base_path: PathBuf,
    file_label: String,
}

impl GltfLoader {
    pub fn load(path: impl AsRef<Path>) -> Result<ImportedScene> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|e| LanternError::io(path, e))?;
        let gltf = gltf::Gltf::from_reader(std::io::BufReader::new(file))?;

        let loader = Self {
            base_path: path.parent().map_or_else(PathBuf::new, Path::to_path_buf),
            file_label: path.display().to_string(),
        };
        let buffers = loader.load_buffers(&gltf)?;

        let mut scene = ImportedScene::default();

        // glTF meshes hold several primitives; remember where each one's
        // flattened primitives start.
        let mut primitive_ranges = Vec::with_capacity(gltf.meshes().len());
        for mesh in gltf.meshes() {
            let start = scene.meshes.len();
            for primitive in mesh.primitives() {
                if let Some(imported) = Self::load_primitive(&mesh, &primitive, &buffers)? {
                    scene.meshes.push(imported);
                }
            }
            primitive_ranges.push(start..scene.meshes.len());
        }

        scene.materials = gltf
            .materials()
            .map(|material| loader.load_material(&material, &buffers))
            .collect::<Result<_>>()?;

        let root_nodes: Vec<SceneNode> = match gltf.default_scene().or_else(|| gltf.scenes().next()) {
            Some(default_scene) => default_scene
                .nodes()
                .map(|node| Self::load_node(&node, &primitive_ranges))
                .collect(),
            None => {
                log::warn!("'{}' defines no scene; importing nothing", loader.file_label);
                Vec::new()
            }
        };
        scene.root = SceneNode {
            name: Some(loader.file_label.clone()),
            children: root_nodes,
            ..SceneNode::default()
        };

        log::info!(
            "Imported '{}': {} nodes, {} meshes, {} materials",
            loader.file_label,
            scene.root.node_count(),
            scene.meshes.len(),
            scene.materials.len()
        );
        Ok(scene)
    }

    fn load_buffers(&self, gltf: &gltf::Gltf) -> Result<Vec<Vec<u8>>> {
        let mut buffer_data = Vec::new();
        for buffer in gltf.buffers() {
            let data = match buffer.source() {
                gltf::buffer::Source::Bin => gltf
                    .blob
                    .clone()
                    .ok_or_else(|| LanternError::Import("missing GLB binary chunk".to_string()))?,
                gltf::buffer::Source::Uri(uri) => {
                    if let Some(bytes) = decode_data_uri(uri)? {
                        bytes
                    } else {
                        let buffer_path = self.base_path.join(uri);
                        fs::read(&buffer_path).map_err(|e| LanternError::io(&buffer_path, e))?
                    }
                }
            };
            if data.len() < buffer.length() {
                return Err(LanternError::Import(format!(
                    "buffer {} holds {} bytes, expected {}",
                    buffer.index(),
                    data.len(),
                    buffer.length()
                )));
            }
            buffer_data.push(data);
        }
        Ok(buffer_data)
    }

    // ========================================================================
    // 2. Nodes
    // ========================================================================

    fn load_node(node: &gltf::Node<'_>, primitive_ranges: &[std::ops::Range<usize>]) -> SceneNode {
        let meshes = node
            .mesh()
            .and_then(|mesh| primitive_ranges.get(mesh.index()).cloned())
            .map(Iterator::collect)
            .unwrap_or_default();

        SceneNode {
            name: node.name().map(str::to_owned),
            transform: Mat4::from_cols_array_2d(&node.transform().matrix()),
            meshes,
            children: node
                .children()
                .map(|child| Self::load_node(&child, primitive_ranges))
                .collect(),
        }
    }

    // ========================================================================
    // 3. Meshes
    // ========================================================================

    fn load_primitive(
        mesh: &gltf::Mesh<'_>,
        primitive: &gltf::Primitive<'_>,
        buffers: &[Vec<u8>],
    ) -> Result<Option<ImportedMesh>> {
        let name = mesh.name().map(str::to_owned);
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!(
                "Skipping primitive {} of mesh {:?}: {:?} topology is not supported",
                primitive.index(),
                name,
                primitive.mode()
            );
            return Ok(None);
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let positions: Vec<Vec3> = reader
            .read_positions()
            .ok_or_else(|| {
                LanternError::Import(format!(
                    "primitive {} of mesh {name:?} has no positions",
                    primitive.index()
                ))
            })?
            .map(Vec3::from_array)
            .collect();

        let normals: Vec<Vec3> = reader
            .read_normals()
            .map(|iter| iter.map(Vec3::from_array).collect())
            .unwrap_or_default();

        let tex_coords: Option<Vec<Vec2>> = reader
            .read_tex_coords(0)
            .map(|iter| iter.into_f32().map(Vec2::from_array).collect());

        let indices: Vec<u32> = match reader.read_indices() {
            Some(iter) => iter.into_u32().collect(),
            None => (0..positions.len() as u32).collect(),
        };
        if indices.len() % 3 != 0 {
            log::warn!(
                "Mesh {name:?} has {} indices, dropping the incomplete trailing triangle",
                indices.len()
            );
        }
        let faces = indices
            .chunks_exact(3)
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect();

        Ok(Some(ImportedMesh {
            name,
            positions,
            normals,
            tex_coords,
            faces,
            material: primitive.material().index(),
        }))
    }

    // ========================================================================
    // 4. Materials
    // ========================================================================

    fn load_material(&self, material: &gltf::Material<'_>, buffers: &[Vec<u8>]) -> Result<ImportedMaterial> {
        let mut slots: Vec<(TextureRole, gltf::texture::Info<'_>)> = Vec::new();

        if let Some(info) = material.pbr_metallic_roughness().base_color_texture() {
            slots.push((TextureRole::Diffuse, info));
        }
        if let Some(info) = material.specular().and_then(|s| s.specular_color_texture()) {
            slots.push((TextureRole::Specular, info));
        }
        if let Some(sg) = material.pbr_specular_glossiness() {
            if let Some(info) = sg.diffuse_texture() {
                slots.push((TextureRole::Diffuse, info));
            }
            if let Some(info) = sg.specular_glossiness_texture() {
                slots.push((TextureRole::Specular, info));
            }
        }

        let mut textures = Vec::with_capacity(slots.len());
        for (role, info) in slots {
            let source = self.image_source(&info.texture().source(), buffers)?;
            if textures
                .iter()
                .any(|t: &MaterialTexture| t.role == role && t.source == source)
            {
                continue;
            }
            textures.push(MaterialTexture { role, source });
        }

        Ok(ImportedMaterial {
            name: material.name().map(str::to_owned),
            textures,
        })
    }

    fn image_source(&self, image: &gltf::Image<'_>, buffers: &[Vec<u8>]) -> Result<ImageSource> {
        let key = format!("{}#image{}", self.file_label, image.index());
        match image.source() {
            gltf::image::Source::Uri { uri, .. } => match decode_data_uri(uri)? {
                Some(bytes) => Ok(ImageSource::Embedded {
                    key,
                    bytes: Arc::from(bytes),
                }),
                None => Ok(ImageSource::File(PathBuf::from(uri))),
            },
            gltf::image::Source::View { view, .. } => {
                let start = view.offset();
                let end = start + view.length();
                let bytes = buffers
                    .get(view.buffer().index())
                    .and_then(|buffer| buffer.get(start..end))
                    .ok_or_else(|| {
                        LanternError::Import(format!("image {} points outside its buffer", image.index()))
                    })?;
                Ok(ImageSource::Embedded {
                    key,
                    bytes: Arc::from(bytes),
                })
            }
        }
    }
}

/// Decodes a base64 `data:` URI. `Ok(None)` for ordinary URIs.
fn decode_data_uri(uri: &str) -> Result<Option<Vec<u8>>> {
    let Some(rest) = uri.strip_prefix("data:") else {
        return Ok(None);
    };
    let Some((_, payload)) = rest.split_once(";base64,") else {
        return Err(LanternError::Import(format!(
            "unsupported data URI encoding: {}",
            rest.chars().take(32).collect::<String>()
        )));
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map(Some)
        .map_err(|e| LanternError::Import(format!("invalid base64 data URI: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_decoding() {
        let decoded = decode_data_uri("data:application/octet-stream;base64,AAEC").unwrap();
        assert_eq!(decoded, Some(vec![0, 1, 2]));
        assert_eq!(decode_data_uri("textures/wood.png").unwrap(), None);
        assert!(decode_data_uri("data:text/plain,hello").is_err());
    }
}
