//! Engine Configuration
//!
//! A JSON file naming the assets the engine starts with:
//!
//! ```json
//! {
//!   "materials": "materials.mtl",
//!   "shaders": { "vertex": "shaders/phong_vertex.wgsl", "fragment": "shaders/phong_fragment.wgsl" },
//!   "model": "models/scene.gltf",
//!   "import": { "apply_node_transforms": false },
//!   "render": { "width": 800, "height": 600 },
//!   "camera": { "position": [0.0, 1.0, 3.0] }
//! }
//! ```
//!
//! Every field except `materials` is optional. Relative paths are resolved
//! against the directory holding the file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::assets::ImportOptions;
use crate::errors::{LanternError, Result};
use crate::renderer::RenderSettings;
use crate::scene::CameraSettings;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderPaths {
    pub vertex: Option<PathBuf>,
    pub fragment: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub materials: PathBuf,
    #[serde(default)]
    pub shaders: ShaderPaths,
    #[serde(default)]
    pub model: Option<PathBuf>,
    #[serde(default)]
    pub import: ImportOptions,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub camera: CameraSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            materials: PathBuf::from("materials.mtl"),
            shaders: ShaderPaths::default(),
            model: None,
            import: ImportOptions::default(),
            render: RenderSettings::default(),
            camera: CameraSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Reads `path` and resolves its relative paths against the file's directory.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LanternError::io(path, e))?;
        let mut config = Self::from_json(&text)?;
        if let Some(dir) = path.parent() {
            config.resolve_paths(dir);
        }
        log::info!("Loaded configuration '{}'", path.display());
        Ok(config)
    }

    /// Parses configuration text without touching its paths.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Joins every relative path onto `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.materials);
        for path in [&mut self.shaders.vertex, &mut self.shaders.fragment, &mut self.model]
            .into_iter()
            .flatten()
        {
            resolve(path);
        }
    }
}
