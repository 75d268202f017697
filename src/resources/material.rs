//! Material Library
//!
//! Phong material coefficients read from a line-oriented `.mtl` text file:
//!
//! ```text
//! # comment
//! newmtl Gold
//! Ka 0.24725 0.1995 0.0745
//! Kd 0.75164 0.60648 0.22648
//! Ks 0.628281 0.555802 0.366065
//! Ns 0.4
//! d 1.0
//! ```
//!
//! Parsing never fails: malformed or unexpected lines are logged and
//! skipped. Only an unreadable file is an error, raised by
//! [`MaterialLibrary::load`].
//!
//! Lookup through [`MaterialLibrary::resolve`] is case-insensitive and never
//! fails either; an unknown tag resolves to the zero-valued
//! [`NOT_A_MATERIAL`] sentinel.

use std::fmt;
use std::path::{Path, PathBuf};

use glam::Vec3;
use rustc_hash::FxHashMap;

use crate::errors::{LanternError, Result};
use crate::resources::shader::ShaderProgram;

/// Tag of the sentinel returned for unknown materials.
pub const NOT_A_MATERIAL: &str = "not-a-material";

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub vertex_shader: Option<PathBuf>,
    pub fragment_shader: Option<PathBuf>,
}

impl Material {
    /// A zero-valued material with the given tag.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ambient: Vec3::ZERO,
            diffuse: Vec3::ZERO,
            specular: Vec3::ZERO,
            shininess: 0.0,
            vertex_shader: None,
            fragment_shader: None,
        }
    }

    #[must_use]
    pub fn sentinel() -> Self {
        Self::new(NOT_A_MATERIAL)
    }

    #[must_use]
    pub fn is_sentinel(&self) -> bool {
        self.name == NOT_A_MATERIAL
    }

    /// Attaches the shader stages meant to render this material.
    #[must_use]
    pub fn with_shaders(mut self, vertex: impl Into<PathBuf>, fragment: impl Into<PathBuf>) -> Self {
        self.vertex_shader = Some(vertex.into());
        self.fragment_shader = Some(fragment.into());
        self
    }

    /// Uploads `material.ambient/diffuse/specular/shininess` to `program`.
    pub fn apply(&self, program: &ShaderProgram) {
        program.set_vec3("material.ambient", self.ambient);
        program.set_vec3("material.diffuse", self.diffuse);
        program.set_vec3("material.specular", self.specular);
        program.set_float("material.shininess", self.shininess);
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [ar, ag, ab] = self.ambient.to_array();
        let [dr, dg, db] = self.diffuse.to_array();
        let [sr, sg, sb] = self.specular.to_array();
        write!(
            f,
            "Material(type: {}, ambient: [{ar}, {ag}, {ab}], diffuse: [{dr}, {dg}, {db}], specular: [{sr}, {sg}, {sb}], shininess: {})",
            self.name, self.shininess
        )
    }
}

// ============================================================================
// MaterialLibrary
// ============================================================================

/// Parsed materials keyed by lowercase tag.
#[derive(Debug, Clone)]
pub struct MaterialLibrary {
    materials: FxHashMap<String, Material>,
    sentinel: Material,
}

impl Default for MaterialLibrary {
    fn default() -> Self {
        Self {
            materials: FxHashMap::default(),
            sentinel: Material::sentinel(),
        }
    }
}

impl MaterialLibrary {
    /// Reads and parses a material file. A missing file is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| LanternError::io(path, e))?;
        let library = Self::parse(&text);
        log::info!(
            "Loaded {} material(s) from '{}'",
            library.len(),
            path.display()
        );
        Ok(library)
    }

    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut library = Self::default();
        let mut current: Option<Material> = None;

        for (number, raw) in text.lines().enumerate() {
            let number = number + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut tokens = line.split_whitespace();
            let Some(directive) = tokens.next() else {
                continue;
            };
            let args: Vec<&str> = tokens.collect();

            if directive == "newmtl" {
                if let Some(done) = current.take() {
                    library.insert(done);
                }
                match args.first() {
                    Some(name) => current = Some(Material::new(*name)),
                    None => log::warn!("line {number}: 'newmtl' without a name"),
                }
                continue;
            }

            let Some(material) = current.as_mut() else {
                log::warn!("line {number}: no material defined yet, ignoring '{line}'");
                continue;
            };

            match directive {
                "Ka" | "Kd" | "Ks" => match parse_vec3(&args) {
                    Some(color) => match directive {
                        "Ka" => material.ambient = color,
                        "Kd" => material.diffuse = color,
                        _ => material.specular = color,
                    },
                    None => log::warn!("line {number}: malformed color in '{line}'"),
                },
                "Ns" => match args.first().and_then(|v| v.parse::<f32>().ok()) {
                    Some(shininess) => material.shininess = shininess,
                    None => log::warn!("line {number}: malformed shininess in '{line}'"),
                },
                // Transparency is read but not used by the renderer.
                "d" => {
                    if args.first().and_then(|v| v.parse::<f32>().ok()).is_none() {
                        log::warn!("line {number}: malformed transparency in '{line}'");
                    }
                }
                other => log::warn!("line {number}: unexpected directive '{other}'"),
            }
        }

        if let Some(done) = current {
            library.insert(done);
        }
        library
    }

    /// Adds or replaces a material.
    pub fn insert(&mut self, material: Material) {
        let key = material.name.to_lowercase();
        if self.materials.contains_key(&key) {
            log::warn!("Material '{}' defined more than once, keeping the last one", material.name);
        }
        self.materials.insert(key, material);
    }

    /// The material tagged `tag` (any case), or the [`NOT_A_MATERIAL`] sentinel.
    #[must_use]
    pub fn resolve(&self, tag: &str) -> &Material {
        self.materials.get(&tag.to_lowercase()).unwrap_or_else(|| {
            log::debug!("Unknown material '{tag}', using '{NOT_A_MATERIAL}'");
            &self.sentinel
        })
    }

    #[must_use]
    pub fn contains(&self, tag: &str) -> bool {
        self.materials.contains_key(&tag.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Material> {
        self.materials.values()
    }
}

fn parse_vec3(args: &[&str]) -> Option<Vec3> {
    let [x, y, z] = args else {
        return None;
    };
    Some(Vec3::new(x.parse().ok()?, y.parse().ok()?, z.parse().ok()?))
}
