//! Uniform Naming Protocol
//!
//! Maps the uniform names the engine uploads (`model`, `material.diffuse`,
//! `material.texture_specular2`, ...) onto concrete shader resources.
//!
//! | Name | WGSL resource | Group / binding |
//! |------|---------------|-----------------|
//! | `model`, `view`, `projection` | `var<uniform> model: mat4x4<f32>` | 0 / 0, 1, 2 |
//! | `material.ambient` .. `material.shininess` | `var<uniform> material: MaterialUniforms` | 1 / 0 |
//! | `material.texture_<role><n>` | `material_texture_<role><n>` + `_sampler` | 2 / 2s, 2s+1 |
//!
//! `s` is the sampler slot: `role_index * MAX_TEXTURES_PER_ROLE + (n - 1)`.
//!
//! A name only resolves for a program whose own stage sources reference the
//! resource. Names the shader never touches behave like an inactive uniform:
//! the lookup fails and the caller's upload is a no-op.

use bytemuck::{Pod, Zeroable};

use super::UniformValue;
use crate::resources::texture::TextureRole;

/// Texture instances available per role (`material.texture_diffuse1..=4`).
pub const MAX_TEXTURES_PER_ROLE: u32 = 4;

/// Total sampler slots declared by the prelude.
pub const TEXTURE_SLOT_COUNT: usize = TextureRole::ALL.len() * MAX_TEXTURES_PER_ROLE as usize;

pub const TRANSFORM_GROUP: u32 = 0;
pub const MATERIAL_GROUP: u32 = 1;
pub const TEXTURE_GROUP: u32 = 2;

// ============================================================================
// Slot kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformUniform {
    Model,
    View,
    Projection,
}

impl TransformUniform {
    pub const ALL: [Self; 3] = [Self::Model, Self::View, Self::Projection];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::View => "view",
            Self::Projection => "projection",
        }
    }

    #[must_use]
    pub fn binding(self) -> u32 {
        match self {
            Self::Model => 0,
            Self::View => 1,
            Self::Projection => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialField {
    Ambient,
    Diffuse,
    Specular,
    Shininess,
}

impl MaterialField {
    pub const ALL: [Self; 4] = [Self::Ambient, Self::Diffuse, Self::Specular, Self::Shininess];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ambient => "material.ambient",
            Self::Diffuse => "material.diffuse",
            Self::Specular => "material.specular",
            Self::Shininess => "material.shininess",
        }
    }
}

/// `material.texture_<role><instance>`, with `instance` starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplerSlot {
    pub role: TextureRole,
    pub instance: u32,
}

impl SamplerSlot {
    #[must_use]
    pub fn new(role: TextureRole, instance: u32) -> Option<Self> {
        (1..=MAX_TEXTURES_PER_ROLE)
            .contains(&instance)
            .then_some(Self { role, instance })
    }

    /// Flat index into the prelude's texture table.
    #[must_use]
    pub fn index(self) -> usize {
        (self.role.index() as u32 * MAX_TEXTURES_PER_ROLE + self.instance - 1) as usize
    }

    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        let per_role = MAX_TEXTURES_PER_ROLE as usize;
        let role = *TextureRole::ALL.get(index / per_role)?;
        Self::new(role, (index % per_role) as u32 + 1)
    }

    #[must_use]
    pub fn texture_binding(self) -> u32 {
        self.index() as u32 * 2
    }

    #[must_use]
    pub fn sampler_binding(self) -> u32 {
        self.texture_binding() + 1
    }

    /// Identifier of the texture variable in WGSL (`material_texture_diffuse1`).
    #[must_use]
    pub fn wgsl_ident(self) -> String {
        format!("material_{}{}", self.role.uniform_prefix(), self.instance)
    }

    #[must_use]
    pub fn uniform_name(self) -> String {
        format!("material.{}{}", self.role.uniform_prefix(), self.instance)
    }
}

// ============================================================================
// UniformSlot
// ============================================================================

/// A resolved uniform location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformSlot {
    Transform(TransformUniform),
    Material(MaterialField),
    Sampler(SamplerSlot),
}

impl UniformSlot {
    /// Parses a protocol name. Returns `None` for names outside the protocol.
    #[must_use]
    pub fn resolve(name: &str) -> Option<Self> {
        if let Some(t) = TransformUniform::ALL.into_iter().find(|t| t.name() == name) {
            return Some(Self::Transform(t));
        }
        if let Some(f) = MaterialField::ALL.into_iter().find(|f| f.name() == name) {
            return Some(Self::Material(f));
        }

        let rest = name.strip_prefix("material.")?;
        TextureRole::ALL.into_iter().find_map(|role| {
            let digits = rest.strip_prefix(role.uniform_prefix())?;
            // Exact decimal only: `diffuse01` is not `diffuse1`.
            if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            let instance = digits.parse::<u32>().ok()?;
            SamplerSlot::new(role, instance).map(Self::Sampler)
        })
    }

    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Transform(t) => t.name().to_string(),
            Self::Material(f) => f.name().to_string(),
            Self::Sampler(s) => s.uniform_name(),
        }
    }

    /// Whether `source` (user stage code, without the prelude) uses this slot.
    #[must_use]
    pub fn is_referenced_by(&self, source: &str) -> bool {
        match self {
            Self::Transform(t) => contains_identifier(source, t.name()),
            Self::Material(f) => contains_identifier(source, f.name()),
            Self::Sampler(s) => contains_identifier(source, &s.wgsl_ident()),
        }
    }

    /// Whether `value` has the type the slot declares.
    #[must_use]
    pub fn accepts(&self, value: &UniformValue) -> bool {
        matches!(
            (self, value),
            (Self::Transform(_), UniformValue::Mat4(_))
                | (
                    Self::Material(
                        MaterialField::Ambient | MaterialField::Diffuse | MaterialField::Specular
                    ),
                    UniformValue::Vec3(_)
                )
                | (Self::Material(MaterialField::Shininess), UniformValue::Float(_))
                | (Self::Sampler(_), UniformValue::Int(_))
        )
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Finds `token` with identifier boundaries on both sides.
fn contains_identifier(source: &str, token: &str) -> bool {
    let bytes = source.as_bytes();
    source.match_indices(token).any(|(start, _)| {
        let end = start + token.len();
        let before_ok = start == 0 || !is_ident_byte(bytes[start - 1]);
        let after_ok = end == bytes.len() || !is_ident_byte(bytes[end]);
        before_ok && after_ok
    })
}

// ============================================================================
// Material uniform block
// ============================================================================

/// CPU mirror of the WGSL `MaterialUniforms` struct (std140-style packing).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct MaterialBlock {
    pub ambient: [f32; 3],
    pub _pad0: f32,
    pub diffuse: [f32; 3],
    pub _pad1: f32,
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl MaterialBlock {
    /// Writes one field. Type mismatches are filtered by [`UniformSlot::accepts`].
    pub fn set(&mut self, field: MaterialField, value: UniformValue) {
        match (field, value) {
            (MaterialField::Ambient, UniformValue::Vec3(v)) => self.ambient = v.to_array(),
            (MaterialField::Diffuse, UniformValue::Vec3(v)) => self.diffuse = v.to_array(),
            (MaterialField::Specular, UniformValue::Vec3(v)) => self.specular = v.to_array(),
            (MaterialField::Shininess, UniformValue::Float(s)) => self.shininess = s,
            _ => {}
        }
    }
}
