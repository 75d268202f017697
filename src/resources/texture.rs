//! Textures
//!
//! A [`Texture`] is a GPU image tagged with the semantic role it plays in a
//! material. GPU images are reference counted ([`Rc<GpuImage>`]) so the same
//! decoded file can back textures in several renderables; the GPU texture is
//! released when the last holder drops.
//!
//! Decoding and upload go through [`TextureCache`], which remembers every
//! source it has uploaded and hands out the shared image on repeat requests.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use rustc_hash::FxHashMap;

use crate::context::RenderContext;
use crate::errors::{LanternError, Result};
use crate::gpu::{GpuDevice, TextureId, TextureSampler, TextureUpload};
use crate::resources::image::ImageSource;

// ============================================================================
// TextureRole
// ============================================================================

/// What a texture contributes to shading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureRole {
    Diffuse,
    Specular,
}

impl TextureRole {
    pub const ALL: [Self; 2] = [Self::Diffuse, Self::Specular];

    /// Position of the role in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::Diffuse => 0,
            Self::Specular => 1,
        }
    }

    /// Uniform-name stem, e.g. `texture_diffuse` in `material.texture_diffuse1`.
    #[must_use]
    pub fn uniform_prefix(self) -> &'static str {
        match self {
            Self::Diffuse => "texture_diffuse",
            Self::Specular => "texture_specular",
        }
    }
}

impl fmt::Display for TextureRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uniform_prefix())
    }
}

impl FromStr for TextureRole {
    type Err = LanternError;

    /// Accepts the uniform stem (`texture_diffuse`) or the bare role name.
    fn from_str(s: &str) -> Result<Self> {
        let lowered = s.trim().to_ascii_lowercase();
        TextureRole::ALL
            .into_iter()
            .find(|role| {
                lowered == role.uniform_prefix()
                    || Some(lowered.as_str()) == role.uniform_prefix().strip_prefix("texture_")
            })
            .ok_or_else(|| LanternError::InvalidTextureRole(s.to_string()))
    }
}

/// `material.<role stem><instance>`, the sampler name for the n-th texture of a role.
#[must_use]
pub fn texture_uniform_name(role: TextureRole, instance: u32) -> String {
    format!("material.{}{instance}", role.uniform_prefix())
}

// ============================================================================
// GpuImage
// ============================================================================

/// An uploaded image. Owns its GPU texture handle.
pub struct GpuImage {
    id: TextureId,
    source: String,
    width: u32,
    height: u32,
    gpu: Rc<dyn GpuDevice>,
}

impl GpuImage {
    /// Decodes `source` and uploads it as a mipmapped, repeat-wrapped,
    /// trilinear-filtered texture.
    ///
    /// Nothing is registered on the GPU unless decoding succeeded.
    pub fn upload(ctx: &RenderContext, source: &ImageSource) -> Result<Self> {
        let key = source.key();
        let decoded = ctx.decoder.decode(source)?;

        let format = decoded.format().ok_or_else(|| LanternError::Decode {
            path: key.clone(),
            reason: format!("unsupported channel count {}", decoded.channels),
        })?;
        let expected = decoded.width as usize * decoded.height as usize * format.bytes_per_pixel() as usize;
        if decoded.pixels.len() != expected {
            return Err(LanternError::Decode {
                path: key,
                reason: format!(
                    "pixel buffer holds {} bytes, expected {expected}",
                    decoded.pixels.len()
                ),
            });
        }

        let upload = TextureUpload {
            label: &key,
            width: decoded.width,
            height: decoded.height,
            format,
            pixels: &decoded.pixels,
            sampler: TextureSampler::default(),
            generate_mipmaps: true,
        };
        let id = ctx
            .gpu
            .create_texture(&upload)
            .ok_or(LanternError::GpuAllocation("texture"))?;

        log::debug!(
            "Uploaded texture '{key}' ({}x{}, {format:?})",
            decoded.width,
            decoded.height
        );

        Ok(Self {
            id,
            source: key,
            width: decoded.width,
            height: decoded.height,
            gpu: Rc::clone(&ctx.gpu),
        })
    }

    #[must_use]
    pub fn id(&self) -> TextureId {
        self.id
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl fmt::Debug for GpuImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuImage")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        log::trace!("Releasing texture '{}'", self.source);
        self.gpu.delete_texture(self.id);
    }
}

// ============================================================================
// Texture
// ============================================================================

/// A shared GPU image bound to a material role.
#[derive(Debug, Clone)]
pub struct Texture {
    image: Rc<GpuImage>,
    role: TextureRole,
}

impl Texture {
    #[must_use]
    pub fn new(image: Rc<GpuImage>, role: TextureRole) -> Self {
        Self { image, role }
    }

    #[must_use]
    pub fn handle(&self) -> TextureId {
        self.image.id()
    }

    #[must_use]
    pub fn role(&self) -> TextureRole {
        self.role
    }

    /// Path (or embedded key) the image was decoded from.
    #[must_use]
    pub fn path(&self) -> &str {
        self.image.source()
    }

    #[must_use]
    pub fn image(&self) -> &Rc<GpuImage> {
        &self.image
    }
}

// ============================================================================
// TextureCache
// ============================================================================

/// Decoded-and-uploaded images keyed by source.
///
/// A source that failed once is remembered and never attempted again; later
/// requests get the recorded failure back.
#[derive(Debug, Default)]
pub struct TextureCache {
    images: FxHashMap<String, Rc<GpuImage>>,
    failures: FxHashMap<String, String>,
}

impl TextureCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached image for `source`, uploading it on first use.
    pub fn get_or_upload(&mut self, ctx: &RenderContext, source: &ImageSource) -> Result<Rc<GpuImage>> {
        let key = source.key();
        if let Some(image) = self.images.get(&key) {
            log::trace!("Texture cache hit: '{key}'");
            return Ok(Rc::clone(image));
        }
        if let Some(reason) = self.failures.get(&key) {
            return Err(LanternError::Decode {
                path: key,
                reason: format!("earlier attempt failed: {reason}"),
            });
        }

        match GpuImage::upload(ctx, source) {
            Ok(image) => {
                let image = Rc::new(image);
                self.images.insert(key, Rc::clone(&image));
                Ok(image)
            }
            Err(err) => {
                self.failures.insert(key, err.to_string());
                Err(err)
            }
        }
    }

    /// Whether `source` was attempted and failed.
    #[must_use]
    pub fn has_failed(&self, source: &ImageSource) -> bool {
        self.failures.contains_key(&source.key())
    }

    /// Number of uploaded images.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn clear(&mut self) {
        self.images.clear();
        self.failures.clear();
    }
}
