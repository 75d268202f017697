//! Image Decoding
//!
//! Turns an [`ImageSource`] into tightly packed 8-bit pixels. The decoder is a
//! trait object held by the [`RenderContext`](crate::context::RenderContext),
//! so asset tooling and tests can substitute their own.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::errors::{LanternError, Result};
use crate::gpu::PixelFormat;

/// Where image bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An image file on disk.
    File(PathBuf),
    /// Bytes embedded in another asset; `key` identifies them for caching.
    Embedded { key: String, bytes: Arc<[u8]> },
}

impl ImageSource {
    /// Cache key and display label of the source.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::File(path) => path.display().to_string(),
            Self::Embedded { key, .. } => key.clone(),
        }
    }
}

impl From<PathBuf> for ImageSource {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

impl From<&Path> for ImageSource {
    fn from(path: &Path) -> Self {
        Self::File(path.to_path_buf())
    }
}

/// CPU-side decoded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// 1, 3 or 4.
    pub channels: u8,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    #[must_use]
    pub fn format(&self) -> Option<PixelFormat> {
        PixelFormat::from_channels(self.channels)
    }
}

/// Decodes image sources into pixel buffers.
pub trait ImageDecoder {
    fn decode(&self, source: &ImageSource) -> Result<DecodedImage>;
}

/// Default decoder backed by the `image` crate.
///
/// Single-channel images stay single-channel, RGB stays RGB, anything else
/// (grey+alpha, 16-bit, float) is converted to RGBA8.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, source: &ImageSource) -> Result<DecodedImage> {
        let label = source.key();
        let decoded = match source {
            ImageSource::File(path) => image::open(path),
            ImageSource::Embedded { bytes, .. } => image::load_from_memory(bytes),
        }
        .map_err(|e| match e {
            image::ImageError::IoError(io) => LanternError::Io {
                path: PathBuf::from(&label),
                source: io,
            },
            other => LanternError::Decode {
                path: label.clone(),
                reason: other.to_string(),
            },
        })?;

        let (width, height) = (decoded.width(), decoded.height());
        let (channels, pixels) = match decoded {
            image::DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            image::DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            other => (4, other.to_rgba8().into_raw()),
        };

        log::debug!("Decoded image '{label}' ({width}x{height}, {channels} channels)");

        Ok(DecodedImage {
            width,
            height,
            channels,
            pixels,
        })
    }
}
