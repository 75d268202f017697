//! Error Types
//!
//! This module defines the error types used throughout the engine.
//!
//! # Overview
//!
//! The main error type [`LanternError`] covers the failure modes that are
//! raised to a caller:
//! - GPU initialization failures
//! - Missing or unreadable source files (shaders, material database, scenes)
//! - Scene import and image decode errors
//! - Configuration errors
//!
//! Resource-creation failures that the engine degrades around (a shader
//! stage that fails to compile, a texture that fails to decode) are logged at
//! the failure site. The same variants are still used when such a failure
//! needs to travel to a caller, for example from
//! [`Renderable::try_set_texture`](crate::resources::Renderable::try_set_texture).
//!
//! # Usage
//!
//! All fallible public APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, LanternError>`.
//!
//! ```rust,ignore
//! use lantern::errors::{LanternError, Result};
//!
//! fn load_asset() -> Result<()> {
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// The main error type for the Lantern engine.
#[derive(Error, Debug)]
pub enum LanternError {
    // ========================================================================
    // GPU Errors
    // ========================================================================
    /// Failed to request a compatible GPU adapter.
    #[error("Failed to request WGPU adapter: {0}")]
    AdapterRequestFailed(String),

    /// Failed to create the GPU device.
    #[error("Failed to create WGPU device: {0}")]
    DeviceCreateFailed(#[from] wgpu::RequestDeviceError),

    /// The device refused to allocate an object (the "handle zero" case).
    #[error("GPU allocation failed: {0}")]
    GpuAllocation(&'static str),

    // ========================================================================
    // Shader Errors
    // ========================================================================
    /// A shader stage failed to compile.
    #[error("Shader stage '{label}' failed to compile:\n{log}")]
    ShaderCompile {
        /// Source path or label of the stage
        label: String,
        /// Compiler log
        log: String,
    },

    /// A shader program failed to link.
    #[error("Shader program '{label}' failed to link:\n{log}")]
    ShaderLink {
        /// Program label
        label: String,
        /// Linker log
        log: String,
    },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error, tagged with the path that failed.
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        /// The file that could not be read
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Asset Errors
    // ========================================================================
    /// Scene file could not be imported.
    #[error("Scene import error: {0}")]
    Import(String),

    /// Image decoding error.
    #[error("Image decode error on '{path}': {reason}")]
    Decode {
        /// Path (or embedded key) of the image
        path: String,
        /// Decoder message
        reason: String,
    },

    /// A string that does not name a texture role.
    #[error("Invalid texture role: {0}")]
    InvalidTextureRole(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration file could not be parsed.
    #[error("Configuration parse error: {0}")]
    Config(#[from] serde_json::Error),
}

impl LanternError {
    /// Wraps an [`std::io::Error`] with the path it happened on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

// ============================================================================
// Convenient conversion implementations
// ============================================================================

impl From<gltf::Error> for LanternError {
    fn from(err: gltf::Error) -> Self {
        LanternError::Import(err.to_string())
    }
}

/// Alias for `Result<T, LanternError>`.
pub type Result<T> = std::result::Result<T, LanternError>;
