//! GPU Resources
//!
//! The objects that own GPU state on behalf of the scene:
//! - [`Renderable`]: vertex/index buffers, textures and a program reference
//! - [`ShaderProgram`] and its [`ShaderProgramBuilder`]
//! - [`Texture`]: a shared GPU image tagged with a [`TextureRole`]
//! - [`MaterialLibrary`]: Phong coefficients parsed from `.mtl` text
//! - [`primitives`]: procedural cube and sphere geometry

pub mod image;
pub mod material;
pub mod primitives;
pub mod renderable;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use image::{DecodedImage, ImageCrateDecoder, ImageDecoder, ImageSource};
pub use material::{Material, MaterialLibrary, NOT_A_MATERIAL};
pub use primitives::{CubeShape, GeometrySource, SphereShape};
pub use renderable::{GpuBuffers, Renderable};
pub use shader::{CompiledStage, ShaderProgram, ShaderProgramBuilder};
pub use texture::{GpuImage, Texture, TextureCache, TextureRole, texture_uniform_name};
pub use vertex::Vertex;
