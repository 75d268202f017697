#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Lantern
//!
//! GPU resource and scene-asset pipeline of a small real-time 3D engine:
//! procedural and imported geometry, textures, Phong materials and shader
//! programs, drawn through a handle-based [`GpuDevice`](gpu::GpuDevice).

pub mod assets;
pub mod config;
pub mod context;
pub mod errors;
pub mod gpu;
pub mod renderer;
pub mod resources;
pub mod scene;
pub mod utils;

pub use assets::{ImportOptions, Model};
pub use config::EngineConfig;
pub use context::RenderContext;
pub use errors::{LanternError, Result};
pub use gpu::{GpuDevice, HeadlessDevice, ShaderStage, WgpuDevice};
pub use renderer::{DrawItem, FrameRenderer, FrameUniforms, RenderSettings};
pub use resources::{
    CubeShape, GeometrySource, Material, MaterialLibrary, Renderable, ShaderProgram, ShaderProgramBuilder,
    SphereShape, Texture, TextureRole, Vertex,
};
pub use scene::{Camera, CameraAction};
pub use utils::FrameClock;
