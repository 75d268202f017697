//! Scene Assets
//!
//! Import path for external scene files: [`GltfLoader`] parses a file into a
//! loader-neutral [`ImportedScene`], and [`Model`] flattens that into
//! uploaded [`Renderable`](crate::resources::Renderable)s.

pub mod loaders;
pub mod model;
pub mod scene;

pub use loaders::GltfLoader;
pub use model::{ImportOptions, Model};
pub use scene::{ImportedMaterial, ImportedMesh, ImportedScene, MaterialTexture, SceneNode};
