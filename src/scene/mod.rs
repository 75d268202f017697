//! Scene
//!
//! View-side state of a frame. Currently the first-person [`Camera`].

pub mod camera;

pub use camera::{Camera, CameraAction, CameraSettings};
