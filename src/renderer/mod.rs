//! Draw Loop
//!
//! [`FrameRenderer`] turns a list of [`DrawItem`]s into draw calls:
//!
//! ```text
//! begin ── for each item ──▶ for each mesh ──▶ bind program
//!                                             view / projection / model
//!                                             material coefficients
//!                                             Renderable::draw
//!       ── finish ──▶ WgpuDevice::finish_frame (when presenting)
//! ```
//!
//! Uniforms are uploaded before every mesh rather than once per program,
//! since the per-item `model` matrix and material differ between items
//! sharing a program.

pub mod settings;

use std::rc::Rc;

use glam::Mat4;

use crate::assets::Model;
use crate::gpu::WgpuDevice;
use crate::resources::material::Material;
use crate::scene::Camera;

pub use settings::{DepthFormat, PowerPreference, RenderSettings};

/// Per-frame matrices shared by every draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUniforms {
    pub view: Mat4,
    pub projection: Mat4,
}

impl FrameUniforms {
    #[must_use]
    pub fn from_camera(camera: &Camera, aspect: f32) -> Self {
        Self {
            view: camera.view_matrix(),
            projection: camera.projection_matrix(aspect),
        }
    }
}

/// One model placed in the frame.
#[derive(Debug, Clone, Copy)]
pub struct DrawItem<'a> {
    pub model: &'a Model,
    pub transform: Mat4,
    pub material: &'a Material,
}

impl<'a> DrawItem<'a> {
    #[must_use]
    pub fn new(model: &'a Model, material: &'a Material) -> Self {
        Self {
            model,
            transform: Mat4::IDENTITY,
            material,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }
}

#[derive(Debug, Default)]
pub struct FrameRenderer {
    presenter: Option<Rc<WgpuDevice>>,
    frames: u64,
}

impl FrameRenderer {
    /// A renderer that only issues draw calls; submission is left to the caller.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A renderer that submits each frame to `device`.
    #[must_use]
    pub fn presenting(device: Rc<WgpuDevice>) -> Self {
        Self {
            presenter: Some(device),
            frames: 0,
        }
    }

    /// Frames finished so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Draws `items` in order. Returns the number of meshes that reached a
    /// draw call.
    pub fn draw(&mut self, uniforms: &FrameUniforms, items: &[DrawItem<'_>]) -> usize {
        let mut issued = 0;
        for item in items {
            for mesh in item.model.meshes() {
                let Some(program) = mesh.shader_program().filter(|p| p.is_ready()) else {
                    continue;
                };
                program.bind();
                program.set_mat4("view", uniforms.view);
                program.set_mat4("projection", uniforms.projection);
                program.set_mat4("model", item.transform);
                item.material.apply(program);

                if mesh.is_ready() {
                    mesh.draw();
                    issued += 1;
                }
            }
        }
        issued
    }

    /// Ends the frame, submitting to the presenting device if there is one.
    /// Returns the number of submitted draws.
    pub fn finish(&mut self) -> usize {
        self.frames += 1;
        let submitted = self
            .presenter
            .as_ref()
            .map_or(0, |device| device.finish_frame(None));
        log::trace!("Finished frame {} ({submitted} draws submitted)", self.frames);
        submitted
    }
}
