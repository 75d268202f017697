//! Renderable
//!
//! The unit of drawing: one vertex buffer, one index buffer, one vertex
//! array, the textures the mesh samples and the program that draws it.
//!
//! # Lifecycle
//!
//! ```text
//! new(source) ── compute vertices/indices ── setup() ──▶ ready
//!                                              │
//!                                   allocation failure ──▶ inert (draw is a no-op)
//! ```
//!
//! GPU buffers are released exactly once, either by [`Renderable::release`]
//! or on drop; releasing again does nothing.
//!
//! # Texture binding
//!
//! At draw time textures go to units `0, 1, 2, ...` in list order. The
//! sampler uniform for each is `material.texture_<role><n>`, where `n`
//! counts from 1 separately for every role.

use std::path::Path;
use std::rc::Rc;

use crate::context::RenderContext;
use crate::errors::{LanternError, Result};
use crate::gpu::{BufferId, BufferTarget, VertexArrayId};
use crate::resources::image::ImageSource;
use crate::resources::primitives::{CubeShape, GeometrySource, SphereShape};
use crate::resources::shader::ShaderProgram;
use crate::resources::texture::{GpuImage, Texture, TextureRole, texture_uniform_name};
use crate::resources::vertex::Vertex;

/// Handles owned by a set-up renderable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpuBuffers {
    pub vertex_array: VertexArrayId,
    pub vertex_buffer: BufferId,
    pub index_buffer: BufferId,
}

pub struct Renderable {
    ctx: RenderContext,
    source: GeometrySource,
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    buffers: Option<GpuBuffers>,
    textures: Vec<Texture>,
    program: Option<Rc<ShaderProgram>>,
}

impl Renderable {
    /// Generates geometry from `source` and uploads it.
    #[must_use]
    pub fn new(ctx: &RenderContext, source: GeometrySource) -> Self {
        let mut renderable = Self {
            ctx: ctx.clone(),
            vertices: source.compute_vertices(),
            indices: source.compute_indices(),
            source,
            buffers: None,
            textures: Vec::new(),
            program: None,
        };
        renderable.setup();
        renderable
    }

    #[must_use]
    pub fn cube(ctx: &RenderContext, scale: f32) -> Self {
        Self::new(ctx, GeometrySource::Cube(CubeShape::new(scale)))
    }

    #[must_use]
    pub fn sphere(ctx: &RenderContext, shape: SphereShape) -> Self {
        Self::new(ctx, GeometrySource::Sphere(shape))
    }

    #[must_use]
    pub fn from_mesh(ctx: &RenderContext, vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self::new(ctx, GeometrySource::Mesh { vertices, indices })
    }

    // ========================================================================
    // GPU upload
    // ========================================================================

    /// Allocates the vertex array and both buffers, uploads the vertex and
    /// index lists and declares the [`Vertex`] attribute layout.
    ///
    /// Any previous buffers are released first. If an allocation fails the
    /// partial allocations are released and the renderable stays inert.
    pub fn setup(&mut self) {
        self.release();
        let gpu = &self.ctx.gpu;

        let vertex_array = gpu.create_vertex_array();
        let vertex_buffer = gpu.create_buffer(BufferTarget::Vertex);
        let index_buffer = gpu.create_buffer(BufferTarget::Index);

        let (Some(vertex_array), Some(vertex_buffer), Some(index_buffer)) =
            (vertex_array, vertex_buffer, index_buffer)
        else {
            log::error!(
                "Failed to allocate GPU buffers for {} renderable ({} vertices); it will not be drawn",
                self.source.kind(),
                self.vertices.len()
            );
            if let Some(id) = vertex_array {
                gpu.delete_vertex_array(id);
            }
            for id in [vertex_buffer, index_buffer].into_iter().flatten() {
                gpu.delete_buffer(id);
            }
            return;
        };

        gpu.buffer_data(vertex_buffer, bytemuck::cast_slice(&self.vertices));
        gpu.buffer_data(index_buffer, bytemuck::cast_slice(&self.indices));
        gpu.vertex_array_layout(vertex_array, vertex_buffer, index_buffer, &Vertex::layout());

        log::debug!(
            "Uploaded {} renderable: {} vertices, {} indices",
            self.source.kind(),
            self.vertices.len(),
            self.indices.len()
        );

        self.buffers = Some(GpuBuffers {
            vertex_array,
            vertex_buffer,
            index_buffer,
        });
    }

    /// Releases the GPU buffers. Safe to call any number of times.
    pub fn release(&mut self) {
        if let Some(buffers) = self.buffers.take() {
            let gpu = &self.ctx.gpu;
            gpu.delete_vertex_array(buffers.vertex_array);
            gpu.delete_buffer(buffers.vertex_buffer);
            gpu.delete_buffer(buffers.index_buffer);
        }
    }

    /// Replaces the geometry source, regenerating and re-uploading.
    pub fn reshape(&mut self, source: GeometrySource) {
        self.vertices = source.compute_vertices();
        self.indices = source.compute_indices();
        self.source = source;
        self.setup();
    }

    /// Changes the edge length of a cube. Other geometry is left unchanged.
    pub fn set_cube_scale(&mut self, scale: f32) -> bool {
        if !matches!(self.source, GeometrySource::Cube(_)) {
            log::warn!("set_cube_scale called on a {} renderable", self.source.kind());
            return false;
        }
        self.reshape(GeometrySource::Cube(CubeShape::new(scale)));
        true
    }

    // ========================================================================
    // Drawing
    // ========================================================================

    /// Issues one indexed draw with this renderable's program and textures.
    ///
    /// Does nothing when the renderable is inert, has no program, or its
    /// program is not ready.
    pub fn draw(&self) {
        let Some(buffers) = self.buffers else {
            return;
        };
        let Some(program) = self.program.as_deref().filter(|p| p.is_ready()) else {
            log::trace!("Skipping draw of {} renderable without a ready program", self.source.kind());
            return;
        };
        let gpu = &self.ctx.gpu;

        program.bind();

        let mut role_counters = [0u32; TextureRole::ALL.len()];
        for (unit, texture) in self.textures.iter().enumerate() {
            let unit = unit as u32;
            let counter = &mut role_counters[texture.role().index()];
            *counter += 1;

            gpu.bind_texture(unit, Some(texture.handle()));
            program.set_int(&texture_uniform_name(texture.role(), *counter), unit as i32);
        }

        gpu.bind_vertex_array(Some(buffers.vertex_array));
        gpu.draw_elements(self.indices.len() as u32);

        gpu.bind_vertex_array(None);
        gpu.bind_texture(0, None);
    }

    // ========================================================================
    // Textures and program
    // ========================================================================

    /// Decodes `path` and appends it with `role`.
    ///
    /// A path already in the list reuses its GPU image. On failure the list
    /// is left unchanged.
    pub fn try_set_texture(&mut self, path: impl AsRef<Path>, role: TextureRole) -> Result<()> {
        let source = ImageSource::File(path.as_ref().to_path_buf());
        let key = source.key();

        if let Some(existing) = self.textures.iter().find(|t| t.path() == key) {
            let image = Rc::clone(existing.image());
            self.textures.push(Texture::new(image, role));
            return Ok(());
        }

        let image = GpuImage::upload(&self.ctx, &source)?;
        self.textures.push(Texture::new(Rc::new(image), role));
        Ok(())
    }

    /// Like [`try_set_texture`](Self::try_set_texture), logging failures.
    /// Returns whether the texture was added.
    pub fn set_texture(&mut self, path: impl AsRef<Path>, role: TextureRole) -> bool {
        let path = path.as_ref();
        match self.try_set_texture(path, role) {
            Ok(()) => true,
            Err(err @ (LanternError::Decode { .. } | LanternError::Io { .. })) => {
                log::warn!("Texture '{}' not loaded: {err}", path.display());
                false
            }
            Err(err) => {
                log::error!("Texture '{}' not loaded: {err}", path.display());
                false
            }
        }
    }

    /// Appends an already uploaded texture.
    pub fn push_texture(&mut self, texture: Texture) {
        self.textures.push(texture);
    }

    pub fn set_shader_program(&mut self, program: Rc<ShaderProgram>) {
        self.program = Some(program);
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.buffers.is_some()
    }

    #[must_use]
    pub fn buffers(&self) -> Option<GpuBuffers> {
        self.buffers
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    #[must_use]
    pub fn textures(&self) -> &[Texture] {
        &self.textures
    }

    #[must_use]
    pub fn shader_program(&self) -> Option<&Rc<ShaderProgram>> {
        self.program.as_ref()
    }

    #[must_use]
    pub fn geometry(&self) -> &GeometrySource {
        &self.source
    }
}

impl std::fmt::Debug for Renderable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderable")
            .field("kind", &self.source.kind())
            .field("vertices", &self.vertices.len())
            .field("indices", &self.indices.len())
            .field("buffers", &self.buffers)
            .field("textures", &self.textures.len())
            .field("program", &self.program.as_ref().map(|p| p.label()))
            .finish()
    }
}

impl Drop for Renderable {
    fn drop(&mut self) {
        self.release();
    }
}
