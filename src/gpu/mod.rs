//! GPU Device Contract
//!
//! Everything in the engine that owns GPU state talks to the GPU through the
//! [`GpuDevice`] trait. It is a small, handle-based API shaped after the
//! operations the resource pipeline actually needs:
//!
//! - object creation returns `Option<Handle>`; `None` means the device
//!   refused the allocation and the caller must degrade gracefully
//! - binding state (`use_program`, `bind_vertex_array`, `bind_texture`) is
//!   global to the device and mutated by every draw
//! - uniforms are addressed by name through [`GpuDevice::uniform_location`],
//!   following the naming protocol in [`protocol`]
//!
//! Two implementations ship with the crate:
//! - [`WgpuDevice`]: the production backend
//! - [`HeadlessDevice`]: a GPU-less backend that tracks objects, bindings and
//!   draws, used by tests and asset tooling

pub mod headless;
pub mod protocol;
pub mod shader_library;
pub mod wgpu_device;

use glam::{Mat4, Vec3};
use smallvec::SmallVec;

pub use headless::HeadlessDevice;
pub use protocol::UniformSlot;
pub use wgpu_device::WgpuDevice;

slotmap::new_key_type! {
    /// Handle to a vertex or index buffer.
    pub struct BufferId;
    /// Handle to a vertex-array binding (buffers + attribute layout).
    pub struct VertexArrayId;
    /// Handle to a 2D texture with its sampler state.
    pub struct TextureId;
    /// Handle to a single shader stage.
    pub struct ShaderId;
    /// Handle to a linked shader program.
    pub struct ProgramId;
}

/// What a buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    Vertex,
    Index,
}

/// Kind of a shader stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Entry point every stage source of this kind must define.
    #[must_use]
    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Vertex => "vs_main",
            Self::Fragment => "fs_main",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// One float vertex attribute inside an interleaved buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexAttribute {
    pub location: u32,
    pub format: wgpu::VertexFormat,
    pub offset: u64,
}

/// Interleaved vertex layout declared on a vertex array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: SmallVec<[VertexAttribute; 4]>,
}

/// A value uploaded to a uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Float(f32),
    Vec3(Vec3),
    Mat4(Mat4),
}

/// Pixel layout of decoded image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// One channel, sampled as red.
    R8,
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    /// Maps a decoder channel count (1, 3, 4) to a format.
    #[must_use]
    pub fn from_channels(channels: u8) -> Option<Self> {
        match channels {
            1 => Some(Self::R8),
            3 => Some(Self::Rgb8),
            4 => Some(Self::Rgba8),
            _ => None,
        }
    }

    #[must_use]
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::R8 => 1,
            Self::Rgb8 => 3,
            Self::Rgba8 => 4,
        }
    }
}

/// Sampler state attached to a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureSampler {
    pub address_mode_u: wgpu::AddressMode,
    pub address_mode_v: wgpu::AddressMode,
    pub mag_filter: wgpu::FilterMode,
    pub min_filter: wgpu::FilterMode,
    pub mipmap_filter: wgpu::MipmapFilterMode,
}

impl Default for TextureSampler {
    /// Repeat wrapping with trilinear filtering.
    fn default() -> Self {
        Self {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Linear,
        }
    }
}

/// Everything needed to create a texture in one call.
#[derive(Debug, Clone, Copy)]
pub struct TextureUpload<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pixels: &'a [u8],
    pub sampler: TextureSampler,
    pub generate_mipmaps: bool,
}

impl TextureUpload<'_> {
    /// Number of mip levels for a full chain down to 1×1.
    #[must_use]
    pub fn mip_level_count(&self) -> u32 {
        if !self.generate_mipmaps {
            return 1;
        }
        32 - self.width.max(self.height).max(1).leading_zeros()
    }
}

/// The GPU API the resource pipeline is written against.
///
/// All methods take `&self`; implementations keep their state behind
/// interior mutability because the device is shared (`Rc<dyn GpuDevice>`)
/// by every object that owns GPU handles.
pub trait GpuDevice {
    // ------------------------------------------------------------------
    // Buffers and vertex arrays
    // ------------------------------------------------------------------
    fn create_vertex_array(&self) -> Option<VertexArrayId>;
    fn create_buffer(&self, target: BufferTarget) -> Option<BufferId>;
    /// Replaces the whole buffer contents in one transfer.
    fn buffer_data(&self, buffer: BufferId, data: &[u8]);
    /// Declares which buffers and attribute layout a vertex array reads.
    fn vertex_array_layout(
        &self,
        vertex_array: VertexArrayId,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        layout: &VertexLayout,
    );
    fn delete_vertex_array(&self, vertex_array: VertexArrayId);
    fn delete_buffer(&self, buffer: BufferId);

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------
    fn create_texture(&self, upload: &TextureUpload<'_>) -> Option<TextureId>;
    fn delete_texture(&self, texture: TextureId);

    // ------------------------------------------------------------------
    // Shaders and programs
    // ------------------------------------------------------------------
    fn create_shader(&self, stage: ShaderStage) -> Option<ShaderId>;
    /// Compiles the stage. `Err` carries the compiler log.
    fn compile_shader(&self, shader: ShaderId, source: &str) -> Result<(), String>;
    fn delete_shader(&self, shader: ShaderId);
    fn create_program(&self) -> Option<ProgramId>;
    /// Attaches `stages` and links. `Err` carries the linker log.
    fn link_program(&self, program: ProgramId, stages: &[ShaderId]) -> Result<(), String>;
    fn delete_program(&self, program: ProgramId);

    // ------------------------------------------------------------------
    // Binding state and uniforms
    // ------------------------------------------------------------------
    fn use_program(&self, program: Option<ProgramId>);
    /// Looks the name up on every call. `None` for names the program does
    /// not use; setting such a uniform is the caller's no-op.
    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformSlot>;
    fn set_uniform(&self, program: ProgramId, location: UniformSlot, value: UniformValue);
    fn bind_texture(&self, unit: u32, texture: Option<TextureId>);
    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>);

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------
    /// Indexed triangle-list draw with the current bindings.
    fn draw_elements(&self, index_count: u32);
}
