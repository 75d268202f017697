//! wgpu Backend
//!
//! [`WgpuDevice`] implements the handle-based [`GpuDevice`] contract on top
//! of wgpu.
//!
//! # Mapping
//!
//! | Contract | wgpu |
//! |----------|------|
//! | shader stage | `ShaderModule` compiled from prelude + user WGSL |
//! | program | vertex + fragment module pair, one `RenderPipeline` per vertex layout |
//! | buffer | `Buffer`, recreated on every `buffer_data` |
//! | texture | mipmapped `Texture` + `TextureView` + `Sampler` |
//! | uniform upload | per-program CPU copy, snapshotted at draw time |
//! | `draw_elements` | [`DrawCommand`](frame::DrawCommand), encoded by [`WgpuDevice::finish_frame`] |
//!
//! # Error capture
//!
//! Validation errors are delivered through the device's uncaptured-error
//! handler into a shared [`ErrorSink`]. Compile, link, texture creation,
//! buffer uploads and frame submission open a capture around their wgpu
//! calls and turn whatever it collected into a failure. Errors raised outside
//! a capture are logged as they arrive.

pub mod frame;
pub mod mipmap;

use std::borrow::Cow;
use std::cell::RefCell;
use std::sync::Arc;

use glam::Mat4;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use self::frame::{BindingLayouts, DrawCommand, FrameTargets};
use self::mipmap::MipmapBlitter;
use super::protocol::{MaterialBlock, TEXTURE_SLOT_COUNT, UniformSlot};
use super::shader_library;
use super::{
    BufferId, BufferTarget, GpuDevice, PixelFormat, ProgramId, ShaderId, ShaderStage, TextureId,
    TextureSampler, TextureUpload, UniformValue, VertexArrayId, VertexLayout,
};
use crate::errors::{LanternError, Result};
use crate::renderer::settings::RenderSettings;
use crate::resources::vertex::Vertex;

/// Color format of the offscreen target and of every program's pipeline.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ============================================================================
// Object state
// ============================================================================

struct BufferState {
    target: BufferTarget,
    buffer: Option<wgpu::Buffer>,
}

#[derive(Default)]
struct VertexArrayState {
    vertex_buffer: Option<BufferId>,
    index_buffer: Option<BufferId>,
    layout: Option<VertexLayout>,
}

struct TextureState {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

struct ShaderState {
    stage: ShaderStage,
    compiled: Option<(wgpu::ShaderModule, String)>,
}

struct LinkedProgram {
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    sources: Vec<String>,
    pipelines: FxHashMap<VertexLayout, wgpu::RenderPipeline>,
}

struct ProgramState {
    linked: Option<LinkedProgram>,
    transforms: [Mat4; 3],
    material: MaterialBlock,
    /// Texture unit assigned to each sampler slot.
    sampler_units: [Option<u32>; TEXTURE_SLOT_COUNT],
}

impl ProgramState {
    fn new() -> Self {
        Self {
            linked: None,
            transforms: [Mat4::IDENTITY; 3],
            material: MaterialBlock::default(),
            sampler_units: [None; TEXTURE_SLOT_COUNT],
        }
    }
}

#[derive(Default)]
struct DeviceState {
    buffers: SlotMap<BufferId, BufferState>,
    vertex_arrays: SlotMap<VertexArrayId, VertexArrayState>,
    textures: SlotMap<TextureId, TextureState>,
    shaders: SlotMap<ShaderId, ShaderState>,
    programs: SlotMap<ProgramId, ProgramState>,

    current_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
    texture_units: FxHashMap<u32, TextureId>,

    commands: Vec<DrawCommand>,
}

/// Collects validation errors while a capture is open; logs them otherwise.
#[derive(Default)]
struct ErrorSink {
    capturing: bool,
    errors: Vec<String>,
}

impl ErrorSink {
    fn report(&mut self, error: String) {
        if self.capturing {
            self.errors.push(error);
        } else {
            log::error!("wgpu validation error: {error}");
        }
    }
}

/// 1×1 white texture bound to sampler slots nothing was assigned to.
struct FallbackTexture {
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
}

// ============================================================================
// WgpuDevice
// ============================================================================

pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    settings: RenderSettings,
    errors: Arc<Mutex<ErrorSink>>,
    layouts: BindingLayouts,
    fallback: FallbackTexture,
    mipmaps: RefCell<MipmapBlitter>,
    targets: RefCell<FrameTargets>,
    state: RefCell<DeviceState>,
}

impl WgpuDevice {
    /// Requests an adapter and device with no surface and renders into
    /// offscreen targets sized from `settings`.
    pub fn new_offscreen(settings: &RenderSettings) -> Result<Self> {
        pollster::block_on(Self::request(settings))
    }

    async fn request(settings: &RenderSettings) -> Result<Self> {
        let instance = wgpu::Instance::default();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: settings.power_preference.into(),
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| LanternError::AdapterRequestFailed(e.to_string()))?;

        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Lantern Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::Performance,
                ..Default::default()
            })
            .await?;

        Ok(Self::from_parts(device, queue, settings.clone()))
    }

    /// Wraps an existing device and queue (e.g. one shared with a windowing
    /// layer). Installs the device's uncaptured-error handler.
    #[must_use]
    pub fn from_parts(device: wgpu::Device, queue: wgpu::Queue, settings: RenderSettings) -> Self {
        let errors = Arc::new(Mutex::new(ErrorSink::default()));
        let sink = Arc::clone(&errors);
        device.on_uncaptured_error(Arc::new(move |error: wgpu::Error| {
            sink.lock().report(error.to_string());
        }));

        let layouts = BindingLayouts::new(&device);
        let fallback = Self::create_fallback(&device, &queue);
        let mipmaps = MipmapBlitter::new(&device);
        let targets = FrameTargets::new(
            &device,
            settings.width,
            settings.height,
            COLOR_FORMAT,
            settings.depth_format.into(),
        );

        Self {
            device,
            queue,
            settings,
            errors,
            layouts,
            fallback,
            mipmaps: RefCell::new(mipmaps),
            targets: RefCell::new(targets),
            state: RefCell::new(DeviceState::default()),
        }
    }

    fn create_fallback(device: &wgpu::Device, queue: &wgpu::Queue) -> FallbackTexture {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some("Fallback White"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: wgpu::TextureFormat::Rgba8Unorm,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        FallbackTexture {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            sampler: device.create_sampler(&wgpu::SamplerDescriptor::default()),
        }
    }

    #[must_use]
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    #[must_use]
    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    #[must_use]
    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    /// The offscreen color texture the frame is rendered into.
    #[must_use]
    pub fn color_target(&self) -> wgpu::Texture {
        self.targets.borrow().color.clone()
    }

    /// Recreates the offscreen targets. Zero sizes are ignored.
    pub fn resize(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        *self.targets.borrow_mut() = FrameTargets::new(
            &self.device,
            width,
            height,
            COLOR_FORMAT,
            self.settings.depth_format.into(),
        );
    }

    /// Draw commands recorded since the last [`finish_frame`](Self::finish_frame).
    #[must_use]
    pub fn pending_draws(&self) -> usize {
        self.state.borrow().commands.len()
    }

    /// Encodes every recorded draw into one render pass and submits it.
    ///
    /// Renders into `target` when given (it must use [`COLOR_FORMAT`] and
    /// match the offscreen size), otherwise into the offscreen color target.
    /// Returns the number of draws submitted.
    /// Returns the number of draws submitted, which is 0 when wgpu rejected
    /// the frame.
    pub fn finish_frame(&self, target: Option<&wgpu::TextureView>) -> usize {
        let commands = std::mem::take(&mut self.state.borrow_mut().commands);
        let targets = self.targets.borrow();
        let color = target.unwrap_or(&targets.color_view);

        let ((), log) = self.capture(|| {
            frame::submit(
                &self.device,
                &self.queue,
                &self.layouts,
                &commands,
                color,
                &targets.depth_view,
                self.settings.wgpu_clear_color(),
            );
        });
        if let Some(log) = log {
            log::error!("Frame with {} draws was rejected:\n{log}", commands.len());
            return 0;
        }

        log::trace!("Submitted frame with {} draws", commands.len());
        commands.len()
    }

    /// Runs `f` and returns what the error sink collected meanwhile.
    fn capture<T>(&self, f: impl FnOnce() -> T) -> (T, Option<String>) {
        {
            let mut sink = self.errors.lock();
            sink.capturing = true;
            sink.errors.clear();
        }
        let value = f();
        let collected = {
            let mut sink = self.errors.lock();
            sink.capturing = false;
            std::mem::take(&mut sink.errors)
        };
        let log = (!collected.is_empty()).then(|| collected.join("\n"));
        (value, log)
    }

    fn create_pipeline(
        &self,
        program: &LinkedProgram,
        layout: &VertexLayout,
    ) -> std::result::Result<wgpu::RenderPipeline, String> {
        let attributes: Vec<wgpu::VertexAttribute> = layout
            .attributes
            .iter()
            .map(|a| wgpu::VertexAttribute {
                format: a.format,
                offset: a.offset,
                shader_location: a.location,
            })
            .collect();

        let (pipeline, log) = self.capture(|| {
            self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("Program Pipeline"),
                layout: Some(&self.layouts.pipeline),
                vertex: wgpu::VertexState {
                    module: &program.vertex,
                    entry_point: Some(ShaderStage::Vertex.entry_point()),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: layout.stride,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.fragment,
                    entry_point: Some(ShaderStage::Fragment.entry_point()),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: self.settings.depth_format.into(),
                    depth_write_enabled: Some(true),
                    depth_compare: Some(wgpu::CompareFunction::Less),
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            })
        });

        match log {
            Some(log) => Err(log),
            None => Ok(pipeline),
        }
    }

    fn expand_pixels<'a>(upload: &TextureUpload<'a>) -> (wgpu::TextureFormat, u32, Cow<'a, [u8]>) {
        match upload.format {
            PixelFormat::R8 => (wgpu::TextureFormat::R8Unorm, 1, Cow::Borrowed(upload.pixels)),
            PixelFormat::Rgba8 => (wgpu::TextureFormat::Rgba8Unorm, 4, Cow::Borrowed(upload.pixels)),
            // wgpu has no 3-channel 8-bit format.
            PixelFormat::Rgb8 => {
                let rgba = upload
                    .pixels
                    .chunks_exact(3)
                    .flat_map(|px| [px[0], px[1], px[2], u8::MAX])
                    .collect();
                (wgpu::TextureFormat::Rgba8Unorm, 4, Cow::Owned(rgba))
            }
        }
    }

    fn create_sampler(&self, label: &str, sampler: &TextureSampler) -> wgpu::Sampler {
        self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(label),
            address_mode_u: sampler.address_mode_u,
            address_mode_v: sampler.address_mode_v,
            mag_filter: sampler.mag_filter,
            min_filter: sampler.min_filter,
            mipmap_filter: sampler.mipmap_filter,
            ..Default::default()
        })
    }
}

impl std::fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("settings", &self.settings)
            .field("pending_draws", &self.pending_draws())
            .finish_non_exhaustive()
    }
}

impl GpuDevice for WgpuDevice {
    // ------------------------------------------------------------------
    // Buffers and vertex arrays
    // ------------------------------------------------------------------

    fn create_vertex_array(&self) -> Option<VertexArrayId> {
        Some(self.state.borrow_mut().vertex_arrays.insert(VertexArrayState::default()))
    }

    fn create_buffer(&self, target: BufferTarget) -> Option<BufferId> {
        Some(self.state.borrow_mut().buffers.insert(BufferState { target, buffer: None }))
    }

    fn buffer_data(&self, buffer: BufferId, data: &[u8]) {
        let mut state = self.state.borrow_mut();
        let Some(entry) = state.buffers.get_mut(buffer) else {
            log::warn!("buffer_data on unknown buffer {buffer:?}");
            return;
        };
        let (label, usage) = match entry.target {
            BufferTarget::Vertex => ("Vertex Buffer", wgpu::BufferUsages::VERTEX),
            BufferTarget::Index => ("Index Buffer", wgpu::BufferUsages::INDEX),
        };
        let (created, log) = self.capture(|| {
            self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage: usage | wgpu::BufferUsages::COPY_DST,
            })
        });
        // A rejected upload leaves the buffer empty, so draws using it are skipped.
        entry.buffer = match log {
            Some(log) => {
                log::error!("{label} upload of {} bytes failed:\n{log}", data.len());
                None
            }
            None => Some(created),
        };
    }

    fn vertex_array_layout(
        &self,
        vertex_array: VertexArrayId,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        layout: &VertexLayout,
    ) {
        let mut state = self.state.borrow_mut();
        match state.vertex_arrays.get_mut(vertex_array) {
            Some(entry) => {
                entry.vertex_buffer = Some(vertex_buffer);
                entry.index_buffer = Some(index_buffer);
                entry.layout = Some(layout.clone());
            }
            None => log::warn!("Layout declared on unknown vertex array {vertex_array:?}"),
        }
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        if state.vertex_arrays.remove(vertex_array).is_none() {
            log::warn!("Delete of unknown vertex array {vertex_array:?}");
        } else if state.bound_vertex_array == Some(vertex_array) {
            state.bound_vertex_array = None;
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        if self.state.borrow_mut().buffers.remove(buffer).is_none() {
            log::warn!("Delete of unknown buffer {buffer:?}");
        }
    }

    // ------------------------------------------------------------------
    // Textures
    // ------------------------------------------------------------------

    fn create_texture(&self, upload: &TextureUpload<'_>) -> Option<TextureId> {
        if upload.width == 0 || upload.height == 0 {
            log::error!("Texture '{}' has zero size", upload.label);
            return None;
        }
        let (format, bytes_per_pixel, pixels) = Self::expand_pixels(upload);
        let size = wgpu::Extent3d {
            width: upload.width,
            height: upload.height,
            depth_or_array_layers: 1,
        };

        let (entry, log) = self.capture(|| {
            let texture = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some(upload.label),
                size,
                mip_level_count: upload.mip_level_count(),
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            });

            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                &pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(upload.width * bytes_per_pixel),
                    rows_per_image: Some(upload.height),
                },
                size,
            );

            if texture.mip_level_count() > 1 {
                let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("Mipmap Encoder"),
                });
                self.mipmaps
                    .borrow_mut()
                    .generate(&self.device, &mut encoder, &texture);
                self.queue.submit(std::iter::once(encoder.finish()));
            }

            TextureState {
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
                sampler: self.create_sampler(upload.label, &upload.sampler),
            }
        });

        // Nothing is registered for an upload wgpu rejected.
        if let Some(log) = log {
            log::error!(
                "Texture '{}' ({}x{}) was rejected:\n{log}",
                upload.label,
                upload.width,
                upload.height
            );
            return None;
        }
        Some(self.state.borrow_mut().textures.insert(entry))
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(texture).is_none() {
            log::warn!("Delete of unknown texture {texture:?}");
            return;
        }
        state.texture_units.retain(|_, bound| *bound != texture);
    }

    // ------------------------------------------------------------------
    // Shaders and programs
    // ------------------------------------------------------------------

    fn create_shader(&self, stage: ShaderStage) -> Option<ShaderId> {
        Some(self.state.borrow_mut().shaders.insert(ShaderState { stage, compiled: None }))
    }

    fn compile_shader(&self, shader: ShaderId, source: &str) -> std::result::Result<(), String> {
        let stage = self
            .state
            .borrow()
            .shaders
            .get(shader)
            .map(|s| s.stage)
            .ok_or_else(|| format!("unknown shader {shader:?}"))?;

        let entry_point = stage.entry_point();
        if !source.contains(&format!("fn {entry_point}")) {
            return Err(format!("error: {stage} stage has no entry point `fn {entry_point}`"));
        }

        let prelude = shader_library::prelude(stage).map_err(|e| format!("prelude: {e}"))?;
        let full_source = format!("{prelude}\n{source}");

        let (module, log) = self.capture(|| {
            self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&format!("{stage} stage")),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(full_source)),
            })
        });
        if let Some(log) = log {
            return Err(log);
        }

        if let Some(entry) = self.state.borrow_mut().shaders.get_mut(shader) {
            entry.compiled = Some((module, source.to_string()));
        }
        Ok(())
    }

    fn delete_shader(&self, shader: ShaderId) {
        if self.state.borrow_mut().shaders.remove(shader).is_none() {
            log::warn!("Delete of unknown shader {shader:?}");
        }
    }

    fn create_program(&self) -> Option<ProgramId> {
        Some(self.state.borrow_mut().programs.insert(ProgramState::new()))
    }

    fn link_program(&self, program: ProgramId, stages: &[ShaderId]) -> std::result::Result<(), String> {
        let mut vertex = Vec::new();
        let mut fragment = Vec::new();
        let mut sources = Vec::new();
        {
            let state = self.state.borrow();
            if !state.programs.contains_key(program) {
                return Err(format!("unknown program {program:?}"));
            }
            for &id in stages {
                let entry = state
                    .shaders
                    .get(id)
                    .ok_or_else(|| format!("error: attached shader {id:?} does not exist"))?;
                let (module, source) = entry
                    .compiled
                    .clone()
                    .ok_or_else(|| format!("error: attached {} shader is not compiled", entry.stage))?;
                match entry.stage {
                    ShaderStage::Vertex => vertex.push(module),
                    ShaderStage::Fragment => fragment.push(module),
                }
                sources.push(source);
            }
        }

        let (vertex_module, fragment_module) = match (vertex.as_slice(), fragment.as_slice()) {
            ([v], [f]) => (v.clone(), f.clone()),
            _ => {
                return Err(format!(
                    "error: program needs exactly one vertex and one fragment stage (got {} vertex, {} fragment)",
                    vertex.len(),
                    fragment.len()
                ));
            }
        };

        let mut linked = LinkedProgram {
            vertex: vertex_module,
            fragment: fragment_module,
            sources,
            pipelines: FxHashMap::default(),
        };

        // Building the pipeline for the standard layout is what surfaces
        // interface mismatches between the two stages.
        let layout = Vertex::layout();
        let pipeline = self.create_pipeline(&linked, &layout)?;
        linked.pipelines.insert(layout, pipeline);

        if let Some(entry) = self.state.borrow_mut().programs.get_mut(program) {
            entry.linked = Some(linked);
        }
        Ok(())
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(program).is_none() {
            log::warn!("Delete of unknown program {program:?}");
        } else if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    // ------------------------------------------------------------------
    // Binding state and uniforms
    // ------------------------------------------------------------------

    fn use_program(&self, program: Option<ProgramId>) {
        self.state.borrow_mut().current_program = program;
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformSlot> {
        let state = self.state.borrow();
        let linked = state.programs.get(program)?.linked.as_ref()?;
        let slot = UniformSlot::resolve(name)?;
        linked
            .sources
            .iter()
            .any(|source| slot.is_referenced_by(source))
            .then_some(slot)
    }

    fn set_uniform(&self, program: ProgramId, location: UniformSlot, value: UniformValue) {
        if !location.accepts(&value) {
            log::warn!("Type mismatch for uniform '{}' ({value:?})", location.name());
            return;
        }
        let mut state = self.state.borrow_mut();
        let Some(entry) = state.programs.get_mut(program) else {
            log::warn!("Uniform upload to unknown program {program:?}");
            return;
        };
        match (location, value) {
            (UniformSlot::Transform(t), UniformValue::Mat4(m)) => {
                entry.transforms[t.binding() as usize] = m;
            }
            (UniformSlot::Material(field), value) => entry.material.set(field, value),
            (UniformSlot::Sampler(slot), UniformValue::Int(unit)) => {
                entry.sampler_units[slot.index()] = u32::try_from(unit).ok();
            }
            _ => {}
        }
    }

    fn bind_texture(&self, unit: u32, texture: Option<TextureId>) {
        let mut state = self.state.borrow_mut();
        match texture {
            Some(id) => {
                state.texture_units.insert(unit, id);
            }
            None => {
                state.texture_units.remove(&unit);
            }
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>) {
        self.state.borrow_mut().bound_vertex_array = vertex_array;
    }

    // ------------------------------------------------------------------
    // Drawing
    // ------------------------------------------------------------------

    fn draw_elements(&self, index_count: u32) {
        if index_count == 0 {
            return;
        }
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let Some(program_id) = state.current_program else {
            log::debug!("Draw skipped: no program bound");
            return;
        };
        let Some(vao) = state.bound_vertex_array.and_then(|id| state.vertex_arrays.get(id)) else {
            log::debug!("Draw skipped: no vertex array bound");
            return;
        };
        let (Some(vbo), Some(ebo), Some(layout)) = (vao.vertex_buffer, vao.index_buffer, vao.layout.clone())
        else {
            log::debug!("Draw skipped: vertex array has no layout");
            return;
        };
        let buffers = state.buffers.get(vbo).and_then(|b| b.buffer.clone()).zip(
            state.buffers.get(ebo).and_then(|b| b.buffer.clone()),
        );
        let Some((vertex_buffer, index_buffer)) = buffers else {
            log::debug!("Draw skipped: vertex array buffers hold no data");
            return;
        };
        if u64::from(index_count) * 4 > index_buffer.size() {
            log::warn!("Draw of {index_count} indices exceeds the index buffer");
            return;
        }

        let textures: Vec<(wgpu::TextureView, wgpu::Sampler)> = {
            let Some(program) = state.programs.get(program_id) else {
                return;
            };
            (0..TEXTURE_SLOT_COUNT)
                .map(|index| {
                    program.sampler_units[index]
                        .and_then(|unit| state.texture_units.get(&unit))
                        .and_then(|id| state.textures.get(*id))
                        .map_or_else(
                            || (self.fallback.view.clone(), self.fallback.sampler.clone()),
                            |t| (t.view.clone(), t.sampler.clone()),
                        )
                })
                .collect()
        };

        let Some(program) = state.programs.get_mut(program_id) else {
            return;
        };
        let transforms = program.transforms;
        let material = program.material;
        let Some(linked) = program.linked.as_mut() else {
            log::debug!("Draw skipped: program {program_id:?} is not linked");
            return;
        };

        let pipeline = if let Some(pipeline) = linked.pipelines.get(&layout) {
            pipeline.clone()
        } else {
            match self.create_pipeline(linked, &layout) {
                Ok(pipeline) => {
                    linked.pipelines.insert(layout, pipeline.clone());
                    pipeline
                }
                Err(log) => {
                    log::error!("Failed to create pipeline for vertex layout: {log}");
                    return;
                }
            }
        };

        state.commands.push(DrawCommand {
            pipeline,
            vertex_buffer,
            index_buffer,
            index_count,
            transforms,
            material,
            textures,
        });
    }
}
