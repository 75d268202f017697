//! Headless GPU Device
//!
//! A [`GpuDevice`] that keeps every object in host memory. It follows the
//! same contract as the wgpu backend (handle lifetimes, binding state, the
//! uniform naming protocol, entry-point checks) but draws nothing: draw calls
//! are recorded as [`DrawRecord`]s instead.
//!
//! Besides tests, it is useful for asset tooling that wants to validate
//! scenes, materials and shader sources on machines without a GPU.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use super::{
    BufferId, BufferTarget, GpuDevice, PixelFormat, ProgramId, ShaderId, ShaderStage, TextureId,
    TextureSampler, TextureUpload, UniformSlot, UniformValue, VertexArrayId, VertexLayout,
};

// ============================================================================
// Inspection records
// ============================================================================

/// One recorded `draw_elements` call with the bindings it used.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramId,
    pub vertex_array: VertexArrayId,
    pub index_count: u32,
    /// Bound texture units at draw time, sorted by unit.
    pub textures: Vec<(u32, TextureId)>,
}

/// One accepted uniform upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformWrite {
    pub program: ProgramId,
    pub name: String,
    pub value: UniformValue,
}

/// What a vertex array was configured with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexArrayInfo {
    pub vertex_buffer: Option<BufferId>,
    pub index_buffer: Option<BufferId>,
    pub layout: Option<VertexLayout>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextureInfo {
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub mip_level_count: u32,
    pub sampler: TextureSampler,
}

/// Number of live objects per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LiveObjects {
    pub buffers: usize,
    pub vertex_arrays: usize,
    pub textures: usize,
    pub shaders: usize,
    pub programs: usize,
}

impl LiveObjects {
    #[must_use]
    pub fn total(&self) -> usize {
        self.buffers + self.vertex_arrays + self.textures + self.shaders + self.programs
    }
}

// ============================================================================
// Internal state
// ============================================================================

struct BufferEntry {
    target: BufferTarget,
    data: Vec<u8>,
}

struct ShaderEntry {
    stage: ShaderStage,
    source: Option<String>,
}

struct ProgramEntry {
    linked: bool,
    sources: Vec<String>,
}

#[derive(Default)]
struct State {
    buffers: SlotMap<BufferId, BufferEntry>,
    vertex_arrays: SlotMap<VertexArrayId, VertexArrayInfo>,
    textures: SlotMap<TextureId, TextureInfo>,
    shaders: SlotMap<ShaderId, ShaderEntry>,
    programs: SlotMap<ProgramId, ProgramEntry>,

    current_program: Option<ProgramId>,
    bound_vertex_array: Option<VertexArrayId>,
    texture_units: FxHashMap<u32, TextureId>,

    draws: Vec<DrawRecord>,
    uniform_writes: Vec<UniformWrite>,
    double_deletes: usize,
    allocation_budget: Option<usize>,
}

impl State {
    /// Consumes one allocation from the budget, if one is set.
    fn allocate(&mut self, what: &str) -> bool {
        match &mut self.allocation_budget {
            None => true,
            Some(0) => {
                log::debug!("HeadlessDevice: refusing {what} allocation (budget exhausted)");
                false
            }
            Some(n) => {
                *n -= 1;
                true
            }
        }
    }

    fn stale_delete(&mut self, what: &str) {
        self.double_deletes += 1;
        log::warn!("HeadlessDevice: delete of unknown or already deleted {what}");
    }
}

// ============================================================================
// HeadlessDevice
// ============================================================================

#[derive(Default)]
pub struct HeadlessDevice {
    state: RefCell<State>,
}

impl HeadlessDevice {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of further successful `create_*` calls. `None`
    /// removes the limit.
    pub fn set_allocation_budget(&self, budget: Option<usize>) {
        self.state.borrow_mut().allocation_budget = budget;
    }

    #[must_use]
    pub fn live_objects(&self) -> LiveObjects {
        let state = self.state.borrow();
        LiveObjects {
            buffers: state.buffers.len(),
            vertex_arrays: state.vertex_arrays.len(),
            textures: state.textures.len(),
            shaders: state.shaders.len(),
            programs: state.programs.len(),
        }
    }

    #[must_use]
    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    #[must_use]
    pub fn uniform_writes(&self) -> Vec<UniformWrite> {
        self.state.borrow().uniform_writes.clone()
    }

    /// Last value written to `name` on `program`.
    #[must_use]
    pub fn last_uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .uniform_writes
            .iter()
            .rev()
            .find(|w| w.program == program && w.name == name)
            .map(|w| w.value)
    }

    /// Forgets recorded draws and uniform writes.
    pub fn clear_records(&self) {
        let mut state = self.state.borrow_mut();
        state.draws.clear();
        state.uniform_writes.clear();
    }

    #[must_use]
    pub fn buffer_contents(&self, buffer: BufferId) -> Option<Vec<u8>> {
        self.state.borrow().buffers.get(buffer).map(|b| b.data.clone())
    }

    #[must_use]
    pub fn buffer_target(&self, buffer: BufferId) -> Option<BufferTarget> {
        self.state.borrow().buffers.get(buffer).map(|b| b.target)
    }

    #[must_use]
    pub fn vertex_array_info(&self, vertex_array: VertexArrayId) -> Option<VertexArrayInfo> {
        self.state.borrow().vertex_arrays.get(vertex_array).cloned()
    }

    #[must_use]
    pub fn texture_info(&self, texture: TextureId) -> Option<TextureInfo> {
        self.state.borrow().textures.get(texture).cloned()
    }

    #[must_use]
    pub fn is_program_linked(&self, program: ProgramId) -> bool {
        self.state.borrow().programs.get(program).is_some_and(|p| p.linked)
    }

    /// Deletes of handles that were unknown or already released.
    #[must_use]
    pub fn double_deletes(&self) -> usize {
        self.state.borrow().double_deletes
    }

    #[must_use]
    pub fn current_program(&self) -> Option<ProgramId> {
        self.state.borrow().current_program
    }

    #[must_use]
    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.state.borrow().bound_vertex_array
    }

    #[must_use]
    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.state.borrow().texture_units.get(&unit).copied()
    }
}

impl GpuDevice for HeadlessDevice {
    fn create_vertex_array(&self) -> Option<VertexArrayId> {
        let mut state = self.state.borrow_mut();
        if !state.allocate("vertex array") {
            return None;
        }
        Some(state.vertex_arrays.insert(VertexArrayInfo {
            vertex_buffer: None,
            index_buffer: None,
            layout: None,
        }))
    }

    fn create_buffer(&self, target: BufferTarget) -> Option<BufferId> {
        let mut state = self.state.borrow_mut();
        if !state.allocate("buffer") {
            return None;
        }
        Some(state.buffers.insert(BufferEntry {
            target,
            data: Vec::new(),
        }))
    }

    fn buffer_data(&self, buffer: BufferId, data: &[u8]) {
        match self.state.borrow_mut().buffers.get_mut(buffer) {
            Some(entry) => entry.data = data.to_vec(),
            None => log::warn!("HeadlessDevice: buffer_data on unknown buffer {buffer:?}"),
        }
    }

    fn vertex_array_layout(
        &self,
        vertex_array: VertexArrayId,
        vertex_buffer: BufferId,
        index_buffer: BufferId,
        layout: &VertexLayout,
    ) {
        let mut state = self.state.borrow_mut();
        if !state.buffers.contains_key(vertex_buffer) || !state.buffers.contains_key(index_buffer) {
            log::warn!("HeadlessDevice: vertex array layout references unknown buffers");
            return;
        }
        match state.vertex_arrays.get_mut(vertex_array) {
            Some(info) => {
                info.vertex_buffer = Some(vertex_buffer);
                info.index_buffer = Some(index_buffer);
                info.layout = Some(layout.clone());
            }
            None => log::warn!("HeadlessDevice: layout on unknown vertex array {vertex_array:?}"),
        }
    }

    fn delete_vertex_array(&self, vertex_array: VertexArrayId) {
        let mut state = self.state.borrow_mut();
        if state.vertex_arrays.remove(vertex_array).is_none() {
            state.stale_delete("vertex array");
            return;
        }
        if state.bound_vertex_array == Some(vertex_array) {
            state.bound_vertex_array = None;
        }
    }

    fn delete_buffer(&self, buffer: BufferId) {
        let mut state = self.state.borrow_mut();
        if state.buffers.remove(buffer).is_none() {
            state.stale_delete("buffer");
        }
    }

    fn create_texture(&self, upload: &TextureUpload<'_>) -> Option<TextureId> {
        let mut state = self.state.borrow_mut();
        if !state.allocate("texture") {
            return None;
        }
        let expected = upload.width as usize * upload.height as usize * upload.format.bytes_per_pixel() as usize;
        if upload.pixels.len() != expected || upload.width == 0 || upload.height == 0 {
            log::error!(
                "HeadlessDevice: texture '{}' has {} bytes of pixel data, expected {expected}",
                upload.label,
                upload.pixels.len()
            );
            return None;
        }
        Some(state.textures.insert(TextureInfo {
            label: upload.label.to_string(),
            width: upload.width,
            height: upload.height,
            format: upload.format,
            mip_level_count: upload.mip_level_count(),
            sampler: upload.sampler,
        }))
    }

    fn delete_texture(&self, texture: TextureId) {
        let mut state = self.state.borrow_mut();
        if state.textures.remove(texture).is_none() {
            state.stale_delete("texture");
            return;
        }
        state.texture_units.retain(|_, bound| *bound != texture);
    }

    fn create_shader(&self, stage: ShaderStage) -> Option<ShaderId> {
        let mut state = self.state.borrow_mut();
        if !state.allocate("shader") {
            return None;
        }
        Some(state.shaders.insert(ShaderEntry { stage, source: None }))
    }

    fn compile_shader(&self, shader: ShaderId, source: &str) -> Result<(), String> {
        let mut state = self.state.borrow_mut();
        let entry = state
            .shaders
            .get_mut(shader)
            .ok_or_else(|| format!("unknown shader {shader:?}"))?;

        if source.trim().is_empty() {
            return Err("error: empty shader source".to_string());
        }
        let entry_point = entry.stage.entry_point();
        if !source.contains(&format!("fn {entry_point}")) {
            return Err(format!(
                "error: {} stage has no entry point `fn {entry_point}`",
                entry.stage
            ));
        }

        entry.source = Some(source.to_string());
        Ok(())
    }

    fn delete_shader(&self, shader: ShaderId) {
        let mut state = self.state.borrow_mut();
        if state.shaders.remove(shader).is_none() {
            state.stale_delete("shader");
        }
    }

    fn create_program(&self) -> Option<ProgramId> {
        let mut state = self.state.borrow_mut();
        if !state.allocate("program") {
            return None;
        }
        Some(state.programs.insert(ProgramEntry {
            linked: false,
            sources: Vec::new(),
        }))
    }

    fn link_program(&self, program: ProgramId, stages: &[ShaderId]) -> Result<(), String> {
        let mut state = self.state.borrow_mut();
        if !state.programs.contains_key(program) {
            return Err(format!("unknown program {program:?}"));
        }

        let mut vertex = 0;
        let mut fragment = 0;
        let mut sources = Vec::with_capacity(stages.len());
        for &id in stages {
            let entry = state
                .shaders
                .get(id)
                .ok_or_else(|| format!("error: attached shader {id:?} does not exist"))?;
            let source = entry
                .source
                .clone()
                .ok_or_else(|| format!("error: attached {} shader is not compiled", entry.stage))?;
            match entry.stage {
                ShaderStage::Vertex => vertex += 1,
                ShaderStage::Fragment => fragment += 1,
            }
            sources.push(source);
        }

        let result = if vertex == 1 && fragment == 1 {
            Ok(())
        } else {
            Err(format!(
                "error: program needs exactly one vertex and one fragment stage (got {vertex} vertex, {fragment} fragment)"
            ))
        };

        if let Some(entry) = state.programs.get_mut(program) {
            entry.linked = result.is_ok();
            entry.sources = if result.is_ok() { sources } else { Vec::new() };
        }
        result
    }

    fn delete_program(&self, program: ProgramId) {
        let mut state = self.state.borrow_mut();
        if state.programs.remove(program).is_none() {
            state.stale_delete("program");
            return;
        }
        if state.current_program == Some(program) {
            state.current_program = None;
        }
    }

    fn use_program(&self, program: Option<ProgramId>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = program
            && !state.programs.contains_key(id)
        {
            log::warn!("HeadlessDevice: use of unknown program {id:?}");
            return;
        }
        state.current_program = program;
    }

    fn uniform_location(&self, program: ProgramId, name: &str) -> Option<UniformSlot> {
        let state = self.state.borrow();
        let entry = state.programs.get(program).filter(|p| p.linked)?;
        let slot = UniformSlot::resolve(name)?;
        entry
            .sources
            .iter()
            .any(|source| slot.is_referenced_by(source))
            .then_some(slot)
    }

    fn set_uniform(&self, program: ProgramId, location: UniformSlot, value: UniformValue) {
        let mut state = self.state.borrow_mut();
        if !state.programs.contains_key(program) {
            log::warn!("HeadlessDevice: uniform upload to unknown program {program:?}");
            return;
        }
        if !location.accepts(&value) {
            log::warn!(
                "HeadlessDevice: type mismatch for uniform '{}' ({value:?})",
                location.name()
            );
            return;
        }
        state.uniform_writes.push(UniformWrite {
            program,
            name: location.name(),
            value,
        });
    }

    fn bind_texture(&self, unit: u32, texture: Option<TextureId>) {
        let mut state = self.state.borrow_mut();
        match texture {
            Some(id) if state.textures.contains_key(id) => {
                state.texture_units.insert(unit, id);
            }
            Some(id) => log::warn!("HeadlessDevice: bind of unknown texture {id:?}"),
            None => {
                state.texture_units.remove(&unit);
            }
        }
    }

    fn bind_vertex_array(&self, vertex_array: Option<VertexArrayId>) {
        let mut state = self.state.borrow_mut();
        if let Some(id) = vertex_array
            && !state.vertex_arrays.contains_key(id)
        {
            log::warn!("HeadlessDevice: bind of unknown vertex array {id:?}");
            return;
        }
        state.bound_vertex_array = vertex_array;
    }

    fn draw_elements(&self, index_count: u32) {
        let mut state = self.state.borrow_mut();

        let Some(program) = state
            .current_program
            .filter(|p| state.programs.get(*p).is_some_and(|e| e.linked))
        else {
            log::debug!("HeadlessDevice: draw skipped, no linked program bound");
            return;
        };
        let Some(vertex_array) = state.bound_vertex_array else {
            log::debug!("HeadlessDevice: draw skipped, no vertex array bound");
            return;
        };

        let available = state
            .vertex_arrays
            .get(vertex_array)
            .and_then(|info| info.index_buffer)
            .and_then(|ebo| state.buffers.get(ebo))
            .map_or(0, |b| b.data.len() / std::mem::size_of::<u32>());
        if index_count as usize > available {
            log::warn!("HeadlessDevice: draw of {index_count} indices exceeds index buffer ({available})");
            return;
        }

        let mut textures: Vec<(u32, TextureId)> =
            state.texture_units.iter().map(|(unit, id)| (*unit, *id)).collect();
        textures.sort_by_key(|(unit, _)| *unit);

        state.draws.push(DrawRecord {
            program,
            vertex_array,
            index_count,
            textures,
        });
    }
}
