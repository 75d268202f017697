//! Shader Programs
//!
//! Building a program is a two-step affair:
//!
//! 1. [`ShaderProgramBuilder::compile_stage`] compiles one WGSL stage. A
//!    compile failure is logged and produces an *invalid* stage rather than
//!    an error; only an unreadable file is reported to the caller.
//! 2. [`ShaderProgramBuilder::link`] links every attached stage into a
//!    [`ShaderProgram`]. Stage handles are released right after linking,
//!    whatever the outcome.
//!
//! A program whose link failed still owns its handle but reports
//! [`ShaderProgram::is_ready`] as `false`; binding it does nothing.

use std::fmt;
use std::path::Path;
use std::rc::Rc;

use glam::{Mat4, Vec3};

use crate::context::RenderContext;
use crate::errors::{LanternError, Result};
use crate::gpu::shader_library;
use crate::gpu::{GpuDevice, ProgramId, ShaderId, ShaderStage, UniformValue};

// ============================================================================
// CompiledStage
// ============================================================================

/// One compiled (or failed) shader stage. Releases its handle on drop.
pub struct CompiledStage {
    id: Option<ShaderId>,
    stage: ShaderStage,
    label: String,
    valid: bool,
    gpu: Rc<dyn GpuDevice>,
}

impl CompiledStage {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    #[must_use]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl fmt::Debug for CompiledStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledStage")
            .field("id", &self.id)
            .field("stage", &self.stage)
            .field("label", &self.label)
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}

impl Drop for CompiledStage {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            self.gpu.delete_shader(id);
        }
    }
}

// ============================================================================
// ShaderProgramBuilder
// ============================================================================

/// Accumulates compiled stages and links them. Reusable after [`link`](Self::link).
pub struct ShaderProgramBuilder {
    gpu: Rc<dyn GpuDevice>,
    stages: Vec<CompiledStage>,
}

impl ShaderProgramBuilder {
    #[must_use]
    pub fn new(ctx: &RenderContext) -> Self {
        Self {
            gpu: Rc::clone(&ctx.gpu),
            stages: Vec::new(),
        }
    }

    /// Reads and compiles a stage from disk.
    ///
    /// Fails only when the file cannot be read.
    pub fn compile_stage(&self, path: impl AsRef<Path>, stage: ShaderStage) -> Result<CompiledStage> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| LanternError::io(path, e))?;
        Ok(self.compile_source(path.display().to_string(), &source, stage))
    }

    /// Compiles a stage from source text.
    pub fn compile_source(&self, label: impl Into<String>, source: &str, stage: ShaderStage) -> CompiledStage {
        let label = label.into();

        let Some(id) = self.gpu.create_shader(stage) else {
            log::error!("Failed to create {stage} shader object for '{label}'");
            return CompiledStage {
                id: None,
                stage,
                label,
                valid: false,
                gpu: Rc::clone(&self.gpu),
            };
        };

        let valid = match self.gpu.compile_shader(id, source) {
            Ok(()) => {
                log::debug!("Compiled {stage} shader '{label}'");
                true
            }
            Err(log) => {
                let err = LanternError::ShaderCompile {
                    label: label.clone(),
                    log,
                };
                log::error!("{err}");
                false
            }
        };

        CompiledStage {
            id: Some(id),
            stage,
            label,
            valid,
            gpu: Rc::clone(&self.gpu),
        }
    }

    /// Queues a stage for linking. Invalid stages are skipped.
    pub fn attach(&mut self, stage: CompiledStage) -> &mut Self {
        if stage.is_valid() {
            self.stages.push(stage);
        } else {
            log::warn!(
                "Skipping invalid {} stage '{}' during program assembly",
                stage.stage(),
                stage.label()
            );
        }
        self
    }

    #[must_use]
    pub fn attached(&self) -> usize {
        self.stages.len()
    }

    /// Links the attached stages. The builder is empty afterwards.
    pub fn link(&mut self, label: impl Into<String>) -> ShaderProgram {
        let label = label.into();
        let stages = std::mem::take(&mut self.stages);

        let Some(id) = self.gpu.create_program() else {
            log::error!("Failed to create program object for '{label}'");
            return ShaderProgram {
                gpu: Rc::clone(&self.gpu),
                id: None,
                linked: false,
                label,
            };
        };

        let handles: Vec<ShaderId> = stages.iter().filter_map(|s| s.id).collect();
        let linked = match self.gpu.link_program(id, &handles) {
            Ok(()) => {
                log::info!("Linked shader program '{label}' ({} stages)", handles.len());
                true
            }
            Err(log) => {
                let err = LanternError::ShaderLink {
                    label: label.clone(),
                    log,
                };
                log::error!("{err}");
                false
            }
        };

        // Stage handles are no longer needed once the program is linked.
        drop(stages);

        ShaderProgram {
            gpu: Rc::clone(&self.gpu),
            id: Some(id),
            linked,
            label,
        }
    }
}

// ============================================================================
// ShaderProgram
// ============================================================================

/// A linked program. Releases its handle on drop.
pub struct ShaderProgram {
    gpu: Rc<dyn GpuDevice>,
    id: Option<ProgramId>,
    linked: bool,
    label: String,
}

impl ShaderProgram {
    /// Compiles and links a vertex + fragment pair from disk.
    ///
    /// Unreadable files are errors; compile and link failures produce a
    /// program that is not ready.
    pub fn from_files(
        ctx: &RenderContext,
        vertex: impl AsRef<Path>,
        fragment: impl AsRef<Path>,
    ) -> Result<Rc<Self>> {
        let vertex = vertex.as_ref();
        let fragment = fragment.as_ref();

        let mut builder = ShaderProgramBuilder::new(ctx);
        let vs = builder.compile_stage(vertex, ShaderStage::Vertex)?;
        let fs = builder.compile_stage(fragment, ShaderStage::Fragment)?;
        builder.attach(vs).attach(fs);

        let label = format!("{} + {}", file_label(vertex), file_label(fragment));
        Ok(Rc::new(builder.link(label)))
    }

    /// The built-in Blinn-Phong program.
    #[must_use]
    pub fn phong(ctx: &RenderContext) -> Rc<Self> {
        let mut builder = ShaderProgramBuilder::new(ctx);
        for (name, stage) in [
            ("phong_vertex", ShaderStage::Vertex),
            ("phong_fragment", ShaderStage::Fragment),
        ] {
            match shader_library::builtin_source(name) {
                Some(source) => {
                    let compiled = builder.compile_source(name, &source, stage);
                    builder.attach(compiled);
                }
                None => log::error!("Built-in shader '{name}' is missing"),
            }
        }
        Rc::new(builder.link("phong"))
    }

    /// Usable for drawing: created, and every stage compiled and linked.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.linked && self.id.is_some()
    }

    #[must_use]
    pub fn id(&self) -> Option<ProgramId> {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Makes this the active program. Does nothing for a program that is not ready.
    pub fn bind(&self) {
        match self.id {
            Some(id) if self.linked => self.gpu.use_program(Some(id)),
            _ => log::trace!("Ignoring bind of program '{}' (not ready)", self.label),
        }
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.set(name, UniformValue::Int(value));
    }

    pub fn set_float(&self, name: &str, value: f32) {
        self.set(name, UniformValue::Float(value));
    }

    pub fn set_vec3(&self, name: &str, value: Vec3) {
        self.set(name, UniformValue::Vec3(value));
    }

    pub fn set_mat4(&self, name: &str, value: Mat4) {
        self.set(name, UniformValue::Mat4(value));
    }

    // Location is looked up on every call; an unknown name is a no-op.
    fn set(&self, name: &str, value: UniformValue) {
        let Some(id) = self.id.filter(|_| self.linked) else {
            return;
        };
        if let Some(location) = self.gpu.uniform_location(id, name) {
            self.gpu.set_uniform(id, location, value);
        }
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

impl fmt::Debug for ShaderProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderProgram")
            .field("id", &self.id)
            .field("linked", &self.linked)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        if let Some(id) = self.id.take() {
            log::trace!("Releasing program '{}'", self.label);
            self.gpu.delete_program(id);
        }
    }
}
