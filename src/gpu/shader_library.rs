//! Shader Library
//!
//! Embedded WGSL sources and the binding prelude.
//!
//! Every user stage compiled by the [`WgpuDevice`](super::WgpuDevice) is
//! prefixed with a prelude that declares the resources of the uniform naming
//! protocol (see [`protocol`](super::protocol)). The prelude is a minijinja
//! template so the texture table follows [`TEXTURE_SLOT_COUNT`] without being
//! written out by hand.
//!
//! Template syntax uses `{$ ... $}` blocks and `$$` line statements, which
//! leaves WGSL's own braces alone.

use std::borrow::Cow;
use std::sync::OnceLock;

use minijinja::{Environment, Error, ErrorKind, context, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use serde::Serialize;

use super::ShaderStage;
use super::protocol::{MATERIAL_GROUP, SamplerSlot, TEXTURE_GROUP, TEXTURE_SLOT_COUNT, TRANSFORM_GROUP, TransformUniform};

static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/gpu/shaders"]
struct ShaderAssets;

fn get_env() -> &'static Environment<'static> {
    SHADER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        match SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
        {
            Ok(syntax) => env.set_syntax(syntax),
            Err(e) => log::error!("Failed to configure shader template syntax: {e}"),
        }
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        env.set_loader(shader_loader);

        env
    })
}

fn shader_loader(name: &str) -> Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    // Debug builds prefer the on-disk copy so shader edits need no rebuild.
    #[cfg(debug_assertions)]
    {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("src/gpu/shaders")
            .join(filename.as_ref());
        if path.exists() {
            return std::fs::read_to_string(&path).map(Some).map_err(|e| {
                Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("Failed to read '{}': {e}", path.display()),
                )
            });
        }
    }

    Ok(embedded(&filename))
}

fn embedded(filename: &str) -> Option<String> {
    let file = ShaderAssets::get(filename)?;
    std::str::from_utf8(file.data.as_ref()).ok().map(str::to_owned)
}

/// Raw source of a built-in shader (`phong_vertex`, `phong_fragment`, `blit`).
#[must_use]
pub fn builtin_source(name: &str) -> Option<String> {
    shader_loader(name).ok().flatten()
}

// ============================================================================
// Prelude
// ============================================================================

#[derive(Serialize)]
struct TextureSlotContext {
    ident: String,
    texture_binding: u32,
    sampler_binding: u32,
}

#[derive(Serialize)]
struct TransformContext {
    name: &'static str,
    binding: u32,
}

/// Renders the binding prelude for one stage.
pub fn prelude(stage: ShaderStage) -> Result<String, Error> {
    let transforms: Vec<TransformContext> = TransformUniform::ALL
        .into_iter()
        .map(|t| TransformContext {
            name: t.name(),
            binding: t.binding(),
        })
        .collect();

    let textures: Vec<TextureSlotContext> = (0..TEXTURE_SLOT_COUNT)
        .filter_map(SamplerSlot::from_index)
        .map(|slot| TextureSlotContext {
            ident: slot.wgsl_ident(),
            texture_binding: slot.texture_binding(),
            sampler_binding: slot.sampler_binding(),
        })
        .collect();

    let template = get_env().get_template("prelude")?;
    template.render(context! {
        stage => stage.to_string(),
        transform_group => TRANSFORM_GROUP,
        material_group => MATERIAL_GROUP,
        texture_group => TEXTURE_GROUP,
        transforms => transforms,
        textures => textures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prelude_declares_every_slot() {
        let source = prelude(ShaderStage::Fragment).unwrap();
        assert!(source.contains("var<uniform> model: mat4x4<f32>;"));
        assert!(source.contains("var<uniform> material: MaterialUniforms;"));
        assert!(source.contains("var material_texture_diffuse1: texture_2d<f32>;"));
        assert!(source.contains("var material_texture_specular4_sampler: sampler;"));
    }

    #[test]
    fn builtins_are_embedded() {
        for name in ["phong_vertex", "phong_fragment", "blit"] {
            assert!(builtin_source(name).is_some(), "missing {name}");
        }
    }
}
