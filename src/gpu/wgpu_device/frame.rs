//! Frame recording.
//!
//! `draw_elements` only snapshots state into a [`DrawCommand`]; the commands
//! are turned into bind groups and one render pass when the frame finishes.

use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::gpu::protocol::{MaterialBlock, SamplerSlot, TEXTURE_SLOT_COUNT, TransformUniform};

/// Everything a single indexed draw needs, captured at `draw_elements` time.
pub struct DrawCommand {
    pub pipeline: wgpu::RenderPipeline,
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
    pub transforms: [Mat4; 3],
    pub material: MaterialBlock,
    /// One entry per sampler slot, in slot order.
    pub textures: Vec<(wgpu::TextureView, wgpu::Sampler)>,
}

/// Offscreen color and depth attachments.
pub struct FrameTargets {
    pub color: wgpu::Texture,
    pub color_view: wgpu::TextureView,
    pub depth_view: wgpu::TextureView,
}

impl FrameTargets {
    pub fn new(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let size = wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Color"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: color_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Offscreen Depth"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });

        Self {
            color_view: color.create_view(&wgpu::TextureViewDescriptor::default()),
            depth_view: depth.create_view(&wgpu::TextureViewDescriptor::default()),
            color,
        }
    }

    #[must_use]
    pub fn size(&self) -> (u32, u32) {
        (self.color.width(), self.color.height())
    }
}

/// Bind group layouts shared by every user program.
pub struct BindingLayouts {
    pub transforms: wgpu::BindGroupLayout,
    pub material: wgpu::BindGroupLayout,
    pub textures: wgpu::BindGroupLayout,
    pub pipeline: wgpu::PipelineLayout,
}

impl BindingLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let visibility = wgpu::ShaderStages::VERTEX_FRAGMENT;
        let uniform_entry = |binding: u32, size: u64| wgpu::BindGroupLayoutEntry {
            binding,
            visibility,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(size),
            },
            count: None,
        };

        let mat4_size = std::mem::size_of::<Mat4>() as u64;
        let transform_entries: Vec<_> = TransformUniform::ALL
            .into_iter()
            .map(|t| uniform_entry(t.binding(), mat4_size))
            .collect();
        let transforms = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Transform Uniforms Layout"),
            entries: &transform_entries,
        });

        let material = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Uniforms Layout"),
            entries: &[uniform_entry(0, std::mem::size_of::<MaterialBlock>() as u64)],
        });

        let texture_entries: Vec<_> = (0..TEXTURE_SLOT_COUNT)
            .filter_map(SamplerSlot::from_index)
            .flat_map(|slot| {
                [
                    wgpu::BindGroupLayoutEntry {
                        binding: slot.texture_binding(),
                        visibility,
                        ty: wgpu::BindingType::Texture {
                            sample_type: wgpu::TextureSampleType::Float { filterable: true },
                            view_dimension: wgpu::TextureViewDimension::D2,
                            multisampled: false,
                        },
                        count: None,
                    },
                    wgpu::BindGroupLayoutEntry {
                        binding: slot.sampler_binding(),
                        visibility,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                ]
            })
            .collect();
        let textures = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Textures Layout"),
            entries: &texture_entries,
        });

        let pipeline = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Program Pipeline Layout"),
            bind_group_layouts: &[Some(&transforms), Some(&material), Some(&textures)],
            immediate_size: 0,
        });

        Self {
            transforms,
            material,
            textures,
            pipeline,
        }
    }
}

struct PreparedDraw<'a> {
    command: &'a DrawCommand,
    groups: [wgpu::BindGroup; 3],
}

fn prepare<'a>(device: &wgpu::Device, layouts: &BindingLayouts, command: &'a DrawCommand) -> PreparedDraw<'a> {
    let transform_buffers: Vec<wgpu::Buffer> = command
        .transforms
        .iter()
        .map(|m| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Transform Uniform"),
                contents: bytemuck::bytes_of(m),
                usage: wgpu::BufferUsages::UNIFORM,
            })
        })
        .collect();
    let transform_entries: Vec<_> = TransformUniform::ALL
        .into_iter()
        .zip(&transform_buffers)
        .map(|(t, buffer)| wgpu::BindGroupEntry {
            binding: t.binding(),
            resource: buffer.as_entire_binding(),
        })
        .collect();
    let transforms = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Transform Uniforms"),
        layout: &layouts.transforms,
        entries: &transform_entries,
    });

    let material_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material Uniform"),
        contents: bytemuck::bytes_of(&command.material),
        usage: wgpu::BufferUsages::UNIFORM,
    });
    let material = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material Uniforms"),
        layout: &layouts.material,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: material_buffer.as_entire_binding(),
        }],
    });

    let texture_entries: Vec<_> = command
        .textures
        .iter()
        .enumerate()
        .filter_map(|(index, binding)| SamplerSlot::from_index(index).map(|slot| (slot, binding)))
        .flat_map(|(slot, (view, sampler))| {
            [
                wgpu::BindGroupEntry {
                    binding: slot.texture_binding(),
                    resource: wgpu::BindingResource::TextureView(view),
                },
                wgpu::BindGroupEntry {
                    binding: slot.sampler_binding(),
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ]
        })
        .collect();
    let textures = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material Textures"),
        layout: &layouts.textures,
        entries: &texture_entries,
    });

    PreparedDraw {
        command,
        groups: [transforms, material, textures],
    }
}

/// Encodes `commands` into a single cleared render pass and submits it.
pub fn submit(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layouts: &BindingLayouts,
    commands: &[DrawCommand],
    color: &wgpu::TextureView,
    depth: &wgpu::TextureView,
    clear_color: wgpu::Color,
) {
    let prepared: Vec<PreparedDraw<'_>> = commands
        .iter()
        .map(|command| prepare(device, layouts, command))
        .collect();

    let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Frame Encoder"),
    });

    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Main Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        for draw in &prepared {
            pass.set_pipeline(&draw.command.pipeline);
            for (index, group) in draw.groups.iter().enumerate() {
                pass.set_bind_group(index as u32, group, &[]);
            }
            pass.set_vertex_buffer(0, draw.command.vertex_buffer.slice(..));
            pass.set_index_buffer(draw.command.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..draw.command.index_count, 0, 0..1);
        }
    }

    queue.submit(std::iter::once(encoder.finish()));
}
