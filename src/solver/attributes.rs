//! Attribute rasterization and energy seeding.
//!
//! The mesh is rasterized in lightmap-UV space so every covered texel
//! receives its surface attributes. Two MRT subpasses share one vertex
//! shader: the geometry subpass writes position+normal, the material
//! subpass writes albedo+seed. A final compute pass copies the seed term
//! into both energy buffers.

use crate::gpu::shader_composer::ShaderComposer;
use crate::scene::{bake_vertex_layout, BakeMesh, DirectLight};

/// GPU mirror of the attribute shader's `DirectLight` uniform.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct LightUniform {
    position: [f32; 3],
    intensity: f32,
    color: [f32; 3],
    enabled: f32,
}

/// Views of the four per-texel attribute targets.
pub(crate) struct AttributeTargets<'a> {
    pub position: &'a wgpu::TextureView,
    pub normal: &'a wgpu::TextureView,
    pub albedo: &'a wgpu::TextureView,
    pub seed: &'a wgpu::TextureView,
}

fn color_target(
    format: wgpu::TextureFormat,
) -> Option<wgpu::ColorTargetState> {
    Some(wgpu::ColorTargetState {
        format,
        blend: None,
        write_mask: wgpu::ColorWrites::ALL,
    })
}

/// Rasterizes mesh attributes into the per-texel data textures.
pub(crate) struct AttributePass {
    geometry_pipeline: wgpu::RenderPipeline,
    material_pipeline: wgpu::RenderPipeline,
    light_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl AttributePass {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
    ) -> Self {
        let shader = composer.compose(
            device,
            "Attribute Shader",
            include_str!("../../assets/shaders/attributes.wgsl"),
            "attributes.wgsl",
        );

        let light_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Direct Light Uniform"),
            size: std::mem::size_of::<LightUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Attribute Bind Group Layout"),
                entries: &[crate::gpu::pipeline_helpers::uniform_buffer(
                    0,
                    wgpu::ShaderStages::FRAGMENT,
                )],
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Attribute Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(
            &wgpu::PipelineLayoutDescriptor {
                label: Some("Attribute Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            },
        );

        let make_pipeline = |label: &str,
                             entry: &str,
                             targets: &[Option<wgpu::ColorTargetState>]| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[bake_vertex_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(entry),
                    targets,
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        let geometry_pipeline = make_pipeline(
            "Attribute Geometry Pipeline",
            "fs_geometry",
            &[
                color_target(wgpu::TextureFormat::Rgba32Float),
                color_target(wgpu::TextureFormat::Rgba16Float),
            ],
        );
        let material_pipeline = make_pipeline(
            "Attribute Material Pipeline",
            "fs_material",
            &[
                color_target(wgpu::TextureFormat::Rgba8Unorm),
                color_target(wgpu::TextureFormat::Rgba16Float),
            ],
        );

        Self {
            geometry_pipeline,
            material_pipeline,
            light_buffer,
            bind_group,
        }
    }

    /// Upload the direct-light uniform; `None` disables the direct term so
    /// only per-vertex emissive seeds the solve.
    pub(crate) fn write_light(
        &self,
        queue: &wgpu::Queue,
        light: Option<&DirectLight>,
    ) {
        let uniform = light.map_or(
            LightUniform {
                position: [0.0; 3],
                intensity: 0.0,
                color: [0.0; 3],
                enabled: 0.0,
            },
            |l| LightUniform {
                position: l.position.to_array(),
                intensity: l.intensity,
                color: l.color.to_array(),
                enabled: 1.0,
            },
        );
        queue.write_buffer(
            &self.light_buffer,
            0,
            bytemuck::bytes_of(&uniform),
        );
    }

    /// Encode both attribute subpasses.
    pub(crate) fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        targets: &AttributeTargets<'_>,
        mesh: &BakeMesh,
    ) {
        let subpasses: [(&str, &wgpu::RenderPipeline, [&wgpu::TextureView; 2]);
            2] = [
            (
                "Attribute Geometry Pass",
                &self.geometry_pipeline,
                [targets.position, targets.normal],
            ),
            (
                "Attribute Material Pass",
                &self.material_pipeline,
                [targets.albedo, targets.seed],
            ),
        ];
        for (label, pipeline, views) in subpasses {
            let attachments = views.map(|view| {
                Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })
            });
            let mut pass =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(label),
                    color_attachments: &attachments,
                    depth_stencil_attachment: None,
                    ..Default::default()
                });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            mesh.draw(&mut pass);
        }
    }
}

/// Copies the rasterized seed term into the radiosity and unshot buffers.
pub(crate) struct SeedPass {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

impl SeedPass {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        seed_view: &wgpu::TextureView,
        radiosity: &wgpu::Buffer,
        unshot: &wgpu::Buffer,
    ) -> Self {
        let shader = composer.compose(
            device,
            "Seed Shader",
            include_str!("../../assets/shaders/seed.wgsl"),
            "seed.wgsl",
        );

        let bind_group_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Seed Bind Group Layout"),
                entries: &[
                    crate::gpu::pipeline_helpers::texture_2d_unfilterable(
                        0,
                        wgpu::ShaderStages::COMPUTE,
                    ),
                    crate::gpu::pipeline_helpers::storage_buffer(
                        1,
                        wgpu::ShaderStages::COMPUTE,
                        false,
                    ),
                    crate::gpu::pipeline_helpers::storage_buffer(
                        2,
                        wgpu::ShaderStages::COMPUTE,
                        false,
                    ),
                ],
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Seed Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(seed_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: radiosity.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: unshot.as_entire_binding(),
                },
            ],
        });

        let pipeline = crate::gpu::pipeline_helpers::create_compute_pipeline(
            device,
            "Seed",
            &shader,
            "seed_energy",
            &bind_group_layout,
        );

        Self {
            pipeline,
            bind_group,
        }
    }

    pub(crate) fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        width: u32,
        height: u32,
    ) {
        let mut pass =
            encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("Seed Pass"),
                ..Default::default()
            });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(width.div_ceil(16), height.div_ceil(16), 1);
    }
}
