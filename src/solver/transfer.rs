//! Visibility rendering, energy transfer, shooter reset, and output
//! resolve passes.

use encase::{ShaderType, UniformBuffer};
use glam::{Mat4, Vec4};

use crate::gpu::pipeline_helpers::{
    create_compute_pipeline, storage_buffer, storage_texture_2d,
    texture_2d_unfilterable, uniform_buffer,
};
use crate::gpu::shader_composer::ShaderComposer;
use crate::hemicube::{face_rect, FacePass, HemicubeFace, COLOR_FORMAT};
use crate::scene::{bake_vertex_layout, BakeMesh};

/// Uniform block of the transfer kernel. Must match the WGSL
/// `TransferParams` struct.
#[derive(ShaderType)]
struct TransferParams {
    view_proj: [Mat4; 5],
    face_rects: [Vec4; 5],
    texel_area: f32,
}

/// Renders the scene through one hemicube face camera in visibility mode.
pub(crate) struct VisibilityPass {
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
}

impl VisibilityPass {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
    ) -> Self {
        let shader = composer.compose(
            device,
            "Visibility Shader",
            include_str!("../../assets/shaders/visibility.wgsl"),
            "visibility.wgsl",
        );

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Visibility Camera Uniform"),
            size: std::mem::size_of::<[[f32; 4]; 4]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Visibility Bind Group Layout"),
                entries: &[uniform_buffer(0, wgpu::ShaderStages::VERTEX)],
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Visibility Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(
            &wgpu::PipelineLayoutDescriptor {
                label: Some("Visibility Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            },
        );
        let pipeline = device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("Visibility Pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[bake_vertex_layout()],
                    compilation_options: Default::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: COLOR_FORMAT,
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: wgpu::TextureFormat::Depth32Float,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            },
        );

        Self {
            pipeline,
            camera_buffer,
            bind_group,
        }
    }

    /// Upload the face camera. Must be submitted before the face's pass,
    /// so the solver submits one command buffer per face.
    pub(crate) fn set_camera(&self, queue: &wgpu::Queue, view_proj: Mat4) {
        queue.write_buffer(
            &self.camera_buffer,
            0,
            bytemuck::bytes_of(&view_proj.to_cols_array_2d()),
        );
    }

    /// Encode the scene render for one face, restricted to the face's
    /// viewport/scissor rectangle.
    pub(crate) fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        color_view: &wgpu::TextureView,
        depth_view: &wgpu::TextureView,
        face: &FacePass,
        mesh: &BakeMesh,
    ) {
        let mut pass =
            encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Hemicube Face Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(
                    wgpu::RenderPassDepthStencilAttachment {
                        view: depth_view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    },
                ),
                ..Default::default()
            });
        let vp = face.viewport;
        pass.set_viewport(
            vp.x as f32,
            vp.y as f32,
            vp.width as f32,
            vp.height as f32,
            0.0,
            1.0,
        );
        pass.set_scissor_rect(vp.x, vp.y, vp.width, vp.height);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        mesh.draw(&mut pass);
    }
}

/// Resources the transfer and reset kernels bind.
pub(crate) struct TransferInputs<'a> {
    pub shooter: &'a wgpu::Buffer,
    pub radiosity: &'a wgpu::Buffer,
    pub unshot: &'a wgpu::Buffer,
    pub position: &'a wgpu::TextureView,
    pub normal: &'a wgpu::TextureView,
    pub albedo: &'a wgpu::TextureView,
    pub hemicube: &'a wgpu::TextureView,
}

/// Distributes the shooter's energy to visible receivers, then zeroes the
/// shooter's unshot entry.
pub(crate) struct TransferPass {
    pipeline: wgpu::ComputePipeline,
    params_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    reset_pipeline: wgpu::ComputePipeline,
    reset_bind_group: wgpu::BindGroup,
}

impl TransferPass {
    pub(crate) fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        composer: &mut ShaderComposer,
        lightmap_size: (u32, u32),
        inputs: &TransferInputs<'_>,
    ) -> Self {
        let shader = composer.compose(
            device,
            "Transfer Shader",
            include_str!("../../assets/shaders/transfer.wgsl"),
            "transfer.wgsl",
        );

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Transfer Params Uniform"),
            size: TransferParams::min_size().get(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Transfer Bind Group Layout"),
                entries: &[
                    uniform_buffer(0, wgpu::ShaderStages::COMPUTE),
                    storage_buffer(1, wgpu::ShaderStages::COMPUTE, true),
                    storage_buffer(2, wgpu::ShaderStages::COMPUTE, false),
                    storage_buffer(3, wgpu::ShaderStages::COMPUTE, false),
                    texture_2d_unfilterable(4, wgpu::ShaderStages::COMPUTE),
                    texture_2d_unfilterable(5, wgpu::ShaderStages::COMPUTE),
                    texture_2d_unfilterable(6, wgpu::ShaderStages::COMPUTE),
                    texture_2d_unfilterable(7, wgpu::ShaderStages::COMPUTE),
                ],
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Transfer Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: inputs.shooter.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: inputs.radiosity.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: inputs.unshot.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.position,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.normal,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 6,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.albedo,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 7,
                    resource: wgpu::BindingResource::TextureView(
                        inputs.hemicube,
                    ),
                },
            ],
        });
        let pipeline = create_compute_pipeline(
            device,
            "Transfer",
            &shader,
            "transfer",
            &bind_group_layout,
        );

        // Shooter reset (texel_set) kernel
        let reset_shader = composer.compose(
            device,
            "Texel Set Shader",
            include_str!("../../assets/shaders/texel_set.wgsl"),
            "texel_set.wgsl",
        );
        let dims_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Lightmap Dims Uniform"),
            size: std::mem::size_of::<[u32; 2]>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        // Written once: the lightmap never resizes mid-solve
        let dims = [lightmap_size.0, lightmap_size.1];
        queue.write_buffer(&dims_buffer, 0, bytemuck::bytes_of(&dims));

        let reset_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Texel Set Bind Group Layout"),
                entries: &[
                    storage_buffer(0, wgpu::ShaderStages::COMPUTE, true),
                    storage_buffer(1, wgpu::ShaderStages::COMPUTE, false),
                    uniform_buffer(2, wgpu::ShaderStages::COMPUTE),
                ],
            },
        );
        let reset_bind_group =
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Texel Set Bind Group"),
                layout: &reset_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: inputs.shooter.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: inputs.unshot.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: dims_buffer.as_entire_binding(),
                    },
                ],
            });
        let reset_pipeline = create_compute_pipeline(
            device,
            "Texel Set",
            &reset_shader,
            "texel_set",
            &reset_layout,
        );

        // dims_buffer stays alive through reset_bind_group
        Self {
            pipeline,
            params_buffer,
            bind_group,
            reset_pipeline,
            reset_bind_group,
        }
    }

    /// Upload the per-bounce transfer parameters: the five face cameras,
    /// their target rectangles, and the world area of one texel.
    pub(crate) fn write_params(
        &self,
        queue: &wgpu::Queue,
        view_proj: &[Mat4; 5],
        resolution: u32,
        texel_area: f32,
    ) {
        let mut face_rects = [Vec4::ZERO; 5];
        for face in HemicubeFace::ALL {
            let r = face_rect(face, resolution);
            face_rects[face.index()] = Vec4::new(
                r.x as f32,
                r.y as f32,
                r.width as f32,
                r.height as f32,
            );
        }
        let params = TransferParams {
            view_proj: *view_proj,
            face_rects,
            texel_area,
        };
        let mut data = UniformBuffer::new(Vec::<u8>::new());
        data.write(&params).unwrap_or_else(|e| {
            unreachable!("transfer params serialization failed: {e}")
        });
        queue.write_buffer(&self.params_buffer, 0, &data.into_inner());
    }

    /// Encode the transfer dispatch followed by the shooter reset, in
    /// separate passes so the reset observes the finished transfer.
    pub(crate) fn encode(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        width: u32,
        height: u32,
    ) {
        {
            let mut pass =
                encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Transfer Pass"),
                    ..Default::default()
                });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(
                width.div_ceil(16),
                height.div_ceil(16),
                1,
            );
        }
        {
            let mut pass =
                encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Shooter Reset Pass"),
                    ..Default::default()
                });
            pass.set_pipeline(&self.reset_pipeline);
            pass.set_bind_group(0, &self.reset_bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
    }
}

/// Expands the energy buffers into displayable textures.
pub(crate) struct ResolvePass {
    pipeline: wgpu::ComputePipeline,
    bind_group: wgpu::BindGroup,
}

impl ResolvePass {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        radiosity: &wgpu::Buffer,
        unshot: &wgpu::Buffer,
        radiosity_view: &wgpu::TextureView,
        unshot_view: &wgpu::TextureView,
    ) -> Self {
        let shader = composer.compose(
            device,
            "Resolve Shader",
            include_str!("../../assets/shaders/resolve.wgsl"),
            "resolve.wgsl",
        );
        let bind_group_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Resolve Bind Group Layout"),
                entries: &[
                    storage_buffer(0, wgpu::ShaderStages::COMPUTE, true),
                    storage_buffer(1, wgpu::ShaderStages::COMPUTE, true),
                    storage_texture_2d(
                        2,
                        wgpu::ShaderStages::COMPUTE,
                        wgpu::TextureFormat::Rgba16Float,
                    ),
                    storage_texture_2d(
                        3,
                        wgpu::ShaderStages::COMPUTE,
                        wgpu::TextureFormat::Rgba16Float,
                    ),
                ],
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Resolve Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: radiosity.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: unshot.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::TextureView(
                        radiosity_view,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(unshot_view),
                },
            ],
        });
        let pipeline = create_compute_pipeline(
            device,
            "Resolve",
            &shader,
            "resolve",
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
                label: Some("Resolve Pass"),
                ..Default::default()
            });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.dispatch_workgroups(width.div_ceil(16), height.div_ceil(16), 1);
    }
}
