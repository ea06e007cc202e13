//! Shooter selection: two-phase parallel max reduction over unshot energy.

use crate::gpu::pipeline_helpers::{
    create_compute_pipeline, storage_buffer, texture_2d_unfilterable,
};
use crate::gpu::readback::{self, ReadbackError};
use crate::gpu::shader_composer::ShaderComposer;
use crate::settings::LightmapSettings;

/// Work-group edge length of the reduction's phase A.
pub(crate) const REDUCE_GROUP: u32 = 16;

/// One phase-A record: a work group's local maximum and its texel.
/// Layout matches the WGSL `GroupMax` struct.
#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct GroupMax {
    value: f32,
    _pad: u32,
    texel: [i32; 2],
}

/// Snapshot of the texel chosen to shoot this bounce. Recomputed on the
/// GPU every iteration and read back to drive the hemicube cameras; never
/// persisted across bounces. Layout matches the WGSL `ShooterInfo` struct.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShooterInfo {
    /// Texel coordinates, or (-1, -1) when the lightmap holds no energy.
    pub texel: [i32; 2],
    _pad0: [i32; 2],
    /// World position of the shooter texel (w = coverage mask).
    pub position: [f32; 4],
    /// Surface normal of the shooter texel.
    pub normal: [f32; 4],
    /// Unshot energy the shooter is about to distribute.
    pub unshot: [f32; 4],
}

impl ShooterInfo {
    /// Rec.709 luminance of the shooter's unshot energy.
    #[must_use]
    pub fn unshot_luminance(&self) -> f32 {
        0.2126 * self.unshot[0]
            + 0.7152 * self.unshot[1]
            + 0.0722 * self.unshot[2]
    }

    /// Whether the reduction found any energized texel at all.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.texel[0] >= 0 && self.texel[1] >= 0
    }
}

/// Runs the two reduction phases and owns their scratch and output
/// buffers.
pub(crate) struct ShooterSelect {
    local_pipeline: wgpu::ComputePipeline,
    global_pipeline: wgpu::ComputePipeline,
    #[allow(dead_code)] // documented scratch model; bound via bind_group
    scratch_buffer: wgpu::Buffer,
    shooter_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    groups: (u32, u32),
}

impl ShooterSelect {
    pub(crate) fn new(
        device: &wgpu::Device,
        composer: &mut ShaderComposer,
        lightmap: &LightmapSettings,
        unshot: &wgpu::Buffer,
        position_view: &wgpu::TextureView,
        normal_view: &wgpu::TextureView,
    ) -> Self {
        let shader = composer.compose(
            device,
            "Shooter Max Shader",
            include_str!("../../assets/shaders/shooter_max.wgsl"),
            "shooter_max.wgsl",
        );

        // Scratch sized to the dispatched group count, fixed for the
        // lifetime of the solver so reduction behavior is reproducible
        let groups = (
            lightmap.width.div_ceil(REDUCE_GROUP),
            lightmap.height.div_ceil(REDUCE_GROUP),
        );
        let scratch_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shooter Scratch Buffer"),
            size: u64::from(groups.0 * groups.1)
                * std::mem::size_of::<GroupMax>() as u64,
            usage: wgpu::BufferUsages::STORAGE,
            mapped_at_creation: false,
        });
        let shooter_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shooter Info Buffer"),
            size: std::mem::size_of::<ShooterInfo>() as u64,
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });

        let bind_group_layout = device.create_bind_group_layout(
            &wgpu::BindGroupLayoutDescriptor {
                label: Some("Shooter Bind Group Layout"),
                entries: &[
                    storage_buffer(0, wgpu::ShaderStages::COMPUTE, true),
                    storage_buffer(1, wgpu::ShaderStages::COMPUTE, false),
                    storage_buffer(2, wgpu::ShaderStages::COMPUTE, false),
                    texture_2d_unfilterable(3, wgpu::ShaderStages::COMPUTE),
                    texture_2d_unfilterable(4, wgpu::ShaderStages::COMPUTE),
                ],
            },
        );
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shooter Bind Group"),
            layout: &bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: unshot.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: scratch_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: shooter_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: wgpu::BindingResource::TextureView(
                        position_view,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: wgpu::BindingResource::TextureView(normal_view),
                },
            ],
        });

        let local_pipeline = create_compute_pipeline(
            device,
            "Shooter Local Max",
            &shader,
            "local_max",
            &bind_group_layout,
        );
        let global_pipeline = create_compute_pipeline(
            device,
            "Shooter Global Max",
            &shader,
            "global_max",
            &bind_group_layout,
        );

        Self {
            local_pipeline,
            global_pipeline,
            scratch_buffer,
            shooter_buffer,
            bind_group,
            groups,
        }
    }

    /// The GPU-side shooter record (bound read-only by later stages).
    pub(crate) fn shooter_buffer(&self) -> &wgpu::Buffer {
        &self.shooter_buffer
    }

    /// Encode both reduction phases. Separate compute passes give the
    /// phase A to phase B ordering a kernel boundary.
    pub(crate) fn encode(&self, encoder: &mut wgpu::CommandEncoder) {
        {
            let mut pass =
                encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Shooter Local Max Pass"),
                    ..Default::default()
                });
            pass.set_pipeline(&self.local_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(self.groups.0, self.groups.1, 1);
        }
        {
            let mut pass =
                encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("Shooter Global Max Pass"),
                    ..Default::default()
                });
            pass.set_pipeline(&self.global_pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.dispatch_workgroups(1, 1, 1);
        }
    }

    /// Read the freshly reduced shooter record back to the CPU.
    pub(crate) fn read_back(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Result<ShooterInfo, ReadbackError> {
        let bytes = readback::read_buffer(
            device,
            queue,
            &self.shooter_buffer,
            std::mem::size_of::<ShooterInfo>() as u64,
        )?;
        Ok(*bytemuck::from_bytes(&bytes))
    }
}
