//! Collaborator-facing mesh contract.
//!
//! The baker consumes mesh data the collaborator owns: positions, normals,
//! per-vertex albedo and emissive colors, and triangle indices. Faces must
//! not share vertices — every triangle corner needs its own lightmap UV —
//! so indexed meshes go through [`MeshData::unweld`] first. The assembled
//! [`BakeVertex`] stream is uploaded once as a [`BakeMesh`] and rendered
//! by the attribute and visibility pipelines.

use glam::{Vec2, Vec3};
use wgpu::util::DeviceExt;

/// Interleaved vertex consumed by the bake pipelines.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
pub struct BakeVertex {
    /// World-space position.
    pub position: [f32; 3],
    /// Surface normal.
    pub normal: [f32; 3],
    /// Diffuse reflectance.
    pub albedo: [f32; 3],
    /// Emitted radiosity (light sources).
    pub emissive: [f32; 3],
    /// Packed lightmap UV in `[0, 1]^2`.
    pub lightmap_uv: [f32; 2],
}

const VERTEX_ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
    0 => Float32x3,
    1 => Float32x3,
    2 => Float32x3,
    3 => Float32x3,
    4 => Float32x2,
];

/// Vertex buffer layout shared by the attribute and visibility pipelines.
#[must_use]
pub fn bake_vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<BakeVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &VERTEX_ATTRIBUTES,
    }
}

/// CPU-side mesh data in the unwelded form the packer requires.
pub struct MeshData {
    /// World-space positions, one per face corner.
    pub positions: Vec<Vec3>,
    /// Surface normals, one per face corner.
    pub normals: Vec<Vec3>,
    /// Diffuse reflectance, one per face corner.
    pub albedos: Vec<Vec3>,
    /// Emitted radiosity, one per face corner.
    pub emissives: Vec<Vec3>,
    /// Triangle indices (sequential after unwelding).
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Duplicate shared vertices so every triangle corner is unique.
    ///
    /// Indexed meshes reuse vertices between faces, but lightmap islands
    /// are per-face: a shared corner would need two different UVs. The
    /// unwelded stream indexes `0..indices.len()` sequentially.
    #[must_use]
    pub fn unweld(
        positions: &[Vec3],
        normals: &[Vec3],
        albedos: &[Vec3],
        emissives: &[Vec3],
        indices: &[u32],
    ) -> Self {
        let mut out = Self {
            positions: Vec::with_capacity(indices.len()),
            normals: Vec::with_capacity(indices.len()),
            albedos: Vec::with_capacity(indices.len()),
            emissives: Vec::with_capacity(indices.len()),
            indices: (0..indices.len() as u32).collect(),
        };
        for &i in indices {
            let i = i as usize;
            out.positions.push(positions[i]);
            out.normals.push(normals[i]);
            out.albedos.push(albedos[i]);
            out.emissives.push(emissives[i]);
        }
        out
    }

    /// Interleave the mesh with its packed lightmap UVs.
    #[must_use]
    pub fn vertices(&self, uvs: &[Vec2]) -> Vec<BakeVertex> {
        self.positions
            .iter()
            .zip(&self.normals)
            .zip(&self.albedos)
            .zip(&self.emissives)
            .zip(uvs)
            .map(|((((p, n), a), e), uv)| BakeVertex {
                position: p.to_array(),
                normal: n.to_array(),
                albedo: a.to_array(),
                emissive: e.to_array(),
                lightmap_uv: uv.to_array(),
            })
            .collect()
    }
}

/// GPU-resident mesh the bake pipelines draw.
pub struct BakeMesh {
    /// Interleaved vertex buffer.
    pub vertex_buffer: wgpu::Buffer,
    /// Triangle index buffer (u32).
    pub index_buffer: wgpu::Buffer,
    /// Number of indices to draw.
    pub index_count: u32,
}

impl BakeMesh {
    /// Upload an unwelded mesh with its packed UVs.
    #[must_use]
    pub fn upload(
        device: &wgpu::Device,
        mesh: &MeshData,
        uvs: &[Vec2],
    ) -> Self {
        let vertices = mesh.vertices(uvs);
        let vertex_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bake Vertex Buffer"),
                contents: bytemuck::cast_slice(&vertices),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer =
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Bake Index Buffer"),
                contents: bytemuck::cast_slice(&mesh.indices),
                usage: wgpu::BufferUsages::INDEX,
            });
        Self {
            vertex_buffer,
            index_buffer,
            index_count: mesh.indices.len() as u32,
        }
    }

    /// Draw the whole mesh into the given pass. The pipeline and bind
    /// groups must already be set.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(
            self.index_buffer.slice(..),
            wgpu::IndexFormat::Uint32,
        );
        pass.draw_indexed(0..self.index_count, 0, 0..1);
    }
}

/// Optional direct point light contributing to the seed term alongside
/// per-vertex emissive.
#[derive(Debug, Clone, Copy)]
pub struct DirectLight {
    /// World-space light position.
    pub position: Vec3,
    /// Light color.
    pub color: Vec3,
    /// Unattenuated intensity.
    pub intensity: f32,
}

impl Default for DirectLight {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 500.0, 0.0),
            color: Vec3::ONE,
            intensity: 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unweld_duplicates_shared_corners() {
        // Two triangles sharing an edge (vertices 1 and 2)
        let positions = [
            Vec3::ZERO,
            Vec3::X,
            Vec3::Y,
            Vec3::new(1.0, 1.0, 0.0),
        ];
        let normals = [Vec3::Z; 4];
        let albedos = [Vec3::ONE; 4];
        let emissives = [Vec3::ZERO; 4];
        let indices = [0, 1, 2, 1, 3, 2];

        let mesh = MeshData::unweld(
            &positions, &normals, &albedos, &emissives, &indices,
        );
        assert_eq!(mesh.positions.len(), 6);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 4, 5]);
        // The shared edge appears twice, once per face
        assert_eq!(mesh.positions[1], mesh.positions[3]);
        assert_eq!(mesh.positions[2], mesh.positions[5]);
    }

    #[test]
    fn vertex_layout_matches_struct_size() {
        let layout = bake_vertex_layout();
        assert_eq!(layout.array_stride, 56);
        assert_eq!(layout.attributes.len(), 5);
        let last = layout.attributes[4];
        assert_eq!(last.offset, 48);
    }
}
