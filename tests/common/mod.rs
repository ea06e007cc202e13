//! Shared fixtures for GPU integration tests.

use glam::{Vec2, Vec3};
use lumo::atlas::PackedAtlas;
use lumo::gpu::readback;
use lumo::gpu::render_context::RenderContext;
use lumo::scene::MeshData;
use lumo::settings::{BakeSettings, HemicubeSettings, LightmapSettings};

/// Acquire a headless GPU context, or `None` when the machine has no
/// usable adapter (the caller should skip the test).
pub fn gpu_context() -> Option<RenderContext> {
    let _ = env_logger::builder().is_test(true).try_init();
    match pollster::block_on(RenderContext::new_headless()) {
        Ok(ctx) => Some(ctx),
        Err(e) => {
            log::warn!("skipping GPU test: {e}");
            None
        }
    }
}

/// Small settings so software adapters stay fast.
pub fn test_settings() -> BakeSettings {
    BakeSettings {
        lightmap: LightmapSettings {
            width: 64,
            height: 64,
            padding: 2,
        },
        hemicube: HemicubeSettings {
            resolution: 64,
            near: 0.05,
            far: 100.0,
        },
        ..Default::default()
    }
}

#[derive(Clone, Copy)]
struct QuadSpec {
    origin: Vec3,
    edge_a: Vec3,
    edge_b: Vec3,
    normal: Vec3,
    albedo: Vec3,
    emissive: Vec3,
}

fn push_quad(mesh: &mut MeshData, spec: &QuadSpec) {
    let QuadSpec {
        origin,
        edge_a,
        edge_b,
        normal,
        albedo,
        emissive,
    } = *spec;
    let corners = [
        origin,
        origin + edge_a,
        origin + edge_a + edge_b,
        origin,
        origin + edge_a + edge_b,
        origin + edge_b,
    ];
    let base = mesh.positions.len() as u32;
    for corner in corners {
        mesh.positions.push(corner);
        mesh.normals.push(normal);
        mesh.albedos.push(albedo);
        mesh.emissives.push(emissive);
    }
    mesh.indices.extend(base..base + 6);
}

/// A closed box interior with an emissive patch under the ceiling: the
/// classic radiosity test chamber. The 8x4x5 footprint keeps the wall
/// islands heterogeneous, which the greedy packer rows up with margin to
/// spare.
pub fn box_scene() -> MeshData {
    let mut mesh = MeshData {
        positions: Vec::new(),
        normals: Vec::new(),
        albedos: Vec::new(),
        emissives: Vec::new(),
        indices: Vec::new(),
    };
    let white = Vec3::splat(0.8);
    let red = Vec3::new(0.75, 0.2, 0.2);
    let green = Vec3::new(0.2, 0.75, 0.2);
    let none = Vec3::ZERO;

    // Floor (y = 0, normal up)
    push_quad(
        &mut mesh,
        &QuadSpec {
            origin: Vec3::ZERO,
            edge_a: Vec3::new(8.0, 0.0, 0.0),
            edge_b: Vec3::new(0.0, 0.0, 5.0),
            normal: Vec3::Y,
            albedo: white,
            emissive: none,
        },
    );
    // Ceiling (y = 4, normal down)
    push_quad(
        &mut mesh,
        &QuadSpec {
            origin: Vec3::new(0.0, 4.0, 0.0),
            edge_a: Vec3::new(0.0, 0.0, 5.0),
            edge_b: Vec3::new(8.0, 0.0, 0.0),
            normal: Vec3::NEG_Y,
            albedo: white,
            emissive: none,
        },
    );
    // Back wall (z = 5, normal toward -Z)
    push_quad(
        &mut mesh,
        &QuadSpec {
            origin: Vec3::new(0.0, 0.0, 5.0),
            edge_a: Vec3::new(8.0, 0.0, 0.0),
            edge_b: Vec3::new(0.0, 4.0, 0.0),
            normal: Vec3::NEG_Z,
            albedo: white,
            emissive: none,
        },
    );
    // Left wall (x = 0, normal toward +X)
    push_quad(
        &mut mesh,
        &QuadSpec {
            origin: Vec3::ZERO,
            edge_a: Vec3::new(0.0, 0.0, 5.0),
            edge_b: Vec3::new(0.0, 4.0, 0.0),
            normal: Vec3::X,
            albedo: red,
            emissive: none,
        },
    );
    // Right wall (x = 8, normal toward -X)
    push_quad(
        &mut mesh,
        &QuadSpec {
            origin: Vec3::new(8.0, 0.0, 0.0),
            edge_a: Vec3::new(0.0, 4.0, 0.0),
            edge_b: Vec3::new(0.0, 0.0, 5.0),
            normal: Vec3::NEG_X,
            albedo: green,
            emissive: none,
        },
    );
    // Emissive patch hanging just below the ceiling, facing the floor
    push_quad(
        &mut mesh,
        &QuadSpec {
            origin: Vec3::new(3.0, 3.9, 1.5),
            edge_a: Vec3::new(2.0, 0.0, 0.0),
            edge_b: Vec3::new(0.0, 0.0, 2.0),
            normal: Vec3::NEG_Y,
            albedo: white,
            emissive: Vec3::splat(12.0),
        },
    );
    mesh
}

/// A box with no emissive surfaces at all.
pub fn dark_scene() -> MeshData {
    let mut mesh = box_scene();
    for e in &mut mesh.emissives {
        *e = Vec3::ZERO;
    }
    mesh
}

/// Pack a mesh with the test lightmap settings, requiring every island to
/// place.
pub fn pack_strict(mesh: &MeshData, settings: &BakeSettings) -> PackedAtlas {
    let atlas = lumo::atlas::pack(
        &mesh.positions,
        &mesh.normals,
        &mesh.indices,
        &settings.lightmap,
    );
    assert!(
        atlas.failures.is_empty(),
        "fixture scene should pack cleanly"
    );
    atlas
}

/// Read an energy buffer back as one vec4 per texel.
pub fn read_energy(
    ctx: &RenderContext,
    buffer: &wgpu::Buffer,
    texel_count: u32,
) -> Vec<[f32; 4]> {
    let bytes = readback::read_buffer(
        &ctx.device,
        &ctx.queue,
        buffer,
        u64::from(texel_count) * 16,
    )
    .unwrap_or_else(|e| panic!("energy readback failed: {e}"));
    bytes
        .chunks_exact(16)
        .map(|chunk| {
            let mut texel = [0.0f32; 4];
            for (i, value) in texel.iter_mut().enumerate() {
                let mut raw = [0u8; 4];
                raw.copy_from_slice(&chunk[i * 4..i * 4 + 4]);
                *value = f32::from_le_bytes(raw);
            }
            texel
        })
        .collect()
}

/// Rec.709 luminance.
pub fn luminance(texel: &[f32; 4]) -> f32 {
    0.2126 * texel[0] + 0.7152 * texel[1] + 0.0722 * texel[2]
}

/// Total unshot luminance across the lightmap.
pub fn total_luminance(texels: &[[f32; 4]]) -> f32 {
    texels.iter().map(luminance).sum()
}

/// Shared UV check: every vertex UV inside the unit square.
pub fn assert_uvs_in_unit_square(uvs: &[Vec2]) {
    for uv in uvs {
        assert!(
            (0.0..=1.0).contains(&uv.x) && (0.0..=1.0).contains(&uv.y),
            "uv out of range: {uv:?}"
        );
    }
}
