use glam::{Vec2, Vec3};

/// Projected bounding-box area below which a face is treated as degenerate
/// and skipped. Also catches NaN input (comparisons with NaN are false).
const MIN_ISLAND_AREA: f32 = 1e-12;

/// One face's 2D projection: its triangle index, bounding size, and the
/// positions of its three vertices in the shared UV array.
pub(crate) struct Island {
    /// Triangle index in the input stream (identity for error reporting).
    pub face: usize,
    /// Bounding box size, relative to the island origin.
    pub size: Vec2,
    /// Indices of the island's vertices in the UV array.
    pub verts: [usize; 3],
}

/// Project the vertices of a face onto the plane orthogonal to the
/// dominant axis of its normal.
fn project_vertex(position: Vec3, normal_abs: Vec3) -> Vec2 {
    if normal_abs.x > normal_abs.y && normal_abs.x > normal_abs.z {
        Vec2::new(position.y, position.z)
    } else if normal_abs.y > normal_abs.x && normal_abs.y > normal_abs.z {
        Vec2::new(position.x, position.z)
    } else {
        Vec2::new(position.y, position.x)
    }
}

/// Project every face into a local-origin 2D island, writing the island's
/// untranslated points into `uvs`.
///
/// Degenerate faces (zero projected area, NaN input) are skipped: their
/// UVs are left at zero and no island is produced for them.
pub(crate) fn project_islands(
    positions: &[Vec3],
    normals: &[Vec3],
    indices: &[u32],
    uvs: &mut [Vec2],
) -> Vec<Island> {
    let mut islands = Vec::with_capacity(indices.len() / 3);

    for (face, tri) in indices.chunks_exact(3).enumerate() {
        let verts = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let normal_abs = normals[verts[0]].abs();

        let mut uv_min = Vec2::MAX;
        let mut uv_max = Vec2::MIN;
        for &v in &verts {
            let p = project_vertex(positions[v], normal_abs);
            uvs[v] = p;
            uv_min = uv_min.min(p);
            uv_max = uv_max.max(p);
        }

        let size = uv_max - uv_min;
        if !(size.x * size.y >= MIN_ISLAND_AREA) {
            log::warn!(
                "skipping degenerate face {face} (projected size {size:?})"
            );
            for &v in &verts {
                uvs[v] = Vec2::ZERO;
            }
            continue;
        }

        // Make the island's points relative to its own origin
        for &v in &verts {
            uvs[v] -= uv_min;
        }

        islands.push(Island { face, size, verts });
    }

    islands
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_face_preserves_xz_extents() {
        // A face lying in the XZ plane with normal +Y projects onto (x, z)
        let positions = [
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::new(4.0, 5.0, 0.0),
            Vec3::new(4.0, 5.0, 2.0),
        ];
        let normals = [Vec3::Y; 3];
        let indices = [0, 1, 2];
        let mut uvs = [Vec2::ZERO; 3];

        let islands =
            project_islands(&positions, &normals, &indices, &mut uvs);
        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].size, Vec2::new(4.0, 2.0));
    }

    #[test]
    fn zero_area_face_is_skipped() {
        let positions = [Vec3::ZERO, Vec3::ZERO, Vec3::ZERO];
        let normals = [Vec3::Y; 3];
        let indices = [0, 1, 2];
        let mut uvs = [Vec2::splat(9.0); 3];

        let islands =
            project_islands(&positions, &normals, &indices, &mut uvs);
        assert!(islands.is_empty());
        assert!(uvs.iter().all(|uv| *uv == Vec2::ZERO));
    }

    #[test]
    fn nan_input_does_not_leak_into_islands() {
        let positions = [
            Vec3::new(f32::NAN, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
        ];
        let normals = [Vec3::Y; 3];
        let indices = [0, 1, 2];
        let mut uvs = [Vec2::ZERO; 3];

        let islands =
            project_islands(&positions, &normals, &indices, &mut uvs);
        assert!(islands.is_empty());
        assert!(uvs.iter().all(|uv| uv.x == 0.0 && uv.y == 0.0));
    }
}
