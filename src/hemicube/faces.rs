use glam::{Mat4, Vec3, Vec4};

/// One of the five hemicube faces, in emission order.
///
/// The front face looks along the surface normal; the four side faces
/// cover the remaining hemisphere. Side faces only see half of their 90
/// degree frustum above the surface plane, so they render through
/// off-center half frustums into half-size strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HemicubeFace {
    /// Along the surface-tangent right axis.
    PositiveX,
    /// Against the surface-tangent right axis.
    NegativeX,
    /// Along the surface-tangent up axis.
    PositiveY,
    /// Against the surface-tangent up axis.
    NegativeY,
    /// Along the surface normal (the front face).
    NegativeZ,
}

impl HemicubeFace {
    /// All faces in fixed emission order.
    pub const ALL: [Self; 5] = [
        Self::PositiveX,
        Self::NegativeX,
        Self::PositiveY,
        Self::NegativeY,
        Self::NegativeZ,
    ];

    /// Index of this face in [`Self::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        match self {
            Self::PositiveX => 0,
            Self::NegativeX => 1,
            Self::PositiveY => 2,
            Self::NegativeY => 3,
            Self::NegativeZ => 4,
        }
    }
}

/// Pixel rectangle of one face inside the shared hemicube target. Doubles
/// as both viewport and scissor for that face's render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Rectangle of `face` inside the `2 * resolution` square target: a
/// full-size center square for the front face and four half strips in a
/// cross arrangement around it.
#[must_use]
pub fn face_rect(face: HemicubeFace, resolution: u32) -> FaceRect {
    let r = resolution;
    match face {
        HemicubeFace::PositiveX => FaceRect {
            x: 3 * r / 2,
            y: r / 2,
            width: r / 2,
            height: r,
        },
        HemicubeFace::NegativeX => FaceRect {
            x: 0,
            y: r / 2,
            width: r / 2,
            height: r,
        },
        HemicubeFace::PositiveY => FaceRect {
            x: r / 2,
            y: 3 * r / 2,
            width: r,
            height: r / 2,
        },
        HemicubeFace::NegativeY => FaceRect {
            x: r / 2,
            y: 0,
            width: r,
            height: r / 2,
        },
        HemicubeFace::NegativeZ => FaceRect {
            x: r / 2,
            y: r / 2,
            width: r,
            height: r,
        },
    }
}

/// Surface-tangent basis the per-face cameras are derived from.
#[derive(Debug, Clone, Copy)]
pub struct HemiBasis {
    /// Tangent right axis.
    pub right: Vec3,
    /// Tangent up axis.
    pub up: Vec3,
    /// The surface normal.
    pub front: Vec3,
}

impl HemiBasis {
    /// Build an orthonormal basis around `normal`.
    ///
    /// The reference axis is world X; when `normal` is (nearly) parallel
    /// to it the reference degenerates, so world Y takes over. A zero or
    /// non-finite normal falls back to world Z.
    #[must_use]
    pub fn from_normal(normal: Vec3) -> Self {
        let front = normal.normalize_or(Vec3::Z);
        let reference = if front.x.abs() > 0.99 {
            Vec3::Y
        } else {
            Vec3::X
        };
        let up = reference.cross(front).normalize();
        let right = front.cross(up);
        Self { right, up, front }
    }
}

/// View matrix for one face's camera at `eye`.
#[must_use]
pub fn face_view(face: HemicubeFace, eye: Vec3, basis: &HemiBasis) -> Mat4 {
    let HemiBasis { right, up, front } = *basis;
    let (forward, face_up) = match face {
        HemicubeFace::PositiveX => (right, up),
        HemicubeFace::NegativeX => (-right, up),
        HemicubeFace::PositiveY => (up, -front),
        HemicubeFace::NegativeY => (-up, front),
        HemicubeFace::NegativeZ => (front, up),
    };
    Mat4::look_at_rh(eye, eye + forward, face_up)
}

/// Off-center right-handed perspective frustum with [0, 1] depth (wgpu
/// convention), specified by near-plane extents.
fn frustum_rh(l: f32, r: f32, b: f32, t: f32, near: f32, far: f32) -> Mat4 {
    Mat4::from_cols(
        Vec4::new(2.0 * near / (r - l), 0.0, 0.0, 0.0),
        Vec4::new(0.0, 2.0 * near / (t - b), 0.0, 0.0),
        Vec4::new(
            (r + l) / (r - l),
            (t + b) / (t - b),
            far / (near - far),
            -1.0,
        ),
        Vec4::new(0.0, 0.0, near * far / (near - far), 0.0),
    )
}

/// Projection matrix for one face.
///
/// The front face uses a symmetric 90 degree frustum. Each side face
/// keeps only the half of its 90 degree frustum that lies above the
/// surface plane — the half adjacent to the front face in the hemicube
/// layout — expressed as an off-center frustum so the whole half-size
/// strip is covered by an in-bounds viewport.
#[must_use]
pub fn face_projection(face: HemicubeFace, near: f32, far: f32) -> Mat4 {
    let n = near;
    match face {
        // front appears on the image-left half
        HemicubeFace::PositiveX => frustum_rh(-n, 0.0, -n, n, near, far),
        // front appears on the image-right half
        HemicubeFace::NegativeX => frustum_rh(0.0, n, -n, n, near, far),
        // front appears on the image-bottom half
        HemicubeFace::PositiveY => frustum_rh(-n, n, -n, 0.0, near, far),
        // front appears on the image-top half
        HemicubeFace::NegativeY => frustum_rh(-n, n, 0.0, n, near, far),
        HemicubeFace::NegativeZ => {
            Mat4::perspective_rh(std::f32::consts::FRAC_PI_2, 1.0, near, far)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ndc_of(view_proj: Mat4, point: Vec3) -> Vec3 {
        let clip = view_proj * point.extend(1.0);
        Vec3::new(clip.x / clip.w, clip.y / clip.w, clip.z / clip.w)
    }

    #[test]
    fn basis_is_orthonormal_for_arbitrary_normals() {
        let normals = [
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::X,
            Vec3::NEG_X,
            Vec3::new(0.3, -0.8, 0.52).normalize(),
        ];
        for n in normals {
            let basis = HemiBasis::from_normal(n);
            assert!((basis.front.length() - 1.0).abs() < 1e-5);
            assert!((basis.right.length() - 1.0).abs() < 1e-5);
            assert!((basis.up.length() - 1.0).abs() < 1e-5);
            assert!(basis.right.dot(basis.up).abs() < 1e-5);
            assert!(basis.right.dot(basis.front).abs() < 1e-5);
            assert!(basis.up.dot(basis.front).abs() < 1e-5);
        }
    }

    #[test]
    fn degenerate_normal_falls_back_without_nan() {
        let basis = HemiBasis::from_normal(Vec3::ZERO);
        assert!(basis.front.is_finite());
        assert!(basis.right.is_finite());
        assert!(basis.up.is_finite());
    }

    #[test]
    fn face_rects_are_disjoint_and_in_bounds() {
        let res = 128;
        let size = 2 * res;
        let rects: Vec<FaceRect> = HemicubeFace::ALL
            .iter()
            .map(|&f| face_rect(f, res))
            .collect();
        for r in &rects {
            assert!(r.x + r.width <= size);
            assert!(r.y + r.height <= size);
        }
        for i in 0..rects.len() {
            for j in (i + 1)..rects.len() {
                let (a, b) = (rects[i], rects[j]);
                let overlap = a.x < b.x + b.width
                    && b.x < a.x + a.width
                    && a.y < b.y + b.height
                    && b.y < a.y + a.height;
                assert!(!overlap, "face rects {i} and {j} overlap");
            }
        }
    }

    #[test]
    fn front_face_maps_normal_to_viewport_center() {
        let origin = Vec3::new(278.0, 273.0, -279.0);
        let normal = Vec3::new(0.0, -1.0, 0.0);
        let basis = HemiBasis::from_normal(normal);
        let view = face_view(HemicubeFace::NegativeZ, origin, &basis);
        let proj = face_projection(HemicubeFace::NegativeZ, 0.1, 3000.0);
        let ndc = ndc_of(proj * view, origin + normal);
        assert!(ndc.x.abs() < 1e-4, "center x: {}", ndc.x);
        assert!(ndc.y.abs() < 1e-4, "center y: {}", ndc.y);
        assert!(ndc.z > 0.0 && ndc.z < 1.0, "depth: {}", ndc.z);
    }

    #[test]
    fn side_faces_keep_the_half_toward_the_normal() {
        let origin = Vec3::ZERO;
        let normal = Vec3::Y;
        let basis = HemiBasis::from_normal(normal);

        // A direction leaning from the face forward toward the normal must
        // land strictly inside every side face's half frustum
        for &face in &HemicubeFace::ALL[..4] {
            let forward = match face {
                HemicubeFace::PositiveX => basis.right,
                HemicubeFace::NegativeX => -basis.right,
                HemicubeFace::PositiveY => basis.up,
                HemicubeFace::NegativeY => -basis.up,
                HemicubeFace::NegativeZ => basis.front,
            };
            let probe = origin + (forward * 2.0 + basis.front).normalize();
            let view = face_view(face, origin, &basis);
            let proj = face_projection(face, 0.1, 3000.0);
            let ndc = ndc_of(proj * view, probe);
            assert!(
                ndc.x > -1.0 + 1e-4 && ndc.x < 1.0 - 1e-4,
                "{face:?}: probe ndc.x {} outside half frustum",
                ndc.x
            );
            assert!(
                ndc.y > -1.0 + 1e-4 && ndc.y < 1.0 - 1e-4,
                "{face:?}: probe ndc.y {} outside half frustum",
                ndc.y
            );
            assert!(ndc.z > 0.0 && ndc.z < 1.0);

            // The mirrored direction below the surface plane must fall
            // outside the kept half
            let below = origin + (forward * 2.0 - basis.front).normalize();
            let ndc_below = ndc_of(proj * view, below);
            assert!(
                ndc_below.x.abs() > 1.0 - 1e-4
                    || ndc_below.y.abs() > 1.0 - 1e-4,
                "{face:?}: below-horizon direction landed inside"
            );
        }
    }

    #[test]
    fn side_face_frustum_spans_forward_to_normal() {
        // A side face's forward axis sits at the center of the full 90
        // degree frustum, which after halving becomes the strip's outer
        // edge; the surface normal sits on the opposite edge, shared with
        // the front face.
        let origin = Vec3::ZERO;
        let basis = HemiBasis::from_normal(Vec3::Y);
        let view = face_view(HemicubeFace::PositiveX, origin, &basis);
        let proj = face_projection(HemicubeFace::PositiveX, 0.1, 100.0);
        let vp = proj * view;

        let ndc_forward = ndc_of(vp, origin + basis.right);
        assert!((ndc_forward.x - 1.0).abs() < 1e-4);
        assert!(ndc_forward.y.abs() < 1e-4);

        // 45 degrees between forward and the normal: the shared boundary
        let ndc_edge =
            ndc_of(vp, origin + (basis.right + basis.front).normalize());
        assert!((ndc_edge.x + 1.0).abs() < 1e-4);
    }
}
