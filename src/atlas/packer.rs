use std::fmt;

use glam::{Vec2, Vec3};

use crate::atlas::island::{project_islands, Island};
use crate::settings::LightmapSettings;

/// Slack applied to the shared atlas scale to absorb packing
/// inefficiency: islands never tile the square perfectly, so the atlas is
/// sized 1.35x the square root of the total island area.
const PACK_SLACK: f32 = 1.35;

/// Errors produced when converting a packed atlas into a strict result.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PackError {
    /// An island did not fit anywhere in the atlas.
    Unplaceable {
        /// Triangle index of the island that failed to place.
        face: usize,
        /// Requested width, in atlas units (padding included).
        width: f32,
        /// Requested height, in atlas units (padding included).
        height: f32,
    },
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unplaceable {
                face,
                width,
                height,
            } => write!(
                f,
                "island for face {face} ({width:.4} x {height:.4}) does \
                 not fit in the atlas"
            ),
        }
    }
}

impl std::error::Error for PackError {}

/// An island that could not be placed. Already-placed islands are
/// unaffected; the caller decides between aborting and continuing with a
/// partial atlas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IslandFailure {
    /// Triangle index of the failed island.
    pub face: usize,
    /// Requested size in atlas units (padding included).
    pub size: Vec2,
}

/// Result of packing a mesh into the lightmap atlas.
pub struct PackedAtlas {
    /// One lightmap UV per input vertex, each in `[0, 1]^2`.
    pub uvs: Vec<Vec2>,
    /// World units per atlas unit: a texel spans `scale / width` world
    /// units horizontally. Zero-area meshes report a scale of zero.
    pub scale: f32,
    /// Islands that did not fit, in insertion order.
    pub failures: Vec<IslandFailure>,
}

impl PackedAtlas {
    /// Convert into a strict result, failing on the first unplaced island.
    ///
    /// # Errors
    ///
    /// Returns [`PackError::Unplaceable`] for the first recorded failure.
    pub fn strict(self) -> Result<Self, PackError> {
        match self.failures.first() {
            Some(f) => Err(PackError::Unplaceable {
                face: f.face,
                width: f.size.x,
                height: f.size.y,
            }),
            None => Ok(self),
        }
    }

    /// World-space area covered by one lightmap texel.
    #[must_use]
    pub fn texel_area(&self, lightmap: &LightmapSettings) -> f32 {
        (self.scale / lightmap.width as f32)
            * (self.scale / lightmap.height as f32)
    }
}

/// Axis-aligned atlas-space rectangle.
#[derive(Debug, Clone, Copy)]
struct Rect {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

/// Binary-tree node over an atlas region. Nodes live in the arena owned by
/// [`PackTree`]; children are addressed by index.
struct PackNode {
    rect: Rect,
    children: Option<[usize; 2]>,
    occupied: bool,
}

/// Arena-allocated packing tree over the unit square.
struct PackTree {
    nodes: Vec<PackNode>,
}

impl PackTree {
    fn new(root: Rect) -> Self {
        Self {
            nodes: vec![PackNode {
                rect: root,
                children: None,
                occupied: false,
            }],
        }
    }

    /// Insert an island of the given size at or below `node`, returning
    /// the index of the occupied leaf.
    fn insert(&mut self, node: usize, size: Vec2) -> Option<usize> {
        // Interior node: recurse into the children
        if let Some([a, b]) = self.nodes[node].children {
            return self
                .insert(a, size)
                .or_else(|| self.insert(b, size));
        }

        let rect = self.nodes[node].rect;
        if self.nodes[node].occupied || size.x > rect.w || size.y > rect.h {
            return None;
        }

        // Exact fit claims the leaf
        if size.x == rect.w && size.y == rect.h {
            self.nodes[node].occupied = true;
            return Some(node);
        }

        // Split along the axis with more leftover slack
        let dw = rect.w - size.x;
        let dh = rect.h - size.y;
        let (first, second) = if dw > dh {
            // Vertical partition
            (
                Rect {
                    x: rect.x,
                    y: rect.y,
                    w: size.x,
                    h: rect.h,
                },
                Rect {
                    x: rect.x + size.x,
                    y: rect.y,
                    w: rect.w - size.x,
                    h: rect.h,
                },
            )
        } else {
            // Horizontal partition
            (
                Rect {
                    x: rect.x,
                    y: rect.y,
                    w: rect.w,
                    h: size.y,
                },
                Rect {
                    x: rect.x,
                    y: rect.y + size.y,
                    w: rect.w,
                    h: rect.h - size.y,
                },
            )
        };

        let a = self.nodes.len();
        self.nodes.push(PackNode {
            rect: first,
            children: None,
            occupied: false,
        });
        let b = self.nodes.len();
        self.nodes.push(PackNode {
            rect: second,
            children: None,
            occupied: false,
        });
        self.nodes[node].children = Some([a, b]);

        self.insert(a, size)
    }
}

/// Project every face into a UV island and pack the islands into the unit
/// square, largest first.
///
/// `positions`, `normals`, and `indices` describe an unwelded triangle
/// stream (each vertex belongs to exactly one face). The returned UVs are
/// indexed like `positions`. Islands that cannot be placed are recorded in
/// [`PackedAtlas::failures`] without disturbing prior placements.
#[must_use]
pub fn pack(
    positions: &[Vec3],
    normals: &[Vec3],
    indices: &[u32],
    lightmap: &LightmapSettings,
) -> PackedAtlas {
    let mut uvs = vec![Vec2::ZERO; positions.len()];
    let mut islands = project_islands(positions, normals, indices, &mut uvs);

    let total_area: f32 =
        islands.iter().map(|q| q.size.x * q.size.y).sum();
    if total_area <= 0.0 {
        return PackedAtlas {
            uvs,
            scale: 0.0,
            failures: Vec::new(),
        };
    }
    let scale = total_area.sqrt() * PACK_SLACK;

    // Padding between islands, in atlas units
    let pad = Vec2::new(
        lightmap.padding as f32 / lightmap.width as f32,
        lightmap.padding as f32 / lightmap.height as f32,
    );

    // Normalize to the atlas scale
    for island in &mut islands {
        island.size = island.size / scale + pad;
    }
    for uv in &mut uvs {
        *uv /= scale;
    }

    // Largest first: greedy packing fragments least when big islands claim
    // space early. The sort is stable, so equal areas keep input order and
    // packing stays deterministic.
    islands.sort_by(|a, b| {
        let area_a = a.size.x * a.size.y;
        let area_b = b.size.x * b.size.y;
        area_b
            .partial_cmp(&area_a)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut tree = PackTree::new(Rect {
        x: pad.x / 2.0,
        y: pad.y / 2.0,
        w: 1.0 - pad.x / 2.0,
        h: 1.0 - pad.y / 2.0,
    });

    let mut failures = Vec::new();
    for island in &islands {
        match tree.insert(0, island.size) {
            Some(leaf) => {
                let rect = tree.nodes[leaf].rect;
                let offset =
                    Vec2::new(rect.x + pad.x / 2.0, rect.y + pad.y / 2.0);
                for &v in &island.verts {
                    uvs[v] += offset;
                }
            }
            None => {
                log::warn!(
                    "island for face {} ({:.4} x {:.4}) does not fit",
                    island.face,
                    island.size.x,
                    island.size.y
                );
                failures.push(IslandFailure {
                    face: island.face,
                    size: island.size,
                });
            }
        }
    }

    PackedAtlas {
        uvs,
        scale,
        failures,
    }
}
