//! Lightmap UV atlas generation.
//!
//! Each mesh face is projected onto the plane orthogonal to the dominant
//! axis of its normal, producing a 2D island. Islands are normalized to a
//! shared atlas scale and packed, largest first, into a binary tree over
//! the unit square. The output is one lightmap UV per input vertex plus
//! the world-to-atlas scale the solver needs for form-factor areas.
//!
//! The vertex stream must be unwelded (no vertex shared between faces);
//! see [`crate::scene::MeshData::unweld`].

mod island;
mod packer;

pub use packer::{pack, IslandFailure, PackError, PackedAtlas};
