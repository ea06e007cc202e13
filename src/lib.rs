// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![warn(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code (contract assertions excepted)
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Function signature hygiene
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! GPU progressive-refinement radiosity lightmap baker built on wgpu.
//!
//! Lumo bakes indirect diffuse lighting ("global illumination") into a
//! per-surface lightmap. Mesh faces are projected and packed into a UV
//! atlas, surface attributes are rasterized into per-texel buffers, and a
//! progressive radiosity loop repeatedly picks the texel holding the most
//! undistributed energy, samples its visibility through a five-face
//! hemicube render, and redistributes that energy to the texels it can see.
//!
//! # Key entry points
//!
//! - [`atlas::pack`] - project mesh faces and pack them into the UV atlas
//! - [`scene::BakeMesh`] - GPU upload of the collaborator-owned mesh data
//! - [`solver::RadiositySolver`] - the progressive radiosity loop
//! - [`settings::BakeSettings`] - runtime configuration (atlas, hemicube,
//!   solver)
//!
//! # Architecture
//!
//! All heavy work runs as data-parallel WGSL passes (one logical thread per
//! texel or pixel) driven by a single synchronous control loop: an
//! attribute rasterization seeds the energy buffers once, then each bounce
//! runs a two-phase max reduction to select the shooter, five hemicube
//! visibility renders, an energy-transfer dispatch, and a shooter reset.
//! Every intermediate `radiosity` state is a valid partial solution
//! suitable for live preview.

pub mod atlas;
pub mod error;
pub mod gpu;
pub mod hemicube;
pub mod scene;
pub mod settings;
pub mod solver;
