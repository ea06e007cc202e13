//! Ambient GPU plumbing: device acquisition, render targets, bind-group
//! layout helpers, staging readback, and WGSL shader composition.

pub mod pipeline_helpers;
pub mod readback;
pub mod render_context;
pub mod shader_composer;
pub mod texture;
