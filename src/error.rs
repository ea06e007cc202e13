//! Crate-level error types.

use std::fmt;

use crate::atlas::PackError;
use crate::gpu::readback::ReadbackError;
use crate::gpu::render_context::RenderContextError;

/// Errors produced by the lumo crate.
#[derive(Debug)]
pub enum LumoError {
    /// GPU context or resource initialization failure.
    Gpu(RenderContextError),
    /// A UV island could not be placed in the atlas.
    Packing(PackError),
    /// Staging readback failure (shooter info or diagnostics).
    Readback(ReadbackError),
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML settings parsing/serialization failure.
    SettingsParse(String),
}

impl fmt::Display for LumoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpu(e) => write!(f, "GPU error: {e}"),
            Self::Packing(e) => write!(f, "atlas packing error: {e}"),
            Self::Readback(e) => write!(f, "readback error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::SettingsParse(msg) => {
                write!(f, "settings parse error: {msg}")
            }
        }
    }
}

impl std::error::Error for LumoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpu(e) => Some(e),
            Self::Packing(e) => Some(e),
            Self::Readback(e) => Some(e),
            Self::Io(e) => Some(e),
            Self::SettingsParse(_) => None,
        }
    }
}

impl From<RenderContextError> for LumoError {
    fn from(e: RenderContextError) -> Self {
        Self::Gpu(e)
    }
}

impl From<PackError> for LumoError {
    fn from(e: PackError) -> Self {
        Self::Packing(e)
    }
}

impl From<ReadbackError> for LumoError {
    fn from(e: ReadbackError) -> Self {
        Self::Readback(e)
    }
}

impl From<std::io::Error> for LumoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
