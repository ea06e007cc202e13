//! Centralized bake configuration with TOML preset support.
//!
//! All tweakable settings (lightmap resolution, atlas padding, hemicube
//! sampling, solver iteration budget) are consolidated here. Settings
//! serialize to/from TOML so bake presets can be stored alongside scene
//! assets. All sub-structs use `#[serde(default)]` so partial TOML files
//! (e.g. only overriding `[solver]`) work correctly.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::LumoError;

/// Lightmap resolution and atlas layout parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightmapSettings {
    /// Lightmap width in texels.
    pub width: u32,
    /// Lightmap height in texels.
    pub height: u32,
    /// Symmetric anti-bleed border around each island, in atlas texels.
    pub padding: u32,
}

impl Default for LightmapSettings {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            padding: 2,
        }
    }
}

/// Hemicube visibility sampling parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HemicubeSettings {
    /// Edge length of the front face in pixels. The full render target is
    /// `2 * resolution` on each side. Must be even.
    pub resolution: u32,
    /// Near clipping plane for the per-face cameras.
    pub near: f32,
    /// Far clipping plane for the per-face cameras.
    pub far: f32,
}

impl Default for HemicubeSettings {
    fn default() -> Self {
        Self {
            resolution: 128,
            near: 0.1,
            far: 3000.0,
        }
    }
}

/// Progressive solver iteration parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverSettings {
    /// Upper bound on bounces executed by [`solve`].
    ///
    /// [`solve`]: crate::solver::RadiositySolver::solve
    pub max_bounces: u32,
    /// Unshot-luminance level below which the solve counts as converged.
    pub convergence_threshold: f32,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            max_bounces: 64,
            convergence_threshold: 1e-4,
        }
    }
}

/// Top-level bake settings container.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default,
)]
#[serde(default)]
pub struct BakeSettings {
    /// Lightmap resolution and atlas layout.
    pub lightmap: LightmapSettings,
    /// Hemicube sampling parameters.
    pub hemicube: HemicubeSettings,
    /// Solver iteration budget and convergence threshold.
    pub solver: SolverSettings,
}

impl BakeSettings {
    /// Load settings from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`LumoError::Io`] if the file cannot be read, or
    /// [`LumoError::SettingsParse`] on malformed TOML.
    pub fn load(path: &Path) -> Result<Self, LumoError> {
        let content = std::fs::read_to_string(path).map_err(LumoError::Io)?;
        toml::from_str(&content)
            .map_err(|e| LumoError::SettingsParse(e.to_string()))
    }

    /// Save settings to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// Returns [`LumoError::SettingsParse`] on serialization failure or
    /// [`LumoError::Io`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), LumoError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LumoError::SettingsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(LumoError::Io)?;
        }
        std::fs::write(path, content).map_err(LumoError::Io)
    }

    /// Total texel count of the lightmap.
    #[must_use]
    pub fn texel_count(&self) -> u32 {
        self.lightmap.width * self.lightmap.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_round_trips_through_toml() {
        let settings = BakeSettings::default();
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        let parsed: BakeSettings = toml::from_str(&toml_str).unwrap();
        assert_eq!(settings, parsed);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let toml_str = r"
[solver]
max_bounces = 8
";
        let settings: BakeSettings = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.solver.max_bounces, 8);
        // Everything else should be default
        assert_eq!(settings.solver.convergence_threshold, 1e-4);
        assert_eq!(settings.lightmap.width, 256);
        assert_eq!(settings.hemicube.resolution, 128);
    }
}
