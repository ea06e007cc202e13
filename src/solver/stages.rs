//! Declared pipeline stages and their data dependencies.
//!
//! The portable contract of the solver is this dependency graph, not any
//! particular dispatch call: a stage may read a resource only after an
//! earlier stage (or initialization) wrote it, with a kernel boundary in
//! between. wgpu's pass and submission ordering provides those boundaries;
//! the tables here make the graph explicit and let a test verify that the
//! encode order the solver uses is a valid topological order.

/// Shared GPU resources the stages read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// Per-texel world position texture (`w` = coverage mask).
    PositionTex,
    /// Per-texel surface normal texture.
    NormalTex,
    /// Per-texel albedo texture.
    AlbedoTex,
    /// Per-texel direct/emissive seed texture.
    SeedTex,
    /// Accumulated radiosity buffer.
    Radiosity,
    /// Undistributed energy buffer.
    Unshot,
    /// Per-work-group reduction scratch buffer.
    GroupMax,
    /// The shooter-info record.
    ShooterRecord,
    /// The hemicube color+depth target.
    HemicubeTarget,
    /// Resolved radiosity/unshot output textures.
    ResolvedOutputs,
}

/// One data-parallel stage with its declared reads and writes.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    /// Stage name, used for trace logging.
    pub name: &'static str,
    /// Resources this stage reads.
    pub reads: &'static [Resource],
    /// Resources this stage writes.
    pub writes: &'static [Resource],
}

/// Initialization stages, run once before any bounce.
pub const INIT_STAGES: &[Stage] = &[
    Stage {
        name: "attributes-geometry",
        reads: &[],
        writes: &[Resource::PositionTex, Resource::NormalTex],
    },
    Stage {
        name: "attributes-material",
        reads: &[],
        writes: &[Resource::AlbedoTex, Resource::SeedTex],
    },
    Stage {
        name: "seed-energy",
        reads: &[Resource::SeedTex],
        writes: &[Resource::Radiosity, Resource::Unshot],
    },
];

/// Stages of one bounce, in encode order.
pub const BOUNCE_STAGES: &[Stage] = &[
    Stage {
        name: "select-shooter-local",
        reads: &[Resource::Unshot, Resource::PositionTex],
        writes: &[Resource::GroupMax],
    },
    Stage {
        name: "select-shooter-global",
        reads: &[
            Resource::GroupMax,
            Resource::Unshot,
            Resource::PositionTex,
            Resource::NormalTex,
        ],
        writes: &[Resource::ShooterRecord],
    },
    Stage {
        name: "hemicube-visibility",
        reads: &[Resource::ShooterRecord],
        writes: &[Resource::HemicubeTarget],
    },
    Stage {
        name: "transfer-energy",
        reads: &[
            Resource::ShooterRecord,
            Resource::HemicubeTarget,
            Resource::PositionTex,
            Resource::NormalTex,
            Resource::AlbedoTex,
        ],
        writes: &[Resource::Radiosity, Resource::Unshot],
    },
    Stage {
        name: "reset-shooter",
        reads: &[Resource::ShooterRecord],
        writes: &[Resource::Unshot],
    },
    Stage {
        name: "resolve-outputs",
        reads: &[Resource::Radiosity, Resource::Unshot],
        writes: &[Resource::ResolvedOutputs],
    },
];

/// Check that every read in `stages` is satisfied by `available` or by an
/// earlier stage's write.
pub(crate) fn validate(
    available: &[Resource],
    stages: &[Stage],
) -> Result<(), String> {
    let mut written: Vec<Resource> = available.to_vec();
    for stage in stages {
        for read in stage.reads {
            if !written.contains(read) {
                return Err(format!(
                    "stage '{}' reads {read:?} before any stage writes it",
                    stage.name
                ));
            }
        }
        written.extend_from_slice(stage.writes);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_stages_have_valid_dependencies() {
        assert_eq!(validate(&[], INIT_STAGES), Ok(()));
    }

    #[test]
    fn bounce_stages_have_valid_dependencies() {
        // A bounce starts from the state initialization leaves behind
        let after_init = [
            Resource::PositionTex,
            Resource::NormalTex,
            Resource::AlbedoTex,
            Resource::SeedTex,
            Resource::Radiosity,
            Resource::Unshot,
        ];
        assert_eq!(validate(&after_init, BOUNCE_STAGES), Ok(()));
    }

    #[test]
    fn missing_writer_is_rejected() {
        let stages = &[Stage {
            name: "transfer-energy",
            reads: &[Resource::HemicubeTarget],
            writes: &[Resource::Radiosity],
        }];
        assert!(validate(&[], stages).is_err());
    }
}
