//! Progressive-refinement radiosity solver.
//!
//! The solver owns the persistent per-texel state: attribute textures
//! (position, normal, albedo, seed) rasterized once, and the radiosity and
//! unshot energy buffers mutated every bounce. A bounce runs the declared
//! stage list from [`stages`]: select the shooter by two-phase max
//! reduction, render the shooter's hemicube, transfer energy to visible
//! receivers, zero the shooter, and resolve the outputs. Bounce count is
//! caller-driven; every intermediate state is a valid partial solution.

mod attributes;
mod shooter;
pub mod stages;
mod transfer;

pub use shooter::ShooterInfo;

use glam::Vec3;

use crate::error::LumoError;
use crate::gpu::render_context::{RenderContext, RenderContextError};
use crate::gpu::shader_composer::ShaderComposer;
use crate::gpu::texture::RenderTarget;
use crate::hemicube::HemicubeSampler;
use crate::scene::{BakeMesh, DirectLight};
use crate::settings::BakeSettings;
use self::attributes::{AttributePass, AttributeTargets, SeedPass};
use self::shooter::ShooterSelect;
use self::transfer::{
    ResolvePass, TransferInputs, TransferPass, VisibilityPass,
};

/// Result of a single bounce.
#[derive(Debug, Clone, Copy)]
pub enum BounceOutcome {
    /// The brightest unshot texel fell below the convergence threshold;
    /// nothing was distributed.
    Converged,
    /// One shooter's energy was distributed.
    Shot(ShooterInfo),
}

/// Summary of a [`RadiositySolver::solve`] run. Exhausting the bounce
/// budget without converging is not an error — the partial solve remains
/// usable and the residual is observable via the unshot diagnostic.
#[derive(Debug, Clone, Copy)]
pub struct SolveStats {
    /// Number of bounces that actually distributed energy.
    pub bounces: u32,
    /// Whether the solve reached the convergence threshold.
    pub converged: bool,
}

/// Bakes indirect lighting into a lightmap by progressive refinement.
pub struct RadiositySolver {
    settings: BakeSettings,
    texel_area: f32,
    position_tex: RenderTarget,
    normal_tex: RenderTarget,
    albedo_tex: RenderTarget,
    seed_tex: RenderTarget,
    radiosity_buf: wgpu::Buffer,
    unshot_buf: wgpu::Buffer,
    radiosity_out: RenderTarget,
    unshot_out: RenderTarget,
    hemicube: HemicubeSampler,
    attributes: AttributePass,
    seed: SeedPass,
    shooter: ShooterSelect,
    visibility: VisibilityPass,
    transfer: TransferPass,
    resolve: ResolvePass,
}

/// Verify the requested resolutions fit the device before allocating.
fn check_limits(
    device: &wgpu::Device,
    settings: &BakeSettings,
) -> Result<(), RenderContextError> {
    let limits = device.limits();
    let lm_edge = settings.lightmap.width.max(settings.lightmap.height);
    let hemi_edge = settings.hemicube.resolution * 2;
    if lm_edge.max(hemi_edge) > limits.max_texture_dimension_2d {
        return Err(RenderContextError::LimitsExceeded(format!(
            "texture edge {} exceeds device maximum {}",
            lm_edge.max(hemi_edge),
            limits.max_texture_dimension_2d
        )));
    }
    let buffer_bytes = u64::from(settings.texel_count()) * 16;
    if buffer_bytes > u64::from(limits.max_storage_buffer_binding_size) {
        return Err(RenderContextError::LimitsExceeded(format!(
            "energy buffer of {buffer_bytes} bytes exceeds device maximum {}",
            limits.max_storage_buffer_binding_size
        )));
    }
    Ok(())
}

impl RadiositySolver {
    /// Allocate the persistent texel state and build every pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`LumoError::Gpu`] when the requested lightmap or hemicube
    /// resolution exceeds the device limits.
    pub fn new(
        ctx: &RenderContext,
        settings: &BakeSettings,
    ) -> Result<Self, LumoError> {
        check_limits(&ctx.device, settings).map_err(LumoError::Gpu)?;
        debug_assert_eq!(stages::validate(&[], stages::INIT_STAGES), Ok(()));
        debug_assert_eq!(
            stages::validate(
                &[
                    stages::Resource::PositionTex,
                    stages::Resource::NormalTex,
                    stages::Resource::AlbedoTex,
                    stages::Resource::SeedTex,
                    stages::Resource::Radiosity,
                    stages::Resource::Unshot,
                ],
                stages::BOUNCE_STAGES
            ),
            Ok(())
        );

        let device = &ctx.device;
        let mut composer = ShaderComposer::new();
        let (width, height) =
            (settings.lightmap.width, settings.lightmap.height);

        let position_tex = RenderTarget::color(
            device,
            "Position Texture",
            width,
            height,
            wgpu::TextureFormat::Rgba32Float,
        );
        let normal_tex = RenderTarget::color(
            device,
            "Normal Texture",
            width,
            height,
            wgpu::TextureFormat::Rgba16Float,
        );
        let albedo_tex = RenderTarget::color(
            device,
            "Albedo Texture",
            width,
            height,
            wgpu::TextureFormat::Rgba8Unorm,
        );
        let seed_tex = RenderTarget::color(
            device,
            "Seed Texture",
            width,
            height,
            wgpu::TextureFormat::Rgba16Float,
        );

        let buffer_size = u64::from(settings.texel_count()) * 16;
        let energy_buffer = |label: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size: buffer_size,
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };
        let radiosity_buf = energy_buffer("Radiosity Buffer");
        let unshot_buf = energy_buffer("Unshot Buffer");

        let radiosity_out = RenderTarget::storage(
            device,
            "Radiosity Output Texture",
            width,
            height,
            wgpu::TextureFormat::Rgba16Float,
        );
        let unshot_out = RenderTarget::storage(
            device,
            "Unshot Output Texture",
            width,
            height,
            wgpu::TextureFormat::Rgba16Float,
        );

        let hemicube = HemicubeSampler::new(device, &settings.hemicube);
        let attributes = AttributePass::new(device, &mut composer);
        let seed = SeedPass::new(
            device,
            &mut composer,
            &seed_tex.view,
            &radiosity_buf,
            &unshot_buf,
        );
        let shooter = ShooterSelect::new(
            device,
            &mut composer,
            &settings.lightmap,
            &unshot_buf,
            &position_tex.view,
            &normal_tex.view,
        );
        let visibility = VisibilityPass::new(device, &mut composer);
        let transfer = TransferPass::new(
            device,
            &ctx.queue,
            &mut composer,
            (width, height),
            &TransferInputs {
                shooter: shooter.shooter_buffer(),
                radiosity: &radiosity_buf,
                unshot: &unshot_buf,
                position: &position_tex.view,
                normal: &normal_tex.view,
                albedo: &albedo_tex.view,
                hemicube: hemicube.color_view(),
            },
        );
        let resolve = ResolvePass::new(
            device,
            &mut composer,
            &radiosity_buf,
            &unshot_buf,
            &radiosity_out.view,
            &unshot_out.view,
        );

        log::info!(
            "radiosity solver ready: {width}x{height} lightmap, {} hemicube",
            settings.hemicube.resolution
        );

        Ok(Self {
            settings: *settings,
            texel_area: 1.0,
            position_tex,
            normal_tex,
            albedo_tex,
            seed_tex,
            radiosity_buf,
            unshot_buf,
            radiosity_out,
            unshot_out,
            hemicube,
            attributes,
            seed,
            shooter,
            visibility,
            transfer,
            resolve,
        })
    }

    /// Rasterize the mesh attributes and seed the energy buffers with the
    /// direct/emissive term. Runs the [`stages::INIT_STAGES`] list once;
    /// `texel_area` comes from [`crate::atlas::PackedAtlas::texel_area`].
    pub fn bake_attributes(
        &mut self,
        ctx: &RenderContext,
        mesh: &BakeMesh,
        light: Option<&DirectLight>,
        texel_area: f32,
    ) {
        self.texel_area = texel_area.max(f32::MIN_POSITIVE);
        self.attributes.write_light(&ctx.queue, light);

        let (width, height) =
            (self.settings.lightmap.width, self.settings.lightmap.height);
        let mut encoder = ctx.create_encoder();
        self.attributes.encode(
            &mut encoder,
            &AttributeTargets {
                position: &self.position_tex.view,
                normal: &self.normal_tex.view,
                albedo: &self.albedo_tex.view,
                seed: &self.seed_tex.view,
            },
            mesh,
        );
        self.seed.encode(&mut encoder, width, height);
        // Outputs are queryable from the start
        self.resolve.encode(&mut encoder, width, height);
        ctx.submit(encoder);
        log::debug!("attributes baked, energy seeded");
    }

    /// Run one bounce: shooter selection, hemicube visibility, energy
    /// transfer, shooter reset, output resolve.
    ///
    /// # Errors
    ///
    /// Returns [`LumoError::Readback`] if the shooter record cannot be
    /// read back.
    pub fn bounce(
        &mut self,
        ctx: &RenderContext,
        mesh: &BakeMesh,
    ) -> Result<BounceOutcome, LumoError> {
        let (width, height) =
            (self.settings.lightmap.width, self.settings.lightmap.height);

        // Shooter selection (phases A and B), then read the record back to
        // drive the hemicube cameras
        log::trace!("stage: {}", stages::BOUNCE_STAGES[0].name);
        log::trace!("stage: {}", stages::BOUNCE_STAGES[1].name);
        let mut encoder = ctx.create_encoder();
        self.shooter.encode(&mut encoder);
        ctx.submit(encoder);
        let info = self.shooter.read_back(&ctx.device, &ctx.queue)?;

        if !info.is_valid()
            || info.unshot_luminance()
                < self.settings.solver.convergence_threshold
        {
            return Ok(BounceOutcome::Converged);
        }

        // Hemicube visibility render at the shooter. One submission per
        // face: the camera uniform upload must precede the face's pass.
        log::trace!("stage: {}", stages::BOUNCE_STAGES[2].name);
        let origin = Vec3::new(
            info.position[0],
            info.position[1],
            info.position[2],
        );
        let normal =
            Vec3::new(info.normal[0], info.normal[1], info.normal[2]);
        let mut encoder = ctx.create_encoder();
        self.hemicube.begin(&mut encoder, origin, normal);
        ctx.submit(encoder);
        while let Some(face) = self.hemicube.next() {
            self.visibility.set_camera(&ctx.queue, face.proj * face.view);
            let mut face_encoder = ctx.create_encoder();
            self.visibility.encode(
                &mut face_encoder,
                self.hemicube.color_view(),
                self.hemicube.depth_view(),
                &face,
                mesh,
            );
            ctx.submit(face_encoder);
        }
        self.hemicube.end();

        // Energy transfer, shooter reset, output resolve
        log::trace!("stage: {}", stages::BOUNCE_STAGES[3].name);
        log::trace!("stage: {}", stages::BOUNCE_STAGES[4].name);
        log::trace!("stage: {}", stages::BOUNCE_STAGES[5].name);
        self.transfer.write_params(
            &ctx.queue,
            self.hemicube.view_proj(),
            self.hemicube.resolution(),
            self.texel_area,
        );
        let mut encoder = ctx.create_encoder();
        self.transfer.encode(&mut encoder, width, height);
        self.resolve.encode(&mut encoder, width, height);
        ctx.submit(encoder);

        log::debug!(
            "bounce: shooter ({}, {}) unshot luminance {:.6}",
            info.texel[0],
            info.texel[1],
            info.unshot_luminance()
        );
        Ok(BounceOutcome::Shot(info))
    }

    /// Run bounces until convergence or the configured budget runs out.
    ///
    /// # Errors
    ///
    /// Propagates the first [`LumoError`] a bounce reports.
    pub fn solve(
        &mut self,
        ctx: &RenderContext,
        mesh: &BakeMesh,
    ) -> Result<SolveStats, LumoError> {
        for bounce in 0..self.settings.solver.max_bounces {
            if let BounceOutcome::Converged = self.bounce(ctx, mesh)? {
                return Ok(SolveStats {
                    bounces: bounce,
                    converged: true,
                });
            }
        }
        log::debug!(
            "bounce budget exhausted after {} iterations",
            self.settings.solver.max_bounces
        );
        Ok(SolveStats {
            bounces: self.settings.solver.max_bounces,
            converged: false,
        })
    }

    /// Read the resolved lightmap back to the CPU as linear RGBA floats,
    /// decoding the Rgba16Float texel data (e.g. for export to disk).
    ///
    /// # Errors
    ///
    /// Returns [`LumoError::Readback`] if the staging copy cannot be
    /// mapped.
    pub fn read_lightmap(
        &self,
        ctx: &RenderContext,
    ) -> Result<Vec<[f32; 4]>, LumoError> {
        let bytes = crate::gpu::readback::read_texture(
            &ctx.device,
            &ctx.queue,
            &self.radiosity_out.texture,
            8,
        )?;
        Ok(bytes
            .chunks_exact(8)
            .map(|px| {
                let mut texel = [0.0f32; 4];
                for (i, value) in texel.iter_mut().enumerate() {
                    let bits =
                        u16::from_le_bytes([px[i * 2], px[i * 2 + 1]]);
                    *value = half::f16::from_bits(bits).to_f32();
                }
                texel
            })
            .collect())
    }

    /// The baked lightmap as an ordinary 2D texture (Rgba16Float).
    #[must_use]
    pub fn radiosity_texture(&self) -> &wgpu::Texture {
        &self.radiosity_out.texture
    }

    /// View of the baked lightmap.
    #[must_use]
    pub fn radiosity_view(&self) -> &wgpu::TextureView {
        &self.radiosity_out.view
    }

    /// Diagnostic: undistributed energy as a 2D texture.
    #[must_use]
    pub fn unshot_texture(&self) -> &wgpu::Texture {
        &self.unshot_out.texture
    }

    /// Diagnostic: the last hemicube color target.
    #[must_use]
    pub fn visibility_texture(&self) -> &wgpu::Texture {
        self.hemicube.color_texture()
    }

    /// Raw radiosity energy buffer (vec4 per texel).
    #[must_use]
    pub fn radiosity_buffer(&self) -> &wgpu::Buffer {
        &self.radiosity_buf
    }

    /// Raw unshot energy buffer (vec4 per texel).
    #[must_use]
    pub fn unshot_buffer(&self) -> &wgpu::Buffer {
        &self.unshot_buf
    }

    /// The settings this solver was built with.
    #[must_use]
    pub fn settings(&self) -> &BakeSettings {
        &self.settings
    }
}
