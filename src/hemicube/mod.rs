//! Five-face hemicube visibility renderer.
//!
//! A hemicube approximates the hemisphere of directions above a surface
//! point with five perspective renders: one full face along the normal and
//! four half faces for the sides, laid out in a cross inside one shared
//! render target. The solver points it at each bounce's shooter and
//! renders the scene in visibility mode through every face; the transfer
//! pass then projects receiver texels through the same five cameras to
//! test mutual visibility.
//!
//! Exactly five [`HemicubeSampler::next`] calls must happen between
//! [`HemicubeSampler::begin`] and [`HemicubeSampler::end`]; anything else
//! is a programming error and trips an assertion.

mod faces;

pub use faces::{
    face_projection, face_rect, face_view, FaceRect, HemiBasis, HemicubeFace,
};

use glam::{Mat4, Vec3};

use crate::gpu::texture::RenderTarget;
use crate::settings::HemicubeSettings;

/// Texture format of the hemicube color target. Stores, per pixel, the
/// lightmap UV of the surface seen through that pixel and a coverage mask.
pub const COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;

/// Everything the caller needs to render one hemicube face: the camera
/// transforms and the face's viewport/scissor rectangle.
#[derive(Debug, Clone, Copy)]
pub struct FacePass {
    /// Which face this pass renders.
    pub face: HemicubeFace,
    /// View matrix of the face camera.
    pub view: Mat4,
    /// Projection matrix of the face camera.
    pub proj: Mat4,
    /// Viewport and scissor rectangle inside the shared target.
    pub viewport: FaceRect,
}

#[derive(Clone, Copy)]
enum SamplerState {
    Idle,
    Begun { cursor: usize },
}

/// Renders a five-face hemicube projection from a surface point into a
/// shared off-screen color+depth target.
pub struct HemicubeSampler {
    resolution: u32,
    near: f32,
    far: f32,
    color: RenderTarget,
    depth: RenderTarget,
    state: SamplerState,
    origin: Vec3,
    basis: HemiBasis,
    view_proj: [Mat4; 5],
}

impl HemicubeSampler {
    /// Create a sampler with a `2 * resolution` square target.
    ///
    /// # Panics
    ///
    /// Asserts that the resolution is even and non-zero; the half-size
    /// side strips require it.
    #[must_use]
    pub fn new(device: &wgpu::Device, settings: &HemicubeSettings) -> Self {
        let resolution = settings.resolution;
        assert!(
            resolution >= 2 && resolution % 2 == 0,
            "hemicube resolution must be even and non-zero, got {resolution}"
        );
        let size = resolution * 2;
        let color = RenderTarget::color(
            device,
            "Hemicube Color Target",
            size,
            size,
            COLOR_FORMAT,
        );
        let depth =
            RenderTarget::depth(device, "Hemicube Depth Target", size, size);
        Self {
            resolution,
            near: settings.near,
            far: settings.far,
            color,
            depth,
            state: SamplerState::Idle,
            origin: Vec3::ZERO,
            basis: HemiBasis::from_normal(Vec3::Z),
            view_proj: [Mat4::IDENTITY; 5],
        }
    }

    /// Start a hemicube render at `origin` looking along `normal`: derive
    /// the face basis and clear the shared target.
    ///
    /// # Panics
    ///
    /// Asserts that no hemicube render is already in progress.
    pub fn begin(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        origin: Vec3,
        normal: Vec3,
    ) {
        assert!(
            matches!(self.state, SamplerState::Idle),
            "hemicube begin while a render is already in progress"
        );
        self.origin = origin;
        self.basis = HemiBasis::from_normal(normal);

        // Clear-only pass over the full target; faces load on top of it
        let _ = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Hemicube Clear Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(
                wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                },
            ),
            ..Default::default()
        });

        self.state = SamplerState::Begun { cursor: 0 };
    }

    /// Camera transforms and viewport for the next face, in fixed order
    /// (+X, -X, +Y, -Y, -Z). Returns `None` once all five faces have been
    /// emitted. The caller must render the full scene once per face.
    ///
    /// # Panics
    ///
    /// Asserts that a render is in progress.
    pub fn next(&mut self) -> Option<FacePass> {
        let SamplerState::Begun { cursor } = &mut self.state else {
            panic!("hemicube next outside of begin/end");
        };
        if *cursor >= HemicubeFace::ALL.len() {
            return None;
        }
        let face = HemicubeFace::ALL[*cursor];
        *cursor += 1;

        let view = face_view(face, self.origin, &self.basis);
        let proj = face_projection(face, self.near, self.far);
        self.view_proj[face.index()] = proj * view;
        Some(FacePass {
            face,
            view,
            proj,
            viewport: face_rect(face, self.resolution),
        })
    }

    /// Finish the hemicube render and return to idle. Render-pass scoping
    /// restores all viewport/scissor/target state, so nothing else needs
    /// unwinding.
    ///
    /// # Panics
    ///
    /// Asserts that exactly five faces were emitted since `begin`.
    pub fn end(&mut self) {
        let SamplerState::Begun { cursor } = self.state else {
            panic!("hemicube end without begin");
        };
        assert!(
            cursor == HemicubeFace::ALL.len(),
            "hemicube ended after {cursor} faces, expected 5"
        );
        self.state = SamplerState::Idle;
    }

    /// Front-face edge length in pixels.
    #[must_use]
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Edge length of the shared square target in pixels.
    #[must_use]
    pub fn target_size(&self) -> u32 {
        self.resolution * 2
    }

    /// View of the shared color target.
    #[must_use]
    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color.view
    }

    /// The shared color target texture (diagnostic readback).
    #[must_use]
    pub fn color_texture(&self) -> &wgpu::Texture {
        &self.color.texture
    }

    /// View of the shared depth target.
    #[must_use]
    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth.view
    }

    /// Combined view-projection matrices of the last completed render, in
    /// face order. Valid after [`Self::end`].
    #[must_use]
    pub fn view_proj(&self) -> &[Mat4; 5] {
        &self.view_proj
    }
}
