//! Blocking staging-buffer readback.
//!
//! The solver reads the shooter-info record back every bounce to build the
//! hemicube transforms, and diagnostics/tests read whole textures. Both go
//! through a transient staging buffer that is mapped synchronously: the
//! control loop is strictly sequential, so there is nothing to overlap
//! with.

use std::fmt;
use std::sync::mpsc;

/// Errors produced while mapping a staging buffer.
#[derive(Debug)]
pub enum ReadbackError {
    /// The buffer mapping was rejected or lost.
    Map(wgpu::BufferAsyncError),
    /// The device dropped the mapping callback without resolving it.
    Disconnected,
}

impl fmt::Display for ReadbackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Map(e) => write!(f, "buffer mapping failed: {e}"),
            Self::Disconnected => {
                write!(f, "buffer mapping callback was dropped")
            }
        }
    }
}

impl std::error::Error for ReadbackError {}

fn map_blocking(
    device: &wgpu::Device,
    staging: &wgpu::Buffer,
) -> Result<(), ReadbackError> {
    let (tx, rx) = mpsc::channel();
    staging.slice(..).map_async(wgpu::MapMode::Read, move |result| {
        let _ = tx.send(result);
    });
    let _ = device.poll(wgpu::PollType::Wait);
    match rx.recv() {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ReadbackError::Map(e)),
        Err(_) => Err(ReadbackError::Disconnected),
    }
}

/// Copy `size` bytes out of `buffer` and block until they are mapped.
///
/// # Errors
///
/// Returns [`ReadbackError`] if the staging buffer cannot be mapped.
pub fn read_buffer(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    buffer: &wgpu::Buffer,
    size: u64,
) -> Result<Vec<u8>, ReadbackError> {
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Readback Staging Buffer"),
        size,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Readback Encoder"),
        });
    encoder.copy_buffer_to_buffer(buffer, 0, &staging, 0, size);
    let _ = queue.submit(std::iter::once(encoder.finish()));

    map_blocking(device, &staging)?;
    let data = staging.slice(..).get_mapped_range().to_vec();
    staging.unmap();
    Ok(data)
}

/// Copy a whole 2D texture into CPU memory, stripping the 256-byte row
/// alignment wgpu requires for texture-to-buffer copies.
///
/// # Errors
///
/// Returns [`ReadbackError`] if the staging buffer cannot be mapped.
pub fn read_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    bytes_per_pixel: u32,
) -> Result<Vec<u8>, ReadbackError> {
    let width = texture.width();
    let height = texture.height();
    let unpadded_row = width * bytes_per_pixel;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_row = unpadded_row.div_ceil(align) * align;

    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Texture Readback Staging Buffer"),
        size: u64::from(padded_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    let mut encoder =
        device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Texture Readback Encoder"),
        });
    encoder.copy_texture_to_buffer(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        wgpu::TexelCopyBufferInfo {
            buffer: &staging,
            layout: wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(padded_row),
                rows_per_image: Some(height),
            },
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    let _ = queue.submit(std::iter::once(encoder.finish()));

    map_blocking(device, &staging)?;
    let padded = staging.slice(..).get_mapped_range().to_vec();
    staging.unmap();

    let mut data =
        Vec::with_capacity((unpadded_row * height) as usize);
    for row in 0..height {
        let start = (row * padded_row) as usize;
        data.extend_from_slice(&padded[start..start + unpadded_row as usize]);
    }
    Ok(data)
}
