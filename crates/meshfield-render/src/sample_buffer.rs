//! GPU-resident surface samples.

use meshfield_core::{MeshfieldError, SurfaceSample};

use crate::buffer::create_storage_buffer;
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};

/// Read-only storage buffer holding one [`SurfaceSample`] per triangle vertex.
pub struct SurfaceSampleBuffer {
    buffer: wgpu::Buffer,
    count: u32,
}

impl SurfaceSampleBuffer {
    /// Uploads `samples`. An empty slice is rejected, as is any allocation
    /// the device refuses.
    pub fn new(ctx: &GpuContext, samples: &[SurfaceSample]) -> RenderResult<Self> {
        if samples.is_empty() {
            return Err(MeshfieldError::NoTriangles.into());
        }

        let count = samples.len() as u32;
        let buffer = ctx.scoped(RenderError::BufferCreationFailed, |device| {
            create_storage_buffer(device, samples, Some("surface samples"))
        })?;
        log::debug!(
            "uploaded {count} surface samples ({} bytes)",
            Self::byte_size(samples.len())
        );

        Ok(Self { buffer, count })
    }

    /// Bytes needed to store `count` samples.
    #[must_use]
    pub fn byte_size(count: usize) -> u64 {
        (count * std::mem::size_of::<SurfaceSample>()) as u64
    }

    /// The storage buffer.
    #[must_use]
    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    /// Number of samples.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }
}
