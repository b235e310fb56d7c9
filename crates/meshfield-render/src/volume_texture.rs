//! The 3D texture a distance field lives in.

use meshfield_core::{FieldData, FieldPrecision, GridMapper, MeshfieldError};

use crate::buffer::{aligned_bytes_per_row, create_readback_buffer, read_buffer};
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};

/// Texture format used for `precision`.
#[must_use]
pub fn texture_format(precision: FieldPrecision) -> wgpu::TextureFormat {
    match precision {
        FieldPrecision::Half => wgpu::TextureFormat::Rgba16Float,
        FieldPrecision::Full => wgpu::TextureFormat::Rgba32Float,
    }
}

/// Bytes per texel row of a `size`-wide field in buffer copies, padded to
/// the copy row alignment.
#[must_use]
pub fn field_row_bytes(size: u32, precision: FieldPrecision) -> u32 {
    aligned_bytes_per_row(size * precision.bytes_per_voxel())
}

/// Bytes of a padded buffer image of a whole `size^3` field.
#[must_use]
pub fn field_staging_bytes(size: u32, precision: FieldPrecision) -> u64 {
    u64::from(field_row_bytes(size, precision)) * u64::from(size) * u64::from(size)
}

fn copy_layout(size: u32, precision: FieldPrecision) -> wgpu::TexelCopyBufferLayout {
    wgpu::TexelCopyBufferLayout {
        offset: 0,
        bytes_per_row: Some(field_row_bytes(size, precision)),
        rows_per_image: Some(size),
    }
}

/// An `N^3` four-channel float texture with a linear, edge-clamped sampler.
///
/// Written once from the distance kernel's staging buffer, then only
/// sampled.
pub struct VolumeTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    size: u32,
    precision: FieldPrecision,
}

impl VolumeTexture {
    /// Allocates a zero-initialized `size^3` texture.
    pub fn new(ctx: &GpuContext, size: u32, precision: FieldPrecision) -> RenderResult<Self> {
        let texture = ctx.scoped(RenderError::TextureCreationFailed, |device| {
            device.create_texture(&wgpu::TextureDescriptor {
                label: Some("distance field"),
                size: wgpu::Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: size,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D3,
                format: texture_format(precision),
                usage: wgpu::TextureUsages::TEXTURE_BINDING
                    | wgpu::TextureUsages::COPY_DST
                    | wgpu::TextureUsages::COPY_SRC,
                view_formats: &[],
            })
        })?;

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("distance field view"),
            dimension: Some(wgpu::TextureViewDimension::D3),
            ..Default::default()
        });

        let sampler = ctx.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("distance field sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            size,
            precision,
        })
    }

    /// The texture.
    #[must_use]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// A 3D view over the whole texture.
    #[must_use]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// The linear clamp sampler.
    #[must_use]
    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    /// Texels per axis.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Storage precision.
    #[must_use]
    pub fn precision(&self) -> FieldPrecision {
        self.precision
    }

    fn extent(&self) -> wgpu::Extent3d {
        wgpu::Extent3d {
            width: self.size,
            height: self.size,
            depth_or_array_layers: self.size,
        }
    }

    /// Records a copy of a padded buffer image (see [`field_staging_bytes`])
    /// into the whole texture.
    pub fn copy_from_staging(&self, encoder: &mut wgpu::CommandEncoder, staging: &wgpu::Buffer) {
        encoder.copy_buffer_to_texture(
            wgpu::TexelCopyBufferInfo {
                buffer: staging,
                layout: copy_layout(self.size, self.precision),
            },
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            self.extent(),
        );
    }

    /// Copies the texture back into a CPU field laid out like `grid`.
    pub fn read_back(&self, ctx: &GpuContext, grid: &GridMapper) -> RenderResult<FieldData> {
        if grid.size() != self.size {
            return Err(MeshfieldError::SizeMismatch {
                expected: self.size as usize,
                actual: grid.size() as usize,
            }
            .into());
        }

        let n = self.size;
        let bytes_per_row = field_row_bytes(n, self.precision);
        let buffer = create_readback_buffer(
            &ctx.device,
            field_staging_bytes(n, self.precision),
            Some("distance field readback"),
        );

        let mut encoder = ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("distance field readback encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: copy_layout(n, self.precision),
            },
            self.extent(),
        );
        ctx.queue.submit(std::iter::once(encoder.finish()));

        let data = read_buffer(&ctx.device, &buffer)?;
        let voxels = decode_rows(&data, n, bytes_per_row, self.precision);
        Ok(FieldData::new(*grid, voxels)?)
    }
}

// Strips row padding and widens each texel to `[f32; 4]`.
fn decode_rows(data: &[u8], n: u32, bytes_per_row: u32, precision: FieldPrecision) -> Vec<[f32; 4]> {
    let n = n as usize;
    let stride = bytes_per_row as usize;
    let row_bytes = n * precision.bytes_per_voxel() as usize;
    let mut voxels = Vec::with_capacity(n * n * n);

    for row in data.chunks_exact(stride).take(n * n) {
        let texels = &row[..row_bytes];
        match precision {
            FieldPrecision::Half => {
                voxels.extend(texels.chunks_exact(8).map(|t| {
                    let channel = |i: usize| {
                        half::f16::from_bits(u16::from_le_bytes([t[2 * i], t[2 * i + 1]])).to_f32()
                    };
                    [channel(0), channel(1), channel(2), channel(3)]
                }));
            }
            FieldPrecision::Full => {
                voxels.extend(texels.chunks_exact(16).map(|t| {
                    let channel = |i: usize| {
                        f32::from_le_bytes([t[4 * i], t[4 * i + 1], t[4 * i + 2], t[4 * i + 3]])
                    };
                    [channel(0), channel(1), channel(2), channel(3)]
                }));
            }
        }
    }

    voxels
}
