//! Distance field compute kernel: pipeline setup, dispatch and completion barrier.
//!
//! The kernel writes texels into a storage buffer laid out exactly like a
//! padded texture copy; the same submission then copies that buffer into the
//! field texture. Storage buffers and buffer-to-texture copies reach every
//! slice of a 3D texture on all backends, unlike 3D storage textures.

use std::num::NonZeroU64;

use meshfield_core::{
    FieldPrecision, GridMapper, GridUniforms, ShaderConst, ShaderLibrary, VolumeOptions,
};

use crate::buffer::{create_staging_storage_buffer, create_uniform_buffer};
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::sample_buffer::SurfaceSampleBuffer;
use crate::shader::{create_module, KERNEL_PATH};
use crate::volume_texture::{field_row_bytes, field_staging_bytes, VolumeTexture};

/// Compile-time constants the kernel is specialised with.
#[must_use]
pub fn kernel_constants(options: &VolumeOptions) -> [(&'static str, ShaderConst); 6] {
    let texel_bytes = options.precision.bytes_per_voxel();
    let row_texels = field_row_bytes(options.grid_size, options.precision) / texel_bytes;
    [
        ("GRID_SIZE", ShaderConst::U32(options.grid_size)),
        ("BLOCK_EDGE", ShaderConst::U32(options.block_edge)),
        (
            "SIGNED",
            ShaderConst::Bool(options.sign_mode.shader_flag() != 0),
        ),
        (
            "DISTANCE_MODE",
            ShaderConst::U32(options.distance_mode.shader_flag()),
        ),
        ("ROW_TEXELS", ShaderConst::U32(row_texels)),
        ("TEXEL_WORDS", ShaderConst::U32(texel_bytes / 4)),
    ]
}

/// A compiled distance kernel for one grid size, block edge and precision.
pub struct DistanceFieldKernel {
    pipeline: wgpu::ComputePipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    grid_size: u32,
    block_edge: u32,
    precision: FieldPrecision,
}

impl DistanceFieldKernel {
    /// Resolves the kernel source from `library` and builds its pipeline.
    pub fn new(
        ctx: &GpuContext,
        library: &mut ShaderLibrary,
        options: &VolumeOptions,
    ) -> RenderResult<Self> {
        let source = library.compose(KERNEL_PATH, &kernel_constants(options))?;
        let module = create_module(ctx, "sdf kernel", source)?;

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("sdf kernel bind group layout"),
                    entries: &[
                        // Grid uniforms
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: NonZeroU64::new(
                                    std::mem::size_of::<GridUniforms>() as u64,
                                ),
                            },
                            count: None,
                        },
                        // Surface samples
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: true },
                                has_dynamic_offset: false,
                                min_binding_size: NonZeroU64::new(32),
                            },
                            count: None,
                        },
                        // Field staging texels
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::COMPUTE,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Storage { read_only: false },
                                has_dynamic_offset: false,
                                min_binding_size: None,
                            },
                            count: None,
                        },
                    ],
                });

        let pipeline = ctx.scoped(RenderError::PipelineCreationFailed, |device| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("sdf kernel pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
                label: Some("sdf kernel pipeline"),
                layout: Some(&layout),
                module: &module,
                entry_point: Some("main"),
                compilation_options: wgpu::PipelineCompilationOptions::default(),
                cache: None,
            })
        })?;

        Ok(Self {
            pipeline,
            bind_group_layout,
            grid_size: options.grid_size,
            block_edge: options.block_edge,
            precision: options.precision,
        })
    }

    /// Fills `field` for `grid` from `samples` and waits for completion.
    ///
    /// When this returns `Ok`, every voxel has been written and any later
    /// read of `field` observes the finished data.
    pub fn dispatch(
        &self,
        ctx: &GpuContext,
        grid: &GridMapper,
        samples: &SurfaceSampleBuffer,
        field: &VolumeTexture,
    ) -> RenderResult<()> {
        if grid.size() != self.grid_size
            || grid.block_edge() != self.block_edge
            || field.size() != self.grid_size
            || field.precision() != self.precision
        {
            return Err(RenderError::DispatchFailed(format!(
                "kernel built for {}^3 {:?} in {}^3 blocks, got grid {}^3 in {}^3 blocks and {:?} texture {}^3",
                self.grid_size,
                self.precision,
                self.block_edge,
                grid.size(),
                grid.block_edge(),
                field.precision(),
                field.size()
            )));
        }

        let blocks = grid.dispatch_size();
        log::info!(
            "dispatching {}x{}x{} blocks of {}^3 voxels over {} samples",
            blocks.x,
            blocks.y,
            blocks.z,
            self.block_edge,
            samples.count()
        );

        let uniforms = grid.uniforms();
        let staging_bytes = field_staging_bytes(self.grid_size, self.precision);
        let submission = ctx.scoped(RenderError::DispatchFailed, |device| {
            let grid_buffer = create_uniform_buffer(device, &uniforms, Some("sdf grid uniforms"));
            let staging =
                create_staging_storage_buffer(device, staging_bytes, Some("sdf field staging"));
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("sdf kernel bind group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: grid_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: samples.buffer().as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: staging.as_entire_binding(),
                    },
                ],
            });

            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("sdf kernel encoder"),
            });
            {
                let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                    label: Some("sdf kernel pass"),
                    timestamp_writes: None,
                });
                pass.set_pipeline(&self.pipeline);
                pass.set_bind_group(0, &bind_group, &[]);
                pass.dispatch_workgroups(blocks.x, blocks.y, blocks.z);
            }
            field.copy_from_staging(&mut encoder, &staging);
            ctx.queue.submit(std::iter::once(encoder.finish()))
        })?;

        // Host-side barrier: nothing samples the field until the kernel is done.
        ctx.wait(submission)
    }

    /// Voxels per axis this kernel was built for.
    #[must_use]
    pub fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Block edge this kernel was built for.
    #[must_use]
    pub fn block_edge(&self) -> u32 {
        self.block_edge
    }

    /// Field precision this kernel was built for.
    #[must_use]
    pub fn precision(&self) -> FieldPrecision {
        self.precision
    }
}
