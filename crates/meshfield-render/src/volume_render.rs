//! Volume drawing: box geometry, shading parameters and the ray-march pass.

use std::num::NonZeroU64;

use glam::Vec3;
use meshfield_core::{Aabb, GridMapper, ShaderLibrary, VolumeOptions, BOX_INDICES};

use crate::buffer::{create_index_buffer, create_uniform_buffer, create_vertex_buffer};
use crate::camera::{Camera, CameraUniforms};
use crate::context::GpuContext;
use crate::error::{RenderError, RenderResult};
use crate::shader::{create_module, RAYMARCH_PATH};
use crate::stage::{
    ShadingStage, ShadingValue, AABB_MAX, AABB_MIN, FIELD, GRID_SIZE, MAX_STEPS, SURFACE_EPSILON,
};
use crate::volume_texture::VolumeTexture;

/// Indices in one box draw (12 triangles).
pub const BOX_INDEX_COUNT: u32 = BOX_INDICES.len() as u32;

/// Uniforms for the ray-march shader.
/// Layout must match WGSL `VolumeUniforms` exactly.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct VolumeUniforms {
    pub aabb_min: [f32; 3],
    pub grid_size: u32,
    pub aabb_max: [f32; 3],
    pub max_steps: u32,
    /// Surface color (RGBA).
    pub base_color: [f32; 4],
    pub surface_epsilon: f32,
    /// Padding to 16-byte alignment.
    pub _pad0: f32,
    pub _pad1: f32,
    pub _pad2: f32,
}

impl Default for VolumeUniforms {
    fn default() -> Self {
        Self {
            aabb_min: [0.0; 3],
            grid_size: 1,
            aabb_max: [1.0; 3],
            max_steps: 128,
            base_color: [0.047, 0.451, 0.690, 1.0],
            surface_epsilon: 0.002,
            _pad0: 0.0,
            _pad1: 0.0,
            _pad2: 0.0,
        }
    }
}

/// Box geometry and shading parameters for one volume.
pub struct VolumeRenderer {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    aabb: Aabb,
    grid_size: u32,
    max_steps: u32,
    surface_epsilon: f32,
}

impl VolumeRenderer {
    /// Uploads the box of `grid`.
    pub fn new(ctx: &GpuContext, grid: &GridMapper, options: &VolumeOptions) -> RenderResult<Self> {
        let aabb = grid.aabb();
        let corners = aabb.corners().map(|c| c.to_array());
        let (vertex_buffer, index_buffer) =
            ctx.scoped(RenderError::BufferCreationFailed, |device| {
                (
                    create_vertex_buffer(device, &corners, Some("volume box vertices")),
                    create_index_buffer(device, &BOX_INDICES, Some("volume box indices")),
                )
            })?;
        Ok(Self {
            vertex_buffer,
            index_buffer,
            aabb,
            grid_size: grid.size(),
            max_steps: options.max_march_steps,
            surface_epsilon: options.surface_epsilon,
        })
    }

    /// Named parameters this volume binds on a stage.
    #[must_use]
    pub fn parameters(&self) -> [(&'static str, ShadingValue); 5] {
        volume_parameters(
            self.aabb,
            self.grid_size,
            self.max_steps,
            self.surface_epsilon,
        )
    }

    /// Binds the box bounds, grid size, march settings and `field` on `stage`.
    pub fn apply(&self, stage: &mut dyn ShadingStage, field: &VolumeTexture) {
        for (name, value) in self.parameters() {
            stage.set(name, value);
        }
        stage.bind_volume(FIELD, field);
    }

    /// Issues the box draw. The pass must already have a pipeline bound.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..BOX_INDEX_COUNT, 0, 0..1);
    }
}

fn volume_parameters(
    aabb: Aabb,
    grid_size: u32,
    max_steps: u32,
    surface_epsilon: f32,
) -> [(&'static str, ShadingValue); 5] {
    [
        (AABB_MIN, ShadingValue::Vec3(aabb.min())),
        (AABB_MAX, ShadingValue::Vec3(aabb.max())),
        (GRID_SIZE, ShadingValue::Uint(grid_size)),
        (MAX_STEPS, ShadingValue::Uint(max_steps)),
        (SURFACE_EPSILON, ShadingValue::Float(surface_epsilon)),
    ]
}

/// The wgpu ray-march program, driven through [`ShadingStage`].
///
/// Parameter writes only touch a CPU copy and mark it dirty; [`prepare`]
/// uploads it and rebuilds the bind group when a new texture was bound.
///
/// [`prepare`]: VolumeDrawPass::prepare
pub struct VolumeDrawPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    camera_buffer: wgpu::Buffer,
    volume_buffer: wgpu::Buffer,
    uniforms: VolumeUniforms,
    uniforms_dirty: bool,
    field: Option<(wgpu::TextureView, wgpu::Sampler)>,
    bind_group: Option<wgpu::BindGroup>,
}

impl VolumeDrawPass {
    /// Builds the pipeline for the given attachment formats.
    pub fn new(
        ctx: &GpuContext,
        library: &mut ShaderLibrary,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> RenderResult<Self> {
        let source = library.compose(RAYMARCH_PATH, &[])?;
        let shader = create_module(ctx, "volume raymarch shader", source)?;

        let bind_group_layout =
            ctx.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("volume raymarch bind group layout"),
                    entries: &[
                        // Camera uniforms
                        wgpu::BindGroupLayoutEntry {
                            binding: 0,
                            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: NonZeroU64::new(
                                    std::mem::size_of::<CameraUniforms>() as u64,
                                ),
                            },
                            count: None,
                        },
                        // Volume uniforms
                        wgpu::BindGroupLayoutEntry {
                            binding: 1,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Buffer {
                                ty: wgpu::BufferBindingType::Uniform,
                                has_dynamic_offset: false,
                                min_binding_size: NonZeroU64::new(
                                    std::mem::size_of::<VolumeUniforms>() as u64,
                                ),
                            },
                            count: None,
                        },
                        // Field texture
                        wgpu::BindGroupLayoutEntry {
                            binding: 2,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Texture {
                                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                                view_dimension: wgpu::TextureViewDimension::D3,
                                multisampled: false,
                            },
                            count: None,
                        },
                        // Field sampler
                        wgpu::BindGroupLayoutEntry {
                            binding: 3,
                            visibility: wgpu::ShaderStages::FRAGMENT,
                            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                            count: None,
                        },
                    ],
                });

        let pipeline = ctx.scoped(RenderError::PipelineCreationFailed, |device| {
            let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("volume raymarch pipeline layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("volume raymarch pipeline"),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: 12,
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    // Box indices wind inward: only the far faces survive.
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: depth_format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        })?;

        let uniforms = VolumeUniforms::default();
        let (camera_buffer, volume_buffer) =
            ctx.scoped(RenderError::BufferCreationFailed, |device| {
                (
                    create_uniform_buffer(
                        device,
                        &CameraUniforms::default(),
                        Some("volume camera uniforms"),
                    ),
                    create_uniform_buffer(device, &uniforms, Some("volume uniforms")),
                )
            })?;
        Ok(Self {
            pipeline,
            bind_group_layout,
            camera_buffer,
            volume_buffer,
            uniforms,
            uniforms_dirty: false,
            field: None,
            bind_group: None,
        })
    }

    /// Current parameter values.
    #[must_use]
    pub fn uniforms(&self) -> &VolumeUniforms {
        &self.uniforms
    }

    /// Uploads the camera.
    pub fn set_camera(&self, queue: &wgpu::Queue, camera: &Camera) {
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&camera.uniforms()));
    }

    /// Resyncs dirty parameters and the bind group before drawing.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) -> RenderResult<()> {
        if self.uniforms_dirty {
            queue.write_buffer(&self.volume_buffer, 0, bytemuck::bytes_of(&self.uniforms));
            self.uniforms_dirty = false;
        }

        if self.bind_group.is_none() {
            let (view, sampler) = self.field.as_ref().ok_or(RenderError::UnboundTexture(FIELD))?;
            self.bind_group = Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("volume raymarch bind group"),
                layout: &self.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: self.camera_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: self.volume_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 2,
                        resource: wgpu::BindingResource::TextureView(view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 3,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    },
                ],
            }));
        }

        Ok(())
    }

    /// Sets the pipeline and bind group on `pass`. Call [`prepare`] first.
    ///
    /// [`prepare`]: VolumeDrawPass::prepare
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) -> RenderResult<()> {
        let bind_group = self
            .bind_group
            .as_ref()
            .ok_or(RenderError::UnboundTexture(FIELD))?;
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        Ok(())
    }
}

impl ShadingStage for VolumeDrawPass {
    fn set_float(&mut self, name: &str, value: f32) {
        self.uniforms_dirty |= apply_float(&mut self.uniforms, name, value);
    }

    fn set_uint(&mut self, name: &str, value: u32) {
        self.uniforms_dirty |= apply_uint(&mut self.uniforms, name, value);
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.uniforms_dirty |= apply_vec3(&mut self.uniforms, name, value);
    }

    fn bind_volume(&mut self, name: &str, volume: &VolumeTexture) {
        if name != FIELD {
            log::warn!("volume pass has no texture slot named '{name}'");
            return;
        }
        self.field = Some((volume.view().clone(), volume.sampler().clone()));
        self.bind_group = None;
    }
}

// The setters report whether `name` was recognised.

fn apply_float(uniforms: &mut VolumeUniforms, name: &str, value: f32) -> bool {
    match name {
        SURFACE_EPSILON => uniforms.surface_epsilon = value,
        _ => {
            log::warn!("volume pass has no float parameter named '{name}'");
            return false;
        }
    }
    true
}

fn apply_uint(uniforms: &mut VolumeUniforms, name: &str, value: u32) -> bool {
    match name {
        GRID_SIZE => uniforms.grid_size = value,
        MAX_STEPS => uniforms.max_steps = value,
        _ => {
            log::warn!("volume pass has no uint parameter named '{name}'");
            return false;
        }
    }
    true
}

fn apply_vec3(uniforms: &mut VolumeUniforms, name: &str, value: Vec3) -> bool {
    match name {
        AABB_MIN => uniforms.aabb_min = value.to_array(),
        AABB_MAX => uniforms.aabb_max = value.to_array(),
        _ => {
            log::warn!("volume pass has no vec3 parameter named '{name}'");
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_uniforms_size() {
        let size = std::mem::size_of::<VolumeUniforms>();
        assert_eq!(size, 64, "VolumeUniforms should be 64 bytes, got {size}");
        assert_eq!(size % 16, 0, "VolumeUniforms must be 16-byte aligned");
    }

    #[test]
    fn test_box_draw_is_twelve_triangles() {
        assert_eq!(BOX_INDEX_COUNT, 36);
    }

    #[test]
    fn test_parameters_bind_bounds_and_grid() {
        let aabb = Aabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(1.0, 3.0, 4.0));
        let params = volume_parameters(aabb, 64, 200, 0.01);
        assert_eq!(
            params,
            [
                ("AABBMin", ShadingValue::Vec3(Vec3::new(-1.0, 0.0, 2.0))),
                ("AABBMax", ShadingValue::Vec3(Vec3::new(1.0, 3.0, 4.0))),
                ("GridSize", ShadingValue::Uint(64)),
                ("MaxSteps", ShadingValue::Uint(200)),
                ("SurfaceEpsilon", ShadingValue::Float(0.01)),
            ]
        );
    }

    #[test]
    fn test_parameters_fill_uniforms() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));
        let mut uniforms = VolumeUniforms::default();
        for (name, value) in volume_parameters(aabb, 32, 64, 0.005) {
            let known = match value {
                ShadingValue::Float(v) => apply_float(&mut uniforms, name, v),
                ShadingValue::Uint(v) => apply_uint(&mut uniforms, name, v),
                ShadingValue::Vec3(v) => apply_vec3(&mut uniforms, name, v),
            };
            assert!(known, "parameter {name} not recognised");
        }
        assert_eq!(uniforms.aabb_min, [0.0; 3]);
        assert_eq!(uniforms.aabb_max, [2.0; 3]);
        assert_eq!(uniforms.grid_size, 32);
        assert_eq!(uniforms.max_steps, 64);
        assert_eq!(uniforms.surface_epsilon, 0.005);
    }

    #[test]
    fn test_unknown_parameters_are_ignored() {
        let mut uniforms = VolumeUniforms::default();
        let before = uniforms;
        assert!(!apply_float(&mut uniforms, "Opacity", 0.5));
        assert!(!apply_uint(&mut uniforms, "AABBMin", 3));
        assert!(!apply_vec3(&mut uniforms, "GridSize", Vec3::ONE));
        assert_eq!(uniforms, before);
    }
}
