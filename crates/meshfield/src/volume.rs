//! The volume: one mesh, one grid, one GPU-computed field.

use meshfield_core::{
    build_surface_samples, compute_reference_field, Aabb, FieldData, GridMapper, Model, Result,
    ShaderLibrary, VolumeOptions,
};
use meshfield_render::{
    builtin_library, DistanceFieldKernel, GpuContext, ShadingStage, SurfaceSampleBuffer,
    VolumeRenderer, VolumeTexture,
};

/// A baked distance field and everything needed to draw it.
///
/// Construction runs the whole pipeline (bounds, samples, kernel, barrier);
/// a `Volume` that exists always holds a fully computed field. The field is
/// never recomputed: build a new `Volume` for a changed mesh or grid.
pub struct Volume {
    model: Model,
    options: VolumeOptions,
    grid: GridMapper,
    samples: SurfaceSampleBuffer,
    field: VolumeTexture,
    renderer: VolumeRenderer,
}

impl Volume {
    /// Bakes `model` with the built-in kernel sources.
    pub fn new(ctx: &GpuContext, model: Model, options: VolumeOptions) -> Result<Self> {
        let mut library = builtin_library();
        Self::with_library(ctx, model, options, &mut library)
    }

    /// Bakes `model`, resolving the kernel source through `library`.
    pub fn with_library(
        ctx: &GpuContext,
        model: Model,
        options: VolumeOptions,
        library: &mut ShaderLibrary,
    ) -> Result<Self> {
        options.validate()?;
        model.validate()?;

        let aabb = Aabb::from_model(&model)?;
        let grid = GridMapper::new(aabb, options.grid_size, options.block_edge)?;
        log::info!(
            "volume bounds {:?} .. {:?}, grid {}^3 ({} voxels)",
            aabb.min(),
            aabb.max(),
            grid.size(),
            grid.num_voxels()
        );

        let samples = build_surface_samples(&model)?;
        ctx.check_volume(&options, &aabb, SurfaceSampleBuffer::byte_size(samples.len()))?;

        let kernel = DistanceFieldKernel::new(ctx, library, &options)?;
        let samples = SurfaceSampleBuffer::new(ctx, &samples)?;
        let field = VolumeTexture::new(ctx, grid.size(), options.precision)?;
        kernel.dispatch(ctx, &grid, &samples, &field)?;

        let renderer = VolumeRenderer::new(ctx, &grid, &options)?;

        Ok(Self {
            model,
            options,
            grid,
            samples,
            field,
            renderer,
        })
    }

    /// The source mesh.
    #[must_use]
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Options the field was built with.
    #[must_use]
    pub fn options(&self) -> &VolumeOptions {
        &self.options
    }

    /// Bounding box of the mesh.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.grid.aabb()
    }

    /// Voxel lattice over the bounding box.
    #[must_use]
    pub fn grid(&self) -> &GridMapper {
        &self.grid
    }

    /// Number of surface samples the kernel scanned.
    #[must_use]
    pub fn sample_count(&self) -> u32 {
        self.samples.count()
    }

    /// The field texture.
    #[must_use]
    pub fn field_texture(&self) -> &VolumeTexture {
        &self.field
    }

    /// The box renderer.
    #[must_use]
    pub fn renderer(&self) -> &VolumeRenderer {
        &self.renderer
    }

    /// Copies the GPU field back to the CPU.
    pub fn read_back_field(&self, ctx: &GpuContext) -> Result<FieldData> {
        Ok(self.field.read_back(ctx, &self.grid)?)
    }

    /// Evaluates the same field on the CPU, for verification.
    pub fn reference_field(&self) -> Result<FieldData> {
        let samples = build_surface_samples(&self.model)?;
        compute_reference_field(
            &self.grid,
            &samples,
            self.options.sign_mode,
            self.options.distance_mode,
        )
    }

    /// Binds bounds, grid size, march settings and the field on `stage`.
    pub fn apply(&self, stage: &mut dyn ShadingStage) {
        self.renderer.apply(stage, &self.field);
    }

    /// Draws the bounding box on a pass with a ray-march pipeline bound.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>) {
        self.renderer.draw(pass);
    }
}
