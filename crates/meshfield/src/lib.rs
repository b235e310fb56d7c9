//! meshfield: bake triangle meshes into GPU signed distance field volumes.
//!
//! A [`Volume`] takes a [`Model`], computes its bounding box, uploads one
//! surface sample per triangle vertex, and runs a compute kernel that writes
//! the distance from every voxel centre to the surface into an `N^3` texture.
//! The finished field can be read back, compared against a CPU reference, or
//! ray-marched into an image.
//!
//! # Quick Start
//!
//! ```no_run
//! use meshfield::*;
//!
//! fn main() -> Result<()> {
//!     init_logging();
//!     let ctx = create_context()?;
//!
//!     let options = VolumeOptions::default().with_grid_size(64);
//!     let volume = Volume::new(&ctx, Model::unit_cube(), options)?;
//!
//!     let field = volume.read_back_field(&ctx)?;
//!     println!("closest voxel to the surface: {:?}", field.argmin());
//!
//!     render_to_file(&ctx, &volume, "cube.png", 512, 512)?;
//!     Ok(())
//! }
//! ```

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]

mod headless;
mod volume;

pub use headless::{render_to_file, render_to_image};
pub use volume::Volume;

// Re-export core types
pub use meshfield_core::{
    compute_reference_field, Aabb, DistanceMode, FieldData, FieldPrecision, GridMapper,
    MeshfieldError, Model, Result, ShaderLibrary, SignMode, SubMesh, UVec3, Vec3, Vec4, Vertex,
    VolumeOptions,
};

// Re-export render types
pub use meshfield_render::{
    builtin_library, Camera, GpuContext, RenderTarget, ShadingStage, ShadingValue,
    VolumeDrawPass, VolumeTexture,
};

use pollster::FutureExt;

/// Initializes `env_logger` once; later calls are no-ops.
pub fn init_logging() {
    let _ = env_logger::try_init();
}

/// Creates a headless GPU context.
pub fn create_context() -> Result<GpuContext> {
    let ctx = GpuContext::new_headless().block_on()?;
    log::info!("meshfield GPU context ready");
    Ok(ctx)
}
