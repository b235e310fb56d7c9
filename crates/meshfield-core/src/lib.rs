//! Core types for meshfield.
//!
//! This crate holds everything that does not touch the GPU:
//! - [`Model`] input meshes and validation
//! - [`Aabb`] bounds and the [`GridMapper`] voxel/world mapping
//! - [`SurfaceSample`] expansion feeding the distance kernel
//! - [`FieldData`] and the CPU reference evaluator
//! - [`VolumeOptions`] configuration and the [`ShaderLibrary`] source resolver

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Voxel counts and grid indices move between u32, usize and f32
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod bounds;
pub mod error;
pub mod field;
pub mod grid;
pub mod mesh;
pub mod options;
pub mod samples;
pub mod shader_library;

pub use bounds::{Aabb, BOX_INDICES};
pub use error::{MeshfieldError, Result};
pub use field::{closest_point_on_triangle, compute_reference_field, evaluate_point, FieldData};
pub use grid::{GridMapper, GridUniforms};
pub use mesh::{Model, SubMesh, Vertex};
pub use options::{DistanceMode, FieldPrecision, SignMode, VolumeOptions};
pub use samples::{build_surface_samples, SurfaceSample};
pub use shader_library::{ShaderConst, ShaderLibrary};

// Re-export glam types for convenience
pub use glam::{UVec3, Vec3, Vec4};
