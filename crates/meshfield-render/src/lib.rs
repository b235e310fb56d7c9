//! wgpu backend for meshfield.
//!
//! This crate owns every GPU resource of a volume:
//! - Headless device setup and capability checks ([`GpuContext`])
//! - Surface sample upload and the distance field compute kernel
//! - The 3D field texture, its sampler, and readback
//! - Ray-march drawing through the [`ShadingStage`] parameter interface
//! - Offscreen render targets and image saving

// Documentation lints - internal functions don't need exhaustive panic/error docs
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
// Builder patterns return Self which doesn't need must_use
#![allow(clippy::must_use_candidate)]
// Texture sizes and sample counts move between u32, usize and f32
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]

pub mod buffer;
pub mod camera;
pub mod context;
pub mod error;
pub mod kernel;
pub mod sample_buffer;
pub mod shader;
pub mod stage;
pub mod target;
pub mod volume_render;
pub mod volume_texture;

pub use camera::{Camera, CameraUniforms};
pub use context::{check_limits, max_storable_distance, GpuContext};
pub use error::{RenderError, RenderResult};
pub use kernel::{kernel_constants, DistanceFieldKernel};
pub use sample_buffer::SurfaceSampleBuffer;
pub use shader::{builtin_library, KERNEL_PATH, RAYMARCH_PATH};
pub use stage::{ShadingStage, ShadingValue};
pub use target::{save_image, RenderTarget, COLOR_FORMAT, DEPTH_FORMAT};
pub use volume_render::{VolumeDrawPass, VolumeRenderer, VolumeUniforms, BOX_INDEX_COUNT};
pub use volume_texture::{field_row_bytes, field_staging_bytes, texture_format, VolumeTexture};
