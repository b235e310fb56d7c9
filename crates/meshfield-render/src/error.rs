//! Rendering error types.

use meshfield_core::{FieldPrecision, MeshfieldError};
use thiserror::Error;

/// Errors that can occur on the device side.
#[derive(Error, Debug)]
pub enum RenderError {
    /// Failed to create wgpu adapter.
    #[error("failed to create graphics adapter")]
    AdapterCreationFailed,

    /// Failed to create wgpu device.
    #[error("failed to create graphics device: {0}")]
    DeviceCreationFailed(#[from] wgpu::RequestDeviceError),

    /// Shader compilation failed.
    #[error("shader compilation failed: {0}")]
    ShaderCompilationFailed(String),

    /// Pipeline creation failed.
    #[error("pipeline creation failed: {0}")]
    PipelineCreationFailed(String),

    /// Buffer creation failed.
    #[error("buffer creation failed: {0}")]
    BufferCreationFailed(String),

    /// Texture creation failed.
    #[error("texture creation failed: {0}")]
    TextureCreationFailed(String),

    /// The device rejected the kernel dispatch.
    #[error("dispatch failed: {0}")]
    DispatchFailed(String),

    /// A request exceeds a device limit.
    #[error("{what} of {requested} exceeds device limit {limit}")]
    LimitExceeded {
        what: &'static str,
        requested: u64,
        limit: u64,
    },

    /// Field distances could exceed what the texture precision can store.
    #[error("distances up to {distance} exceed the {limit} range of {precision:?} precision")]
    RangeExceeded {
        distance: f32,
        limit: f32,
        precision: FieldPrecision,
    },

    /// A required device feature is unavailable.
    #[error("device feature {0} is not available")]
    MissingFeature(&'static str),

    /// A draw was issued before its field texture was bound.
    #[error("no field texture bound to '{0}'")]
    UnboundTexture(&'static str),

    /// GPU buffer mapping failed.
    #[error("GPU buffer mapping failed")]
    BufferMapFailed,

    /// Out of memory.
    #[error("out of memory")]
    OutOfMemory,

    /// Timeout waiting for GPU.
    #[error("timeout waiting for GPU")]
    Timeout,

    /// Image encoding error.
    #[error("image encoding error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Unsupported image format.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// Pixel data does not match the image dimensions.
    #[error("invalid image data")]
    InvalidImageData,

    /// Input or kernel source error from the core crate.
    #[error(transparent)]
    Core(#[from] MeshfieldError),
}

/// A specialized Result type for rendering operations.
pub type RenderResult<T> = std::result::Result<T, RenderError>;

impl From<RenderError> for MeshfieldError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::Core(inner) => inner,
            other => MeshfieldError::Render(other.to_string()),
        }
    }
}
