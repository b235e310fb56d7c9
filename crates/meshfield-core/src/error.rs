//! Error types for meshfield.

use thiserror::Error;

/// The main error type for meshfield operations.
///
/// Every variant is fatal for the volume being built: a field is either
/// fully computed or the volume does not exist.
#[derive(Error, Debug)]
pub enum MeshfieldError {
    /// The model has no vertices, so no bounding box can be derived.
    #[error("mesh has no vertices")]
    EmptyMesh,

    /// The model has vertices but no triangles to sample.
    #[error("mesh has no triangles")]
    NoTriangles,

    /// A triangle index points past the end of its sub-mesh vertex list.
    #[error("index {index} out of range in sub-mesh {sub_mesh} ({vertex_count} vertices)")]
    IndexOutOfRange {
        sub_mesh: usize,
        index: u32,
        vertex_count: usize,
    },

    /// A vertex position with a NaN or infinite coordinate.
    #[error("vertex {vertex} of sub-mesh {sub_mesh} has a non-finite position")]
    NonFinitePosition { sub_mesh: usize, vertex: usize },

    /// An index list whose length is not a multiple of three.
    #[error("sub-mesh {sub_mesh} has {len} indices, not a multiple of 3")]
    TruncatedIndexList { sub_mesh: usize, len: usize },

    /// Grid resolution is zero.
    #[error("grid size must be positive, got {0}")]
    InvalidGridSize(u32),

    /// Grid resolution is not an exact multiple of the block edge.
    #[error("grid size {grid_size} is not a multiple of block edge {block_edge}")]
    InvalidBlockEdge { grid_size: u32, block_edge: u32 },

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// A kernel source or include could not be found.
    #[error("shader resource '{0}' not found")]
    ShaderNotFound(String),

    /// A kernel source includes itself, directly or indirectly.
    #[error("shader include cycle through '{0}'")]
    ShaderIncludeCycle(String),

    /// Device-side failure (adapter, pipeline, dispatch, allocation).
    #[error("render error: {0}")]
    Render(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// A specialized Result type for meshfield operations.
pub type Result<T> = std::result::Result<T, MeshfieldError>;
