//! Configuration options for building a volume.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{MeshfieldError, Result};

/// How the kernel assigns a sign to each distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SignMode {
    /// Plain distance to the nearest surface point.
    Unsigned,
    /// Negative when the voxel lies behind the surface normal at the nearest point.
    ///
    /// Unreliable near thin features and on open surfaces.
    #[default]
    NormalHeuristic,
}

impl SignMode {
    /// Value of the `SIGNED` kernel constant.
    #[must_use]
    pub fn shader_flag(self) -> u32 {
        match self {
            SignMode::Unsigned => 0,
            SignMode::NormalHeuristic => 1,
        }
    }
}

/// What the kernel measures distance to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum DistanceMode {
    /// Nearest triangle-vertex sample. Accuracy depends on tessellation density.
    NearestSample,
    /// Nearest point on any triangle, reading consecutive sample triples as triangles.
    #[default]
    NearestTriangle,
}

impl DistanceMode {
    /// Value of the `DISTANCE_MODE` kernel constant.
    #[must_use]
    pub fn shader_flag(self) -> u32 {
        match self {
            DistanceMode::NearestSample => 0,
            DistanceMode::NearestTriangle => 1,
        }
    }
}

/// Storage precision of the field texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FieldPrecision {
    /// 16-bit floats; filterable on every adapter.
    #[default]
    Half,
    /// 32-bit floats; linear filtering needs `FLOAT32_FILTERABLE`.
    Full,
}

impl FieldPrecision {
    /// Bytes per field voxel (4 channels).
    #[must_use]
    pub fn bytes_per_voxel(self) -> u32 {
        match self {
            FieldPrecision::Half => 8,
            FieldPrecision::Full => 16,
        }
    }
}

/// Options controlling field construction and ray-marching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeOptions {
    /// Voxels per axis.
    pub grid_size: u32,

    /// Kernel block edge; `grid_size` must be a multiple of it.
    pub block_edge: u32,

    /// Sign assignment.
    pub sign_mode: SignMode,

    /// Distance target.
    pub distance_mode: DistanceMode,

    /// Texture precision.
    pub precision: FieldPrecision,

    /// Maximum sphere-tracing steps per pixel.
    pub max_march_steps: u32,

    /// Hit threshold as a fraction of the box diagonal.
    pub surface_epsilon: f32,
}

impl Default for VolumeOptions {
    fn default() -> Self {
        Self {
            grid_size: 128,
            block_edge: 4,
            sign_mode: SignMode::NormalHeuristic,
            distance_mode: DistanceMode::NearestTriangle,
            precision: FieldPrecision::Half,
            max_march_steps: 128,
            surface_epsilon: 0.002,
        }
    }
}

impl VolumeOptions {
    /// Sets the grid resolution.
    #[must_use]
    pub fn with_grid_size(mut self, grid_size: u32) -> Self {
        self.grid_size = grid_size;
        self
    }

    /// Sets the kernel block edge.
    #[must_use]
    pub fn with_block_edge(mut self, block_edge: u32) -> Self {
        self.block_edge = block_edge;
        self
    }

    /// Sets the sign mode.
    #[must_use]
    pub fn with_sign_mode(mut self, sign_mode: SignMode) -> Self {
        self.sign_mode = sign_mode;
        self
    }

    /// Sets the distance mode.
    #[must_use]
    pub fn with_distance_mode(mut self, distance_mode: DistanceMode) -> Self {
        self.distance_mode = distance_mode;
        self
    }

    /// Sets the texture precision.
    #[must_use]
    pub fn with_precision(mut self, precision: FieldPrecision) -> Self {
        self.precision = precision;
        self
    }

    /// Checks the grid constraints that do not depend on a device.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(MeshfieldError::InvalidGridSize(self.grid_size));
        }
        if self.block_edge == 0 || self.grid_size % self.block_edge != 0 {
            return Err(MeshfieldError::InvalidBlockEdge {
                grid_size: self.grid_size,
                block_edge: self.block_edge,
            });
        }
        Ok(())
    }

    /// Parses options from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let options: Self = serde_json::from_str(json)?;
        options.validate()?;
        Ok(options)
    }

    /// Reads options from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Serializes the options to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
