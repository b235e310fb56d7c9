//! Surface samples: the point cloud the distance kernel queries.

use glam::Vec3;

use crate::error::Result;
use crate::mesh::Model;

/// One triangle-vertex occurrence.
/// Layout must match WGSL `SurfaceSample` exactly (32 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SurfaceSample {
    /// World-space position (w = 1).
    pub position: [f32; 4],
    /// World-space normal (w = 0).
    pub normal: [f32; 4],
}

impl SurfaceSample {
    /// Creates a sample from a position and normal.
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: [position.x, position.y, position.z, 1.0],
            normal: [normal.x, normal.y, normal.z, 0.0],
        }
    }

    /// Sample position.
    #[must_use]
    pub fn position(&self) -> Vec3 {
        Vec3::new(self.position[0], self.position[1], self.position[2])
    }

    /// Sample normal.
    #[must_use]
    pub fn normal(&self) -> Vec3 {
        Vec3::new(self.normal[0], self.normal[1], self.normal[2])
    }
}

/// Expands every triangle of every sub-mesh into three samples.
///
/// Shared vertices are duplicated once per referencing triangle. The model is
/// validated first, so an empty or malformed mesh never yields an empty set.
pub fn build_surface_samples(model: &Model) -> Result<Vec<SurfaceSample>> {
    model.validate()?;

    let mut samples = Vec::with_capacity(model.num_triangles() * 3);
    for mesh in &model.meshes {
        samples.extend(mesh.indices.iter().map(|&i| {
            let v = mesh.vertices[i as usize];
            SurfaceSample::new(v.position, v.normal)
        }));
    }

    log::debug!(
        "expanded {} triangles into {} surface samples ({} bytes)",
        model.num_triangles(),
        samples.len(),
        std::mem::size_of_val(samples.as_slice())
    );
    Ok(samples)
}
