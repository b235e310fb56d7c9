//! Voxel lattice over a bounding box.
//!
//! A [`GridMapper`] is derived from an [`Aabb`] and a cubic resolution `N`.
//! Voxels are cell-centred: voxel `v` covers `[min + v * h, min + (v + 1) * h)`
//! with `h = extent / N`, and its center coincides with the texel center
//! `(v + 0.5) / N` of an `N^3` texture stretched over the box. The compute
//! kernel and the renderer both consume [`GridUniforms`] built here, so they
//! agree on the mapping by construction.

use glam::{UVec3, Vec3};

use crate::bounds::Aabb;
use crate::error::{MeshfieldError, Result};

/// GPU mirror of the grid mapping.
/// Layout must match WGSL `GridUniforms` exactly (64 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
#[allow(clippy::pub_underscore_fields)]
pub struct GridUniforms {
    /// Box minimum corner (w unused).
    pub aabb_min: [f32; 4],
    /// Box maximum corner (w unused).
    pub aabb_max: [f32; 4],
    /// World-space voxel edge lengths (w unused).
    pub voxel_size: [f32; 4],
    /// Voxels per axis.
    pub grid_size: u32,
    /// Invocations per block edge.
    pub block_edge: u32,
    /// Padding to 16-byte alignment.
    pub _pad0: u32,
    pub _pad1: u32,
}

/// Maps between voxel indices and world space for a fixed-resolution cube lattice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridMapper {
    aabb: Aabb,
    size: u32,
    block_edge: u32,
}

impl GridMapper {
    /// Creates a mapper for `size^3` voxels over `aabb`, partitioned into
    /// blocks of `block_edge^3` voxels.
    ///
    /// `size` must be a positive multiple of `block_edge`.
    pub fn new(aabb: Aabb, size: u32, block_edge: u32) -> Result<Self> {
        if size == 0 {
            return Err(MeshfieldError::InvalidGridSize(size));
        }
        if block_edge == 0 || size % block_edge != 0 {
            return Err(MeshfieldError::InvalidBlockEdge {
                grid_size: size,
                block_edge,
            });
        }
        if aabb.is_flat() {
            log::warn!(
                "bounding box {:?}..{:?} is flat; voxels collapse onto its plane",
                aabb.min(),
                aabb.max()
            );
        }
        Ok(Self {
            aabb,
            size,
            block_edge,
        })
    }

    /// The box the lattice spans.
    #[must_use]
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Voxels per axis.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Voxels per block edge.
    #[must_use]
    pub fn block_edge(&self) -> u32 {
        self.block_edge
    }

    /// Total voxel count.
    #[must_use]
    pub fn num_voxels(&self) -> usize {
        let n = self.size as usize;
        n * n * n
    }

    /// World-space voxel edge lengths.
    #[must_use]
    pub fn voxel_size(&self) -> Vec3 {
        self.aabb.extent() / self.size as f32
    }

    /// Number of blocks to dispatch along each axis.
    #[must_use]
    pub fn dispatch_size(&self) -> UVec3 {
        UVec3::splat(self.size / self.block_edge)
    }

    /// World-space center of voxel `v`.
    #[must_use]
    pub fn voxel_center(&self, v: UVec3) -> Vec3 {
        self.aabb.min() + (v.as_vec3() + 0.5) * self.voxel_size()
    }

    /// Normalized texture coordinate of `p` within the box.
    ///
    /// Zero-extent axes map to 0.
    #[must_use]
    pub fn world_to_uvw(&self, p: Vec3) -> Vec3 {
        let extent = self.aabb.extent();
        let inv = Vec3::select(extent.cmpgt(Vec3::ZERO), extent.recip(), Vec3::ZERO);
        (p - self.aabb.min()) * inv
    }

    /// Voxel containing `p`, clamped to the lattice.
    #[must_use]
    pub fn world_to_voxel(&self, p: Vec3) -> UVec3 {
        let n = self.size as f32;
        let v = (self.world_to_uvw(p) * n).floor();
        v.clamp(Vec3::ZERO, Vec3::splat(n - 1.0)).as_uvec3()
    }

    /// Linear index of voxel `v` (x fastest, then y, then z).
    #[must_use]
    pub fn flatten(&self, v: UVec3) -> usize {
        let n = self.size as usize;
        v.x as usize + n * (v.y as usize + n * v.z as usize)
    }

    /// Inverse of [`GridMapper::flatten`].
    #[must_use]
    pub fn unflatten(&self, index: usize) -> UVec3 {
        let n = self.size as usize;
        UVec3::new(
            (index % n) as u32,
            ((index / n) % n) as u32,
            (index / (n * n)) as u32,
        )
    }

    /// Packs the mapping for upload.
    #[must_use]
    pub fn uniforms(&self) -> GridUniforms {
        let min = self.aabb.min();
        let max = self.aabb.max();
        let h = self.voxel_size();
        GridUniforms {
            aabb_min: [min.x, min.y, min.z, 0.0],
            aabb_max: [max.x, max.y, max.z, 0.0],
            voxel_size: [h.x, h.y, h.z, 0.0],
            grid_size: self.size,
            block_edge: self.block_edge,
            _pad0: 0,
            _pad1: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn unit_grid(size: u32) -> GridMapper {
        GridMapper::new(Aabb::new(Vec3::ZERO, Vec3::ONE), size, 4).unwrap()
    }

    #[test]
    fn test_grid_uniforms_size() {
        let size = std::mem::size_of::<GridUniforms>();
        assert_eq!(size % 16, 0, "GridUniforms size ({size} bytes) must be 16-byte aligned");
        // aabb_min(16) + aabb_max(16) + voxel_size(16) + grid_size(4) + block_edge(4) + pad(8) = 64
        assert_eq!(size, 64, "GridUniforms should be 64 bytes, got {size}");
    }

    #[test]
    fn test_invalid_sizes_rejected() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::ONE);
        assert!(matches!(
            GridMapper::new(aabb, 0, 4),
            Err(MeshfieldError::InvalidGridSize(0))
        ));
        assert!(matches!(
            GridMapper::new(aabb, 30, 4),
            Err(MeshfieldError::InvalidBlockEdge {
                grid_size: 30,
                block_edge: 4
            })
        ));
        assert!(matches!(
            GridMapper::new(aabb, 32, 0),
            Err(MeshfieldError::InvalidBlockEdge { .. })
        ));
    }

    #[test]
    fn test_voxel_centers() {
        let grid = unit_grid(4);
        assert_eq!(grid.voxel_center(UVec3::ZERO), Vec3::splat(0.125));
        assert_eq!(grid.voxel_center(UVec3::splat(3)), Vec3::splat(0.875));
        assert_eq!(grid.voxel_size(), Vec3::splat(0.25));
    }

    #[test]
    fn test_world_to_voxel_clamps() {
        let grid = unit_grid(8);
        assert_eq!(grid.world_to_voxel(Vec3::splat(-3.0)), UVec3::ZERO);
        assert_eq!(grid.world_to_voxel(Vec3::splat(5.0)), UVec3::splat(7));
        assert_eq!(grid.world_to_voxel(Vec3::ONE), UVec3::splat(7));
    }

    #[test]
    fn test_flat_axis_collapses() {
        let aabb = Aabb::new(Vec3::ZERO, Vec3::new(1.0, 1.0, 0.0));
        let grid = GridMapper::new(aabb, 8, 4).unwrap();
        let c = grid.voxel_center(UVec3::new(1, 2, 5));
        assert_eq!(c.z, 0.0);
        assert_eq!(grid.world_to_voxel(c), UVec3::new(1, 2, 0));
    }

    #[test]
    fn test_flatten_roundtrip() {
        let grid = unit_grid(8);
        for i in [0, 1, 7, 8, 63, 64, 511] {
            assert_eq!(grid.flatten(grid.unflatten(i)), i);
        }
        assert_eq!(grid.flatten(UVec3::new(1, 0, 0)), 1);
        assert_eq!(grid.flatten(UVec3::new(0, 1, 0)), 8);
        assert_eq!(grid.flatten(UVec3::new(0, 0, 1)), 64);
    }

    #[test]
    fn test_default_dispatch() {
        let grid = GridMapper::new(Aabb::new(Vec3::ZERO, Vec3::ONE), 128, 4).unwrap();
        assert_eq!(grid.dispatch_size(), UVec3::splat(32));
        assert_eq!(grid.num_voxels(), 128 * 128 * 128);
    }

    fn aabb() -> impl Strategy<Value = Aabb> {
        (
            -100.0f32..100.0,
            -100.0f32..100.0,
            -100.0f32..100.0,
            0.1f32..50.0,
            0.1f32..50.0,
            0.1f32..50.0,
        )
            .prop_map(|(x, y, z, dx, dy, dz)| {
                let min = Vec3::new(x, y, z);
                Aabb::new(min, min + Vec3::new(dx, dy, dz))
            })
    }

    proptest! {
        #[test]
        fn prop_voxel_roundtrip(
            aabb in aabb(),
            exp in 1u32..6,
            x in 0u32..256, y in 0u32..256, z in 0u32..256,
        ) {
            let size = 4 << exp;
            let grid = GridMapper::new(aabb, size, 4).unwrap();
            let v = UVec3::new(x % size, y % size, z % size);
            prop_assert_eq!(grid.world_to_voxel(grid.voxel_center(v)), v);
        }

        #[test]
        fn prop_dispatch_covers_grid(blocks in 1u32..64, block_edge in 1u32..9) {
            let grid = GridMapper::new(
                Aabb::new(Vec3::ZERO, Vec3::ONE),
                blocks * block_edge,
                block_edge,
            ).unwrap();
            prop_assert_eq!(grid.dispatch_size() * block_edge, UVec3::splat(grid.size()));
        }
    }
}
