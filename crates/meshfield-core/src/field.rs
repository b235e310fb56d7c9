//! Field voxel storage and host-side evaluation of the distance kernel.
//!
//! [`FieldData`] is a dense `N^3` arena of 4-channel voxels laid out exactly
//! like the volume texture (x fastest, then y, then z). Channel 0 holds the
//! distance; channels 1..4 hold the unit gradient.
//!
//! [`compute_reference_field`] runs the same per-voxel algorithm as
//! `shaders/sdf_kernel.wgsl` on the CPU. Volumes are always built on the
//! device; this path exists to verify device output.

#![allow(clippy::many_single_char_names, clippy::similar_names)]

use glam::{UVec3, Vec3};
use rayon::prelude::*;

use crate::error::{MeshfieldError, Result};
use crate::grid::GridMapper;
use crate::options::{DistanceMode, SignMode};
use crate::samples::SurfaceSample;

const DEGENERATE_AREA_SQ: f32 = 1.0e-20;

/// A computed distance field.
#[derive(Debug, Clone)]
pub struct FieldData {
    grid: GridMapper,
    voxels: Vec<[f32; 4]>,
}

impl FieldData {
    /// Wraps voxel data for `grid`.
    pub fn new(grid: GridMapper, voxels: Vec<[f32; 4]>) -> Result<Self> {
        if voxels.len() != grid.num_voxels() {
            return Err(MeshfieldError::SizeMismatch {
                expected: grid.num_voxels(),
                actual: voxels.len(),
            });
        }
        Ok(Self { grid, voxels })
    }

    /// The lattice this field is sampled on.
    #[must_use]
    pub fn grid(&self) -> &GridMapper {
        &self.grid
    }

    /// Raw voxels in texture order.
    #[must_use]
    pub fn voxels(&self) -> &[[f32; 4]] {
        &self.voxels
    }

    /// All four channels of voxel `v`.
    #[must_use]
    pub fn get(&self, v: UVec3) -> [f32; 4] {
        self.voxels[self.grid.flatten(v)]
    }

    /// Distance stored at voxel `v`.
    #[must_use]
    pub fn distance(&self, v: UVec3) -> f32 {
        self.get(v)[0]
    }

    /// Gradient stored at voxel `v`.
    #[must_use]
    pub fn gradient(&self, v: UVec3) -> Vec3 {
        let [_, x, y, z] = self.get(v);
        Vec3::new(x, y, z)
    }

    /// Distance at the voxel containing `p` (nearest lookup, clamped).
    #[must_use]
    pub fn value_at_world(&self, p: Vec3) -> f32 {
        self.distance(self.grid.world_to_voxel(p))
    }

    /// Voxel with the smallest absolute distance. Ties keep the lowest index.
    #[must_use]
    pub fn argmin(&self) -> UVec3 {
        let (index, _) = self
            .voxels
            .iter()
            .enumerate()
            .fold((0, f32::INFINITY), |(best_i, best), (i, v)| {
                if v[0].abs() < best {
                    (i, v[0].abs())
                } else {
                    (best_i, best)
                }
            });
        self.grid.unflatten(index)
    }

    /// Smallest stored distance (most negative when signed).
    #[must_use]
    pub fn min_distance(&self) -> f32 {
        self.voxels.iter().map(|v| v[0]).fold(f32::INFINITY, f32::min)
    }

    /// Largest stored distance.
    #[must_use]
    pub fn max_distance(&self) -> f32 {
        self.voxels
            .iter()
            .map(|v| v[0])
            .fold(f32::NEG_INFINITY, f32::max)
    }

    /// Largest absolute per-voxel distance difference against `other`.
    ///
    /// Returns `None` when the grids differ.
    #[must_use]
    pub fn max_abs_difference(&self, other: &FieldData) -> Option<f32> {
        if self.grid != other.grid {
            return None;
        }
        Some(
            self.voxels
                .iter()
                .zip(&other.voxels)
                .map(|(a, b)| (a[0] - b[0]).abs())
                .fold(0.0, f32::max),
        )
    }
}

/// Closest point on triangle `abc` to `p`, with its barycentric weights.
#[must_use]
pub fn closest_point_on_triangle(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (Vec3, Vec3) {
    let ab = b - a;
    let ac = c - a;
    if ab.cross(ac).length_squared() <= DEGENERATE_AREA_SQ {
        return closest_point_on_degenerate(p, a, b, c);
    }

    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, Vec3::X);
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, Vec3::Y);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + v * ab, Vec3::new(1.0 - v, v, 0.0));
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, Vec3::Z);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + w * ac, Vec3::new(1.0 - w, 0.0, w));
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && d4 - d3 >= 0.0 && d5 - d6 >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + w * (c - b), Vec3::new(0.0, 1.0 - w, w));
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    (a + ab * v + ac * w, Vec3::new(1.0 - v - w, v, w))
}

fn closest_point_on_segment(p: Vec3, a: Vec3, b: Vec3) -> (Vec3, f32) {
    let ab = b - a;
    let t = ((p - a).dot(ab) / ab.length_squared().max(DEGENERATE_AREA_SQ)).clamp(0.0, 1.0);
    (a + t * ab, t)
}

// Zero-area triangles (points and slivers) reduce to their three edges.
fn closest_point_on_degenerate(p: Vec3, a: Vec3, b: Vec3, c: Vec3) -> (Vec3, Vec3) {
    let (q_ab, t_ab) = closest_point_on_segment(p, a, b);
    let (q_bc, t_bc) = closest_point_on_segment(p, b, c);
    let (q_ca, t_ca) = closest_point_on_segment(p, c, a);

    let mut best = (q_ab, Vec3::new(1.0 - t_ab, t_ab, 0.0));
    if p.distance_squared(q_bc) < p.distance_squared(best.0) {
        best = (q_bc, Vec3::new(0.0, 1.0 - t_bc, t_bc));
    }
    if p.distance_squared(q_ca) < p.distance_squared(best.0) {
        best = (q_ca, Vec3::new(t_ca, 0.0, 1.0 - t_ca));
    }
    best
}

/// Nearest surface point to `p` and the surface normal there.
fn nearest_surface(p: Vec3, samples: &[SurfaceSample], mode: DistanceMode) -> (Vec3, Vec3) {
    let mut best_sq = f32::INFINITY;
    let mut best = (p, Vec3::ZERO);

    match mode {
        DistanceMode::NearestSample => {
            for s in samples {
                let q = s.position();
                let d2 = p.distance_squared(q);
                if d2 < best_sq {
                    best_sq = d2;
                    best = (q, s.normal());
                }
            }
        }
        DistanceMode::NearestTriangle => {
            for tri in samples.chunks_exact(3) {
                let (q, bary) = closest_point_on_triangle(
                    p,
                    tri[0].position(),
                    tri[1].position(),
                    tri[2].position(),
                );
                let d2 = p.distance_squared(q);
                if d2 < best_sq {
                    best_sq = d2;
                    let n = tri[0].normal() * bary.x
                        + tri[1].normal() * bary.y
                        + tri[2].normal() * bary.z;
                    best = (q, n);
                }
            }
        }
    }

    best
}

/// Evaluates one field voxel at world position `p`.
///
/// Returns `[distance, gradient.x, gradient.y, gradient.z]`. With
/// [`SignMode::NormalHeuristic`] the distance is negated when the offset from
/// the nearest surface point points against the surface normal there.
#[must_use]
pub fn evaluate_point(
    p: Vec3,
    samples: &[SurfaceSample],
    sign_mode: SignMode,
    distance_mode: DistanceMode,
) -> [f32; 4] {
    let (q, n) = nearest_surface(p, samples, distance_mode);
    let offset = p - q;
    let dist = offset.length();

    let sign = if sign_mode == SignMode::NormalHeuristic && offset.dot(n) < 0.0 {
        -1.0
    } else {
        1.0
    };
    let dir = if dist > 0.0 {
        offset / dist
    } else {
        n.normalize_or_zero()
    };
    let gradient = dir * sign;

    [sign * dist, gradient.x, gradient.y, gradient.z]
}

/// Computes the full field on the CPU, one z-slab per task.
pub fn compute_reference_field(
    grid: &GridMapper,
    samples: &[SurfaceSample],
    sign_mode: SignMode,
    distance_mode: DistanceMode,
) -> Result<FieldData> {
    if samples.is_empty() {
        return Err(MeshfieldError::NoTriangles);
    }

    let n = grid.size();
    let slab = (n * n) as usize;
    let mut voxels = vec![[0.0f32; 4]; grid.num_voxels()];

    voxels
        .par_chunks_mut(slab)
        .enumerate()
        .for_each(|(z, slice)| {
            for y in 0..n {
                for x in 0..n {
                    let p = grid.voxel_center(UVec3::new(x, y, z as u32));
                    slice[(y * n + x) as usize] =
                        evaluate_point(p, samples, sign_mode, distance_mode);
                }
            }
        });

    FieldData::new(*grid, voxels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Aabb;
    use crate::mesh::Model;
    use crate::samples::build_surface_samples;

    fn point_samples(p: Vec3) -> Vec<SurfaceSample> {
        vec![SurfaceSample::new(p, Vec3::Y); 3]
    }

    #[test]
    fn test_closest_point_regions() {
        let (a, b, c) = (Vec3::ZERO, Vec3::X, Vec3::Y);

        // Face interior.
        let (q, bary) = closest_point_on_triangle(Vec3::new(0.25, 0.25, 1.0), a, b, c);
        assert!(q.distance(Vec3::new(0.25, 0.25, 0.0)) < 1e-6);
        assert!((bary.x + bary.y + bary.z - 1.0).abs() < 1e-6);

        // Vertex regions.
        assert_eq!(closest_point_on_triangle(Vec3::splat(-1.0), a, b, c).0, a);
        assert_eq!(closest_point_on_triangle(Vec3::new(3.0, -1.0, 0.0), a, b, c).0, b);
        assert_eq!(closest_point_on_triangle(Vec3::new(-1.0, 3.0, 0.0), a, b, c).0, c);

        // Edge regions.
        let (q, _) = closest_point_on_triangle(Vec3::new(0.5, -2.0, 0.0), a, b, c);
        assert!(q.distance(Vec3::new(0.5, 0.0, 0.0)) < 1e-6);
        let (q, _) = closest_point_on_triangle(Vec3::new(1.0, 1.0, 0.0), a, b, c);
        assert!(q.distance(Vec3::new(0.5, 0.5, 0.0)) < 1e-6);
    }

    #[test]
    fn test_closest_point_degenerate_triangle() {
        let p = Vec3::new(0.5, 0.5, 0.5);
        let (q, bary) = closest_point_on_triangle(Vec3::ONE, p, p, p);
        assert_eq!(q, p);
        assert!(bary.is_finite());

        // Collinear sliver.
        let (q, _) = closest_point_on_triangle(
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(2.0, 0.0, 0.0),
        );
        assert!(q.distance(Vec3::X) < 1e-6);
    }

    #[test]
    fn test_single_point_field_minimum_and_monotonic() {
        let grid = GridMapper::new(Aabb::new(Vec3::ZERO, Vec3::ONE), 16, 4).unwrap();
        let p = Vec3::new(0.3, 0.61, 0.45);
        let samples = point_samples(p);

        for mode in [DistanceMode::NearestSample, DistanceMode::NearestTriangle] {
            let field = compute_reference_field(&grid, &samples, SignMode::Unsigned, mode).unwrap();
            let nearest = grid.world_to_voxel(p);
            assert_eq!(field.argmin(), nearest);
            assert_eq!(field.min_distance(), field.distance(nearest));

            for dir in [
                glam::IVec3::X,
                glam::IVec3::NEG_X,
                glam::IVec3::Y,
                glam::IVec3::NEG_Z,
                glam::IVec3::ONE,
            ] {
                let mut v = nearest.as_ivec3();
                let mut last = field.distance(nearest);
                loop {
                    v += dir;
                    if v.min_element() < 0 || v.max_element() >= 16 {
                        break;
                    }
                    let d = field.distance(v.as_uvec3());
                    assert!(d > last, "distance not increasing along {dir:?} at {v:?}");
                    last = d;
                }
            }
        }
    }

    #[test]
    fn test_unit_cube_center_and_exterior() {
        let samples = build_surface_samples(&Model::unit_cube()).unwrap();
        let grid = GridMapper::new(Aabb::new(Vec3::ZERO, Vec3::ONE), 32, 4).unwrap();
        let field = compute_reference_field(
            &grid,
            &samples,
            SignMode::NormalHeuristic,
            DistanceMode::NearestTriangle,
        )
        .unwrap();

        let center = field.value_at_world(Vec3::splat(0.5));
        let half_voxel = grid.voxel_size().max_element() * 0.5;
        assert!(center < 0.0, "cube center should be inside, got {center}");
        assert!((center.abs() - 0.5).abs() <= half_voxel + 1e-5);

        let face = evaluate_point(
            Vec3::new(3.0, 0.5, 0.5),
            &samples,
            SignMode::NormalHeuristic,
            DistanceMode::NearestTriangle,
        );
        assert!((face[0] - 2.0).abs() < 1e-5);
        assert!(Vec3::new(face[1], face[2], face[3]).distance(Vec3::X) < 1e-5);

        let corner = evaluate_point(
            Vec3::splat(3.0),
            &samples,
            SignMode::NormalHeuristic,
            DistanceMode::NearestTriangle,
        );
        assert!((corner[0] - 12.0f32.sqrt()).abs() < 1e-5);
    }

    #[test]
    fn test_nearest_sample_mode_uses_vertices_only() {
        let samples = build_surface_samples(&Model::unit_cube()).unwrap();
        let value = evaluate_point(
            Vec3::splat(0.5),
            &samples,
            SignMode::Unsigned,
            DistanceMode::NearestSample,
        );
        assert!((value[0] - 0.75f32.sqrt()).abs() < 1e-6);

        let outside = evaluate_point(
            Vec3::new(3.0, 0.0, 0.0),
            &samples,
            SignMode::NormalHeuristic,
            DistanceMode::NearestSample,
        );
        assert!((outside[0] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_sign_heuristic_flips_inside() {
        let samples = build_surface_samples(&Model::unit_cube()).unwrap();
        let inside = Vec3::new(0.2, 0.5, 0.5);
        let signed = evaluate_point(
            inside,
            &samples,
            SignMode::NormalHeuristic,
            DistanceMode::NearestTriangle,
        );
        let unsigned =
            evaluate_point(inside, &samples, SignMode::Unsigned, DistanceMode::NearestTriangle);
        assert!((signed[0] + 0.2).abs() < 1e-5);
        assert!((unsigned[0] - 0.2).abs() < 1e-5);
        // Gradient of the signed field points toward the nearest face from inside.
        assert!(Vec3::new(signed[1], signed[2], signed[3]).distance(Vec3::NEG_X) < 1e-5);
    }

    #[test]
    fn test_zero_distance_gradient_uses_normal() {
        let samples = vec![SurfaceSample::new(Vec3::ONE, Vec3::new(0.0, 2.0, 0.0)); 3];
        let value =
            evaluate_point(Vec3::ONE, &samples, SignMode::NormalHeuristic, DistanceMode::NearestSample);
        assert_eq!(value, [0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_field_data_size_checked() {
        let grid = GridMapper::new(Aabb::new(Vec3::ZERO, Vec3::ONE), 4, 4).unwrap();
        assert!(matches!(
            FieldData::new(grid, vec![[0.0; 4]; 10]),
            Err(MeshfieldError::SizeMismatch {
                expected: 64,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_reference_field_rejects_empty_samples() {
        let grid = GridMapper::new(Aabb::new(Vec3::ZERO, Vec3::ONE), 4, 4).unwrap();
        assert!(matches!(
            compute_reference_field(&grid, &[], SignMode::Unsigned, DistanceMode::NearestSample),
            Err(MeshfieldError::NoTriangles)
        ));
    }

    #[test]
    fn test_max_abs_difference() {
        let grid = GridMapper::new(Aabb::new(Vec3::ZERO, Vec3::ONE), 4, 4).unwrap();
        let a = FieldData::new(grid, vec![[1.0, 0.0, 0.0, 0.0]; 64]).unwrap();
        let mut voxels = vec![[1.0, 0.0, 0.0, 0.0]; 64];
        voxels[5][0] = 1.25;
        let b = FieldData::new(grid, voxels).unwrap();
        assert_eq!(a.max_abs_difference(&b), Some(0.25));
        assert_eq!(a.max_distance(), 1.0);
    }
}
