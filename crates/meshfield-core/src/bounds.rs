//! Axis-aligned bounding boxes.

use glam::Vec3;

use crate::error::{MeshfieldError, Result};
use crate::mesh::Model;

/// Triangle indices for the 12 faces of a box built from [`Aabb::corners`].
///
/// Faces are wound inward: with counter-clockwise front faces and back-face
/// culling only the far side of the box rasterizes, including when the
/// camera is inside it.
pub const BOX_INDICES: [u32; 36] = [
    0, 1, 2, 2, 3, 0, // front
    1, 5, 6, 6, 2, 1, // right
    5, 4, 7, 7, 6, 5, // back
    4, 0, 3, 3, 7, 4, // left
    3, 2, 6, 6, 7, 3, // top
    4, 5, 1, 1, 0, 4, // bottom
];

/// An axis-aligned bounding box with `min[i] <= max[i]` on every axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    min: Vec3,
    max: Vec3,
}

impl Aabb {
    /// Creates a box from two corners, ordering them per axis.
    #[must_use]
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Computes the bounds of a sequence of points in a single pass.
    ///
    /// Returns `None` for an empty sequence.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some(Self { min, max })
    }

    /// Computes the bounds of every vertex of every sub-mesh of a model.
    pub fn from_model(model: &Model) -> Result<Self> {
        Self::from_points(model.positions()).ok_or(MeshfieldError::EmptyMesh)
    }

    /// Minimum corner.
    #[must_use]
    pub fn min(&self) -> Vec3 {
        self.min
    }

    /// Maximum corner.
    #[must_use]
    pub fn max(&self) -> Vec3 {
        self.max
    }

    /// Per-axis side lengths.
    #[must_use]
    pub fn extent(&self) -> Vec3 {
        self.max - self.min
    }

    /// Box center.
    #[must_use]
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Length of the box diagonal.
    #[must_use]
    pub fn diagonal(&self) -> f32 {
        self.extent().length()
    }

    /// Returns true if `p` lies inside the box (boundary included).
    #[must_use]
    pub fn contains(&self, p: Vec3) -> bool {
        p.cmpge(self.min).all() && p.cmple(self.max).all()
    }

    /// Returns true if any axis has zero extent.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.extent().min_element() <= 0.0
    }

    /// The eight box corners: the `z = min` face counter-clockwise from
    /// `min`, then the `z = max` face in the same order.
    #[must_use]
    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(b.x, b.y, b.z),
            Vec3::new(a.x, b.y, b.z),
        ]
    }
}
