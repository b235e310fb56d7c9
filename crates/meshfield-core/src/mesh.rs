//! Read-only mesh collaborator types.
//!
//! A [`Model`] is a collection of [`SubMesh`]es, each with its own vertex list
//! and triangle index list. Loading and parsing happen elsewhere; this module
//! only describes the shape the field builder consumes and checks it for
//! degenerate input before any bounds or sample math runs.

use glam::Vec3;

use crate::error::{MeshfieldError, Result};

/// A single mesh vertex.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vertex {
    /// World-space position.
    pub position: Vec3,
    /// World-space normal (not required to be unit length).
    pub normal: Vec3,
}

impl Vertex {
    /// Creates a new vertex.
    #[must_use]
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self { position, normal }
    }
}

/// One indexed triangle list.
#[derive(Debug, Clone, Default)]
pub struct SubMesh {
    /// Vertex attributes.
    pub vertices: Vec<Vertex>,
    /// Triangle indices into `vertices`, three per triangle.
    pub indices: Vec<u32>,
}

impl SubMesh {
    /// Creates a new sub-mesh.
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Builds a sub-mesh from positions and triangles, computing area-weighted
    /// vertex normals.
    #[must_use]
    pub fn from_triangles(positions: &[Vec3], triangles: &[[u32; 3]]) -> Self {
        let mut normals = vec![Vec3::ZERO; positions.len()];
        for tri in triangles {
            let [a, b, c] = tri.map(|i| i as usize);
            if a >= positions.len() || b >= positions.len() || c >= positions.len() {
                continue;
            }
            let face = (positions[b] - positions[a]).cross(positions[c] - positions[a]);
            normals[a] += face;
            normals[b] += face;
            normals[c] += face;
        }

        let vertices = positions
            .iter()
            .zip(&normals)
            .map(|(&p, &n)| Vertex::new(p, n.normalize_or_zero()))
            .collect();
        let indices = triangles.iter().flatten().copied().collect();

        Self { vertices, indices }
    }

    /// Returns the number of triangles.
    #[must_use]
    pub fn num_triangles(&self) -> usize {
        self.indices.len() / 3
    }
}

/// A model made of one or more sub-meshes.
#[derive(Debug, Clone, Default)]
pub struct Model {
    /// The sub-meshes, in draw order.
    pub meshes: Vec<SubMesh>,
}

impl Model {
    /// Creates a model from its sub-meshes.
    #[must_use]
    pub fn new(meshes: Vec<SubMesh>) -> Self {
        Self { meshes }
    }

    /// Total vertex count across all sub-meshes.
    #[must_use]
    pub fn num_vertices(&self) -> usize {
        self.meshes.iter().map(|m| m.vertices.len()).sum()
    }

    /// Total triangle count across all sub-meshes.
    #[must_use]
    pub fn num_triangles(&self) -> usize {
        self.meshes.iter().map(SubMesh::num_triangles).sum()
    }

    /// Iterates over every vertex position of every sub-mesh.
    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.meshes
            .iter()
            .flat_map(|m| m.vertices.iter().map(|v| v.position))
    }

    /// Rejects models the field builder cannot handle.
    ///
    /// Checked in order: no vertices, malformed index lists, no triangles.
    pub fn validate(&self) -> Result<()> {
        if self.num_vertices() == 0 {
            return Err(MeshfieldError::EmptyMesh);
        }

        for (sub_mesh, mesh) in self.meshes.iter().enumerate() {
            if let Some(vertex) = mesh.vertices.iter().position(|v| !v.position.is_finite()) {
                return Err(MeshfieldError::NonFinitePosition { sub_mesh, vertex });
            }
            if mesh.indices.len() % 3 != 0 {
                return Err(MeshfieldError::TruncatedIndexList {
                    sub_mesh,
                    len: mesh.indices.len(),
                });
            }
            if let Some(&index) = mesh
                .indices
                .iter()
                .find(|&&i| i as usize >= mesh.vertices.len())
            {
                return Err(MeshfieldError::IndexOutOfRange {
                    sub_mesh,
                    index,
                    vertex_count: mesh.vertices.len(),
                });
            }
        }

        if self.num_triangles() == 0 {
            return Err(MeshfieldError::NoTriangles);
        }

        Ok(())
    }

    /// An axis-aligned unit cube spanning `[0, 1]^3`: 8 shared vertices,
    /// 12 outward-facing triangles.
    #[must_use]
    pub fn unit_cube() -> Self {
        let positions = [
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(1.0, 1.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
            Vec3::new(0.0, 1.0, 1.0),
        ];
        let triangles = [
            [0, 2, 1],
            [0, 3, 2],
            [4, 5, 6],
            [4, 6, 7],
            [0, 1, 5],
            [0, 5, 4],
            [3, 6, 2],
            [3, 7, 6],
            [0, 4, 7],
            [0, 7, 3],
            [1, 2, 6],
            [1, 6, 5],
        ];
        Self::new(vec![SubMesh::from_triangles(&positions, &triangles)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_cube_counts() {
        let cube = Model::unit_cube();
        assert_eq!(cube.num_vertices(), 8);
        assert_eq!(cube.num_triangles(), 12);
        assert!(cube.validate().is_ok());
    }

    #[test]
    fn test_unit_cube_normals_point_outward() {
        let cube = Model::unit_cube();
        let center = Vec3::splat(0.5);
        for v in &cube.meshes[0].vertices {
            assert!(
                v.normal.dot(v.position - center) > 0.0,
                "normal {:?} at {:?} points inward",
                v.normal,
                v.position
            );
            assert!((v.normal.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_empty_model_rejected() {
        let model = Model::default();
        assert!(matches!(model.validate(), Err(MeshfieldError::EmptyMesh)));

        let model = Model::new(vec![SubMesh::default(), SubMesh::default()]);
        assert!(matches!(model.validate(), Err(MeshfieldError::EmptyMesh)));
    }

    #[test]
    fn test_vertices_without_triangles_rejected() {
        let model = Model::new(vec![SubMesh::new(
            vec![Vertex::new(Vec3::ONE, Vec3::Y)],
            vec![],
        )]);
        assert!(matches!(model.validate(), Err(MeshfieldError::NoTriangles)));
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let model = Model::new(vec![SubMesh::new(
            vec![Vertex::default(); 3],
            vec![0, 1, 3],
        )]);
        match model.validate() {
            Err(MeshfieldError::IndexOutOfRange {
                sub_mesh,
                index,
                vertex_count,
            }) => {
                assert_eq!(sub_mesh, 0);
                assert_eq!(index, 3);
                assert_eq!(vertex_count, 3);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_truncated_index_list_rejected() {
        let model = Model::new(vec![SubMesh::new(vec![Vertex::default(); 3], vec![0, 1])]);
        assert!(matches!(
            model.validate(),
            Err(MeshfieldError::TruncatedIndexList { sub_mesh: 0, len: 2 })
        ));
    }

    #[test]
    fn test_non_finite_position_rejected() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            let mut vertices = vec![Vertex::default(); 3];
            vertices[2].position = Vec3::new(0.0, bad, 0.0);
            let model = Model::new(vec![
                SubMesh::from_triangles(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[[0, 1, 2]]),
                SubMesh::new(vertices, vec![0, 1, 2]),
            ]);
            assert!(
                matches!(
                    model.validate(),
                    Err(MeshfieldError::NonFinitePosition { sub_mesh: 1, vertex: 2 })
                ),
                "{bad} position accepted"
            );
        }
    }

    #[test]
    fn test_positions_span_sub_meshes() {
        let a = SubMesh::from_triangles(&[Vec3::ZERO, Vec3::X, Vec3::Y], &[[0, 1, 2]]);
        let b = SubMesh::from_triangles(&[Vec3::Z, Vec3::ONE, Vec3::NEG_ONE], &[[0, 1, 2]]);
        let model = Model::new(vec![a, b]);
        assert_eq!(model.positions().count(), 6);
        assert_eq!(model.num_triangles(), 2);
    }
}
