//! Face-vertex triangle mesh.

use nalgebra::{Point3, Vector3};

use crate::error::{ArapError, Result};

/// An indexed triangle mesh: a vertex position table plus a list of
/// counter-clockwise triangles referencing it.
///
/// The topology is immutable once built. Positions can be swapped wholesale
/// with [`TriMesh::with_positions`], which is how deformed results are turned
/// back into a mesh for saving.
#[derive(Debug, Clone)]
pub struct TriMesh {
    positions: Vec<Point3<f64>>,
    faces: Vec<[usize; 3]>,
}

/// Build a triangle mesh from vertices and faces.
///
/// # Arguments
/// * `vertices` - List of vertex positions
/// * `faces` - List of triangle faces, each as [v0, v1, v2] indices
///
/// # Returns
/// A triangle mesh, or an error if the face list is empty, references a
/// vertex that does not exist, or repeats a vertex within one face.
///
/// # Example
/// ```
/// use arap_deform::mesh::build_from_triangles;
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles(vertices: &[Point3<f64>], faces: &[[usize; 3]]) -> Result<TriMesh> {
    TriMesh::new(vertices.to_vec(), faces.to_vec())
}

impl TriMesh {
    /// Create a mesh, taking ownership of the position and face tables.
    pub fn new(positions: Vec<Point3<f64>>, faces: Vec<[usize; 3]>) -> Result<Self> {
        if faces.is_empty() {
            return Err(ArapError::EmptyMesh);
        }

        for (fi, face) in faces.iter().enumerate() {
            for &vi in face {
                if vi >= positions.len() {
                    return Err(ArapError::InvalidVertexIndex { face: fi, vertex: vi });
                }
            }
            if face[0] == face[1] || face[1] == face[2] || face[0] == face[2] {
                return Err(ArapError::DegenerateFace { face: fi });
            }
        }

        Ok(Self { positions, faces })
    }

    /// Same topology with a different position table.
    pub fn with_positions(&self, positions: Vec<Point3<f64>>) -> Result<Self> {
        if positions.len() != self.positions.len() {
            return Err(ArapError::invalid_param(
                "positions",
                positions.len(),
                "must have one entry per mesh vertex",
            ));
        }
        Ok(Self {
            positions,
            faces: self.faces.clone(),
        })
    }

    /// Number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// All vertex positions, indexed by vertex.
    #[inline]
    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    /// All triangles.
    #[inline]
    pub fn faces(&self) -> &[[usize; 3]] {
        &self.faces
    }

    /// Position of vertex `v`.
    #[inline]
    pub fn position(&self, v: usize) -> &Point3<f64> {
        &self.positions[v]
    }

    /// Vertex indices of face `f`.
    #[inline]
    pub fn face(&self, f: usize) -> [usize; 3] {
        self.faces[f]
    }

    /// Corner positions of face `f`.
    pub fn face_positions(&self, f: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.faces[f];
        [self.positions[a], self.positions[b], self.positions[c]]
    }

    /// Unnormalized face normal (twice the area, pointing along the winding).
    pub fn face_cross(&self, f: usize) -> Vector3<f64> {
        let [p0, p1, p2] = self.face_positions(f);
        (p1 - p0).cross(&(p2 - p0))
    }

    /// Area of face `f`.
    pub fn face_area(&self, f: usize) -> f64 {
        0.5 * self.face_cross(f).norm()
    }

    /// Total surface area.
    pub fn surface_area(&self) -> f64 {
        (0..self.num_faces()).map(|f| self.face_area(f)).sum()
    }

    /// Axis-aligned bounding box as (min, max), or `None` for an empty
    /// position table.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.positions.first()?;
        let mut min = *first;
        let mut max = *first;
        for p in &self.positions[1..] {
            min = min.inf(p);
            max = max.sup(p);
        }
        Some((min, max))
    }

    /// Mean length over the (unique) edges of the mesh.
    pub fn average_edge_length(&self) -> f64 {
        let mut seen = std::collections::HashSet::new();
        let mut sum = 0.0;
        for face in &self.faces {
            for i in 0..3 {
                let a = face[i];
                let b = face[(i + 1) % 3];
                let key = if a < b { (a, b) } else { (b, a) };
                if seen.insert(key) {
                    sum += (self.positions[a] - self.positions[b]).norm();
                }
            }
        }
        if seen.is_empty() {
            0.0
        } else {
            sum / seen.len() as f64
        }
    }
}
