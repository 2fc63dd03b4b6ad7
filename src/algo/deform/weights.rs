//! Cotangent edge weights and vertex adjacency.

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::error::{ArapError, Result};
use crate::linalg::CsrMatrix;
use crate::mesh::TriMesh;

/// Cotangents of the three corner angles of a triangle, `(cot A, cot B, cot C)`
/// for corners `p[0], p[1], p[2]`.
///
/// Uses the law of cosines: with `a² = |B−C|²`, `b² = |C−A|²`, `c² = |A−B|²`,
/// `cot A = (b² + c² − a²) / (4 · area)` and likewise for B and C.
///
/// # Errors
///
/// Returns [`ArapError::ZeroAreaFace`] when the triangle is degenerate
/// relative to its size (coincident or collinear corners).
pub fn face_cotangents(p: &[Point3<f64>; 3], face: usize) -> Result<Vector3<f64>> {
    let [a, b, c] = p;
    let a_sq = (b - c).norm_squared();
    let b_sq = (c - a).norm_squared();
    let c_sq = (a - b).norm_squared();

    let area = 0.5 * (b - a).cross(&(c - a)).norm();
    let four_area = 4.0 * area;
    if !(four_area > f64::EPSILON * (a_sq + b_sq + c_sq)) {
        return Err(ArapError::ZeroAreaFace { face, area });
    }

    Ok(Vector3::new(
        (b_sq + c_sq - a_sq) / four_area,
        (c_sq + a_sq - b_sq) / four_area,
        (a_sq + b_sq - c_sq) / four_area,
    ))
}

/// The cotangent weight matrix of a mesh, stored as a per-vertex adjacency.
///
/// For an edge (i, j), `weight(i, j)` is half the sum of the cotangents of
/// the angles opposite the edge in its one or two incident triangles. The
/// self weight `weight(i, i)` is minus the sum of the edge weights at `i`, so
/// every row of the full matrix sums to zero.
#[derive(Debug, Clone)]
pub struct CotangentWeights {
    /// Neighbors of each vertex with the shared edge weight, sorted by neighbor.
    neighbors: Vec<Vec<(usize, f64)>>,
    /// Self weights.
    diagonal: Vec<f64>,
}

impl CotangentWeights {
    /// Accumulate weights and adjacency over all faces of `mesh`.
    pub fn build(mesh: &TriMesh) -> Result<Self> {
        let n = mesh.num_vertices();
        let mut edges: HashMap<(usize, usize), f64> = HashMap::new();
        let mut diagonal = vec![0.0; n];

        // Corner i is opposite the edge (face[i + 1], face[i + 2]).
        const OPPOSITE: [[usize; 2]; 3] = [[1, 2], [2, 0], [0, 1]];

        for f in 0..mesh.num_faces() {
            let face = mesh.face(f);
            let cot = face_cotangents(&mesh.face_positions(f), f)?;

            for (corner, [e0, e1]) in OPPOSITE.iter().enumerate() {
                let first = face[*e0];
                let second = face[*e1];
                let half_cot = cot[corner] / 2.0;

                *edges.entry(canonical_edge(first, second)).or_insert(0.0) += half_cot;
                diagonal[first] -= half_cot;
                diagonal[second] -= half_cot;
            }
        }

        let mut neighbors: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        for (&(i, j), &w) in &edges {
            neighbors[i].push((j, w));
            neighbors[j].push((i, w));
        }
        for list in &mut neighbors {
            list.sort_unstable_by_key(|&(j, _)| j);
        }

        Ok(Self {
            neighbors,
            diagonal,
        })
    }

    /// Number of vertices covered.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.diagonal.len()
    }

    /// Neighbors of `v` with their edge weights, sorted by neighbor index.
    #[inline]
    pub fn neighbors(&self, v: usize) -> &[(usize, f64)] {
        &self.neighbors[v]
    }

    /// Self weight of `v`.
    #[inline]
    pub fn diagonal(&self, v: usize) -> f64 {
        self.diagonal[v]
    }

    /// Entry (i, j) of the weight matrix; zero if i and j share no edge.
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        if i == j {
            return self.diagonal[i];
        }
        let list = &self.neighbors[i];
        match list.binary_search_by_key(&j, |&(k, _)| k) {
            Ok(pos) => list[pos].1,
            Err(_) => 0.0,
        }
    }

    /// Sum of row `v` of the weight matrix, including the self weight.
    pub fn row_sum(&self, v: usize) -> f64 {
        self.diagonal[v] + self.neighbors[v].iter().map(|&(_, w)| w).sum::<f64>()
    }

    /// The full `n × n` weight matrix.
    pub fn to_csr(&self) -> CsrMatrix {
        let n = self.num_vertices();
        let mut triplets = Vec::with_capacity(n + self.neighbors.iter().map(Vec::len).sum::<usize>());
        for (i, list) in self.neighbors.iter().enumerate() {
            triplets.push((i, i, self.diagonal[i]));
            triplets.extend(list.iter().map(|&(j, w)| (i, j, w)));
        }
        CsrMatrix::from_triplets(n, n, triplets)
    }
}

/// Get canonical edge representation (smaller index first).
fn canonical_edge(v0: usize, v1: usize) -> (usize, usize) {
    if v0 < v1 {
        (v0, v1)
    } else {
        (v1, v0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::build_from_triangles;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn create_square() -> TriMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

    fn create_tetrahedron() -> TriMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, 1.0, 0.0),
            Point3::new(0.5, 0.5, 1.0),
        ];
        let faces = vec![[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
        build_from_triangles(&vertices, &faces).unwrap()
    }

    #[test]
    fn test_equilateral_cotangents() {
        let h = 3.0_f64.sqrt() / 2.0;
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.5, h, 0.0),
        ];
        let cot = face_cotangents(&p, 0).unwrap();
        let expected = 1.0 / 3.0_f64.sqrt();
        for i in 0..3 {
            assert!((cot[i] - expected).abs() < 1e-12);
        }
    }

    fn random_point(rng: &mut StdRng) -> Point3<f64> {
        Point3::new(
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
            rng.random_range(-1.0..1.0),
        )
    }

    #[test]
    fn test_cotangents_match_angles() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut checked = 0;
        while checked < 200 {
            let p = [random_point(&mut rng), random_point(&mut rng), random_point(&mut rng)];
            // Skip slivers whose cotangents blow up.
            let area = 0.5 * (p[1] - p[0]).cross(&(p[2] - p[0])).norm();
            if area < 1e-2 {
                continue;
            }

            let cot = face_cotangents(&p, 0).unwrap();
            for corner in 0..3 {
                let a = p[corner];
                let u = p[(corner + 1) % 3] - a;
                let v = p[(corner + 2) % 3] - a;
                let angle = u.cross(&v).norm().atan2(u.dot(&v));
                let direct = 1.0 / angle.tan();
                assert!(
                    (cot[corner] - direct).abs() < 1e-9 * (1.0 + direct.abs()),
                    "corner {}: {} vs {}",
                    corner,
                    cot[corner],
                    direct
                );
            }

            // Angles sum to pi: cot A cot B + cot B cot C + cot C cot A = 1.
            let identity = cot.x * cot.y + cot.y * cot.z + cot.z * cot.x;
            assert!((identity - 1.0).abs() < 1e-9);
            checked += 1;
        }
    }

    #[test]
    fn test_coincident_vertices_rejected() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
        ];
        let mesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();

        let err = CotangentWeights::build(&mesh).unwrap_err();
        assert!(err.is_configuration());
        assert!(matches!(err, ArapError::ZeroAreaFace { face: 0, .. }));
    }

    #[test]
    fn test_collinear_vertices_rejected() {
        let p = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(3.0, 3.0, 3.0),
        ];
        assert!(face_cotangents(&p, 4).is_err());
    }

    #[test]
    fn test_square_weights() {
        let weights = CotangentWeights::build(&create_square()).unwrap();

        // Sides are opposite 45 degree angles, the diagonal is opposite two right angles.
        assert!((weights.weight(0, 1) - 0.5).abs() < 1e-12);
        assert!((weights.weight(1, 2) - 0.5).abs() < 1e-12);
        assert!((weights.weight(2, 3) - 0.5).abs() < 1e-12);
        assert!((weights.weight(3, 0) - 0.5).abs() < 1e-12);
        assert!(weights.weight(0, 2).abs() < 1e-12);

        // No edge between 1 and 3.
        assert_eq!(weights.weight(1, 3), 0.0);
        assert_eq!(weights.neighbors(1).len(), 2);
        assert_eq!(
            weights.neighbors(0).iter().map(|&(j, _)| j).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!((weights.diagonal(0) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_row_sums_are_zero() {
        for mesh in [create_square(), create_tetrahedron()] {
            let weights = CotangentWeights::build(&mesh).unwrap();
            for v in 0..mesh.num_vertices() {
                let sum = weights.row_sum(v);
                assert!(sum.abs() < 1e-12, "row {} sums to {}", v, sum);
            }
        }
    }

    #[test]
    fn test_weights_symmetric() {
        let weights = CotangentWeights::build(&create_tetrahedron()).unwrap();
        for i in 0..4 {
            for &(j, w) in weights.neighbors(i) {
                assert_eq!(weights.weight(j, i), w);
            }
        }
        // Closed tetrahedron: everyone is everyone's neighbor.
        for i in 0..4 {
            assert_eq!(weights.neighbors(i).len(), 3);
        }
    }

    #[test]
    fn test_to_csr_matches_lookup() {
        let weights = CotangentWeights::build(&create_tetrahedron()).unwrap();
        let w = weights.to_csr();
        assert_eq!(w.nrows(), 4);
        assert_eq!(w.nnz(), 16);
        for i in 0..4 {
            for j in 0..4 {
                assert_eq!(w.get(i, j), weights.weight(i, j));
            }
        }
    }
}
