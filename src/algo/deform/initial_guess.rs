//! Naive Laplacian editing, used to seed the ARAP iterations.
//!
//! Minimizes `‖L p' − L p‖²` over the free vertices with the fixed vertices
//! held at their targets. Splitting the weight matrix `W` (which is `−L`)
//! into its free columns `A` and fixed columns `B`, the free positions `x` of
//! each axis solve the normal equations
//!
//! ```text
//! AᵗA x = Aᵗ (W p − B y)
//! ```
//!
//! where `p` are the original positions and `y` the fixed targets.

use log::debug;
use nalgebra::{DMatrix, Point3};

use crate::error::{ArapError, Result};
use crate::linalg::{Factorization, LinearSolver};
use crate::mesh::Classification;

use super::weights::CotangentWeights;
use super::{matrix_row, points_to_matrix};

const SYSTEM: &str = "naive Laplacian";

/// Solve the naive Laplacian editing problem and return a full position table.
///
/// Free rows come from the least-squares solve; fixed rows are copied from
/// `targets` unchanged. The system is factorized here, independently of the
/// ARAP system matrix, and dropped afterwards.
///
/// # Errors
///
/// - [`ArapError::Factorization`] / [`ArapError::Solve`] from the backend
/// - [`ArapError::NumericalDivergence`] when `‖AᵗA x − Aᵗb‖²` of an axis
///   exceeds `residual_threshold`
pub fn naive_laplacian<S: LinearSolver>(
    solver: &S,
    weights: &CotangentWeights,
    roles: &Classification,
    original: &[Point3<f64>],
    targets: &[Point3<f64>],
    residual_threshold: f64,
) -> Result<Vec<Point3<f64>>> {
    let n = roles.num_vertices();
    let free_map: Vec<Option<usize>> = (0..n).map(|v| roles.free_pos(v)).collect();
    let fixed_map: Vec<Option<usize>> = (0..n).map(|v| roles.fixed_pos(v)).collect();

    let w = weights.to_csr();
    let a = w.select_columns(&free_map, roles.free().len());
    let b = w.select_columns(&fixed_map, roles.fixed().len());

    let left = a.gram();
    debug!("{SYSTEM}: factorizing {}x{} normal equations ({} nonzeros)", left.nrows(), left.ncols(), left.nnz());
    let factor = solver.factorize(&left, SYSTEM)?;

    let p = points_to_matrix(original);
    let y = points_to_matrix(targets);
    let rhs_full = w.mul_dense(&p) - b.mul_dense(&y);
    let right = a.transpose_mul_dense(&rhs_full);

    let x = factor.solve(&right, SYSTEM)?;

    let residual = left.mul_dense(&x) - &right;
    for axis in 0..3 {
        let r = residual.column(axis).norm_squared();
        if !(r <= residual_threshold) {
            return Err(ArapError::NumericalDivergence {
                axis,
                residual: r,
                threshold: residual_threshold,
            });
        }
    }

    Ok(assemble_positions(roles, &x, targets))
}

/// Full position table from free solutions and fixed targets.
fn assemble_positions(
    roles: &Classification,
    free_solution: &DMatrix<f64>,
    targets: &[Point3<f64>],
) -> Vec<Point3<f64>> {
    (0..roles.num_vertices())
        .map(|v| match roles.free_pos(v) {
            Some(i) => matrix_row(free_solution, i),
            None => targets[roles.info(v).pos],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{DenseSolver, FaerSolver};
    use crate::mesh::{build_from_triangles, TriMesh};
    use nalgebra::Vector3;

    fn create_grid_mesh(n: usize) -> TriMesh {
        let mut vertices = Vec::new();
        let mut faces = Vec::new();

        for j in 0..=n {
            for i in 0..=n {
                vertices.push(Point3::new(i as f64, j as f64, 0.0));
            }
        }

        for j in 0..n {
            for i in 0..n {
                let v00 = j * (n + 1) + i;
                let v10 = j * (n + 1) + i + 1;
                let v01 = (j + 1) * (n + 1) + i;
                let v11 = (j + 1) * (n + 1) + i + 1;

                faces.push([v00, v10, v11]);
                faces.push([v00, v11, v01]);
            }
        }

        build_from_triangles(&vertices, &faces).unwrap()
    }

    fn left_column(n: usize) -> Vec<usize> {
        (0..=n).map(|j| j * (n + 1)).collect()
    }

    #[test]
    fn test_unmoved_targets_reproduce_mesh() {
        let mesh = create_grid_mesh(3);
        let weights = CotangentWeights::build(&mesh).unwrap();
        let fixed = left_column(3);
        let roles = Classification::new(mesh.num_vertices(), &fixed).unwrap();
        let targets: Vec<_> = fixed.iter().map(|&v| *mesh.position(v)).collect();

        let positions = naive_laplacian(
            &FaerSolver::default(),
            &weights,
            &roles,
            mesh.positions(),
            &targets,
            1e-6,
        )
        .unwrap();

        for (p, q) in positions.iter().zip(mesh.positions()) {
            assert!((p - q).norm() < 1e-8);
        }
    }

    #[test]
    fn test_translation_is_reproduced() {
        // The Laplacian is translation invariant, so moving every constraint by
        // the same offset moves the whole mesh.
        let mesh = create_grid_mesh(2);
        let weights = CotangentWeights::build(&mesh).unwrap();
        let fixed = left_column(2);
        let roles = Classification::new(mesh.num_vertices(), &fixed).unwrap();
        let offset = Vector3::new(0.5, -2.0, 1.0);
        let targets: Vec<_> = fixed.iter().map(|&v| mesh.position(v) + offset).collect();

        let positions = naive_laplacian(
            &DenseSolver,
            &weights,
            &roles,
            mesh.positions(),
            &targets,
            1e-6,
        )
        .unwrap();

        for (p, q) in positions.iter().zip(mesh.positions()) {
            assert!((p - (q + offset)).norm() < 1e-8);
        }
    }

    #[test]
    fn test_fixed_rows_copied_exactly() {
        let mesh = create_grid_mesh(2);
        let weights = CotangentWeights::build(&mesh).unwrap();
        let fixed = vec![8, 0];
        let roles = Classification::new(mesh.num_vertices(), &fixed).unwrap();
        let targets = vec![Point3::new(2.3, 2.1, 0.7), Point3::new(0.1, -0.2, 0.0)];

        let positions = naive_laplacian(
            &FaerSolver::default(),
            &weights,
            &roles,
            mesh.positions(),
            &targets,
            1e-6,
        )
        .unwrap();

        assert_eq!(positions[8], targets[0]);
        assert_eq!(positions[0], targets[1]);
    }

    #[test]
    fn test_residual_check_is_enforced() {
        let mesh = create_grid_mesh(2);
        let weights = CotangentWeights::build(&mesh).unwrap();
        let fixed = left_column(2);
        let roles = Classification::new(mesh.num_vertices(), &fixed).unwrap();
        let targets: Vec<_> = fixed
            .iter()
            .map(|&v| mesh.position(v) + Vector3::new(0.0, 0.0, 1.0e6))
            .collect();

        // A negative threshold cannot be met by any solve.
        let result = naive_laplacian(
            &FaerSolver::default(),
            &weights,
            &roles,
            mesh.positions(),
            &targets,
            -1.0,
        );
        assert!(matches!(result, Err(ArapError::NumericalDivergence { axis: 0, .. })));
    }
}
