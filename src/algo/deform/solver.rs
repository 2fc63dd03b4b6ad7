//! The ARAP solver context.

use std::fmt;

use log::debug;
use nalgebra::{DMatrix, Matrix3, Point3};

use crate::error::{ArapError, Result};
use crate::linalg::{FaerSolver, Factorization, LinearSolver};
use crate::mesh::{Classification, TriMesh};

use super::energy::{arap_energy, Energy};
use super::initial_guess::naive_laplacian;
use super::laplacian::free_laplacian;
use super::rotation::fit_rotations;
use super::weights::CotangentWeights;
use super::{matrix_row, DEFAULT_RESIDUAL_THRESHOLD};

const SYSTEM: &str = "ARAP";

/// Per-session state created by [`ArapSolver::solve_preprocess`].
#[derive(Debug, Clone)]
struct Session {
    targets: Vec<Point3<f64>>,
    current: Vec<Point3<f64>>,
    rotations: Vec<Matrix3<f64>>,
    iterations: usize,
}

/// State of one ARAP deformation problem.
///
/// The solver owns the mesh and its fixed/free partition. Use it in three
/// phases:
///
/// 1. [`precompute`](Self::precompute) builds the cotangent weights and
///    factorizes the free × free system once.
/// 2. [`solve_preprocess`](Self::solve_preprocess) takes one target per fixed
///    vertex and computes the initial guess. Call it again to start a new
///    session with different targets; the factorization is reused.
/// 3. [`solve_one_iteration`](Self::solve_one_iteration) runs one local/global
///    pass. [`compute_energy`](Self::compute_energy) reports the distortion.
///
/// Calling a phase before its prerequisite returns
/// [`ArapError::InvalidState`].
///
/// # Example
///
/// ```
/// use arap_deform::prelude::*;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
///
/// let mut solver = ArapSolver::new(mesh, &[0, 1]).unwrap();
/// solver.precompute().unwrap();
/// solver
///     .solve_preprocess(&[Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.5)])
///     .unwrap();
///
/// let before = solver.compute_energy().unwrap().total();
/// solver.solve_one_iteration().unwrap();
/// let after = solver.compute_energy().unwrap().total();
/// assert!(after <= before + 1e-12);
/// ```
pub struct ArapSolver<S: LinearSolver = FaerSolver> {
    mesh: TriMesh,
    roles: Classification,
    solver: S,
    residual_threshold: f64,
    weights: Option<CotangentWeights>,
    factor: Option<S::Factor>,
    session: Option<Session>,
}

impl ArapSolver<FaerSolver> {
    /// Create a solver backed by faer's sparse Cholesky factorization.
    ///
    /// # Errors
    ///
    /// See [`ArapSolver::with_solver`].
    pub fn new(mesh: TriMesh, fixed: &[usize]) -> Result<Self> {
        Self::with_solver(mesh, fixed, FaerSolver::default())
    }
}

impl<S: LinearSolver> ArapSolver<S> {
    /// Create a solver with a custom linear solver backend.
    ///
    /// `fixed` lists the constrained vertices; row `k` of every target table
    /// passed to [`solve_preprocess`](Self::solve_preprocess) belongs to
    /// `fixed[k]`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if `fixed` is empty, contains an
    /// out-of-range index or lists a vertex twice.
    pub fn with_solver(mesh: TriMesh, fixed: &[usize], solver: S) -> Result<Self> {
        if fixed.is_empty() {
            return Err(ArapError::NoFixedVertices);
        }
        let roles = Classification::new(mesh.num_vertices(), fixed)?;

        Ok(Self {
            mesh,
            roles,
            solver,
            residual_threshold: DEFAULT_RESIDUAL_THRESHOLD,
            weights: None,
            factor: None,
            session: None,
        })
    }

    /// Set the residual bound checked after the initial guess.
    ///
    /// # Errors
    ///
    /// Returns [`ArapError::InvalidParameter`] for negative or NaN values.
    pub fn set_residual_threshold(&mut self, threshold: f64) -> Result<()> {
        if !(threshold >= 0.0) {
            return Err(ArapError::invalid_param(
                "residual_threshold",
                threshold,
                "must be non-negative",
            ));
        }
        self.residual_threshold = threshold;
        Ok(())
    }

    /// Build the cotangent weights and factorize the free × free Laplacian.
    ///
    /// Runs once; later calls are no-ops.
    ///
    /// # Errors
    ///
    /// - [`ArapError::ZeroAreaFace`] for a degenerate triangle
    /// - [`ArapError::NoFreeVertices`] if every vertex is fixed
    /// - [`ArapError::Factorization`] if the system is singular, e.g. a
    ///   connected component without any fixed vertex
    pub fn precompute(&mut self) -> Result<()> {
        if self.factor.is_some() {
            return Ok(());
        }

        let weights = CotangentWeights::build(&self.mesh)?;
        let l_ff = free_laplacian(&weights, &self.roles)?;
        debug!(
            "{SYSTEM}: {} vertices ({} fixed, {} free), system {}x{} with {} nonzeros",
            self.mesh.num_vertices(),
            self.num_fixed(),
            self.num_free(),
            l_ff.nrows(),
            l_ff.ncols(),
            l_ff.nnz()
        );
        let factor = self.solver.factorize(&l_ff, SYSTEM)?;

        self.weights = Some(weights);
        self.factor = Some(factor);
        Ok(())
    }

    /// Start a deformation session.
    ///
    /// Computes the naive Laplacian solution as the initial position table,
    /// with fixed rows set to `targets`, and fits the initial rotations.
    /// Any previous session is replaced only if this call succeeds.
    ///
    /// # Errors
    ///
    /// - [`ArapError::InvalidState`] before [`precompute`](Self::precompute)
    /// - [`ArapError::TargetCountMismatch`] if `targets` does not have one row
    ///   per fixed vertex
    /// - [`ArapError::NumericalDivergence`] if the initial solve is inaccurate
    pub fn solve_preprocess(&mut self, targets: &[Point3<f64>]) -> Result<()> {
        let weights = self.weights.as_ref().ok_or_else(|| {
            ArapError::InvalidState("solve_preprocess called before precompute".into())
        })?;
        if targets.len() != self.num_fixed() {
            return Err(ArapError::TargetCountMismatch {
                expected: self.num_fixed(),
                actual: targets.len(),
            });
        }

        let current = naive_laplacian(
            &self.solver,
            weights,
            &self.roles,
            self.mesh.positions(),
            targets,
            self.residual_threshold,
        )?;
        let rotations = fit_rotations(weights, self.mesh.positions(), &current);

        self.session = Some(Session {
            targets: targets.to_vec(),
            current,
            rotations,
            iterations: 0,
        });
        Ok(())
    }

    /// Run one local/global iteration.
    ///
    /// Fits a rotation per vertex to the current positions, then solves the
    /// factorized system for the free vertices. Fixed rows are never touched.
    /// On error the session is left as it was.
    ///
    /// # Errors
    ///
    /// - [`ArapError::InvalidState`] before [`solve_preprocess`](Self::solve_preprocess)
    /// - [`ArapError::Solve`] if the backend fails or produces non-finite values
    pub fn solve_one_iteration(&mut self) -> Result<()> {
        let (weights, factor, session) = match (&self.weights, &self.factor, &mut self.session) {
            (Some(w), Some(f), Some(s)) => (w, f, s),
            _ => {
                return Err(ArapError::InvalidState(
                    "solve_one_iteration called before solve_preprocess".into(),
                ))
            }
        };
        let original = self.mesh.positions();

        let rotations = fit_rotations(weights, original, &session.current);
        let rhs = global_rhs(weights, &self.roles, original, &session.current, &rotations);
        let solution = factor.solve(&rhs, SYSTEM)?;

        for (i, &v) in self.roles.free().iter().enumerate() {
            session.current[v] = matrix_row(&solution, i);
        }
        session.rotations = rotations;
        session.iterations += 1;
        Ok(())
    }

    /// ARAP energy of the current positions and rotations.
    ///
    /// Pure: calling it twice without an iteration in between returns the
    /// same value.
    ///
    /// # Errors
    ///
    /// Returns [`ArapError::InvalidState`] before
    /// [`solve_preprocess`](Self::solve_preprocess).
    pub fn compute_energy(&self) -> Result<Energy> {
        match (&self.weights, &self.session) {
            (Some(weights), Some(session)) => Ok(arap_energy(
                weights,
                self.mesh.positions(),
                &session.current,
                &session.rotations,
            )),
            _ => Err(ArapError::InvalidState(
                "compute_energy called before solve_preprocess".into(),
            )),
        }
    }

    /// The undeformed mesh.
    #[inline]
    pub fn mesh(&self) -> &TriMesh {
        &self.mesh
    }

    /// The fixed/free partition.
    #[inline]
    pub fn classification(&self) -> &Classification {
        &self.roles
    }

    /// Number of free vertices.
    #[inline]
    pub fn num_free(&self) -> usize {
        self.roles.free().len()
    }

    /// Number of fixed vertices.
    #[inline]
    pub fn num_fixed(&self) -> usize {
        self.roles.fixed().len()
    }

    /// Cotangent weights, once precomputed.
    #[inline]
    pub fn weights(&self) -> Option<&CotangentWeights> {
        self.weights.as_ref()
    }

    /// Fixed targets of the current session.
    pub fn targets(&self) -> Option<&[Point3<f64>]> {
        self.session.as_ref().map(|s| s.targets.as_slice())
    }

    /// Deformed positions of the current session.
    pub fn current_positions(&self) -> Option<&[Point3<f64>]> {
        self.session.as_ref().map(|s| s.current.as_slice())
    }

    /// Per-vertex rotations of the current session.
    pub fn rotations(&self) -> Option<&[Matrix3<f64>]> {
        self.session.as_ref().map(|s| s.rotations.as_slice())
    }

    /// Iterations run since the last [`solve_preprocess`](Self::solve_preprocess).
    pub fn iterations(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.iterations)
    }

    /// Consume the solver, returning the deformed positions, or the original
    /// ones if no session was started.
    pub fn into_positions(self) -> Vec<Point3<f64>> {
        match self.session {
            Some(session) => session.current,
            None => self.mesh.positions().to_vec(),
        }
    }
}

/// Right-hand side of the global step, one row per free vertex:
/// `Σ_j (w_ij / 2)(R_i + R_j)(p_i − p_j)`, plus `w_ij p'_j` for every fixed
/// neighbor `j`.
fn global_rhs(
    weights: &CotangentWeights,
    roles: &Classification,
    original: &[Point3<f64>],
    current: &[Point3<f64>],
    rotations: &[Matrix3<f64>],
) -> DMatrix<f64> {
    let free = roles.free();
    let mut rhs = DMatrix::zeros(free.len(), 3);

    for (i, &v) in free.iter().enumerate() {
        let mut row = nalgebra::Vector3::zeros();
        for &(j, w) in weights.neighbors(v) {
            row += (w / 2.0) * (rotations[v] + rotations[j]) * (original[v] - original[j]);
            if roles.is_fixed(j) {
                row += w * current[j].coords;
            }
        }
        for axis in 0..3 {
            rhs[(i, axis)] = row[axis];
        }
    }

    rhs
}

impl<S> Clone for ArapSolver<S>
where
    S: LinearSolver + Clone,
    S::Factor: Clone,
{
    fn clone(&self) -> Self {
        Self {
            mesh: self.mesh.clone(),
            roles: self.roles.clone(),
            solver: self.solver.clone(),
            residual_threshold: self.residual_threshold,
            weights: self.weights.clone(),
            factor: self.factor.clone(),
            session: self.session.clone(),
        }
    }
}

impl<S: LinearSolver> fmt::Debug for ArapSolver<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArapSolver")
            .field("num_vertices", &self.mesh.num_vertices())
            .field("num_fixed", &self.num_fixed())
            .field("num_free", &self.num_free())
            .field("precomputed", &self.factor.is_some())
            .field("iterations", &self.iterations())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::linalg::{DenseSolver, FactorMethod};
    use crate::mesh::build_from_triangles;
    use nalgebra::{Rotation3, Vector3};

    fn create_square() -> TriMesh {
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap()
    }

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

    /// Left column pinned in place, right column lifted by `lift`.
    fn grid_problem(n: usize, lift: f64) -> (TriMesh, Vec<usize>, Vec<Point3<f64>>) {
        let mesh = create_grid_mesh(n);
        let left = (0..=n).map(|j| j * (n + 1));
        let right = (0..=n).map(|j| j * (n + 1) + n);
        let fixed: Vec<usize> = left.chain(right).collect();
        let targets = fixed
            .iter()
            .map(|&v| {
                let p = *mesh.position(v);
                if v % (n + 1) == n {
                    p + Vector3::new(0.0, 0.0, lift)
                } else {
                    p
                }
            })
            .collect();
        (mesh, fixed, targets)
    }

    #[test]
    fn test_fixed_rows_bit_exact() {
        let (mesh, fixed, targets) = grid_problem(4, 1.3);
        let mut solver = ArapSolver::new(mesh, &fixed).unwrap();
        solver.precompute().unwrap();
        solver.solve_preprocess(&targets).unwrap();

        for _ in 0..5 {
            let positions = solver.current_positions().unwrap();
            for (k, &v) in fixed.iter().enumerate() {
                assert_eq!(positions[v], targets[k]);
            }
            solver.solve_one_iteration().unwrap();
        }
        assert_eq!(solver.iterations(), 5);
    }

    #[test]
    fn test_energy_is_pure() {
        let (mesh, fixed, targets) = grid_problem(3, 0.8);
        let mut solver = ArapSolver::new(mesh, &fixed).unwrap();
        solver.precompute().unwrap();
        solver.solve_preprocess(&targets).unwrap();
        solver.solve_one_iteration().unwrap();

        let a = solver.compute_energy().unwrap();
        let b = solver.compute_energy().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_square_one_iteration_decreases_energy() {
        let q = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.3);
        let mesh = create_square();
        let targets = vec![q * mesh.position(0), q * mesh.position(1)];

        let mut solver = ArapSolver::new(mesh, &[0, 1]).unwrap();
        solver.precompute().unwrap();
        solver.solve_preprocess(&targets).unwrap();

        let e0 = solver.compute_energy().unwrap().total();
        solver.solve_one_iteration().unwrap();
        let e1 = solver.compute_energy().unwrap().total();

        assert!(e0 > 1e-12, "initial guess should be distorted, got {}", e0);
        assert!(e1.is_finite());
        assert!(e1 >= 0.0);
        assert!(e1 < e0, "energy went from {} to {}", e0, e1);
    }

    #[test]
    fn test_energy_non_increasing_on_grid() {
        let (mesh, fixed, targets) = grid_problem(5, 2.0);
        let mut solver = ArapSolver::new(mesh, &fixed).unwrap();
        solver.precompute().unwrap();
        solver.solve_preprocess(&targets).unwrap();

        let mut previous = solver.compute_energy().unwrap().total();
        for iteration in 0..15 {
            solver.solve_one_iteration().unwrap();
            let energy = solver.compute_energy().unwrap().total();
            assert!(
                energy <= previous + 1e-10 * previous.max(1.0),
                "iteration {}: energy rose from {} to {}",
                iteration,
                previous,
                energy
            );
            previous = energy;
        }
    }

    #[test]
    fn test_translation_has_zero_energy() {
        let mesh = create_grid_mesh(3);
        let offset = Vector3::new(0.3, -1.0, 2.0);
        let fixed = vec![0, 3, 12, 15];
        let targets: Vec<_> = fixed.iter().map(|&v| mesh.position(v) + offset).collect();

        let mut solver = ArapSolver::new(mesh.clone(), &fixed).unwrap();
        solver.precompute().unwrap();
        solver.solve_preprocess(&targets).unwrap();
        assert!(solver.compute_energy().unwrap().total() < 1e-16);

        solver.solve_one_iteration().unwrap();
        assert!(solver.compute_energy().unwrap().total() < 1e-16);
        for (p, q) in solver.current_positions().unwrap().iter().zip(mesh.positions()) {
            assert!((p - (q + offset)).norm() < 1e-9);
        }
        for r in solver.rotations().unwrap() {
            assert!((r - Matrix3::identity()).norm() < 1e-9);
        }
    }

    #[test]
    fn test_rigid_rotation_is_recovered() {
        // Everything but the center vertex follows a rigid motion; the center
        // must follow it too.
        let mesh = create_grid_mesh(2);
        let q = Rotation3::from_axis_angle(&Vector3::x_axis(), 0.4);
        let t = Vector3::new(0.0, 1.0, -0.5);
        let fixed: Vec<usize> = (0..9).filter(|&v| v != 4).collect();
        let targets: Vec<_> = fixed.iter().map(|&v| q * mesh.position(v) + t).collect();

        let mut solver = ArapSolver::new(mesh.clone(), &fixed).unwrap();
        solver.precompute().unwrap();
        solver.solve_preprocess(&targets).unwrap();
        for _ in 0..100 {
            solver.solve_one_iteration().unwrap();
        }

        let center = solver.current_positions().unwrap()[4];
        assert!((center - (q * mesh.position(4) + t)).norm() < 1e-6);
        assert!(solver.compute_energy().unwrap().total() < 1e-8);
        for r in solver.rotations().unwrap() {
            assert!((r - q.matrix()).norm() < 1e-5);
        }
    }

    #[test]
    fn test_backends_agree() {
        let (mesh, fixed, targets) = grid_problem(3, 1.0);

        let mut cholesky = ArapSolver::new(mesh.clone(), &fixed).unwrap();
        let mut lu =
            ArapSolver::with_solver(mesh.clone(), &fixed, FaerSolver::new(FactorMethod::Lu)).unwrap();
        let mut dense = ArapSolver::with_solver(mesh, &fixed, DenseSolver).unwrap();

        cholesky.precompute().unwrap();
        lu.precompute().unwrap();
        dense.precompute().unwrap();
        cholesky.solve_preprocess(&targets).unwrap();
        lu.solve_preprocess(&targets).unwrap();
        dense.solve_preprocess(&targets).unwrap();
        for _ in 0..3 {
            cholesky.solve_one_iteration().unwrap();
            lu.solve_one_iteration().unwrap();
            dense.solve_one_iteration().unwrap();
        }

        let reference = dense.current_positions().unwrap();
        for other in [cholesky.current_positions().unwrap(), lu.current_positions().unwrap()] {
            for (a, b) in other.iter().zip(reference) {
                assert!((a - b).norm() < 1e-8);
            }
        }
    }

    #[test]
    fn test_new_session_reuses_factorization() {
        let (mesh, fixed, targets) = grid_problem(3, 1.0);
        let mut solver = ArapSolver::new(mesh.clone(), &fixed).unwrap();
        solver.precompute().unwrap();
        solver.solve_preprocess(&targets).unwrap();
        solver.solve_one_iteration().unwrap();

        // Back to the rest pose: the mesh itself is the solution.
        let rest: Vec<_> = fixed.iter().map(|&v| *mesh.position(v)).collect();
        solver.solve_preprocess(&rest).unwrap();
        assert_eq!(solver.iterations(), 0);
        for (p, q) in solver.current_positions().unwrap().iter().zip(mesh.positions()) {
            assert!((p - q).norm() < 1e-9);
        }
    }

    #[test]
    fn test_clone_is_independent() {
        let (mesh, fixed, targets) = grid_problem(3, 1.0);
        let mut solver = ArapSolver::with_solver(mesh, &fixed, DenseSolver).unwrap();
        solver.precompute().unwrap();
        solver.solve_preprocess(&targets).unwrap();

        let mut copy = solver.clone();
        copy.solve_one_iteration().unwrap();
        assert_eq!(solver.iterations(), 0);
        assert_eq!(copy.iterations(), 1);
    }

    #[test]
    fn test_out_of_order_calls() {
        let mut solver = ArapSolver::new(create_square(), &[0]).unwrap();

        let err = solver.solve_preprocess(&[Point3::origin()]).unwrap_err();
        assert!(matches!(err, ArapError::InvalidState(_)));
        assert!(matches!(solver.solve_one_iteration(), Err(ArapError::InvalidState(_))));
        assert!(matches!(solver.compute_energy(), Err(ArapError::InvalidState(_))));

        solver.precompute().unwrap();
        assert!(matches!(solver.solve_one_iteration(), Err(ArapError::InvalidState(_))));
        assert!(matches!(solver.compute_energy(), Err(ArapError::InvalidState(_))));
    }

    #[test]
    fn test_configuration_errors() {
        assert!(matches!(
            ArapSolver::new(create_square(), &[]),
            Err(ArapError::NoFixedVertices)
        ));
        assert!(matches!(
            ArapSolver::new(create_square(), &[0, 7]),
            Err(ArapError::InvalidFixedVertex { vertex: 7, num_vertices: 4 })
        ));
        assert!(matches!(
            ArapSolver::new(create_square(), &[2, 2]),
            Err(ArapError::DuplicateFixedVertex { vertex: 2 })
        ));

        let mut all_fixed = ArapSolver::new(create_square(), &[0, 1, 2, 3]).unwrap();
        assert!(matches!(all_fixed.precompute(), Err(ArapError::NoFreeVertices)));

        let mut solver = ArapSolver::new(create_square(), &[0, 1]).unwrap();
        solver.precompute().unwrap();
        let err = solver.solve_preprocess(&[Point3::origin()]).unwrap_err();
        assert!(matches!(err, ArapError::TargetCountMismatch { expected: 2, actual: 1 }));
        assert!(err.is_configuration());

        assert!(solver.set_residual_threshold(-1.0).is_err());
        assert!(solver.set_residual_threshold(f64::NAN).is_err());
    }

    #[test]
    fn test_unconstrained_component_fails_to_factorize() {
        // Two disjoint triangles, only the first one pinned.
        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(5.0, 0.0, 0.0),
            Point3::new(6.0, 0.0, 0.0),
            Point3::new(5.0, 1.0, 0.0),
        ];
        let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [3, 4, 5]]).unwrap();

        fn precompute_with<S: LinearSolver>(mesh: &TriMesh, solver: S) -> Result<()> {
            ArapSolver::with_solver(mesh.clone(), &[0], solver)?.precompute()
        }

        let results = [
            ("cholesky", precompute_with(&mesh, FaerSolver::default())),
            ("lu", precompute_with(&mesh, FaerSolver::new(FactorMethod::Lu))),
            ("dense", precompute_with(&mesh, DenseSolver)),
        ];
        for (name, result) in results {
            assert!(
                matches!(result, Err(ArapError::Factorization { system: "ARAP", .. })),
                "{}: {:?}",
                name,
                result
            );
        }
    }

    #[test]
    fn test_into_positions() {
        let mesh = create_square();
        let solver = ArapSolver::new(mesh.clone(), &[0]).unwrap();
        assert_eq!(solver.into_positions(), mesh.positions().to_vec());
    }
}
