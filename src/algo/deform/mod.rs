//! As-Rigid-As-Possible (ARAP) surface deformation.
//!
//! Given a triangle mesh and target positions for a set of fixed vertices,
//! ARAP moves the remaining vertices so that every one-ring deforms as
//! rigidly as possible. The algorithm alternates between:
//! 1. **Local step**: fit a rotation to each vertex's one-ring
//! 2. **Global step**: solve the prefactorized cotangent Laplacian system for
//!    the free vertex positions
//!
//! The iterations start from a naive Laplacian editing solution.
//!
//! # Example
//!
//! ```
//! use arap_deform::prelude::*;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mesh = build_from_triangles(&vertices, &[[0, 1, 2], [0, 2, 3]]).unwrap();
//!
//! let targets = [Point3::new(0.0, 0.0, 0.0), Point3::new(0.9, 0.3, 0.0)];
//! let result = deform(&mesh, &[0, 1], &targets, &ArapOptions::default(), &Progress::none()).unwrap();
//! assert_eq!(result.positions[1], targets[1]);
//! ```
//!
//! # References
//!
//! - Sorkine, O., & Alexa, M. (2007). "As-Rigid-As-Possible Surface
//!   Modeling." SGP 2007.

mod energy;
mod initial_guess;
mod laplacian;
mod rotation;
mod solver;
mod weights;

pub use energy::{arap_energy, Energy, TOTAL};
pub use initial_guess::naive_laplacian;
pub use laplacian::free_laplacian;
pub use rotation::{edge_covariance, fit_rotations};
pub use solver::ArapSolver;
pub use weights::{face_cotangents, CotangentWeights};

use log::{debug, info, warn};
use nalgebra::{DMatrix, Point3};

use crate::algo::Progress;
use crate::error::{ArapError, Result};
use crate::linalg::{FactorMethod, FaerSolver};
use crate::mesh::TriMesh;

/// Default bound on the squared residual of the initial guess.
pub const DEFAULT_RESIDUAL_THRESHOLD: f64 = 1e-6;

/// Options for [`deform`].
#[derive(Debug, Clone)]
pub struct ArapOptions {
    /// Maximum number of local/global iterations.
    pub max_iterations: usize,

    /// Stop once `|E_prev − E| ≤ energy_tolerance · max(E, 1)`.
    pub energy_tolerance: f64,

    /// Bound on `‖AᵗA x − Aᵗb‖²` per axis for the initial guess.
    pub residual_threshold: f64,

    /// Sparse factorization for the system matrices.
    pub factor_method: FactorMethod,
}

impl Default for ArapOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            energy_tolerance: 1e-8,
            residual_threshold: DEFAULT_RESIDUAL_THRESHOLD,
            factor_method: FactorMethod::Cholesky,
        }
    }
}

impl ArapOptions {
    /// Create options with the specified iteration cap.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    /// Set the relative energy tolerance.
    pub fn with_energy_tolerance(mut self, tolerance: f64) -> Self {
        self.energy_tolerance = tolerance;
        self
    }

    /// Set the initial guess residual threshold.
    pub fn with_residual_threshold(mut self, threshold: f64) -> Self {
        self.residual_threshold = threshold;
        self
    }

    /// Set the factorization method.
    pub fn with_factor_method(mut self, method: FactorMethod) -> Self {
        self.factor_method = method;
        self
    }

    /// Check that every option is usable.
    pub fn validate(&self) -> Result<()> {
        if !(self.energy_tolerance >= 0.0) {
            return Err(ArapError::invalid_param(
                "energy_tolerance",
                self.energy_tolerance,
                "must be non-negative",
            ));
        }
        if !(self.residual_threshold >= 0.0) {
            return Err(ArapError::invalid_param(
                "residual_threshold",
                self.residual_threshold,
                "must be non-negative",
            ));
        }
        Ok(())
    }
}

/// Output of [`deform`].
#[derive(Debug, Clone)]
pub struct DeformResult {
    /// Deformed position of every vertex.
    pub positions: Vec<Point3<f64>>,
    /// Energy of the initial guess followed by the energy after each iteration.
    pub energies: Vec<f64>,
    /// Number of iterations run.
    pub iterations: usize,
    /// Whether the energy tolerance was met before the iteration cap.
    pub converged: bool,
}

impl DeformResult {
    /// Energy of the returned positions.
    pub fn final_energy(&self) -> f64 {
        self.energies.last().copied().unwrap_or(0.0)
    }
}

/// Deform `mesh` so that `fixed[k]` lands on `targets[k]`.
///
/// Runs precompute, the initial guess, and local/global iterations until the
/// energy settles or `options.max_iterations` is reached. `progress` is
/// called after every iteration with `(iteration, max_iterations, energy)`.
///
/// # Errors
///
/// Any error from [`ArapSolver`], or [`ArapError::InvalidParameter`] for bad
/// options.
pub fn deform(
    mesh: &TriMesh,
    fixed: &[usize],
    targets: &[Point3<f64>],
    options: &ArapOptions,
    progress: &Progress,
) -> Result<DeformResult> {
    options.validate()?;
    info!(
        "ARAP: deforming {} vertices / {} faces with {} constraints",
        mesh.num_vertices(),
        mesh.num_faces(),
        fixed.len()
    );

    let backend = FaerSolver::new(options.factor_method);
    let mut solver = ArapSolver::with_solver(mesh.clone(), fixed, backend)?;
    solver.set_residual_threshold(options.residual_threshold)?;
    solver.precompute()?;
    solver.solve_preprocess(targets)?;

    let mut energy = solver.compute_energy()?.total();
    let mut energies = vec![energy];
    debug!("ARAP: initial guess energy {:.6e}", energy);

    let mut converged = false;
    for iteration in 0..options.max_iterations {
        solver.solve_one_iteration()?;
        let next = solver.compute_energy()?.total();
        energies.push(next);
        debug!("ARAP: iteration {} energy {:.6e}", iteration + 1, next);
        progress.report(iteration + 1, options.max_iterations, next);

        let delta = (energy - next).abs();
        energy = next;
        if delta <= options.energy_tolerance * energy.max(1.0) {
            converged = true;
            break;
        }
    }

    let iterations = solver.iterations();
    if converged {
        info!("ARAP: converged after {} iterations, energy {:.6e}", iterations, energy);
    } else if options.max_iterations > 0 {
        warn!(
            "ARAP: stopped at the iteration cap ({}) without converging, energy {:.6e}",
            options.max_iterations, energy
        );
    }

    Ok(DeformResult {
        positions: solver.into_positions(),
        energies,
        iterations,
        converged,
    })
}

/// Stack points into an `n × 3` matrix.
pub(crate) fn points_to_matrix(points: &[Point3<f64>]) -> DMatrix<f64> {
    DMatrix::from_fn(points.len(), 3, |i, axis| points[i][axis])
}

/// Row `i` of an `n × 3` matrix as a point.
pub(crate) fn matrix_row(m: &DMatrix<f64>, i: usize) -> Point3<f64> {
    Point3::new(m[(i, 0)], m[(i, 1)], m[(i, 2)])
}
