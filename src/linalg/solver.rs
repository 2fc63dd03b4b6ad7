//! Sparse direct solvers.
//!
//! A [`LinearSolver`] turns a square [`CsrMatrix`] into a factorization
//! handle once; the handle then solves any number of multi-column right-hand
//! sides without refactorizing.
//!
//! ## Workflow
//! 1. `factorize(matrix)` — symbolic analysis + numeric factorization
//! 2. `solve(rhs)` — forward/backward substitution on the cached factors
//! 3. Repeat `solve()` with different right-hand sides

use std::panic::{self, AssertUnwindSafe};

use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::{Llt, Lu, SymbolicLlt, SymbolicLu};
use faer::sparse::{SparseColMat, Triplet};
use faer::{Mat, Side};
use nalgebra::DMatrix;

use super::sparse::CsrMatrix;
use crate::error::{ArapError, Result};

/// A factorized square system.
pub trait Factorization {
    /// Dimension of the factorized system.
    fn dim(&self) -> usize;

    /// Solve `A X = B` for every column of `rhs`.
    ///
    /// `system` names the caller's system in errors.
    fn solve(&self, rhs: &DMatrix<f64>, system: &'static str) -> Result<DMatrix<f64>>;
}

/// Factorizes sparse square matrices.
pub trait LinearSolver {
    /// Handle produced by [`LinearSolver::factorize`].
    type Factor: Factorization;

    /// Factorize `matrix`. `system` names the caller's system in errors.
    fn factorize(&self, matrix: &CsrMatrix, system: &'static str) -> Result<Self::Factor>;
}

/// Factorization used by [`FaerSolver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactorMethod {
    /// Supernodal LLᵀ. Requires a symmetric positive definite matrix.
    #[default]
    Cholesky,
    /// LU with partial pivoting. Works for any nonsingular matrix.
    Lu,
}

/// Sparse direct solver backed by `faer`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaerSolver {
    method: FactorMethod,
}

impl FaerSolver {
    /// Create a solver using the given factorization.
    pub fn new(method: FactorMethod) -> Self {
        Self { method }
    }

    /// The configured factorization.
    pub fn method(&self) -> FactorMethod {
        self.method
    }

    /// Convert our CSR matrix to faer's CSC matrix.
    fn to_csc(matrix: &CsrMatrix, system: &'static str) -> Result<SparseColMat<usize, f64>> {
        let triplets: Vec<Triplet<usize, usize, f64>> = matrix
            .triplets()
            .map(|(row, col, val)| Triplet { row, col, val })
            .collect();

        SparseColMat::try_new_from_triplets(matrix.nrows(), matrix.ncols(), &triplets).map_err(
            |e| ArapError::Factorization {
                system,
                message: format!("could not build CSC matrix: {e:?}"),
            },
        )
    }
}

/// Factors produced by [`FaerSolver`].
pub enum FaerFactor {
    /// Cholesky factors.
    Llt {
        /// Supernodal LLᵀ factors.
        factor: Llt<usize, f64>,
        /// Matrix dimension.
        dim: usize,
    },
    /// LU factors.
    Lu {
        /// Sparse LU factors.
        factor: Lu<usize, f64>,
        /// Matrix dimension.
        dim: usize,
    },
}

impl std::fmt::Debug for FaerFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (kind, dim) = match self {
            FaerFactor::Llt { dim, .. } => ("Llt", dim),
            FaerFactor::Lu { dim, .. } => ("Lu", dim),
        };
        f.debug_struct("FaerFactor")
            .field("kind", &kind)
            .field("dim", dim)
            .finish_non_exhaustive()
    }
}

impl LinearSolver for FaerSolver {
    type Factor = FaerFactor;

    fn factorize(&self, matrix: &CsrMatrix, system: &'static str) -> Result<FaerFactor> {
        check_square(matrix, system)?;
        let dim = matrix.nrows();
        let csc = Self::to_csc(matrix, system)?;
        let fail = |stage: &str, e: &dyn std::fmt::Debug| ArapError::Factorization {
            system,
            message: format!("{stage} failed: {e:?}"),
        };

        match self.method {
            FactorMethod::Cholesky => {
                let symbolic = SymbolicLlt::try_new(csc.symbolic(), Side::Lower)
                    .map_err(|e| fail("symbolic analysis", &e))?;
                let factor = Llt::try_new_with_symbolic(symbolic, csc.as_ref(), Side::Lower)
                    .map_err(|e| fail("Cholesky factorization", &e))?;
                Ok(FaerFactor::Llt { factor, dim })
            }
            FactorMethod::Lu => {
                let symbolic =
                    SymbolicLu::try_new(csc.symbolic()).map_err(|e| fail("symbolic analysis", &e))?;
                // faer panics on an exactly zero pivot rather than returning an error.
                let numeric = panic::catch_unwind(AssertUnwindSafe(|| {
                    Lu::try_new_with_symbolic(symbolic, csc.as_ref())
                }))
                .map_err(|_| ArapError::Factorization {
                    system,
                    message: "LU factorization failed: zero pivot, matrix is singular".to_string(),
                })?;
                let factor = numeric.map_err(|e| fail("LU factorization", &e))?;
                Ok(FaerFactor::Lu { factor, dim })
            }
        }
    }
}

impl Factorization for FaerFactor {
    fn dim(&self) -> usize {
        match self {
            FaerFactor::Llt { dim, .. } | FaerFactor::Lu { dim, .. } => *dim,
        }
    }

    fn solve(&self, rhs: &DMatrix<f64>, system: &'static str) -> Result<DMatrix<f64>> {
        check_rhs(self.dim(), rhs, system)?;

        let b = Mat::<f64>::from_fn(rhs.nrows(), rhs.ncols(), |i, j| rhs[(i, j)]);
        let x = match self {
            FaerFactor::Llt { factor, .. } => factor.solve(&b),
            FaerFactor::Lu { factor, .. } => factor.solve(&b),
        };

        let solution = DMatrix::from_fn(rhs.nrows(), rhs.ncols(), |i, j| x[(i, j)]);
        check_finite(solution, system)
    }
}

/// Dense LU solver backed by `nalgebra`.
///
/// Densifies the matrix, so it is only suitable for small systems. Useful as
/// a reference when checking a sparse backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseSolver;

const PIVOT_TOLERANCE: f64 = 1e-12;

/// Factors produced by [`DenseSolver`].
#[derive(Debug, Clone)]
pub struct DenseFactor {
    lu: nalgebra::LU<f64, nalgebra::Dyn, nalgebra::Dyn>,
}

impl LinearSolver for DenseSolver {
    type Factor = DenseFactor;

    fn factorize(&self, matrix: &CsrMatrix, system: &'static str) -> Result<DenseFactor> {
        check_square(matrix, system)?;
        let lu = matrix.to_dense().lu();

        // Pivots that vanish relative to the largest one mean a singular matrix.
        let pivots = lu.u().diagonal().map(f64::abs);
        let (smallest, largest) = (pivots.min(), pivots.max());
        if !(smallest > PIVOT_TOLERANCE * largest) {
            return Err(ArapError::Factorization {
                system,
                message: format!("matrix is singular (pivot ratio {:e})", smallest / largest),
            });
        }
        Ok(DenseFactor { lu })
    }
}

impl Factorization for DenseFactor {
    fn dim(&self) -> usize {
        self.lu.l().nrows()
    }

    fn solve(&self, rhs: &DMatrix<f64>, system: &'static str) -> Result<DMatrix<f64>> {
        check_rhs(self.dim(), rhs, system)?;
        let solution = self.lu.solve(rhs).ok_or_else(|| ArapError::Solve {
            system,
            message: "matrix is singular".to_string(),
        })?;
        check_finite(solution, system)
    }
}

fn check_square(matrix: &CsrMatrix, system: &'static str) -> Result<()> {
    if matrix.nrows() != matrix.ncols() {
        return Err(ArapError::Factorization {
            system,
            message: format!("matrix must be square, got {}×{}", matrix.nrows(), matrix.ncols()),
        });
    }
    if matrix.nrows() == 0 {
        return Err(ArapError::Factorization {
            system,
            message: "cannot factorize an empty matrix".to_string(),
        });
    }
    Ok(())
}

fn check_rhs(dim: usize, rhs: &DMatrix<f64>, system: &'static str) -> Result<()> {
    if rhs.nrows() != dim {
        return Err(ArapError::Solve {
            system,
            message: format!("rhs has {} rows, system has dimension {}", rhs.nrows(), dim),
        });
    }
    Ok(())
}

fn check_finite(solution: DMatrix<f64>, system: &'static str) -> Result<DMatrix<f64>> {
    if solution.iter().all(|v| v.is_finite()) {
        Ok(solution)
    } else {
        Err(ArapError::Solve {
            system,
            message: "solution contains non-finite values".to_string(),
        })
    }
}
