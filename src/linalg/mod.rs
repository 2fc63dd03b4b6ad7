//! Linear-algebra building blocks used by the deformation solver.
//!
//! - [`CsrMatrix`]: sparse matrix assembled from triplets
//! - [`LinearSolver`] / [`Factorization`]: factorize once, solve many times
//!   ([`FaerSolver`] for sparse systems, [`DenseSolver`] as a small-system
//!   reference)
//! - [`nearest_rotation`]: closed-form 3×3 polar rotation

mod polar;
mod solver;
mod sparse;

pub use polar::nearest_rotation;
pub use solver::{
    DenseFactor, DenseSolver, FactorMethod, FaerFactor, FaerSolver, Factorization, LinearSolver,
};
pub use sparse::CsrMatrix;
