//! # arap-deform
//!
//! As-rigid-as-possible (ARAP) deformation of triangle meshes.
//!
//! Pick a set of fixed vertices, give each a target position, and the solver
//! moves every other vertex so that the surface bends without stretching.
//! It alternates between fitting a rotation to every vertex neighborhood and
//! solving one prefactorized sparse system for the free positions.
//!
//! ## Features
//!
//! - **Cotangent Laplacian**: weights and adjacency built in one pass over faces
//! - **Sparse direct solves**: faer Cholesky or LU, factorized once and reused
//! - **Naive Laplacian editing**: initial guess with a residual check
//! - **Resumable sessions**: step iterations yourself or use the [`deform`](algo::deform::deform) driver
//! - **File formats**: OBJ, OFF, PLY and plain-text constraint files
//!
//! ## Quick Start
//!
//! ```no_run
//! use arap_deform::prelude::*;
//!
//! let mesh = arap_deform::io::load("model.obj").unwrap();
//! let constraints = arap_deform::io::constraints::load("handles.txt", &mesh).unwrap();
//!
//! let result = deform(
//!     &mesh,
//!     &constraints.fixed,
//!     &constraints.targets,
//!     &ArapOptions::default().with_iterations(20),
//!     &Progress::none(),
//! )
//! .unwrap();
//!
//! let deformed = mesh.with_positions(result.positions).unwrap();
//! arap_deform::io::save(&deformed, "deformed.obj").unwrap();
//! ```
//!
//! ## Stepping the Solver
//!
//! ```
//! use arap_deform::prelude::*;
//!
//! // A 2 x 1 strip of four triangles.
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(2.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(2.0, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 4], [0, 4, 3], [1, 2, 5], [1, 5, 4]];
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//!
//! // Pin the left edge, lift the right edge.
//! let fixed = [0, 3, 2, 5];
//! let targets = [
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//!     Point3::new(1.8, 0.0, 0.8),
//!     Point3::new(1.8, 1.0, 0.8),
//! ];
//!
//! let mut solver = ArapSolver::new(mesh, &fixed).unwrap();
//! solver.precompute().unwrap();
//! solver.solve_preprocess(&targets).unwrap();
//! for _ in 0..5 {
//!     solver.solve_one_iteration().unwrap();
//! }
//! let energy = solver.compute_energy().unwrap();
//! assert!(energy.total().is_finite());
//! assert_eq!(solver.current_positions().unwrap()[2], targets[2]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod io;
pub mod linalg;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use arap_deform::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::deform::{deform, ArapOptions, ArapSolver, DeformResult, Energy};
    pub use crate::algo::Progress;
    pub use crate::error::{ArapError, Result};
    pub use crate::linalg::{FactorMethod, FaerSolver};
    pub use crate::mesh::{build_from_triangles, Classification, TriMesh, VertexRole};
    pub use nalgebra::Point3;
}

// Re-export nalgebra types for convenience
pub use nalgebra;
