//! Mesh deformation algorithms.
//!
//! - **Deformation**: As-Rigid-As-Possible surface modeling with a naive
//!   Laplacian editing initial guess
//! - **Progress**: iteration callbacks for long-running solves

pub mod deform;
pub mod progress;

pub use progress::Progress;
