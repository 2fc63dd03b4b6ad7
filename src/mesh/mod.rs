//! Core mesh data structures.
//!
//! The deformation solver works on a plain face-vertex representation:
//! [`TriMesh`] stores the vertex positions and the triangle list, and
//! [`Classification`] splits its vertices into fixed (user-pinned) and free
//! (solved) sets.
//!
//! # Construction
//!
//! ```
//! use arap_deform::mesh::{build_from_triangles, Classification};
//! use nalgebra::Point3;
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let faces = vec![[0, 1, 2]];
//!
//! let mesh = build_from_triangles(&vertices, &faces).unwrap();
//! let roles = Classification::new(mesh.num_vertices(), &[0, 1]).unwrap();
//! assert_eq!(roles.free(), &[2]);
//! ```

mod classify;
mod trimesh;

pub use classify::{Classification, VertexInfo, VertexRole};
pub use trimesh::{build_from_triangles, TriMesh};
