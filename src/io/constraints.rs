//! Constraint files: which vertices are fixed and where they go.
//!
//! One constraint per line:
//!
//! ```text
//! # vertex  x     y     z
//! 0         0.0   0.0   0.0
//! 17        1.5   0.2   3.0
//! 42                          # pinned where it is
//! ```
//!
//! A line holding only a vertex index pins that vertex at its original
//! position. Blank lines and `#` comments are ignored. Fixed vertices keep
//! their file order.

use std::path::Path;

use nalgebra::Point3;

use crate::error::{ArapError, Result};
use crate::mesh::TriMesh;

/// One parsed line of a constraint file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constraint {
    /// Constrained vertex.
    pub vertex: usize,
    /// Target position, or `None` to keep the original one.
    pub target: Option<Point3<f64>>,
}

/// Fixed vertex list with one target per entry, ready for the solver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    /// Fixed vertices in file order.
    pub fixed: Vec<usize>,
    /// `targets[k]` is the target of `fixed[k]`.
    pub targets: Vec<Point3<f64>>,
}

/// Parse constraint text.
///
/// # Errors
///
/// Returns [`ArapError::ConstraintParse`] with the 1-based line number for a
/// malformed line.
pub fn parse(text: &str) -> Result<Vec<Constraint>> {
    let mut constraints = Vec::new();

    for (n, raw) in text.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("");
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }
        let fail = |message: String| ArapError::ConstraintParse { line: n + 1, message };

        let vertex = tokens[0]
            .parse()
            .map_err(|_| fail(format!("invalid vertex index '{}'", tokens[0])))?;
        let target = match tokens.len() {
            1 => None,
            4 => {
                let mut coords = [0.0; 3];
                for (c, token) in coords.iter_mut().zip(&tokens[1..]) {
                    *c = token
                        .parse()
                        .map_err(|_| fail(format!("invalid coordinate '{}'", token)))?;
                }
                Some(Point3::from(coords))
            }
            count => {
                return Err(fail(format!(
                    "expected 'index' or 'index x y z', found {} fields",
                    count
                )))
            }
        };

        constraints.push(Constraint { vertex, target });
    }

    Ok(constraints)
}

/// Resolve parsed constraints against a mesh.
///
/// # Errors
///
/// Returns [`ArapError::InvalidFixedVertex`] for an index outside the mesh.
/// Duplicates are left for the solver to reject.
pub fn resolve(constraints: &[Constraint], mesh: &TriMesh) -> Result<Constraints> {
    let mut resolved = Constraints::default();
    for c in constraints {
        if c.vertex >= mesh.num_vertices() {
            return Err(ArapError::InvalidFixedVertex {
                vertex: c.vertex,
                num_vertices: mesh.num_vertices(),
            });
        }
        resolved.fixed.push(c.vertex);
        resolved.targets.push(c.target.unwrap_or(*mesh.position(c.vertex)));
    }
    Ok(resolved)
}

/// Read and resolve a constraint file.
pub fn load<P: AsRef<Path>>(path: P, mesh: &TriMesh) -> Result<Constraints> {
    let text = std::fs::read_to_string(path)?;
    resolve(&parse(&text)?, mesh)
}
