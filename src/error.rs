//! Error types for arap-deform.
//!
//! This module defines all error types used throughout the library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`ArapError`].
pub type Result<T> = std::result::Result<T, ArapError>;

/// Errors that can occur while building, deforming or saving a mesh.
#[derive(Error, Debug)]
pub enum ArapError {
    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has duplicate vertex indices.
    #[error("face {face} is degenerate (has duplicate vertices)")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A face has (numerically) zero area, so its cotangents are undefined.
    #[error("face {face} has zero area ({area:e}); cotangent weights are undefined")]
    ZeroAreaFace {
        /// The face index.
        face: usize,
        /// The computed area.
        area: f64,
    },

    /// A fixed vertex index is out of range.
    #[error("fixed vertex {vertex} is out of range (mesh has {num_vertices} vertices)")]
    InvalidFixedVertex {
        /// The offending vertex index.
        vertex: usize,
        /// Number of vertices in the mesh.
        num_vertices: usize,
    },

    /// The same vertex was listed as fixed more than once.
    #[error("vertex {vertex} is listed as fixed more than once")]
    DuplicateFixedVertex {
        /// The duplicated vertex index.
        vertex: usize,
    },

    /// Every vertex is fixed, so there is nothing to solve for.
    #[error("no free vertices to solve for")]
    NoFreeVertices,

    /// No vertex is fixed, so the deformation is only defined up to a rigid motion.
    #[error("no fixed vertices; at least one constraint is required")]
    NoFixedVertices,

    /// The number of target positions does not match the number of fixed vertices.
    #[error("expected {expected} fixed target positions, got {actual}")]
    TargetCountMismatch {
        /// Number of fixed vertices.
        expected: usize,
        /// Number of supplied targets.
        actual: usize,
    },

    /// Invalid solver state for the requested operation.
    #[error("invalid solver state: {0}")]
    InvalidState(String),

    /// Invalid parameter value.
    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// The invalid value (as string).
        value: String,
        /// Reason the value is invalid.
        reason: &'static str,
    },

    /// A sparse system could not be factorized.
    #[error("failed to factorize {system} system: {message}")]
    Factorization {
        /// Which system was being factorized.
        system: &'static str,
        /// Backend error message.
        message: String,
    },

    /// Solving against an existing factorization failed.
    #[error("failed to solve {system} system: {message}")]
    Solve {
        /// Which system was being solved.
        system: &'static str,
        /// Backend error message.
        message: String,
    },

    /// The naive Laplacian solution does not satisfy its normal equations.
    #[error("initial guess diverged on axis {axis}: residual {residual:e} exceeds {threshold:e}")]
    NumericalDivergence {
        /// Coordinate axis (0 = x, 1 = y, 2 = z).
        axis: usize,
        /// Squared residual norm.
        residual: f64,
        /// Threshold the residual was checked against.
        threshold: f64,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Malformed line in a constraint file.
    #[error("constraint file line {line}: {message}")]
    ConstraintParse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        message: String,
    },
}

impl ArapError {
    /// Create an invalid parameter error.
    pub fn invalid_param<T: std::fmt::Display>(
        name: &'static str,
        value: T,
        reason: &'static str,
    ) -> Self {
        ArapError::InvalidParameter {
            name,
            value: value.to_string(),
            reason,
        }
    }

    /// Whether this error describes an ill-posed problem setup rather than a
    /// numerical or I/O failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ArapError::ZeroAreaFace { .. }
                | ArapError::InvalidFixedVertex { .. }
                | ArapError::DuplicateFixedVertex { .. }
                | ArapError::NoFreeVertices
                | ArapError::NoFixedVertices
                | ArapError::TargetCountMismatch { .. }
                | ArapError::InvalidState(_)
                | ArapError::InvalidParameter { .. }
        )
    }
}
