//! Mesh and constraint file I/O.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | Positions and faces only |
//! | OFF | `.off` | ✓ | ✓ | Object File Format |
//! | PLY | `.ply` | ✓ | ✓ | Stanford polygon format, ASCII on save |
//!
//! Polygons with more than three corners are fan-triangulated on load.
//!
//! # Usage
//!
//! ```no_run
//! use arap_deform::io::{load, save};
//!
//! let mesh = load("model.obj").unwrap();
//! save(&mesh, "output.ply").unwrap();
//! ```
//!
//! Fixed vertices and their targets are read with [`constraints::load`].

pub mod constraints;
pub mod obj;
pub mod off;
pub mod ply;

use std::path::Path;

use crate::error::{ArapError, Result};
use crate::mesh::TriMesh;

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// Object File Format.
    Off,
    /// PLY (Stanford polygon) format.
    Ply,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "off" => Some(Format::Off),
            "ply" => Some(Format::Ply),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

fn detect(path: &Path) -> Result<Format> {
    Format::from_path(path).ok_or_else(|| ArapError::UnsupportedFormat {
        extension: path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("(none)")
            .to_string(),
    })
}

/// Load a mesh from a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::load(path),
        Format::Off => off::load(path),
        Format::Ply => ply::load(path),
    }
}

/// Save a mesh to a file with automatic format detection.
///
/// The format is determined by the file extension.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    match detect(path)? {
        Format::Obj => obj::save(mesh, path),
        Format::Off => off::save(mesh, path),
        Format::Ply => ply::save(mesh, path),
    }
}

/// Fan-triangulate a polygon given by its corner indices.
pub(crate) fn triangulate_fan(indices: &[usize], faces: &mut Vec<[usize; 3]>) {
    for i in 1..indices.len().saturating_sub(1) {
        faces.push([indices[0], indices[i], indices[i + 1]]);
    }
}


#[cfg(test)]
mod tests {
    use super::test_util::{create_tetrahedron, temp_path};
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/model.OBJ"), Some(Format::Obj));
        assert_eq!(Format::from_path("mesh.off"), Some(Format::Off));
        assert_eq!(Format::from_path("scan.ply"), Some(Format::Ply));
        assert_eq!(Format::from_path("model.stl"), None);
        assert_eq!(Format::from_path("noext"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let mesh = create_tetrahedron();
        match save(&mesh, temp_path("mesh.xyz")) {
            Err(ArapError::UnsupportedFormat { extension }) => assert_eq!(extension, "xyz"),
            other => panic!("expected UnsupportedFormat, got {:?}", other),
        }
        assert!(matches!(load("mesh"), Err(ArapError::UnsupportedFormat { .. })));
    }

    #[test]
    fn test_every_format_preserves_mesh() {
        let mesh = create_tetrahedron();
        for name in ["tet.obj", "tet.off", "tet.ply"] {
            let path = temp_path(name);
            save(&mesh, &path).unwrap();
            let loaded = load(&path).unwrap();
            std::fs::remove_file(&path).ok();

            assert_eq!(loaded.faces(), mesh.faces(), "{}", name);
            for (a, b) in loaded.positions().iter().zip(mesh.positions()) {
                assert!((a - b).norm() < 1e-6, "{}", name);
            }
        }
    }

    #[test]
    fn test_triangulate_fan() {
        let mut faces = Vec::new();
        triangulate_fan(&[4, 5, 6, 7, 8], &mut faces);
        assert_eq!(faces, vec![[4, 5, 6], [4, 6, 7], [4, 7, 8]]);

        triangulate_fan(&[1, 2], &mut faces);
        assert_eq!(faces.len(), 3);
    }
}
