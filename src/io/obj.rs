//! Wavefront OBJ format support.
//!
//! Only `v` and `f` records are read; normals, texture coordinates, groups
//! and materials are skipped. Face corners may use the `v/vt/vn` forms and
//! negative (relative) indices.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{ArapError, Result};
use crate::mesh::TriMesh;

use super::triangulate_fan;

/// Load a mesh from an OBJ file.
///
/// # Example
///
/// ```no_run
/// use arap_deform::io::obj;
///
/// let mesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let err = |line: usize, message: String| ArapError::LoadError {
        path: path.to_path_buf(),
        message: format!("line {}: {}", line, message),
    };

    let mut vertices: Vec<Point3<f64>> = Vec::new();
    let mut faces: Vec<[usize; 3]> = Vec::new();
    let mut corners: Vec<usize> = Vec::new();

    for (n, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = n + 1;
        let mut tokens = line.split_whitespace();

        match tokens.next() {
            Some("v") => {
                let mut coords = [0.0; 3];
                for c in &mut coords {
                    let token = tokens
                        .next()
                        .ok_or_else(|| err(line_no, "vertex needs three coordinates".into()))?;
                    *c = token
                        .parse()
                        .map_err(|_| err(line_no, format!("invalid coordinate '{}'", token)))?;
                }
                vertices.push(Point3::new(coords[0], coords[1], coords[2]));
            }
            Some("f") => {
                corners.clear();
                for token in tokens {
                    corners.push(
                        resolve_index(token, vertices.len())
                            .ok_or_else(|| err(line_no, format!("invalid face index '{}'", token)))?,
                    );
                }
                if corners.len() < 3 {
                    return Err(err(line_no, "face needs at least three corners".into()));
                }
                triangulate_fan(&corners, &mut faces);
            }
            _ => {}
        }
    }

    TriMesh::new(vertices, faces)
}

/// Turn an OBJ corner token into a 0-based vertex index.
fn resolve_index(token: &str, num_vertices: usize) -> Option<usize> {
    let index: i64 = token.split('/').next()?.parse().ok()?;
    if index > 0 {
        Some(index as usize - 1)
    } else if index < 0 {
        num_vertices.checked_sub(index.unsigned_abs() as usize)
    } else {
        None
    }
}

/// Save a mesh to an OBJ file.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "# Generated by arap-deform")?;
    writeln!(writer, "# {} vertices, {} faces", mesh.num_vertices(), mesh.num_faces())?;
    for v in mesh.positions() {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for f in mesh.faces() {
        writeln!(writer, "f {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1)?;
    }

    writer.flush()?;
    Ok(())
}
