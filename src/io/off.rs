//! OFF (Object File Format) support.
//!
//! Reads the ASCII variant: an `OFF` header, a `vertices faces edges` count
//! line, the vertex coordinates, then one `n i0 i1 ...` line per face. `#`
//! starts a comment. Per-face colors after the indices are ignored.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use nalgebra::Point3;

use crate::error::{ArapError, Result};
use crate::mesh::TriMesh;

use super::triangulate_fan;

/// Load a mesh from an OFF file.
pub fn load<P: AsRef<Path>>(path: P) -> Result<TriMesh> {
    let path = path.as_ref();
    let mut text = String::new();
    File::open(path)?.read_to_string(&mut text)?;
    let err = |message: String| ArapError::LoadError {
        path: path.to_path_buf(),
        message,
    };

    let mut lines = text
        .lines()
        .map(|l| l.split('#').next().unwrap_or("").trim())
        .filter(|l| !l.is_empty());

    let header = lines.next().ok_or_else(|| err("file is empty".into()))?;
    // The counts may share the header line ("OFF 8 6 0").
    let counts_line = match header.strip_prefix("OFF") {
        Some(rest) if !rest.trim().is_empty() => rest.trim(),
        Some(_) => lines.next().ok_or_else(|| err("missing element counts".into()))?,
        None => return Err(err(format!("expected OFF header, found '{}'", header))),
    };

    let counts: Vec<usize> = counts_line
        .split_whitespace()
        .take(2)
        .map(|t| t.parse().map_err(|_| err(format!("invalid count '{}'", t))))
        .collect::<Result<_>>()?;
    let [num_vertices, num_faces] = counts[..] else {
        return Err(err("expected vertex and face counts".into()));
    };

    let mut vertices = Vec::with_capacity(num_vertices);
    for v in 0..num_vertices {
        let line = lines
            .next()
            .ok_or_else(|| err(format!("expected {} vertices, found {}", num_vertices, v)))?;
        let coords: Vec<f64> = line
            .split_whitespace()
            .take(3)
            .map(|t| t.parse().map_err(|_| err(format!("vertex {}: invalid coordinate '{}'", v, t))))
            .collect::<Result<_>>()?;
        if coords.len() != 3 {
            return Err(err(format!("vertex {} needs three coordinates", v)));
        }
        vertices.push(Point3::new(coords[0], coords[1], coords[2]));
    }

    let mut faces = Vec::with_capacity(num_faces);
    let mut corners: Vec<usize> = Vec::new();
    for f in 0..num_faces {
        let line = lines
            .next()
            .ok_or_else(|| err(format!("expected {} faces, found {}", num_faces, f)))?;
        let mut tokens = line.split_whitespace();
        let n: usize = tokens
            .next()
            .and_then(|t| t.parse().ok())
            .ok_or_else(|| err(format!("face {}: missing corner count", f)))?;

        corners.clear();
        for token in tokens.take(n) {
            corners.push(
                token
                    .parse()
                    .map_err(|_| err(format!("face {}: invalid index '{}'", f, token)))?,
            );
        }
        if n < 3 || corners.len() != n {
            return Err(err(format!("face {}: expected {} indices", f, n.max(3))));
        }
        triangulate_fan(&corners, &mut faces);
    }

    TriMesh::new(vertices, faces)
}

/// Save a mesh to an OFF file.
pub fn save<P: AsRef<Path>>(mesh: &TriMesh, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);

    writeln!(writer, "OFF")?;
    writeln!(writer, "{} {} 0", mesh.num_vertices(), mesh.num_faces())?;
    for v in mesh.positions() {
        writeln!(writer, "{} {} {}", v.x, v.y, v.z)?;
    }
    for f in mesh.faces() {
        writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
    }

    writer.flush()?;
    Ok(())
}
