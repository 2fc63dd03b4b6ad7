//! Local step: per-vertex best-fit rotations.

use nalgebra::{Matrix3, Point3};

use crate::linalg::nearest_rotation;

use super::weights::CotangentWeights;

/// Weighted edge covariance of vertex `v`:
/// `S_v = Σ_j w_vj (p_v − p_j)(p'_v − p'_j)ᵗ`.
pub fn edge_covariance(
    v: usize,
    weights: &CotangentWeights,
    original: &[Point3<f64>],
    current: &[Point3<f64>],
) -> Matrix3<f64> {
    let mut s = Matrix3::zeros();
    for &(j, w) in weights.neighbors(v) {
        let edge = original[v] - original[j];
        let edge_update = current[v] - current[j];
        s += w * edge * edge_update.transpose();
    }
    s
}

/// Fit one rotation per vertex mapping its original one-ring edges onto the
/// current ones.
///
/// The returned `R_v` is the transpose of the polar rotation of `S_v`, i.e.
/// `V Uᵗ` for `S_v = U Σ Vᵗ`. That is the `R_v` minimizing
/// `Σ_j w_vj ‖(p'_v − p'_j) − R_v (p_v − p_j)‖²`.
pub fn fit_rotations(
    weights: &CotangentWeights,
    original: &[Point3<f64>],
    current: &[Point3<f64>],
) -> Vec<Matrix3<f64>> {
    (0..weights.num_vertices())
        .map(|v| nearest_rotation(&edge_covariance(v, weights, original, current)).transpose())
        .collect()
}
