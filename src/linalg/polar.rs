//! Nearest rotation to a 3×3 matrix.

use nalgebra::Matrix3;

/// The rotation part of the polar decomposition `m = R · P`.
///
/// `R` is the proper rotation (det = +1) minimizing `‖m − R‖_F`. With
/// `m = U Σ Vᵗ`, that is `U Vᵗ`, with the column of `U` belonging to the
/// smallest singular value negated when `U Vᵗ` would be a reflection.
///
/// Rank-deficient input (a flat or collapsed neighborhood) still yields a
/// proper rotation. The zero matrix maps to the identity.
pub fn nearest_rotation(m: &Matrix3<f64>) -> Matrix3<f64> {
    if m.iter().all(|v| *v == 0.0) {
        return Matrix3::identity();
    }

    let svd = m.svd(true, true);
    let (mut u, v_t) = match (svd.u, svd.v_t) {
        (Some(u), Some(v_t)) => (u, v_t),
        _ => return Matrix3::identity(),
    };

    let r = u * v_t;
    if r.determinant() >= 0.0 {
        return r;
    }

    // Flip the least significant direction to turn the reflection into a rotation.
    let smallest = svd
        .singular_values
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map_or(2, |(i, _)| i);
    u.column_mut(smallest).neg_mut();
    u * v_t
}
