//! Reduced Laplacian for the global step.

use crate::error::{ArapError, Result};
use crate::linalg::CsrMatrix;
use crate::mesh::Classification;

use super::weights::CotangentWeights;

/// Assemble `L_ff`, the free × free block of the negated weight matrix.
///
/// Row `i` (free vertex `v`) has `Σ_j weight(v, j)` on the diagonal, summed
/// over all neighbors, and `-weight(v, j)` in the column of every free
/// neighbor `j`. Fixed neighbors only contribute to the diagonal; their
/// positions move to the right-hand side.
pub fn free_laplacian(weights: &CotangentWeights, roles: &Classification) -> Result<CsrMatrix> {
    let free = roles.free();
    if free.is_empty() {
        return Err(ArapError::NoFreeVertices);
    }

    let mut triplets = Vec::new();
    for (i, &v) in free.iter().enumerate() {
        let mut diagonal = 0.0;
        for &(j, w) in weights.neighbors(v) {
            diagonal += w;
            if let Some(col) = roles.free_pos(j) {
                triplets.push((i, col, -w));
            }
        }
        triplets.push((i, i, diagonal));
    }

    Ok(CsrMatrix::from_triplets(free.len(), free.len(), triplets))
}
