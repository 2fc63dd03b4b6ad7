//! ARAP distortion energy.

use std::fmt;

use nalgebra::{Matrix3, Point3};

use super::weights::CotangentWeights;

/// Label of the summed energy term.
pub const TOTAL: &str = "Total";

/// A set of labeled energy terms.
///
/// Terms keep the order in which they were added. Today only [`TOTAL`] is
/// filled in, but callers should look terms up by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Energy {
    terms: Vec<(String, f64)>,
}

impl Energy {
    /// An energy with no terms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `value` to the term `label`, creating it if needed.
    pub fn add(&mut self, label: &str, value: f64) {
        match self.terms.iter_mut().find(|(l, _)| l == label) {
            Some((_, v)) => *v += value,
            None => self.terms.push((label.to_string(), value)),
        }
    }

    /// Value of the term `label`.
    pub fn get(&self, label: &str) -> Option<f64> {
        self.terms.iter().find(|(l, _)| l == label).map(|&(_, v)| v)
    }

    /// The total energy, or zero if it was never recorded.
    pub fn total(&self) -> f64 {
        self.get(TOTAL).unwrap_or(0.0)
    }

    /// Iterate over `(label, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.terms.iter().map(|(l, v)| (l.as_str(), *v))
    }
}

impl fmt::Display for Energy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (label, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {:.6e}", label, value)?;
        }
        Ok(())
    }
}

/// `Σ_i Σ_j w_ij ‖(p'_i − p'_j) − R_i (p_i − p_j)‖²` over every vertex and
/// each of its neighbors.
pub fn arap_energy(
    weights: &CotangentWeights,
    original: &[Point3<f64>],
    current: &[Point3<f64>],
    rotations: &[Matrix3<f64>],
) -> Energy {
    let mut total = 0.0;
    for (i, r) in rotations.iter().enumerate() {
        for &(j, w) in weights.neighbors(i) {
            let residual = (current[i] - current[j]) - r * (original[i] - original[j]);
            total += w * residual.norm_squared();
        }
    }

    let mut energy = Energy::new();
    energy.add(TOTAL, total);
    energy
}
