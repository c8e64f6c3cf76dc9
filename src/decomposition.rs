use num_traits::Float;

use crate::math::{Offset, SymmetricMatrix};

/// Weighted sum of rank-one tensors over integer offsets:
///
/// ```text
/// m = Σ_i weights[i] · offsets[i] ⊗ offsets[i]
/// ```
///
/// Offsets are defined up to sign. Terms keep the order in which the reduction produced
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition<F, const D: usize> {
    /// Integer offsets `e_i`.
    pub offsets: Vec<Offset<D>>,
    /// Weights `λ_i`, one per offset.
    pub weights: Vec<F>,
}

impl<F: Float, const D: usize> Decomposition<F, D> {
    /// Pairs `offsets[i]` with `weights[i]`.
    pub fn new(offsets: Vec<Offset<D>>, weights: Vec<F>) -> Self {
        debug_assert_eq!(offsets.len(), weights.len());
        Decomposition { offsets, weights }
    }

    /// Number of terms.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether there are no terms.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// `(offset, weight)` pairs.
    pub fn terms(&self) -> impl Iterator<Item = (&Offset<D>, F)> + '_ {
        self.offsets.iter().zip(self.weights.iter().copied())
    }

    /// `Σ_i weight_i · offset_i ⊗ offset_i`.
    pub fn reconstruct(&self) -> SymmetricMatrix<F, D> {
        self.terms()
            .fold(SymmetricMatrix::zero(), |acc, (o, w)| acc + SymmetricMatrix::rank_one(o) * w)
    }

    /// Largest entrywise deviation between the reconstruction and `m`.
    pub fn residual(&self, m: &SymmetricMatrix<F, D>) -> F {
        (self.reconstruct() - *m).max_abs()
    }

    /// Smallest weight, `None` when there are no terms.
    pub fn min_weight(&self) -> Option<F> {
        self.weights.iter().copied().reduce(F::min)
    }

    /// Every weight is at least `-tol`.
    pub fn is_nonnegative(&self, tol: F) -> bool {
        self.weights.iter().all(|&w| w >= -tol)
    }

    /// Offsets with their sign normalised, first nonzero coordinate positive.
    pub fn canonical(mut self) -> Self {
        self.offsets.iter_mut().for_each(|o| *o = o.canonical());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reconstructs_weighted_rank_one_sum() {
        let d = Decomposition::new(vec![Vector([1, 0]), Vector([0, 1]), Vector([1, -1])], vec![2.0, 3.0, 0.5]);
        let m = d.reconstruct();
        assert_abs_diff_eq!(m.get(0, 0), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m.get(1, 0), -0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m.get(1, 1), 3.5, epsilon = 1e-12);
        assert_abs_diff_eq!(d.residual(&m), 0.0, epsilon = 1e-12);
        assert_eq!(d.min_weight(), Some(0.5));
        assert!(d.is_nonnegative(0.0));
    }

    #[test]
    fn canonical_flips_offsets_only() {
        let d = Decomposition::new(vec![Vector([-1, 2]), Vector([0, -1])], vec![1.0, -1e-14]);
        let c = d.clone().canonical();
        assert_eq!(c.offsets, vec![Vector([1, -2]), Vector([0, 1])]);
        assert_eq!(c.reconstruct(), d.reconstruct());
        assert!(!d.is_nonnegative(0.0));
        assert!(d.is_nonnegative(1e-12));
    }
}
