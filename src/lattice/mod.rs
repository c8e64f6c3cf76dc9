//! Short vector enumeration
//!
//! Fincke–Pohst enumeration of the integer vectors `x` with `xᵀMx ≤ bound`, for a
//! positive-definite `M` of small dimension.
//!
//! # Algorithm
//!
//! The form is first rewritten by quadratic completion (Cohen, Algorithm 2.7.6):
//!
//! ```text
//! xᵀMx = Σ_i q_ii · (x_i + Σ_{j>i} q_ij x_j)²
//! ```
//!
//! Coordinates are then fixed from the last to the first. At level `i` the partial sum
//! over levels `> i` bounds the admissible interval for `x_i` around its center
//! `−Σ_{j>i} q_ij x_j`, and integers in that interval are visited in increasing order,
//! which makes the traversal deterministic.
//!
//! # Performance
//! The number of visited nodes is bounded by a budget; exhausting it is reported as an
//! internal error rather than silently truncating the result.

use tracing::trace;

use crate::error::{Error, Result};
use crate::math::{Offset, SymmetricMatrix, Vector};

/// Node budget for a single enumeration.
const MAX_NODES: u64 = 2_000_000;

/// Relative slack added to every bound test.
const BOUND_SLACK: f64 = 1e-12;

/// Counters of one enumeration.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnumStats {
    /// Nodes of the search tree visited.
    pub nodes_explored: u64,
    /// Points reported.
    pub solutions_found: usize,
}

/// Enumerator of short lattice vectors for a fixed quadratic form.
#[derive(Debug, Clone)]
pub struct ShortVectors<const D: usize> {
    q: [[f64; D]; D],
    diagonal: [f64; D],
    max_nodes: u64,
}

impl<const D: usize> ShortVectors<D> {
    /// Quadratic completion of `m`.
    ///
    /// Fails with [`Error::NotPositiveDefinite`] when a pivot is not safely positive.
    pub fn new(m: &SymmetricMatrix<f64, D>) -> Result<Self> {
        if D == 0 || !m.is_finite() {
            return Err(Error::NotPositiveDefinite);
        }
        let diagonal: [f64; D] = std::array::from_fn(|i| m.get(i, i));
        let scale = diagonal.iter().fold(0.0_f64, |a, &b| a.max(b.abs()));
        let mut q: [[f64; D]; D] = std::array::from_fn(|i| std::array::from_fn(|j| m.get(i, j)));
        for i in 0..D {
            if !(q[i][i] > 1e-12 * scale) {
                return Err(Error::NotPositiveDefinite);
            }
            for j in i + 1..D {
                q[j][i] = q[i][j];
                q[i][j] /= q[i][i];
            }
            for k in i + 1..D {
                for l in k..D {
                    q[k][l] -= q[k][i] * q[i][l];
                }
            }
        }
        Ok(ShortVectors { q, diagonal, max_nodes: MAX_NODES })
    }

    /// Cap the number of visited nodes.
    pub fn with_max_nodes(mut self, max_nodes: u64) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// All nonzero `x` with `xᵀMx ≤ bound`, one per `±x` pair, first nonzero coordinate
    /// positive.
    pub fn within(&self, bound: f64) -> Result<Vec<Offset<D>>> {
        let mut found = Vec::new();
        let mut bound = bound;
        let stats = self.enumerate(&mut bound, &mut |x, _, _| {
            let v = Vector(*x);
            if !v.is_zero() && v.canonical() == v {
                found.push(v);
            }
        })?;
        trace!(dimension = D, nodes = stats.nodes_explored, found = found.len(), "short vectors enumerated");
        Ok(found)
    }

    /// A shortest nonzero vector and its squared norm.
    ///
    /// Among vectors of equal norm, the first one met by the traversal is kept.
    pub fn shortest(&self) -> Result<(Offset<D>, f64)> {
        let mut best: Option<(Offset<D>, f64)> = None;
        // a unit vector of minimal diagonal entry is always within reach
        let mut bound = self.diagonal.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        self.enumerate(&mut bound, &mut |x, value, bound| {
            let v = Vector(*x);
            if v.is_zero() {
                return;
            }
            if best.is_none_or(|(_, b)| value < b) {
                best = Some((v, value));
                *bound = value;
            }
        })?;
        best.map(|(v, value)| (v.canonical(), value))
            .ok_or_else(|| Error::Internal("shortest vector search found no candidate".into()))
    }

    fn enumerate<V>(&self, bound: &mut f64, visit: &mut V) -> Result<EnumStats>
    where
        V: FnMut(&[i64; D], f64, &mut f64),
    {
        let mut stats = EnumStats::default();
        let mut x = [0_i64; D];
        self.descend(D - 1, &mut x, 0.0, bound, &mut stats, visit)?;
        Ok(stats)
    }

    fn descend<V>(
        &self,
        level: usize,
        x: &mut [i64; D],
        partial: f64,
        bound: &mut f64,
        stats: &mut EnumStats,
        visit: &mut V,
    ) -> Result<()>
    where
        V: FnMut(&[i64; D], f64, &mut f64),
    {
        stats.nodes_explored += 1;
        if stats.nodes_explored > self.max_nodes {
            return Err(Error::Internal(format!(
                "lattice enumeration exceeded {} nodes",
                self.max_nodes
            )));
        }

        let center = -(level + 1..D).fold(0.0, |acc, j| acc + self.q[level][j] * x[j] as f64);
        let qii = self.q[level][level];
        let radius = ((*bound - partial).max(0.0) / qii).sqrt();
        let lo = (center - radius - 1e-9).ceil() as i64;
        let hi = (center + radius + 1e-9).floor() as i64;

        for xi in lo..=hi {
            let t = xi as f64 - center;
            let next = partial + qii * t * t;
            if next > *bound * (1.0 + BOUND_SLACK) {
                continue;
            }
            x[level] = xi;
            if level == 0 {
                stats.solutions_found += 1;
                visit(x, next, bound);
            } else {
                self.descend(level - 1, x, next, bound, stats, visit)?;
            }
        }
        x[level] = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use itertools::Itertools;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn brute_force<const D: usize>(m: &SymmetricMatrix<f64, D>, bound: f64, range: i64) -> Vec<Offset<D>> {
        let mut out = Vec::new();
        for coords in (0..D).map(|_| -range..=range).multi_cartesian_product() {
            let v = Vector::<i64, D>::from_fn(|i| coords[i]);
            if !v.is_zero() && v.canonical() == v && m.squared_norm(&v) <= bound {
                out.push(v);
            }
        }
        out
    }

    #[test]
    fn identity_has_unit_vectors_as_shortest() {
        let sv = ShortVectors::new(&SymmetricMatrix::<f64, 3>::identity()).unwrap();
        let (v, n) = sv.shortest().unwrap();
        assert_abs_diff_eq!(n, 1.0, epsilon = 1e-12);
        assert_eq!(v.iter().map(|x| x.abs()).sum::<i64>(), 1);
        assert_eq!(sv.within(1.0 + 1e-9).unwrap().len(), 3);
        assert_eq!(sv.within(2.0 + 1e-9).unwrap().len(), 9);
    }

    #[test]
    fn enumeration_matches_brute_force() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        for _ in 0..20 {
            let m = SymmetricMatrix::<f64, 3>::random_positive(&mut rng) + SymmetricMatrix::identity() * 0.2;
            let sv = ShortVectors::new(&m).unwrap();
            let bound = 1.5 * m.get(0, 0);
            let mut fast = sv.within(bound).unwrap();
            let mut slow = brute_force(&m, bound, 12);
            fast.sort_by_key(|v| v.0);
            slow.sort_by_key(|v| v.0);
            assert_eq!(fast, slow);
        }
    }

    #[test]
    fn shortest_beats_every_enumerated_vector() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(9);
        for _ in 0..20 {
            let m = SymmetricMatrix::<f64, 4>::random_positive(&mut rng) + SymmetricMatrix::identity() * 0.1;
            let sv = ShortVectors::new(&m).unwrap();
            let (v, n) = sv.shortest().unwrap();
            assert_abs_diff_eq!(m.squared_norm(&v), n, epsilon = 1e-12);
            assert_eq!(v.canonical(), v);
            for w in brute_force(&m, n * 2.0, 4) {
                assert!(m.squared_norm(&w) >= n - 1e-12, "{} is shorter than {}", w, v);
            }
        }
    }

    #[test]
    fn skewed_form_needs_large_coordinates() {
        // shortest vector (1, -10) has norm 1
        let m = SymmetricMatrix::<f64, 2>::from_coefficients(&[101.0, 10.0, 1.0]).unwrap();
        let (v, n) = ShortVectors::new(&m).unwrap().shortest().unwrap();
        assert_abs_diff_eq!(n, 1.0, epsilon = 1e-9);
        assert!(v == Vector([0, 1]) || v == Vector([1, -10]));
    }

    #[test]
    fn indefinite_forms_are_rejected() {
        let m = SymmetricMatrix::<f64, 2>::from_coefficients(&[1.0, 2.0, 1.0]).unwrap();
        assert_eq!(ShortVectors::new(&m).unwrap_err(), Error::NotPositiveDefinite);
    }

    #[test]
    fn node_budget_is_enforced() {
        let sv = ShortVectors::new(&SymmetricMatrix::<f64, 5>::identity()).unwrap().with_max_nodes(10);
        assert!(matches!(sv.within(4.0), Err(Error::Internal(_))));
    }
}
