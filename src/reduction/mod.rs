//! Lattice basis reduction in dimension at most three
//!
//! For a positive-definite form `M` in dimension `D ≤ 3`:
//! * [`BasisReduction::reduced_basis`] performs Lagrange–Gauss size reduction (extended to
//!   three vectors), so that successive basis vectors are short for `M`,
//! * [`BasisReduction::obtuse_superbase`] turns the canonical superbase
//!   `e₁, …, e_D, −Σeᵢ` into one whose vectors are pairwise non-acute for `M`,
//! * [`BasisReduction::tensor_decomposition`] applies Selling's formula to that superbase.
//!
//! ```text
//! D = 2:  M = Σ_i  −⟨e_j, e_k⟩_M · e_i^⊥ ⊗ e_i^⊥              {i, j, k} = {0, 1, 2}
//! D = 3:  M = Σ_{i<j} −⟨e_i, e_j⟩_M · (e_k × e_l) ⊗ (e_k × e_l)   {i, j, k, l} = {0, 1, 2, 3}
//! ```
//!
//! Dimensions above three are rejected when the functions are instantiated; the Voronoi
//! reduction handles them instead.

use std::marker::PhantomData;
use std::ops::Index;

use num_traits::Float;
use tracing::trace;

use crate::decomposition::Decomposition;
use crate::error::{Error, Result};
use crate::math::{Offset, SymmetricMatrix, Vector};

/// Iteration cap for the reduction loops.
const MAX_STEPS: usize = 1 << 20;

/// `D + 1` lattice vectors summing to zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superbase<const D: usize>(Vec<Offset<D>>);

impl<const D: usize> Superbase<D> {
    /// `e₁, …, e_D, −Σeᵢ`.
    pub fn canonical() -> Self {
        let mut vectors: Vec<Offset<D>> = (0..D).map(Offset::unit).collect();
        vectors.push(Vector([-1; D]));
        Superbase(vectors)
    }

    /// Wrap `vectors`, `None` unless there are `D + 1` of them summing to zero.
    pub fn new(vectors: Vec<Offset<D>>) -> Option<Self> {
        let sums_to_zero = vectors.iter().copied().sum::<Offset<D>>().is_zero();
        (vectors.len() == D + 1 && sums_to_zero).then_some(Superbase(vectors))
    }

    /// The `D + 1` vectors.
    pub fn vectors(&self) -> &[Offset<D>] {
        &self.0
    }

    /// Sum of the vectors, zero for a superbase.
    pub fn sum(&self) -> Offset<D> {
        self.0.iter().copied().sum()
    }

    /// Every pair of distinct vectors has a non-positive scalar product for `m`.
    pub fn is_obtuse<F: Float>(&self, m: &SymmetricMatrix<F, D>) -> bool {
        (0..self.0.len())
            .all(|i| (i + 1..self.0.len()).all(|j| m.scalar_product(&self.0[i], &self.0[j]) <= F::zero()))
    }
}

impl<const D: usize> Index<usize> for Superbase<D> {
    type Output = Offset<D>;
    fn index(&self, i: usize) -> &Offset<D> {
        &self.0[i]
    }
}

/// Basis and superbase reduction for a form of dimension `D ≤ 3`.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasisReduction<F, const D: usize>(PhantomData<F>);

impl<F: Float, const D: usize> BasisReduction<F, D> {
    const DIMENSION_CHECK: () = assert!(D >= 1 && D <= 3, "basis reduction supports dimensions 1 to 3");

    /// The standard basis of `ℤ^D`.
    pub fn canonical_basis() -> [Offset<D>; D] {
        std::array::from_fn(Offset::unit)
    }

    /// `(e_0, .., e_{D-1}, -Σ e_i)`.
    pub fn canonical_superbase() -> Superbase<D> {
        Superbase::canonical()
    }

    fn check_input(m: &SymmetricMatrix<F, D>) -> Result<()> {
        let () = Self::DIMENSION_CHECK;
        if m.is_positive_definite() { Ok(()) } else { Err(Error::NotPositiveDefinite) }
    }

    /// Reduce `basis` in place for `m`.
    ///
    /// The basis vectors are visited by increasing norm (ties keep index order). The
    /// shorter of two vectors is subtracted from the longer, rounded multiple of it,
    /// as long as their normalised scalar product exceeds one half.
    pub fn reduced_basis(m: &SymmetricMatrix<F, D>, basis: &mut [Offset<D>; D]) -> Result<()> {
        Self::check_input(m)?;
        if D == 1 {
            return Ok(());
        }
        let half = F::from(0.5).expect("constant fits in float");

        let mut sq_norms: [F; D] = std::array::from_fn(|i| m.squared_norm(&basis[i]));
        let mut order: [usize; D] = std::array::from_fn(|i| i);
        order.sort_by(|&i, &j| sq_norms[i].partial_cmp(&sq_norms[j]).unwrap_or(std::cmp::Ordering::Equal));

        for _ in 0..MAX_STEPS {
            let (o0, o1) = (order[0], order[1]);
            let k01 = m.scalar_product(&basis[o0], &basis[o1]) / sq_norms[o0];
            if k01.abs() > half {
                basis[o1] = reduce(basis[o1], basis[o0], k01)?;
                sq_norms[o1] = m.squared_norm(&basis[o1]);
                if D == 2 || sq_norms[order[0]] > sq_norms[order[1]] {
                    order.swap(0, 1);
                }
                continue;
            }
            if D == 2 {
                return Ok(());
            }

            let o2 = order[2];
            let k02 = m.scalar_product(&basis[o0], &basis[o2]) / sq_norms[o0];
            let k12 = m.scalar_product(&basis[o1], &basis[o2]) / sq_norms[o1];
            if k02.abs() > half {
                basis[o2] = reduce(basis[o2], basis[o0], k02)?;
            } else if k12.abs() > half {
                basis[o2] = reduce(basis[o2], basis[o1], k12)?;
            } else {
                return Ok(());
            }
            sq_norms[o2] = m.squared_norm(&basis[o2]);

            if sq_norms[order[1]] > sq_norms[order[2]] {
                order.swap(1, 2);
                if sq_norms[order[0]] > sq_norms[order[1]] {
                    order.swap(0, 1);
                }
            }
        }
        Err(Error::Internal("basis reduction did not terminate".into()))
    }

    /// Make `superbase` obtuse for `m` by repeated flips.
    ///
    /// Whenever two vectors `sb_i`, `sb_j` make a positive scalar product, `sb_i` is added
    /// to the remaining vectors (in dimension two, the third vector becomes `sb_i − sb_j`)
    /// and then negated. The sum stays zero and `Σ_{i<j} |sb_i − sb_j|²` decreases.
    pub fn obtuse_superbase(m: &SymmetricMatrix<F, D>, superbase: &mut Superbase<D>) -> Result<()> {
        Self::check_input(m)?;
        if D == 1 {
            return Ok(());
        }
        let sb = &mut superbase.0;
        let mut flips = 0_usize;
        let mut reduced = true;
        while reduced {
            reduced = false;
            for i in 0..D {
                for j in i + 1..=D {
                    if m.scalar_product(&sb[i], &sb[j]) <= F::zero() {
                        continue;
                    }
                    reduced = true;
                    flips += 1;
                    if flips > MAX_STEPS {
                        return Err(Error::Internal("obtuse superbase search did not terminate".into()));
                    }
                    if D == 2 {
                        let k = 3 - i - j;
                        sb[k] = sb[i] - sb[j];
                    } else {
                        for k in (0..=D).filter(|&k| k != i && k != j) {
                            let v = sb[i];
                            sb[k] += v;
                        }
                    }
                    sb[i] = -sb[i];
                    trace!(i, j, "superbase flip");
                }
            }
        }
        Ok(())
    }

    /// Selling's decomposition of `m`, with `D(D+1)/2` non-negative weights.
    pub fn tensor_decomposition(m: &SymmetricMatrix<F, D>) -> Result<Decomposition<F, D>> {
        let mut sb = Superbase::canonical();
        Self::obtuse_superbase(m, &mut sb)?;
        Ok(Self::selling(m, &sb))
    }

    fn selling(m: &SymmetricMatrix<F, D>, sb: &Superbase<D>) -> Decomposition<F, D> {
        let mut offsets = Vec::with_capacity(D * (D + 1) / 2);
        let mut weights = Vec::with_capacity(D * (D + 1) / 2);
        match D {
            1 => {
                offsets.push(Offset::unit(0));
                weights.push(m.get(0, 0));
            }
            2 => {
                for i in 0..3 {
                    let (j, k) = ((i + 1) % 3, (i + 2) % 3);
                    offsets.push(perp(&sb[i]));
                    weights.push(-m.scalar_product(&sb[j], &sb[k]));
                }
            }
            _ => {
                for i in 0..4 {
                    for j in i + 1..4 {
                        let mut rest = (0..4).filter(|&k| k != i && k != j);
                        let (k, l) = (rest.next().unwrap_or(0), rest.next().unwrap_or(0));
                        offsets.push(cross(&sb[k], &sb[l]));
                        weights.push(-m.scalar_product(&sb[i], &sb[j]));
                    }
                }
            }
        }
        Decomposition::new(offsets, weights)
    }
}

/// `v − round(k)·w`.
fn reduce<const D: usize>(v: Offset<D>, w: Offset<D>, k: impl Float) -> Result<Offset<D>> {
    let k = k
        .round()
        .to_i64()
        .ok_or_else(|| Error::Internal("reduction coefficient out of range".into()))?;
    Ok(v - w * k)
}

// Dimension-erased forms of `Vector::perp` and `Vector::cross`, used where `D` is only
// known to be 2 or 3 at run time.
fn perp<const D: usize>(v: &Offset<D>) -> Offset<D> {
    let mut out = Offset::zero();
    out[0] = -v[1];
    out[1] = v[0];
    out
}

fn cross<const D: usize>(u: &Offset<D>, v: &Offset<D>) -> Offset<D> {
    let mut out = Offset::zero();
    out[0] = u[1] * v[2] - u[2] * v[1];
    out[1] = u[2] * v[0] - u[0] * v[2];
    out[2] = u[0] * v[1] - u[1] * v[0];
    out
}
