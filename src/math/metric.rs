//! Norms on `ℝᴰ`
//!
//! Three families share the [`Norm`] trait:
//! * Riemannian norms `|v|_M = sqrt(vᵀMv)`, implemented directly on [`SymmetricMatrix`],
//! * [`RanderNorm`]: `|v|_M − ⟨w, v⟩`, asymmetric, definite when `|w|_{M⁻¹} < 1`,
//! * [`AsymmetricQuadraticNorm`]: `sqrt(vᵀMv + max(⟨w, v⟩, 0)²)`.
//!
//! Acuteness of two vectors with respect to a norm means that each one makes a
//! non-negative scalar product with the gradient of the norm at the other.

use num_traits::Float;

use super::symmetric::SymmetricMatrix;
use super::vector::Vector;

/// A possibly asymmetric norm on `ℝ^D`.
pub trait Norm<F: Float, const D: usize> {
    /// Length of `v`.
    fn norm(&self, v: &Vector<F, D>) -> F;

    /// Gradient of the norm at a nonzero `v`.
    fn gradient(&self, v: &Vector<F, D>) -> Vector<F, D>;

    /// Whether `u` and `v` make an acute angle for this norm.
    fn is_acute(&self, u: &Vector<F, D>, v: &Vector<F, D>) -> bool {
        self.gradient(u).dot(v) >= F::zero() && self.gradient(v).dot(u) >= F::zero()
    }

    /// Whether `norm(v) > 0` for every nonzero `v`.
    fn is_definite(&self) -> bool;
}

impl<F: Float, const D: usize> Norm<F, D> for SymmetricMatrix<F, D> {
    fn norm(&self, v: &Vector<F, D>) -> F {
        SymmetricMatrix::norm(self, v)
    }

    fn gradient(&self, v: &Vector<F, D>) -> Vector<F, D> {
        let mv = self.apply(v);
        mv * (F::one() / SymmetricMatrix::norm(self, v))
    }

    fn is_acute(&self, u: &Vector<F, D>, v: &Vector<F, D>) -> bool {
        SymmetricMatrix::is_acute(self, u, v)
    }

    fn is_definite(&self) -> bool {
        self.is_positive_definite()
    }
}

/// Rander norm `v ↦ |v|_m − ⟨w, v⟩`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RanderNorm<F, const D: usize> {
    /// Symmetric part.
    pub m: SymmetricMatrix<F, D>,
    /// Drift, with `|w|_{m⁻¹} < 1`.
    pub w: Vector<F, D>,
}

impl<F: Float, const D: usize> RanderNorm<F, D> {
    /// Norm with symmetric part `m` and vector `w`.
    pub fn new(m: SymmetricMatrix<F, D>, w: Vector<F, D>) -> Self {
        RanderNorm { m, w }
    }

    /// Dual norm, again of Rander type.
    ///
    /// ```text
    /// s = (m − w⊗w)⁻¹,   ω = s·w,   dual = (s·(1 + ⟨w, ω⟩), −ω)
    /// ```
    ///
    /// `None` when `m − w⊗w` is singular.
    pub fn dual(&self) -> Option<Self> {
        let s = (self.m - SymmetricMatrix::rank_one(&self.w)).inverse()?;
        let omega = s.apply(&self.w);
        Some(RanderNorm { m: s * (F::one() + self.w.dot(&omega)), w: omega.map(|x| -x) })
    }
}

impl<F: Float, const D: usize> Norm<F, D> for RanderNorm<F, D> {
    fn norm(&self, v: &Vector<F, D>) -> F {
        self.m.norm(v) - self.w.dot(v)
    }

    fn gradient(&self, v: &Vector<F, D>) -> Vector<F, D> {
        self.m.apply(v) * (F::one() / self.m.norm(v)) - self.w
    }

    fn is_definite(&self) -> bool {
        self.m
            .inverse()
            .is_some_and(|inv| self.m.is_positive_definite() && inv.squared_norm(&self.w) < F::one())
    }
}

/// Norm `v ↦ sqrt(vᵀmv + max(⟨w, v⟩, 0)²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AsymmetricQuadraticNorm<F, const D: usize> {
    /// Symmetric part.
    pub m: SymmetricMatrix<F, D>,
    /// Direction penalised on one side only.
    pub w: Vector<F, D>,
}

impl<F: Float, const D: usize> AsymmetricQuadraticNorm<F, D> {
    /// Norm with symmetric part `m` and vector `w`.
    pub fn new(m: SymmetricMatrix<F, D>, w: Vector<F, D>) -> Self {
        AsymmetricQuadraticNorm { m, w }
    }

    fn positive_part(&self, v: &Vector<F, D>) -> F {
        self.w.dot(v).max(F::zero())
    }

    /// Positive multiple of the gradient, `m·v + max(⟨w, v⟩, 0)·w`.
    pub fn scaled_gradient(&self, v: &Vector<F, D>) -> Vector<F, D> {
        self.m.apply(v) + self.w * self.positive_part(v)
    }
}

impl<F: Float, const D: usize> Norm<F, D> for AsymmetricQuadraticNorm<F, D> {
    fn norm(&self, v: &Vector<F, D>) -> F {
        let s = self.positive_part(v);
        (self.m.squared_norm(v) + s * s).sqrt()
    }

    fn gradient(&self, v: &Vector<F, D>) -> Vector<F, D> {
        let g = self.scaled_gradient(v);
        g * (F::one() / g.dot(v).sqrt())
    }

    // closed form of the gradient criterion
    fn is_acute(&self, u: &Vector<F, D>, v: &Vector<F, D>) -> bool {
        let muv = self.m.scalar_product(u, v);
        let wu = self.w.dot(u);
        let wv = self.w.dot(v);
        muv + (wu * wv.max(F::zero())).min(wv * wu.max(F::zero())) >= F::zero()
    }

    fn is_definite(&self) -> bool {
        self.m.is_positive_definite()
    }
}
