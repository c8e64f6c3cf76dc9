//! Symmetric matrices as quadratic forms
//!
//! A `SymmetricMatrix<F, D>` is the Gram matrix of a scalar product on `ℝᴰ`. It is stored in
//! full, and exposes its `D(D+1)/2` independent coefficients in packed order:
//!
//! ```text
//! m00, m10, m11, m20, m21, m22, ...      index(i, j) = i(i+1)/2 + j   for i ≥ j
//! ```
//!
//! Integer vectors are evaluated directly, without converting them first, so that the
//! reduction code can keep its lattice vectors exact.

use std::fmt;
use std::ops::{Add, Index, Mul, Sub};

use num_traits::{Float, NumCast, ToPrimitive};
use rand::Rng;

use super::matrix::Matrix;
use super::vector::Vector;

/// Number of independent coefficients of a symmetric `d × d` matrix.
pub const fn symmetric_dimension(d: usize) -> usize {
    d * (d + 1) / 2
}

/// Position of `(i, j)` in packed order.
pub const fn packed_index(i: usize, j: usize) -> usize {
    if i >= j { i * (i + 1) / 2 + j } else { j * (j + 1) / 2 + i }
}

#[inline(always)]
fn to_float<F: Float, T: ToPrimitive>(x: T) -> F {
    <F as NumCast>::from(x).expect("scalar-to-float conversion failed")
}

/// Symmetric `D × D` matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SymmetricMatrix<F, const D: usize> {
    data: [[F; D]; D],
}

impl<F: Float, const D: usize> SymmetricMatrix<F, D> {
    /// The zero matrix.
    pub fn zero() -> Self {
        SymmetricMatrix { data: [[F::zero(); D]; D] }
    }

    /// The identity matrix.
    pub fn identity() -> Self {
        Self::diagonal([F::one(); D])
    }

    /// Diagonal matrix with the given entries.
    pub fn diagonal(diag: [F; D]) -> Self {
        let mut m = Self::zero();
        for (i, &d) in diag.iter().enumerate() {
            m.data[i][i] = d;
        }
        m
    }

    /// Symmetrize a full matrix from its upper triangle. The lower triangle is ignored.
    pub fn from_upper_triangle(rows: [[F; D]; D]) -> Self {
        let mut m = Self::zero();
        for i in 0..D {
            for j in i..D {
                m.data[i][j] = rows[i][j];
                m.data[j][i] = rows[i][j];
            }
        }
        m
    }

    /// Build from packed coefficients, `None` if the length is not `D(D+1)/2`.
    pub fn from_coefficients(coefficients: &[F]) -> Option<Self> {
        if coefficients.len() != symmetric_dimension(D) {
            return None;
        }
        let mut m = Self::zero();
        for i in 0..D {
            for j in 0..=i {
                let c = coefficients[packed_index(i, j)];
                m.data[i][j] = c;
                m.data[j][i] = c;
            }
        }
        Some(m)
    }

    /// Packed coefficients, lower triangle row by row.
    pub fn coefficients(&self) -> Vec<F> {
        let mut out = Vec::with_capacity(symmetric_dimension(D));
        for i in 0..D {
            for j in 0..=i {
                out.push(self.data[i][j]);
            }
        }
        out
    }

    /// Convert to another float type.
    pub fn cast<G: Float>(&self) -> SymmetricMatrix<G, D> {
        SymmetricMatrix { data: self.data.map(|row| row.map(to_float)) }
    }

    /// `v ⊗ v`.
    pub fn rank_one<T: Copy + ToPrimitive>(v: &Vector<T, D>) -> Self {
        let v: [F; D] = v.0.map(to_float);
        let mut m = Self::zero();
        for i in 0..D {
            for j in 0..D {
                m.data[i][j] = v[i] * v[j];
            }
        }
        m
    }

    /// `Aᵀ·A` with the entries of `A` drawn uniformly in `[-1, 1]`.
    ///
    /// Almost surely positive definite.
    pub fn random_positive<R: Rng>(rng: &mut R) -> Self {
        let a: [[F; D]; D] =
            std::array::from_fn(|_| std::array::from_fn(|_| to_float(rng.gen_range(-1.0_f64..=1.0))));
        let mut m = Self::zero();
        for i in 0..D {
            for j in 0..D {
                m.data[i][j] = (0..D).fold(F::zero(), |acc, k| acc + a[k][i] * a[k][j]);
            }
        }
        m
    }

    /// Entry `(i, j)`; symmetric in `i` and `j`.
    pub fn get(&self, i: usize, j: usize) -> F {
        self.data[i][j]
    }

    /// Set entries `(i, j)` and `(j, i)`.
    pub fn set(&mut self, i: usize, j: usize, value: F) {
        self.data[i][j] = value;
        self.data[j][i] = value;
    }

    /// Full square representation.
    pub fn as_matrix(&self) -> Matrix<F, D> {
        Matrix(self.data)
    }

    /// `M·v`.
    pub fn apply<T: Copy + ToPrimitive>(&self, v: &Vector<T, D>) -> Vector<F, D> {
        let v: [F; D] = v.0.map(to_float);
        Vector(std::array::from_fn(|i| {
            (0..D).fold(F::zero(), |acc, j| acc + self.data[i][j] * v[j])
        }))
    }

    /// `uᵀ·M·v`, for integer or real vectors.
    pub fn scalar_product<T: Copy + ToPrimitive>(&self, u: &Vector<T, D>, v: &Vector<T, D>) -> F {
        let u: [F; D] = u.0.map(to_float);
        self.apply(v)
            .0
            .iter()
            .zip(u)
            .fold(F::zero(), |acc, (&mv, ui)| acc + ui * mv)
    }

    /// `vᵀ m v`.
    pub fn squared_norm<T: Copy + ToPrimitive>(&self, v: &Vector<T, D>) -> F {
        self.scalar_product(v, v)
    }

    /// `sqrt(vᵀ m v)`.
    pub fn norm<T: Copy + ToPrimitive>(&self, v: &Vector<T, D>) -> F {
        self.squared_norm(v).sqrt()
    }

    /// `uᵀ·M·v ≥ 0`.
    pub fn is_acute<T: Copy + ToPrimitive>(&self, u: &Vector<T, D>, v: &Vector<T, D>) -> bool {
        self.scalar_product(u, v) >= F::zero()
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> F {
        (0..D).fold(F::zero(), |acc, i| acc + self.data[i][i])
    }

    /// Frobenius pairing `Σ_ij m_ij n_ij`.
    pub fn frobenius(&self, other: &Self) -> F {
        self.data
            .iter()
            .flatten()
            .zip(other.data.iter().flatten())
            .fold(F::zero(), |acc, (&a, &b)| acc + a * b)
    }

    /// Entrywise absolute value.
    pub fn abs(&self) -> Self {
        SymmetricMatrix { data: self.data.map(|row| row.map(F::abs)) }
    }

    /// Largest entry in absolute value.
    pub fn max_abs(&self) -> F {
        self.data.iter().flatten().fold(F::zero(), |m, x| m.max(x.abs()))
    }

    /// Whether every entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data.iter().flatten().all(|x| x.is_finite())
    }

    /// Determinant, by Gaussian elimination.
    pub fn determinant(&self) -> F {
        self.as_matrix().determinant()
    }

    /// `None` when the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let inv = self.as_matrix().inverse()?;
        // restore exact symmetry lost to rounding
        let mut m = Self::zero();
        for i in 0..D {
            for j in 0..=i {
                let half = (inv.0[i][j] + inv.0[j][i]) / to_float(2);
                m.set(i, j, half);
            }
        }
        Some(m)
    }

    /// Lower-triangular Cholesky factor `L` with `M = L·Lᵀ`.
    ///
    /// `None` when a pivot falls below `1e-12 · max|m_ii|`, which is how positive
    /// definiteness is decided throughout the crate.
    pub fn cholesky(&self) -> Option<[[F; D]; D]> {
        if !self.is_finite() {
            return None;
        }
        let scale = (0..D).fold(F::zero(), |m, i| m.max(self.data[i][i].abs()));
        let floor = scale * to_float(1e-12);
        let mut l = [[F::zero(); D]; D];
        for i in 0..D {
            for j in 0..=i {
                let s = (0..j).fold(self.data[i][j], |acc, k| acc - l[i][k] * l[j][k]);
                if i == j {
                    if !(s > floor) {
                        return None;
                    }
                    l[i][i] = s.sqrt();
                } else {
                    l[i][j] = s / l[j][j];
                }
            }
        }
        Some(l)
    }

    /// Cholesky test.
    pub fn is_positive_definite(&self) -> bool {
        D > 0 && self.cholesky().is_some()
    }

    /// `a·M·aᵀ`: the form in the basis given by the rows of `a`.
    pub fn gram<T: Copy + ToPrimitive>(&self, a: &Matrix<T, D>) -> Self {
        let rows: [Vector<F, D>; D] = std::array::from_fn(|i| Vector(a.0[i]).map(to_float));
        let mut m = Self::zero();
        for i in 0..D {
            let mi = self.apply(&rows[i]);
            for j in 0..=i {
                m.set(i, j, mi.dot(&rows[j]));
            }
        }
        m
    }

    /// Solve `M·x = b` by conjugate gradients.
    ///
    /// Exact after `D` steps in exact arithmetic. Stops early when the residual vanishes.
    pub fn cg_solve(&self, b: &Vector<F, D>) -> Vector<F, D> {
        let mut x = Vector::<F, D>::zero();
        let mut r = *b;
        let mut p = r;
        let mut rr = r.dot(&r);
        let tol = b.dot(b) * F::epsilon() * F::epsilon();
        for _ in 0..D {
            if !(rr > tol) {
                break;
            }
            let mp = self.apply(&p);
            let alpha = rr / p.dot(&mp);
            x = x + p * alpha;
            r = r - mp * alpha;
            let rr_next = r.dot(&r);
            p = r + p * (rr_next / rr);
            rr = rr_next;
        }
        x
    }
}

impl<F: Float, const D: usize> Add for SymmetricMatrix<F, D> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        SymmetricMatrix {
            data: std::array::from_fn(|i| std::array::from_fn(|j| self.data[i][j] + rhs.data[i][j])),
        }
    }
}

impl<F: Float, const D: usize> Sub for SymmetricMatrix<F, D> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        SymmetricMatrix {
            data: std::array::from_fn(|i| std::array::from_fn(|j| self.data[i][j] - rhs.data[i][j])),
        }
    }
}

impl<F: Float, const D: usize> Mul<F> for SymmetricMatrix<F, D> {
    type Output = Self;
    fn mul(self, rhs: F) -> Self {
        SymmetricMatrix { data: self.data.map(|row| row.map(|x| x * rhs)) }
    }
}

impl<F, const D: usize> Index<(usize, usize)> for SymmetricMatrix<F, D> {
    type Output = F;
    fn index(&self, (i, j): (usize, usize)) -> &F {
        &self.data[i][j]
    }
}

impl<F: Float + fmt::Display, const D: usize> fmt::Display for SymmetricMatrix<F, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.as_matrix(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn packed_order_is_lower_triangle_by_rows() {
        let m = SymmetricMatrix::<f64, 3>::from_upper_triangle([
            [1.0, 2.0, 4.0],
            [0.0, 3.0, 5.0],
            [0.0, 0.0, 6.0],
        ]);
        assert_eq!(m.coefficients(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(SymmetricMatrix::from_coefficients(&m.coefficients()), Some(m));
        assert_eq!(packed_index(1, 2), 4);
        assert_eq!(packed_index(2, 1), 4);
        assert!(SymmetricMatrix::<f64, 3>::from_coefficients(&[1.0; 5]).is_none());
    }

    #[test]
    fn integer_vectors_are_evaluated_exactly() {
        let m = SymmetricMatrix::<f64, 2>::from_coefficients(&[2.0, -1.0, 3.0]).unwrap();
        let u = Vector([1_i64, 1]);
        let v = Vector([1_i64, -2]);
        // uᵀ M v = [1 1]·[[2,-1],[-1,3]]·[1,-2] = [1 1]·[4,-7]
        assert_abs_diff_eq!(m.scalar_product(&u, &v), -3.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.squared_norm(&u), 3.0, epsilon = 1e-12);
        assert!(!m.is_acute(&u, &v));
    }

    #[test]
    fn cholesky_decides_positive_definiteness() {
        let pd = SymmetricMatrix::<f64, 2>::from_coefficients(&[2.0, 1.0, 2.0]).unwrap();
        let indefinite = SymmetricMatrix::<f64, 2>::from_coefficients(&[1.0, 2.0, 1.0]).unwrap();
        let singular = SymmetricMatrix::<f64, 2>::from_coefficients(&[1.0, 1.0, 1.0]).unwrap();
        let nan = SymmetricMatrix::<f64, 2>::from_coefficients(&[1.0, f64::NAN, 1.0]).unwrap();
        assert!(pd.is_positive_definite());
        assert!(!indefinite.is_positive_definite());
        assert!(!singular.is_positive_definite());
        assert!(!nan.is_positive_definite());
        assert!(!SymmetricMatrix::<f64, 2>::zero().is_positive_definite());
    }

    #[test]
    fn gram_changes_basis() {
        let m = SymmetricMatrix::<f64, 2>::identity() * 2.0;
        let a = Matrix([[1_i64, 1], [0, 1]]);
        let g = m.gram(&a);
        assert_eq!(g.coefficients(), vec![4.0, 2.0, 2.0]);
        assert_relative_eq!(g.determinant(), m.determinant(), epsilon = 1e-12);
    }

    #[test]
    fn rank_one_tensors_sum_to_identity() {
        let sum = SymmetricMatrix::<f64, 3>::rank_one(&Vector::<i64, 3>::unit(0))
            + SymmetricMatrix::rank_one(&Vector::<i64, 3>::unit(1))
            + SymmetricMatrix::rank_one(&Vector::<i64, 3>::unit(2));
        assert_eq!(sum, SymmetricMatrix::identity());
    }

    #[test]
    fn random_positive_matrices_are_positive_definite() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
        for _ in 0..100 {
            let m = SymmetricMatrix::<f64, 4>::random_positive(&mut rng);
            assert!(m.is_positive_definite());
            assert!(m.determinant() > 0.0 && m.trace() > 0.0);
        }
    }

    #[test]
    fn inverse_and_conjugate_gradient_agree() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let m = SymmetricMatrix::<f64, 5>::random_positive(&mut rng) + SymmetricMatrix::identity();
        let b = Vector([1.0, -2.0, 0.5, 3.0, -1.0]);
        let direct = m.inverse().unwrap().apply(&b);
        let cg = m.cg_solve(&b);
        for i in 0..5 {
            assert_abs_diff_eq!(direct[i], cg[i], epsilon = 1e-9);
        }
        let back = m.apply(&cg);
        for i in 0..5 {
            assert_abs_diff_eq!(back[i], b[i], epsilon = 1e-9);
        }
    }

    #[test]
    fn frobenius_pairing_counts_off_diagonals_twice() {
        let m = SymmetricMatrix::<f64, 2>::from_coefficients(&[1.0, 2.0, 3.0]).unwrap();
        let n = SymmetricMatrix::<f64, 2>::from_coefficients(&[1.0, 1.0, 1.0]).unwrap();
        assert_abs_diff_eq!(m.frobenius(&n), 1.0 + 2.0 * 2.0 + 3.0, epsilon = 1e-12);
    }
}
