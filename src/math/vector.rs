//! Fixed-size coordinate vectors
//!
//! # Motivation
//! Lattice reduction manipulates two kinds of vectors side by side: integer offsets, which
//! live in `ℤᴰ` and must stay exact, and real vectors on which quadratic forms are evaluated.
//! Both are the same `[T; D]` array with the same module structure, so a single
//! value type carries them and `cast` moves between the two worlds.
//!
//! The dimension is a const parameter: vectors are `Copy` and live on the stack.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Neg, Sub, SubAssign};

use num_traits::{Float, Num, NumCast, One, Signed, ToPrimitive, Zero};

/// Column vector of dimension `D`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Vector<T, const D: usize>(pub [T; D]);

/// Integer lattice vector, used for bases, superbases and decomposition offsets.
pub type Offset<const D: usize> = Vector<i64, D>;

impl<T: Copy + Zero, const D: usize> Vector<T, D> {
    /// Zero vector.
    pub fn zero() -> Self {
        Vector([T::zero(); D])
    }

    /// Whether every coordinate is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Zero::is_zero)
    }
}

impl<T: Copy + Zero + One, const D: usize> Vector<T, D> {
    /// `i`-th vector of the canonical basis.
    pub fn unit(i: usize) -> Self {
        let mut v = Self::zero();
        v.0[i] = T::one();
        v
    }
}

impl<T: Copy, const D: usize> Vector<T, D> {
    /// Build from the coordinate function `f`.
    pub fn from_fn<G: FnMut(usize) -> T>(f: G) -> Self {
        Vector(std::array::from_fn(f))
    }

    /// Apply `f` to every coordinate.
    pub fn map<U, G: FnMut(T) -> U>(self, f: G) -> Vector<U, D> {
        Vector(self.0.map(f))
    }

    /// Borrow the coordinates.
    pub fn as_array(&self) -> &[T; D] {
        &self.0
    }

    /// Iterate over the coordinates.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T: Copy + Num, const D: usize> Vector<T, D> {
    /// Euclidean scalar product.
    pub fn dot(&self, other: &Self) -> T {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(T::zero(), |acc, (&a, &b)| acc + a * b)
    }

    /// `⟨v, v⟩`.
    pub fn squared_norm(&self) -> T {
        self.dot(self)
    }
}

impl<T: Copy + ToPrimitive, const D: usize> Vector<T, D> {
    /// Convert the coordinates to a float type.
    ///
    /// Panics if a coordinate cannot be represented, which does not happen for
    /// integer-to-float conversions.
    pub fn cast<F: Float>(self) -> Vector<F, D> {
        self.map(|x| <F as NumCast>::from(x).expect("coordinate-to-float conversion failed"))
    }
}

impl<const D: usize> Offset<D> {
    /// Representative of `±self` whose first nonzero coordinate is positive.
    pub fn canonical(self) -> Self {
        match self.0.iter().find(|&&x| x != 0) {
            Some(&x) if x < 0 => -self,
            _ => self,
        }
    }

    /// Largest absolute coordinate.
    pub fn max_abs(&self) -> i64 {
        self.0.iter().map(|x| x.abs()).max().unwrap_or(0)
    }
}

impl<F: Float, const D: usize> Vector<F, D> {
    /// Round every coordinate to the nearest integer, half away from zero.
    pub fn round(self) -> Option<Offset<D>> {
        let mut out = [0_i64; D];
        for (o, x) in out.iter_mut().zip(self.0) {
            *o = x.round().to_i64()?;
        }
        Some(Vector(out))
    }
}

impl<T: Copy + Signed> Vector<T, 2> {
    /// Rotation by a quarter turn: `(x, y) ↦ (-y, x)`.
    pub fn perp(&self) -> Self {
        Vector([-self.0[1], self.0[0]])
    }
}

impl<T: Copy + Num> Vector<T, 3> {
    /// Cross product, only meaningful for D = 3.
    pub fn cross(&self, other: &Self) -> Self {
        let [a0, a1, a2] = self.0;
        let [b0, b1, b2] = other.0;
        Vector([a1 * b2 - a2 * b1, a2 * b0 - a0 * b2, a0 * b1 - a1 * b0])
    }
}

// --- Arithmetic ----------------------------------------------------------------

impl<T: Copy + Num, const D: usize> Add for Vector<T, D> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Vector(std::array::from_fn(|i| self.0[i] + rhs.0[i]))
    }
}

impl<T: Copy + Num, const D: usize> Sub for Vector<T, D> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Vector(std::array::from_fn(|i| self.0[i] - rhs.0[i]))
    }
}

impl<T: Copy + Num, const D: usize> AddAssign for Vector<T, D> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<T: Copy + Num, const D: usize> SubAssign for Vector<T, D> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<T: Copy + Signed, const D: usize> Neg for Vector<T, D> {
    type Output = Self;
    fn neg(self) -> Self {
        self.map(|x| -x)
    }
}

impl<T: Copy + Num, const D: usize> Mul<T> for Vector<T, D> {
    type Output = Self;
    fn mul(self, rhs: T) -> Self {
        self.map(|x| x * rhs)
    }
}

impl<T: Copy + Num, const D: usize> Sum for Vector<T, D> {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Vector([T::zero(); D]), |acc, v| acc + v)
    }
}

impl<T, const D: usize> Index<usize> for Vector<T, D> {
    type Output = T;
    fn index(&self, i: usize) -> &T {
        &self.0[i]
    }
}

impl<T, const D: usize> IndexMut<usize> for Vector<T, D> {
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.0[i]
    }
}

impl<T, const D: usize> From<[T; D]> for Vector<T, D> {
    fn from(array: [T; D]) -> Self {
        Vector(array)
    }
}

impl<T: fmt::Display, const D: usize> fmt::Display for Vector<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, x) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", x)?;
        }
        write!(f, ")")
    }
}
