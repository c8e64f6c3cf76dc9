use std::fmt;
use std::ops::{Index, IndexMut, Mul};

use num_traits::{Float, Num, NumCast, ToPrimitive};

use super::vector::Vector;

/// Square `D × D` matrix stored row by row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Matrix<T, const D: usize>(pub [[T; D]; D]);

impl<T: Copy + Num, const D: usize> Matrix<T, D> {
    /// The zero matrix.
    pub fn zero() -> Self {
        Matrix([[T::zero(); D]; D])
    }

    /// The identity matrix.
    pub fn identity() -> Self {
        let mut m = Self::zero();
        for i in 0..D {
            m.0[i][i] = T::one();
        }
        m
    }

    /// Matrix with the given rows.
    pub fn from_rows(rows: [Vector<T, D>; D]) -> Self {
        Matrix(rows.map(|r| r.0))
    }

    /// Matrix with the given columns.
    pub fn from_columns(columns: [Vector<T, D>; D]) -> Self {
        Self::from_rows(columns).transpose()
    }

    /// Row `i`, as a vector.
    pub fn row(&self, i: usize) -> Vector<T, D> {
        Vector(self.0[i])
    }

    /// Column `j`, as a vector.
    pub fn column(&self, j: usize) -> Vector<T, D> {
        Vector(std::array::from_fn(|i| self.0[i][j]))
    }

    /// Transposed matrix.
    pub fn transpose(&self) -> Self {
        Matrix(std::array::from_fn(|i| std::array::from_fn(|j| self.0[j][i])))
    }

    /// Sum of the diagonal.
    pub fn trace(&self) -> T {
        (0..D).fold(T::zero(), |acc, i| acc + self.0[i][i])
    }

    /// Apply `f` to every entry.
    pub fn map<U, G: FnMut(T) -> U>(self, mut f: G) -> Matrix<U, D> {
        Matrix(self.0.map(|row| row.map(&mut f)))
    }
}

impl<T: Copy + Num + ToPrimitive, const D: usize> Matrix<T, D> {
    /// Convert the entries to a float type.
    pub fn cast<F: Float>(self) -> Matrix<F, D> {
        self.map(|x| <F as NumCast>::from(x).expect("entry-to-float conversion failed"))
    }
}

impl<F: Float, const D: usize> Matrix<F, D> {
    /// Determinant by Gaussian elimination with partial pivoting.
    pub fn determinant(&self) -> F {
        let mut a = self.0;
        let mut det = F::one();
        for c in 0..D {
            let p = (c..D)
                .max_by(|&x, &y| a[x][c].abs().partial_cmp(&a[y][c].abs()).unwrap_or(std::cmp::Ordering::Equal))
                .unwrap_or(c);
            if !(a[p][c].abs() > F::zero()) {
                return F::zero();
            }
            if p != c {
                a.swap(p, c);
                det = -det;
            }
            det = det * a[c][c];
            for r in c + 1..D {
                let f = a[r][c] / a[c][c];
                for k in c..D {
                    a[r][k] = a[r][k] - f * a[c][k];
                }
            }
        }
        det
    }

    /// Inverse by Gauss-Jordan elimination, `None` if a pivot vanishes.
    pub fn inverse(&self) -> Option<Self> {
        let mut a = self.0;
        let mut inv = Self::identity().0;
        let scale = a.iter().flatten().fold(F::zero(), |m, x| m.max(x.abs()));
        let tiny = scale * F::epsilon();
        for c in 0..D {
            let p = (c..D).max_by(|&x, &y| {
                a[x][c].abs().partial_cmp(&a[y][c].abs()).unwrap_or(std::cmp::Ordering::Equal)
            })?;
            if !(a[p][c].abs() > tiny) {
                return None;
            }
            a.swap(p, c);
            inv.swap(p, c);
            let pivot = a[c][c];
            for k in 0..D {
                a[c][k] = a[c][k] / pivot;
                inv[c][k] = inv[c][k] / pivot;
            }
            for r in 0..D {
                if r == c {
                    continue;
                }
                let f = a[r][c];
                for k in 0..D {
                    a[r][k] = a[r][k] - f * a[c][k];
                    inv[r][k] = inv[r][k] - f * inv[c][k];
                }
            }
        }
        Some(Matrix(inv))
    }
}

impl<const D: usize> Matrix<i64, D> {
    /// Exact determinant (Bareiss fraction-free elimination).
    pub fn exact_determinant(&self) -> i64 {
        let mut a = self.0;
        let mut sign = 1;
        let mut prev = 1;
        for k in 0..D {
            if a[k][k] == 0 {
                match (k + 1..D).find(|&r| a[r][k] != 0) {
                    Some(r) => {
                        a.swap(r, k);
                        sign = -sign;
                    }
                    None => return 0,
                }
            }
            for i in k + 1..D {
                for j in k + 1..D {
                    a[i][j] = (a[i][j] * a[k][k] - a[i][k] * a[k][j]) / prev;
                }
            }
            prev = a[k][k];
        }
        if D == 0 { 1 } else { sign * a[D - 1][D - 1] }
    }

    /// Inverse of a unimodular matrix, exact.
    ///
    /// Returns `None` if `self` is not invertible over the integers.
    pub fn unimodular_inverse(&self) -> Option<Self> {
        if self.exact_determinant().abs() != 1 {
            return None;
        }
        let approx = self.cast::<f64>().inverse()?;
        let mut inv = [[0_i64; D]; D];
        for (row, src) in inv.iter_mut().zip(approx.0) {
            for (x, y) in row.iter_mut().zip(src) {
                *x = y.round().to_i64()?;
            }
        }
        let inv = Matrix(inv);
        (inv * *self == Self::identity()).then_some(inv)
    }
}

impl<T: Copy + Num, const D: usize> Mul for Matrix<T, D> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Matrix(std::array::from_fn(|i| {
            std::array::from_fn(|j| (0..D).fold(T::zero(), |acc, k| acc + self.0[i][k] * rhs.0[k][j]))
        }))
    }
}

impl<T: Copy + Num, const D: usize> Mul<Vector<T, D>> for Matrix<T, D> {
    type Output = Vector<T, D>;
    fn mul(self, rhs: Vector<T, D>) -> Vector<T, D> {
        Vector(std::array::from_fn(|i| self.row(i).dot(&rhs)))
    }
}

impl<T, const D: usize> Index<(usize, usize)> for Matrix<T, D> {
    type Output = T;
    fn index(&self, (i, j): (usize, usize)) -> &T {
        &self.0[i][j]
    }
}

impl<T, const D: usize> IndexMut<(usize, usize)> for Matrix<T, D> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut T {
        &mut self.0[i][j]
    }
}

impl<T: fmt::Display, const D: usize> fmt::Display for Matrix<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, row) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            for (j, x) in row.iter().enumerate() {
                if j > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", x)?;
            }
        }
        write!(f, "]")
    }
}
