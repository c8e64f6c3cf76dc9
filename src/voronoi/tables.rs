//! Perfect forms of dimension one to five with their KKT data.
//!
//! Every table stores, for one class of perfect quadratic forms:
//! * `form`, the packed lower triangle of a representative with minimum one,
//! * `support`, its minimal vectors (one per ± pair). The first `D(D+1)/2` of them are
//!   linearly independent as rank-one tensors,
//! * `kkt`, the row-major inverse of the map from weights to packed coefficients over
//!   those first `D(D+1)/2` supports.
//!
//! ```text
//! packed(m) = Σ_j weight_j · packed(s_j ⊗ s_j)      (j < D(D+1)/2)
//! weight    = kkt · packed(m)
//! ```
//!
//! Coefficients are packed row by row from the lower triangle: `m00, m10, m11, m20, ...`.

use crate::math::{Offset, SymmetricMatrix, Vector};

/// One class of perfect forms, in packed coordinates.
#[derive(Debug)]
pub(crate) struct Vertex {
    pub form: &'static [f64],
    pub support: &'static [&'static [i64]],
    pub kkt: &'static [f64],
}

impl Vertex {
    /// Number of supports beyond the `D(D+1)/2` handled by the KKT matrix.
    pub fn extra(&self, symdim: usize) -> usize {
        self.support.len() - symdim
    }

    pub fn is_degenerate(&self, symdim: usize) -> bool {
        self.support.len() > symdim
    }

    pub fn form_matrix<const D: usize>(&self) -> SymmetricMatrix<f64, D> {
        SymmetricMatrix::from_coefficients(self.form).expect("perfect form table has packed length")
    }

    pub fn supports<const D: usize>(&self) -> Vec<Offset<D>> {
        self.support.iter().map(|s| Vector::from_fn(|i| s[i])).collect()
    }

    /// `kkt · packed`.
    pub fn apply_kkt(&self, packed: &[f64]) -> Vec<f64> {
        self.kkt.chunks_exact(packed.len()).map(|row| row.iter().zip(packed).map(|(a, b)| a * b).sum::<f64>()).collect()
    }

    /// Row `i` of the KKT matrix.
    pub fn kkt_row(&self, i: usize, symdim: usize) -> &'static [f64] {
        &self.kkt[i * symdim..(i + 1) * symdim]
    }
}

/// Perfect forms of dimension `dim`, indexed by vertex case.
///
/// Returns an empty slice for unsupported dimensions.
pub(crate) fn vertices(dim: usize) -> &'static [Vertex] {
    match dim {
        1 => &[A1],
        2 => &[A2],
        3 => &[A3],
        4 => &[D4, A4],
        5 => &[D5, A5, A5_3],
        _ => &[],
    }
}

/// The unique form of dimension one.
const A1: Vertex = Vertex {
    form: &[1.0],
    support: &[&[1]],
    kkt: &[1.0],
};

/// Hexagonal form `A2`.
const A2: Vertex = Vertex {
    form: &[
        1.0,
        0.5, 1.0,
    ],
    support: &[
        &[1, 0], &[0, 1], &[1, -1],
    ],
    kkt: &[
         1.0,  1.0,  0.0,
         0.0,  1.0,  1.0,
         0.0, -1.0,  0.0,
    ],
};

/// Face-centred cubic form `A3`.
const A3: Vertex = Vertex {
    form: &[
        1.0,
        0.5, 1.0,
        0.5, 0.5, 1.0,
    ],
    support: &[
        &[1, 0, 0], &[0, 1, 0], &[0, 0, 1], &[1, 0, -1], &[1, -1, 0],
        &[0, 1, -1],
    ],
    kkt: &[
         1.0,  1.0,  0.0,  1.0,  0.0,  0.0,
         0.0,  1.0,  1.0,  0.0,  1.0,  0.0,
         0.0,  0.0,  0.0,  1.0,  1.0,  1.0,
         0.0,  0.0,  0.0, -1.0,  0.0,  0.0,
         0.0, -1.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0, -1.0,  0.0,
    ],
};

/// Checkerboard form `D4`. Twelve minimal vectors, so the KKT system keeps two free coefficients.
const D4: Vertex = Vertex {
    form: &[
        1.0,
        0.5, 1.0,
        0.5, 0.5, 1.0,
        0.0, 0.5, 0.5, 1.0,
    ],
    support: &[
        &[1, 0, 0, 0], &[0, 1, 0, 0], &[0, 0, 1, 0], &[0, 0, 0, 1], &[1, 0, -1, 0],
        &[1, -1, 0, 0], &[0, 1, 0, -1], &[0, 1, -1, 0], &[0, 0, 1, -1], &[1, 0, -1, 1],
        &[1, -1, 0, 1], &[1, -1, -1, 1],
    ],
    kkt: &[
         1.0,  1.0,  0.0,  1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  1.0,  1.0,  0.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  1.0,  0.0,  1.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  1.0,  1.0,
         0.0,  0.0,  0.0, -1.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,
         0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0, -1.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,
    ],
};

/// Root form `A4`.
const A4: Vertex = Vertex {
    form: &[
        1.0,
        0.5, 1.0,
        0.5, 0.5, 1.0,
        0.5, 0.5, 0.5, 1.0,
    ],
    support: &[
        &[1, 0, 0, 0], &[0, 1, 0, 0], &[0, 0, 1, 0], &[0, 0, 0, 1], &[1, 0, 0, -1],
        &[1, 0, -1, 0], &[1, -1, 0, 0], &[0, 1, 0, -1], &[0, 1, -1, 0], &[0, 0, 1, -1],
    ],
    kkt: &[
         1.0,  1.0,  0.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,
         0.0,  1.0,  1.0,  0.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  0.0,  0.0,  1.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  1.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,
    ],
};

/// Checkerboard form `D5`. Twenty minimal vectors, five free coefficients.
const D5: Vertex = Vertex {
    form: &[
        1.0,
        0.5, 1.0,
        0.5, 0.5, 1.0,
        0.5, 0.5, 0.5, 1.0,
        0.0, 0.5, 0.5, 0.5, 1.0,
    ],
    support: &[
        &[1, 0, 0, 0, 0], &[0, 1, 0, 0, 0], &[0, 0, 1, 0, 0], &[0, 0, 0, 1, 0],
        &[0, 0, 0, 0, 1], &[1, 0, 0, -1, 0], &[1, 0, -1, 0, 0], &[1, -1, 0, 0, 0],
        &[0, 1, 0, 0, -1], &[0, 1, 0, -1, 0], &[0, 1, -1, 0, 0], &[0, 0, 1, 0, -1],
        &[0, 0, 1, -1, 0], &[0, 0, 0, 1, -1], &[1, 0, 0, -1, 1], &[1, 0, -1, 0, 1],
        &[1, -1, 0, 0, 1], &[1, 0, -1, -1, 1], &[1, -1, 0, -1, 1], &[1, -1, -1, 0, 1],
    ],
    kkt: &[
         1.0,  1.0,  0.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  1.0,  1.0,  0.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  1.0,  1.0,  0.0,  0.0,  1.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  1.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0, -1.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  0.0,
    ],
};

/// Root form `A5`.
const A5: Vertex = Vertex {
    form: &[
        1.0,
        0.5, 1.0,
        0.5, 0.5, 1.0,
        0.5, 0.5, 0.5, 1.0,
        0.5, 0.5, 0.5, 0.5, 1.0,
    ],
    support: &[
        &[1, 0, 0, 0, 0], &[0, 1, 0, 0, 0], &[0, 0, 1, 0, 0], &[0, 0, 0, 1, 0],
        &[0, 0, 0, 0, 1], &[1, 0, 0, 0, -1], &[1, 0, 0, -1, 0], &[1, 0, -1, 0, 0],
        &[1, -1, 0, 0, 0], &[0, 1, 0, 0, -1], &[0, 1, 0, -1, 0], &[0, 1, -1, 0, 0],
        &[0, 0, 1, 0, -1], &[0, 0, 1, -1, 0], &[0, 0, 0, 1, -1],
    ],
    kkt: &[
         1.0,  1.0,  0.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  1.0,  1.0,  0.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  1.0,  0.0,  0.0,  0.0,  1.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  1.0,  1.0,  1.0,  1.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,
         0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0,  0.0,
    ],
};

/// Third perfect form of dimension five, `A5^3`.
const A5_3: Vertex = Vertex {
    form: &[
        1.0,
        0.25, 1.0,
        0.25, 0.25, 1.0,
        -0.5, -0.5, -0.5, 1.0,
        -0.5, -0.5, -0.5, 0.25, 1.0,
    ],
    support: &[
        &[1, 0, 0, 0, 0], &[0, 1, 0, 0, 0], &[0, 0, 1, 0, 0], &[0, 0, 0, 1, 0],
        &[0, 0, 0, 0, 1], &[1, 0, 0, 1, 0], &[1, 0, 0, 0, 1], &[0, 1, 0, 1, 0],
        &[0, 1, 0, 0, 1], &[0, 0, 1, 1, 0], &[0, 0, 1, 0, 1], &[1, 1, 0, 1, 1],
        &[1, 0, 1, 1, 1], &[0, 1, 1, 1, 1], &[1, 1, 1, 1, 1],
    ],
    kkt: &[
         1.0,  0.5,  0.0,  0.5, -0.5,  0.0, -1.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.5,  0.0,
         0.0,  0.5,  1.0, -0.5,  0.5,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0, -1.0,  0.0,  0.5,  0.0,
         0.0, -0.5,  0.0,  0.5,  0.5,  1.0,  0.0,  0.0, -1.0,  0.0,  0.0,  0.0, -1.0,  0.5,  0.0,
         0.0,  0.5,  0.0,  0.5,  0.5,  0.0, -1.0, -1.0, -1.0,  1.0,  0.0,  0.0,  0.0,  0.5,  0.0,
         0.0,  0.5,  0.0,  0.5,  0.5,  0.0,  0.0,  0.0,  0.0,  0.0, -1.0, -1.0, -1.0,  0.5,  1.0,
         0.0, -0.5,  0.0, -0.5,  0.5,  0.0,  1.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -0.5,  0.0,
         0.0, -0.5,  0.0, -0.5,  0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0, -0.5,  0.0,
         0.0, -0.5,  0.0,  0.5, -0.5,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  0.0,  0.0, -0.5,  0.0,
         0.0, -0.5,  0.0,  0.5, -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0,  0.0, -0.5,  0.0,
         0.0,  0.5,  0.0, -0.5, -0.5,  0.0,  0.0,  0.0,  1.0,  0.0,  0.0,  0.0,  0.0, -0.5,  0.0,
         0.0,  0.5,  0.0, -0.5, -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  1.0, -0.5,  0.0,
         0.0,  0.5,  0.0, -0.5, -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.5,  0.0,
         0.0, -0.5,  0.0,  0.5, -0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.5,  0.0,
         0.0, -0.5,  0.0, -0.5,  0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.5,  0.0,
         0.0,  0.5,  0.0,  0.5,  0.5,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0,  0.0, -0.5,  0.0,
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use itertools::Itertools;

    fn packed_rank_one(s: &[i64]) -> Vec<f64> {
        let mut out = Vec::new();
        for i in 0..s.len() {
            for j in 0..=i {
                out.push((s[i] * s[j]) as f64);
            }
        }
        out
    }

    fn form_norm(form: &[f64], s: &[i64]) -> f64 {
        let mut acc = 0.0;
        let mut k = 0;
        for i in 0..s.len() {
            for j in 0..=i {
                let factor = if i == j { 1.0 } else { 2.0 };
                acc += factor * form[k] * (s[i] * s[j]) as f64;
                k += 1;
            }
        }
        acc
    }

    #[test]
    fn table_shapes_match_dimension() {
        for dim in 1..=5 {
            let symdim = dim * (dim + 1) / 2;
            for vertex in vertices(dim) {
                assert_eq!(vertex.form.len(), symdim, "form length in dimension {}", dim);
                assert_eq!(vertex.kkt.len(), symdim * symdim, "kkt size in dimension {}", dim);
                assert!(vertex.support.len() >= symdim);
                assert!(vertex.support.iter().all(|s| s.len() == dim));
            }
        }
        assert!(vertices(6).is_empty());
        assert!(vertices(0).is_empty());
    }

    #[test]
    fn kkt_matrix_inverts_support_tensors() {
        for dim in 1..=5 {
            let symdim = dim * (dim + 1) / 2;
            for vertex in vertices(dim) {
                for (j, s) in vertex.support.iter().take(symdim).enumerate() {
                    let t = packed_rank_one(s);
                    for r in 0..symdim {
                        let w: f64 = (0..symdim).map(|c| vertex.kkt[r * symdim + c] * t[c]).sum();
                        let expected = if r == j { 1.0 } else { 0.0 };
                        assert_abs_diff_eq!(w, expected, epsilon = 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn supports_are_minimal_vectors_of_unit_norm() {
        for dim in 1..=5 {
            for vertex in vertices(dim) {
                for s in vertex.support {
                    assert_abs_diff_eq!(form_norm(vertex.form, s), 1.0, epsilon = 1e-12);
                }
                // no vector with small entries is shorter than the supports
                for x in (0..dim).map(|_| -2..=2_i64).multi_cartesian_product() {
                    if x.iter().all(|&c| c == 0) {
                        continue;
                    }
                    assert!(form_norm(vertex.form, &x) >= 1.0 - 1e-12, "{:?} is too short", x);
                }
            }
        }
    }

    #[test]
    fn supports_are_distinct_up_to_sign() {
        for dim in 1..=5 {
            for vertex in vertices(dim) {
                for (a, b) in vertex.support.iter().tuple_combinations() {
                    let neg: Vec<i64> = b.iter().map(|x| -x).collect();
                    assert_ne!(*a, *b);
                    assert_ne!(a.to_vec(), neg);
                }
            }
        }
    }

    #[test]
    fn degenerate_vertices_have_extra_supports() {
        assert_eq!(vertices(4)[0].extra(10), 2);
        assert_eq!(vertices(4)[1].extra(10), 0);
        assert_eq!(vertices(5)[0].extra(15), 5);
        assert_eq!(vertices(5)[1].extra(15), 0);
        assert_eq!(vertices(5)[2].extra(15), 0);
    }
}
