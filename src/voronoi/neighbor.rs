//! Moves between adjacent perfect forms
//!
//! A perfect form `P` with minimum one is a vertex of the Ryshkov polyhedron
//! `{Q : sᵀQs ≥ 1 for every nonzero integer s}`. An edge leaving `P` is a direction `R`
//! along which `⟨m', ·⟩` decreases; walking along it, the polyhedron is left at the first
//! `t` where some new lattice vector reaches norm one. `P + t·R` is again perfect and is
//! identified with one of the standard forms of the dimension.
//!
//! ```text
//!   P ──── t·R ────▶ Q = P + t·R   with   min_{s ≠ 0} sᵀQs = 1,  Q ≅ P_j
//! ```

use tracing::trace;

use super::tables::{Vertex, vertices};
use crate::error::{Error, Result};
use crate::lattice::ShortVectors;
use crate::linprog;
use crate::math::{Matrix, Offset, SymmetricMatrix, symmetric_dimension};

/// Squared norms below `1 - MIN_SLACK` count as shorter than the minimum.
const MIN_SLACK: f64 = 1e-9;

/// Squared norms within `1 + MINIMAL_SLACK` count as minimal vectors.
const MINIMAL_SLACK: f64 = 1e-6;

/// Tolerance of the isometry search on Gram entries.
const ISOMETRY_EPS: f64 = 1e-7;

const MAX_BRACKET_STEPS: usize = 200;
const MAX_REFINE_STEPS: usize = 100;

/// Weight of each packed coefficient in the Frobenius pairing.
pub(super) fn multiplicities<const D: usize>() -> Vec<f64> {
    (0..D).flat_map(|i| (0..=i).map(move |j| if i == j { 1.0 } else { 2.0 })).collect()
}

/// Direction of descent from `vertex` for the reduced form `m`, `None` at an optimum.
///
/// At a vertex with exactly `D(D+1)/2` minimal vectors the edges are the rows of the KKT
/// matrix, and the most negative weight picks the edge. Otherwise the steepest extreme
/// ray of the cone `{R : sᵀRs ≥ 0 ∀s ∈ support}` is found by linear programming.
pub(super) fn descent_direction<const D: usize>(
    vertex: &Vertex,
    m: &SymmetricMatrix<f64, D>,
    tolerance: f64,
) -> Result<Option<SymmetricMatrix<f64, D>>> {
    let sd = symmetric_dimension(D);
    let mult = multiplicities::<D>();
    let packed = m.coefficients();
    let trace = m.trace();

    if !vertex.is_degenerate(sd) {
        let weights = vertex.apply_kkt(&packed);
        let (i, &w) = weights
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &f64)>, (i, w)| match best {
                Some((_, b)) if b <= w => best,
                _ => Some((i, w)),
            })
            .ok_or_else(|| Error::Internal("empty KKT weights".into()))?;
        if w >= -tolerance * trace {
            return Ok(None);
        }
        let r: Vec<f64> = vertex.kkt_row(i, sd).iter().zip(&mult).map(|(a, k)| a / k).collect();
        return Ok(SymmetricMatrix::from_coefficients(&r));
    }

    let halfspaces: Vec<Vec<f64>> = vertex
        .supports::<D>()
        .iter()
        .map(|s| SymmetricMatrix::<f64, D>::rank_one(s).coefficients().iter().zip(&mult).map(|(a, k)| a * k).collect())
        .collect();
    let numerator: Vec<f64> = packed.iter().zip(&mult).map(|(a, k)| a * k / trace).collect();
    let denominator: Vec<f64> = (0..sd).map(|k| halfspaces.iter().map(|h| h[k]).sum()).collect();
    let ray = linprog::solve(&halfspaces, &numerator, &denominator)?;
    let value: f64 = numerator.iter().zip(&ray).map(|(a, b)| a * b).sum();
    if value >= -tolerance {
        return Ok(None);
    }
    Ok(SymmetricMatrix::from_coefficients(&ray))
}

/// Shortest vector of `q`, or `None` when `q` is not positive definite.
fn shortest<const D: usize>(q: &SymmetricMatrix<f64, D>) -> Result<Option<(Offset<D>, f64)>> {
    if !q.is_positive_definite() {
        return Ok(None);
    }
    match ShortVectors::new(q) {
        Ok(sv) => sv.shortest().map(Some),
        Err(Error::NotPositiveDefinite) => Ok(None),
        Err(e) => Err(e),
    }
}

/// The perfect form adjacent to `p` in direction `r`, with the step length.
pub(super) fn neighbor<const D: usize>(
    p: &SymmetricMatrix<f64, D>,
    r: &SymmetricMatrix<f64, D>,
) -> Result<(SymmetricMatrix<f64, D>, f64)> {
    // bracket a step that leaves the polyhedron
    let (mut lo, mut hi) = (0.0_f64, None::<f64>);
    let mut u = 1.0_f64;
    let mut witness = None;
    for _ in 0..MAX_BRACKET_STEPS {
        match shortest(&(*p + *r * u))? {
            None => hi = Some(u),
            Some((v, n)) if n < 1.0 - MIN_SLACK => {
                witness = Some(v);
                break;
            }
            Some(_) => lo = u,
        }
        u = match hi {
            Some(h) => 0.5 * (lo + h),
            None => 2.0 * u,
        };
    }
    let mut w = witness.ok_or_else(|| Error::Internal("no neighbouring perfect form along the edge".into()))?;

    // move back to where the witness has norm one, until nothing shorter remains
    for _ in 0..MAX_REFINE_STEPS {
        let t = (1.0 - p.squared_norm(&w)) / r.squared_norm(&w);
        let q = *p + *r * t;
        let (v, n) = shortest(&q)?
            .ok_or_else(|| Error::Internal("neighbouring form is not positive definite".into()))?;
        if n >= 1.0 - MIN_SLACK {
            trace!(step = t, "neighbour found");
            return Ok((q, t));
        }
        w = v;
    }
    Err(Error::Internal("neighbour refinement did not converge".into()))
}

/// Match `q` with a standard perfect form.
///
/// Returns the vertex index `j` and an integer `c` of determinant ±1 with `cᵀ·q·c = P_j`.
pub(super) fn identify<const D: usize>(q: &SymmetricMatrix<f64, D>) -> Result<(usize, Matrix<i64, D>)> {
    let minimal = ShortVectors::new(q)
        .and_then(|sv| sv.within(1.0 + MINIMAL_SLACK))
        .map_err(|e| Error::Internal(format!("minimal vectors of neighbour: {e}")))?;
    let candidates: Vec<Offset<D>> = minimal.iter().flat_map(|&v| [v, -v]).collect();

    for (j, vertex) in vertices(D).iter().enumerate() {
        if vertex.support.len() != minimal.len() {
            continue;
        }
        let target = vertex.form_matrix::<D>();
        let mut columns = Vec::with_capacity(D);
        if let Some(c) = match_columns(q, &target, &candidates, &mut columns) {
            return Ok((j, c));
        }
    }
    Err(Error::Internal(format!(
        "neighbour with {} minimal vectors matches no perfect form",
        minimal.len()
    )))
}

/// Backtracking search for columns `c_k` with `c_kᵀ·q·c_l = target_kl`.
fn match_columns<const D: usize>(
    q: &SymmetricMatrix<f64, D>,
    target: &SymmetricMatrix<f64, D>,
    candidates: &[Offset<D>],
    columns: &mut Vec<Offset<D>>,
) -> Option<Matrix<i64, D>> {
    let k = columns.len();
    if k == D {
        let c = Matrix::from_columns(std::array::from_fn(|i| columns[i]));
        return (c.exact_determinant().abs() == 1).then_some(c);
    }
    for v in candidates {
        if (q.squared_norm(v) - target.get(k, k)).abs() >= ISOMETRY_EPS {
            continue;
        }
        let fits = columns.iter().enumerate().all(|(l, c)| (q.scalar_product(c, v) - target.get(k, l)).abs() < ISOMETRY_EPS);
        if !fits {
            continue;
        }
        columns.push(*v);
        if let Some(c) = match_columns(q, target, candidates, columns) {
            return Some(c);
        }
        columns.pop();
    }
    None
}
