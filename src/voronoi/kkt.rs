//! Weights of an optimal vertex
//!
//! At a vertex with `D(D+1)/2` minimal vectors the weights are `kkt · packed(m')`.
//!
//! The degenerate vertices (`D4`, `D5`) carry `extra` more minimal vectors than unknowns,
//! and the weights over the whole support form an affine family of dimension `extra`:
//!
//! ```text
//! Σ_s w_s · packed(s ⊗ s) = packed(m'),      w ≥ 0
//! ```
//!
//! A basic feasible solution of this system has at most `D(D+1)/2` nonzero weights. The
//! linear program selects the one with the least total weight on the extra supports.

use tracing::debug;

use super::tables::Vertex;
use crate::error::{Error, Result};
use crate::linprog::{self, LinprogError};
use crate::math::{Offset, SymmetricMatrix, symmetric_dimension};

/// Residual of the weight system accepted at a degenerate vertex, relative to the trace.
///
/// Optimality is decided up to a tolerance, so the reduced form may sit just outside the
/// cone spanned by the support tensors.
const FEASIBILITY_TOLERANCE: f64 = 1e-7;

/// Weights and matching supports for the reduced form `m` at `vertex`.
///
/// `rounding` bounds the error on the entries of `m`; a degenerate vertex accepts a
/// residual up to the larger of it and the relative feasibility tolerance.
pub(super) fn weights<const D: usize>(
    vertex: &Vertex,
    m: &SymmetricMatrix<f64, D>,
    rounding: f64,
) -> Result<(Vec<f64>, Vec<Offset<D>>)> {
    let sd = symmetric_dimension(D);
    let support = vertex.supports::<D>();
    let packed = m.coefficients();
    if !vertex.is_degenerate(sd) {
        return Ok((vertex.apply_kkt(&packed), support));
    }

    let extra = vertex.extra(sd);
    let tensors: Vec<Vec<f64>> =
        support.iter().map(|s| SymmetricMatrix::<f64, D>::rank_one(s).coefficients()).collect();
    let system: Vec<Vec<f64>> = (0..sd).map(|k| tensors.iter().map(|t| t[k]).collect()).collect();
    let cost: Vec<f64> = (0..support.len()).map(|j| if j < sd { 0.0 } else { 1.0 }).collect();

    let tolerance = (FEASIBILITY_TOLERANCE * m.trace()).max(rounding);
    let all = linprog::solve_standard(&system, &packed, &cost, tolerance).map_err(|e| match e {
        LinprogError::Infeasible => Error::Internal("no non-negative decomposition at the optimal vertex".into()),
        e => Error::from(e),
    })?;

    // the `extra` smallest weights are the ones the basic solution leaves at zero
    let mut order: Vec<usize> = (0..all.len()).collect();
    order.sort_by(|&i, &j| all[i].total_cmp(&all[j]).then(i.cmp(&j)));
    let mut dropped = vec![false; all.len()];
    for &i in &order[..extra] {
        dropped[i] = true;
    }
    debug!(
        dimension = D,
        extra,
        largest_dropped = all[order[extra - 1]],
        "degenerate vertex resolved by linear program"
    );

    let (weights, kept): (Vec<f64>, Vec<Offset<D>>) = all
        .iter()
        .zip(support)
        .zip(&dropped)
        .filter(|(_, d)| !**d)
        .map(|((&w, s), _)| (w, s))
        .unzip();
    if weights.iter().any(|w| !w.is_finite()) {
        return Err(Error::Internal("non-finite weight at a degenerate vertex".into()));
    }
    Ok((weights, kept))
}
