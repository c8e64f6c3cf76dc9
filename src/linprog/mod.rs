//! Small linear programs
//!
//! Two forms are solved. The homogeneous form
//!
//! ```text
//! minimise   ⟨n, y⟩
//! subject to ⟨h_i, y⟩ ≥ 0   for every half-space row h_i
//!            ⟨d, y⟩  = 1
//! ```
//!
//! is the projective form of minimising `⟨n, y⟩ / ⟨d, y⟩` over a polyhedral cone. The
//! standard form
//!
//! ```text
//! minimise   ⟨c, x⟩
//! subject to A·x = b,   x ≥ 0
//! ```
//!
//! tolerates a small residual in `A·x = b`, for right-hand sides that sit on the boundary
//! of the feasible cone up to rounding. Both answers are vertices of the feasible set.
//!
//! # Algorithm
//!
//! For the homogeneous form, `dim` linearly independent rows `H_B` are chosen and `y` is
//! rewritten as `y = H_B⁻¹ z`, so that those rows become the sign constraints `z ≥ 0`.
//! Each remaining row turns into an equality `−⟨h_i H_B⁻¹, z⟩ + s_i = 0` whose slack `s_i`
//! starts basic at zero, and the normalisation row carries a single artificial variable.
//! The standard form gets one artificial variable per row. A two-phase primal simplex with
//! Bland's rule then runs on the dense tableau. Sizes are tiny (a few dozen rows), so
//! reduced costs are recomputed from scratch at every step.

use thiserror::Error;
use tracing::trace;

/// Pivot magnitude below which a column entry is treated as zero.
const PIVOT_EPS: f64 = 1e-11;

/// Reduced cost below `-COST_EPS` lets a column enter the basis.
const COST_EPS: f64 = 1e-12;

/// Residual of the artificial variable tolerated at the end of phase one.
const FEASIBILITY_EPS: f64 = 1e-9;

/// Relative Gram-Schmidt residual below which a row counts as dependent.
const INDEPENDENCE_EPS: f64 = 1e-6;

const MAX_PIVOTS: usize = 10_000;

/// Why a linear program has no optimal solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinprogError {
    /// No point satisfies the constraints.
    #[error("the constraints are infeasible")]
    Infeasible,
    /// The objective decreases without bound on the feasible set.
    #[error("the objective is unbounded below")]
    Unbounded,
    /// The half-space rows do not have full column rank.
    #[error("the half-space rows do not span the space")]
    RankDeficient,
    /// Cycling guard: too many pivots.
    #[error("pivot limit reached")]
    IterationLimit,
    /// Rows or vectors of mismatched lengths.
    #[error("inconsistent problem dimensions")]
    Dimension,
}

/// Minimise `⟨numerator, y⟩` over `{y : ⟨h, y⟩ ≥ 0 ∀h ∈ halfspaces, ⟨denominator, y⟩ = 1}`.
///
/// Every row of `halfspaces`, as well as `denominator`, must have the length of
/// `numerator`.
pub fn solve(halfspaces: &[Vec<f64>], numerator: &[f64], denominator: &[f64]) -> Result<Vec<f64>, LinprogError> {
    let dim = numerator.len();
    if dim == 0 || denominator.len() != dim || halfspaces.iter().any(|h| h.len() != dim) {
        return Err(LinprogError::Dimension);
    }

    let chosen = independent_rows(halfspaces, dim)?;
    let basis_rows: Vec<Vec<f64>> = chosen.iter().map(|&i| halfspaces[i].clone()).collect();
    let h_inv = invert(&basis_rows).ok_or(LinprogError::RankDeficient)?;

    // y = H_B⁻¹ z
    let row_times_inv = |row: &[f64]| -> Vec<f64> {
        (0..dim).map(|j| (0..dim).map(|k| row[k] * h_inv[k][j]).sum()).collect()
    };
    let cost_z = row_times_inv(numerator);
    let norm_z = row_times_inv(denominator);

    let others: Vec<usize> = (0..halfspaces.len()).filter(|i| !chosen.contains(i)).collect();
    let n_slack = others.len();
    let artificial = dim + n_slack;
    let width = artificial + 1;

    let mut tableau = Tableau::new(width);
    for (k, &i) in others.iter().enumerate() {
        let g = row_times_inv(&halfspaces[i]);
        let mut row = vec![0.0; width + 1];
        for j in 0..dim {
            row[j] = -g[j];
        }
        row[dim + k] = 1.0;
        tableau.push(row, dim + k);
    }
    let mut row = vec![0.0; width + 1];
    row[..dim].copy_from_slice(&norm_z);
    row[artificial] = 1.0;
    row[width] = 1.0;
    tableau.push(row, artificial);

    // phase one: drive the artificial variable to zero
    let mut phase_one = vec![0.0; width];
    phase_one[artificial] = 1.0;
    tableau.minimise(&phase_one, |_| true)?;
    if tableau.value_of(artificial) > FEASIBILITY_EPS {
        return Err(LinprogError::Infeasible);
    }
    tableau.evict(artificial, |j| j != artificial);

    // phase two
    let mut phase_two = vec![0.0; width];
    phase_two[..dim].copy_from_slice(&cost_z);
    tableau.minimise(&phase_two, |j| j != artificial)?;
    trace!(rows = halfspaces.len(), dim, pivots = tableau.pivots, "linear program solved");

    let z: Vec<f64> = (0..dim).map(|j| tableau.value_of(j)).collect();
    Ok((0..dim).map(|k| (0..dim).map(|j| h_inv[k][j] * z[j]).sum()).collect())
}

/// Minimise `⟨cost, x⟩` over `{x ≥ 0 : a·x = b}`.
///
/// `a` is given by rows. The constraints are accepted when phase one leaves a total
/// residual of at most `tolerance`; that residual is then spread over the basic variables.
pub fn solve_standard(a: &[Vec<f64>], b: &[f64], cost: &[f64], tolerance: f64) -> Result<Vec<f64>, LinprogError> {
    let n = cost.len();
    let m = b.len();
    if n == 0 || a.len() != m || a.iter().any(|row| row.len() != n) {
        return Err(LinprogError::Dimension);
    }
    let width = n + m;

    let mut tableau = Tableau::new(width);
    for (i, (row_a, &bi)) in a.iter().zip(b).enumerate() {
        let sign = if bi < 0.0 { -1.0 } else { 1.0 };
        let mut row = vec![0.0; width + 1];
        for (x, &y) in row.iter_mut().zip(row_a) {
            *x = sign * y;
        }
        row[n + i] = 1.0;
        row[width] = sign * bi;
        tableau.push(row, n + i);
    }

    let mut phase_one = vec![0.0; width];
    phase_one[n..].iter_mut().for_each(|c| *c = 1.0);
    tableau.minimise(&phase_one, |_| true)?;
    let residual: f64 = (n..width).map(|j| tableau.value_of(j)).sum();
    if residual > tolerance {
        return Err(LinprogError::Infeasible);
    }
    for artificial in n..width {
        tableau.evict(artificial, |j| j < n);
    }

    let mut phase_two = cost.to_vec();
    phase_two.resize(width, 0.0);
    tableau.minimise(&phase_two, |j| j < n)?;
    trace!(rows = m, columns = n, residual, pivots = tableau.pivots, "standard linear program solved");

    Ok((0..n).map(|j| tableau.value_of(j)).collect())
}

/// First `dim` rows of `rows` that are linearly independent, by Gram-Schmidt.
fn independent_rows(rows: &[Vec<f64>], dim: usize) -> Result<Vec<usize>, LinprogError> {
    let mut chosen = Vec::with_capacity(dim);
    let mut orthonormal: Vec<Vec<f64>> = Vec::with_capacity(dim);
    for (i, h) in rows.iter().enumerate() {
        let scale = h.iter().map(|x| x * x).sum::<f64>().sqrt();
        let mut v = h.clone();
        for o in &orthonormal {
            let f: f64 = v.iter().zip(o).map(|(a, b)| a * b).sum();
            v.iter_mut().zip(o).for_each(|(a, b)| *a -= f * b);
        }
        let residual = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if residual > INDEPENDENCE_EPS * scale {
            v.iter_mut().for_each(|a| *a /= residual);
            orthonormal.push(v);
            chosen.push(i);
            if chosen.len() == dim {
                return Ok(chosen);
            }
        }
    }
    Err(LinprogError::RankDeficient)
}

/// Gauss-Jordan inverse with partial pivoting.
fn invert(a: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut m: Vec<Vec<f64>> = a
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut r = row.clone();
            r.extend((0..n).map(|j| if i == j { 1.0 } else { 0.0 }));
            r
        })
        .collect();
    for c in 0..n {
        let p = (c..n).max_by(|&x, &y| m[x][c].abs().total_cmp(&m[y][c].abs()))?;
        if !(m[p][c].abs() > 1e-14) {
            return None;
        }
        m.swap(p, c);
        let pivot = m[c][c];
        m[c].iter_mut().for_each(|x| *x /= pivot);
        for r in 0..n {
            if r != c {
                let f = m[r][c];
                if f.abs() > 0.0 {
                    for k in 0..2 * n {
                        m[r][k] -= f * m[c][k];
                    }
                }
            }
        }
    }
    Some(m.into_iter().map(|row| row[n..].to_vec()).collect())
}

/// Dense simplex tableau. The last entry of every row is its right-hand side.
struct Tableau {
    rows: Vec<Vec<f64>>,
    basis: Vec<usize>,
    width: usize,
    pivots: usize,
}

impl Tableau {
    fn new(width: usize) -> Self {
        Tableau { rows: Vec::new(), basis: Vec::new(), width, pivots: 0 }
    }

    fn push(&mut self, row: Vec<f64>, basic: usize) {
        self.rows.push(row);
        self.basis.push(basic);
    }

    fn value_of(&self, var: usize) -> f64 {
        self.basis
            .iter()
            .position(|&b| b == var)
            .map_or(0.0, |r| self.rows[r][self.width])
    }

    fn pivot(&mut self, r: usize, c: usize) {
        let p = self.rows[r][c];
        self.rows[r].iter_mut().for_each(|x| *x /= p);
        let pivot_row = self.rows[r].clone();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == r {
                continue;
            }
            let f = row[c];
            if f.abs() > 0.0 {
                row.iter_mut().zip(&pivot_row).for_each(|(x, y)| *x -= f * y);
            }
        }
        self.basis[r] = c;
        self.pivots += 1;
    }

    /// Primal simplex with Bland's rule, restricted to the columns accepted by `allowed`.
    fn minimise<A: Fn(usize) -> bool>(&mut self, cost: &[f64], allowed: A) -> Result<(), LinprogError> {
        for _ in 0..MAX_PIVOTS {
            let entering = (0..self.width).find(|&j| {
                allowed(j) && !self.basis.contains(&j) && self.reduced_cost(cost, j) < -COST_EPS
            });
            let Some(c) = entering else {
                return Ok(());
            };

            let mut leaving: Option<(f64, usize)> = None;
            for (i, row) in self.rows.iter().enumerate() {
                if row[c] > PIVOT_EPS {
                    let ratio = row[self.width] / row[c];
                    let better = match leaving {
                        None => true,
                        Some((best, r)) => {
                            ratio < best - 1e-15 || (ratio <= best + 1e-15 && self.basis[i] < self.basis[r])
                        }
                    };
                    if better {
                        leaving = Some((ratio, i));
                    }
                }
            }
            let (_, r) = leaving.ok_or(LinprogError::Unbounded)?;
            self.pivot(r, c);
        }
        Err(LinprogError::IterationLimit)
    }

    fn reduced_cost(&self, cost: &[f64], j: usize) -> f64 {
        cost[j]
            - self
                .rows
                .iter()
                .zip(&self.basis)
                .map(|(row, &b)| cost[b] * row[j])
                .sum::<f64>()
    }

    /// Pivot a basic variable out of the basis for a column accepted by `allowed`, dropping
    /// its row when there is none.
    fn evict<A: Fn(usize) -> bool>(&mut self, var: usize, allowed: A) {
        let Some(r) = self.basis.iter().position(|&b| b == var) else {
            return;
        };
        match (0..self.width).find(|&j| allowed(j) && !self.basis.contains(&j) && self.rows[r][j].abs() > 1e-9) {
            Some(c) => self.pivot(r, c),
            None => {
                self.rows.remove(r);
                self.basis.remove(r);
            }
        }
    }
}
