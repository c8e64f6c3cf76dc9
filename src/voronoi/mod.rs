//! Voronoi's first reduction
//!
//! Decomposes a positive-definite form `M` of dimension `D ≤ 5` as
//!
//! ```text
//! M = Σ_i λ_i · e_i ⊗ e_i,      λ_i ≥ 0,   e_i ∈ ℤᴰ,   i < D(D+1)/2
//! ```
//!
//! # Motivation
//! Selling's superbase construction only exists up to dimension three. Beyond that, the
//! weights come from a linear program over the Ryshkov polyhedron: minimise `⟨m, Q⟩`
//! among the forms `Q` whose nonzero lattice vectors all have norm at least one. The
//! minimiser is a perfect form, and the Karush-Kuhn-Tucker multipliers of its active
//! constraints are the weights.
//!
//! # Algorithm
//! The walk does not move `Q` itself. It keeps one of the standard perfect forms `P_j`
//! fixed and changes the lattice basis `a` instead, so that the current vertex is always
//! `P_j` in the coordinates of `m' = a·M·aᵀ`:
//!
//! ```text
//! greedy basis ─▶ first guess ─▶ optimal? ──yes──▶ KKT weights, offsets a⁻¹·s
//!                                  │ no
//!                                  ▼
//!                  edge R ─▶ neighbour Q = P + t·R ─▶ Q ≅ P_j ─▶ a ← c⁻¹·a
//! ```
//!
//! Every move strictly decreases `⟨m', P_j⟩`. The walk visits finitely many vertices.
//!
//! # Performance
//! Almost every input stops after a handful of moves. Short vector enumeration dominates
//! the cost of a move.

mod kkt;
mod neighbor;
mod options;
pub(crate) mod tables;

use std::marker::PhantomData;

use num_traits::{Float, ToPrimitive};
use tracing::{debug, trace};

use crate::decomposition::Decomposition;
use crate::error::{Error, Result};
use crate::math::{Matrix, SymmetricMatrix};

pub use options::VoronoiOptions;

/// Bound on the passes of the greedy basis improvement.
const MAX_GREEDY_PASSES: usize = 1_000;

/// Position of the walk: a lattice basis and the standard vertex it is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct SimplexState<const D: usize> {
    m: SymmetricMatrix<f64, D>,
    reduced: SymmetricMatrix<f64, D>,
    a: Matrix<i64, D>,
    a_inv: Matrix<i64, D>,
    vertex: usize,
    objective: f64,
    rounding: f64,
    moves: usize,
}

impl<const D: usize> SimplexState<D> {
    /// State in the canonical basis, attached to the vertex nearest to `m`.
    pub fn new(m: SymmetricMatrix<f64, D>) -> Result<Self> {
        check_dimension::<D>()?;
        if !m.is_positive_definite() {
            return Err(Error::NotPositiveDefinite);
        }
        let mut state = SimplexState {
            m,
            reduced: m,
            a: Matrix::identity(),
            a_inv: Matrix::identity(),
            vertex: 0,
            objective: 0.0,
            rounding: rounding_bound(&m, &Matrix::identity()),
            moves: 0,
        };
        state.first_guess();
        Ok(state)
    }

    /// Index of the current standard vertex.
    pub fn vertex(&self) -> usize {
        self.vertex
    }

    /// Rows of the current lattice basis.
    pub fn basis(&self) -> &Matrix<i64, D> {
        &self.a
    }

    /// `a·M·aᵀ`.
    pub fn reduced_matrix(&self) -> &SymmetricMatrix<f64, D> {
        &self.reduced
    }

    /// `⟨a·M·aᵀ, P_vertex⟩`.
    pub fn objective(&self) -> f64 {
        self.objective
    }

    /// Number of simplex moves taken so far.
    pub fn moves(&self) -> usize {
        self.moves
    }

    /// Bound on the rounding error of the entries of `a·M·aᵀ`.
    pub fn rounding(&self) -> f64 {
        self.rounding
    }

    /// Relative tolerance of the optimality test: the requested one, or the rounding
    /// level of the reduced form when that is coarser.
    fn optimality_tolerance(&self, requested: f64) -> f64 {
        requested.max(self.rounding / self.reduced.trace())
    }

    fn vertex_form(&self, j: usize) -> SymmetricMatrix<f64, D> {
        tables::vertices(D)[j].form_matrix()
    }

    /// Attach the state to the standard vertex with the smallest objective, lowest index on ties.
    fn first_guess(&mut self) {
        let (vertex, objective) = (0..tables::vertices(D).len())
            .map(|j| (j, self.reduced.frobenius(&self.vertex_form(j))))
            .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
        self.vertex = vertex;
        self.objective = objective;
    }

    fn set_basis(&mut self, a: Matrix<i64, D>, a_inv: Matrix<i64, D>) {
        self.a = a;
        self.a_inv = a_inv;
        self.reduced = self.m.gram(&a);
        self.rounding = rounding_bound(&self.m, &a);
    }

    /// Move to the neighbour of the current vertex along `direction`.
    ///
    /// Returns `false`, leaving the state untouched, when the move does not decrease the
    /// objective by more than the rounding error: the current vertex is then optimal up
    /// to that error.
    fn step(&mut self, direction: &SymmetricMatrix<f64, D>) -> Result<bool> {
        let p = self.vertex_form(self.vertex);
        let (q, t) = neighbor::neighbor(&p, direction)?;
        let (next, c) = neighbor::identify(&q)?;
        let c_inv = c
            .unimodular_inverse()
            .ok_or_else(|| Error::Internal("isometry of the neighbour is not unimodular".into()))?;

        let a = c_inv * self.a;
        let objective = self.m.gram(&a).frobenius(&self.vertex_form(next));
        let slack = self.rounding.max(rounding_bound(&self.m, &a));
        let decrease = self.objective - objective;
        if decrease <= slack {
            if decrease < -slack {
                return Err(Error::Internal(format!(
                    "simplex move increased the objective ({} -> {})",
                    self.objective, objective
                )));
            }
            debug!(dimension = D, vertex = self.vertex, decrease, slack, "move below rounding level, stopping");
            return Ok(false);
        }

        let from = self.vertex;
        self.set_basis(a, self.a_inv * c);
        self.vertex = next;
        self.objective = objective;
        self.moves += 1;
        trace!(from, to = next, step = t, decrease, "simplex move");
        Ok(true)
    }
}

/// Rounding error bound for the entries of `a·M·aᵀ` evaluated in floating point.
fn rounding_bound<const D: usize>(m: &SymmetricMatrix<f64, D>, a: &Matrix<i64, D>) -> f64 {
    f64::EPSILON * D as f64 * m.abs().gram(&a.map(i64::abs)).trace()
}

fn check_dimension<const D: usize>() -> Result<()> {
    if tables::vertices(D).is_empty() { Err(Error::UnsupportedDimension(D)) } else { Ok(()) }
}

/// Voronoi reduction for forms of dimension `D ≤ 5`.
#[derive(Debug, Clone, Copy, Default)]
pub struct VoronoiFirstReduction<F, const D: usize>(PhantomData<F>);

impl<F: Float, const D: usize> VoronoiFirstReduction<F, D> {
    /// Decompose `m`, with the greedy basis pass at tolerance `tol` (skipped when `tol < 0`).
    pub fn tensor_decomposition(m: &SymmetricMatrix<F, D>, tol: f64) -> Result<Decomposition<F, D>> {
        Self::tensor_decomposition_with(m, &VoronoiOptions::from_tolerance(tol))
    }

    /// Decompose `m` with explicit options.
    pub fn tensor_decomposition_with(m: &SymmetricMatrix<F, D>, options: &VoronoiOptions) -> Result<Decomposition<F, D>> {
        let state = Self::minimize(m, options)?;
        Self::kkt(&state)
    }

    /// Walk to an optimal vertex for `m`.
    pub fn minimize(m: &SymmetricMatrix<F, D>, options: &VoronoiOptions) -> Result<SimplexState<D>> {
        check_dimension::<D>()?;
        if !m.is_finite() {
            return Err(Error::NotPositiveDefinite);
        }
        let mut state = SimplexState::new(m.cast::<f64>())?;
        if let Some(tol) = options.greedy_tolerance {
            Self::greedy_basis(&mut state, tol)?;
        }

        let vertices = tables::vertices(D);
        loop {
            let tolerance = state.optimality_tolerance(options.optimality_tolerance);
            let Some(direction) = neighbor::descent_direction(&vertices[state.vertex], &state.reduced, tolerance)? else {
                break;
            };
            if state.moves >= options.max_iterations {
                return Err(Error::Internal(format!(
                    "no optimal vertex after {} moves",
                    options.max_iterations
                )));
            }
            if !state.step(&direction)? {
                break;
            }
        }
        debug!(
            dimension = D,
            vertex = state.vertex,
            moves = state.moves,
            objective = state.objective,
            "voronoi minimisation finished"
        );
        Ok(state)
    }

    /// Size-reduce the rows of the basis against each other, as long as one reduction
    /// shortens a row by more than the relative `tol`, then attach to the nearest vertex.
    pub fn greedy_basis(state: &mut SimplexState<D>, tol: f64) -> Result<()> {
        let mut a = state.a;
        let mut changed_any = false;
        for _ in 0..MAX_GREEDY_PASSES {
            let mut changed = false;
            let mut g = state.m.gram(&a);
            for i in 0..D {
                for j in (0..D).filter(|&j| j != i) {
                    let (gii, gij, gjj) = (g.get(i, i), g.get(i, j), g.get(j, j));
                    let k = (gij / gjj).round();
                    if !(k.abs() > 0.0) {
                        continue;
                    }
                    let shortened = gii - 2.0 * k * gij + k * k * gjj;
                    if shortened < gii * (1.0 - tol) {
                        let k = k
                            .to_i64()
                            .ok_or_else(|| Error::Internal("greedy reduction coefficient out of range".into()))?;
                        for c in 0..D {
                            a.0[i][c] -= k * a.0[j][c];
                        }
                        g = state.m.gram(&a);
                        changed = true;
                    }
                }
            }
            changed_any |= changed;
            if !changed {
                break;
            }
        }
        if changed_any {
            let a_inv = a
                .unimodular_inverse()
                .ok_or_else(|| Error::Internal("greedy basis is not unimodular".into()))?;
            state.set_basis(a, a_inv);
            state.first_guess();
            debug!(dimension = D, vertex = state.vertex, "greedy pass changed the basis");
        }
        Ok(())
    }

    /// Decomposition of the original form at an optimal state.
    pub fn kkt(state: &SimplexState<D>) -> Result<Decomposition<F, D>> {
        let vertex = &tables::vertices(D)[state.vertex];
        let (weights, support) = kkt::weights(vertex, &state.reduced, state.rounding)?;
        let offsets = support.into_iter().map(|s| state.a_inv * s).collect();
        let weights = weights
            .into_iter()
            .map(|w| F::from(w).ok_or_else(|| Error::Internal("weight does not fit the scalar type".into())))
            .collect::<Result<Vec<F>>>()?;
        Ok(Decomposition::new(offsets, weights))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Offset, Vector};
    use crate::reduction::BasisReduction;
    use approx::assert_abs_diff_eq;
    use rand::{Rng, SeedableRng};
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn rng() -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(77)
    }

    // rounding in `a·M·aᵀ` grows with the size of the basis vectors
    fn check_decomposition<const D: usize>(m: &SymmetricMatrix<f64, D>, d: &Decomposition<f64, D>) {
        check_within(m, d, 1e-8);
    }

    fn check_within<const D: usize>(m: &SymmetricMatrix<f64, D>, d: &Decomposition<f64, D>, tol: f64) {
        assert_eq!(d.len(), D * (D + 1) / 2);
        assert!(d.is_nonnegative(1e-9 * m.trace()), "negative weight in {:?}", d.weights);
        assert_abs_diff_eq!(d.residual(m), 0.0, epsilon = tol * m.max_abs());
    }

    fn random_forms<const D: usize>(count: usize) {
        let mut rng = rng();
        for _ in 0..count {
            let m = SymmetricMatrix::<f64, D>::random_positive(&mut rng);
            let d = VoronoiFirstReduction::tensor_decomposition(&m, 0.0).unwrap();
            check_decomposition(&m, &d);
        }
    }

    #[test]
    fn scaled_identity_in_dimension_two() {
        let m = SymmetricMatrix::<f64, 2>::identity() * 2.0;
        let d = VoronoiFirstReduction::tensor_decomposition(&m, 0.0).unwrap();
        assert_eq!(d.offsets, vec![Vector([1, 0]), Vector([0, 1]), Vector([1, -1])]);
        assert_abs_diff_eq!(d.weights[0], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.weights[1], 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(d.weights[2], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn dimension_one_returns_the_coefficient() {
        let m = SymmetricMatrix::<f64, 1>::diagonal([5.0]);
        let d = VoronoiFirstReduction::tensor_decomposition(&m, 0.0).unwrap();
        assert_eq!(d.offsets, vec![Vector([1])]);
        assert_abs_diff_eq!(d.weights[0], 5.0, epsilon = 1e-12);
    }

    #[test]
    fn identity_stays_at_the_degenerate_vertex() {
        let m4 = SymmetricMatrix::<f64, 4>::identity();
        let s4 = VoronoiFirstReduction::<f64, 4>::minimize(&m4, &VoronoiOptions::default()).unwrap();
        assert_eq!((s4.vertex(), s4.moves()), (0, 0));
        check_decomposition(&m4, &VoronoiFirstReduction::kkt(&s4).unwrap());

        let m5 = SymmetricMatrix::<f64, 5>::identity();
        let s5 = VoronoiFirstReduction::<f64, 5>::minimize(&m5, &VoronoiOptions::default()).unwrap();
        assert_eq!((s5.vertex(), s5.moves()), (0, 0));
        check_decomposition(&m5, &VoronoiFirstReduction::kkt(&s5).unwrap());
    }

    #[test]
    fn perturbed_identity_is_decomposed() {
        let mut rng = rng();
        for _ in 0..20 {
            let mut m = SymmetricMatrix::<f64, 5>::identity();
            for i in 0..5 {
                for j in 0..=i {
                    m.set(i, j, m.get(i, j) + rng.gen_range(-1e-7..=1e-7));
                }
            }
            let d = VoronoiFirstReduction::tensor_decomposition(&m, 0.0).unwrap();
            // near a degenerate vertex the weights are only feasible up to the tolerance
            check_within(&m, &d, 1e-7);
        }
    }

    #[test]
    fn perturbed_identity_selects_a_stable_vertex() {
        // the two supports of the D4 form beyond the symmetric dimension
        let extra = tables::vertices(4)[0].supports::<4>()[10..].to_vec();
        let mut corner = SymmetricMatrix::<f64, 4>::zero();
        corner.set(3, 0, 1.0);

        // direction, vertex reached along +direction, vertex reached along -direction
        let cases = [
            (SymmetricMatrix::rank_one(&extra[0]), 0, 0),
            (SymmetricMatrix::rank_one(&extra[1]), 0, 1),
            (corner, 1, 1),
        ];
        for (direction, up, down) in cases {
            for (sign, expected) in [(1.0, up), (-1.0, down)] {
                let outcomes: Vec<(usize, usize)> = [1e-2, 1e-4, 1e-6]
                    .iter()
                    .map(|&eps| {
                        let m = SymmetricMatrix::<f64, 4>::identity() + direction * (sign * eps);
                        let state = VoronoiFirstReduction::<f64, 4>::minimize(&m, &VoronoiOptions::default()).unwrap();
                        let d = VoronoiFirstReduction::kkt(&state).unwrap();
                        assert!(d.is_nonnegative(1e-9), "weights {:?}", d.weights);
                        check_decomposition(&m, &d);
                        (state.vertex(), state.moves())
                    })
                    .collect();
                assert!(outcomes.iter().all(|&o| o == outcomes[0]), "outcomes {:?}", outcomes);
                assert_eq!(outcomes[0].0, expected);
            }
        }

        // adding weight to an extra support keeps the form inside the cone at D4
        for s in &extra {
            let m = SymmetricMatrix::<f64, 4>::identity() + SymmetricMatrix::rank_one(s) * 1e-3;
            let state = VoronoiFirstReduction::<f64, 4>::minimize(&m, &VoronoiOptions::default()).unwrap();
            assert_eq!((state.vertex(), state.moves()), (0, 0));
        }
    }

    #[test]
    fn random_forms_in_every_dimension() {
        random_forms::<1>(20);
        random_forms::<2>(100);
        random_forms::<3>(100);
        random_forms::<4>(60);
        random_forms::<5>(40);
    }

    #[test]
    fn perfect_forms_are_decomposed() {
        fn check<const D: usize>() {
            for vertex in tables::vertices(D) {
                let m = vertex.form_matrix::<D>();
                let state = VoronoiFirstReduction::<f64, D>::minimize(&m, &VoronoiOptions::default()).unwrap();
                assert!(state.objective() <= m.frobenius(&m) + 1e-12);
                check_decomposition(&m, &VoronoiFirstReduction::kkt(&state).unwrap());
            }
        }
        check::<2>();
        check::<3>();
        check::<4>();
        check::<5>();
    }

    #[test]
    fn ill_conditioned_form_needs_moves() {
        // long thin lattice: the canonical basis is far from reduced
        let a = Matrix([[1, 0, 0, 0], [7, 1, 0, 0], [-3, 5, 1, 0], [2, -4, 6, 1]]);
        let m = SymmetricMatrix::<f64, 4>::diagonal([1.0, 0.5, 2.0, 1.5]).gram(&a);
        for options in [VoronoiOptions::default(), VoronoiOptions::from_tolerance(-1.0)] {
            let d = VoronoiFirstReduction::tensor_decomposition_with(&m, &options).unwrap();
            check_decomposition(&m, &d);
        }
    }

    #[test]
    fn badly_conditioned_lattice_form_is_decomposed() {
        // diagonal form in an integer basis: zero weights everywhere but on the columns of `c`
        let c = Matrix([
            [1, -2, 0, -3, -3],
            [3, -5, 2, -6, -8],
            [-1, 3, 3, 9, 4],
            [-2, 4, -2, 1, 9],
            [2, -3, 5, 9, 5],
        ]);
        let m = SymmetricMatrix::<f64, 5>::diagonal([4.9, 0.6, 3.8, 8.3, 5.0]).gram(&c);
        for options in [VoronoiOptions::default(), VoronoiOptions::from_tolerance(-1.0)] {
            let state = VoronoiFirstReduction::<f64, 5>::minimize(&m, &options).unwrap();
            assert!(state.rounding() > 0.0);
            check_within(&m, &VoronoiFirstReduction::kkt(&state).unwrap(), 1e-8);
        }
    }

    #[test]
    fn integer_basis_grams_are_decomposed() {
        fn check<const D: usize>(rng: &mut Xoshiro256PlusPlus, count: usize) {
            for _ in 0..count {
                let mut lower = Matrix::<i64, D>::identity();
                let mut upper = Matrix::<i64, D>::identity();
                for i in 0..D {
                    for j in 0..i {
                        lower.0[i][j] = rng.gen_range(-3..=3);
                        upper.0[j][i] = rng.gen_range(-3..=3);
                    }
                }
                let diagonal: [f64; D] = std::array::from_fn(|_| rng.gen_range(0.1..10.0));
                let m = SymmetricMatrix::<f64, D>::diagonal(diagonal).gram(&(lower * upper));
                let d = VoronoiFirstReduction::tensor_decomposition(&m, 0.0).unwrap();
                check_within(&m, &d, 1e-7);
            }
        }
        let mut rng = rng();
        check::<3>(&mut rng, 40);
        check::<4>(&mut rng, 40);
        check::<5>(&mut rng, 40);
    }

    #[test]
    fn greedy_pass_does_not_change_the_decomposition_quality() {
        let mut rng = rng();
        for _ in 0..30 {
            let m = SymmetricMatrix::<f64, 3>::random_positive(&mut rng);
            let with = VoronoiFirstReduction::tensor_decomposition(&m, 0.0).unwrap();
            let without = VoronoiFirstReduction::tensor_decomposition(&m, -1.0).unwrap();
            check_decomposition(&m, &with);
            check_decomposition(&m, &without);
        }
    }

    #[test]
    fn agrees_with_selling_on_obtuse_forms() {
        // weights are unique when every Selling weight is positive
        let mut rng = rng();
        for _ in 0..30 {
            let m = SymmetricMatrix::<f64, 2>::random_positive(&mut rng);
            let selling = BasisReduction::tensor_decomposition(&m).unwrap();
            if selling.min_weight().unwrap() < 1e-3 {
                continue;
            }
            let voronoi = VoronoiFirstReduction::tensor_decomposition(&m, 0.0).unwrap();
            let mut a: Vec<(Offset<2>, f64)> = selling.canonical().terms().map(|(o, w)| (*o, w)).collect();
            let mut b: Vec<(Offset<2>, f64)> = voronoi.canonical().terms().map(|(o, w)| (*o, w)).collect();
            a.sort_by_key(|t| t.0.0);
            b.sort_by_key(|t| t.0.0);
            for ((oa, wa), (ob, wb)) in a.iter().zip(&b) {
                assert_eq!(oa, ob);
                assert_abs_diff_eq!(wa, wb, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn walk_is_deterministic() {
        let m = SymmetricMatrix::<f64, 5>::random_positive(&mut rng());
        let a = VoronoiFirstReduction::<f64, 5>::minimize(&m, &VoronoiOptions::default()).unwrap();
        let b = VoronoiFirstReduction::<f64, 5>::minimize(&m, &VoronoiOptions::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            VoronoiFirstReduction::<f64, 5>::kkt(&a).unwrap(),
            VoronoiFirstReduction::<f64, 5>::kkt(&b).unwrap()
        );
    }

    #[test]
    fn single_precision_input() {
        let m = SymmetricMatrix::<f32, 3>::from_coefficients(&[2.0, 0.5, 1.0, 0.2, -0.3, 1.5]).unwrap();
        let d = VoronoiFirstReduction::tensor_decomposition(&m, 0.0).unwrap();
        assert_eq!(d.len(), 6);
        assert!(d.residual(&m) < 1e-5);
    }

    #[test]
    fn invalid_input_is_rejected() {
        let indefinite = SymmetricMatrix::<f64, 3>::diagonal([1.0, -1.0, 1.0]);
        assert_eq!(
            VoronoiFirstReduction::tensor_decomposition(&indefinite, 0.0),
            Err(Error::NotPositiveDefinite)
        );
        let nan = SymmetricMatrix::<f64, 2>::diagonal([1.0, f64::NAN]);
        assert_eq!(VoronoiFirstReduction::tensor_decomposition(&nan, 0.0), Err(Error::NotPositiveDefinite));
        let m6 = SymmetricMatrix::<f64, 6>::identity();
        assert_eq!(
            VoronoiFirstReduction::tensor_decomposition(&m6, 0.0),
            Err(Error::UnsupportedDimension(6))
        );
    }

    #[test]
    fn iteration_cap_is_reported() {
        let a = Matrix([[1, 0, 0], [9, 1, 0], [-4, 7, 1]]);
        let m = SymmetricMatrix::<f64, 3>::identity().gram(&a);
        let capped = VoronoiOptions::from_tolerance(-1.0).with_max_iterations(0);
        assert!(matches!(
            VoronoiFirstReduction::<f64, 3>::minimize(&m, &capped),
            Err(Error::Internal(msg)) if msg.contains("moves")
        ));
        let state = VoronoiFirstReduction::<f64, 3>::minimize(&m, &VoronoiOptions::from_tolerance(-1.0)).unwrap();
        assert!(state.moves() > 0);
    }
}
