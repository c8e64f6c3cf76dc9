//! Lattice basis reduction and Voronoi tensor decomposition in small dimension.
//!
//! A positive definite `D × D` matrix `m` is written as a non-negative combination of
//! rank-one tensors over integer offsets:
//!
//! ```text
//! m = Σ_i λ_i · e_i ⊗ e_i,     λ_i ≥ 0,  e_i ∈ ℤ^D
//! ```
//!
//! * [`BasisReduction`] (D ≤ 3) goes through an obtuse superbase (Selling's algorithm).
//! * [`VoronoiFirstReduction`] (D ≤ 5) walks the perfect forms of Voronoi's first reduction.

mod decomposition;
mod display;
mod error;
mod lattice;
mod math;
mod reduction;
mod voronoi;

pub mod io;
pub mod linprog;

pub use decomposition::Decomposition;
pub use error::{Error, Result};
pub use lattice::ShortVectors;
pub use math::*;
pub use reduction::{BasisReduction, Superbase};
pub use voronoi::{SimplexState, VoronoiFirstReduction, VoronoiOptions};
pub use rand;
