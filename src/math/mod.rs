//! Small fixed-size linear algebra: vectors, square matrices, quadratic forms and norms.

mod matrix;
mod metric;
mod symmetric;
mod vector;

pub use matrix::Matrix;
pub use metric::{AsymmetricQuadraticNorm, Norm, RanderNorm};
pub use symmetric::{packed_index, symmetric_dimension, SymmetricMatrix};
pub use vector::{Offset, Vector};
