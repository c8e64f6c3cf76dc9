use thiserror::Error;

use crate::linprog::LinprogError;

/// Failure of a reduction or decomposition call.
///
/// No partial result is ever returned alongside an error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The input is not a finite positive-definite matrix.
    #[error("invalid input: matrix not positive-definite")]
    NotPositiveDefinite,

    /// Dimension outside `1..=5`.
    #[error("unsupported dimension {0}: expected 1 to 5")]
    UnsupportedDimension(usize),

    /// A step that cannot fail for valid input did fail.
    /// This points at a logic bug or at extreme numerical degeneracy.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl From<LinprogError> for Error {
    fn from(e: LinprogError) -> Self {
        Error::Internal(format!("linear program failed: {e}"))
    }
}

/// Result of the decomposition routines.
pub type Result<T> = std::result::Result<T, Error>;
