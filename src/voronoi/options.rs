use serde::{Deserialize, Serialize};

/// Knobs of the Voronoi minimisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoronoiOptions {
    /// Relative decrease required by the greedy basis pass, `None` to skip it.
    pub greedy_tolerance: Option<f64>,
    /// A vertex is optimal once its weights (or LP value) are above `-optimality_tolerance`,
    /// relative to the trace of the reduced form.
    pub optimality_tolerance: f64,
    /// Cap on the number of moves between vertices.
    pub max_iterations: usize,
}

impl Default for VoronoiOptions {
    fn default() -> Self {
        Self { greedy_tolerance: Some(0.0), optimality_tolerance: 1e-10, max_iterations: 10_000 }
    }
}

impl VoronoiOptions {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options matching the scalar `tol` argument: a negative value disables the greedy pass.
    pub fn from_tolerance(tol: f64) -> Self {
        Self::default().with_greedy_tolerance((tol >= 0.0).then_some(tol))
    }

    /// Greedy basis tolerance, `None` to skip the greedy pass.
    pub fn with_greedy_tolerance(mut self, tolerance: Option<f64>) -> Self {
        self.greedy_tolerance = tolerance;
        self
    }

    /// Relative tolerance of the optimality test.
    pub fn with_optimality_tolerance(mut self, tolerance: f64) -> Self {
        self.optimality_tolerance = tolerance;
        self
    }

    /// Abort the walk after this many moves.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn negative_tolerance_disables_greedy_pass() {
        assert_eq!(VoronoiOptions::from_tolerance(-1.0).greedy_tolerance, None);
        assert_eq!(VoronoiOptions::from_tolerance(0.25).greedy_tolerance, Some(0.25));
        assert_eq!(VoronoiOptions::from_tolerance(0.0), VoronoiOptions::default());
    }

    #[test]
    fn builders_override_defaults() {
        let opts = VoronoiOptions::new().with_max_iterations(3).with_optimality_tolerance(1e-6);
        assert_eq!(opts.max_iterations, 3);
        assert_abs_diff_eq!(opts.optimality_tolerance, 1e-6);
        assert_eq!(opts.greedy_tolerance, Some(0.0));
    }
}
