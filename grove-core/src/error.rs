use thiserror::Error;

/// Configuration-level failures surfaced by the growth pipeline.
///
/// Numeric edge cases (zero-length branches, near-parallel rays, tiny pair
/// distances) are never errors; they are resolved locally with epsilon
/// clamps or sentinel values. Only misconfigurations that would otherwise
/// loop forever are reported here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GroveError {
    /// Rejection sampling could not place the requested number of points
    /// inside the envelope within the attempt budget. The envelope is
    /// (near-)empty relative to its bounding box.
    #[error("placed {placed} of {requested} attraction points in {attempts} attempts")]
    SamplingBudgetExhausted {
        requested: usize,
        placed: usize,
        attempts: usize,
    },

    /// Growth did not consume every attraction point within the round
    /// budget. Some points likely sit outside any tip's radius of influence.
    #[error("{remaining} attraction points left after {rounds} growth rounds")]
    RoundLimitExceeded { rounds: usize, remaining: usize },
}
