use serde::Serialize;

use super::Belief;
use crate::model::Position;

/// Scalar summary of one belief, cheap enough to log every step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BeliefMetrics {
    pub peak: f64,
    pub argmax: Position,
    pub entropy: f64,
    pub expected_position: (f64, f64),
}

impl BeliefMetrics {
    pub fn from_belief(belief: &Belief) -> Self {
        Self {
            peak: belief.peak(),
            argmax: belief.argmax(),
            entropy: belief.entropy(),
            expected_position: belief.expected_position(),
        }
    }

    /// Manhattan distance between the most likely cell and `truth`.
    pub fn argmax_error(&self, truth: Position) -> usize {
        self.argmax.manhattan(truth)
    }
}
