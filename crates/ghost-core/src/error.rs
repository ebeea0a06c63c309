use core::fmt;
use thiserror::Error;

use crate::filter::TargetId;
use crate::model::Position;

/// Errors surfaced by grid construction and the filter engine.
///
/// Structural invariant violations (negative mass, mass on a wall) are not
/// represented here: they are bugs and panic instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("position {position} lies outside the {width}x{height} grid")]
    OutOfBounds {
        position: Position,
        width: usize,
        height: usize,
    },
    #[error("expected {expected} observations (one per tracked target), got {found}")]
    ObservationCount { expected: usize, found: usize },
    #[error("target {0} is not tracked")]
    UnknownTarget(TargetId),
    #[error("belief for target {target} degenerated at step {step}: {reason}")]
    DegenerateBelief {
        target: TargetId,
        step: u64,
        reason: DegenerateReason,
    },
}

impl FilterError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        FilterError::Configuration(message.into())
    }

    /// Target whose belief degenerated, if this is a degeneracy error.
    pub fn degenerate_target(&self) -> Option<TargetId> {
        match self {
            FilterError::DegenerateBelief { target, .. } => Some(*target),
            _ => None,
        }
    }
}

/// Why a normalization could not produce a probability distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DegenerateReason {
    /// Every cell ended with zero mass.
    ZeroMass,
    /// The total mass was NaN or infinite.
    NonFinite,
    /// No cell holding predicted mass scored above the likelihood floor.
    Unsupported,
}

impl fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegenerateReason::ZeroMass => f.write_str("total mass is zero"),
            DegenerateReason::NonFinite => f.write_str("total mass is not finite"),
            DegenerateReason::Unsupported => {
                f.write_str("observation is unsupported by every reachable cell")
            }
        }
    }
}
