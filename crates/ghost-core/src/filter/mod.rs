//! Recursive Bayesian filter over grid cells.
//!
//! One cycle per target and time step runs
//! `Idle → Predicting → Correcting → Normalized`:
//! - `motion`: biased diffusion of mass toward traversable neighbors.
//! - `sensor`: likelihood of a noisy Manhattan distance reading.
//! - `belief`: the mass matrix being evolved.
//! - `engine`: per-target orchestration, initial-condition branch, degeneracy reporting.
//! - `telemetry`: scalar summaries for logs and benchmarks.

mod belief;
mod config;
mod engine;
mod motion;
mod sensor;
mod telemetry;

pub use crate::error::{DegenerateReason, FilterError};
pub use belief::{Belief, MASS_TOLERANCE};
pub use config::FilterConfig;
pub use engine::{
    Corrected, FilterEngine, PredictionOrigin, Predicted, StepReport, TargetId, TargetSummary,
    predict,
};
pub use motion::{EnclosedCellPolicy, MotionModel, Transitions};
pub use sensor::{DEFAULT_LIKELIHOOD_FLOOR, SensorModel};
pub use telemetry::BeliefMetrics;
