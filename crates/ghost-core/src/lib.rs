#![deny(warnings)]
mod error;
pub mod filter;
pub mod model;

pub use filter::{
    Belief, BeliefMetrics, DEFAULT_LIKELIHOOD_FLOOR, DegenerateReason, EnclosedCellPolicy,
    FilterConfig, FilterEngine, FilterError, MotionModel, SensorModel, StepReport, TargetId,
    TargetSummary,
};
pub use model::{BehaviorMode, Direction, Grid, Position};

pub struct AppInfo;

impl AppInfo {
    pub const fn name() -> &'static str {
        "ghostwatch"
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
