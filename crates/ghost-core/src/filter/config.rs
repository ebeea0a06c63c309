use serde::{Deserialize, Serialize};

use super::motion::EnclosedCellPolicy;
use super::sensor::DEFAULT_LIKELIHOOD_FLOOR;
use crate::error::FilterError;
use crate::model::BehaviorMode;

const DEFAULT_SENSOR_VARIANCE: f64 = 1.0;

/// Constants fixed for the lifetime of one filter run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub behavior: BehaviorMode,
    pub sensor_variance: f64,
    pub enclosed_cells: EnclosedCellPolicy,
    pub likelihood_floor: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            behavior: BehaviorMode::default(),
            sensor_variance: DEFAULT_SENSOR_VARIANCE,
            enclosed_cells: EnclosedCellPolicy::default(),
            likelihood_floor: DEFAULT_LIKELIHOOD_FLOOR,
        }
    }
}

impl FilterConfig {
    pub fn new(behavior: BehaviorMode, sensor_variance: f64) -> Self {
        Self {
            behavior,
            sensor_variance,
            ..Self::default()
        }
    }

    pub fn with_enclosed_cells(mut self, policy: EnclosedCellPolicy) -> Self {
        self.enclosed_cells = policy;
        self
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if !self.sensor_variance.is_finite() || self.sensor_variance <= 0.0 {
            return Err(FilterError::config(format!(
                "sensor_variance must be positive and finite, got {}",
                self.sensor_variance
            )));
        }
        if !(self.likelihood_floor > 0.0 && self.likelihood_floor < 1.0) {
            return Err(FilterError::config(format!(
                "likelihood_floor must lie in (0, 1), got {}",
                self.likelihood_floor
            )));
        }
        Ok(())
    }

    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    /// Reads `GHOST_BEHAVIOR`, `GHOST_SENSOR_VARIANCE` and
    /// `GHOST_ENCLOSED_CELLS`; unparsable values fall back to defaults.
    pub fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let base = Self::default();

        let behavior = read("GHOST_BEHAVIOR")
            .and_then(|raw| raw.parse::<BehaviorMode>().ok())
            .unwrap_or(base.behavior);

        let sensor_variance = read("GHOST_SENSOR_VARIANCE")
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value > 0.0)
            .unwrap_or(base.sensor_variance);

        let enclosed_cells = read("GHOST_ENCLOSED_CELLS")
            .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
                "retain" | "keep" => Some(EnclosedCellPolicy::Retain),
                "drop" => Some(EnclosedCellPolicy::Drop),
                _ => None,
            })
            .unwrap_or(base.enclosed_cells);

        Self {
            behavior,
            sensor_variance,
            enclosed_cells,
            likelihood_floor: base.likelihood_floor,
        }
    }
}
