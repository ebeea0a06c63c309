mod metrics;
mod view;

pub use metrics::TrackingMetrics;
pub use view::BeliefView;

use ghost_core::{BeliefMetrics, FilterConfig, FilterEngine, FilterError, Grid, Position, TargetId};
use rand::Rng;
use tracing::{Level, event};

pub const DEFAULT_METRICS_WINDOW: usize = 10_000;

/// What the agent does when a target's belief degenerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    /// Propagate the error to the caller.
    #[default]
    Abort,
    /// Restart the failing target from a uniform prior and retry the step
    /// with its reading withheld.
    ReseedUniform,
}

impl RecoveryPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            RecoveryPolicy::Abort => "abort",
            RecoveryPolicy::ReseedUniform => "reseed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "abort" | "fail" => Some(RecoveryPolicy::Abort),
            "reseed" | "reseed_uniform" | "uniform" => Some(RecoveryPolicy::ReseedUniform),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentFeatures {
    recovery: RecoveryPolicy,
    metrics_window: usize,
}

impl AgentFeatures {
    pub const fn new(recovery: RecoveryPolicy, metrics_window: usize) -> Self {
        Self {
            recovery,
            metrics_window,
        }
    }

    pub fn from_env() -> Self {
        Self::from_reader(|key| std::env::var(key).ok())
    }

    pub const fn recovery(self) -> RecoveryPolicy {
        self.recovery
    }

    pub const fn metrics_window(self) -> usize {
        self.metrics_window
    }

    pub fn with_recovery(mut self, recovery: RecoveryPolicy) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn from_reader<F>(mut read: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let recovery = read("GHOST_RECOVERY")
            .and_then(|raw| RecoveryPolicy::parse(&raw))
            .unwrap_or_default();

        let metrics_window = read("GHOST_METRICS_WINDOW")
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(DEFAULT_METRICS_WINDOW);

        Self {
            recovery,
            metrics_window,
        }
    }
}

impl Default for AgentFeatures {
    fn default() -> Self {
        Self {
            recovery: RecoveryPolicy::Abort,
            metrics_window: DEFAULT_METRICS_WINDOW,
        }
    }
}

/// Keeps one belief per ghost up to date from noisy distance readings.
#[derive(Debug, Clone)]
pub struct BeliefStateAgent {
    engine: FilterEngine,
    features: AgentFeatures,
    metrics: TrackingMetrics,
    reseeds: u64,
}

impl BeliefStateAgent {
    pub fn new(
        grid: Grid,
        config: FilterConfig,
        targets: usize,
        features: AgentFeatures,
    ) -> Result<Self, FilterError> {
        let engine = FilterEngine::with_uniform_targets(grid, config, targets)?;
        Ok(Self {
            engine,
            features,
            metrics: TrackingMetrics::new(targets, features.metrics_window()),
            reseeds: 0,
        })
    }

    pub fn engine(&self) -> &FilterEngine {
        &self.engine
    }

    pub fn features(&self) -> AgentFeatures {
        self.features
    }

    pub fn metrics(&self) -> &TrackingMetrics {
        &self.metrics
    }

    /// Number of targets restarted from a uniform prior so far.
    pub fn reseeds(&self) -> u64 {
        self.reseeds
    }

    pub fn view(&self, id: TargetId, confidence: f64) -> Result<BeliefView<'_>, FilterError> {
        Ok(BeliefView::new(self.engine.belief(id)?, confidence))
    }

    /// Noisy Manhattan readings from `pursuer` to each true ghost position.
    pub fn sense<R: Rng + ?Sized>(
        &self,
        true_positions: &[Position],
        pursuer: Position,
        rng: &mut R,
    ) -> Vec<f64> {
        let sensor = self.engine.sensor();
        true_positions
            .iter()
            .map(|ghost| sensor.sample(ghost.manhattan(pursuer) as f64, &mut *rng))
            .collect()
    }

    /// Runs one filter step and returns the beliefs as `[target][x][y]`.
    pub fn update_belief_state(
        &mut self,
        evidence: &[f64],
        pursuer: Position,
    ) -> Result<Vec<Vec<Vec<f64>>>, FilterError> {
        let mut pending: Vec<Option<f64>> = evidence.iter().copied().map(Some).collect();
        loop {
            let err = match self.engine.update_with_evidence(&pending, pursuer) {
                Ok(_) => return Ok(self.engine.belief_matrices()),
                Err(err) => err,
            };
            if self.features.recovery() == RecoveryPolicy::Abort {
                return Err(err);
            }
            let Some(target) = err.degenerate_target() else {
                return Err(err);
            };
            let Some(index) = self.engine.target_ids().iter().position(|id| *id == target)
            else {
                return Err(err);
            };
            if pending[index].is_none() {
                return Err(err);
            }

            self.engine.reseed_uniform(target)?;
            let withheld = pending[index].take();
            self.reseeds += 1;
            tracing::warn!(
                target: "ghost_agent::recovery",
                target_id = target.get(),
                step = self.engine.step(),
                reading = ?withheld,
                error = %err,
                "belief degenerated; reseeding uniform and retrying without the reading"
            );
        }
    }

    /// Records the argmax error of every belief against the true positions.
    pub fn record_metrics(&mut self, true_positions: &[Position]) -> Result<(), FilterError> {
        let expected = self.engine.target_count();
        if true_positions.len() != expected {
            return Err(FilterError::ObservationCount {
                expected,
                found: true_positions.len(),
            });
        }
        for (index, ((_, belief), truth)) in
            self.engine.beliefs().zip(true_positions).enumerate()
        {
            let error = BeliefMetrics::from_belief(belief).argmax_error(*truth);
            self.metrics.record(index, error);
        }

        if tracing::enabled!(Level::TRACE) {
            event!(
                target: "ghost_agent::metrics",
                Level::TRACE,
                step = self.engine.step(),
                mean_error = ?self.metrics.mean_error(),
                samples = self.metrics.samples(),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghost_core::BehaviorMode;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn reader(pairs: &[(&str, &str)]) -> impl FnMut(&str) -> Option<String> {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| {
            owned
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
        }
    }

    #[test]
    fn features_default_when_unset() {
        let features = AgentFeatures::from_reader(|_| None);
        assert_eq!(features, AgentFeatures::default());
        assert_eq!(features.metrics_window(), DEFAULT_METRICS_WINDOW);
    }

    #[test]
    fn features_read_recovery_and_window() {
        let features = AgentFeatures::from_reader(reader(&[
            ("GHOST_RECOVERY", " Reseed "),
            ("GHOST_METRICS_WINDOW", "250"),
        ]));
        assert_eq!(features.recovery(), RecoveryPolicy::ReseedUniform);
        assert_eq!(features.metrics_window(), 250);
    }

    #[test]
    fn features_reject_zero_window() {
        let features = AgentFeatures::from_reader(reader(&[
            ("GHOST_RECOVERY", "sometimes"),
            ("GHOST_METRICS_WINDOW", "0"),
        ]));
        assert_eq!(features, AgentFeatures::default());
    }

    fn agent(recovery: RecoveryPolicy, variance: f64) -> BeliefStateAgent {
        BeliefStateAgent::new(
            Grid::open(5, 5).unwrap(),
            FilterConfig::new(BehaviorMode::Neutral, variance),
            2,
            AgentFeatures::default().with_recovery(recovery),
        )
        .unwrap()
    }

    #[test]
    fn sense_is_centred_on_true_distance() {
        let agent = agent(RecoveryPolicy::Abort, 1e-6);
        let mut rng = SmallRng::seed_from_u64(11);
        let readings = agent.sense(
            &[Position::new(4, 4), Position::new(1, 0)],
            Position::new(0, 0),
            &mut rng,
        );
        assert!((readings[0] - 8.0).abs() < 0.01);
        assert!((readings[1] - 1.0).abs() < 0.01);
    }

    #[test]
    fn abort_policy_propagates_degeneracy() {
        let mut agent = agent(RecoveryPolicy::Abort, 1e-4);
        let err = agent
            .update_belief_state(&[2.0, 1_000.0], Position::new(0, 0))
            .unwrap_err();
        assert_eq!(err.degenerate_target(), Some(TargetId::new(1)));
        assert_eq!(agent.reseeds(), 0);
        assert_eq!(agent.engine().step(), 0);
    }

    #[test]
    fn reseed_policy_withholds_bad_reading() {
        let mut agent = agent(RecoveryPolicy::ReseedUniform, 1e-4);
        agent
            .update_belief_state(&[2.0, 2.0], Position::new(0, 0))
            .unwrap();
        let matrices = agent
            .update_belief_state(&[2.0, 1_000.0], Position::new(0, 0))
            .unwrap();

        assert_eq!(agent.reseeds(), 1);
        assert_eq!(agent.engine().step(), 2);
        assert_eq!(matrices.len(), 2);
        let uniform = 1.0 / 25.0;
        assert!((matrices[1][4][4] - uniform).abs() < 1e-12);
        assert!(matrices[0][4][4] < uniform);
    }

    #[test]
    fn record_metrics_checks_target_count() {
        let mut agent = agent(RecoveryPolicy::Abort, 1.0);
        assert!(matches!(
            agent.record_metrics(&[Position::new(0, 0)]),
            Err(FilterError::ObservationCount { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn record_metrics_measures_argmax_distance() {
        let mut agent = agent(RecoveryPolicy::Abort, 1.0);
        agent
            .update_belief_state(&[0.0, 8.0], Position::new(0, 0))
            .unwrap();
        agent
            .record_metrics(&[Position::new(0, 1), Position::new(4, 4)])
            .unwrap();
        assert_eq!(agent.metrics().last_error(0), Some(1));
        assert_eq!(agent.metrics().last_error(1), Some(0));
        assert_eq!(agent.metrics().mean_error(), Some(0.5));
    }
}
