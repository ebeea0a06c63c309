//! Predict → correct → normalize orchestration across tracked targets.

use core::fmt;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{Level, event};

use super::belief::Belief;
use super::config::FilterConfig;
use super::motion::{EnclosedCellPolicy, MotionModel};
use super::sensor::SensorModel;
use super::telemetry::BeliefMetrics;
use crate::error::{DegenerateReason, FilterError};
use crate::model::{Grid, Position};

/// Stable handle for a tracked target. Ids are never reused by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TargetId(u32);

impl TargetId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a predicted belief came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionOrigin {
    /// Initial-condition branch: the seed prior, normalized, without diffusion.
    Seed,
    /// Motion-model diffusion of the previous posterior.
    Motion,
}

/// Pre-observation belief. Only [`Predicted::correct`] or
/// [`Predicted::skip_correction`] move it forward.
#[derive(Debug, Clone)]
pub struct Predicted {
    belief: Belief,
    origin: PredictionOrigin,
}

impl Predicted {
    /// First cycle of a target: the seed itself, normalized.
    pub fn from_seed(seed: &Belief) -> Result<Self, DegenerateReason> {
        Ok(Self {
            belief: seed.normalized()?,
            origin: PredictionOrigin::Seed,
        })
    }

    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    pub fn origin(&self) -> PredictionOrigin {
        self.origin
    }

    /// Reweights every traversable cell by the likelihood of `observation`.
    pub fn correct(
        self,
        grid: &Grid,
        sensor: &SensorModel,
        observation: f64,
        pursuer: Position,
    ) -> Corrected {
        let span = grid.span() as f64;
        let mut belief = self.belief;
        let mut supported = false;
        for cell in grid.traversable_cells() {
            let prior = belief.get(cell);
            let likelihood = sensor.likelihood(observation, cell.manhattan(pursuer) as f64, span);
            if prior > 0.0 && sensor.supports(likelihood) {
                supported = true;
            }
            belief.scale(cell, likelihood);
        }
        Corrected { belief, supported }
    }

    /// No evidence this step: the prediction passes through unweighted.
    pub fn skip_correction(self) -> Corrected {
        Corrected {
            belief: self.belief,
            supported: true,
        }
    }
}

/// Posterior before normalization.
#[derive(Debug, Clone)]
pub struct Corrected {
    belief: Belief,
    supported: bool,
}

impl Corrected {
    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    /// Whether at least one cell with predicted mass scored above the floor.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn normalize(self) -> Result<Belief, DegenerateReason> {
        let normalized = self.belief.normalized()?;
        if !self.supported {
            return Err(DegenerateReason::Unsupported);
        }
        Ok(normalized)
    }
}

/// Diffuses `prior` one step with the motion model. Mass is accumulated into
/// a fresh matrix; walls never receive any.
pub fn predict(grid: &Grid, motion: &MotionModel, prior: &Belief, pursuer: Position) -> Predicted {
    let mut next = Belief::zeros(grid);
    for (source, mass) in prior.iter() {
        if mass == 0.0 || grid.is_wall(source) {
            continue;
        }
        let transitions = motion.transitions(grid, source, pursuer);
        if transitions.is_empty() {
            if motion.enclosed_policy() == EnclosedCellPolicy::Retain {
                next.add(source, mass);
            }
            continue;
        }
        for (dest, prob) in transitions.iter() {
            next.add(dest, mass * prob);
        }
    }
    Predicted {
        belief: next,
        origin: PredictionOrigin::Motion,
    }
}

#[derive(Debug, Clone)]
struct TargetTrack {
    id: TargetId,
    belief: Belief,
    cycles: u64,
}

/// Per-target outcome of a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TargetSummary {
    pub id: TargetId,
    pub peak: f64,
    pub argmax: Position,
    pub entropy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    /// Number of completed steps including this one.
    pub step: u64,
    pub targets: Vec<TargetSummary>,
}

/// Owns the belief of every tracked target and advances them in lockstep.
#[derive(Debug, Clone)]
pub struct FilterEngine {
    grid: Grid,
    config: FilterConfig,
    motion: MotionModel,
    sensor: SensorModel,
    tracks: Vec<TargetTrack>,
    next_id: u32,
    step: u64,
}

impl FilterEngine {
    pub fn new(grid: Grid, config: FilterConfig) -> Result<Self, FilterError> {
        config.validate()?;
        let sensor = SensorModel::new(config.sensor_variance, config.likelihood_floor)?;
        let motion = MotionModel::new(config.behavior, config.enclosed_cells);
        Ok(Self {
            grid,
            config,
            motion,
            sensor,
            tracks: Vec::new(),
            next_id: 0,
            step: 0,
        })
    }

    /// Engine already tracking `targets` targets under uniform priors.
    pub fn with_uniform_targets(
        grid: Grid,
        config: FilterConfig,
        targets: usize,
    ) -> Result<Self, FilterError> {
        let mut engine = Self::new(grid, config)?;
        for _ in 0..targets {
            engine.track(None)?;
        }
        Ok(engine)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    pub fn motion(&self) -> &MotionModel {
        &self.motion
    }

    pub fn sensor(&self) -> &SensorModel {
        &self.sensor
    }

    /// Completed steps since construction.
    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn target_count(&self) -> usize {
        self.tracks.len()
    }

    /// Tracked targets in observation order.
    pub fn target_ids(&self) -> Vec<TargetId> {
        self.tracks.iter().map(|track| track.id).collect()
    }

    /// Starts tracking a target from `seed`, or a uniform prior when `None`.
    /// New targets join the observation order at the end.
    pub fn track(&mut self, seed: Option<Belief>) -> Result<TargetId, FilterError> {
        let belief = match seed {
            Some(seed) => {
                seed.check_seed(&self.grid)?;
                seed
            }
            None => Belief::uniform(&self.grid),
        };
        let id = TargetId(self.next_id);
        self.next_id += 1;
        self.tracks.push(TargetTrack {
            id,
            belief,
            cycles: 0,
        });
        Ok(id)
    }

    /// Stops tracking `id` and hands back its last belief.
    pub fn untrack(&mut self, id: TargetId) -> Result<Belief, FilterError> {
        let index = self.position_of(id)?;
        Ok(self.tracks.remove(index).belief)
    }

    /// Replaces the belief of `id` with a uniform prior over traversable cells
    /// and sends it back through the initial-condition branch.
    pub fn reseed_uniform(&mut self, id: TargetId) -> Result<(), FilterError> {
        let index = self.position_of(id)?;
        let track = &mut self.tracks[index];
        track.belief = Belief::uniform(&self.grid);
        track.cycles = 0;
        Ok(())
    }

    pub fn belief(&self, id: TargetId) -> Result<&Belief, FilterError> {
        let index = self.position_of(id)?;
        Ok(&self.tracks[index].belief)
    }

    /// Completed cycles for `id`; zero means the next cycle takes the seed branch.
    pub fn cycles(&self, id: TargetId) -> Result<u64, FilterError> {
        let index = self.position_of(id)?;
        Ok(self.tracks[index].cycles)
    }

    pub fn beliefs(&self) -> impl Iterator<Item = (TargetId, &Belief)> + '_ {
        self.tracks.iter().map(|track| (track.id, &track.belief))
    }

    /// Current beliefs as `[target][x][y]`.
    pub fn belief_matrices(&self) -> Vec<Vec<Vec<f64>>> {
        self.tracks
            .iter()
            .map(|track| track.belief.to_matrix())
            .collect()
    }

    /// Runs one full cycle for every target, one observation per target in
    /// [`FilterEngine::target_ids`] order.
    pub fn update(
        &mut self,
        observations: &[f64],
        pursuer: Position,
    ) -> Result<StepReport, FilterError> {
        let evidence: Vec<Option<f64>> = observations.iter().copied().map(Some).collect();
        self.update_with_evidence(&evidence, pursuer)
    }

    /// Like [`FilterEngine::update`], but a `None` entry skips the correction
    /// for that target.
    ///
    /// The step is all-or-nothing: if any target fails, no belief is replaced
    /// and the step counter does not advance.
    pub fn update_with_evidence(
        &mut self,
        evidence: &[Option<f64>],
        pursuer: Position,
    ) -> Result<StepReport, FilterError> {
        self.grid.check_bounds(pursuer)?;
        if evidence.len() != self.tracks.len() {
            return Err(FilterError::ObservationCount {
                expected: self.tracks.len(),
                found: evidence.len(),
            });
        }

        let posteriors = match self
            .run_cycles(evidence, pursuer)
            .into_iter()
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(posteriors) => posteriors,
            Err(err) => {
                tracing::warn!(
                    target: "ghost_core::filter",
                    step = self.step,
                    pursuer = %pursuer,
                    error = %err,
                    "filter step rejected; beliefs left unchanged"
                );
                return Err(err);
            }
        };

        let mut targets = Vec::with_capacity(posteriors.len());
        for (track, posterior) in self.tracks.iter_mut().zip(posteriors) {
            posterior.assert_invariants(&self.grid);
            track.belief = posterior;
            track.cycles += 1;
            let metrics = BeliefMetrics::from_belief(&track.belief);
            targets.push(TargetSummary {
                id: track.id,
                peak: metrics.peak,
                argmax: metrics.argmax,
                entropy: metrics.entropy,
            });
        }
        self.step += 1;

        let report = StepReport {
            step: self.step,
            targets,
        };
        log_step(&report, pursuer);
        Ok(report)
    }

    #[cfg(feature = "rayon")]
    fn run_cycles(
        &self,
        evidence: &[Option<f64>],
        pursuer: Position,
    ) -> Vec<Result<Belief, FilterError>> {
        self.tracks
            .par_iter()
            .zip(evidence.par_iter())
            .map(|(track, observation)| self.cycle(track, *observation, pursuer))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn run_cycles(
        &self,
        evidence: &[Option<f64>],
        pursuer: Position,
    ) -> Vec<Result<Belief, FilterError>> {
        self.tracks
            .iter()
            .zip(evidence)
            .map(|(track, observation)| self.cycle(track, *observation, pursuer))
            .collect()
    }

    fn cycle(
        &self,
        track: &TargetTrack,
        observation: Option<f64>,
        pursuer: Position,
    ) -> Result<Belief, FilterError> {
        let predicted = if track.cycles == 0 {
            Predicted::from_seed(&track.belief).map_err(|reason| self.degenerate(track.id, reason))?
        } else {
            predict(&self.grid, &self.motion, &track.belief, pursuer)
        };

        let corrected = match observation {
            Some(observation) => predicted.correct(&self.grid, &self.sensor, observation, pursuer),
            None => predicted.skip_correction(),
        };

        corrected
            .normalize()
            .map_err(|reason| self.degenerate(track.id, reason))
    }

    fn degenerate(&self, target: TargetId, reason: DegenerateReason) -> FilterError {
        FilterError::DegenerateBelief {
            target,
            step: self.step,
            reason,
        }
    }

    fn position_of(&self, id: TargetId) -> Result<usize, FilterError> {
        self.tracks
            .iter()
            .position(|track| track.id == id)
            .ok_or(FilterError::UnknownTarget(id))
    }
}

fn log_step(report: &StepReport, pursuer: Position) {
    if !tracing::enabled!(Level::DEBUG) {
        return;
    }

    for summary in &report.targets {
        event!(
            target: "ghost_core::filter",
            Level::DEBUG,
            step = report.step,
            target_id = summary.id.get(),
            pursuer = %pursuer,
            argmax = %summary.argmax,
            peak = summary.peak,
            entropy = summary.entropy,
        );
    }
}
