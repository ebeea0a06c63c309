use ghost_agent::{AgentFeatures, BeliefStateAgent, RecoveryPolicy};
use ghost_core::{
    BehaviorMode, DEFAULT_LIKELIHOOD_FLOOR, EnclosedCellPolicy, FilterConfig, FilterError, Grid,
    Position,
};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

/// Everything one simulated pursuit needs besides the behavior mode.
#[derive(Debug, Clone)]
pub struct EpisodeSpec<'a> {
    pub grid: &'a Grid,
    pub ghosts: usize,
    pub steps: usize,
    pub sensor_variance: f64,
    pub enclosed_cells: EnclosedCellPolicy,
    pub pursuer_start: Position,
    pub pursuer_moving: bool,
    pub recovery: RecoveryPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeOutcome {
    pub mean_error: f64,
    pub final_error: f64,
    pub final_entropy: f64,
    pub reseeds: u64,
    pub pursuer_end: Position,
}

/// Simulates ghosts moving under `mode`, senses them, and tracks them with a
/// belief-state agent. Fully determined by `seed`.
pub fn run_episode(
    spec: &EpisodeSpec<'_>,
    mode: BehaviorMode,
    seed: u64,
) -> Result<EpisodeOutcome, FilterError> {
    let grid = spec.grid;
    let mut rng = StdRng::seed_from_u64(seed);
    let config = FilterConfig {
        behavior: mode,
        sensor_variance: spec.sensor_variance,
        enclosed_cells: spec.enclosed_cells,
        likelihood_floor: DEFAULT_LIKELIHOOD_FLOOR,
    };
    let features = AgentFeatures::new(spec.recovery, spec.steps.max(1));
    let mut agent = BeliefStateAgent::new(grid.clone(), config, spec.ghosts, features)?;
    let motion = *agent.engine().motion();

    let cells: Vec<Position> = grid.traversable_cells().collect();
    let mut ghosts: Vec<Position> = (0..spec.ghosts)
        .map(|_| cells[rng.gen_range(0..cells.len())])
        .collect();
    let mut pursuer = spec.pursuer_start;

    for _ in 0..spec.steps {
        if spec.pursuer_moving {
            pursuer = wander(grid, pursuer, &mut rng);
        }
        for ghost in ghosts.iter_mut() {
            *ghost = motion.sample_move(grid, *ghost, pursuer, &mut rng);
        }
        let evidence = agent.sense(&ghosts, pursuer, &mut rng);
        agent.update_belief_state(&evidence, pursuer)?;
        agent.record_metrics(&ghosts)?;
    }

    let metrics = agent.metrics();
    let final_error = (0..spec.ghosts)
        .filter_map(|index| metrics.last_error(index))
        .sum::<usize>() as f64
        / spec.ghosts as f64;
    let final_entropy = agent
        .engine()
        .beliefs()
        .map(|(_, belief)| belief.entropy())
        .sum::<f64>()
        / spec.ghosts as f64;

    Ok(EpisodeOutcome {
        mean_error: metrics.mean_error().unwrap_or(0.0),
        final_error,
        final_entropy,
        reseeds: agent.reseeds(),
        pursuer_end: pursuer,
    })
}

/// One uniform random step to a traversable neighbor; stays put when boxed in.
fn wander<R: Rng + ?Sized>(grid: &Grid, from: Position, rng: &mut R) -> Position {
    let options: Vec<Position> = grid.neighbors(from).map(|(_, pos)| pos).collect();
    if options.is_empty() {
        return from;
    }
    options[rng.gen_range(0..options.len())]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(grid: &Grid, moving: bool) -> EpisodeSpec<'_> {
        EpisodeSpec {
            grid,
            ghosts: 2,
            steps: 25,
            sensor_variance: 1.0,
            enclosed_cells: EnclosedCellPolicy::Retain,
            pursuer_start: Position::new(1, 1),
            pursuer_moving: moving,
            recovery: RecoveryPolicy::ReseedUniform,
        }
    }

    #[test]
    fn episodes_are_reproducible_from_seed() {
        let grid = Grid::open(6, 6).unwrap();
        let spec = spec(&grid, true);
        let first = run_episode(&spec, BehaviorMode::Cautious, 99).unwrap();
        let second = run_episode(&spec, BehaviorMode::Cautious, 99).unwrap();
        assert_eq!(first, second);
        assert!(first.mean_error >= 0.0);
        assert!(first.final_entropy >= 0.0);
    }

    #[test]
    fn stationary_pursuer_stays_put() {
        let grid = Grid::open(5, 5).unwrap();
        let outcome = run_episode(&spec(&grid, false), BehaviorMode::Neutral, 3).unwrap();
        assert_eq!(outcome.pursuer_end, Position::new(1, 1));
    }

    #[test]
    fn wander_only_visits_traversable_cells() {
        let grid = Grid::from_layout("%%%%%\n%...%\n%%%%%\n").unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut pos = Position::new(1, 1);
        for _ in 0..50 {
            pos = wander(&grid, pos, &mut rng);
            assert!(grid.is_traversable(pos));
        }
    }
}
