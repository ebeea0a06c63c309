mod episode;

pub use episode::{EpisodeOutcome, EpisodeSpec, run_episode};

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ghost_agent::{AgentFeatures, RecoveryPolicy};
use ghost_core::{BehaviorMode, EnclosedCellPolicy, FilterConfig, FilterError, Grid, Position};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

use crate::analytics::{AnalyticsCollector, AnalyticsError, AnalyticsSummary};
use crate::config::{BenchmarkConfig, LayoutConfig, RecoveryConfig, ResolvedOutputs};
use crate::logging::TELEMETRY_FILE;

/// Runs every configured mode × run and writes the artifacts.
pub struct SimulationRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    grid: Grid,
    enclosed_cells: EnclosedCellPolicy,
    recovery: RecoveryPolicy,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub runs_completed: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
    pub analytics: AnalyticsSummary,
}

impl SimulationRunner {
    /// Build a runner from a validated configuration, loading its layout.
    /// Scenario fields left out of the YAML take their `GHOST_*` environment values.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        Self::with_env_defaults(
            config,
            outputs,
            FilterConfig::from_env(),
            AgentFeatures::from_env(),
        )
    }

    pub fn with_env_defaults(
        config: BenchmarkConfig,
        outputs: ResolvedOutputs,
        filter_env: FilterConfig,
        features_env: AgentFeatures,
    ) -> Result<Self, RunnerError> {
        let grid = load_layout(&config.layout)?;
        let start = config.scenario.pursuer.start();
        grid.check_bounds(start)?;
        if !grid.is_traversable(start) {
            return Err(RunnerError::PursuerOnWall { position: start });
        }

        let enclosed_cells = config
            .scenario
            .enclosed_cells
            .unwrap_or(filter_env.enclosed_cells);
        let recovery = config
            .scenario
            .recovery
            .map(RecoveryConfig::policy)
            .unwrap_or(features_env.recovery());

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            enclosed_cells,
            recovery,
            config,
            outputs,
            grid,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Episode parameters with environment defaults applied.
    pub fn episode_spec(&self) -> EpisodeSpec<'_> {
        let scenario = &self.config.scenario;
        EpisodeSpec {
            grid: &self.grid,
            ghosts: scenario.ghosts,
            steps: scenario.steps,
            sensor_variance: scenario.sensor_variance,
            enclosed_cells: self.enclosed_cells,
            pursuer_start: scenario.pursuer.start(),
            pursuer_moving: scenario.pursuer.moving,
            recovery: self.recovery,
        }
    }

    /// Execute all episodes, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let scenario = &self.config.scenario;
        let spec = self.episode_spec();

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(scenario.seed.unwrap_or(0));
        let mut analytics = AnalyticsCollector::new(&scenario.modes);
        let mut rows_written = 0usize;

        for &mode in &scenario.modes {
            for run_index in 0..scenario.runs {
                let seed = rng.next_u64();
                let outcome = run_episode(&spec, mode, seed).map_err(|source| {
                    RunnerError::Episode {
                        mode,
                        run_index,
                        source,
                    }
                })?;
                analytics.record_run(mode, outcome.mean_error, outcome.reseeds)?;

                let row = RunLogRow {
                    run_id: &self.config.run_id,
                    mode,
                    run_index,
                    seed,
                    steps: scenario.steps,
                    ghosts: scenario.ghosts,
                    sensor_variance: scenario.sensor_variance,
                    mean_error: outcome.mean_error,
                    final_error: outcome.final_error,
                    final_entropy: outcome.final_entropy,
                    reseeds: outcome.reseeds,
                };
                serde_json::to_writer(&mut writer, &row)?;
                writer.write_all(b"\n")?;
                rows_written += 1;

                if self.logging_enabled && tracing::enabled!(Level::INFO) {
                    event!(
                        target: "ghost_bench::run",
                        Level::INFO,
                        mode = %mode,
                        run_index,
                        seed,
                        mean_error = outcome.mean_error,
                        final_error = outcome.final_error,
                        reseeds = outcome.reseeds,
                    );
                }
            }
        }

        writer.flush()?;

        let analytics = analytics.finalize()?;
        analytics.write_markdown(&self.outputs.summary_md, &self.config.run_id)?;

        let telemetry_path = self
            .logging_enabled
            .then(|| self.outputs.report_dir().join(TELEMETRY_FILE));

        Ok(RunSummary {
            runs_completed: rows_written,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
            analytics,
        })
    }
}

fn load_layout(layout: &LayoutConfig) -> Result<Grid, RunnerError> {
    match (&layout.path, &layout.text) {
        (Some(path), _) => {
            let path = PathBuf::from(path);
            let text = fs::read_to_string(&path).map_err(|source| RunnerError::LayoutRead {
                path: path.clone(),
                source,
            })?;
            Grid::from_layout(&text).map_err(|source| RunnerError::Layout { path, source })
        }
        (None, Some(text)) => Ok(Grid::from_layout(text)?),
        (None, None) => Err(RunnerError::Filter(FilterError::Configuration(
            "no layout configured".to_string(),
        ))),
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

#[derive(Serialize)]
struct RunLogRow<'a> {
    run_id: &'a str,
    mode: BehaviorMode,
    run_index: usize,
    seed: u64,
    steps: usize,
    ghosts: usize,
    sensor_variance: f64,
    mean_error: f64,
    final_error: f64,
    final_entropy: f64,
    reseeds: u64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("failed to read layout {path:?}: {source}")]
    LayoutRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid layout {path:?}: {source}")]
    Layout {
        path: PathBuf,
        #[source]
        source: FilterError,
    },
    #[error("pursuer start {position} is a wall cell")]
    PursuerOnWall { position: Position },
    #[error("{mode} run {run_index} failed: {source}")]
    Episode {
        mode: BehaviorMode,
        run_index: usize,
        #[source]
        source: FilterError,
    },
    #[error("filter error: {0}")]
    Filter(#[from] FilterError),
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}
