use std::path::PathBuf;

use clap::Parser;

use ghost_bench::config::{BenchmarkConfig, ResolvedOutputs};
use ghost_bench::logging::init_logging;
use ghost_bench::simulation::SimulationRunner;

/// Simulation harness for the ghost-tracking belief filter.
#[derive(Debug, Parser)]
#[command(
    name = "ghost-bench",
    author,
    version,
    about = "Deterministic ghost-tracking simulation harness"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of filter steps per run.
    #[arg(long, value_name = "STEPS")]
    steps: Option<usize>,

    /// Override the number of runs per behavior mode.
    #[arg(long, value_name = "RUNS")]
    runs: Option<usize>,

    /// Override the master RNG seed.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the configuration (no simulation is run).
    #[arg(long)]
    validate_only: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(steps) = cli.steps {
        config.scenario.steps = steps;
    }

    if let Some(runs) = cli.runs {
        config.scenario.runs = runs;
    }

    if let Some(seed) = cli.seed {
        config.scenario.seed = Some(seed);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let run_id = config.run_id.clone();
    let mode_count = config.scenario.modes.len();
    let runs = config.scenario.runs;
    let steps = config.scenario.steps;

    println!(
        "Loaded configuration '{run_id}' with {mode_count} mode{} ({runs} runs × {steps} steps)",
        if mode_count == 1 { "" } else { "s" }
    );

    let _logging_guard = init_logging(&config.logging, &outputs, &run_id)?;
    let runner = SimulationRunner::new(config, outputs)?;
    println!(
        "Layout: {}x{} with {} traversable cells",
        runner.grid().width(),
        runner.grid().height(),
        runner.grid().traversable_count()
    );

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Simulation complete for '{run_id}': {} runs → {} rows at {}",
        summary.runs_completed,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    for report in &summary.analytics.modes {
        println!(
            "  {:<8} mean error {:.3} (95% CI [{:.3}, {:.3}], {} reseeds)",
            report.mode.as_str(),
            report.mean_error,
            report.ci95.0,
            report.ci95.1,
            report.reseeds
        );
    }
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
