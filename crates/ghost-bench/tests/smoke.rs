use std::fs;

use ghost_bench::config::BenchmarkConfig;
use ghost_bench::simulation::SimulationRunner;
use ghost_core::BehaviorMode;
use tempfile::tempdir;

fn load_config(output_dir: &std::path::Path) -> BenchmarkConfig {
    let yaml = format!(
        r#"
run_id: "test_smoke"
layout:
  text: |
    %%%%%%%%
    %......%
    %.%%%%.%
    %......%
    %%%%%%%%
scenario:
  seed: 4242
  runs: 2
  steps: 15
  ghosts: 2
  sensor_variance: 1.0
  modes: ["neutral", "evasive"]
  pursuer:
    x: 1
    y: 1
    moving: true
  recovery: "reseed"
outputs:
  jsonl: "{jsonl}"
  summary_md: "{summary}"
logging:
  enable_structured: false
"#,
        jsonl = output_dir.join("runs.jsonl").display(),
        summary = output_dir.join("summary.md").display(),
    );

    let mut cfg: BenchmarkConfig = serde_yaml::from_str(&yaml).expect("valid yaml");
    cfg.validate().expect("config validates");
    cfg
}

fn run_once(dir: &std::path::Path) -> String {
    let config = load_config(dir);
    let outputs = config.resolved_outputs();
    let runner = SimulationRunner::new(config, outputs).expect("runner created");
    let summary = runner.run().expect("simulation completes");

    assert_eq!(summary.runs_completed, 4);
    assert_eq!(summary.rows_written, 4);
    assert!(summary.summary_path.exists(), "summary markdown missing");
    assert!(summary.telemetry_path.is_none());
    assert!(summary.analytics.mode(BehaviorMode::Evasive).is_some());

    fs::read_to_string(&summary.jsonl_path).expect("jsonl readable")
}

#[test]
fn simulation_smoke_test_is_deterministic() {
    let first_dir = tempdir().expect("temp dir");
    let second_dir = tempdir().expect("temp dir");

    let first = run_once(first_dir.path());
    let second = run_once(second_dir.path());
    assert_eq!(first, second, "same seed must reproduce identical rows");

    let rows: Vec<serde_json::Value> = first
        .lines()
        .map(|line| serde_json::from_str(line).expect("row decodes to JSON"))
        .collect();
    assert_eq!(rows.len(), 4);
    assert_eq!(rows[0]["mode"], "neutral");
    assert_eq!(rows[3]["mode"], "evasive");
    for row in &rows {
        assert_eq!(row["run_id"], "test_smoke");
        assert_eq!(row["steps"], 15);
        let error = row["mean_error"].as_f64().expect("numeric error");
        assert!(error >= 0.0);
    }

    let markdown =
        fs::read_to_string(first_dir.path().join("summary.md")).expect("summary readable");
    assert!(markdown.contains("| neutral | 2 |"));
    assert!(markdown.contains("| evasive | 2 |"));
}

#[test]
fn pursuer_on_wall_is_rejected() {
    let dir = tempdir().expect("temp dir");
    let mut config = load_config(dir.path());
    config.scenario.pursuer.x = 0;
    let outputs = config.resolved_outputs();
    assert!(SimulationRunner::new(config, outputs).is_err());
}
