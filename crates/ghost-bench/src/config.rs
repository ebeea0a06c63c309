use ghost_agent::RecoveryPolicy;
use ghost_core::{BehaviorMode, EnclosedCellPolicy, Position};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const DEFAULT_RUNS: usize = 10;
const DEFAULT_SENSOR_VARIANCE: f64 = 4.0;
const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub layout: LayoutConfig,
    pub scenario: ScenarioConfig,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.layout.validate()?;
        self.scenario.validate()?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }
}

/// Maze source: a layout file on disk or inline layout text.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct LayoutConfig {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl LayoutConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match (&self.path, &self.text) {
            (Some(path), None) if !path.trim().is_empty() => Ok(()),
            (None, Some(text)) if !text.trim().is_empty() => Ok(()),
            (Some(_), Some(_)) => Err(ValidationError::InvalidField {
                field: "layout".to_string(),
                message: "specify either layout.path or layout.text, not both".to_string(),
            }),
            _ => Err(ValidationError::InvalidField {
                field: "layout".to_string(),
                message: "a non-empty layout.path or layout.text is required".to_string(),
            }),
        }
    }
}

/// Simulated episodes: how many, how long, and under which ghost behaviors.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ScenarioConfig {
    pub seed: Option<u64>,
    #[serde(default = "default_runs")]
    pub runs: usize,
    pub steps: usize,
    pub ghosts: usize,
    #[serde(default = "default_sensor_variance")]
    pub sensor_variance: f64,
    #[serde(default = "default_modes")]
    pub modes: Vec<BehaviorMode>,
    /// Falls back to `GHOST_ENCLOSED_CELLS` when omitted.
    #[serde(default)]
    pub enclosed_cells: Option<EnclosedCellPolicy>,
    pub pursuer: PursuerConfig,
    /// Falls back to `GHOST_RECOVERY` when omitted.
    #[serde(default)]
    pub recovery: Option<RecoveryConfig>,
}

impl ScenarioConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        for (label, value) in [
            ("scenario.runs", self.runs),
            ("scenario.steps", self.steps),
            ("scenario.ghosts", self.ghosts),
        ] {
            if value == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "must be greater than zero".to_string(),
                });
            }
        }

        if !self.sensor_variance.is_finite() || self.sensor_variance <= 0.0 {
            return Err(ValidationError::InvalidField {
                field: "scenario.sensor_variance".to_string(),
                message: format!(
                    "sensor variance must be positive and finite, got {}",
                    self.sensor_variance
                ),
            });
        }

        if self.modes.is_empty() {
            return Err(ValidationError::InvalidField {
                field: "scenario.modes".to_string(),
                message: "at least one behavior mode must be specified".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for mode in &self.modes {
            if !seen.insert(*mode) {
                return Err(ValidationError::InvalidField {
                    field: "scenario.modes".to_string(),
                    message: format!("mode '{mode}' listed more than once"),
                });
            }
        }

        Ok(())
    }
}

fn default_runs() -> usize {
    DEFAULT_RUNS
}

fn default_sensor_variance() -> f64 {
    DEFAULT_SENSOR_VARIANCE
}

fn default_modes() -> Vec<BehaviorMode> {
    BehaviorMode::ALL.to_vec()
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct PursuerConfig {
    pub x: usize,
    pub y: usize,
    /// Random-walk the pursuer between steps instead of holding it still.
    #[serde(default)]
    pub moving: bool,
}

impl PursuerConfig {
    pub fn start(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryConfig {
    Abort,
    #[serde(alias = "reseed_uniform")]
    Reseed,
}

impl RecoveryConfig {
    pub fn policy(self) -> RecoveryPolicy {
        match self {
            RecoveryConfig::Abort => RecoveryPolicy::Abort,
            RecoveryConfig::Reseed => RecoveryPolicy::ReseedUniform,
        }
    }
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    PathBuf::from(template.replace("{run_id}", run_id))
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

impl ResolvedOutputs {
    /// Directory holding the summary; telemetry is written next to it.
    pub fn report_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
