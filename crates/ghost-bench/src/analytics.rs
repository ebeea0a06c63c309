use std::fs;
use std::path::Path;

use ghost_core::BehaviorMode;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};
use thiserror::Error;

const CONFIDENCE_LEVEL: f64 = 0.95;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("mode '{0}' recorded but not configured")]
    UnknownMode(BehaviorMode),
    #[error("invalid distribution parameters: {0}")]
    Distribution(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

/// Accumulates per-run tracking errors grouped by behavior mode.
pub struct AnalyticsCollector {
    modes: Vec<ModeAccumulator>,
}

impl AnalyticsCollector {
    pub fn new(modes: &[BehaviorMode]) -> Self {
        Self {
            modes: modes.iter().copied().map(ModeAccumulator::new).collect(),
        }
    }

    pub fn record_run(
        &mut self,
        mode: BehaviorMode,
        mean_error: f64,
        reseeds: u64,
    ) -> Result<(), AnalyticsError> {
        let acc = self
            .modes
            .iter_mut()
            .find(|acc| acc.mode == mode)
            .ok_or(AnalyticsError::UnknownMode(mode))?;
        acc.errors.push(mean_error);
        acc.reseeds += reseeds;
        Ok(())
    }

    pub fn finalize(self) -> Result<AnalyticsSummary, AnalyticsError> {
        let modes = self
            .modes
            .into_iter()
            .map(ModeAccumulator::into_report)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AnalyticsSummary { modes })
    }
}

struct ModeAccumulator {
    mode: BehaviorMode,
    errors: Vec<f64>,
    reseeds: u64,
}

impl ModeAccumulator {
    fn new(mode: BehaviorMode) -> Self {
        Self {
            mode,
            errors: Vec::new(),
            reseeds: 0,
        }
    }

    fn into_report(self) -> Result<ModeReport, AnalyticsError> {
        let (mean, std_dev) = mean_and_std(&self.errors);
        let ci95 = confidence_interval(&self.errors)?;
        Ok(ModeReport {
            mode: self.mode,
            runs: self.errors.len(),
            mean_error: mean,
            std_dev,
            ci95,
            reseeds: self.reseeds,
        })
    }
}

fn mean_and_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    if samples.len() == 1 {
        return (mean, 0.0);
    }
    let variance = samples
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (n - 1.0);
    (mean, variance.sqrt())
}

/// Two-sided Student-t interval around the sample mean.
fn confidence_interval(samples: &[f64]) -> Result<(f64, f64), AnalyticsError> {
    let (mean, std_dev) = mean_and_std(samples);
    if samples.len() < 2 {
        return Ok((mean, mean));
    }
    let freedom = samples.len() as f64 - 1.0;
    let students = StudentsT::new(0.0, 1.0, freedom)
        .map_err(|err| AnalyticsError::Distribution(err.to_string()))?;
    let quantile = students.inverse_cdf(0.5 + CONFIDENCE_LEVEL / 2.0);
    let margin = quantile * std_dev / (samples.len() as f64).sqrt();
    Ok((mean - margin, mean + margin))
}

#[derive(Debug, Clone, Serialize)]
pub struct ModeReport {
    pub mode: BehaviorMode,
    pub runs: usize,
    pub mean_error: f64,
    pub std_dev: f64,
    pub ci95: (f64, f64),
    pub reseeds: u64,
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub modes: Vec<ModeReport>,
}

impl AnalyticsSummary {
    pub fn mode(&self, mode: BehaviorMode) -> Option<&ModeReport> {
        self.modes.iter().find(|report| report.mode == mode)
    }

    pub fn to_markdown(&self, run_id: &str) -> String {
        let mut rows = String::new();
        rows.push_str(&format!("# Ghost Tracking Summary: {run_id}\n\n"));
        rows.push_str(
            "Mean Manhattan distance between each belief's most likely cell and the true ghost.\n\n",
        );
        rows.push_str("| Mode | Runs | Mean error | Std dev | 95% CI | Reseeds |\n");
        rows.push_str("|------|------|------------|---------|--------|---------|\n");
        for report in &self.modes {
            rows.push_str(&format!(
                "| {mode} | {runs} | {mean:.3} | {std:.3} | [{low:.3}, {high:.3}] | {reseeds} |\n",
                mode = report.mode,
                runs = report.runs,
                mean = report.mean_error,
                std = report.std_dev,
                low = report.ci95.0,
                high = report.ci95.1,
                reseeds = report.reseeds,
            ));
        }
        rows
    }

    pub fn write_markdown(&self, path: impl AsRef<Path>, run_id: &str) -> Result<(), AnalyticsError> {
        fs::write(path.as_ref(), self.to_markdown(run_id)).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_run_has_degenerate_interval() {
        let mut collector = AnalyticsCollector::new(&[BehaviorMode::Neutral]);
        collector.record_run(BehaviorMode::Neutral, 2.5, 0).unwrap();
        let summary = collector.finalize().unwrap();
        let report = summary.mode(BehaviorMode::Neutral).unwrap();
        assert_eq!(report.runs, 1);
        assert_eq!(report.std_dev, 0.0);
        assert_eq!(report.ci95, (2.5, 2.5));
    }

    #[test]
    fn interval_uses_student_t_quantile() {
        let mut collector = AnalyticsCollector::new(&[BehaviorMode::Evasive]);
        collector.record_run(BehaviorMode::Evasive, 1.0, 1).unwrap();
        collector.record_run(BehaviorMode::Evasive, 3.0, 2).unwrap();
        let summary = collector.finalize().unwrap();
        let report = summary.mode(BehaviorMode::Evasive).unwrap();

        assert!((report.mean_error - 2.0).abs() < 1e-12);
        assert!((report.std_dev - 2f64.sqrt()).abs() < 1e-12);
        // t(0.975, 1) ≈ 12.706 and the standard error is exactly 1.
        assert!((report.ci95.1 - 2.0 - 12.706).abs() < 1e-2);
        assert!((2.0 - report.ci95.0 - 12.706).abs() < 1e-2);
        assert_eq!(report.reseeds, 3);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let mut collector = AnalyticsCollector::new(&[BehaviorMode::Neutral]);
        assert!(matches!(
            collector.record_run(BehaviorMode::Cautious, 1.0, 0),
            Err(AnalyticsError::UnknownMode(BehaviorMode::Cautious))
        ));
    }

    #[test]
    fn markdown_lists_modes_in_configured_order() {
        let mut collector =
            AnalyticsCollector::new(&[BehaviorMode::Evasive, BehaviorMode::Neutral]);
        collector.record_run(BehaviorMode::Neutral, 1.0, 0).unwrap();
        collector.record_run(BehaviorMode::Evasive, 4.0, 0).unwrap();
        let markdown = collector.finalize().unwrap().to_markdown("demo");

        let evasive = markdown.find("| evasive |").unwrap();
        let neutral = markdown.find("| neutral |").unwrap();
        assert!(evasive < neutral);
        assert!(markdown.starts_with("# Ghost Tracking Summary: demo"));
    }
}
