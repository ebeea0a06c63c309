use std::collections::VecDeque;

/// Bounded per-target history of argmax tracking errors.
#[derive(Debug, Clone)]
pub struct TrackingMetrics {
    window: usize,
    errors: Vec<VecDeque<usize>>,
    samples: u64,
}

impl TrackingMetrics {
    pub fn new(targets: usize, window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            errors: (0..targets)
                .map(|_| VecDeque::with_capacity(window.min(1024)))
                .collect(),
            samples: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Total errors recorded, including those evicted from the window.
    pub fn samples(&self) -> u64 {
        self.samples
    }

    pub fn record(&mut self, target: usize, error: usize) {
        if target >= self.errors.len() {
            self.errors.resize_with(target + 1, VecDeque::new);
        }
        let history = &mut self.errors[target];
        if history.len() == self.window {
            history.pop_front();
        }
        history.push_back(error);
        self.samples += 1;
    }

    pub fn last_error(&self, target: usize) -> Option<usize> {
        self.errors.get(target).and_then(|history| history.back().copied())
    }

    pub fn target_mean_error(&self, target: usize) -> Option<f64> {
        let history = self.errors.get(target)?;
        if history.is_empty() {
            return None;
        }
        Some(history.iter().sum::<usize>() as f64 / history.len() as f64)
    }

    /// Mean over every windowed error of every target.
    pub fn mean_error(&self) -> Option<f64> {
        let (sum, count) = self
            .errors
            .iter()
            .flatten()
            .fold((0usize, 0usize), |(sum, count), error| (sum + error, count + 1));
        (count > 0).then(|| sum as f64 / count as f64)
    }

    /// Windowed errors for `target`, oldest first.
    pub fn history(&self, target: usize) -> impl Iterator<Item = usize> + '_ {
        self.errors
            .get(target)
            .into_iter()
            .flat_map(|history| history.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metrics_have_no_mean() {
        let metrics = TrackingMetrics::new(2, 4);
        assert_eq!(metrics.mean_error(), None);
        assert_eq!(metrics.target_mean_error(0), None);
        assert_eq!(metrics.last_error(1), None);
    }

    #[test]
    fn window_evicts_oldest_errors() {
        let mut metrics = TrackingMetrics::new(1, 3);
        for error in [9, 1, 2, 3] {
            metrics.record(0, error);
        }
        assert_eq!(metrics.history(0).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(metrics.target_mean_error(0), Some(2.0));
        assert_eq!(metrics.samples(), 4);
        assert_eq!(metrics.last_error(0), Some(3));
    }

    #[test]
    fn mean_spans_all_targets() {
        let mut metrics = TrackingMetrics::new(2, 10);
        metrics.record(0, 2);
        metrics.record(1, 4);
        metrics.record(1, 6);
        assert_eq!(metrics.mean_error(), Some(4.0));
    }
}
