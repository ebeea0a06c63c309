//! Noisy distance sensor: Gaussian evidence generation and the triangular
//! likelihood used by the correction step.

use rand::Rng;
use rand::distributions::Distribution;
use statrs::distribution::Normal;

use crate::error::FilterError;

/// Lower bound on any likelihood so a single noisy reading never pins a cell to zero.
pub const DEFAULT_LIKELIHOOD_FLOOR: f64 = 1e-4;

#[derive(Debug, Clone)]
pub struct SensorModel {
    variance: f64,
    floor: f64,
    noise: Normal,
}

impl SensorModel {
    pub fn new(variance: f64, floor: f64) -> Result<Self, FilterError> {
        if !variance.is_finite() || variance <= 0.0 {
            return Err(FilterError::config(format!(
                "sensor variance must be positive and finite, got {variance}"
            )));
        }
        if !(floor > 0.0 && floor < 1.0) {
            return Err(FilterError::config(format!(
                "likelihood floor must lie in (0, 1), got {floor}"
            )));
        }
        let noise = Normal::new(0.0, variance.sqrt())
            .map_err(|err| FilterError::config(format!("sensor noise: {err}")))?;
        Ok(Self {
            variance,
            floor,
            noise,
        })
    }

    pub fn variance(&self) -> f64 {
        self.variance
    }

    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    pub fn floor(&self) -> f64 {
        self.floor
    }

    /// Unbiased noisy reading of `true_distance`.
    pub fn sample<R: Rng + ?Sized>(&self, true_distance: f64, rng: &mut R) -> f64 {
        true_distance + self.noise.sample(rng)
    }

    /// Similarity in `[floor, 1]`, falling linearly with the gap between the
    /// candidate and observed distance and reaching zero at `span`.
    /// NaN observations propagate as NaN.
    pub fn likelihood(&self, observed: f64, candidate: f64, span: f64) -> f64 {
        let score = 1.0 - (candidate - observed).abs() / span;
        if score.is_nan() {
            return f64::NAN;
        }
        score.max(self.floor)
    }

    /// Whether a likelihood carries evidence beyond the floor.
    pub fn supports(&self, likelihood: f64) -> bool {
        likelihood > self.floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn sensor(variance: f64) -> SensorModel {
        SensorModel::new(variance, DEFAULT_LIKELIHOOD_FLOOR).expect("valid sensor")
    }

    #[test]
    fn exact_match_scores_one() {
        assert_eq!(sensor(1.0).likelihood(5.0, 5.0, 33.0), 1.0);
    }

    #[test]
    fn likelihood_is_non_increasing_in_gap() {
        let model = sensor(1.0);
        let mut previous = f64::INFINITY;
        for step in 0..200 {
            let candidate = 5.0 + step as f64 * 0.25;
            let score = model.likelihood(5.0, candidate, 33.0);
            assert!(score <= previous);
            assert!(score >= DEFAULT_LIKELIHOOD_FLOOR);
            previous = score;
        }
        assert_eq!(model.likelihood(5.0, 38.0, 33.0), DEFAULT_LIKELIHOOD_FLOOR);
        assert_eq!(model.likelihood(5.0, -40.0, 33.0), DEFAULT_LIKELIHOOD_FLOOR);
    }

    #[test]
    fn symmetric_around_observation() {
        let model = sensor(1.0);
        let above = model.likelihood(10.0, 13.0, 20.0);
        let below = model.likelihood(10.0, 7.0, 20.0);
        assert!((above - below).abs() < 1e-12);
        assert!((above - 0.85).abs() < 1e-12);
    }

    #[test]
    fn nan_observation_is_not_floored() {
        assert!(sensor(1.0).likelihood(f64::NAN, 3.0, 10.0).is_nan());
    }

    #[test]
    fn supports_excludes_the_floor() {
        let model = sensor(1.0);
        assert!(model.supports(0.5));
        assert!(!model.supports(DEFAULT_LIKELIHOOD_FLOOR));
    }

    #[test]
    fn rejects_invalid_parameters() {
        for variance in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SensorModel::new(variance, DEFAULT_LIKELIHOOD_FLOOR),
                Err(FilterError::Configuration(_))
            ));
        }
        assert!(SensorModel::new(1.0, 0.0).is_err());
        assert!(SensorModel::new(1.0, 1.0).is_err());
    }

    #[test]
    fn samples_are_unbiased_with_expected_spread() {
        let model = sensor(4.0);
        let mut rng = SmallRng::seed_from_u64(7);
        let draws: Vec<f64> = (0..20_000).map(|_| model.sample(6.0, &mut rng)).collect();
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        let var = draws.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / draws.len() as f64;
        assert!((mean - 6.0).abs() < 0.1, "mean {mean}");
        assert!((var - 4.0).abs() < 0.25, "variance {var}");
        assert_eq!(model.std_dev(), 2.0);
    }
}
