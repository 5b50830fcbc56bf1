//! Summary statistics over expense amounts.

use crate::error::ForecastError;
use statrs::statistics::Statistics;

pub const RECENT_WINDOW: usize = 3;

pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Sample standard deviation (n - 1). A single observation has no spread.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().std_dev()
}

pub fn tail_mean(values: &[f64], window: usize) -> f64 {
    let start = values.len().saturating_sub(window);
    mean(&values[start..])
}

/// `100 * (1 - stddev / mean)` clamped to `[0, 100]`; a non-positive mean scores 0.
pub fn confidence(amounts: &[f64]) -> f64 {
    let avg = mean(amounts);
    let cov = if avg > 0.0 {
        sample_std(amounts) / avg
    } else {
        1.0
    };
    let score = 100.0 * (1.0 - cov);
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

/// Least-squares slope of `values` against their position (degree-1 polyfit).
pub fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = mean(values);
    let (mut num, mut den) = (0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        num += dx * (y - y_mean);
        den += dx * dx;
    }
    if den == 0.0 {
        0.0
    } else {
        num / den
    }
}

/// `n` evenly spaced weights from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

pub fn weighted_mean(values: &[f64], weights: &[f64]) -> f64 {
    let total: f64 = weights.iter().sum();
    values
        .iter()
        .zip(weights)
        .map(|(v, w)| v * w)
        .sum::<f64>()
        / total
}

/// Observed amount statistics used for clamping and sanity checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub recent_mean: f64,
}

impl AmountSummary {
    pub fn from_amounts(amounts: &[f64]) -> Self {
        Self {
            min: amounts.iter().copied().fold(f64::INFINITY, f64::min),
            max: amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean: mean(amounts),
            recent_mean: tail_mean(amounts, RECENT_WINDOW),
        }
    }

    /// Clamp into `[0.5 * min, 1.5 * max]`.
    pub fn clamp(&self, value: f64) -> f64 {
        value.min(self.max * 1.5).max(self.min * 0.5)
    }

    pub fn check_range(&self, value: f64) -> Result<f64, ForecastError> {
        let upper = self.max * 2.0;
        if !value.is_finite() || value < 0.0 || value > upper {
            return Err(ForecastError::PredictionRange { value, upper });
        }
        Ok(value)
    }

    /// Replaces a model output outside `[0, 2 * max]` with a blend of the overall and
    /// recent mean. The result always lands in `[0.5 * min, 1.5 * max]`.
    pub fn guard(&self, raw: f64) -> f64 {
        match self.check_range(raw) {
            Ok(value) => self.clamp(value),
            Err(err) => {
                let adjusted = self.clamp(0.5 * self.mean + 0.5 * self.recent_mean);
                tracing::warn!(error = %err, adjusted, "prediction seems unreasonable, adjusting");
                adjusted
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_full_for_constant_amounts() {
        assert_eq!(confidence(&[50.0, 50.0, 50.0]), 100.0);
        assert_eq!(confidence(&[100.0]), 100.0);
    }

    #[test]
    fn confidence_bottoms_out() {
        assert_eq!(confidence(&[0.0, 0.0]), 0.0);
        assert_eq!(confidence(&[1.0, 1000.0, 1.0]), 0.0);
        let c = confidence(&[90.0, 100.0, 110.0]);
        assert!((c - 90.0).abs() < 1e-9);
    }

    #[test]
    fn slope_matches_polyfit() {
        assert!((linear_slope(&[1.0, 3.0, 5.0, 7.0]) - 2.0).abs() < 1e-12);
        assert_eq!(linear_slope(&[4.0]), 0.0);
    }

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(0.5, 1.0, 1), vec![0.5]);
        assert_eq!(linspace(0.5, 1.0, 3), vec![0.5, 0.75, 1.0]);
    }

    #[test]
    fn tail_mean_uses_available_history() {
        assert_eq!(tail_mean(&[2.0, 4.0], 3), 3.0);
        assert_eq!(tail_mean(&[1.0, 2.0, 4.0, 6.0], 3), 4.0);
    }

    #[test]
    fn guard_replaces_out_of_range_values() {
        let summary = AmountSummary::from_amounts(&[100.0, 120.0, 80.0, 100.0]);
        assert_eq!(summary.guard(110.0), 110.0);
        // mean 100, recent mean 100 -> 100
        assert_eq!(summary.guard(-5.0), 100.0);
        assert_eq!(summary.guard(500.0), 100.0);
        assert_eq!(summary.guard(f64::NAN), 100.0);
        // inside [0, 2*max] but above 1.5*max
        assert_eq!(summary.guard(230.0), 180.0);
        assert!(summary.check_range(241.0).is_err());
    }
}
