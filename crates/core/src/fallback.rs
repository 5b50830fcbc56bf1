//! Model-free estimate: recency-weighted mean nudged by the linear trend.

use crate::domain::expense::ExpenseRecord;
use crate::error::ForecastError;
use crate::stats::{self, AmountSummary};

pub const FEATURES_USED: [&str; 3] = ["amount", "weights", "trend"];

const MIN_RECORDS_FOR_TREND: usize = 3;
const WEIGHTED_SHARE: f64 = 0.7;
const TREND_CAP_SHARE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackEstimate {
    pub prediction: f64,
    pub confidence: f64,
    pub weighted_average: f64,
    pub trend: f64,
}

/// `reference_max`, when given, replaces the observed maximum as the base of the upper
/// clamp.
pub fn estimate(
    records: &[ExpenseRecord],
    reference_max: Option<f64>,
) -> Result<FallbackEstimate, ForecastError> {
    if records.is_empty() {
        return Err(ForecastError::data("at least one expense record is required"));
    }

    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.date);
    let amounts: Vec<f64> = sorted.iter().map(|r| r.amount).collect();
    let n = amounts.len();
    let summary = AmountSummary::from_amounts(&amounts);

    // Oldest record weighs 0.5, newest 1.0.
    let weights = stats::linspace(0.5, 1.0, n);
    let weighted_average = stats::weighted_mean(&amounts, &weights);

    let trend = if n >= MIN_RECORDS_FOR_TREND {
        stats::linear_slope(&amounts)
    } else {
        0.0
    };

    let base = WEIGHTED_SHARE * weighted_average + (1.0 - WEIGHTED_SHARE) * summary.mean;
    let magnitude = (TREND_CAP_SHARE * summary.mean).min((trend * n as f64).abs());
    let direction = if trend > 0.0 { 1.0 } else { -1.0 };
    let bounds = AmountSummary {
        max: reference_max.unwrap_or(summary.max),
        ..summary
    };
    let prediction = bounds.clamp(base + magnitude * direction);

    Ok(FallbackEstimate {
        prediction,
        confidence: stats::confidence(&amounts),
        weighted_average,
        trend,
    })
}

pub fn features_used() -> Vec<String> {
    FEATURES_USED.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn monthly(amounts: &[f64]) -> Vec<ExpenseRecord> {
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| ExpenseRecord {
                date: NaiveDate::from_ymd_opt(2024, i as u32 + 1, 10).unwrap(),
                amount: *a,
            })
            .collect()
    }

    #[test]
    fn single_record_predicts_itself_with_full_confidence() {
        let est = estimate(&monthly(&[100.0]), None).unwrap();
        assert_eq!(est.prediction, 100.0);
        assert_eq!(est.confidence, 100.0);
        assert_eq!(est.trend, 0.0);
    }

    #[test]
    fn recency_weighting_and_trend_push_upwards() {
        let est = estimate(&monthly(&[100.0, 110.0, 120.0, 130.0]), None).unwrap();
        // weights 0.5, 2/3, 5/6, 1 -> weighted mean 1060/9
        assert!((est.weighted_average - 1060.0 / 9.0).abs() < 1e-9);
        assert!((est.trend - 10.0).abs() < 1e-9);
        // 0.7 * weighted + 0.3 * 115 + min(23, 40)
        let expected = 0.7 * (1060.0 / 9.0) + 0.3 * 115.0 + 23.0;
        assert!((est.prediction - expected).abs() < 1e-9);
    }

    #[test]
    fn downward_trend_is_capped_and_clamped() {
        let est = estimate(&monthly(&[300.0, 200.0, 100.0]), None).unwrap();
        assert!(est.trend < 0.0);
        assert!(est.prediction >= 50.0 && est.prediction <= 450.0);
    }

    #[test]
    fn prediction_always_within_observed_bounds() {
        let cases: [&[f64]; 4] = [
            &[5.0, 500.0, 5.0, 500.0],
            &[0.0, 0.0, 1.0],
            &[1000.0, 10.0],
            &[42.0, 42.0, 42.0, 42.0, 42.0],
        ];
        for amounts in cases {
            let est = estimate(&monthly(amounts), None).unwrap();
            let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
            let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            assert!(est.prediction >= 0.5 * min && est.prediction <= 1.5 * max);
            assert!((0.0..=100.0).contains(&est.confidence));
        }
    }

    #[test]
    fn reference_max_sets_the_upper_clamp() {
        let rising = monthly(&[100.0, 110.0, 120.0, 130.0]);
        let unbounded = estimate(&rising, None).unwrap();
        assert!(unbounded.prediction > 120.0);

        let capped = estimate(&rising, Some(80.0)).unwrap();
        assert_eq!(capped.prediction, 120.0);

        let loose = estimate(&rising, Some(1000.0)).unwrap();
        assert_eq!(loose.prediction, unbounded.prediction);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(estimate(&[], None).is_err());
    }
}
