//! Model selection for a user's expense history.
//!
//! Small histories never reach a regressor: under five records the plain mean is
//! reported, and when the lag features leave fewer than three complete rows the mean is
//! reported with a trend note. Between three and ten usable rows a single scaled linear
//! model is fitted. From ten rows on, linear, ridge and gradient-boosted candidates are
//! compared on a reproducible holdout.

use crate::domain::expense::ExpenseRecord;
use crate::domain::json::round_to;
use crate::domain::result::{ModelType, TrainingMetrics, TrainingResult};
use crate::error::ForecastError;
use crate::features::{BoundaryPolicy, FeatureFrame, FeatureRow, FEATURE_NAMES};
use crate::model::split::{holdout, Holdout, HOLDOUT_FRACTION, HOLDOUT_SEED};
use crate::model::{metrics, ModelArtifact, Pipeline, RegressorKind};
use crate::stats::AmountSummary;
use crate::time::period::{next_period_date, period_label};
use std::collections::BTreeMap;
use std::time::Instant;

pub const MIN_RECORDS_FOR_MODELS: usize = 5;
pub const MIN_USABLE_ROWS: usize = 3;
pub const MIN_ROWS_FOR_HOLDOUT: usize = 5;
pub const MIN_ROWS_FOR_COMPARISON: usize = 10;

const AVERAGE_ACCURACY: f64 = 50.0;
const AVERAGE_WITH_TREND_ACCURACY: f64 = 60.0;

#[derive(Debug)]
pub struct TrainingOutcome {
    pub result: TrainingResult,
    /// Present only when a regressor was fitted.
    pub artifact: Option<ModelArtifact>,
}

pub fn train(records: &[ExpenseRecord]) -> Result<TrainingOutcome, ForecastError> {
    let started = Instant::now();
    let frame = FeatureFrame::build(records, BoundaryPolicy::Training)?;
    let amounts = frame.amounts();
    let summary = AmountSummary::from_amounts(&amounts);
    let next_month = period_label(next_period_date(frame.last_date()));

    if frame.len() < MIN_RECORDS_FOR_MODELS {
        tracing::info!(records = frame.len(), "not enough data for advanced models");
        return Ok(TrainingOutcome {
            result: degraded(
                ModelType::Average,
                AVERAGE_ACCURACY,
                &["amount"],
                "Not enough data for advanced models",
                &summary,
                next_month,
                started,
            ),
            artifact: None,
        });
    }

    let rows = frame.training_rows();
    if rows.len() < MIN_USABLE_ROWS {
        tracing::info!(records = frame.len(), usable = rows.len(), "limited data after feature engineering");
        return Ok(TrainingOutcome {
            result: degraded(
                ModelType::AverageWithTrend,
                AVERAGE_WITH_TREND_ACCURACY,
                &["amount", "trend"],
                "Limited data after feature engineering",
                &summary,
                next_month,
                started,
            ),
            artifact: None,
        });
    }

    let features = defined_features(&rows);
    if features.is_empty() {
        return Err(ForecastError::fit("no feature is defined on every training row"));
    }
    let x: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| features.iter().filter_map(|name| row.get(name)).collect())
        .collect();
    let y: Vec<f64> = rows.iter().map(|row| row.amount).collect();

    let split = if rows.len() >= MIN_ROWS_FOR_HOLDOUT {
        Some(holdout(&x, &y, HOLDOUT_FRACTION, HOLDOUT_SEED)?)
    } else {
        None
    };
    let (x_train, y_train) = match &split {
        Some(s) => (s.x_train.as_slice(), s.y_train.as_slice()),
        None => (x.as_slice(), y.as_slice()),
    };

    let (model_type, pipeline, model_scores) = match &split {
        Some(s) if rows.len() >= MIN_ROWS_FOR_COMPARISON => select_candidate(s)?,
        _ => (
            ModelType::SimpleLinear,
            Pipeline::fit(RegressorKind::Linear, x_train, y_train)?,
            None,
        ),
    };

    let train_pred = pipeline.predict(x_train)?;
    let mae_train = metrics::mae(y_train, &train_pred);
    let (metrics, accuracy) = match &split {
        Some(s) => {
            let test_pred = pipeline.predict(&s.x_test)?;
            (
                TrainingMetrics::new(
                    mae_train,
                    Some(metrics::mae(&s.y_test, &test_pred)),
                    Some(metrics::rmse(&s.y_test, &test_pred)),
                    metrics::r2(&s.y_test, &test_pred),
                ),
                metrics::accuracy(&s.y_test, &test_pred),
            )
        }
        None => (
            TrainingMetrics::new(mae_train, None, None, metrics::r2(y_train, &train_pred)),
            metrics::accuracy(y_train, &train_pred),
        ),
    };

    let next = frame.next_period_features();
    let raw = pipeline.predict_one(next.select(&features))?;
    let prediction = summary.guard(raw);

    tracing::info!(
        model = model_type.as_str(),
        usable = rows.len(),
        accuracy,
        raw,
        prediction,
        "training finished"
    );

    let artifact = ModelArtifact::new(model_type.as_str(), features.clone(), pipeline);
    Ok(TrainingOutcome {
        result: TrainingResult {
            prediction,
            accuracy,
            max_amount: summary.max,
            model_type,
            next_month,
            features_used: features,
            metrics: Some(metrics),
            model_scores,
            error: None,
            training_time: started.elapsed().as_secs_f64(),
        },
        artifact: Some(artifact),
    })
}

type Selection = (ModelType, Pipeline, Option<BTreeMap<String, f64>>);

/// Fits every candidate on the training side and keeps the best held-out R². Ties go
/// to the earlier candidate. A negative best score means none beats the mean, in which
/// case a plain linear model is refitted instead.
fn select_candidate(split: &Holdout) -> Result<Selection, ForecastError> {
    let mut scores = BTreeMap::new();
    let mut best: Option<(RegressorKind, Pipeline, f64)> = None;

    for kind in RegressorKind::CANDIDATES {
        let pipeline = Pipeline::fit(kind, &split.x_train, &split.y_train)?;
        let score = pipeline.score(&split.x_test, &split.y_test)?;
        tracing::debug!(model = kind.name(), score, "candidate scored");
        scores.insert(kind.name().to_string(), round_to(score, 4));

        let better = match &best {
            Some((_, _, best_score)) => score > *best_score,
            None => true,
        };
        if better {
            best = Some((kind, pipeline, score));
        }
    }

    let Some((kind, pipeline, score)) = best else {
        return Err(ForecastError::fit("no candidate model was fitted"));
    };

    if score < 0.0 || score.is_nan() {
        tracing::warn!(best = kind.name(), score, "all candidates worse than the mean; using robust linear");
        let pipeline = Pipeline::fit(RegressorKind::Linear, &split.x_train, &split.y_train)?;
        return Ok((ModelType::RobustLinear, pipeline, Some(scores)));
    }

    let model_type = match kind {
        RegressorKind::Linear => ModelType::Linear,
        RegressorKind::Ridge => ModelType::Ridge,
        RegressorKind::GradientBoosting => ModelType::GradientBoosting,
    };
    Ok((model_type, pipeline, Some(scores)))
}

/// Canonical features that carry a value on every retained row.
fn defined_features(rows: &[&FeatureRow]) -> Vec<String> {
    FEATURE_NAMES
        .iter()
        .filter(|name| rows.iter().all(|row| row.get(name).is_some_and(f64::is_finite)))
        .map(|name| name.to_string())
        .collect()
}

fn degraded(
    model_type: ModelType,
    accuracy: f64,
    features: &[&str],
    note: &str,
    summary: &AmountSummary,
    next_month: String,
    started: Instant,
) -> TrainingResult {
    TrainingResult {
        prediction: summary.mean,
        accuracy,
        max_amount: summary.max,
        model_type,
        next_month,
        features_used: features.iter().map(|s| s.to_string()).collect(),
        metrics: None,
        model_scores: None,
        error: Some(note.to_string()),
        training_time: started.elapsed().as_secs_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Months, NaiveDate};

    fn monthly(amounts: &[f64]) -> Vec<ExpenseRecord> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        amounts
            .iter()
            .enumerate()
            .map(|(i, a)| ExpenseRecord {
                date: start + Months::new(i as u32),
                amount: *a,
            })
            .collect()
    }

    #[test]
    fn tiny_history_reports_plain_average() {
        let outcome = train(&monthly(&[100.0, 200.0, 300.0, 400.0])).unwrap();
        let r = outcome.result;
        assert_eq!(r.model_type, ModelType::Average);
        assert_eq!(r.accuracy, 50.0);
        assert_eq!(r.prediction, 250.0);
        assert_eq!(r.max_amount, 400.0);
        assert_eq!(r.features_used, vec!["amount".to_string()]);
        assert!(r.error.is_some());
        assert!(outcome.artifact.is_none());
    }

    #[test]
    fn five_records_leave_too_few_usable_rows() {
        let outcome = train(&monthly(&[10.0, 20.0, 30.0, 40.0, 50.0])).unwrap();
        assert_eq!(outcome.result.model_type, ModelType::AverageWithTrend);
        assert_eq!(outcome.result.accuracy, 60.0);
        assert_eq!(outcome.result.prediction, 30.0);
        assert!(outcome.artifact.is_none());
    }

    #[test]
    fn increasing_monthly_history_fits_a_model() {
        let amounts: Vec<f64> = (0..12).map(|i| 100.0 + 10.0 * i as f64).collect();
        let outcome = train(&monthly(&amounts)).unwrap();
        let r = &outcome.result;
        assert_eq!(r.model_type, ModelType::SimpleLinear);
        assert!(r.accuracy > 50.0, "accuracy {}", r.accuracy);
        assert!(r.error.is_none());
        assert!(r.model_scores.is_none());

        let metrics = r.metrics.as_ref().unwrap();
        assert!(metrics.mae_train.is_some());
        assert!(metrics.mae_test.is_some());

        // 2023-12-01 + 30 days
        assert_eq!(r.next_month, "December 2023");
        assert!(r.prediction >= 50.0 && r.prediction <= 1.5 * 210.0);

        let artifact = outcome.artifact.unwrap();
        assert_eq!(artifact.model_name, "simple_linear");
        assert_eq!(artifact.feature_names.len(), FEATURE_NAMES.len());
    }

    #[test]
    fn small_usable_set_skips_holdout() {
        let outcome = train(&monthly(&[10.0, 12.0, 11.0, 13.0, 15.0, 14.0, 16.0])).unwrap();
        let r = &outcome.result;
        assert_eq!(r.model_type, ModelType::SimpleLinear);
        let metrics = r.metrics.as_ref().unwrap();
        assert!(metrics.mae_test.is_none());
        assert!(metrics.rmse_test.is_none());
    }

    #[test]
    fn larger_history_compares_candidates() {
        let amounts: Vec<f64> = (0..24)
            .map(|i| 200.0 + 5.0 * i as f64 + if i % 3 == 0 { 25.0 } else { -10.0 })
            .collect();
        let outcome = train(&monthly(&amounts)).unwrap();
        let r = &outcome.result;
        assert!(matches!(
            r.model_type,
            ModelType::Linear | ModelType::Ridge | ModelType::GradientBoosting | ModelType::RobustLinear
        ));
        let scores = r.model_scores.as_ref().unwrap();
        assert_eq!(scores.len(), 3);
        assert!(scores.contains_key("gradient_boosting"));
        assert!((0.0..=100.0).contains(&r.accuracy));

        let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
        let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!(r.prediction >= 0.5 * min && r.prediction <= 1.5 * max);
    }

    #[test]
    fn empty_history_is_a_data_error() {
        assert_eq!(train(&[]).unwrap_err().kind(), "data");
    }

    #[test]
    fn result_serializes_rounded() {
        let outcome = train(&monthly(&[100.0, 100.0, 100.0])).unwrap();
        let v = serde_json::to_value(&outcome.result).unwrap();
        assert_eq!(v["model_type"], "average");
        assert_eq!(v["prediction"], 100.0);
        assert!(v.get("metrics").is_none());
    }
}
