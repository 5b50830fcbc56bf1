use crate::domain::expense::ExpenseRecord;
use crate::domain::result::{ModelType, PredictionResult};
use crate::error::ForecastError;
use crate::fallback;
use crate::features::{BoundaryPolicy, FeatureFrame};
use crate::model::ModelArtifact;
use crate::stats::{self, AmountSummary};
use crate::storage::{ModelKey, ModelStore};
use crate::time::period::{next_period_date, period_label};
use std::time::Instant;

/// Forecasts the next period's spend. A saved model for `key` is used when one can be
/// loaded; otherwise, or when inference with it fails, the statistical estimate is
/// returned instead, its upper clamp based on `reference_max` when given.
pub fn predict(
    records: &[ExpenseRecord],
    key: Option<&ModelKey>,
    reference_max: Option<f64>,
    store: &dyn ModelStore,
) -> Result<PredictionResult, ForecastError> {
    let started = Instant::now();
    let frame = FeatureFrame::build(records, BoundaryPolicy::Inference)?;
    let next_month = period_label(next_period_date(frame.last_date()));

    if let Some(artifact) = key.and_then(|key| load_artifact(key, store)) {
        match predict_with_model(&frame, &artifact) {
            Ok((prediction, features_used)) => {
                return Ok(PredictionResult {
                    prediction,
                    confidence: stats::confidence(&frame.amounts()),
                    next_month,
                    model_type: ModelType::SavedModel,
                    features_used,
                    prediction_time: started.elapsed().as_secs_f64(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, model = %artifact.model_name, "saved model inference failed; using statistical estimate");
            }
        }
    }

    let estimate = fallback::estimate(records, reference_max)?;
    tracing::info!(
        prediction = estimate.prediction,
        trend = estimate.trend,
        "statistical estimate"
    );
    Ok(PredictionResult {
        prediction: estimate.prediction,
        confidence: estimate.confidence,
        next_month,
        model_type: ModelType::Statistical,
        features_used: fallback::features_used(),
        prediction_time: started.elapsed().as_secs_f64(),
    })
}

fn load_artifact(key: &ModelKey, store: &dyn ModelStore) -> Option<ModelArtifact> {
    match store.load(key) {
        Ok(Some(artifact)) => Some(artifact),
        Ok(None) => {
            tracing::info!(%key, "no saved model");
            None
        }
        Err(e) => {
            tracing::warn!(%key, error = %e, "saved model unusable; using statistical estimate");
            None
        }
    }
}

fn predict_with_model(
    frame: &FeatureFrame,
    artifact: &ModelArtifact,
) -> Result<(f64, Vec<String>), ForecastError> {
    let schema = artifact.feature_schema();
    let next = frame.next_period_features();
    let raw = artifact.pipeline.predict_one(next.select(&schema))?;
    let prediction = AmountSummary::from_amounts(&frame.amounts()).guard(raw);

    let mut features_used = next.known_subset(&schema);
    if features_used.is_empty() {
        features_used = vec!["amount".to_string()];
    }

    tracing::info!(model = %artifact.model_name, raw, prediction, "saved model prediction");
    Ok((prediction, features_used))
}
