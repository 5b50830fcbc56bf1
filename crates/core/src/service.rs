//! Request handling shared by the HTTP server and the command line.
//!
//! Every entry point answers with a JSON body. Failures never escape: they are turned
//! into the sentinel error shapes and reported through [`Reply::error`].

use crate::domain::expense::parse_records;
use crate::domain::request::{PredictRequest, TrainRequest};
use crate::domain::result::{PredictionFailure, TrainingFailure};
use crate::error::ForecastError;
use crate::predictor;
use crate::storage::{ModelKey, ModelStore};
use crate::trainer;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Instant;

#[derive(Debug)]
pub struct Reply {
    pub body: Value,
    pub error: Option<ForecastError>,
}

impl Reply {
    fn success<T: Serialize>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(body) => Self { body, error: None },
            Err(e) => Self {
                body: json!({ "error": e.to_string() }),
                error: Some(ForecastError::Storage(format!("failed to encode response: {e}"))),
            },
        }
    }

    fn failure<T: Serialize>(shape: &T, error: ForecastError) -> Self {
        let body = serde_json::to_value(shape).unwrap_or_else(|_| json!({ "error": error.to_string() }));
        Self {
            body,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Accepts `{expenses, user_id?, category?}` or a bare array of expenses.
pub fn train_payload(payload: &[u8], store: &dyn ModelStore) -> Reply {
    let started = Instant::now();
    match run_train(payload, store) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), "training failed");
            Reply::failure(
                &TrainingFailure::new(e.to_string(), started.elapsed().as_secs_f64()),
                e,
            )
        }
    }
}

fn run_train(payload: &[u8], store: &dyn ModelStore) -> Result<Reply, ForecastError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| ForecastError::data(format!("malformed request body: {e}")))?;
    let request = match value {
        Value::Array(_) => TrainRequest {
            expenses: decode(value)?,
            ..TrainRequest::default()
        },
        other => decode::<TrainRequest>(other)?,
    };

    let records = parse_records(&request.expenses)?;
    tracing::info!(
        records = records.len(),
        user_id = ?request.user_id,
        category = ?request.category,
        "training request"
    );
    let outcome = trainer::train(&records)?;

    let key = ModelKey::from_parts(request.user_id.as_ref(), request.category.as_deref());
    if let (Some(key), Some(artifact)) = (key, outcome.artifact.as_ref()) {
        store.save(&key, artifact)?;
    }

    Ok(Reply::success(&outcome.result))
}

/// Accepts `{recent_expenses, user_id?, category?}`. `params`, when given, supplies
/// `user_id`/`category` that take precedence over the payload's.
pub fn predict_payload(payload: &[u8], params: Option<&[u8]>, store: &dyn ModelStore) -> Reply {
    let started = Instant::now();
    match run_predict(payload, params, store) {
        Ok(reply) => reply,
        Err(e) => {
            tracing::error!(error = %e, kind = e.kind(), "prediction failed");
            Reply::failure(
                &PredictionFailure::new(e.to_string(), started.elapsed().as_secs_f64()),
                e,
            )
        }
    }
}

fn run_predict(
    payload: &[u8],
    params: Option<&[u8]>,
    store: &dyn ModelStore,
) -> Result<Reply, ForecastError> {
    let mut request: PredictRequest = parse_body(payload)?;
    if let Some(params) = params {
        let overrides: PredictRequest = parse_body(params)?;
        if overrides.user_id.is_some() {
            request.user_id = overrides.user_id;
        }
        if overrides.category.is_some() {
            request.category = overrides.category;
        }
    }

    let records = parse_records(&request.recent_expenses)?;
    let key = ModelKey::from_parts(request.user_id.as_ref(), request.category.as_deref());
    let result = predictor::predict(&records, key.as_ref(), request.reference_max(), store)?;
    Ok(Reply::success(&result))
}

/// `{status: "healthy", timestamp}` with a local ISO-8601 timestamp.
pub fn health() -> Value {
    json!({
        "status": "healthy",
        "timestamp": chrono::Local::now()
            .naive_local()
            .format("%Y-%m-%dT%H:%M:%S%.6f")
            .to_string(),
    })
}

fn parse_body<T: serde::de::DeserializeOwned>(payload: &[u8]) -> Result<T, ForecastError> {
    let value: Value = serde_json::from_slice(payload)
        .map_err(|e| ForecastError::data(format!("malformed request body: {e}")))?;
    decode(value)
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, ForecastError> {
    serde_json::from_value(value).map_err(|e| ForecastError::data(format!("invalid request: {e}")))
}
