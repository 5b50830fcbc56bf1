use crate::domain::json::{finite_or_null, finite_round, rounded_2};
use crate::time::period::ERROR_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    Average,
    AverageWithTrend,
    SimpleLinear,
    Linear,
    Ridge,
    GradientBoosting,
    RobustLinear,
    SavedModel,
    Statistical,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Average => "average",
            Self::AverageWithTrend => "average_with_trend",
            Self::SimpleLinear => "simple_linear",
            Self::Linear => "linear",
            Self::Ridge => "ridge",
            Self::GradientBoosting => "gradient_boosting",
            Self::RobustLinear => "robust_linear",
            Self::SavedModel => "saved_model",
            Self::Statistical => "statistical",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrainingMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mae_train: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mae_test: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmse_test: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r2: Option<f64>,
}

impl TrainingMetrics {
    /// Rounds the raw diagnostics and drops the ones that are undefined.
    pub fn new(mae_train: f64, mae_test: Option<f64>, rmse_test: Option<f64>, r2: f64) -> Self {
        Self {
            mae_train: finite_round(mae_train, 2),
            mae_test: mae_test.and_then(|v| finite_round(v, 2)),
            rmse_test: rmse_test.and_then(|v| finite_round(v, 2)),
            r2: finite_round(r2, 4),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingResult {
    #[serde(serialize_with = "rounded_2")]
    pub prediction: f64,
    #[serde(serialize_with = "rounded_2")]
    pub accuracy: f64,
    #[serde(serialize_with = "finite_or_null")]
    pub max_amount: f64,
    pub model_type: ModelType,
    pub next_month: String,
    pub features_used: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TrainingMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_scores: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(serialize_with = "rounded_2")]
    pub training_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    #[serde(serialize_with = "rounded_2")]
    pub prediction: f64,
    #[serde(serialize_with = "rounded_2")]
    pub confidence: f64,
    pub next_month: String,
    pub model_type: ModelType,
    pub features_used: Vec<String>,
    #[serde(serialize_with = "rounded_2")]
    pub prediction_time: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingFailure {
    pub prediction: f64,
    pub accuracy: f64,
    pub max_amount: f64,
    pub error: String,
    pub next_month: String,
    #[serde(serialize_with = "rounded_2")]
    pub training_time: f64,
}

impl TrainingFailure {
    pub const ACCURACY: f64 = 50.0;

    pub fn new(error: impl Into<String>, training_time: f64) -> Self {
        Self {
            prediction: 0.0,
            accuracy: Self::ACCURACY,
            max_amount: 0.0,
            error: error.into(),
            next_month: ERROR_LABEL.to_string(),
            training_time,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionFailure {
    pub prediction: f64,
    pub confidence: f64,
    pub error: String,
    pub next_month: String,
    #[serde(serialize_with = "rounded_2")]
    pub prediction_time: f64,
}

impl PredictionFailure {
    pub const CONFIDENCE: f64 = 50.0;

    pub fn new(error: impl Into<String>, prediction_time: f64) -> Self {
        Self {
            prediction: 0.0,
            confidence: Self::CONFIDENCE,
            error: error.into(),
            next_month: ERROR_LABEL.to_string(),
            prediction_time,
        }
    }
}
