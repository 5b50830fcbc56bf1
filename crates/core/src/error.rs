use std::fmt;

/// Failure categories of the forecasting pipeline.
///
/// `ModelLoad` and `PredictionRange` are recoverable: the predictor downgrades to the
/// statistical estimator and the bounds guard replaces out-of-range values. The rest
/// end the request with the sentinel error shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ForecastError {
    Data(String),
    ModelLoad { path: String, detail: String },
    ModelFit(String),
    PredictionRange { value: f64, upper: f64 },
    Storage(String),
}

impl ForecastError {
    pub fn data(detail: impl Into<String>) -> Self {
        Self::Data(detail.into())
    }

    pub fn fit(detail: impl Into<String>) -> Self {
        Self::ModelFit(detail.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Data(_) => "data",
            Self::ModelLoad { .. } => "model_load",
            Self::ModelFit(_) => "model_fit",
            Self::PredictionRange { .. } => "prediction_range",
            Self::Storage(_) => "storage",
        }
    }
}

impl fmt::Display for ForecastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data(detail) => write!(f, "invalid expense data: {detail}"),
            Self::ModelLoad { path, detail } => {
                write!(f, "failed to load model from {path}: {detail}")
            }
            Self::ModelFit(detail) => write!(f, "model fitting failed: {detail}"),
            Self::PredictionRange { value, upper } => {
                write!(f, "prediction {value} outside of [0, {upper}]")
            }
            Self::Storage(detail) => write!(f, "model storage failed: {detail}"),
        }
    }
}

impl std::error::Error for ForecastError {}
