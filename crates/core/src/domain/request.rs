use crate::domain::expense::{RawExpense, UserId};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrainRequest {
    #[serde(default)]
    pub expenses: Vec<RawExpense>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PredictRequest {
    #[serde(default)]
    pub recent_expenses: Vec<RawExpense>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub model: Option<ModelHint>,
}

impl PredictRequest {
    /// Upper reference amount supplied by the caller, if it is usable.
    pub fn reference_max(&self) -> Option<f64> {
        self.model
            .as_ref()
            .and_then(|m| m.max_amount)
            .filter(|v| v.is_finite() && *v >= 0.0)
    }
}

/// Details a caller may carry over from an earlier training run, such as the
/// `max_amount` it reported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModelHint {
    #[serde(default)]
    pub max_amount: Option<f64>,
}
