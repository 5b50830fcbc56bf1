pub mod gbm;
pub mod linear;
pub mod metrics;
pub mod scaler;
pub mod split;

use crate::error::ForecastError;
use crate::features::FEATURE_NAMES;
use chrono::{DateTime, Utc};
use gbm::{BoostingParams, GradientBoostedTrees};
use linear::LinearModel;
use scaler::StandardScaler;
use serde::{Deserialize, Serialize};

pub const RIDGE_ALPHA: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressorKind {
    Linear,
    Ridge,
    GradientBoosting,
}

impl RegressorKind {
    /// Candidates compared on held-out data, in tie-breaking order.
    pub const CANDIDATES: [RegressorKind; 3] = [Self::Linear, Self::Ridge, Self::GradientBoosting];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Ridge => "ridge",
            Self::GradientBoosting => "gradient_boosting",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Regressor {
    Linear(LinearModel),
    Ridge(LinearModel),
    GradientBoosting(GradientBoostedTrees),
}

impl Regressor {
    fn fit(kind: RegressorKind, x: &[Vec<f64>], y: &[f64]) -> Result<Self, ForecastError> {
        Ok(match kind {
            RegressorKind::Linear => Self::Linear(LinearModel::fit_ols(x, y)?),
            RegressorKind::Ridge => Self::Ridge(LinearModel::fit_ridge(x, y, RIDGE_ALPHA)?),
            RegressorKind::GradientBoosting => Self::GradientBoosting(GradientBoostedTrees::fit(
                x,
                y,
                BoostingParams::default(),
            )?),
        })
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        match self {
            Self::Linear(m) | Self::Ridge(m) => m.predict(x),
            Self::GradientBoosting(m) => m.predict(x),
        }
    }
}

/// Standardization followed by a regressor.
#[derive(Debug, Serialize, Deserialize)]
pub struct Pipeline {
    scaler: StandardScaler,
    regressor: Regressor,
}

impl Pipeline {
    pub fn fit(kind: RegressorKind, x: &[Vec<f64>], y: &[f64]) -> Result<Self, ForecastError> {
        let scaler = StandardScaler::fit(x)?;
        let scaled = scaler.transform(x)?;
        let regressor = Regressor::fit(kind, &scaled, y)?;
        Ok(Self { scaler, regressor })
    }

    pub fn n_features(&self) -> usize {
        self.scaler.n_features()
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        let scaled = self.scaler.transform(x)?;
        self.regressor.predict(&scaled)
    }

    pub fn predict_one(&self, row: Vec<f64>) -> Result<f64, ForecastError> {
        self.predict(&[row])?
            .first()
            .copied()
            .ok_or_else(|| ForecastError::fit("no prediction returned"))
    }

    /// Held-out R².
    pub fn score(&self, x: &[Vec<f64>], y: &[f64]) -> Result<f64, ForecastError> {
        let pred = self.predict(x)?;
        Ok(metrics::r2(y, &pred))
    }
}

/// What the registry persists for a (user, category): the fitted pipeline together
/// with the exact feature list it was trained on.
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model_name: String,
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub pipeline: Pipeline,
}

impl ModelArtifact {
    pub fn new(model_name: impl Into<String>, feature_names: Vec<String>, pipeline: Pipeline) -> Self {
        Self {
            model_name: model_name.into(),
            feature_names,
            trained_at: Utc::now(),
            pipeline,
        }
    }

    /// Feature list the pipeline expects. Artifacts without a usable list fall back to
    /// the full canonical feature set.
    pub fn feature_schema(&self) -> Vec<String> {
        if !self.feature_names.is_empty() && self.feature_names.len() == self.pipeline.n_features() {
            return self.feature_names.clone();
        }
        tracing::warn!(
            model = %self.model_name,
            stored = self.feature_names.len(),
            expected = self.pipeline.n_features(),
            "model feature list unrecoverable; assuming canonical feature set"
        );
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }
}
