//! Least-squares gradient boosting over smartcore regression trees.

use crate::error::ForecastError;
use crate::model::scaler::{check_shape, to_matrix};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_regressor::{
    DecisionTreeRegressor, DecisionTreeRegressorParameters,
};
use std::fmt;

type Tree = DecisionTreeRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: u16,
    pub learning_rate: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 50,
            max_depth: 3,
            learning_rate: 0.1,
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoostingParams,
    init: f64,
    trees: Vec<Tree>,
}

impl fmt::Debug for GradientBoostedTrees {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradientBoostedTrees")
            .field("params", &self.params)
            .field("init", &self.init)
            .field("trees", &self.trees.len())
            .finish()
    }
}

impl GradientBoostedTrees {
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: BoostingParams) -> Result<Self, ForecastError> {
        check_shape(x)?;
        if x.len() != y.len() {
            return Err(ForecastError::fit(format!(
                "feature rows ({}) and targets ({}) differ",
                x.len(),
                y.len()
            )));
        }

        let matrix = to_matrix(x)?;
        let init = y.iter().sum::<f64>() / y.len() as f64;
        let mut fitted = vec![init; y.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        for _ in 0..params.n_estimators {
            let residuals: Vec<f64> = y.iter().zip(&fitted).map(|(t, f)| t - f).collect();
            let tree = Tree::fit(
                &matrix,
                &residuals,
                DecisionTreeRegressorParameters::default().with_max_depth(params.max_depth),
            )
            .map_err(|e| ForecastError::fit(format!("boosting stage failed: {e}")))?;
            let step = tree
                .predict(&matrix)
                .map_err(|e| ForecastError::fit(format!("boosting stage failed: {e}")))?;
            for (f, s) in fitted.iter_mut().zip(step) {
                *f += params.learning_rate * s;
            }
            trees.push(tree);
        }

        tracing::debug!(
            n_trees = trees.len(),
            max_depth = params.max_depth,
            "fitted gradient boosted trees"
        );

        Ok(Self {
            params,
            init,
            trees,
        })
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        check_shape(x)?;
        let matrix = to_matrix(x)?;
        let mut out = vec![self.init; x.len()];
        for tree in &self.trees {
            let step = tree
                .predict(&matrix)
                .map_err(|e| ForecastError::fit(format!("tree prediction failed: {e}")))?;
            for (o, s) in out.iter_mut().zip(step) {
                *o += self.params.learning_rate * s;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boosting_fits_a_step_function() {
        let x: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..20).map(|i| if i < 10 { 10.0 } else { 50.0 }).collect();
        let model = GradientBoostedTrees::fit(&x, &y, BoostingParams::default()).unwrap();
        let pred = model.predict(&[vec![2.0], vec![17.0]]).unwrap();
        assert!((pred[0] - 10.0).abs() < 1.0);
        assert!((pred[1] - 50.0).abs() < 1.0);
    }

    #[test]
    fn survives_serde_round_trip() {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, (i % 2) as f64]).collect();
        let y: Vec<f64> = (0..8).map(|i| i as f64 * 3.0).collect();
        let params = BoostingParams {
            n_estimators: 5,
            ..BoostingParams::default()
        };
        let model = GradientBoostedTrees::fit(&x, &y, params).unwrap();
        let json = serde_json::to_string(&model).unwrap();
        let restored: GradientBoostedTrees = serde_json::from_str(&json).unwrap();
        let before = model.predict(&x).unwrap();
        let after = restored.predict(&x).unwrap();
        for (a, b) in before.iter().zip(&after) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}
