use crate::error::ForecastError;
use crate::model::scaler::{check_shape, to_matrix};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::linear_regression::{
    LinearRegression, LinearRegressionParameters, LinearRegressionSolverName,
};
use smartcore::linear::ridge_regression::{
    RidgeRegression, RidgeRegressionParameters, RidgeRegressionSolverName,
};

type Ols = LinearRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;
type Ridge = RidgeRegression<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "solver", rename_all = "snake_case")]
enum Solver {
    Svd(Ols),
    Ridge(Ridge),
}

/// Linear model fitted on centered data.
///
/// smartcore's SVD solver needs more rows than columns and its ridge solver rejects
/// square designs, so short training sets are padded with zero rows. On centered data
/// those rows leave both the least-squares and the penalized solution unchanged, and
/// SVD resolves collinear columns to the minimum-norm solution.
#[derive(Debug, Serialize, Deserialize)]
pub struct LinearModel {
    x_means: Vec<f64>,
    y_mean: f64,
    solver: Solver,
}

impl LinearModel {
    pub fn fit_ols(x: &[Vec<f64>], y: &[f64]) -> Result<Self, ForecastError> {
        let (x_means, y_mean, xc, yc) = center(x, y)?;
        let parameters =
            LinearRegressionParameters::default().with_solver(LinearRegressionSolverName::SVD);
        let fitted = Ols::fit(&xc, &yc, parameters)
            .map_err(|e| ForecastError::fit(format!("linear regression failed: {e}")))?;
        Ok(Self {
            x_means,
            y_mean,
            solver: Solver::Svd(fitted),
        })
    }

    pub fn fit_ridge(x: &[Vec<f64>], y: &[f64], alpha: f64) -> Result<Self, ForecastError> {
        if alpha <= 0.0 || !alpha.is_finite() {
            return Err(ForecastError::fit(format!("ridge alpha must be positive (got {alpha})")));
        }
        let (x_means, y_mean, xc, yc) = center(x, y)?;
        let parameters = RidgeRegressionParameters::default()
            .with_alpha(alpha)
            .with_solver(RidgeRegressionSolverName::Cholesky)
            .with_normalize(false);
        let fitted = Ridge::fit(&xc, &yc, parameters)
            .map_err(|e| ForecastError::fit(format!("ridge regression failed: {e}")))?;
        Ok(Self {
            x_means,
            y_mean,
            solver: Solver::Ridge(fitted),
        })
    }

    pub fn n_features(&self) -> usize {
        self.x_means.len()
    }

    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ForecastError> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(row) = x.iter().find(|row| row.len() != self.x_means.len()) {
            return Err(ForecastError::fit(format!(
                "expected {} features, got {}",
                self.x_means.len(),
                row.len()
            )));
        }

        let centered: Vec<Vec<f64>> = x
            .iter()
            .map(|row| row.iter().zip(&self.x_means).map(|(v, m)| v - m).collect())
            .collect();
        let matrix = to_matrix(&centered)?;
        let offsets = match &self.solver {
            Solver::Svd(m) => m.predict(&matrix),
            Solver::Ridge(m) => m.predict(&matrix),
        }
        .map_err(|e| ForecastError::fit(format!("linear prediction failed: {e}")))?;

        Ok(offsets.into_iter().map(|v| v + self.y_mean).collect())
    }
}

/// Column means, target mean, and the centered design padded to at least `p + 1` rows.
fn center(
    x: &[Vec<f64>],
    y: &[f64],
) -> Result<(Vec<f64>, f64, DenseMatrix<f64>, Vec<f64>), ForecastError> {
    let p = check_shape(x)?;
    if x.len() != y.len() {
        return Err(ForecastError::fit(format!(
            "feature rows ({}) and targets ({}) differ",
            x.len(),
            y.len()
        )));
    }
    if y.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::fit("targets contain non-finite values"));
    }

    let n = x.len() as f64;
    let x_means: Vec<f64> = (0..p)
        .map(|j| x.iter().map(|row| row[j]).sum::<f64>() / n)
        .collect();
    let y_mean = y.iter().sum::<f64>() / n;

    let mut rows: Vec<Vec<f64>> = x
        .iter()
        .map(|row| row.iter().zip(&x_means).map(|(v, m)| v - m).collect())
        .collect();
    let mut targets: Vec<f64> = y.iter().map(|v| v - y_mean).collect();
    while rows.len() < p + 1 {
        rows.push(vec![0.0; p]);
        targets.push(0.0);
    }

    Ok((x_means, y_mean, to_matrix(&rows)?, targets))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ols_recovers_exact_line() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..6).map(|i| 3.0 + 2.0 * i as f64).collect();
        let model = LinearModel::fit_ols(&x, &y).unwrap();
        let pred = model.predict(&[vec![10.0]]).unwrap();
        assert!((pred[0] - 23.0).abs() < 1e-9);
        let fitted = model.predict(&x).unwrap();
        for (f, t) in fitted.iter().zip(&y) {
            assert!((f - t).abs() < 1e-9);
        }
    }

    #[test]
    fn ols_interpolates_when_columns_outnumber_rows() {
        // Three rows, four columns, one of them constant.
        let x = vec![
            vec![1.0, 0.0, 4.0, 2.0],
            vec![2.0, 1.0, 4.0, 7.0],
            vec![3.0, 0.0, 4.0, 1.0],
        ];
        let y = vec![10.0, 20.0, 30.0];
        let model = LinearModel::fit_ols(&x, &y).unwrap();
        assert_eq!(model.n_features(), 4);
        let fitted = model.predict(&x).unwrap();
        for (f, t) in fitted.iter().zip(&y) {
            assert!((f - t).abs() < 1e-6, "{f} vs {t}");
        }
    }

    #[test]
    fn ridge_fits_square_designs() {
        let x = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        let y = vec![3.0, 5.0];
        let model = LinearModel::fit_ridge(&x, &y, 1.0).unwrap();
        let fitted = model.predict(&x).unwrap();
        assert!(fitted[0] < fitted[1]);
        assert!(fitted.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn ridge_shrinks_towards_the_mean() {
        let x: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..5).map(|i| 10.0 * i as f64).collect();
        let ols = LinearModel::fit_ols(&x, &y).unwrap();
        let ridge = LinearModel::fit_ridge(&x, &y, 10.0).unwrap();
        let far = vec![vec![8.0]];
        assert!(ridge.predict(&far).unwrap()[0] < ols.predict(&far).unwrap()[0]);
        assert!(LinearModel::fit_ridge(&x, &y, 0.0).is_err());
    }

    #[test]
    fn survives_serde_round_trip() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, (i * i) as f64]).collect();
        let y: Vec<f64> = (0..6).map(|i| 1.0 + i as f64).collect();
        for model in [
            LinearModel::fit_ols(&x, &y).unwrap(),
            LinearModel::fit_ridge(&x, &y, 1.0).unwrap(),
        ] {
            let json = serde_json::to_string(&model).unwrap();
            let restored: LinearModel = serde_json::from_str(&json).unwrap();
            let before = model.predict(&[vec![7.0, 49.0]]).unwrap()[0];
            let after = restored.predict(&[vec![7.0, 49.0]]).unwrap()[0];
            assert!((before - after).abs() < 1e-9);
        }
    }
}
