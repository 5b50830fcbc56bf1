use crate::error::ForecastError;
use serde::{Deserialize, Serialize};
use smartcore::api::{Transformer, UnsupervisedEstimator};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::preprocessing::numerical::{
    StandardScaler as ColumnScaler, StandardScalerParameters,
};

/// Per-column standardization fitted on the training split.
///
/// Columns that are constant on the training rows carry no signal and are dropped
/// before scaling, so they contribute zero regardless of the value seen later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    n_features: usize,
    active: Vec<usize>,
    inner: ColumnScaler<f64>,
}

impl StandardScaler {
    pub fn fit(x: &[Vec<f64>]) -> Result<Self, ForecastError> {
        let n_features = check_shape(x)?;
        let active: Vec<usize> = (0..n_features)
            .filter(|&j| x.iter().any(|row| row[j] != x[0][j]))
            .collect();

        if active.is_empty() {
            return Err(ForecastError::fit("every feature is constant"));
        }

        let matrix = to_matrix(&select_columns(x, &active))?;
        let inner = ColumnScaler::<f64>::fit(&matrix, StandardScalerParameters::default())
            .map_err(|e| ForecastError::fit(format!("scaler fit failed: {e}")))?;

        Ok(Self {
            n_features,
            active,
            inner,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Number of columns [`transform`](Self::transform) produces.
    pub fn n_active(&self) -> usize {
        self.active.len()
    }

    /// Standardized active columns, one row per input row.
    pub fn transform(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, ForecastError> {
        if let Some(row) = x.iter().find(|row| row.len() != self.n_features) {
            return Err(ForecastError::fit(format!(
                "expected {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        if x.is_empty() {
            return Ok(Vec::new());
        }

        let matrix = to_matrix(&select_columns(x, &self.active))?;
        let scaled = self
            .inner
            .transform(&matrix)
            .map_err(|e| ForecastError::fit(format!("scaler transform failed: {e}")))?;
        Ok(from_matrix(&scaled))
    }
}

fn select_columns(x: &[Vec<f64>], columns: &[usize]) -> Vec<Vec<f64>> {
    x.iter()
        .map(|row| columns.iter().map(|&j| row[j]).collect())
        .collect()
}

/// Number of columns of a non-empty rectangular matrix.
pub(crate) fn check_shape(x: &[Vec<f64>]) -> Result<usize, ForecastError> {
    let width = x
        .first()
        .map(Vec::len)
        .ok_or_else(|| ForecastError::fit("empty feature matrix"))?;
    if width == 0 {
        return Err(ForecastError::fit("feature matrix has no columns"));
    }
    if x.iter().any(|row| row.len() != width) {
        return Err(ForecastError::fit("ragged feature matrix"));
    }
    if x.iter().flatten().any(|v| !v.is_finite()) {
        return Err(ForecastError::fit("feature matrix contains non-finite values"));
    }
    Ok(width)
}

pub(crate) fn to_matrix(x: &[Vec<f64>]) -> Result<DenseMatrix<f64>, ForecastError> {
    DenseMatrix::from_2d_vec(&x.to_vec())
        .map_err(|e| ForecastError::fit(format!("failed to create feature matrix: {e}")))
}

pub(crate) fn from_matrix(m: &DenseMatrix<f64>) -> Vec<Vec<f64>> {
    let (rows, cols) = m.shape();
    (0..rows)
        .map(|i| (0..cols).map(|j| *m.get((i, j))).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_columns_and_drops_constant_ones() {
        let x = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let scaler = StandardScaler::fit(&x).unwrap();
        assert_eq!(scaler.n_features(), 2);
        assert_eq!(scaler.n_active(), 1);
        let z = scaler.transform(&x).unwrap();
        assert!((z[0][0] + 1.0).abs() < 1e-12);
        assert!((z[1][0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unseen_value_in_a_constant_column_stays_finite() {
        let x = vec![vec![1.0, 5.0], vec![3.0, 5.0], vec![2.0, 5.0]];
        let scaler = StandardScaler::fit(&x).unwrap();
        let z = scaler.transform(&[vec![2.0, 900.0]]).unwrap();
        assert_eq!(z[0].len(), 1);
        assert!(z[0][0].is_finite());
    }

    #[test]
    fn all_constant_input_is_rejected() {
        let x = vec![vec![4.0, 1.0], vec![4.0, 1.0]];
        assert!(StandardScaler::fit(&x).is_err());
    }

    #[test]
    fn rejects_width_mismatch() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0], vec![2.0, 3.0]]).unwrap();
        assert!(scaler.transform(&[vec![1.0]]).is_err());
        assert!(StandardScaler::fit(&[]).is_err());
    }
}
