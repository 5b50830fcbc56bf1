//! Regression scores over paired target and prediction slices.
//!
//! Mismatched lengths and empty inputs score NaN.

use smartcore::metrics;

fn paired(y_true: &[f64], y_pred: &[f64]) -> Option<(Vec<f64>, Vec<f64>)> {
    if y_true.is_empty() || y_true.len() != y_pred.len() {
        return None;
    }
    Some((y_true.to_vec(), y_pred.to_vec()))
}

pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
    paired(y_true, y_pred).map_or(f64::NAN, |(t, p)| {
        metrics::mean_absolute_error::<f64, _>(&t, &p)
    })
}

pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
    paired(y_true, y_pred).map_or(f64::NAN, |(t, p)| {
        metrics::mean_squared_error::<f64, _>(&t, &p).sqrt()
    })
}

/// Coefficient of determination. A constant target scores 1.0 when matched exactly
/// and 0.0 otherwise.
pub fn r2(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let Some((t, p)) = paired(y_true, y_pred) else {
        return f64::NAN;
    };
    if t.iter().all(|v| *v == t[0]) {
        return if t == p { 1.0 } else { 0.0 };
    }
    metrics::r2::<f64, _>(&t, &p)
}

/// `100 * (1 - MAE / mean(y))`, clamped to `[0, 100]`.
pub fn accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    if mean <= 0.0 || mean.is_nan() {
        return 0.0;
    }
    let score = 100.0 * (1.0 - mae(y_true, y_pred) / mean);
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regression_metrics() {
        let t = [1.0, 2.0, 3.0];
        let p = [1.0, 2.0, 5.0];
        assert!((mae(&t, &p) - 2.0 / 3.0).abs() < 1e-12);
        assert!((rmse(&t, &p) - (4.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((r2(&t, &p) - (1.0 - 4.0 / 2.0)).abs() < 1e-12);
        assert_eq!(r2(&t, &t), 1.0);
    }

    #[test]
    fn constant_target_conventions() {
        assert_eq!(r2(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r2(&[5.0, 5.0], &[4.0, 5.0]), 0.0);
    }

    #[test]
    fn mismatched_or_empty_inputs_are_nan() {
        assert!(mae(&[], &[]).is_nan());
        assert!(rmse(&[1.0, 2.0], &[1.0]).is_nan());
        assert!(r2(&[1.0], &[]).is_nan());
    }

    #[test]
    fn accuracy_is_bounded() {
        assert_eq!(accuracy(&[100.0, 100.0], &[100.0, 100.0]), 100.0);
        assert_eq!(accuracy(&[100.0], &[90.0]), 90.0);
        assert_eq!(accuracy(&[10.0], &[1000.0]), 0.0);
        assert_eq!(accuracy(&[0.0], &[1.0]), 0.0);
    }
}
