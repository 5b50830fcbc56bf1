use crate::error::ForecastError;
use crate::model::scaler::{check_shape, from_matrix, to_matrix};
use smartcore::model_selection::train_test_split;

pub const HOLDOUT_FRACTION: f64 = 0.2;
pub const HOLDOUT_SEED: u64 = 42;

/// Training and held-out rows of one dataset.
#[derive(Debug, Clone)]
pub struct Holdout {
    pub x_train: Vec<Vec<f64>>,
    pub y_train: Vec<f64>,
    pub x_test: Vec<Vec<f64>>,
    pub y_test: Vec<f64>,
}

/// Number of held-out rows for `n` samples: `ceil(fraction * n)`, leaving at least one
/// training row.
pub fn test_rows(n: usize, fraction: f64) -> usize {
    ((fraction * n as f64).ceil() as usize).min(n.saturating_sub(1))
}

/// Reproducible shuffled split with [`test_rows`] rows held out.
pub fn holdout(
    x: &[Vec<f64>],
    y: &[f64],
    fraction: f64,
    seed: u64,
) -> Result<Holdout, ForecastError> {
    check_shape(x)?;
    if x.len() != y.len() {
        return Err(ForecastError::fit(format!(
            "feature rows ({}) and targets ({}) differ",
            x.len(),
            y.len()
        )));
    }
    let n = x.len();
    let n_test = test_rows(n, fraction);
    if n_test == 0 {
        return Err(ForecastError::fit(format!("cannot hold out rows from {n} samples")));
    }

    // train_test_split floors n * test_size; aim half a row above the wanted count.
    let test_size = (n_test as f32 + 0.5) / n as f32;
    let matrix = to_matrix(x)?;
    let (x_train, x_test, y_train, y_test) =
        train_test_split(&matrix, &y.to_vec(), test_size, true, Some(seed));

    Ok(Holdout {
        x_train: from_matrix(&x_train),
        y_train,
        x_test: from_matrix(&x_test),
        y_test,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x = (0..n).map(|i| vec![i as f64, (i * 2) as f64]).collect();
        let y = (0..n).map(|i| i as f64).collect();
        (x, y)
    }

    #[test]
    fn test_side_gets_the_rounded_up_fifth() {
        assert_eq!(test_rows(5, HOLDOUT_FRACTION), 1);
        assert_eq!(test_rows(9, HOLDOUT_FRACTION), 2);
        assert_eq!(test_rows(10, HOLDOUT_FRACTION), 2);
        assert_eq!(test_rows(11, HOLDOUT_FRACTION), 3);
        assert_eq!(test_rows(1, HOLDOUT_FRACTION), 0);
    }

    #[test]
    fn split_sizes_and_disjointness() {
        for n in [5, 9, 13, 24] {
            let (x, y) = data(n);
            let split = holdout(&x, &y, HOLDOUT_FRACTION, HOLDOUT_SEED).unwrap();
            assert_eq!(split.y_test.len(), test_rows(n, HOLDOUT_FRACTION), "n = {n}");
            assert_eq!(split.x_train.len(), split.y_train.len());
            assert_eq!(split.x_test.len(), split.y_test.len());

            let mut all: Vec<f64> = split.y_train.iter().chain(&split.y_test).copied().collect();
            all.sort_by(f64::total_cmp);
            assert_eq!(all, y);
            for (row, target) in split.x_train.iter().zip(&split.y_train) {
                assert_eq!(row[0], *target);
            }
        }
    }

    #[test]
    fn split_is_reproducible() {
        let (x, y) = data(20);
        let a = holdout(&x, &y, HOLDOUT_FRACTION, HOLDOUT_SEED).unwrap();
        let b = holdout(&x, &y, HOLDOUT_FRACTION, HOLDOUT_SEED).unwrap();
        assert_eq!(a.y_test, b.y_test);
        assert_eq!(a.y_train, b.y_train);
    }

    #[test]
    fn single_row_cannot_be_split() {
        let (x, y) = data(1);
        assert!(holdout(&x, &y, HOLDOUT_FRACTION, HOLDOUT_SEED).is_err());
    }
}
