mod logistic;
mod metrics;

pub use logistic::LogisticModel;
pub use metrics::{evaluate, EvalReport};

use anyhow::Result;
use ndarray::{Array1, Array2};
use polars::frame::DataFrame;
use polars::prelude::DataType;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Deterministic shuffled index split: same seed, same split.
pub fn train_test_split(rows: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let mut test_rows = ((rows as f64) * test_fraction).round() as usize;
    if rows > 1 {
        test_rows = test_rows.clamp(1, rows - 1);
    } else {
        test_rows = 0;
    }

    let (test, train) = indices.split_at(test_rows);
    (train.to_vec(), test.to_vec())
}

/// Extract the design matrix and label vector from the feature table.
/// Columns are cast to f64; residual nulls (none after imputation) read as 0.
pub fn design_matrix(
    df: &DataFrame,
    feature_cols: &[&str],
    label_col: &str,
) -> Result<(Array2<f64>, Array1<f64>)> {
    let rows = df.height();
    let mut x = Array2::zeros((rows, feature_cols.len()));
    for (j, name) in feature_cols.iter().enumerate() {
        let column = df.column(name)?.cast(&DataType::Float64)?;
        let values = column.f64()?;
        for (i, value) in values.into_iter().enumerate() {
            x[[i, j]] = value.unwrap_or(0.0);
        }
    }

    let label = df.column(label_col)?.cast(&DataType::Float64)?;
    let y: Vec<f64> = label.f64()?.into_iter().map(|value| value.unwrap_or(0.0)).collect();
    Ok((x, Array1::from_vec(y)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_is_deterministic_for_a_seed() {
        let (train_a, test_a) = train_test_split(100, 0.25, 42);
        let (train_b, test_b) = train_test_split(100, 0.25, 42);
        assert_eq!(train_a, train_b);
        assert_eq!(test_a, test_b);
        assert_eq!(test_a.len(), 25);
        assert_eq!(train_a.len(), 75);
    }

    #[test]
    fn split_partitions_all_rows() {
        let (train, test) = train_test_split(10, 0.3, 7);
        let mut all: Vec<usize> = train.iter().chain(test.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn tiny_inputs_keep_at_least_one_training_row() {
        let (train, test) = train_test_split(2, 0.9, 1);
        assert_eq!(train.len(), 1);
        assert_eq!(test.len(), 1);

        let (train, test) = train_test_split(1, 0.5, 1);
        assert_eq!(train.len(), 1);
        assert!(test.is_empty());
    }
}
