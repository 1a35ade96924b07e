use ndarray::{Array1, Array2, Axis};

use crate::config::ClassifierConfig;

/// Logistic regression fit by full-batch gradient descent on a standardized
/// design matrix. Deterministic: no stochastic steps, so refitting on the
/// same rows reproduces the same model.
#[derive(Debug, Clone)]
pub struct LogisticModel {
    weights: Array1<f64>,
    bias: f64,
    means: Array1<f64>,
    stds: Array1<f64>,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn standardize(x: &Array2<f64>, means: &Array1<f64>, stds: &Array1<f64>) -> Array2<f64> {
    let mut out = x.to_owned();
    for (j, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
        column.mapv_inplace(|value| (value - means[j]) / stds[j]);
    }
    out
}

impl LogisticModel {
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, config: &ClassifierConfig) -> Self {
        let means = x
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(x.ncols()));
        let mut stds = x.std_axis(Axis(0), 0.0);
        // Constant columns carry no signal; unit std keeps them harmless.
        stds.mapv_inplace(|s| if s > 0.0 { s } else { 1.0 });

        let standardized = standardize(x, &means, &stds);
        let rows = x.nrows().max(1) as f64;

        let mut weights: Array1<f64> = Array1::zeros(x.ncols());
        let mut bias = 0.0;
        for _ in 0..config.epochs {
            let z = standardized.dot(&weights) + bias;
            let predictions = z.mapv(sigmoid);
            let errors = &predictions - y;

            let grad_weights = standardized.t().dot(&errors) / rows;
            let grad_bias = errors.sum() / rows;

            weights.scaled_add(-config.learning_rate, &grad_weights);
            bias -= config.learning_rate * grad_bias;
        }

        Self { weights, bias, means, stds }
    }

    /// Probability of a significant delay for each row.
    pub fn predict_proba(&self, x: &Array2<f64>) -> Array1<f64> {
        let standardized = standardize(x, &self.means, &self.stds);
        (standardized.dot(&self.weights) + self.bias).mapv(sigmoid)
    }
}
