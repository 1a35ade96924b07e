use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Held-out evaluation of the delay classifier, persisted as JSON for the
/// downstream figure-generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub true_positives: u64,
    pub false_positives: u64,
    pub true_negatives: u64,
    pub false_negatives: u64,
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Confusion counts and derived rates at the given probability threshold.
/// Degenerate denominators (no predicted or actual positives) report 0.
pub fn evaluate(
    probabilities: &Array1<f64>,
    labels: &Array1<f64>,
    threshold: f64,
    train_rows: usize,
) -> EvalReport {
    let mut tp = 0u64;
    let mut fp = 0u64;
    let mut tn = 0u64;
    let mut fn_ = 0u64;
    for (p, actual) in probabilities.iter().zip(labels.iter()) {
        let predicted = *p >= threshold;
        let positive = *actual >= 0.5;
        match (predicted, positive) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fn_ += 1,
        }
    }

    let total = tp + fp + tn + fn_;
    let ratio = |num: u64, den: u64| if den > 0 { num as f64 / den as f64 } else { 0.0 };

    EvalReport {
        train_rows,
        test_rows: total as usize,
        true_positives: tp,
        false_positives: fp,
        true_negatives: tn,
        false_negatives: fn_,
        accuracy: ratio(tp + tn, total),
        precision: ratio(tp, tp + fp),
        recall: ratio(tp, tp + fn_),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn known_confusion_counts() {
        let probs = array![0.9, 0.8, 0.2, 0.6, 0.1];
        let labels = array![1.0, 0.0, 1.0, 1.0, 0.0];
        let report = evaluate(&probs, &labels, 0.5, 10);

        assert_eq!(report.true_positives, 2);
        assert_eq!(report.false_positives, 1);
        assert_eq!(report.false_negatives, 1);
        assert_eq!(report.true_negatives, 1);
        assert_eq!(report.test_rows, 5);
        assert_eq!(report.train_rows, 10);
        assert!((report.accuracy - 0.6).abs() < 1e-12);
        assert!((report.precision - 2.0 / 3.0).abs() < 1e-12);
        assert!((report.recall - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_reports_zero_rates() {
        let probs: Array1<f64> = array![];
        let labels: Array1<f64> = array![];
        let report = evaluate(&probs, &labels, 0.5, 0);
        assert_eq!(report.accuracy, 0.0);
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
    }
}
