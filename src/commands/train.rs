use anyhow::{bail, Context, Result};
use ndarray::Axis;
use polars::prelude::Column;

use crate::cli::{Cli, TrainArgs};
use crate::common::data::{read_parquet, write_parquet};
use crate::features::{FEATURE_COLUMNS, LABEL_COLUMN};
use crate::io::{commit_artifact, open_artifact};
use crate::model::{design_matrix, evaluate, train_test_split, LogisticModel};

use super::{load_config, FEATURES_ARTIFACT, METRICS_ARTIFACT, PREDICTIONS_ARTIFACT};

pub fn run(cli: &Cli, args: &TrainArgs) -> Result<()> {
    let config = load_config(cli)?;

    let features = read_parquet(&args.out_dir.join(FEATURES_ARTIFACT))
        .context("feature artifact missing; run `features` first")?;
    if features.height() == 0 {
        bail!("feature table is empty; nothing to train on");
    }

    let (x, y) = design_matrix(&features, FEATURE_COLUMNS, LABEL_COLUMN)?;
    let (train_idx, test_idx) = train_test_split(
        features.height(),
        config.classifier.test_fraction,
        config.classifier.seed,
    );
    if cli.verbose > 0 {
        eprintln!("[train] rows={} train={} test={}", features.height(), train_idx.len(), test_idx.len());
    }

    let x_train = x.select(Axis(0), &train_idx);
    let y_train = y.select(Axis(0), &train_idx);
    let model = LogisticModel::fit(&x_train, &y_train, &config.classifier);

    // Probabilities for every feature row feed the equity scorer; the
    // evaluation uses only the held-out rows.
    let probabilities = model.predict_proba(&x);
    let test_probs = probabilities.select(Axis(0), &test_idx);
    let y_test = y.select(Axis(0), &test_idx);
    let report = evaluate(&test_probs, &y_test, 0.5, train_idx.len());

    let mut predictions = features.select(["station", "year", "month"])?;
    predictions.with_column(Column::new("probability".into(), probabilities.to_vec()))?;
    write_parquet(&predictions, &args.out_dir.join(PREDICTIONS_ARTIFACT), args.force)?;

    let metrics_path = args.out_dir.join(METRICS_ARTIFACT);
    let mut pending = open_artifact(&metrics_path, args.force)?;
    serde_json::to_writer_pretty(&mut pending, &report)?;
    commit_artifact(pending)?;

    println!(
        "Trained on {} rows; accuracy={:.3} precision={:.3} recall={:.3} -> {}",
        report.train_rows,
        report.accuracy,
        report.precision,
        report.recall,
        metrics_path.display()
    );
    Ok(())
}
