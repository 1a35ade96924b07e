use anyhow::{Context, Result};
use polars::{
    frame::DataFrame,
    prelude::{col, Column, DataFrameJoinOps, IntoLazy},
};

use crate::cli::{Cli, ScoreArgs};
use crate::common::data::{read_parquet, write_csv};
use crate::equity::{score_stations, vulnerability_index, StationAssessment};

use super::{load_config, EQUITY_ARTIFACT, FEATURES_ARTIFACT, PREDICTIONS_ARTIFACT, STATIONS_ARTIFACT};

pub fn run(cli: &Cli, args: &ScoreArgs) -> Result<()> {
    let config = load_config(cli)?;

    let features = read_parquet(&args.out_dir.join(FEATURES_ARTIFACT))
        .context("feature artifact missing; run `features` first")?;
    let predictions = read_parquet(&args.out_dir.join(PREDICTIONS_ARTIFACT))
        .context("prediction artifact missing; run `train` first")?;
    let stations = read_parquet(&args.out_dir.join(STATIONS_ARTIFACT))
        .context("station artifact missing; run `extract` first")?;

    let risk = predictions
        .lazy()
        .group_by([col("station")])
        .agg([col("probability").mean().alias("delay_risk")])
        .collect()?;

    // Demographic columns are constant per station after imputation, so the
    // mean just collapses the per-period rows.
    let usage = features
        .lazy()
        .group_by([col("station")])
        .agg([
            col("entries_total").sum().alias("ridership_total"),
            col("median_income").mean().alias("median_income"),
            col("minority_share").mean().alias("minority_share"),
            col("transit_dependency").mean().alias("transit_dependency"),
        ])
        .collect()?;

    let joined = usage
        .inner_join(&risk, ["station"], ["station"])?
        .left_join(&stations.select(["station", "borough"])?, ["station"], ["station"])?;

    let names = joined.column("station")?.str()?.clone();
    let boroughs = joined.column("borough")?.str()?.clone();
    let risks = joined.column("delay_risk")?.f64()?.clone();
    let ridership = joined.column("ridership_total")?.f64()?.clone();
    let incomes = joined.column("median_income")?.f64()?.clone();
    let minority = joined.column("minority_share")?.f64()?.clone();
    let dependency = joined.column("transit_dependency")?.f64()?.clone();

    let max_income = incomes.into_no_null_iter().fold(0.0f64, f64::max);

    let mut assessments: Vec<StationAssessment> = Vec::with_capacity(joined.height());
    for i in 0..joined.height() {
        let Some(station) = names.get(i) else { continue };
        let income = incomes.get(i).unwrap_or(0.0);
        let income_deprivation =
            if max_income > 0.0 { (1.0 - income / max_income).clamp(0.0, 1.0) } else { 0.0 };
        let vulnerability = vulnerability_index(
            income_deprivation,
            minority.get(i).unwrap_or(0.0).clamp(0.0, 1.0),
            dependency.get(i).unwrap_or(0.0).clamp(0.0, 1.0),
            &config.vulnerability_weights,
        );
        assessments.push(StationAssessment {
            station: station.to_string(),
            borough: boroughs.get(i).unwrap_or("Unknown").to_string(),
            delay_risk: risks.get(i).unwrap_or(0.0).clamp(0.0, 1.0),
            ridership: ridership.get(i).unwrap_or(0.0),
            vulnerability,
        });
    }

    let scores = score_stations(&assessments, &config.score_weights, config.priority_quantile);
    let high_priority = scores.iter().filter(|score| score.high_priority).count();

    let df = DataFrame::new(vec![
        Column::new("station".into(), scores.iter().map(|s| s.station.clone()).collect::<Vec<_>>()),
        Column::new("borough".into(), scores.iter().map(|s| s.borough.clone()).collect::<Vec<_>>()),
        Column::new("delay_risk".into(), scores.iter().map(|s| s.delay_risk).collect::<Vec<_>>()),
        Column::new("ridership_score".into(), scores.iter().map(|s| s.ridership_score).collect::<Vec<_>>()),
        Column::new("vulnerability".into(), scores.iter().map(|s| s.vulnerability).collect::<Vec<_>>()),
        Column::new("composite".into(), scores.iter().map(|s| s.composite).collect::<Vec<_>>()),
        Column::new("rank".into(), scores.iter().map(|s| s.rank).collect::<Vec<_>>()),
        Column::new("high_priority".into(), scores.iter().map(|s| s.high_priority).collect::<Vec<_>>()),
    ])?;

    let out_path = args.out_dir.join(EQUITY_ARTIFACT);
    write_csv(&df, &out_path, args.force)?;

    println!(
        "Ranked {} stations ({} high priority) -> {}",
        scores.len(),
        high_priority,
        out_path.display()
    );
    Ok(())
}
