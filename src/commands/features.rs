use anyhow::{Context, Result};

use crate::cli::{Cli, FeaturesArgs};
use crate::common::data::{read_csv, read_parquet, read_table, write_parquet};
use crate::features::build_features;
use crate::normalize::NameResolver;
use crate::report::RunSummary;

use super::{load_config, FEATURES_ARTIFACT, STATIONS_ARTIFACT, SUMMARY_ARTIFACT};

pub fn run(cli: &Cli, args: &FeaturesArgs) -> Result<()> {
    let config = load_config(cli)?;

    let stations = read_parquet(&args.out_dir.join(STATIONS_ARTIFACT))
        .context("station artifact missing; run `extract` first")?;
    let station_names: Vec<String> = stations
        .column("station")?
        .str()?
        .into_no_null_iter()
        .map(str::to_string)
        .collect();

    let mut resolver = NameResolver::new(station_names, config.fuzzy_match_threshold);
    if let Some(aliases) = &args.aliases {
        let added = resolver.load_aliases(aliases)?;
        if cli.verbose > 0 {
            eprintln!("[features] loaded {added} aliases");
        }
    }

    let summary_path = args.out_dir.join(SUMMARY_ARTIFACT);
    let mut summary = RunSummary::load_or_default(&summary_path)?;
    if args.ridership.is_file() {
        summary.record_input("ridership", &args.ridership)?;
    }
    summary.record_input("delays", &args.delays)?;
    summary.record_input("reliability", &args.reliability)?;

    let ridership = read_table(&args.ridership)?;
    let delays = read_csv(&args.delays)?;
    let reliability = read_csv(&args.reliability)?;
    if cli.verbose > 0 {
        eprintln!(
            "[features] ridership rows={} delay rows={} reliability rows={}",
            ridership.height(),
            delays.height(),
            reliability.height()
        );
    }

    let (df, stats) = build_features(&ridership, &delays, &reliability, &stations, &resolver, &config)?;
    summary.station_names_unmatched = stats.unmatched_names;
    summary.rows_rejected_out_of_range = stats.rows_rejected;
    summary.values_imputed = stats.values_imputed;

    let out_path = args.out_dir.join(FEATURES_ARTIFACT);
    write_parquet(&df, &out_path, args.force)?;
    summary.write_json(&summary_path)?;

    println!(
        "Built {} feature rows ({} unmatched names, {} rejected rows, {} imputed values) -> {}",
        df.height(),
        stats.unmatched_names,
        stats.rows_rejected,
        stats.values_imputed,
        out_path.display()
    );
    Ok(())
}
