use anyhow::{bail, Result};
use geo::Coord;
use polars::{frame::DataFrame, prelude::Column};

use crate::cli::{Cli, ExtractArgs};
use crate::common::{data::write_parquet, fs::ensure_dir_exists};
use crate::demog::{aggregate_catchment, county_to_borough, TractData};
use crate::geo::{
    catchment_polygon, merge_stations, read_stations, tally_street_segments, Datum,
    MetricProjection,
};
use crate::normalize::NameNormalizer;
use crate::report::RunSummary;

use super::{load_config, STATIONS_ARTIFACT, SUMMARY_ARTIFACT};

pub fn run(cli: &Cli, args: &ExtractArgs) -> Result<()> {
    let config = load_config(cli)?;
    ensure_dir_exists(&args.out_dir)?;

    let summary_path = args.out_dir.join(SUMMARY_ARTIFACT);
    let mut summary = RunSummary::load_or_default(&summary_path)?;
    summary.record_input("stations", &args.stations)?;
    summary.record_input("tracts", &args.tracts)?;
    summary.record_input("demographics", &args.demographics)?;

    let (raw, dropped) = read_stations(&args.stations)?;
    summary.stations_dropped_missing_coords = dropped;
    if cli.verbose > 0 {
        eprintln!("[extract] raw stations={} dropped={}", raw.len(), dropped);
    }

    let normalizer = NameNormalizer::new();
    let mut stations = merge_stations(raw, &normalizer);
    if stations.is_empty() {
        bail!("map extract produced no usable stations");
    }

    // One UTM projection per run, centered on the station registry.
    let center = Coord {
        x: stations.iter().map(|s| s.lon).sum::<f64>() / stations.len() as f64,
        y: stations.iter().map(|s| s.lat).sum::<f64>() / stations.len() as f64,
    };
    let station_projection = MetricProjection::new(Datum::Wgs84, center)?;
    let tract_projection = MetricProjection::new(Datum::Nad83, center)?;

    let (tracts, rejected) = TractData::load(&args.tracts, &args.demographics, &tract_projection)?;
    summary.rows_rejected_bad_proportions = rejected;
    if cli.verbose > 0 {
        eprintln!("[extract] tracts={} demographic rows rejected={}", tracts.geoms.len(), rejected);
    }

    let count = stations.len();
    let mut names: Vec<String> = Vec::with_capacity(count);
    let mut line_sets: Vec<String> = Vec::with_capacity(count);
    let mut boroughs: Vec<Option<String>> = Vec::with_capacity(count);
    let mut lons: Vec<f64> = Vec::with_capacity(count);
    let mut lats: Vec<f64> = Vec::with_capacity(count);
    let mut incomes: Vec<Option<f64>> = Vec::with_capacity(count);
    let mut minority_shares: Vec<Option<f64>> = Vec::with_capacity(count);
    let mut dependencies: Vec<Option<f64>> = Vec::with_capacity(count);
    let mut tract_counts: Vec<u32> = Vec::with_capacity(count);

    for station in &mut stations {
        let center_utm =
            station_projection.project_point(Coord { x: station.lon, y: station.lat })?;
        station.catchment = Some(catchment_polygon(
            center_utm,
            config.catchment_radius_m,
            config.catchment_segments,
        ));
    }

    let mut no_overlap = 0u64;
    for station in &stations {
        let catchment = station.catchment.as_ref().expect("catchment computed above");

        names.push(station.name.clone());
        line_sets.push(station.lines.join("-"));
        lons.push(station.lon);
        lats.push(station.lat);

        match aggregate_catchment(catchment, &tracts) {
            Some(profile) => {
                boroughs.push(station.borough.clone().or_else(|| {
                    county_to_borough(&profile.dominant_county).map(str::to_string)
                }));
                incomes.push(Some(profile.median_income));
                minority_shares.push(Some(1.0 - profile.pct_white));
                dependencies.push(Some(profile.transit_dependency));
                tract_counts.push(profile.tract_weights.len() as u32);
            }
            None => {
                no_overlap += 1;
                boroughs.push(station.borough.clone());
                incomes.push(None);
                minority_shares.push(None);
                dependencies.push(None);
                tract_counts.push(0);
            }
        }
    }
    summary.catchments_without_tract_overlap = no_overlap;

    if let Some(segments) = &args.segments {
        summary.record_input("segments", segments)?;
        summary.street_segments = tally_street_segments(segments)?;
        if cli.verbose > 0 {
            let total: u64 = summary.street_segments.values().sum();
            eprintln!("[extract] street segments={total}");
        }
    }

    let df = DataFrame::new(vec![
        Column::new("station".into(), names),
        Column::new("lines".into(), line_sets),
        Column::new("borough".into(), boroughs),
        Column::new("lon".into(), lons),
        Column::new("lat".into(), lats),
        Column::new("median_income".into(), incomes),
        Column::new("minority_share".into(), minority_shares),
        Column::new("transit_dependency".into(), dependencies),
        Column::new("tract_count".into(), tract_counts),
    ])?;

    let out_path = args.out_dir.join(STATIONS_ARTIFACT);
    write_parquet(&df, &out_path, args.force)?;
    summary.write_json(&summary_path)?;

    println!("Extracted {} stations -> {}", df.height(), out_path.display());
    Ok(())
}
