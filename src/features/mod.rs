use anyhow::{Context, Result};
use polars::frame::DataFrame;
use polars::prelude::{
    col, lit, Column, DataFrameJoinOps, DataType, IntoLazy, SortMultipleOptions,
};

use crate::config::PipelineConfig;
use crate::normalize::{calendar_features, parse_timestamp, season_of_month, NameResolver};

/// Columns fed to the delay classifier, in design-matrix order.
pub const FEATURE_COLUMNS: &[&str] = &[
    "entries_total",
    "exits_total",
    "weekday_share",
    "mdbf",
    "median_income",
    "minority_share",
    "transit_dependency",
    "month",
];

/// Binary target: 1 iff at least one qualifying delay incident hit the
/// (station, year, month) key.
pub const LABEL_COLUMN: &str = "significant_delay";

/// Accounting for everything the builder excluded or filled.
#[derive(Debug, Default, Clone, Copy)]
pub struct FeatureStats {
    /// Names no resolver strategy matched; rows excluded from the merge.
    pub unmatched_names: u64,
    /// Rows rejected for negative counts or unparseable timestamps.
    pub rows_rejected: u64,
    /// Missing values filled with the column median.
    pub values_imputed: u64,
}

/// Build the wide per-(station, year, month) feature table. Ridership is
/// the join anchor (broadest coverage); delay, reliability, and demographic
/// columns attach by left join. Absent delay columns default to zero
/// incidents; absent reliability/demographic values take the column median.
pub fn build_features(
    ridership: &DataFrame,
    delays: &DataFrame,
    reliability: &DataFrame,
    stations: &DataFrame,
    resolver: &NameResolver,
    config: &PipelineConfig,
) -> Result<(DataFrame, FeatureStats)> {
    let mut stats = FeatureStats::default();

    let keys = ["station", "year", "month"];
    let ridership_agg = normalize_ridership(ridership, resolver, &mut stats)?;
    let delay_agg = normalize_delays(delays, resolver, config.significant_delay_minutes, &mut stats)?;
    let reliability_agg = normalize_reliability(reliability, stations, &mut stats)?;

    let demographics = stations
        .select(["station", "median_income", "minority_share", "transit_dependency"])
        .context("station table is missing demographic columns")?;

    let joined = ridership_agg
        .left_join(&delay_agg, keys, keys)?
        .left_join(&reliability_agg, keys, keys)?
        .left_join(&demographics, ["station"], ["station"])?;

    let mut df = joined
        .lazy()
        .with_columns([
            col("significant_delays").fill_null(lit(0i64)),
            col("incident_count").fill_null(lit(0i64)),
            col("max_delay_minutes").fill_null(lit(0.0f64)),
        ])
        .with_column(
            col("significant_delays")
                .gt(lit(0i64))
                .cast(DataType::Int64)
                .alias(LABEL_COLUMN),
        )
        .collect()?;

    for name in ["mdbf", "median_income", "minority_share", "transit_dependency"] {
        df = impute_median(df, name, &mut stats)?;
    }

    let months = df.column("month")?.i32()?.clone();
    let seasons: Vec<&str> = months
        .into_no_null_iter()
        .map(|month| season_of_month(month as u32).as_str())
        .collect();
    df.with_column(Column::new("season".into(), seasons))?;

    let df = df.sort(["station", "year", "month"], SortMultipleOptions::default())?;
    Ok((df, stats))
}

/// Hourly ridership -> per-key entry/exit totals and weekday entry share.
/// Rows with unmatched stations, unparseable timestamps, or negative counts
/// are excluded and counted.
fn normalize_ridership(
    df: &DataFrame,
    resolver: &NameResolver,
    stats: &mut FeatureStats,
) -> Result<DataFrame> {
    let names = df.column("station")?.cast(&DataType::String)?;
    let names = names.str()?;
    let timestamps = df.column("timestamp")?.cast(&DataType::String)?;
    let timestamps = timestamps.str()?;
    let entries = df.column("entries")?.cast(&DataType::Float64)?;
    let entries = entries.f64()?;
    let exits = df.column("exits")?.cast(&DataType::Float64)?;
    let exits = exits.f64()?;

    let mut out_station: Vec<String> = Vec::new();
    let mut out_year: Vec<i32> = Vec::new();
    let mut out_month: Vec<i32> = Vec::new();
    let mut out_entries: Vec<f64> = Vec::new();
    let mut out_exits: Vec<f64> = Vec::new();
    let mut out_weekday_entries: Vec<f64> = Vec::new();

    for i in 0..df.height() {
        let Some(matched) = names.get(i).and_then(|raw| resolver.resolve(raw)) else {
            stats.unmatched_names += 1;
            continue;
        };
        let (Some(ts), Some(entry_count), Some(exit_count)) =
            (timestamps.get(i), entries.get(i), exits.get(i))
        else {
            stats.rows_rejected += 1;
            continue;
        };
        let Ok(dt) = parse_timestamp(ts) else {
            stats.rows_rejected += 1;
            continue;
        };
        if entry_count < 0.0 || exit_count < 0.0 {
            stats.rows_rejected += 1;
            continue;
        }

        let cal = calendar_features(&dt);
        out_station.push(resolver.canonical_name(matched.index()).to_string());
        out_year.push(cal.year);
        out_month.push(cal.month as i32);
        out_entries.push(entry_count);
        out_exits.push(exit_count);
        out_weekday_entries.push(if cal.weekday { entry_count } else { 0.0 });
    }

    let base = DataFrame::new(vec![
        Column::new("station".into(), out_station),
        Column::new("year".into(), out_year),
        Column::new("month".into(), out_month),
        Column::new("entries".into(), out_entries),
        Column::new("exits".into(), out_exits),
        Column::new("weekday_entries".into(), out_weekday_entries),
    ])?;

    let mut agg = base
        .lazy()
        .group_by([col("station"), col("year"), col("month")])
        .agg([
            col("entries").sum().alias("entries_total"),
            col("exits").sum().alias("exits_total"),
            col("weekday_entries").sum().alias("weekday_entries"),
        ])
        .collect()?;

    let totals = agg.column("entries_total")?.f64()?.clone();
    let weekday = agg.column("weekday_entries")?.f64()?.clone();
    let share: Vec<f64> = totals
        .into_no_null_iter()
        .zip(weekday.into_no_null_iter())
        .map(|(total, on_weekdays)| if total > 0.0 { on_weekdays / total } else { 0.0 })
        .collect();
    agg.with_column(Column::new("weekday_share".into(), share))?;
    Ok(agg.drop("weekday_entries")?)
}

/// Delay incidents -> per-key incident counts and the qualifying-incident
/// tally that drives the label.
fn normalize_delays(
    df: &DataFrame,
    resolver: &NameResolver,
    significant_minutes: f64,
    stats: &mut FeatureStats,
) -> Result<DataFrame> {
    let names = df.column("station")?.cast(&DataType::String)?;
    let names = names.str()?;
    let timestamps = df.column("timestamp")?.cast(&DataType::String)?;
    let timestamps = timestamps.str()?;
    let durations = df.column("duration_min")?.cast(&DataType::Float64)?;
    let durations = durations.f64()?;

    let mut out_station: Vec<String> = Vec::new();
    let mut out_year: Vec<i32> = Vec::new();
    let mut out_month: Vec<i32> = Vec::new();
    let mut out_duration: Vec<f64> = Vec::new();
    let mut out_qualifying: Vec<i64> = Vec::new();

    for i in 0..df.height() {
        let Some(matched) = names.get(i).and_then(|raw| resolver.resolve(raw)) else {
            stats.unmatched_names += 1;
            continue;
        };
        let (Some(ts), Some(duration)) = (timestamps.get(i), durations.get(i)) else {
            stats.rows_rejected += 1;
            continue;
        };
        let Ok(dt) = parse_timestamp(ts) else {
            stats.rows_rejected += 1;
            continue;
        };
        if duration < 0.0 {
            stats.rows_rejected += 1;
            continue;
        }

        let cal = calendar_features(&dt);
        out_station.push(resolver.canonical_name(matched.index()).to_string());
        out_year.push(cal.year);
        out_month.push(cal.month as i32);
        out_duration.push(duration);
        out_qualifying.push(i64::from(duration >= significant_minutes));
    }

    let base = DataFrame::new(vec![
        Column::new("station".into(), out_station),
        Column::new("year".into(), out_year),
        Column::new("month".into(), out_month),
        Column::new("duration_min".into(), out_duration),
        Column::new("qualifying".into(), out_qualifying),
    ])?;

    Ok(base
        .lazy()
        .group_by([col("station"), col("year"), col("month")])
        .agg([
            col("qualifying").sum().alias("significant_delays"),
            col("qualifying").count().cast(DataType::Int64).alias("incident_count"),
            col("duration_min").max().alias("max_delay_minutes"),
        ])
        .collect()?)
}

/// MDBF is reported per line per month; a station's reliability is the mean
/// over its line set.
fn normalize_reliability(
    df: &DataFrame,
    stations: &DataFrame,
    stats: &mut FeatureStats,
) -> Result<DataFrame> {
    let lines = df.column("line")?.cast(&DataType::String)?;
    let lines = lines.str()?;
    let years = df.column("year")?.cast(&DataType::Int32)?;
    let years = years.i32()?;
    let months = df.column("month")?.cast(&DataType::Int32)?;
    let months = months.i32()?;
    let mdbf = df.column("mdbf")?.cast(&DataType::Float64)?;
    let mdbf = mdbf.f64()?;

    let mut out_line: Vec<String> = Vec::new();
    let mut out_year: Vec<i32> = Vec::new();
    let mut out_month: Vec<i32> = Vec::new();
    let mut out_mdbf: Vec<f64> = Vec::new();
    for i in 0..df.height() {
        let (Some(line), Some(year), Some(month), Some(distance)) =
            (lines.get(i), years.get(i), months.get(i), mdbf.get(i))
        else {
            stats.rows_rejected += 1;
            continue;
        };
        if distance < 0.0 || !(1..=12).contains(&month) {
            stats.rows_rejected += 1;
            continue;
        }
        out_line.push(line.trim().to_uppercase());
        out_year.push(year);
        out_month.push(month);
        out_mdbf.push(distance);
    }

    let per_line = DataFrame::new(vec![
        Column::new("line".into(), out_line),
        Column::new("year".into(), out_year),
        Column::new("month".into(), out_month),
        Column::new("mdbf".into(), out_mdbf),
    ])?;

    // Station <-> line membership, exploded from the station registry.
    let station_names = stations.column("station")?.str()?.clone();
    let station_lines = stations.column("lines")?.str()?.clone();
    let mut member_station: Vec<String> = Vec::new();
    let mut member_line: Vec<String> = Vec::new();
    for i in 0..stations.height() {
        let (Some(name), Some(line_set)) = (station_names.get(i), station_lines.get(i)) else {
            continue;
        };
        for line in line_set.split('-').filter(|token| !token.is_empty()) {
            member_station.push(name.to_string());
            member_line.push(line.trim().to_uppercase());
        }
    }
    let membership = DataFrame::new(vec![
        Column::new("station".into(), member_station),
        Column::new("line".into(), member_line),
    ])?;

    Ok(membership
        .inner_join(&per_line, ["line"], ["line"])?
        .lazy()
        .group_by([col("station"), col("year"), col("month")])
        .agg([col("mdbf").mean().alias("mdbf")])
        .collect()?)
}

/// Fill nulls in `name` with the column median, counting every fill. An
/// all-null column falls back to zero.
fn impute_median(df: DataFrame, name: &str, stats: &mut FeatureStats) -> Result<DataFrame> {
    let nulls = df.column(name)?.null_count();
    if nulls == 0 {
        return Ok(df);
    }
    stats.values_imputed += nulls as u64;

    let median_df = df
        .clone()
        .lazy()
        .select([col(name).median().alias("median")])
        .collect()?;
    let median = median_df.column("median")?.f64()?.get(0).unwrap_or(0.0);

    Ok(df.lazy().with_column(col(name).fill_null(lit(median))).collect()?)
}
