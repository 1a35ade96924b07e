// Integration tests for the feature builder on synthetic frames: label
// construction, join anchoring, exclusion counting, and median imputation.

use polars::frame::DataFrame;
use polars::prelude::Column;

use metroequity::config::PipelineConfig;
use metroequity::features::{build_features, LABEL_COLUMN};
use metroequity::normalize::NameResolver;

fn stations_frame() -> DataFrame {
    DataFrame::new(vec![
        Column::new("station".into(), vec!["CANAL ST", "FULTON ST"]),
        Column::new("lines".into(), vec!["N-Q", "A"]),
        Column::new("median_income".into(), vec![90_000.0, 60_000.0]),
        Column::new("minority_share".into(), vec![0.3, 0.6]),
        Column::new("transit_dependency".into(), vec![0.5, 0.7]),
    ])
    .unwrap()
}

fn ridership_frame() -> DataFrame {
    DataFrame::new(vec![
        Column::new("station".into(), vec![
            "CANAL ST",      // Tuesday
            "CANAL ST",      // Saturday
            "Canal Street",  // canonicalizes to CANAL ST, Tuesday
            "FULTON ST",
            "FULTON ST",
            "MYSTERY LN",    // unmatched
            "CANAL ST",      // bad timestamp
            "FULTON ST",     // negative entries
        ]),
        Column::new("timestamp".into(), vec![
            "2023-01-03 10:00:00",
            "2023-01-07 10:00:00",
            "2023-01-10 10:00:00",
            "2023-01-03 08:00:00",
            "2023-02-04 08:00:00",
            "2023-01-03 09:00:00",
            "never o'clock",
            "2023-01-05 09:00:00",
        ]),
        Column::new("entries".into(), vec![100.0, 50.0, 30.0, 200.0, 10.0, 40.0, 20.0, -5.0]),
        Column::new("exits".into(), vec![90.0, 40.0, 20.0, 150.0, 5.0, 30.0, 10.0, 5.0]),
    ])
    .unwrap()
}

fn delays_frame() -> DataFrame {
    DataFrame::new(vec![
        Column::new("station".into(), vec!["CANAL ST", "CANAL ST", "FULTON ST", "CANAL ST"]),
        Column::new("timestamp".into(), vec![
            "2023-01-15 12:00:00",
            "2023-01-16 12:00:00",
            "2023-02-10 12:00:00",
            "2023-03-01 12:00:00", // no ridership rows for this period
        ]),
        Column::new("duration_min".into(), vec![15.0, 5.0, 5.0, 60.0]),
    ])
    .unwrap()
}

fn reliability_frame() -> DataFrame {
    DataFrame::new(vec![
        Column::new("line".into(), vec!["N", "Q"]),
        Column::new("year".into(), vec![2023, 2023]),
        Column::new("month".into(), vec![1, 1]),
        Column::new("mdbf".into(), vec![120_000.0, 100_000.0]),
    ])
    .unwrap()
}

fn build() -> (DataFrame, metroequity::features::FeatureStats) {
    let config = PipelineConfig::default();
    let resolver = NameResolver::new(["CANAL ST", "FULTON ST"], config.fuzzy_match_threshold);
    build_features(
        &ridership_frame(),
        &delays_frame(),
        &reliability_frame(),
        &stations_frame(),
        &resolver,
        &config,
    )
    .unwrap()
}

fn row_index(df: &DataFrame, station: &str, year: i32, month: i32) -> Option<usize> {
    let stations = df.column("station").unwrap().str().unwrap().clone();
    let years = df.column("year").unwrap().i32().unwrap().clone();
    let months = df.column("month").unwrap().i32().unwrap().clone();
    (0..df.height()).find(|&i| {
        stations.get(i) == Some(station)
            && years.get(i) == Some(year)
            && months.get(i) == Some(month)
    })
}

fn f64_at(df: &DataFrame, name: &str, i: usize) -> f64 {
    df.column(name).unwrap().f64().unwrap().get(i).unwrap()
}

#[test]
fn ridership_anchors_the_join() {
    let (df, _) = build();
    // Three (station, year, month) keys have ridership; the delay-only
    // March key must not create a row.
    assert_eq!(df.height(), 3);
    assert!(row_index(&df, "CANAL ST", 2023, 1).is_some());
    assert!(row_index(&df, "FULTON ST", 2023, 1).is_some());
    assert!(row_index(&df, "FULTON ST", 2023, 2).is_some());
    assert!(row_index(&df, "CANAL ST", 2023, 3).is_none());
}

#[test]
fn label_set_iff_a_qualifying_incident_exists() {
    let (df, _) = build();
    let labels = df.column(LABEL_COLUMN).unwrap().i64().unwrap().clone();

    // One 15-minute incident qualifies even though a 5-minute one doesn't.
    let canal = row_index(&df, "CANAL ST", 2023, 1).unwrap();
    assert_eq!(labels.get(canal), Some(1));

    // No incidents at all.
    let fulton_jan = row_index(&df, "FULTON ST", 2023, 1).unwrap();
    assert_eq!(labels.get(fulton_jan), Some(0));

    // Only a sub-threshold incident.
    let fulton_feb = row_index(&df, "FULTON ST", 2023, 2).unwrap();
    assert_eq!(labels.get(fulton_feb), Some(0));
}

#[test]
fn hourly_rows_aggregate_to_monthly_totals() {
    let (df, _) = build();
    let canal = row_index(&df, "CANAL ST", 2023, 1).unwrap();
    assert_eq!(f64_at(&df, "entries_total", canal), 180.0);
    assert_eq!(f64_at(&df, "exits_total", canal), 150.0);

    // 130 of 180 entries fell on weekdays.
    let share = f64_at(&df, "weekday_share", canal);
    assert!((share - 130.0 / 180.0).abs() < 1e-12);
}

#[test]
fn unmatched_and_out_of_range_rows_are_counted() {
    let (_, stats) = build();
    assert_eq!(stats.unmatched_names, 1); // MYSTERY LN
    assert_eq!(stats.rows_rejected, 2); // bad timestamp + negative entries
}

#[test]
fn station_reliability_is_the_mean_over_its_lines() {
    let (df, _) = build();
    let canal = row_index(&df, "CANAL ST", 2023, 1).unwrap();
    assert_eq!(f64_at(&df, "mdbf", canal), 110_000.0);
}

#[test]
fn missing_reliability_takes_the_column_median() {
    let (df, stats) = build();
    // FULTON ST has no MDBF coverage in either period.
    assert_eq!(stats.values_imputed, 2);
    let fulton_jan = row_index(&df, "FULTON ST", 2023, 1).unwrap();
    let fulton_feb = row_index(&df, "FULTON ST", 2023, 2).unwrap();
    assert_eq!(f64_at(&df, "mdbf", fulton_jan), 110_000.0);
    assert_eq!(f64_at(&df, "mdbf", fulton_feb), 110_000.0);
}

#[test]
fn demographics_broadcast_across_periods() {
    let (df, _) = build();
    let fulton_jan = row_index(&df, "FULTON ST", 2023, 1).unwrap();
    let fulton_feb = row_index(&df, "FULTON ST", 2023, 2).unwrap();
    assert_eq!(f64_at(&df, "median_income", fulton_jan), 60_000.0);
    assert_eq!(f64_at(&df, "median_income", fulton_feb), 60_000.0);
    assert_eq!(f64_at(&df, "transit_dependency", fulton_jan), 0.7);
}

#[test]
fn season_column_follows_the_month() {
    let (df, _) = build();
    let seasons = df.column("season").unwrap().str().unwrap().clone();
    for i in 0..df.height() {
        assert_eq!(seasons.get(i), Some("winter"));
    }
}

#[test]
fn rebuilding_produces_identical_output() {
    let (first, _) = build();
    let (second, _) = build();
    assert!(first.equals(&second));
}
