use std::path::Path;

use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use geo::MultiPolygon;
use polars::prelude::DataType;
use shapefile::{dbase::FieldValue, Reader, Shape};

use crate::common::data::read_csv;
use crate::common::fs::{extract_zip, find_by_extension};
use crate::geo::{shp_to_multipolygon, Geometries, MetricProjection};

/// Race proportions must sum to 1 within this tolerance or the row is
/// rejected.
pub const PROPORTION_TOLERANCE: f64 = 1e-3;

/// Tract-level demographic attributes from the census table.
#[derive(Debug, Clone)]
pub struct DemographicProfile {
    pub geoid: String,
    pub median_income: f64,
    pub pct_white: f64,
    pub pct_black: f64,
    pub pct_hispanic: f64,
    pub pct_asian: f64,
    pub pct_other: f64,
    /// Share of zero-vehicle households; the transit-dependency ratio.
    pub transit_dependency: f64,
}

/// Census tract polygons (reprojected to UTM meters) plus the demographic
/// lookup keyed by GEOID.
pub struct TractData {
    pub geoids: Vec<String>,
    pub geoms: Geometries,
    pub profiles: AHashMap<String, DemographicProfile>,
}

impl TractData {
    /// Load tract geometries (a TIGER `.zip` bundle or a bare `.shp`) and the
    /// tract demographic CSV. Returns the data plus the count of demographic
    /// rows rejected by validation.
    pub fn load(
        tract_source: &Path,
        demographics_csv: &Path,
        projection: &MetricProjection,
    ) -> Result<(Self, u64)> {
        let (geoids, shapes) = load_tract_shapes(tract_source)?;
        let projected: Vec<MultiPolygon<f64>> =
            shapes.iter().map(|shape| projection.project_multipolygon(shape)).collect();
        let (profiles, rejected) = load_demographics(demographics_csv)?;
        Ok((Self { geoids, geoms: Geometries::new(projected), profiles }, rejected))
    }
}

/// Read tract polygons and GEOIDs from a TIGER shapefile, extracting zip
/// bundles to a temp directory first.
fn load_tract_shapes(path: &Path) -> Result<(Vec<String>, Vec<MultiPolygon<f64>>)> {
    if path.extension().is_some_and(|ext| ext == "zip") {
        let dir = tempfile::tempdir().context("create temp dir for tract bundle")?;
        extract_zip(path, dir.path(), false)?;
        let shp = find_by_extension(dir.path(), "shp")?;
        return read_tract_shapefile(&shp);
    }
    read_tract_shapefile(path)
}

fn read_tract_shapefile(path: &Path) -> Result<(Vec<String>, Vec<MultiPolygon<f64>>)> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let size = reader.shape_count()?;
    let mut geoids = Vec::with_capacity(size);
    let mut shapes = Vec::with_capacity(size);
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("Error reading shape+record")?;
        let polygon = match shape {
            Shape::Polygon(polygon) => shp_to_multipolygon(&polygon),
            other => bail!("found non-Polygon shape in tract layer: {:?}", other.shapetype()),
        };
        let geoid = ["GEOID20", "GEOID10", "GEOID", "geoid"]
            .iter()
            .find_map(|field| match record.get(field) {
                Some(FieldValue::Character(Some(s))) => Some(s.trim().to_string()),
                _ => None,
            })
            .context("tract record missing GEOID field")?;
        geoids.push(geoid);
        shapes.push(polygon);
    }
    Ok((geoids, shapes))
}

/// Load the tract demographic table, dropping rows that fail validation:
/// negative income, proportions outside [0, 1] or not summing to 1 within
/// tolerance, dependency outside [0, 1]. Returns profiles keyed by GEOID and
/// the rejected-row count.
pub fn load_demographics(path: &Path) -> Result<(AHashMap<String, DemographicProfile>, u64)> {
    let df = read_csv(path)?;

    let geoids = df.column("geoid")?.cast(&DataType::String)?;
    let geoids = geoids.str()?;
    let numeric = |name: &str| -> Result<_> {
        let column = df.column(name)
            .with_context(|| format!("demographic table missing column {name:?}"))?
            .cast(&DataType::Float64)?;
        Ok(column)
    };
    let income = numeric("median_income")?;
    let income = income.f64()?;
    let white = numeric("pct_white")?;
    let white = white.f64()?;
    let black = numeric("pct_black")?;
    let black = black.f64()?;
    let hispanic = numeric("pct_hispanic")?;
    let hispanic = hispanic.f64()?;
    let asian = numeric("pct_asian")?;
    let asian = asian.f64()?;
    let other = numeric("pct_other")?;
    let other = other.f64()?;
    let dependency = numeric("transit_dependency")?;
    let dependency = dependency.f64()?;

    let mut profiles = AHashMap::new();
    let mut rejected = 0u64;
    for i in 0..df.height() {
        let Some(geoid) = geoids.get(i).map(str::trim).filter(|g| !g.is_empty()) else {
            rejected += 1;
            continue;
        };
        let fields = [
            income.get(i),
            white.get(i),
            black.get(i),
            hispanic.get(i),
            asian.get(i),
            other.get(i),
            dependency.get(i),
        ];
        let [Some(median_income), Some(pct_white), Some(pct_black), Some(pct_hispanic), Some(pct_asian), Some(pct_other), Some(transit_dependency)] = fields else {
            rejected += 1;
            continue;
        };

        let proportions = [pct_white, pct_black, pct_hispanic, pct_asian, pct_other];
        let proportion_sum: f64 = proportions.iter().sum();
        let valid = median_income >= 0.0
            && proportions.iter().all(|p| (0.0..=1.0).contains(p))
            && (proportion_sum - 1.0).abs() <= PROPORTION_TOLERANCE
            && (0.0..=1.0).contains(&transit_dependency);
        if !valid {
            rejected += 1;
            continue;
        }

        profiles.insert(
            geoid.to_string(),
            DemographicProfile {
                geoid: geoid.to_string(),
                median_income,
                pct_white,
                pct_black,
                pct_hispanic,
                pct_asian,
                pct_other,
                transit_dependency,
            },
        );
    }
    Ok((profiles, rejected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(rows: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demographics.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "geoid,median_income,pct_white,pct_black,pct_hispanic,pct_asian,pct_other,transit_dependency"
        )
        .unwrap();
        for row in rows {
            writeln!(file, "{row}").unwrap();
        }
        (dir, path)
    }

    #[test]
    fn accepts_rows_with_proportions_summing_to_one() {
        let (_dir, path) = write_csv(&["36061000100,85000,0.4,0.2,0.2,0.15,0.05,0.6"]);
        let (profiles, rejected) = load_demographics(&path).unwrap();
        assert_eq!(rejected, 0);
        assert_eq!(profiles.len(), 1);
        let profile = &profiles["36061000100"];
        assert_eq!(profile.median_income, 85000.0);
        assert_eq!(profile.transit_dependency, 0.6);
    }

    #[test]
    fn rejects_rows_with_bad_proportion_sum() {
        let (_dir, path) = write_csv(&[
            "36061000100,85000,0.4,0.2,0.2,0.15,0.05,0.6",
            "36061000200,60000,0.9,0.3,0.2,0.1,0.1,0.5",
        ]);
        let (profiles, rejected) = load_demographics(&path).unwrap();
        assert_eq!(rejected, 1);
        assert!(!profiles.contains_key("36061000200"));
    }

    #[test]
    fn rejects_negative_income_and_bad_dependency() {
        let (_dir, path) = write_csv(&[
            "36061000100,-1,0.4,0.2,0.2,0.15,0.05,0.6",
            "36061000200,60000,0.4,0.2,0.2,0.15,0.05,1.5",
        ]);
        let (profiles, rejected) = load_demographics(&path).unwrap();
        assert_eq!(rejected, 2);
        assert!(profiles.is_empty());
    }
}
