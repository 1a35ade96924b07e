use std::collections::BTreeMap;
use std::path::Path;

use ahash::AHashMap;
use anyhow::{bail, Context, Result};
use polars::prelude::DataType;
use shapefile::{dbase::{FieldValue, Record}, Reader, Shape};
use smallvec::SmallVec;

use crate::common::data::{pick_column, read_csv};
use crate::normalize::{canonical_lines, NameNormalizer};

use super::Station;

/// One station record as it appears in the map extract, before identity
/// merge. `lines` is the raw line string; parsing happens at merge time.
#[derive(Debug, Clone)]
pub struct RawStation {
    pub name: String,
    pub lines: String,
    pub borough: Option<String>,
    pub lon: f64,
    pub lat: f64,
}

/// Read raw station points from a map extract. Point shapefiles and CSV
/// exports are both accepted; records without usable coordinates or a name
/// are dropped and counted, not fatal.
pub fn read_stations(path: &Path) -> Result<(Vec<RawStation>, u64)> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("shp") => read_stations_shapefile(path),
        Some("csv") | Some("gz") => read_stations_csv(path),
        _ => bail!("unsupported map extract format: {}", path.display()),
    }
}

/// Get the value of a character field from a Record, trying several
/// field-name spellings (extracts differ in casing).
fn character_field(record: &Record, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| match record.get(name) {
        Some(FieldValue::Character(Some(s))) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        _ => None,
    })
}

fn read_stations_shapefile(path: &Path) -> Result<(Vec<RawStation>, u64)> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let mut stations = Vec::new();
    let mut dropped = 0u64;
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("Error reading shape+record")?;
        let (lon, lat) = match shape {
            Shape::Point(p) => (p.x, p.y),
            Shape::PointM(p) => (p.x, p.y),
            Shape::PointZ(p) => (p.x, p.y),
            _ => {
                dropped += 1;
                continue;
            }
        };
        if !lon.is_finite() || !lat.is_finite() {
            dropped += 1;
            continue;
        }
        let Some(name) = character_field(&record, &["name", "NAME", "station", "STATION"]) else {
            dropped += 1;
            continue;
        };
        let lines = character_field(&record, &["lines", "LINES", "line", "LINE"]).unwrap_or_default();
        let borough = character_field(&record, &["borough", "BOROUGH"]);
        stations.push(RawStation { name, lines, borough, lon, lat });
    }
    Ok((stations, dropped))
}

fn read_stations_csv(path: &Path) -> Result<(Vec<RawStation>, u64)> {
    let df = read_csv(path)?;

    let names = df.column("name").or_else(|_| df.column("station"))
        .context("map extract CSV needs a 'name' or 'station' column")?
        .str()?.clone();
    let lons = pick_column(&df, &["lon", "longitude"])
        .context("map extract CSV needs a 'lon' or 'longitude' column")?
        .cast(&DataType::Float64)?;
    let lons = lons.f64()?;
    let lats = pick_column(&df, &["lat", "latitude"])
        .context("map extract CSV needs a 'lat' or 'latitude' column")?
        .cast(&DataType::Float64)?;
    let lats = lats.f64()?;
    let lines = df.column("lines").or_else(|_| df.column("line")).ok()
        .map(|column| column.str().map(|ca| ca.clone()))
        .transpose()?;
    let boroughs = df.column("borough").ok()
        .map(|column| column.str().map(|ca| ca.clone()))
        .transpose()?;

    let mut stations = Vec::new();
    let mut dropped = 0u64;
    for i in 0..df.height() {
        let name = names.get(i).map(str::trim).unwrap_or_default();
        let (Some(lon), Some(lat)) = (lons.get(i), lats.get(i)) else {
            dropped += 1;
            continue;
        };
        if name.is_empty() || !lon.is_finite() || !lat.is_finite() {
            dropped += 1;
            continue;
        }
        stations.push(RawStation {
            name: name.to_string(),
            lines: lines.as_ref().and_then(|ca| ca.get(i)).unwrap_or_default().to_string(),
            borough: boroughs.as_ref().and_then(|ca| ca.get(i)).map(str::to_string),
            lon,
            lat,
        });
    }
    Ok((stations, dropped))
}

/// Merge raw records into one Station per canonical name. Stations sharing
/// a name across multiple lines collapse to a single record with the union
/// of line sets; the merged location is the centroid of the member points.
/// Output is sorted by name so downstream artifacts are reproducible.
pub fn merge_stations(raw: Vec<RawStation>, normalizer: &NameNormalizer) -> Vec<Station> {
    struct Accumulator {
        lines: SmallVec<[String; 4]>,
        borough: Option<String>,
        lon_sum: f64,
        lat_sum: f64,
        count: f64,
    }

    let mut merged: AHashMap<String, Accumulator> = AHashMap::new();
    for record in raw {
        let name = normalizer.canonicalize(&record.name);
        let entry = merged.entry(name).or_insert_with(|| Accumulator {
            lines: SmallVec::new(),
            borough: None,
            lon_sum: 0.0,
            lat_sum: 0.0,
            count: 0.0,
        });
        for line in canonical_lines(&record.lines) {
            if !entry.lines.iter().any(|existing| *existing == line) {
                entry.lines.push(line);
            }
        }
        if entry.borough.is_none() {
            entry.borough = record.borough;
        }
        entry.lon_sum += record.lon;
        entry.lat_sum += record.lat;
        entry.count += 1.0;
    }

    let mut stations: Vec<Station> = merged
        .into_iter()
        .map(|(name, acc)| {
            let mut lines = acc.lines;
            lines.sort();
            Station {
                name,
                lines,
                borough: acc.borough,
                lon: acc.lon_sum / acc.count,
                lat: acc.lat_sum / acc.count,
                catchment: None,
            }
        })
        .collect();
    stations.sort_by(|a, b| a.name.cmp(&b.name));
    stations
}

/// Tally street-network segments in the extract's line layer by category
/// (the `highway` attribute). Reported in the run summary; segments do not
/// flow into the feature table.
pub fn tally_street_segments(path: &Path) -> Result<BTreeMap<String, u64>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let mut tally: BTreeMap<String, u64> = BTreeMap::new();
    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result.context("Error reading shape+record")?;
        match shape {
            Shape::Polyline(_) | Shape::PolylineM(_) | Shape::PolylineZ(_) => {}
            _ => continue,
        }
        let category = character_field(&record, &["highway", "HIGHWAY", "category", "CATEGORY"])
            .unwrap_or_else(|| "unclassified".to_string());
        *tally.entry(category).or_default() += 1;
    }
    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: &str, lines: &str, lon: f64, lat: f64) -> RawStation {
        RawStation { name: name.into(), lines: lines.into(), borough: None, lon, lat }
    }

    #[test]
    fn merge_unions_lines_for_shared_names() {
        let normalizer = NameNormalizer::new();
        let stations = merge_stations(
            vec![
                raw("Canal St", "N/Q", -74.0, 40.72),
                raw("CANAL STREET", "6", -74.0, 40.72),
                raw("Fulton St", "A", -74.01, 40.71),
            ],
            &normalizer,
        );
        assert_eq!(stations.len(), 2);
        let canal = stations.iter().find(|s| s.name == "CANAL ST").unwrap();
        assert_eq!(canal.lines.as_slice(), ["6", "N", "Q"]);
    }

    #[test]
    fn merged_location_is_member_centroid() {
        let normalizer = NameNormalizer::new();
        let stations = merge_stations(
            vec![raw("Canal St", "N", -74.0, 40.0), raw("Canal St", "6", -73.0, 41.0)],
            &normalizer,
        );
        assert_eq!(stations.len(), 1);
        assert!((stations[0].lon - -73.5).abs() < 1e-12);
        assert!((stations[0].lat - 40.5).abs() < 1e-12);
    }

    #[test]
    fn merge_output_is_sorted_by_name() {
        let normalizer = NameNormalizer::new();
        let stations = merge_stations(
            vec![raw("Zerega Av", "6", -73.8, 40.8), raw("Astoria Blvd", "N", -73.9, 40.77)],
            &normalizer,
        );
        assert_eq!(stations[0].name, "ASTORIA BLVD");
        assert_eq!(stations[1].name, "ZEREGA AV");
    }
}
