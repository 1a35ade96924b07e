use geo::{Area, BooleanOps, BoundingRect, MultiPolygon, Polygon};

use super::tracts::TractData;

/// Demographic aggregate for one catchment: area-weighted average across
/// the tracts that actually overlap it.
#[derive(Debug, Clone)]
pub struct CatchmentProfile {
    pub median_income: f64,
    pub pct_white: f64,
    pub pct_black: f64,
    pub pct_hispanic: f64,
    pub pct_asian: f64,
    pub pct_other: f64,
    pub transit_dependency: f64,
    /// (GEOID, weight) per overlapping tract; weights sum to 1.
    pub tract_weights: Vec<(String, f64)>,
    /// County FIPS prefix of the heaviest tract; used to infer the borough.
    pub dominant_county: String,
}

/// Area-weighted demographic aggregation over the tracts intersecting a
/// catchment. Tracts with zero intersection area are excluded even if
/// adjacent; tracts without a demographic row are skipped and the weights
/// renormalized over the covered remainder. Returns `None` when nothing
/// overlaps.
pub fn aggregate_catchment(catchment: &Polygon<f64>, tracts: &TractData) -> Option<CatchmentProfile> {
    let rect = catchment.bounding_rect()?;
    let catchment_mp = MultiPolygon(vec![catchment.clone()]);

    let mut overlaps: Vec<(usize, f64)> = Vec::new();
    for idx in tracts.geoms.candidates(&rect) {
        if !tracts.profiles.contains_key(&tracts.geoids[idx]) {
            continue;
        }
        let area = catchment_mp.intersection(&tracts.geoms.shapes[idx]).unsigned_area();
        if area > 0.0 {
            overlaps.push((idx, area));
        }
    }
    if overlaps.is_empty() {
        return None;
    }

    let total: f64 = overlaps.iter().map(|(_, area)| area).sum();
    let mut profile = CatchmentProfile {
        median_income: 0.0,
        pct_white: 0.0,
        pct_black: 0.0,
        pct_hispanic: 0.0,
        pct_asian: 0.0,
        pct_other: 0.0,
        transit_dependency: 0.0,
        tract_weights: Vec::with_capacity(overlaps.len()),
        dominant_county: String::new(),
    };

    let mut heaviest = 0.0f64;
    for (idx, area) in overlaps {
        let weight = area / total;
        let geoid = &tracts.geoids[idx];
        let tract = &tracts.profiles[geoid];

        profile.median_income += weight * tract.median_income;
        profile.pct_white += weight * tract.pct_white;
        profile.pct_black += weight * tract.pct_black;
        profile.pct_hispanic += weight * tract.pct_hispanic;
        profile.pct_asian += weight * tract.pct_asian;
        profile.pct_other += weight * tract.pct_other;
        profile.transit_dependency += weight * tract.transit_dependency;
        profile.tract_weights.push((geoid.clone(), weight));

        // Candidates arrive index-sorted, so strict > keeps ties deterministic.
        if weight > heaviest {
            heaviest = weight;
            profile.dominant_county = geoid.get(..5).unwrap_or(geoid).to_string();
        }
    }

    Some(profile)
}

/// NYC county FIPS to borough.
pub fn county_to_borough(county_fips: &str) -> Option<&'static str> {
    match county_fips {
        "36005" => Some("Bronx"),
        "36047" => Some("Brooklyn"),
        "36061" => Some("Manhattan"),
        "36081" => Some("Queens"),
        "36085" => Some("Staten Island"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demog::tracts::DemographicProfile;
    use crate::geo::Geometries;
    use ahash::AHashMap;
    use geo::polygon;

    fn square(x0: f64, x1: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: x0, y: 0.0),
            (x: x1, y: 0.0),
            (x: x1, y: 1000.0),
            (x: x0, y: 1000.0),
        ]])
    }

    fn tract(geoid: &str, income: f64, white: f64, dependency: f64) -> DemographicProfile {
        let remainder = (1.0 - white) / 4.0;
        DemographicProfile {
            geoid: geoid.into(),
            median_income: income,
            pct_white: white,
            pct_black: remainder,
            pct_hispanic: remainder,
            pct_asian: remainder,
            pct_other: remainder,
            transit_dependency: dependency,
        }
    }

    fn tract_data() -> TractData {
        let geoids = vec!["36061000100".to_string(), "36047000200".to_string()];
        let geoms = Geometries::new(vec![square(0.0, 1000.0), square(1000.0, 2000.0)]);
        let mut profiles = AHashMap::new();
        profiles.insert(geoids[0].clone(), tract(&geoids[0], 100_000.0, 0.8, 0.2));
        profiles.insert(geoids[1].clone(), tract(&geoids[1], 40_000.0, 0.2, 0.8));
        TractData { geoids, geoms, profiles }
    }

    #[test]
    fn weights_sum_to_one_within_tolerance() {
        let tracts = tract_data();
        // Catchment straddles both tracts: 750m in the first, 250m in the second.
        let catchment = polygon![
            (x: 250.0, y: 100.0),
            (x: 1250.0, y: 100.0),
            (x: 1250.0, y: 900.0),
            (x: 250.0, y: 900.0),
        ];
        let profile = aggregate_catchment(&catchment, &tracts).unwrap();
        let weight_sum: f64 = profile.tract_weights.iter().map(|(_, w)| w).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);

        let race_sum = profile.pct_white
            + profile.pct_black
            + profile.pct_hispanic
            + profile.pct_asian
            + profile.pct_other;
        assert!((race_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn aggregation_is_area_weighted() {
        let tracts = tract_data();
        let catchment = polygon![
            (x: 250.0, y: 100.0),
            (x: 1250.0, y: 100.0),
            (x: 1250.0, y: 900.0),
            (x: 250.0, y: 900.0),
        ];
        let profile = aggregate_catchment(&catchment, &tracts).unwrap();
        // 75% of the catchment is in the richer tract.
        let expected_income = 0.75 * 100_000.0 + 0.25 * 40_000.0;
        assert!((profile.median_income - expected_income).abs() < 1.0);
        assert_eq!(profile.dominant_county, "36061");
    }

    #[test]
    fn zero_area_neighbors_are_excluded() {
        let tracts = tract_data();
        // Shares only the x=1000 edge with the second tract.
        let catchment = polygon![
            (x: 200.0, y: 100.0),
            (x: 1000.0, y: 100.0),
            (x: 1000.0, y: 900.0),
            (x: 200.0, y: 900.0),
        ];
        let profile = aggregate_catchment(&catchment, &tracts).unwrap();
        assert_eq!(profile.tract_weights.len(), 1);
        assert_eq!(profile.tract_weights[0].0, "36061000100");
    }

    #[test]
    fn no_overlap_returns_none() {
        let tracts = tract_data();
        let catchment = polygon![
            (x: 5000.0, y: 5000.0),
            (x: 5100.0, y: 5000.0),
            (x: 5100.0, y: 5100.0),
            (x: 5000.0, y: 5100.0),
        ];
        assert!(aggregate_catchment(&catchment, &tracts).is_none());
    }

    #[test]
    fn county_lookup_covers_the_five_boroughs() {
        assert_eq!(county_to_borough("36061"), Some("Manhattan"));
        assert_eq!(county_to_borough("36047"), Some("Brooklyn"));
        assert_eq!(county_to_borough("36081"), Some("Queens"));
        assert_eq!(county_to_borough("36005"), Some("Bronx"));
        assert_eq!(county_to_borough("36085"), Some("Staten Island"));
        assert_eq!(county_to_borough("17031"), None);
    }
}
