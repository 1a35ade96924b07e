use geo::{Coord, LineString, Polygon};

/// Regular-polygon approximation of the catchment disc around a station,
/// in UTM meters. Recomputing with the same center, radius, and segment
/// count yields the identical polygon.
pub fn catchment_polygon(center: Coord<f64>, radius_m: f64, segments: usize) -> Polygon<f64> {
    let n = segments.max(8);
    let mut coords = Vec::with_capacity(n + 1);
    for i in 0..n {
        let theta = (i as f64) * std::f64::consts::TAU / (n as f64);
        coords.push(Coord {
            x: center.x + radius_m * theta.cos(),
            y: center.y + radius_m * theta.sin(),
        });
    }
    coords.push(coords[0]);
    Polygon::new(LineString::from(coords), vec![])
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    const CENTER: Coord<f64> = Coord { x: 585_000.0, y: 4_511_000.0 };

    #[test]
    fn recomputation_is_idempotent() {
        let first = catchment_polygon(CENTER, 500.0, 64);
        let second = catchment_polygon(CENTER, 500.0, 64);
        assert_eq!(first, second);
    }

    #[test]
    fn ring_is_closed_with_expected_vertex_count() {
        let poly = catchment_polygon(CENTER, 500.0, 64);
        let ring = poly.exterior();
        assert_eq!(ring.0.len(), 65);
        assert_eq!(ring.0.first(), ring.0.last());
    }

    #[test]
    fn vertices_sit_on_the_radius() {
        let poly = catchment_polygon(CENTER, 500.0, 64);
        for coord in &poly.exterior().0 {
            let dist = ((coord.x - CENTER.x).powi(2) + (coord.y - CENTER.y).powi(2)).sqrt();
            assert!((dist - 500.0).abs() < 1e-6);
        }
    }

    #[test]
    fn area_approximates_the_disc() {
        let poly = catchment_polygon(CENTER, 500.0, 64);
        let disc = std::f64::consts::PI * 500.0 * 500.0;
        let ratio = poly.unsigned_area() / disc;
        assert!(ratio > 0.99 && ratio <= 1.0, "ratio {ratio}");
    }

    #[test]
    fn segment_floor_keeps_polygon_areal() {
        let poly = catchment_polygon(CENTER, 500.0, 3);
        assert_eq!(poly.exterior().0.len(), 9);
    }
}
