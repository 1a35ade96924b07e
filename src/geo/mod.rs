mod catchment;
mod extract;
mod geom;
mod proj;

pub use catchment::catchment_polygon;
pub use extract::{merge_stations, read_stations, tally_street_segments, RawStation};
pub use geom::{shp_to_multipolygon, BoundingBox, Geometries};
pub use proj::{Datum, MetricProjection};

use geo::Polygon;
use smallvec::SmallVec;

/// A subway station after identity merge: one record per canonical name,
/// carrying the union of lines observed across the map extract.
#[derive(Debug, Clone)]
pub struct Station {
    /// Canonical name, unique across the merged registry.
    pub name: String,
    pub lines: SmallVec<[String; 4]>,
    pub borough: Option<String>,
    pub lon: f64,
    pub lat: f64,
    /// Catchment polygon in UTM meters, filled in by the extract stage.
    pub catchment: Option<Polygon<f64>>,
}
