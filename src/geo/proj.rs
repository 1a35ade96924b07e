use anyhow::{anyhow, Context, Result};
use geo::{Coord, MapCoords, MultiPolygon};
use proj4rs::{proj::Proj as Proj4, transform::transform};

/// Geographic datum of a dataset's lon/lat coordinates. Map extracts are
/// WGS84; TIGER census geometries are NAD83.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    Wgs84,
    Nad83,
}

impl Datum {
    fn proj4(&self) -> &'static str {
        match self {
            Datum::Nad83 => "+proj=longlat +datum=NAD83 +no_defs +type=crs",
            Datum::Wgs84 => "+proj=longlat +datum=WGS84 +no_defs +type=crs",
        }
    }
}

/// Build PROJ.4 string for the target UTM CRS, chosen from a lon/lat center.
fn utm_proj4(center: Coord<f64>) -> String {
    let zone = (((center.x + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u32;
    let south = if center.y >= 0.0 { "" } else { " +south" };
    format!("+proj=utm +zone={zone}{south} +datum=WGS84 +units=m +no_defs +type=crs")
}

/// Reprojection from a geographic CRS into UTM meters. One projection is
/// fixed per pipeline run (zone picked from the station center) so every
/// geometry lands in the same metric plane and overlap areas are comparable.
pub struct MetricProjection {
    from: Proj4,
    to: Proj4,
}

impl MetricProjection {
    pub fn new(datum: Datum, center: Coord<f64>) -> Result<Self> {
        let from = Proj4::from_proj_string(datum.proj4())
            .with_context(|| anyhow!("failed to build source PROJ.4: {}", datum.proj4()))?;
        let target = utm_proj4(center);
        let to = Proj4::from_proj_string(&target)
            .with_context(|| anyhow!("failed to build target PROJ.4: {target}"))?;
        Ok(Self { from, to })
    }

    /// Project a single lon/lat point to UTM meters.
    pub fn project_point(&self, lonlat: Coord<f64>) -> Result<Coord<f64>> {
        let mut point = (lonlat.x.to_radians(), lonlat.y.to_radians(), 0.0);
        transform(&self.from, &self.to, &mut point)
            .map_err(|e| anyhow!("CRS transform failed at {:?}: {e:?}", lonlat))?;
        Ok(Coord { x: point.0, y: point.1 })
    }

    /// Reproject a MultiPolygon from lon/lat to UTM meters.
    pub fn project_multipolygon(&self, shape: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        // Map coords -> radians in, meters out.
        shape.map_coords(|coord: Coord<f64>| {
            let mut point = (coord.x.to_radians(), coord.y.to_radians(), 0.0);
            transform(&self.from, &self.to, &mut point)
                .expect("CRS transform failed");
            Coord { x: point.0, y: point.1 }
        })
    }
}
