use geo::{BoundingRect, MultiPolygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

#[derive(Debug, Clone)]
pub struct BoundingBox {
    pub idx: usize, // Index of corresponding MultiPolygon in shapes
    pub bbox: Rect<f64>,
}

impl RTreeObject for BoundingBox {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bbox.min().into(), self.bbox.max().into())
    }
}

/// A collection of MultiPolygons with a bulk-loaded R-tree for fast
/// candidate queries by bounding box.
#[derive(Debug, Clone)]
pub struct Geometries {
    pub shapes: Vec<MultiPolygon<f64>>,
    pub rtree: RTree<BoundingBox>,
}

impl Geometries {
    /// Construct a Geometries object from a vector of MultiPolygons.
    /// Degenerate shapes without a bounding rect stay addressable by index
    /// but never appear as candidates.
    pub fn new(polygons: Vec<MultiPolygon<f64>>) -> Self {
        Self {
            rtree: RTree::bulk_load(
                polygons
                    .iter()
                    .enumerate()
                    .filter_map(|(i, poly)| poly.bounding_rect().map(|bbox| BoundingBox { idx: i, bbox }))
                    .collect(),
            ),
            shapes: polygons,
        }
    }

    #[inline] pub fn len(&self) -> usize { self.shapes.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.shapes.is_empty() }

    /// Indices of shapes whose bounding box intersects `rect`, in ascending
    /// order so downstream iteration is deterministic.
    pub fn candidates(&self, rect: &Rect<f64>) -> Vec<usize> {
        let search = AABB::from_corners(rect.min().into(), rect.max().into());
        let mut indices: Vec<usize> = self
            .rtree
            .locate_in_envelope_intersecting(&search)
            .map(|bb| bb.idx)
            .collect();
        indices.sort_unstable();
        indices
    }
}

/// Convert shapefile::Polygon to geo::MultiPolygon<f64>, grouping each
/// exterior ring (CW in shapefile convention) with the holes that follow it.
pub fn shp_to_multipolygon(p: &shapefile::Polygon) -> MultiPolygon<f64> {
    fn ensure_closed(coords: &mut Vec<geo::Coord<f64>>) {
        if !coords.is_empty() && coords[0] != coords[coords.len() - 1] {
            coords.push(coords[0]);
        }
    }

    fn signed_area(pts: &[geo::Coord<f64>]) -> f64 {
        let mut area = 0.0;
        for w in pts.windows(2) {
            area += w[0].x * w[1].y - w[1].x * w[0].y;
        }
        area / 2.0
    }

    let mut polys: Vec<geo::Polygon<f64>> = Vec::new();
    let mut current_exterior: Option<geo::LineString<f64>> = None;
    let mut current_holes: Vec<geo::LineString<f64>> = Vec::new();

    for ring in p.rings() {
        let mut coords: Vec<geo::Coord<f64>> =
            ring.points().iter().map(|pt| geo::Coord { x: pt.x, y: pt.y }).collect();
        ensure_closed(&mut coords);
        let is_exterior = signed_area(&coords) < 0.0;
        let ls = geo::LineString(coords);

        if is_exterior {
            if let Some(ext) = current_exterior.take() {
                polys.push(geo::Polygon::new(ext, std::mem::take(&mut current_holes)));
            }
            current_exterior = Some(ls);
        } else {
            current_holes.push(ls);
        }
    }
    if let Some(ext) = current_exterior {
        polys.push(geo::Polygon::new(ext, current_holes));
    }

    MultiPolygon(polys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Coord};

    fn unit_square(offset: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: offset, y: 0.0),
            (x: offset + 1.0, y: 0.0),
            (x: offset + 1.0, y: 1.0),
            (x: offset, y: 1.0),
        ]])
    }

    #[test]
    fn candidates_are_sorted_and_bounded() {
        let geoms = Geometries::new(vec![unit_square(0.0), unit_square(2.0), unit_square(10.0)]);
        let rect = Rect::new(Coord { x: 0.5, y: 0.5 }, Coord { x: 2.5, y: 0.9 });
        assert_eq!(geoms.candidates(&rect), vec![0, 1]);
    }

    #[test]
    fn disjoint_rect_has_no_candidates() {
        let geoms = Geometries::new(vec![unit_square(0.0)]);
        let rect = Rect::new(Coord { x: 5.0, y: 5.0 }, Coord { x: 6.0, y: 6.0 });
        assert!(geoms.candidates(&rect).is_empty());
    }
}
