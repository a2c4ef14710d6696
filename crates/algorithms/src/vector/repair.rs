//! Geometry repair ahead of overlay.
//!
//! Equivalent of a zero-distance buffer: duplicate vertices and degenerate
//! rings are removed, then self-intersections are resolved by a boolean
//! union with the empty set, which rebuilds rings from the planar
//! arrangement of their edges.

use geo::{BooleanOps, Coord, LineString, MultiPolygon, Polygon};

/// Repair a multipolygon. Idempotent; valid input keeps its area.
pub fn repair(geom: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    let cleaned: Vec<Polygon<f64>> = geom.0.iter().filter_map(clean_polygon).collect();
    if cleaned.is_empty() {
        return MultiPolygon::new(vec![]);
    }
    MultiPolygon::new(cleaned).union(&MultiPolygon::new(vec![]))
}

/// Repair a single polygon
pub fn repair_polygon(poly: &Polygon<f64>) -> MultiPolygon<f64> {
    repair(&MultiPolygon::new(vec![poly.clone()]))
}

fn clean_polygon(poly: &Polygon<f64>) -> Option<Polygon<f64>> {
    let exterior = clean_ring(poly.exterior())?;
    let interiors = poly.interiors().iter().filter_map(clean_ring).collect();
    Some(Polygon::new(exterior, interiors))
}

/// Drop repeated consecutive and non-finite vertices; `None` if fewer than
/// three distinct vertices remain
fn clean_ring(ring: &LineString<f64>) -> Option<LineString<f64>> {
    let mut coords: Vec<Coord<f64>> = Vec::with_capacity(ring.0.len());
    for c in ring.coords().filter(|c| c.x.is_finite() && c.y.is_finite()) {
        if coords.last() != Some(c) {
            coords.push(*c);
        }
    }
    while coords.len() > 1 && coords.first() == coords.last() {
        coords.pop();
    }
    if coords.len() < 3 {
        return None;
    }
    if is_collinear(&coords) {
        return None;
    }
    let mut ring = LineString::new(coords);
    ring.close();
    Some(ring)
}

/// A zero-area ring that crosses itself (a figure-eight) still encloses
/// area; only rings whose vertices all lie on one line are degenerate.
fn is_collinear(coords: &[Coord<f64>]) -> bool {
    let (a, b) = (coords[0], coords[1]);
    coords.iter().skip(2).all(|p| {
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        cross == 0.0
    })
}
