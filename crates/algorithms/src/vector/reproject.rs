//! Coordinate transformation between supported CRSs.
//!
//! Every transform goes through geographic coordinates: inverse of the
//! source projection, then forward into the target.

use desmat_core::crs::Projection;
use desmat_core::{Error, Result, CRS};
use geo::{Coord, MapCoords, MultiPolygon};

/// A resolved source → target transform
#[derive(Debug, Clone, Copy)]
pub struct Reprojector {
    from: Projection,
    to: Projection,
}

impl Reprojector {
    /// Resolve both CRSs; an unsupported CRS on either side is an error
    pub fn new(from: &CRS, to: &CRS) -> Result<Self> {
        let from_proj = from.projection().map_err(|e| unresolved(from, to, e))?;
        let to_proj = to.projection().map_err(|e| unresolved(from, to, e))?;
        Ok(Self {
            from: from_proj,
            to: to_proj,
        })
    }

    pub fn from_projections(from: Projection, to: Projection) -> Self {
        Self { from, to }
    }

    /// Whether this transform leaves coordinates unchanged
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    pub fn transform_coord(&self, c: Coord<f64>) -> Coord<f64> {
        let (lon, lat) = self.from.inverse(c.x, c.y);
        let (x, y) = self.to.forward(lon, lat);
        Coord { x, y }
    }

    pub fn transform(&self, geom: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        if self.is_identity() {
            return geom.clone();
        }
        geom.map_coords(|c| self.transform_coord(c))
    }
}

fn unresolved(from: &CRS, to: &CRS, cause: Error) -> Error {
    Error::CrsMismatch(
        from.identifier(),
        format!("{} (cannot reproject: {})", to.identifier(), cause),
    )
}
