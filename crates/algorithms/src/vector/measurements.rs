//! Area measurement.
//!
//! Planar area is only meaningful as ground area in an equal-area
//! projection, so intersection areas go through [`EqualAreaMeter`].

use super::reproject::Reprojector;
use desmat_core::{Error, Result, CRS};
use geo::{Area as GeoArea, MultiPolygon};

const M2_PER_KM2: f64 = 1_000_000.0;

/// Unsigned planar area in CRS units squared
pub fn area(geom: &MultiPolygon<f64>) -> f64 {
    geom.unsigned_area()
}

/// Measures geometries of a working CRS in km² of an equal-area CRS
#[derive(Debug, Clone, Copy)]
pub struct EqualAreaMeter {
    to_equal_area: Reprojector,
}

impl EqualAreaMeter {
    /// Fails when `equal_area` is not an equal-area projection or either CRS
    /// cannot be resolved
    pub fn new(working: &CRS, equal_area: &CRS) -> Result<Self> {
        if !equal_area.is_equal_area() {
            return Err(Error::InvalidParameter {
                name: "measurement_crs",
                value: equal_area.identifier(),
                reason: "not an equal-area projection".into(),
            });
        }
        Ok(Self {
            to_equal_area: Reprojector::new(working, equal_area)?,
        })
    }

    /// Area in km², never negative
    pub fn area_km2(&self, geom: &MultiPolygon<f64>) -> f64 {
        area(&self.to_equal_area.transform(geom)) / M2_PER_KM2
    }
}
