//! Polygon overlay of deforestation records against municipal boundaries
//!
//! Every deforestation polygon is intersected with every municipality whose
//! bounding box it touches. Each non-empty intersection becomes one
//! [`IntersectionRecord`]; a polygon spanning several municipalities yields
//! several records. Area outside every municipality is unattributable and
//! produces nothing.
//!
//! Areas are measured after projecting the intersection into an equal-area
//! CRS, never in the working CRS.
//!
//! Polygons that only touch along an edge or at a vertex have an empty
//! intersection and never yield a record.

use super::measurements::EqualAreaMeter;
use super::spatial::{bounding_box, BoundingBox};
use crate::maybe_rayon::*;
use desmat_core::records::{DeforestationLayer, IntersectionRecord, MunicipalityLayer};
use desmat_core::{Algorithm, Error, Result, CRS};
use geo::BooleanOps;
use tracing::{debug, info};

/// Parameters for the overlay
#[derive(Debug, Clone)]
pub struct OverlayParams {
    /// CRS areas are measured in; must be equal-area
    pub measurement_crs: CRS,
    /// Intersections smaller than this many km² are dropped; `0.0` keeps all
    pub min_area_km2: f64,
}

impl Default for OverlayParams {
    fn default() -> Self {
        Self {
            measurement_crs: CRS::south_america_albers(),
            min_area_km2: 0.0,
        }
    }
}

/// Input pair for [`Overlay`]; both layers must share a CRS
#[derive(Debug, Clone)]
pub struct OverlayInput {
    pub deforestation: DeforestationLayer,
    pub municipalities: MunicipalityLayer,
}

/// Overlay algorithm
#[derive(Debug, Clone, Default)]
pub struct Overlay;

impl Algorithm for Overlay {
    type Input = OverlayInput;
    type Output = Vec<IntersectionRecord>;
    type Params = OverlayParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Overlay"
    }

    fn description(&self) -> &'static str {
        "Intersect deforestation polygons with municipalities and measure equal-area km²"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        overlay(&input.deforestation, &input.municipalities, &params)
    }
}

/// Intersect every deforestation record with every overlapping municipality.
///
/// Output order follows the deforestation records, then the municipalities.
/// Either layer being empty yields no records. A CRS mismatch between the
/// layers is an error: the harmonizer must have reconciled them.
pub fn overlay(
    deforestation: &DeforestationLayer,
    municipalities: &MunicipalityLayer,
    params: &OverlayParams,
) -> Result<Vec<IntersectionRecord>> {
    if deforestation.is_empty() || municipalities.is_empty() {
        info!("overlay: an input layer is empty, no intersections");
        return Ok(Vec::new());
    }

    let working = match (&deforestation.crs, &municipalities.crs) {
        (Some(a), Some(b)) if !a.is_equivalent(b) => {
            return Err(Error::CrsMismatch(a.identifier(), b.identifier()));
        }
        (Some(a), _) | (None, Some(a)) => a.clone(),
        (None, None) => CRS::default(),
    };
    let meter = EqualAreaMeter::new(&working, &params.measurement_crs)?;

    let boxes: Vec<Option<BoundingBox>> = municipalities
        .records
        .iter()
        .map(|m| bounding_box(&m.geometry))
        .collect();

    let min_area_km2 = params.min_area_km2;
    let records: Vec<IntersectionRecord> = deforestation
        .records
        .as_slice()
        .into_par_iter()
        .flat_map(|d| {
            let mut out = Vec::new();
            let Some(d_box) = bounding_box(&d.geometry) else {
                return out;
            };
            for (m, m_box) in municipalities.records.iter().zip(&boxes) {
                if !m_box.is_some_and(|b| b.intersects(&d_box)) {
                    continue;
                }
                let geometry = d.geometry.intersection(&m.geometry);
                if geometry.0.is_empty() {
                    continue;
                }
                let area_km2 = meter.area_km2(&geometry);
                if area_km2 < min_area_km2 {
                    continue;
                }
                out.push(IntersectionRecord {
                    deforestation_id: d.id.clone(),
                    year: d.year,
                    code: m.code.clone(),
                    name: m.name.clone(),
                    geometry,
                    area_km2,
                });
            }
            out
        })
        .collect();

    debug!(
        deforestation = deforestation.len(),
        municipalities = municipalities.len(),
        intersections = records.len(),
        "overlay complete"
    );
    Ok(records)
}
