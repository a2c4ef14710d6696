//! Geometry harmonization
//!
//! Brings the two loaded layers into a state the overlay can consume:
//!
//! 1. Region filter on the deforestation layer (skipped when the region
//!    attribute is absent)
//! 2. Schema projection onto typed records, renaming the source identifier
//! 3. CRS reconciliation: the municipal layer is reprojected into the
//!    deforestation CRS when both are non-empty and differ
//! 4. Geometry repair on both layers

mod schema;

pub use schema::to_multi_polygon;

use crate::maybe_rayon::*;
use crate::vector::{repair, Reprojector};
use desmat_core::records::{DeforestationLayer, MunicipalityLayer, RecordLayer};
use desmat_core::vector::VectorLayer;
use desmat_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Attribute names of the source layers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    /// Source-specific identifier renamed to `id`
    pub source_id: String,
    pub id: String,
    pub year: String,
    /// Source-reported area, km²
    pub area: String,
    pub code: String,
    pub name: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            source_id: "uuid".into(),
            id: "id_desmat".into(),
            year: "year".into(),
            area: "area_km".into(),
            code: "CD_MUN".into(),
            name: "NM_MUN".into(),
        }
    }
}

/// Parameters for harmonization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmonizeParams {
    /// Deforestation attribute holding the region code
    pub region_field: String,
    /// Region code to keep
    pub region: String,
    pub fields: FieldNames,
}

impl Default for HarmonizeParams {
    fn default() -> Self {
        Self {
            region_field: "state".into(),
            region: "PA".into(),
            fields: FieldNames::default(),
        }
    }
}

/// What harmonization discarded or changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HarmonizeReport {
    pub region_filtered: usize,
    pub dropped_missing_id: usize,
    pub dropped_missing_year: usize,
    pub dropped_missing_code: usize,
    pub dropped_non_polygonal: usize,
    /// Geometries that vanished under repair (collinear or empty rings)
    pub dropped_empty_after_repair: usize,
    pub reprojected_municipalities: bool,
}

impl HarmonizeReport {
    pub fn dropped(&self) -> usize {
        self.dropped_missing_id
            + self.dropped_missing_year
            + self.dropped_missing_code
            + self.dropped_non_polygonal
            + self.dropped_empty_after_repair
    }
}

/// Input pair for [`Harmonize`]
#[derive(Debug, Clone, Default)]
pub struct HarmonizeInput {
    pub deforestation: VectorLayer,
    pub municipalities: VectorLayer,
}

/// Harmonized layers ready for overlay
#[derive(Debug, Clone)]
pub struct Harmonized {
    pub deforestation: DeforestationLayer,
    pub municipalities: MunicipalityLayer,
    pub report: HarmonizeReport,
}

/// Harmonization algorithm
#[derive(Debug, Clone, Default)]
pub struct Harmonize;

impl Algorithm for Harmonize {
    type Input = HarmonizeInput;
    type Output = Harmonized;
    type Params = HarmonizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Harmonize"
    }

    fn description(&self) -> &'static str {
        "Region filter, schema projection, CRS reconciliation and geometry repair"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        harmonize(input.deforestation, input.municipalities, &params)
    }
}

/// Harmonize both layers.
///
/// Missing required columns on a non-empty layer, duplicate municipality
/// codes and an unresolvable CRS difference are errors. Empty layers pass
/// through untouched.
pub fn harmonize(
    deforestation: VectorLayer,
    municipalities: VectorLayer,
    params: &HarmonizeParams,
) -> Result<Harmonized> {
    let mut report = HarmonizeReport::default();
    let fields = &params.fields;

    let deforestation = filter_region(deforestation, params, &mut report);
    let deforestation = if deforestation.has_column(&fields.source_id) {
        deforestation.rename_column(&fields.source_id, &fields.id)
    } else {
        deforestation
    };

    let def_crs = deforestation.crs.clone();
    let mun_crs = municipalities.crs.clone();
    let mut def_records = schema::deforestation_records(deforestation, fields, &mut report)?;
    let mut mun_records = schema::municipality_records(municipalities, fields, &mut report)?;

    let mut working_mun_crs = mun_crs.clone();
    if !def_records.is_empty() && !mun_records.is_empty() {
        if let (Some(target), Some(source)) = (&def_crs, &mun_crs) {
            if !target.is_equivalent(source) {
                let reprojector = Reprojector::new(source, target)?;
                info!("reprojecting municipal layer {} -> {}", source, target);
                for m in &mut mun_records {
                    m.geometry = reprojector.transform(&m.geometry);
                }
                working_mun_crs = Some(target.clone());
                report.reprojected_municipalities = true;
            }
        }
    }

    def_records = def_records
        .into_par_iter()
        .map(|mut d| {
            d.geometry = repair(&d.geometry);
            d
        })
        .collect();
    mun_records = mun_records
        .into_par_iter()
        .map(|mut m| {
            m.geometry = repair(&m.geometry);
            m
        })
        .collect();

    let before = def_records.len() + mun_records.len();
    def_records.retain(|d| !d.geometry.0.is_empty());
    mun_records.retain(|m| !m.geometry.0.is_empty());
    report.dropped_empty_after_repair = before - def_records.len() - mun_records.len();

    if report.dropped() > 0 {
        info!(
            missing_id = report.dropped_missing_id,
            missing_year = report.dropped_missing_year,
            missing_code = report.dropped_missing_code,
            non_polygonal = report.dropped_non_polygonal,
            empty_after_repair = report.dropped_empty_after_repair,
            "harmonize dropped {} records",
            report.dropped()
        );
    }
    debug!(
        deforestation = def_records.len(),
        municipalities = mun_records.len(),
        "harmonized"
    );

    Ok(Harmonized {
        deforestation: RecordLayer::new(def_crs, def_records),
        municipalities: RecordLayer::new(working_mun_crs, mun_records),
        report,
    })
}

fn filter_region(
    mut layer: VectorLayer,
    params: &HarmonizeParams,
    report: &mut HarmonizeReport,
) -> VectorLayer {
    if !layer.has_column(&params.region_field) {
        debug!("no '{}' attribute, region filter skipped", params.region_field);
        return layer;
    }
    let before = layer.len();
    layer.features.retain(|f| {
        f.get_property(&params.region_field)
            .and_then(|v| v.as_key())
            .is_some_and(|k| k == params.region)
    });
    report.region_filtered = before - layer.len();
    info!(
        "region filter {}={}: kept {} of {} deforestation records",
        params.region_field,
        params.region,
        layer.len(),
        before
    );
    layer
}
