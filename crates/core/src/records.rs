//! Typed records produced by the harmonizer and the overlay engine

use crate::crs::CRS;
use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};
use std::fmt;

/// IBGE municipality code.
///
/// Always an opaque string: numeric coercion would drop leading zeros and
/// break the join between tiers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MunicipalityCode(String);

impl MunicipalityCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MunicipalityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MunicipalityCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One annual clearing polygon
#[derive(Debug, Clone)]
pub struct DeforestationRecord {
    pub id: String,
    pub year: i32,
    /// Area as reported by the source, before overlay
    pub source_area_km2: Option<f64>,
    pub geometry: MultiPolygon<f64>,
}

/// One administrative boundary
#[derive(Debug, Clone)]
pub struct MunicipalityRecord {
    pub code: MunicipalityCode,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
}

/// Part of a clearing polygon falling inside one municipality
#[derive(Debug, Clone)]
pub struct IntersectionRecord {
    pub deforestation_id: String,
    pub year: i32,
    pub code: MunicipalityCode,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    /// Area measured in the equal-area CRS, km²
    pub area_km2: f64,
}

/// Typed layer of records sharing a CRS
#[derive(Debug, Clone)]
pub struct RecordLayer<T> {
    pub crs: Option<CRS>,
    pub records: Vec<T>,
}

impl<T> RecordLayer<T> {
    pub fn new(crs: Option<CRS>, records: Vec<T>) -> Self {
        Self { crs, records }
    }

    pub fn empty() -> Self {
        Self {
            crs: None,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl<T> Default for RecordLayer<T> {
    fn default() -> Self {
        Self::empty()
    }
}

pub type DeforestationLayer = RecordLayer<DeforestationRecord>;
pub type MunicipalityLayer = RecordLayer<MunicipalityRecord>;
