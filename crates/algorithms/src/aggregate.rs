//! Aggregation of intersections into the Bronze tier
//!
//! Intersection areas are summed per (municipality code, name, year), then
//! pivoted wide: one row per municipality, one column per observed year,
//! zero-filled. The total is always the row sum, never stored separately.

use desmat_core::records::IntersectionRecord;
use desmat_core::table::{BronzeRow, BronzeTable};
use desmat_core::{Algorithm, Error, MunicipalityCode, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Summed intersection area of one municipality in one year
#[derive(Debug, Clone, PartialEq)]
pub struct MunicipalYearAggregate {
    pub code: MunicipalityCode,
    pub name: String,
    pub year: i32,
    pub area_km2: f64,
}

/// Parameters for aggregation
#[derive(Debug, Clone, Default)]
pub struct AggregateParams {
    /// Year columns to emit even when no intersection falls in them
    pub extra_years: Vec<i32>,
}

/// Aggregation algorithm
#[derive(Debug, Clone, Default)]
pub struct Aggregate;

impl Algorithm for Aggregate {
    type Input = Vec<IntersectionRecord>;
    type Output = BronzeTable;
    type Params = AggregateParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Aggregate"
    }

    fn description(&self) -> &'static str {
        "Sum intersection areas by municipality and year and pivot into the Bronze table"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(aggregate(&input, &params))
    }
}

/// Group intersections by (code, name, year), sorted by that key
pub fn group_by_municipality_year(records: &[IntersectionRecord]) -> Vec<MunicipalYearAggregate> {
    let mut groups: BTreeMap<(&MunicipalityCode, &str, i32), f64> = BTreeMap::new();
    for r in records {
        *groups.entry((&r.code, r.name.as_str(), r.year)).or_insert(0.0) += r.area_km2;
    }
    groups
        .into_iter()
        .map(|((code, name, year), area_km2)| MunicipalYearAggregate {
            code: code.clone(),
            name: name.to_string(),
            year,
            area_km2,
        })
        .collect()
}

/// Pivot municipal-year aggregates into the wide Bronze table.
///
/// Rows are keyed by (code, name) in ascending order; the year set is every
/// year present in the aggregates plus `extra_years`.
pub fn pivot(aggregates: &[MunicipalYearAggregate], extra_years: &[i32]) -> BronzeTable {
    let mut rows: BTreeMap<(&MunicipalityCode, &str), BronzeRow> = BTreeMap::new();
    for a in aggregates {
        let row = rows
            .entry((&a.code, a.name.as_str()))
            .or_insert_with(|| BronzeRow::new(a.code.clone(), a.name.clone()));
        *row.areas.entry(a.year).or_insert(0.0) += a.area_km2;
    }
    BronzeTable::new(extra_years.iter().copied(), rows.into_values().collect())
}

/// Intersections → Bronze table
pub fn aggregate(records: &[IntersectionRecord], params: &AggregateParams) -> BronzeTable {
    let groups = group_by_municipality_year(records);
    let table = pivot(&groups, &params.extra_years);
    debug!(
        intersections = records.len(),
        groups = groups.len(),
        municipalities = table.len(),
        years = table.years().len(),
        "aggregated"
    );
    table
}
