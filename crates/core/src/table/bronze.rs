use super::YearLabelStyle;
use super::{CODE, NAME, TOTAL};
use crate::records::MunicipalityCode;
use std::collections::{BTreeMap, BTreeSet};

/// Deforested area of one municipality, per year
#[derive(Debug, Clone, PartialEq)]
pub struct BronzeRow {
    pub code: MunicipalityCode,
    pub name: String,
    /// Area in km² keyed by year, ascending
    pub areas: BTreeMap<i32, f64>,
}

impl BronzeRow {
    pub fn new(code: MunicipalityCode, name: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            areas: BTreeMap::new(),
        }
    }

    /// Area for a year; years with no clearing are exactly zero
    pub fn area(&self, year: i32) -> f64 {
        self.areas.get(&year).copied().unwrap_or(0.0)
    }

    /// Row-wise sum of the year columns. Never stored, always derived.
    pub fn total_km2(&self) -> f64 {
        self.areas.values().sum()
    }

    /// Ordered (year, area) pairs
    pub fn year_areas(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.areas.iter().map(|(y, a)| (*y, *a))
    }
}

/// Wide per-municipality, per-year table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BronzeTable {
    years: Vec<i32>,
    rows: Vec<BronzeRow>,
}

impl BronzeTable {
    /// Build a table, zero-filling every row so all rows share the same year set.
    ///
    /// The year set is the union of `years` and every year present in a row.
    pub fn new(years: impl IntoIterator<Item = i32>, mut rows: Vec<BronzeRow>) -> Self {
        let mut all: BTreeSet<i32> = years.into_iter().collect();
        for row in &rows {
            all.extend(row.areas.keys().copied());
        }
        for row in &mut rows {
            for year in &all {
                row.areas.entry(*year).or_insert(0.0);
            }
        }
        Self {
            years: all.into_iter().collect(),
            rows,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Year columns, ascending
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn rows(&self) -> &[BronzeRow] {
        &self.rows
    }

    pub fn into_rows(self) -> (Vec<i32>, Vec<BronzeRow>) {
        (self.years, self.rows)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total deforested area per year across all municipalities
    pub fn annual_totals(&self) -> Vec<(i32, f64)> {
        self.years
            .iter()
            .map(|&y| (y, self.rows.iter().map(|r| r.area(y)).sum()))
            .collect()
    }

    /// CSV header: code, name, one column per year, total
    pub fn header(&self, style: YearLabelStyle) -> Vec<String> {
        let mut header = vec![CODE.to_string(), NAME.to_string()];
        header.extend(self.years.iter().map(|&y| style.format(y)));
        header.push(TOTAL.to_string());
        header
    }
}
