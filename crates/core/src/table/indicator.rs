use crate::error::{Error, Result};
use crate::records::MunicipalityCode;
use crate::vector::AttributeValue;
use std::collections::HashMap;
use tracing::warn;

const DATASET: &str = "indicator table";

/// Indicator values for one municipality
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRecord {
    pub area_km2: Option<f64>,
    /// Aligned with [`IndicatorTable::columns`]
    pub values: Vec<AttributeValue>,
}

/// External socioeconomic table keyed by municipality code
#[derive(Debug, Clone, Default)]
pub struct IndicatorTable {
    columns: Vec<String>,
    records: HashMap<MunicipalityCode, IndicatorRecord>,
}

impl IndicatorTable {
    /// Build from raw text rows.
    ///
    /// `code_field` is kept as an opaque string; `area_field` becomes the
    /// municipality area; all other columns are indicators, in source order.
    /// Rows with an empty code are skipped. Repeated codes are an error: the
    /// left join must yield exactly one Silver row per municipality.
    pub fn from_text_rows<I>(
        header: &[String],
        rows: I,
        code_field: &str,
        area_field: &str,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = Vec<String>>,
    {
        let position = |name: &str| {
            header
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| Error::missing_column(DATASET, name))
        };
        let code_idx = position(code_field)?;
        let area_idx = position(area_field)?;

        let indicator_idx: Vec<usize> = (0..header.len())
            .filter(|&i| i != code_idx && i != area_idx)
            .collect();
        let columns = indicator_idx.iter().map(|&i| header[i].clone()).collect();

        let mut records = HashMap::new();
        let mut skipped = 0usize;
        for row in rows {
            let cell = |i: usize| row.get(i).map(String::as_str).unwrap_or("");
            let code = cell(code_idx).trim();
            if code.is_empty() {
                skipped += 1;
                continue;
            }
            let code = MunicipalityCode::new(code);

            let area_km2 = match AttributeValue::infer(cell(area_idx)) {
                AttributeValue::Null => None,
                v => Some(
                    v.as_f64()
                        .ok_or_else(|| Error::invalid_value(DATASET, area_field, cell(area_idx)))?,
                ),
            };
            let values = indicator_idx
                .iter()
                .map(|&i| AttributeValue::infer(cell(i)))
                .collect();

            if records
                .insert(code.clone(), IndicatorRecord { area_km2, values })
                .is_some()
            {
                return Err(Error::duplicate_key(DATASET, code.as_str()));
            }
        }
        if skipped > 0 {
            warn!("{}: skipped {} rows without a municipality code", DATASET, skipped);
        }

        Ok(Self { columns, records })
    }

    /// Indicator column names, in source order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn get(&self, code: &MunicipalityCode) -> Option<&IndicatorRecord> {
        self.records.get(code)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
