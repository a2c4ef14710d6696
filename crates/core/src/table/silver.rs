use super::{parse_year_label, BronzeRow, YearLabelStyle};
use super::{CODE, MUNICIPALITY_AREA, NAME, PROPORTION, TOTAL};
use crate::vector::AttributeValue;

/// A Bronze row enriched with socioeconomic context
#[derive(Debug, Clone, PartialEq)]
pub struct SilverRow {
    pub municipality: BronzeRow,
    /// `None` when the municipality is absent from the indicator source
    pub municipality_area_km2: Option<f64>,
    /// Aligned with [`SilverTable::indicator_columns`]; all null when absent
    pub indicators: Vec<AttributeValue>,
}

impl SilverRow {
    /// Total deforested area over municipality area.
    ///
    /// Undefined (`None`) when the area is missing, zero or not finite.
    pub fn deforestation_proportion(&self) -> Option<f64> {
        let area = self.municipality_area_km2?;
        if area == 0.0 || !area.is_finite() {
            return None;
        }
        let p = self.municipality.total_km2() / area;
        p.is_finite().then_some(p)
    }
}

/// Bronze left-joined with indicators
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SilverTable {
    years: Vec<i32>,
    indicator_columns: Vec<String>,
    rows: Vec<SilverRow>,
}

impl SilverTable {
    pub fn new(years: Vec<i32>, indicator_columns: Vec<String>, rows: Vec<SilverRow>) -> Self {
        Self {
            years,
            indicator_columns,
            rows,
        }
    }

    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn indicator_columns(&self) -> &[String] {
        &self.indicator_columns
    }

    pub fn rows(&self) -> &[SilverRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Keep only the rows matching `keep`
    pub fn retain(mut self, keep: impl FnMut(&SilverRow) -> bool) -> Self {
        self.rows.retain(keep);
        self
    }

    fn indicator_index(&self, name: &str) -> Option<usize> {
        self.indicator_columns.iter().position(|c| c == name)
    }

    /// Numeric view of a column by name; `None` if no such column exists.
    ///
    /// Non-numeric cells read as null.
    pub fn numeric_column(&self, name: &str) -> Option<Vec<Option<f64>>> {
        let values = match name {
            TOTAL => self.rows.iter().map(|r| Some(r.municipality.total_km2())).collect(),
            MUNICIPALITY_AREA => self.rows.iter().map(|r| r.municipality_area_km2).collect(),
            PROPORTION => self.rows.iter().map(|r| r.deforestation_proportion()).collect(),
            CODE | NAME => return None,
            _ => {
                if let Some(i) = self.indicator_index(name) {
                    self.rows.iter().map(|r| r.indicators[i].as_f64()).collect()
                } else {
                    let year = parse_year_label(name).filter(|y| self.years.contains(y))?;
                    self.rows.iter().map(|r| Some(r.municipality.area(year))).collect()
                }
            }
        };
        Some(values)
    }

    /// Text view of a column by name; `None` if no such column exists
    pub fn text_column(&self, name: &str) -> Option<Vec<Option<String>>> {
        let values = match name {
            CODE => self
                .rows
                .iter()
                .map(|r| Some(r.municipality.code.to_string()))
                .collect(),
            NAME => self.rows.iter().map(|r| Some(r.municipality.name.clone())).collect(),
            _ => {
                let i = self.indicator_index(name)?;
                self.rows
                    .iter()
                    .map(|r| r.indicators[i].as_key().map(|_| r.indicators[i].to_string()))
                    .collect()
            }
        };
        Some(values)
    }

    /// Whether a column of that name exists
    pub fn has_column(&self, name: &str) -> bool {
        self.numeric_column(name).is_some() || self.text_column(name).is_some()
    }

    /// CSV header: Bronze columns, municipality area, indicators, proportion
    pub fn header(&self, style: YearLabelStyle) -> Vec<String> {
        let mut header = vec![CODE.to_string(), NAME.to_string()];
        header.extend(self.years.iter().map(|&y| style.format(y)));
        header.push(TOTAL.to_string());
        header.push(MUNICIPALITY_AREA.to_string());
        header.extend(self.indicator_columns.iter().cloned());
        header.push(PROPORTION.to_string());
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silver_row(code: &str, total: f64, area: Option<f64>, ips: Option<f64>) -> SilverRow {
        let mut m = BronzeRow::new(code.into(), "X");
        m.areas.insert(2020, total);
        SilverRow {
            municipality: m,
            municipality_area_km2: area,
            indicators: vec![ips.map_or(AttributeValue::Null, AttributeValue::Float)],
        }
    }

    #[test]
    fn test_proportion_guards_division() {
        assert_eq!(silver_row("1", 5.0, Some(100.0), None).deforestation_proportion(), Some(0.05));
        assert_eq!(silver_row("1", 5.0, Some(0.0), None).deforestation_proportion(), None);
        assert_eq!(silver_row("1", 5.0, None, None).deforestation_proportion(), None);
    }

    #[test]
    fn test_numeric_columns() {
        let table = SilverTable::new(
            vec![2020],
            vec!["IPS".into()],
            vec![
                silver_row("1", 5.0, Some(50.0), Some(61.0)),
                silver_row("2", 1.0, None, None),
            ],
        );
        assert_eq!(table.numeric_column("desmat_prop").unwrap(), vec![Some(0.1), None]);
        assert_eq!(table.numeric_column("IPS").unwrap(), vec![Some(61.0), None]);
        assert_eq!(table.numeric_column("2020.0").unwrap(), vec![Some(5.0), Some(1.0)]);
        assert!(table.numeric_column("2019").is_none());
        assert!(table.numeric_column("missing").is_none());
        assert!(table.has_column("NM_MUN"));
    }
}
