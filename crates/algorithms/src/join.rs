//! Socioeconomic join: Bronze ⟕ indicators → Silver
//!
//! Left join on the municipality code, compared as opaque strings. Every
//! Bronze row survives exactly once; municipalities missing from the
//! indicator table get null indicators and a null area.

use desmat_core::table::{
    parse_year_label, BronzeTable, IndicatorTable, SilverRow, SilverTable, CODE,
    COLLISION_SUFFIX, MUNICIPALITY_AREA, NAME, PROPORTION, TOTAL,
};
use desmat_core::{Algorithm, AttributeValue, Error, Result};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Input pair for [`Join`]
#[derive(Debug, Clone, Default)]
pub struct JoinInput {
    pub bronze: BronzeTable,
    pub indicators: IndicatorTable,
}

/// Socioeconomic join algorithm
#[derive(Debug, Clone, Default)]
pub struct Join;

impl Algorithm for Join {
    type Input = JoinInput;
    type Output = SilverTable;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Join"
    }

    fn description(&self) -> &'static str {
        "Left-join the Bronze table with socioeconomic indicators by municipality code"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        Ok(join(&input.bronze, &input.indicators))
    }
}

/// Left-join Bronze with the indicator table.
///
/// Indicator columns whose names clash with a Silver column (code, name, a
/// year label, total, area or proportion) are suffixed so the Silver header
/// stays unambiguous. The suffix is repeated until the new name is taken by
/// neither another indicator column nor a Silver column.
pub fn join(bronze: &BronzeTable, indicators: &IndicatorTable) -> SilverTable {
    let mut taken: HashSet<String> = indicators.columns().iter().cloned().collect();
    let columns: Vec<String> = indicators
        .columns()
        .iter()
        .map(|c| {
            if !is_reserved(c) {
                return c.clone();
            }
            let mut renamed = format!("{}{}", c, COLLISION_SUFFIX);
            while is_reserved(&renamed) || taken.contains(&renamed) {
                renamed.push_str(COLLISION_SUFFIX);
            }
            warn!("indicator column '{}' clashes with a Silver column, renamed to '{}'", c, renamed);
            taken.insert(renamed.clone());
            renamed
        })
        .collect();

    let mut matched = 0usize;
    let rows: Vec<SilverRow> = bronze
        .rows()
        .iter()
        .map(|row| match indicators.get(&row.code) {
            Some(rec) => {
                matched += 1;
                SilverRow {
                    municipality: row.clone(),
                    municipality_area_km2: rec.area_km2,
                    indicators: rec.values.clone(),
                }
            }
            None => SilverRow {
                municipality: row.clone(),
                municipality_area_km2: None,
                indicators: vec![AttributeValue::Null; columns.len()],
            },
        })
        .collect();

    if matched < rows.len() {
        warn!(
            "{} of {} municipalities have no indicator record",
            rows.len() - matched,
            rows.len()
        );
    }
    debug!(rows = rows.len(), matched, indicators = columns.len(), "joined");

    SilverTable::new(bronze.years().to_vec(), columns, rows)
}

fn is_reserved(name: &str) -> bool {
    matches!(name, CODE | NAME | TOTAL | MUNICIPALITY_AREA | PROPORTION)
        || parse_year_label(name).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use desmat_core::io::{read_silver_from, write_silver_to, CsvOptions};
    use desmat_core::table::BronzeRow;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn bronze() -> BronzeTable {
        let mut a = BronzeRow::new("0150010".into(), "A");
        a.areas.insert(2020, 5.0);
        let mut b = BronzeRow::new("1500107".into(), "B");
        b.areas.insert(2020, 2.0);
        let mut c = BronzeRow::new("1500131".into(), "C");
        c.areas.insert(2020, 1.0);
        BronzeTable::new([], vec![a, b, c])
    }

    fn indicators() -> IndicatorTable {
        let header = strings(&["Código IBGE", "Área (km²)", "NM_MUN", "Oportunidades"]);
        let rows = vec![
            strings(&["0150010", "100", "A", "50.5"]),
            strings(&["1500131", "0", "C", "40"]),
            strings(&["150010", "999", "typo", "1"]),
        ];
        IndicatorTable::from_text_rows(&header, rows, "Código IBGE", "Área (km²)").unwrap()
    }

    #[test]
    fn test_left_join_keeps_every_bronze_row() {
        let silver = join(&bronze(), &indicators());
        assert_eq!(silver.len(), 3);
        let codes: Vec<&str> = silver.rows().iter().map(|r| r.municipality.code.as_str()).collect();
        assert_eq!(codes, vec!["0150010", "1500107", "1500131"]);

        let a = &silver.rows()[0];
        assert_eq!(a.municipality_area_km2, Some(100.0));
        assert_eq!(a.deforestation_proportion(), Some(0.05));

        let b = &silver.rows()[1];
        assert!(b.indicators.iter().all(AttributeValue::is_null));
        assert_eq!(b.municipality_area_km2, None);
        assert_eq!(b.deforestation_proportion(), None);

        // zero area is guarded, not a division error
        assert_eq!(silver.rows()[2].deforestation_proportion(), None);
    }

    #[test]
    fn test_colliding_indicator_column_is_suffixed() {
        let silver = join(&bronze(), &indicators());
        assert_eq!(silver.indicator_columns(), &["NM_MUN_ind", "Oportunidades"]);
        let header = silver.header(Default::default());
        assert_eq!(header.iter().filter(|h| *h == "NM_MUN").count(), 1);
    }

    #[test]
    fn test_renamed_column_never_duplicates_an_existing_one() {
        let header = strings(&["Código IBGE", "Área (km²)", "NM_MUN", "NM_MUN_ind"]);
        let rows = vec![strings(&["0150010", "100", "A", "already suffixed"])];
        let table =
            IndicatorTable::from_text_rows(&header, rows, "Código IBGE", "Área (km²)").unwrap();
        let silver = join(&bronze(), &table);
        assert_eq!(silver.indicator_columns(), &["NM_MUN_ind_ind", "NM_MUN_ind"]);

        let header = silver.header(Default::default());
        let unique: HashSet<&String> = header.iter().collect();
        assert_eq!(unique.len(), header.len());

        let mut buf = Vec::new();
        write_silver_to(&silver, &mut buf, &CsvOptions::default()).unwrap();
        let back = read_silver_from(buf.as_slice()).unwrap();
        assert_eq!(
            back.text_column("NM_MUN_ind").unwrap()[0].as_deref(),
            Some("already suffixed")
        );
        assert_eq!(back.text_column("NM_MUN_ind_ind").unwrap()[0].as_deref(), Some("A"));
    }
}
