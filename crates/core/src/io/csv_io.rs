//! CSV encoding of the tabular tiers.
//!
//! UTF-8 throughout (municipality names carry accents), optional BOM for
//! spreadsheet consumers, header row always present. Floats are written in
//! their shortest round-trip form; nulls are empty cells.

use crate::error::{Error, Result};
use crate::records::MunicipalityCode;
use crate::table::{
    parse_year_label, BronzeRow, BronzeTable, IndicatorTable, SilverRow, SilverTable,
    YearLabelStyle, CODE, MUNICIPALITY_AREA, NAME, PROPORTION, TOTAL,
};
use crate::vector::AttributeValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, warn};

const BOM: &str = "\u{feff}";

/// Options for writing tier tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CsvOptions {
    /// Prefix the file with a UTF-8 byte order mark
    pub bom: bool,
    pub year_style: YearLabelStyle,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            bom: true,
            year_style: YearLabelStyle::Integer,
        }
    }
}

/// Format a float cell; NaN is null
pub fn format_float(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{:?}", v)
    }
}

fn format_opt(v: Option<f64>) -> String {
    v.map(format_float).unwrap_or_default()
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn writer<W: Write>(mut w: W, opts: &CsvOptions) -> Result<csv::Writer<W>> {
    if opts.bom {
        w.write_all(BOM.as_bytes())?;
    }
    Ok(csv::Writer::from_writer(w))
}

/// Read all records as text; the header has any BOM stripped
fn read_text<R: Read>(reader: R) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let header: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = if i == 0 { h.trim_start_matches(BOM) } else { h };
            h.trim().to_string()
        })
        .collect();
    let rows = rdr
        .records()
        .map(|r| r.map(|rec| rec.iter().map(str::to_string).collect()))
        .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;
    Ok((header, rows))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

// ── Bronze ───────────────────────────────────────────────────────────────

pub fn write_bronze<P: AsRef<Path>>(table: &BronzeTable, path: P, opts: &CsvOptions) -> Result<()> {
    write_bronze_to(table, create(path.as_ref())?, opts)
}

pub fn write_bronze_to<W: Write>(table: &BronzeTable, w: W, opts: &CsvOptions) -> Result<()> {
    let mut wtr = writer(w, opts)?;
    wtr.write_record(table.header(opts.year_style))?;
    for row in table.rows() {
        wtr.write_record(bronze_cells(row, table.years()))?;
    }
    wtr.flush()?;
    Ok(())
}

fn bronze_cells(row: &BronzeRow, years: &[i32]) -> Vec<String> {
    let mut cells = vec![row.code.to_string(), row.name.clone()];
    cells.extend(years.iter().map(|&y| format_float(row.area(y))));
    cells.push(format_float(row.total_km2()));
    cells
}

pub fn read_bronze<P: AsRef<Path>>(path: P) -> Result<BronzeTable> {
    read_bronze_from(open(path.as_ref())?)
}

/// Read a Bronze table. The stored total is checked but never trusted.
pub fn read_bronze_from<R: Read>(reader: R) -> Result<BronzeTable> {
    const DATASET: &str = "bronze table";
    let (header, rows) = read_text(reader)?;
    let schema = TierSchema::resolve(&header, DATASET)?;
    for (_, name) in &schema.unknown {
        warn!("{}: ignoring unexpected column '{}'", DATASET, name);
    }

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let parsed = schema.bronze_row(row, DATASET)?;
        if let Some(stored) = schema.total.map(|i| cell(row, i)) {
            let stored = parse_float(stored, DATASET, TOTAL)?;
            if let Some(stored) = stored {
                let derived = parsed.total_km2();
                if (stored - derived).abs() > 1e-9 * derived.abs().max(1.0) {
                    warn!(
                        "{}: stored total {} for {} disagrees with year sum {}; using the sum",
                        DATASET, stored, parsed.code, derived
                    );
                }
            }
        }
        out.push(parsed);
    }
    debug!(rows = out.len(), years = schema.years.len(), "read bronze table");
    Ok(BronzeTable::new(schema.years.iter().map(|(_, y)| *y), out))
}

// ── Silver ───────────────────────────────────────────────────────────────

pub fn write_silver<P: AsRef<Path>>(table: &SilverTable, path: P, opts: &CsvOptions) -> Result<()> {
    write_silver_to(table, create(path.as_ref())?, opts)
}

pub fn write_silver_to<W: Write>(table: &SilverTable, w: W, opts: &CsvOptions) -> Result<()> {
    let mut wtr = writer(w, opts)?;
    wtr.write_record(table.header(opts.year_style))?;
    for row in table.rows() {
        let mut cells = bronze_cells(&row.municipality, table.years());
        cells.push(format_opt(row.municipality_area_km2));
        cells.extend(row.indicators.iter().map(|v| match v {
            AttributeValue::Float(f) => format_float(*f),
            other => other.to_string(),
        }));
        cells.push(format_opt(row.deforestation_proportion()));
        wtr.write_record(cells)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_silver<P: AsRef<Path>>(path: P) -> Result<SilverTable> {
    read_silver_from(open(path.as_ref())?)
}

/// Read a Silver table; total and proportion are recomputed from their inputs
pub fn read_silver_from<R: Read>(reader: R) -> Result<SilverTable> {
    const DATASET: &str = "silver table";
    let (header, rows) = read_text(reader)?;
    let schema = TierSchema::resolve(&header, DATASET)?;
    let mut indicator_columns: Vec<String> = Vec::with_capacity(schema.unknown.len());
    for (_, name) in &schema.unknown {
        if indicator_columns.iter().any(|c| c == name) {
            return Err(Error::duplicate_key(DATASET, format!("column {}", name)));
        }
        indicator_columns.push(name.to_string());
    }
    let indicator_idx: Vec<usize> = schema.unknown.iter().map(|(i, _)| *i).collect();

    let mut out = Vec::with_capacity(rows.len());
    for row in &rows {
        let municipality = schema.bronze_row(row, DATASET)?;
        let municipality_area_km2 = match schema.area {
            Some(i) => parse_float(cell(row, i), DATASET, MUNICIPALITY_AREA)?,
            None => None,
        };
        let indicators = indicator_idx
            .iter()
            .map(|&i| AttributeValue::infer(cell(row, i)))
            .collect();
        out.push(SilverRow {
            municipality,
            municipality_area_km2,
            indicators,
        });
    }
    let years = schema.years.iter().map(|(_, y)| *y).collect();
    Ok(SilverTable::new(years, indicator_columns, out))
}

// ── Indicator table ──────────────────────────────────────────────────────

pub fn read_indicator_table<P: AsRef<Path>>(
    path: P,
    code_field: &str,
    area_field: &str,
) -> Result<IndicatorTable> {
    read_indicator_table_from(open(path.as_ref())?, code_field, area_field)
}

/// Every cell is read as text so codes keep their leading zeros
pub fn read_indicator_table_from<R: Read>(
    reader: R,
    code_field: &str,
    area_field: &str,
) -> Result<IndicatorTable> {
    let (header, rows) = read_text(reader)?;
    IndicatorTable::from_text_rows(&header, rows, code_field, area_field)
}

// ── Generic ──────────────────────────────────────────────────────────────

/// Write a square matrix with row and column labels.
///
/// The first header cell is empty; each row starts with its label.
pub fn write_labeled_matrix<P: AsRef<Path>>(
    labels: &[String],
    values: &[Vec<f64>],
    path: P,
    opts: &CsvOptions,
) -> Result<()> {
    let mut wtr = writer(create(path.as_ref())?, opts)?;
    let mut header = vec![String::new()];
    header.extend(labels.iter().cloned());
    wtr.write_record(&header)?;
    for (label, row) in labels.iter().zip(values) {
        let mut cells = vec![label.clone()];
        cells.extend(row.iter().map(|v| format_float(*v)));
        wtr.write_record(&cells)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write pre-formatted rows under a header
pub fn write_rows<P: AsRef<Path>>(
    header: &[String],
    rows: &[Vec<String>],
    path: P,
    opts: &CsvOptions,
) -> Result<()> {
    let mut wtr = writer(create(path.as_ref())?, opts)?;
    wtr.write_record(header)?;
    for row in rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

// ── Schema resolution shared by Bronze and Silver ────────────────────────

struct TierSchema<'a> {
    code: usize,
    name: usize,
    /// (column index, year), ascending by year
    years: Vec<(usize, i32)>,
    total: Option<usize>,
    area: Option<usize>,
    /// (column index, name) of columns outside the tier schema, in file order
    unknown: Vec<(usize, &'a str)>,
}

impl<'a> TierSchema<'a> {
    fn resolve(header: &'a [String], dataset: &str) -> Result<Self> {
        let find = |name: &str| header.iter().position(|h| h == name);
        let code = find(CODE).ok_or_else(|| Error::missing_column(dataset, CODE))?;
        let name = find(NAME).ok_or_else(|| Error::missing_column(dataset, NAME))?;

        let mut years = Vec::new();
        let mut unknown = Vec::new();
        for (i, h) in header.iter().enumerate() {
            match h.as_str() {
                CODE | NAME | TOTAL | MUNICIPALITY_AREA | PROPORTION => {}
                _ => match parse_year_label(h) {
                    Some(y) => years.push((i, y)),
                    None => unknown.push((i, h.as_str())),
                },
            }
        }
        years.sort_by_key(|(_, y)| *y);
        if let Some(w) = years.windows(2).find(|w| w[0].1 == w[1].1) {
            return Err(Error::duplicate_key(dataset, format!("year column {}", w[0].1)));
        }

        Ok(Self {
            code,
            name,
            years,
            total: find(TOTAL),
            area: find(MUNICIPALITY_AREA),
            unknown,
        })
    }

    fn bronze_row(&self, row: &[String], dataset: &str) -> Result<BronzeRow> {
        let mut areas = BTreeMap::new();
        for &(i, year) in &self.years {
            let label = year.to_string();
            let v = parse_float(cell(row, i), dataset, &label)?.unwrap_or(0.0);
            areas.insert(year, v);
        }
        Ok(BronzeRow {
            code: MunicipalityCode::new(cell(row, self.code)),
            name: cell(row, self.name).to_string(),
            areas,
        })
    }
}

fn cell(row: &[String], i: usize) -> &str {
    row.get(i).map(String::as_str).unwrap_or("")
}

fn parse_float(s: &str, dataset: &str, column: &str) -> Result<Option<f64>> {
    let t = s.trim();
    if t.is_empty() {
        return Ok(None);
    }
    t.parse::<f64>()
        .map(|v| (!v.is_nan()).then_some(v))
        .map_err(|_| Error::invalid_value(dataset, column, s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bronze() -> BronzeTable {
        let mut a = BronzeRow::new("0150010".into(), "Belém");
        a.areas.insert(2019, 1.25);
        let mut b = BronzeRow::new("1500107".into(), "Abaetetuba");
        b.areas.insert(2020, 3.0);
        BronzeTable::new([], vec![a, b])
    }

    #[test]
    fn test_bronze_text_encoding() {
        let mut buf = Vec::new();
        write_bronze_to(&bronze(), &mut buf, &CsvOptions::default()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with('\u{feff}'));
        let mut lines = text.trim_start_matches('\u{feff}').lines();
        assert_eq!(lines.next(), Some("CD_MUN,NM_MUN,2019,2020,total_km2"));
        assert_eq!(lines.next(), Some("0150010,Belém,1.25,0.0,1.25"));
        assert_eq!(lines.next(), Some("1500107,Abaetetuba,0.0,3.0,3.0"));
    }

    #[test]
    fn test_bronze_reads_back_with_leading_zeros() {
        let opts = CsvOptions {
            bom: true,
            year_style: YearLabelStyle::Decimal,
        };
        let mut buf = Vec::new();
        write_bronze_to(&bronze(), &mut buf, &opts).unwrap();
        let table = read_bronze_from(buf.as_slice()).unwrap();
        assert_eq!(table, bronze());
        assert_eq!(table.rows()[0].code.as_str(), "0150010");
    }

    #[test]
    fn test_bronze_missing_code_column() {
        let err = read_bronze_from("NM_MUN,2019\nX,1\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }

    #[test]
    fn test_bronze_total_is_recomputed() {
        let text = "CD_MUN,NM_MUN,2019,2020,total_km2\n1,A,1.0,2.0,99.0\n";
        let table = read_bronze_from(text.as_bytes()).unwrap();
        assert_eq!(table.rows()[0].total_km2(), 3.0);
    }

    #[test]
    fn test_bronze_rejects_text_in_year_column() {
        let text = "CD_MUN,NM_MUN,2019\n1,A,lots\n";
        assert!(matches!(
            read_bronze_from(text.as_bytes()).unwrap_err(),
            Error::InvalidValue { .. }
        ));
    }

    #[test]
    fn test_silver_roundtrip_keeps_nulls() {
        let (years, rows) = bronze().into_rows();
        let silver = SilverTable::new(
            years,
            vec!["UF".into(), "Oportunidades".into()],
            vec![
                SilverRow {
                    municipality: rows[0].clone(),
                    municipality_area_km2: Some(1059.0),
                    indicators: vec![
                        AttributeValue::String("PA".into()),
                        AttributeValue::Float(61.5),
                    ],
                },
                SilverRow {
                    municipality: rows[1].clone(),
                    municipality_area_km2: None,
                    indicators: vec![AttributeValue::Null, AttributeValue::Null],
                },
            ],
        );
        let mut buf = Vec::new();
        write_silver_to(&silver, &mut buf, &CsvOptions::default()).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains(
            "CD_MUN,NM_MUN,2019,2020,total_km2,area_municipio_km2,UF,Oportunidades,desmat_prop"
        ));
        assert!(text.contains("1500107,Abaetetuba,0.0,3.0,3.0,,,,"));

        let back = read_silver_from(buf.as_slice()).unwrap();
        assert_eq!(back, silver);
    }

    #[test]
    fn test_silver_rejects_repeated_indicator_column() {
        let text = "CD_MUN,NM_MUN,2019,NM_MUN_ind,NM_MUN_ind\n1,A,1.0,x,y\n";
        assert!(matches!(
            read_silver_from(text.as_bytes()).unwrap_err(),
            Error::DuplicateKey { .. }
        ));
    }

    #[test]
    fn test_labeled_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("corr.csv");
        let labels = vec!["a".to_string(), "b".to_string()];
        write_labeled_matrix(
            &labels,
            &[vec![1.0, -0.5], vec![-0.5, 1.0]],
            &path,
            &CsvOptions { bom: false, ..Default::default() },
        )
        .unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, ",a,b\na,1.0,-0.5\nb,-0.5,1.0\n");
    }
}
