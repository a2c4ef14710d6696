//! Column-major numeric view of the Silver analysis columns

use desmat_core::table::SilverTable;
use desmat_core::{Error, MunicipalityCode, Result};
use ndarray::Array2;

/// Named nullable numeric columns sharing one row index
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisFrame {
    /// Municipality of each row
    pub keys: Vec<MunicipalityCode>,
    pub labels: Vec<String>,
    /// `columns[j][i]`: column `j`, row `i`
    pub columns: Vec<Vec<Option<f64>>>,
}

impl AnalysisFrame {
    pub fn new(keys: Vec<MunicipalityCode>, labels: Vec<String>, columns: Vec<Vec<Option<f64>>>) -> Self {
        Self { keys, labels, columns }
    }

    /// Select `names` from a Silver table; a missing column is an error
    pub fn from_silver(silver: &SilverTable, names: &[String]) -> Result<Self> {
        let columns = names
            .iter()
            .map(|name| {
                silver
                    .numeric_column(name)
                    .ok_or_else(|| Error::missing_column("silver table", name.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;
        let keys = silver.rows().iter().map(|r| r.municipality.code.clone()).collect();
        Ok(Self::new(keys, names.to_vec(), columns))
    }

    pub fn n_rows(&self) -> usize {
        self.keys.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        let j = self.labels.iter().position(|l| l == name)?;
        Some(&self.columns[j])
    }

    /// Rows with a value in every column, as (keys, rows × cols matrix)
    pub fn complete_rows(&self) -> (Vec<MunicipalityCode>, Array2<f64>) {
        let ncols = self.n_cols();
        let mut keys = Vec::new();
        let mut data = Vec::new();
        for (i, key) in self.keys.iter().enumerate() {
            let row: Option<Vec<f64>> = self.columns.iter().map(|c| c[i]).collect();
            if let Some(row) = row {
                keys.push(key.clone());
                data.extend(row);
            }
        }
        let nrows = keys.len();
        let matrix = Array2::from_shape_vec((nrows, ncols), data)
            .unwrap_or_else(|_| Array2::zeros((0, ncols)));
        (keys, matrix)
    }
}
