//! Pearson correlation over pairwise-complete observations

use super::frame::AnalysisFrame;
use ndarray::Array2;
use serde::Serialize;

/// Values present in both columns, in row order
pub fn complete_pairs(x: &[Option<f64>], y: &[Option<f64>]) -> Vec<(f64, f64)> {
    x.iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .collect()
}

/// Pearson r of paired samples.
///
/// `None` with fewer than two pairs or when either side has no variance.
/// The result is clamped to [-1, 1] against rounding.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    let n = pairs.len();
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for &(x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    let r = sxy / (sxx.sqrt() * syy.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Labelled symmetric correlation matrix; undefined entries are NaN
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationMatrix {
    pub labels: Vec<String>,
    #[serde(serialize_with = "serialize_matrix")]
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    /// Entry `(i, j)`; `None` when undefined
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get((i, j)).copied().filter(|v| !v.is_nan())
    }

    pub fn by_label(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.labels.iter().position(|l| l == a)?;
        let j = self.labels.iter().position(|l| l == b)?;
        self.get(i, j)
    }

    /// Row-major copy for tabular export
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.values.outer_iter().map(|r| r.to_vec()).collect()
    }
}

fn serialize_matrix<S: serde::Serializer>(m: &Array2<f64>, s: S) -> Result<S::Ok, S::Error> {
    use serde::ser::SerializeSeq;
    let mut seq = s.serialize_seq(Some(m.nrows()))?;
    for row in m.outer_iter() {
        let row: Vec<Option<f64>> = row.iter().map(|v| (!v.is_nan()).then_some(*v)).collect();
        seq.serialize_element(&row)?;
    }
    seq.end()
}

/// Pairwise-complete Pearson matrix over every column of the frame.
///
/// The diagonal is 1 wherever the column's own correlation is defined.
pub fn correlation_matrix(frame: &AnalysisFrame) -> CorrelationMatrix {
    let k = frame.n_cols();
    let mut values = Array2::from_elem((k, k), f64::NAN);
    for i in 0..k {
        for j in i..k {
            let r = pearson(&complete_pairs(&frame.columns[i], &frame.columns[j]));
            let r = match (r, i == j) {
                (Some(_), true) => 1.0,
                (Some(r), false) => r,
                (None, _) => f64::NAN,
            };
            values[(i, j)] = r;
            values[(j, i)] = r;
        }
    }
    CorrelationMatrix {
        labels: frame.labels.clone(),
        values,
    }
}
