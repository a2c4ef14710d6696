//! Principal Component Analysis of the analysis columns
//!
//! Keeps only rows complete in every column, standardizes each column to
//! zero mean and unit (population) variance, builds the sample covariance
//! matrix, then extracts eigenvalues/eigenvectors via Jacobi iteration.
//! Returns the projection onto the leading components.

use super::frame::AnalysisFrame;
use desmat_core::{Error, MunicipalityCode, Result};
use ndarray::{Array1, Array2, Axis};
use serde::Serialize;

/// Parameters for PCA
#[derive(Debug, Clone)]
pub struct PcaParams {
    /// Number of principal components to return
    pub n_components: usize,
}

impl Default for PcaParams {
    fn default() -> Self {
        Self { n_components: 2 }
    }
}

/// Result of PCA
#[derive(Debug, Clone, Serialize)]
pub struct PcaResult {
    /// Municipality of each projected row
    pub keys: Vec<MunicipalityCode>,
    /// Projected rows × components
    #[serde(skip)]
    pub scores: Array2<f64>,
    /// Eigenvectors as columns: variables × components
    #[serde(skip)]
    pub loadings: Array2<f64>,
    /// Eigenvalues (variance explained by each component)
    pub eigenvalues: Vec<f64>,
    /// Proportion of variance explained by each component
    pub variance_explained: Vec<f64>,
}

impl PcaResult {
    pub fn n_rows(&self) -> usize {
        self.scores.nrows()
    }

    /// Score rows for tabular export
    pub fn score_rows(&self) -> Vec<Vec<f64>> {
        self.scores.outer_iter().map(|r| r.to_vec()).collect()
    }
}

/// Compute PCA on the complete rows of a frame.
///
/// # Errors
/// Fewer than two columns, or a component count of zero or above the
/// column count. No complete rows yields an empty projection, not an error.
pub fn pca(frame: &AnalysisFrame, params: &PcaParams) -> Result<PcaResult> {
    let n_vars = frame.n_cols();
    if n_vars < 2 {
        return Err(Error::InvalidParameter {
            name: "columns",
            value: n_vars.to_string(),
            reason: "PCA requires at least 2 analysis columns".into(),
        });
    }
    let n_components = params.n_components;
    if n_components == 0 || n_components > n_vars {
        return Err(Error::InvalidParameter {
            name: "n_components",
            value: n_components.to_string(),
            reason: format!("must be between 1 and {}", n_vars),
        });
    }

    let (keys, data) = frame.complete_rows();
    let n_rows = data.nrows();
    if n_rows == 0 {
        return Ok(PcaResult {
            keys,
            scores: Array2::zeros((0, n_components)),
            loadings: Array2::zeros((n_vars, n_components)),
            eigenvalues: vec![0.0; n_components],
            variance_explained: vec![0.0; n_components],
        });
    }

    let z = standardize(&data);

    // Sample covariance
    let cov = z.t().dot(&z) / (n_rows - 1).max(1) as f64;

    let (eigenvalues, eigenvectors) = jacobi_eigen(&cov)?;

    // Sort by eigenvalue descending
    let mut indices: Vec<usize> = (0..n_vars).collect();
    indices.sort_by(|&a, &b| {
        eigenvalues[b]
            .partial_cmp(&eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let total_var: f64 = eigenvalues.iter().sum();
    let mut loadings = Array2::<f64>::zeros((n_vars, n_components));
    let mut sorted_eigenvalues = Vec::with_capacity(n_components);
    for (c, &idx) in indices.iter().take(n_components).enumerate() {
        let mut v = eigenvectors.column(idx).to_owned();
        orient(&mut v);
        loadings.column_mut(c).assign(&v);
        sorted_eigenvalues.push(eigenvalues[idx].max(0.0));
    }
    let variance_explained = sorted_eigenvalues
        .iter()
        .map(|ev| if total_var > 0.0 { ev / total_var } else { 0.0 })
        .collect();

    let scores = z.dot(&loadings);

    Ok(PcaResult {
        keys,
        scores,
        loadings,
        eigenvalues: sorted_eigenvalues,
        variance_explained,
    })
}

/// Zero mean, unit population variance; zero-variance columns are only centered
fn standardize(data: &Array2<f64>) -> Array2<f64> {
    let n = data.nrows() as f64;
    let means = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(data.ncols()));
    let mut z = data - &means;
    for mut col in z.columns_mut() {
        let sd = (col.iter().map(|v| v * v).sum::<f64>() / n).sqrt();
        if sd > 0.0 {
            col.mapv_inplace(|v| v / sd);
        }
    }
    z
}

/// Flip so the largest-magnitude loading is positive
fn orient(v: &mut Array1<f64>) {
    let pivot = v
        .iter()
        .copied()
        .fold(0.0_f64, |acc, x| if x.abs() > acc.abs() { x } else { acc });
    if pivot < 0.0 {
        v.mapv_inplace(|x| -x);
    }
}

/// Jacobi eigenvalue algorithm for symmetric matrices
fn jacobi_eigen(matrix: &Array2<f64>) -> Result<(Vec<f64>, Array2<f64>)> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(Error::Algorithm("covariance matrix is not square".into()));
    }
    let max_iter = 100 * n * n;
    let eps = 1e-12;

    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..max_iter {
        // Find largest off-diagonal element
        let mut max_val = 0.0;
        let mut p = 0;
        let mut q = 1;
        for i in 0..n {
            for j in (i + 1)..n {
                if a[(i, j)].abs() > max_val {
                    max_val = a[(i, j)].abs();
                    p = i;
                    q = j;
                }
            }
        }

        if max_val < eps {
            break; // Converged
        }

        // Compute rotation
        let theta = if (a[(p, p)] - a[(q, q)]).abs() < eps {
            std::f64::consts::FRAC_PI_4
        } else {
            0.5 * (2.0 * a[(p, q)] / (a[(p, p)] - a[(q, q)])).atan()
        };
        let cos_t = theta.cos();
        let sin_t = theta.sin();

        // Apply rotation to matrix
        let prev = a.clone();
        for i in 0..n {
            if i != p && i != q {
                a[(i, p)] = cos_t * prev[(i, p)] + sin_t * prev[(i, q)];
                a[(p, i)] = a[(i, p)];
                a[(i, q)] = -sin_t * prev[(i, p)] + cos_t * prev[(i, q)];
                a[(q, i)] = a[(i, q)];
            }
        }
        a[(p, p)] = cos_t * cos_t * prev[(p, p)]
            + 2.0 * sin_t * cos_t * prev[(p, q)]
            + sin_t * sin_t * prev[(q, q)];
        a[(q, q)] = sin_t * sin_t * prev[(p, p)] - 2.0 * sin_t * cos_t * prev[(p, q)]
            + cos_t * cos_t * prev[(q, q)];
        a[(p, q)] = 0.0;
        a[(q, p)] = 0.0;

        // Update eigenvectors
        for i in 0..n {
            let vip = v[(i, p)];
            let viq = v[(i, q)];
            v[(i, p)] = cos_t * vip + sin_t * viq;
            v[(i, q)] = -sin_t * vip + cos_t * viq;
        }
    }

    let eigenvalues = (0..n).map(|i| a[(i, i)]).collect();
    Ok((eigenvalues, v))
}
