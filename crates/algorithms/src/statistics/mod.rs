//! Statistical summaries of the Silver tier
//!
//! - **Normalization**: per-column min-max scaling
//! - **Correlation**: pairwise-complete Pearson matrix
//! - **PCA**: two-component projection of the complete rows
//! - **Pair analysis**: r, p-value and trend line for one column pair
//! - **Dashboard feed**: series, leaders and means for the dashboard

mod correlation;
mod feed;
mod frame;
mod normalize;
mod pair;
mod pca;

pub use correlation::{complete_pairs, correlation_matrix, pearson, CorrelationMatrix};
pub use feed::{
    dashboard_feed, DashboardFeed, Feed, FeedParams, IndicatorMean, YearLeader, YearTotal,
};
pub use frame::AnalysisFrame;
pub use normalize::{min_max_normalize, normalize_frame};
pub use pair::{analyze_pair, ols, pearson_p_value, Direction, PairAnalysis, Strength, TrendLine, ALPHA};
pub use pca::{pca, PcaParams, PcaResult};

use desmat_core::table::{SilverTable, PROPORTION};
use desmat_core::{Algorithm, Error, Result};
use tracing::{debug, warn};

/// Default analysis columns: the proportion and the socioeconomic indicators
pub fn default_analysis_columns() -> Vec<String> {
    [
        PROPORTION,
        "PIB per capita 2021",
        "Índice de Progresso Social",
        "Necessidades Humanas Básicas",
        "Fundamentos do Bem-estar",
        "Oportunidades",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Parameters for the statistical summary
#[derive(Debug, Clone)]
pub struct SummarizeParams {
    pub columns: Vec<String>,
    pub pca: PcaParams,
}

impl Default for SummarizeParams {
    fn default() -> Self {
        Self {
            columns: default_analysis_columns(),
            pca: PcaParams::default(),
        }
    }
}

/// Normalized columns, their correlation and the PCA projection
#[derive(Debug, Clone)]
pub struct Summary {
    pub normalized: AnalysisFrame,
    pub correlation: CorrelationMatrix,
    pub pca: PcaResult,
}

/// Statistical summary algorithm
#[derive(Debug, Clone, Default)]
pub struct Summarize;

impl Algorithm for Summarize {
    type Input = SilverTable;
    type Output = Summary;
    type Params = SummarizeParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Summarize"
    }

    fn description(&self) -> &'static str {
        "Min-max normalization, Pearson correlation matrix and two-component PCA"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        summarize(&input, &params)
    }
}

/// Normalize the analysis columns, then correlate and project them.
///
/// Every analysis column must exist in the Silver table.
pub fn summarize(silver: &SilverTable, params: &SummarizeParams) -> Result<Summary> {
    let frame = AnalysisFrame::from_silver(silver, &params.columns)?;
    let normalized = normalize_frame(&frame);
    for (label, col) in normalized.labels.iter().zip(&normalized.columns) {
        if col.iter().all(Option::is_none) && !col.is_empty() {
            warn!("analysis column '{}' has no range, normalized to null", label);
        }
    }
    let correlation = correlation_matrix(&normalized);
    let pca = pca(&normalized, &params.pca)?;
    debug!(
        rows = normalized.n_rows(),
        complete = pca.n_rows(),
        "summarized"
    );
    Ok(Summary {
        normalized,
        correlation,
        pca,
    })
}
