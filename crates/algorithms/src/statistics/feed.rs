//! Data prepared for the dashboard
//!
//! Everything the dashboard derives from the Silver table before drawing:
//! the yearly series, the leading municipality of each year, indicator
//! means and the proportion-vs-indicator pair analyses.

use super::pair::{analyze_pair, PairAnalysis};
use desmat_core::table::{SilverTable, PROPORTION};
use desmat_core::{Algorithm, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Parameters for the dashboard feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedParams {
    /// Silver text column to filter on; no filter when `None` or absent
    pub region_column: Option<String>,
    pub region: String,
    /// Columns analysed against `target`
    pub indicators: Vec<String>,
    pub target: String,
}

impl Default for FeedParams {
    fn default() -> Self {
        Self {
            region_column: Some("UF".into()),
            region: "PA".into(),
            indicators: vec![
                "PIB per capita 2021".into(),
                "Índice de Progresso Social".into(),
                "Necessidades Humanas Básicas".into(),
                "Fundamentos do Bem-estar".into(),
                "Oportunidades".into(),
            ],
            target: PROPORTION.into(),
        }
    }
}

/// Total cleared area in one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearTotal {
    pub year: i32,
    pub area_km2: f64,
}

/// Municipality with the largest cleared area in one year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearLeader {
    pub year: i32,
    pub total_km2: f64,
    pub code: String,
    pub name: String,
    pub area_km2: f64,
}

/// Mean of one indicator over its non-null values
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorMean {
    pub column: String,
    pub mean: Option<f64>,
    pub n: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardFeed {
    pub municipalities: usize,
    pub annual_series: Vec<YearTotal>,
    pub leaders: Vec<YearLeader>,
    pub means: Vec<IndicatorMean>,
    pub pairs: Vec<PairAnalysis>,
}

impl DashboardFeed {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Dashboard feed algorithm
#[derive(Debug, Clone, Default)]
pub struct Feed;

impl Algorithm for Feed {
    type Input = SilverTable;
    type Output = DashboardFeed;
    type Params = FeedParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "Feed"
    }

    fn description(&self) -> &'static str {
        "Prepare the dashboard's series, leaders, means and pair analyses"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        Ok(dashboard_feed(&input, &params))
    }
}

/// Build the feed. Columns missing from the table are skipped with a warning.
pub fn dashboard_feed(silver: &SilverTable, params: &FeedParams) -> DashboardFeed {
    let silver = filter_region(silver, params);

    let annual_series = silver
        .years()
        .iter()
        .map(|&year| YearTotal {
            year,
            area_km2: silver.rows().iter().map(|r| r.municipality.area(year)).sum(),
        })
        .collect::<Vec<_>>();

    let leaders = annual_series
        .iter()
        .filter_map(|t| {
            let leader = silver.rows().iter().max_by(|a, b| {
                a.municipality
                    .area(t.year)
                    .total_cmp(&b.municipality.area(t.year))
            })?;
            Some(YearLeader {
                year: t.year,
                total_km2: t.area_km2,
                code: leader.municipality.code.to_string(),
                name: leader.municipality.name.clone(),
                area_km2: leader.municipality.area(t.year),
            })
        })
        .collect();

    let mut columns: Vec<&String> = vec![&params.target];
    columns.extend(params.indicators.iter());
    let means = columns
        .into_iter()
        .filter_map(|c| {
            let values = numeric_or_warn(&silver, c)?;
            let present: Vec<f64> = values.into_iter().flatten().collect();
            let n = present.len();
            let mean = (n > 0).then(|| present.iter().sum::<f64>() / n as f64);
            Some(IndicatorMean {
                column: c.clone(),
                mean,
                n,
            })
        })
        .collect();

    let pairs = match silver.numeric_column(&params.target) {
        Some(y) => params
            .indicators
            .iter()
            .filter_map(|c| {
                let x = silver.numeric_column(c)?;
                analyze_pair(c, &x, &params.target, &y)
            })
            .collect(),
        None => Vec::new(),
    };

    debug!(municipalities = silver.len(), "dashboard feed prepared");
    DashboardFeed {
        municipalities: silver.len(),
        annual_series,
        leaders,
        means,
        pairs,
    }
}

fn filter_region(silver: &SilverTable, params: &FeedParams) -> SilverTable {
    let Some(column) = &params.region_column else {
        return silver.clone();
    };
    let Some(values) = silver.text_column(column) else {
        debug!("no '{}' column, region filter skipped", column);
        return silver.clone();
    };
    let mut keep = values.into_iter().map(|v| v.as_deref() == Some(params.region.as_str()));
    silver.clone().retain(|_| keep.next().unwrap_or(false))
}

fn numeric_or_warn(silver: &SilverTable, column: &str) -> Option<Vec<Option<f64>>> {
    let values = silver.numeric_column(column);
    if values.is_none() {
        warn!("column '{}' not in silver table", column);
    }
    values
}
