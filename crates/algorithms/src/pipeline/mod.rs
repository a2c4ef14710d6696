//! End-to-end pipeline
//!
//! Raw layers → harmonize → overlay → aggregate (Bronze) → join (Silver)
//! → summarize, with every persisted table written under the configured
//! output directory. A layer that cannot be read is replaced by an empty
//! one; every later failure stops the run with the stage it happened in.

mod config;
mod load;

pub use config::{InputPaths, OutputPaths, PipelineConfig};
pub use load::{load_layer, LoadStatus, LoadedLayer};

use crate::aggregate::{aggregate, AggregateParams};
use crate::harmonize::{harmonize, HarmonizeReport};
use crate::join::join;
use crate::statistics::{dashboard_feed, summarize, DashboardFeed, Summary};
use crate::vector::overlay;
use desmat_core::io::{
    read_indicator_table, write_bronze, write_intersections, write_labeled_matrix, write_rows,
    write_silver,
};
use desmat_core::table::CODE;
use desmat_core::{
    BronzeTable, Error, IndicatorTable, IntersectionRecord, SilverTable, VectorLayer, CRS,
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Pipeline stage, used to attribute failures. Aggregation cannot fail and
/// has no stage of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Config,
    Harmonize,
    Overlay,
    Join,
    Summarize,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Config => "config",
            Stage::Harmonize => "harmonize",
            Stage::Overlay => "overlay",
            Stage::Join => "join",
            Stage::Summarize => "summarize",
            Stage::Persist => "persist",
        };
        f.write_str(s)
    }
}

/// A failure together with the stage that raised it
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: Error,
}

impl StageError {
    pub fn new(stage: Stage, source: Error) -> Self {
        Self { stage, source }
    }
}

trait InStage<T> {
    fn in_stage(self, stage: Stage) -> Result<T, StageError>;
}

impl<T> InStage<T> for desmat_core::Result<T> {
    fn in_stage(self, stage: Stage) -> Result<T, StageError> {
        self.map_err(|e| StageError::new(stage, e))
    }
}

/// Counters and outcomes of a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub deforestation: Option<LoadStatus>,
    pub municipalities: Option<LoadStatus>,
    pub harmonize: HarmonizeReport,
    pub intersections: usize,
    pub bronze_rows: usize,
    pub silver_rows: usize,
    pub pca_rows: usize,
    /// Files written, in order
    pub written: Vec<PathBuf>,
}

/// Result of the Bronze stages
#[derive(Debug, Clone)]
pub struct BronzeOutput {
    pub table: BronzeTable,
    pub intersections: Vec<IntersectionRecord>,
    /// CRS of the intersection geometries
    pub crs: Option<CRS>,
    pub harmonize: HarmonizeReport,
}

/// Everything a full run produces
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub bronze: BronzeTable,
    pub silver: SilverTable,
    pub summary: Summary,
    pub feed: DashboardFeed,
    pub report: PipelineReport,
}

/// Harmonize, overlay and aggregate two in-memory layers
pub fn build_bronze(
    deforestation: VectorLayer,
    municipalities: VectorLayer,
    config: &PipelineConfig,
) -> Result<BronzeOutput, StageError> {
    let overlay_params = config.overlay_params().in_stage(Stage::Config)?;

    let harmonized =
        harmonize(deforestation, municipalities, &config.harmonize).in_stage(Stage::Harmonize)?;
    info!(
        deforestation = harmonized.deforestation.len(),
        municipalities = harmonized.municipalities.len(),
        dropped = harmonized.report.dropped(),
        "harmonized"
    );

    let intersections = overlay(
        &harmonized.deforestation,
        &harmonized.municipalities,
        &overlay_params,
    )
    .in_stage(Stage::Overlay)?;
    info!(intersections = intersections.len(), "overlay complete");

    let table = aggregate(&intersections, &AggregateParams::default());
    if table.is_empty() {
        warn!("bronze table is empty");
    }
    Ok(BronzeOutput {
        table,
        intersections,
        crs: harmonized.deforestation.crs.clone(),
        harmonize: harmonized.report,
    })
}

/// Join Bronze with the indicator table read from disk
pub fn build_silver(
    bronze: &BronzeTable,
    indicators: &Path,
    config: &PipelineConfig,
) -> Result<SilverTable, StageError> {
    let table: IndicatorTable = read_indicator_table(
        indicators,
        &config.indicator_code_field,
        &config.indicator_area_field,
    )
    .in_stage(Stage::Join)?;
    Ok(join(bronze, &table))
}

/// Drives the stages from a [`PipelineConfig`], persisting each tier
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load both layers and build and write the Bronze table
    pub fn run_bronze(&self, report: &mut PipelineReport) -> Result<BronzeOutput, StageError> {
        let inputs = &self.config.inputs;
        let deforestation = load_layer(&inputs.deforestation);
        let municipalities = load_layer(&inputs.municipalities);
        report.deforestation = Some(deforestation.status);
        report.municipalities = Some(municipalities.status);

        let out = build_bronze(deforestation.layer, municipalities.layer, &self.config)?;
        report.harmonize = out.harmonize.clone();
        report.intersections = out.intersections.len();
        report.bronze_rows = out.table.len();

        let path = self.config.bronze_path();
        write_bronze(&out.table, &path, &self.config.csv_options()).in_stage(Stage::Persist)?;
        self.written(report, path);

        if let Some(file) = &self.config.outputs.intersections {
            let path = self.config.outputs.resolve(file);
            write_intersections(&out.intersections, out.crs.as_ref(), &path)
                .in_stage(Stage::Persist)?;
            self.written(report, path);
        }
        Ok(out)
    }

    /// Join Bronze with the indicators and write the Silver table
    pub fn run_silver(
        &self,
        bronze: &BronzeTable,
        report: &mut PipelineReport,
    ) -> Result<SilverTable, StageError> {
        let silver = build_silver(bronze, &self.config.inputs.indicators, &self.config)?;
        report.silver_rows = silver.len();

        let path = self.config.silver_path();
        write_silver(&silver, &path, &self.config.csv_options()).in_stage(Stage::Persist)?;
        self.written(report, path);
        Ok(silver)
    }

    /// Summarize Silver and write the correlation matrix and, if configured, the PCA scores
    pub fn run_summarize(
        &self,
        silver: &SilverTable,
        report: &mut PipelineReport,
    ) -> Result<Summary, StageError> {
        let summary =
            summarize(silver, &self.config.summarize_params()).in_stage(Stage::Summarize)?;
        report.pca_rows = summary.pca.n_rows();
        let opts = self.config.csv_options();

        let path = self.config.correlation_path();
        write_labeled_matrix(
            &summary.correlation.labels,
            &summary.correlation.rows(),
            &path,
            &opts,
        )
        .in_stage(Stage::Persist)?;
        self.written(report, path);

        if let Some(file) = &self.config.outputs.pca {
            let path = self.config.outputs.resolve(file);
            let n = summary.pca.scores.ncols();
            let mut header = vec![CODE.to_string()];
            header.extend((1..=n).map(|i| format!("PC{}", i)));
            let rows: Vec<Vec<String>> = summary
                .pca
                .keys
                .iter()
                .zip(summary.pca.score_rows())
                .map(|(key, scores)| {
                    let mut row = vec![key.to_string()];
                    row.extend(scores.iter().map(|v| desmat_core::io::format_float(*v)));
                    row
                })
                .collect();
            write_rows(&header, &rows, &path, &opts).in_stage(Stage::Persist)?;
            self.written(report, path);
        }
        Ok(summary)
    }

    /// Build the dashboard feed and write it if configured
    pub fn run_feed(
        &self,
        silver: &SilverTable,
        report: &mut PipelineReport,
    ) -> Result<DashboardFeed, StageError> {
        let feed = dashboard_feed(silver, &self.config.feed);
        if let Some(file) = &self.config.outputs.feed {
            let path = self.config.outputs.resolve(file);
            write_json(&feed, &path).in_stage(Stage::Persist)?;
            self.written(report, path);
        }
        Ok(feed)
    }

    /// Run every stage in order
    pub fn run(&self) -> Result<PipelineOutcome, StageError> {
        let mut report = PipelineReport::default();
        let bronze = self.run_bronze(&mut report)?.table;
        let silver = self.run_silver(&bronze, &mut report)?;
        let summary = self.run_summarize(&silver, &mut report)?;
        let feed = self.run_feed(&silver, &mut report)?;
        info!(
            bronze = report.bronze_rows,
            silver = report.silver_rows,
            pca = report.pca_rows,
            "pipeline finished"
        );
        Ok(PipelineOutcome {
            bronze,
            silver,
            summary,
            feed,
            report,
        })
    }

    fn written(&self, report: &mut PipelineReport, path: PathBuf) {
        info!("wrote {}", path.display());
        report.written.push(path);
    }
}

fn write_json<T: Serialize>(value: &T, path: &Path) -> desmat_core::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
