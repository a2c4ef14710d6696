//! # desmat algorithms
//!
//! Stages of the municipal deforestation pipeline.
//!
//! ## Modules
//!
//! - **harmonize**: region filter, schema projection, CRS reconciliation, geometry repair
//! - **vector**: reprojection, repair, equal-area measurement, polygon overlay
//! - **aggregate**: intersections to the Bronze municipality × year table
//! - **join**: Bronze plus socioeconomic indicators into Silver
//! - **statistics**: normalization, correlation, PCA, pair analysis, dashboard feed
//! - **pipeline**: configuration, layer loading and stage orchestration

pub mod aggregate;
pub mod harmonize;
pub mod join;
pub(crate) mod maybe_rayon;
pub mod pipeline;
pub mod statistics;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::aggregate::{aggregate, Aggregate, AggregateParams};
    pub use crate::harmonize::{harmonize, Harmonize, HarmonizeParams, HarmonizeReport, Harmonized};
    pub use crate::join::{join, Join};
    pub use crate::pipeline::{
        build_bronze, build_silver, load_layer, LoadStatus, LoadedLayer, Pipeline, PipelineConfig,
        PipelineReport, Stage, StageError,
    };
    pub use crate::statistics::{
        analyze_pair, correlation_matrix, dashboard_feed, pca, summarize, CorrelationMatrix,
        DashboardFeed, FeedParams, PairAnalysis, PcaParams, PcaResult, SummarizeParams, Summary,
    };
    pub use crate::vector::{overlay, repair, Overlay, OverlayParams, Reprojector};
    pub use desmat_core::prelude::*;
}
