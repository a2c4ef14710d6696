//! # desmat Core
//!
//! Core types, traits and I/O for the desmat deforestation pipeline.
//!
//! This crate provides:
//! - `VectorLayer`: attribute-carrying polygon layers as read from disk
//! - Typed records for deforestation polygons, municipalities and intersections
//! - `BronzeTable` / `SilverTable`: the tabular tiers
//! - `CRS`: Coordinate Reference System handling with pure-Rust projections
//! - Algorithm trait for consistent stage APIs
//! - GeoJSON and CSV I/O

pub mod crs;
pub mod error;
pub mod io;
pub mod records;
pub mod table;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use records::{
    DeforestationLayer, DeforestationRecord, IntersectionRecord, MunicipalityCode,
    MunicipalityLayer, MunicipalityRecord, RecordLayer,
};
pub use table::{BronzeRow, BronzeTable, IndicatorTable, SilverRow, SilverTable, YearLabelStyle};
pub use vector::{AttributeValue, Feature, VectorLayer};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::records::{DeforestationRecord, IntersectionRecord, MunicipalityCode, MunicipalityRecord};
    pub use crate::table::{BronzeTable, SilverTable};
    pub use crate::vector::{AttributeValue, Feature, VectorLayer};
    pub use crate::Algorithm;
}

/// Core trait for all pipeline stages.
///
/// Stages are pure functions that transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the stage
    type Input;
    /// Output type for the stage
    type Output;
    /// Parameters controlling stage behavior
    type Params: Default;
    /// Error type for stage execution
    type Error: std::error::Error;

    /// Returns the stage name
    fn name(&self) -> &'static str;

    /// Returns a description of what the stage does
    fn description(&self) -> &'static str;

    /// Execute the stage
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
