//! Error types for desmat

use thiserror::Error;

/// Main error type for desmat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{dataset}: required column '{column}' is missing")]
    MissingColumn { dataset: String, column: String },

    #[error("{dataset}: duplicate key '{key}'")]
    DuplicateKey { dataset: String, key: String },

    #[error("{dataset}: invalid value '{value}' in column '{column}'")]
    InvalidValue {
        dataset: String,
        column: String,
        value: String,
    },

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    pub fn missing_column(dataset: impl Into<String>, column: impl Into<String>) -> Self {
        Error::MissingColumn {
            dataset: dataset.into(),
            column: column.into(),
        }
    }

    pub fn invalid_value(
        dataset: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Error::InvalidValue {
            dataset: dataset.into(),
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn duplicate_key(dataset: impl Into<String>, key: impl Into<String>) -> Self {
        Error::DuplicateKey {
            dataset: dataset.into(),
            key: key.into(),
        }
    }
}

/// Result type alias for desmat operations
pub type Result<T> = std::result::Result<T, Error>;
