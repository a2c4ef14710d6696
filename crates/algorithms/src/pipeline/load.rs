//! Layer loading with empty-layer substitution

use desmat_core::io::read_layer;
use desmat_core::vector::VectorLayer;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

/// How a layer came to be
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum LoadStatus {
    /// Parsed with at least one feature
    Loaded,
    /// Parsed, but the source holds no features
    LoadedEmpty,
    /// Unreadable source replaced by an empty layer
    Substituted(String),
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadStatus::Loaded => f.write_str("loaded"),
            LoadStatus::LoadedEmpty => f.write_str("loaded, empty"),
            LoadStatus::Substituted(reason) => write!(f, "substituted by empty layer ({})", reason),
        }
    }
}

/// A layer together with how it was obtained
#[derive(Debug, Clone)]
pub struct LoadedLayer {
    pub layer: VectorLayer,
    pub status: LoadStatus,
}

impl LoadedLayer {
    pub fn is_substituted(&self) -> bool {
        matches!(self.status, LoadStatus::Substituted(_))
    }
}

/// Read a layer; any failure yields an empty layer instead of an error.
///
/// No partial recovery: a source either parses completely or not at all.
pub fn load_layer<P: AsRef<Path>>(path: P) -> LoadedLayer {
    let path = path.as_ref();
    match read_layer(path) {
        Ok(layer) if layer.is_empty() => {
            info!("{}: no features", path.display());
            LoadedLayer {
                layer,
                status: LoadStatus::LoadedEmpty,
            }
        }
        Ok(layer) => {
            info!("{}: {} features", path.display(), layer.len());
            LoadedLayer {
                layer,
                status: LoadStatus::Loaded,
            }
        }
        Err(e) => {
            warn!("failed to load {}: {}; continuing with an empty layer", path.display(), e);
            LoadedLayer {
                layer: VectorLayer::empty(),
                status: LoadStatus::Substituted(e.to_string()),
            }
        }
    }
}
