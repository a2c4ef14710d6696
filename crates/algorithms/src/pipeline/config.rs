//! Pipeline configuration

use crate::harmonize::HarmonizeParams;
use crate::statistics::{default_analysis_columns, FeedParams, PcaParams, SummarizeParams};
use crate::vector::OverlayParams;
use desmat_core::crs::SOUTH_AMERICA_ALBERS;
use desmat_core::io::CsvOptions;
use desmat_core::{Error, Result, YearLabelStyle, CRS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Source locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputPaths {
    pub deforestation: PathBuf,
    pub municipalities: PathBuf,
    pub indicators: PathBuf,
}

impl Default for InputPaths {
    fn default() -> Self {
        Self {
            deforestation: "data/raw/yearly_deforestation_biome.geojson".into(),
            municipalities: "data/raw/PA_Municipios_2024.geojson".into(),
            indicators: "data/bronze/ips_brasil_municipios.csv".into(),
        }
    }
}

/// Output layout, relative to `dir`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub bronze: PathBuf,
    pub silver: PathBuf,
    pub correlation: PathBuf,
    /// PCA scores keyed by municipality code; not written when `None`
    pub pca: Option<PathBuf>,
    /// Dashboard feed JSON; not written when `None`
    pub feed: Option<PathBuf>,
    /// Intersection layer GeoJSON; not written when `None`
    pub intersections: Option<PathBuf>,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            dir: "data".into(),
            bronze: "bronze/desmatamento_municipio_ano.csv".into(),
            silver: "silver/municipios_analise.csv".into(),
            correlation: "silver/correlacoes_desmatamento_ips.csv".into(),
            pca: None,
            feed: None,
            intersections: None,
        }
    }
}

impl OutputPaths {
    pub fn resolve(&self, file: &Path) -> PathBuf {
        self.dir.join(file)
    }
}

/// Everything a pipeline run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub inputs: InputPaths,
    pub outputs: OutputPaths,
    pub harmonize: HarmonizeParams,
    /// Municipality code column of the indicator table
    pub indicator_code_field: String,
    /// Municipality area column of the indicator table
    pub indicator_area_field: String,
    /// Equal-area CRS for intersection areas, any form `CRS::from_user_input` accepts
    pub measurement_crs: String,
    /// Intersections below this area in km² are dropped; touching pairs never yield one
    pub min_area_km2: f64,
    pub analysis_columns: Vec<String>,
    pub year_style: YearLabelStyle,
    /// Prefix CSV outputs with a UTF-8 byte order mark
    pub bom: bool,
    pub feed: FeedParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inputs: InputPaths::default(),
            outputs: OutputPaths::default(),
            harmonize: HarmonizeParams::default(),
            indicator_code_field: "Código IBGE".into(),
            indicator_area_field: "Área (km²)".into(),
            measurement_crs: SOUTH_AMERICA_ALBERS.into(),
            min_area_km2: 0.0,
            analysis_columns: default_analysis_columns(),
            year_style: YearLabelStyle::default(),
            bom: true,
            feed: FeedParams::default(),
        }
    }
}

impl PipelineConfig {
    /// Load from a JSON file; absent fields take their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Overlay parameters; the measurement CRS must parse and be equal-area,
    /// the area threshold must be a non-negative number
    pub fn overlay_params(&self) -> Result<OverlayParams> {
        let measurement_crs = CRS::from_user_input(&self.measurement_crs)?;
        if !measurement_crs.is_equal_area() {
            return Err(Error::InvalidParameter {
                name: "measurement_crs",
                value: self.measurement_crs.clone(),
                reason: "not an equal-area projection".into(),
            });
        }
        if !(self.min_area_km2 >= 0.0 && self.min_area_km2.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "min_area_km2",
                value: self.min_area_km2.to_string(),
                reason: "must be a non-negative number".into(),
            });
        }
        Ok(OverlayParams {
            measurement_crs,
            min_area_km2: self.min_area_km2,
        })
    }

    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            bom: self.bom,
            year_style: self.year_style,
        }
    }

    pub fn summarize_params(&self) -> SummarizeParams {
        SummarizeParams {
            columns: self.analysis_columns.clone(),
            pca: PcaParams::default(),
        }
    }

    pub fn bronze_path(&self) -> PathBuf {
        self.outputs.resolve(&self.outputs.bronze)
    }

    pub fn silver_path(&self) -> PathBuf {
        self.outputs.resolve(&self.outputs.silver)
    }

    pub fn correlation_path(&self) -> PathBuf {
        self.outputs.resolve(&self.outputs.correlation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = PipelineConfig::from_json_str(
            r#"{"harmonize": {"region": "AM"}, "bom": false, "year_style": "decimal"}"#,
        )
        .unwrap();
        assert_eq!(cfg.harmonize.region, "AM");
        assert_eq!(cfg.harmonize.region_field, "state");
        assert_eq!(cfg.harmonize.fields.id, "id_desmat");
        assert!(!cfg.bom);
        assert_eq!(cfg.year_style, YearLabelStyle::Decimal);
        assert_eq!(cfg.indicator_code_field, "Código IBGE");
        assert_eq!(cfg.analysis_columns.len(), 6);
    }

    #[test]
    fn test_json_roundtrip() {
        let cfg = PipelineConfig::default();
        let back = PipelineConfig::from_json_str(&cfg.to_json().unwrap()).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_measurement_crs_parses() {
        let params = PipelineConfig::default().overlay_params().unwrap();
        assert!(params.measurement_crs.is_equal_area());
        assert_eq!(params.min_area_km2, 0.0);

        let geographic = PipelineConfig {
            measurement_crs: "EPSG:4674".into(),
            ..Default::default()
        };
        assert!(matches!(
            geographic.overlay_params(),
            Err(Error::InvalidParameter { name: "measurement_crs", .. })
        ));
    }

    #[test]
    fn test_min_area_threshold() {
        let cfg = PipelineConfig::from_json_str(r#"{"min_area_km2": 0.5}"#).unwrap();
        assert_eq!(cfg.overlay_params().unwrap().min_area_km2, 0.5);

        let negative = PipelineConfig {
            min_area_km2: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            negative.overlay_params(),
            Err(Error::InvalidParameter { name: "min_area_km2", .. })
        ));
    }

    #[test]
    fn test_paths_resolve_under_dir() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.bronze_path(), PathBuf::from("data/bronze/desmatamento_municipio_ano.csv"));
    }
}
