//! Tabular tiers of the pipeline.
//!
//! - **Bronze**: per-municipality deforested area, one column per year
//! - **Indicator**: external socioeconomic table keyed by municipality code
//! - **Silver**: Bronze left-joined with indicators plus the deforestation proportion
//!
//! Column names are the on-disk contract with the dashboard.

mod bronze;
mod indicator;
mod silver;
mod year;

pub use bronze::{BronzeRow, BronzeTable};
pub use indicator::{IndicatorRecord, IndicatorTable};
pub use silver::{SilverRow, SilverTable};
pub use year::{parse_year_label, YearLabelStyle};

/// Municipality code column
pub const CODE: &str = "CD_MUN";
/// Municipality name column
pub const NAME: &str = "NM_MUN";
/// Row-wise sum of the year columns
pub const TOTAL: &str = "total_km2";
/// Canonical name of the indicator table's area field
pub const MUNICIPALITY_AREA: &str = "area_municipio_km2";
/// Total deforested area divided by municipality area
pub const PROPORTION: &str = "desmat_prop";
/// Appended to indicator columns whose name collides with a Bronze column
pub const COLLISION_SUFFIX: &str = "_ind";
